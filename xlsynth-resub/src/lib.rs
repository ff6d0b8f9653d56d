// SPDX-License-Identifier: Apache-2.0

pub mod error;
pub mod network;
pub mod resub;
pub mod sim;
pub mod test_utils;
pub mod truth_table;
