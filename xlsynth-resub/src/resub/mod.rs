// SPDX-License-Identifier: Apache-2.0

//! Windowed resubstitution: re-express a node as a small function of other
//! nodes already in the network so that its exclusive cone can be dropped.

pub mod divisors;
pub mod dont_cares;
pub mod driver;
pub mod index_list;
pub mod marks;
pub mod mffc;
pub mod params;
pub mod reconv_cut;
pub mod resyn;
pub mod validator;
pub mod window_sim;

pub use driver::{
    ResubCallback, Resubstitution, aig_resubstitution, default_resubstitution, mig_resubstitution,
    resubstitution, resubstitution_with_callback, xag_resubstitution,
};
pub use index_list::IndexList;
pub use params::{ResubParams, ResubStats};
pub use resyn::{
    AigResynthesis, Div0Resynthesis, MigResynthesis, ResynStats, ResynthesisFunctor, XagResynthesis,
};
