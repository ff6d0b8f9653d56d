// SPDX-License-Identifier: Apache-2.0

//! Complete truth tables over a small number of variables.
//!
//! A function `f(x0, .., x{n-1})` is stored as `2^n` bits packed into `u64`
//! words where bit `i` is the value of `f` on the assignment encoded by `i`:
//! `x_j = (i >> j) & 1`. That is, `x0` is the least-significant selector bit
//! and toggles fastest.
//!
//! Tables over fewer than 6 variables occupy a single word whose unused high
//! bits are always kept at zero so that equality is plain word equality.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

const VAR_MASKS: [u64; 6] = [
    0xAAAA_AAAA_AAAA_AAAA,
    0xCCCC_CCCC_CCCC_CCCC,
    0xF0F0_F0F0_F0F0_F0F0,
    0xFF00_FF00_FF00_FF00,
    0xFFFF_0000_FFFF_0000,
    0xFFFF_FFFF_0000_0000,
];

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TruthTable {
    num_vars: u32,
    words: Vec<u64>,
}

impl TruthTable {
    fn word_count(num_vars: u32) -> usize {
        if num_vars <= 6 {
            1
        } else {
            1usize << (num_vars - 6)
        }
    }

    fn tail_mask(num_vars: u32) -> u64 {
        if num_vars >= 6 {
            u64::MAX
        } else {
            (1u64 << (1u32 << num_vars)) - 1
        }
    }

    pub fn const0(num_vars: u32) -> Self {
        Self {
            num_vars,
            words: vec![0; Self::word_count(num_vars)],
        }
    }

    pub fn const1(num_vars: u32) -> Self {
        let mut tt = Self {
            num_vars,
            words: vec![u64::MAX; Self::word_count(num_vars)],
        };
        tt.mask_tail();
        tt
    }

    /// Returns the projection function `x_var` over `num_vars` variables.
    pub fn nth_var(num_vars: u32, var: u32) -> Self {
        assert!(
            var < num_vars,
            "TruthTable::nth_var: variable {} out of range for {} variables",
            var,
            num_vars
        );
        let mut tt = Self::const0(num_vars);
        if var < 6 {
            for w in tt.words.iter_mut() {
                *w = VAR_MASKS[var as usize];
            }
        } else {
            let period = 1usize << (var - 6);
            for (i, w) in tt.words.iter_mut().enumerate() {
                if (i / period) % 2 == 1 {
                    *w = u64::MAX;
                }
            }
        }
        tt.mask_tail();
        tt
    }

    fn mask_tail(&mut self) {
        let mask = Self::tail_mask(self.num_vars);
        if let Some(last) = self.words.last_mut() {
            *last &= mask;
        }
    }

    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    pub fn num_bits(&self) -> usize {
        1usize << self.num_vars
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn get_bit(&self, index: usize) -> bool {
        debug_assert!(index < self.num_bits());
        (self.words[index / 64] >> (index % 64)) & 1 != 0
    }

    pub fn set_bit(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.num_bits());
        let mask = 1u64 << (index % 64);
        if value {
            self.words[index / 64] |= mask;
        } else {
            self.words[index / 64] &= !mask;
        }
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    pub fn is_const0(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn is_const1(&self) -> bool {
        *self == Self::const1(self.num_vars)
    }

    /// Returns true if `self` implies `other` (every minterm of `self` is a
    /// minterm of `other`).
    pub fn implies(&self, other: &Self) -> bool {
        debug_assert_eq!(self.num_vars, other.num_vars);
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & !b == 0)
    }

    /// Returns true if `self` and `other` agree on every bit set in `care`.
    pub fn equal_on(&self, other: &Self, care: &Self) -> bool {
        debug_assert_eq!(self.num_vars, other.num_vars);
        debug_assert_eq!(self.num_vars, care.num_vars);
        self.words
            .iter()
            .zip(other.words.iter())
            .zip(care.words.iter())
            .all(|((a, b), c)| (a ^ b) & c == 0)
    }

    /// Majority of three tables.
    pub fn maj(a: &Self, b: &Self, c: &Self) -> Self {
        debug_assert_eq!(a.num_vars, b.num_vars);
        debug_assert_eq!(a.num_vars, c.num_vars);
        let words = a
            .words
            .iter()
            .zip(b.words.iter())
            .zip(c.words.iter())
            .map(|((x, y), z)| (x & y) | (x & z) | (y & z))
            .collect();
        Self {
            num_vars: a.num_vars,
            words,
        }
    }

    fn zip_with(&self, other: &Self, f: impl Fn(u64, u64) -> u64) -> Self {
        assert_eq!(
            self.num_vars, other.num_vars,
            "truth table variable count mismatch"
        );
        let words = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| f(*a, *b))
            .collect();
        Self {
            num_vars: self.num_vars,
            words,
        }
    }
}

impl Not for &TruthTable {
    type Output = TruthTable;

    fn not(self) -> TruthTable {
        let mut tt = TruthTable {
            num_vars: self.num_vars,
            words: self.words.iter().map(|w| !w).collect(),
        };
        tt.mask_tail();
        tt
    }
}

impl Not for TruthTable {
    type Output = TruthTable;

    fn not(self) -> TruthTable {
        !&self
    }
}

impl BitAnd for &TruthTable {
    type Output = TruthTable;

    fn bitand(self, rhs: &TruthTable) -> TruthTable {
        self.zip_with(rhs, |a, b| a & b)
    }
}

impl BitOr for &TruthTable {
    type Output = TruthTable;

    fn bitor(self, rhs: &TruthTable) -> TruthTable {
        self.zip_with(rhs, |a, b| a | b)
    }
}

impl BitXor for &TruthTable {
    type Output = TruthTable;

    fn bitxor(self, rhs: &TruthTable) -> TruthTable {
        self.zip_with(rhs, |a, b| a ^ b)
    }
}

impl fmt::Debug for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TruthTable({}: 0x", self.num_vars)?;
        let hex_digits = std::cmp::max(1, self.num_bits() / 4);
        for w in self.words.iter().rev() {
            let digits = std::cmp::min(16, hex_digits);
            write!(f, "{:0width$x}", w, width = digits)?;
        }
        write!(f, ")")
    }
}
