//! NZCV update behaviors for different instruction classes.

use crate::Nzcv;

/// Describes how NZCV should be updated after an instruction executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagsUpdate {
    /// No change to NZCV.
    #[default]
    None,
    /// Replace NZCV with the given flags.
    Set(Nzcv),
}

impl FlagsUpdate {
    /// Flags produced by a floating-point compare.
    ///
    /// Unordered operands set C and V; equal sets Z and C; less than sets N;
    /// greater than sets C.
    #[must_use]
    pub fn from_fp_compare(ordering: Option<std::cmp::Ordering>) -> Self {
        let nibble = match ordering {
            None => 0b0011,
            Some(std::cmp::Ordering::Equal) => 0b0110,
            Some(std::cmp::Ordering::Less) => 0b1000,
            Some(std::cmp::Ordering::Greater) => 0b0010,
        };
        Self::Set(Nzcv::from_nibble(nibble))
    }
}
