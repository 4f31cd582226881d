//! Field-level encoding helpers shared by the decoder and the assembler.
//!
//! Condition codes, shift/extend selectors, logical bitmask immediates and the
//! 8-bit floating-point immediate all have a single definition here so that
//! encoding and decoding cannot drift apart.

use std::fmt;

/// Extracts `word[hi:lo]` (inclusive).
#[must_use]
pub const fn bits(word: u32, hi: u32, lo: u32) -> u32 {
    (word >> lo) & ((1u32 << (hi - lo + 1)) - 1)
}

/// Extracts a single bit as a bool.
#[must_use]
pub const fn bit(word: u32, index: u32) -> bool {
    (word >> index) & 1 == 1
}

/// Sign-extends the low `width` bits of `value`.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn sign_extend(value: u64, width: u32) -> i64 {
    let shift = 64 - width;
    ((value << shift) as i64) >> shift
}

/// Mask with the low `width` bits set (`width` in `0..=64`).
#[must_use]
pub const fn ones(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// A64 condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Condition {
    Eq,
    Ne,
    Cs,
    Cc,
    Mi,
    Pl,
    Vs,
    Vc,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
    Al,
    Nv,
}

impl Condition {
    /// Ordered by 4-bit encoding.
    pub const ALL: [Self; 16] = [
        Self::Eq,
        Self::Ne,
        Self::Cs,
        Self::Cc,
        Self::Mi,
        Self::Pl,
        Self::Vs,
        Self::Vc,
        Self::Hi,
        Self::Ls,
        Self::Ge,
        Self::Lt,
        Self::Gt,
        Self::Le,
        Self::Al,
        Self::Nv,
    ];

    /// Decodes a 4-bit condition field.
    #[must_use]
    pub const fn from_bits(value: u32) -> Self {
        Self::ALL[(value & 0xF) as usize]
    }

    /// 4-bit condition field.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Resolves a condition suffix, including the `HS`/`LO` synonyms.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let cond = match name.to_ascii_uppercase().as_str() {
            "EQ" => Self::Eq,
            "NE" => Self::Ne,
            "CS" | "HS" => Self::Cs,
            "CC" | "LO" => Self::Cc,
            "MI" => Self::Mi,
            "PL" => Self::Pl,
            "VS" => Self::Vs,
            "VC" => Self::Vc,
            "HI" => Self::Hi,
            "LS" => Self::Ls,
            "GE" => Self::Ge,
            "LT" => Self::Lt,
            "GT" => Self::Gt,
            "LE" => Self::Le,
            "AL" => Self::Al,
            "NV" => Self::Nv,
            _ => return None,
        };
        Some(cond)
    }

    /// Condition with the low bit flipped (`EQ` <-> `NE`).
    #[must_use]
    pub const fn invert(self) -> Self {
        Self::from_bits(self.bits() ^ 1)
    }

    /// Evaluates the condition against a set of flags.
    #[must_use]
    pub const fn holds(self, flags: crate::Nzcv) -> bool {
        let base = match self.bits() >> 1 {
            0b000 => flags.z,
            0b001 => flags.c,
            0b010 => flags.n,
            0b011 => flags.v,
            0b100 => flags.c && !flags.z,
            0b101 => flags.n == flags.v,
            0b110 => flags.n == flags.v && !flags.z,
            _ => true,
        };
        if self.bits() & 1 == 1 && self.bits() != 0b1111 {
            !base
        } else {
            base
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Cs => "CS",
            Self::Cc => "CC",
            Self::Mi => "MI",
            Self::Pl => "PL",
            Self::Vs => "VS",
            Self::Vc => "VC",
            Self::Hi => "HI",
            Self::Ls => "LS",
            Self::Ge => "GE",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Le => "LE",
            Self::Al => "AL",
            Self::Nv => "NV",
        };
        f.write_str(name)
    }
}

/// Shift applied to the second register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum ShiftType {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftType {
    /// Decodes a 2-bit shift field.
    #[must_use]
    pub const fn from_bits(value: u32) -> Self {
        match value & 0b11 {
            0b00 => Self::Lsl,
            0b01 => Self::Lsr,
            0b10 => Self::Asr,
            _ => Self::Ror,
        }
    }

    /// 2-bit shift field.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Resolves a shift name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "LSL" => Some(Self::Lsl),
            "LSR" => Some(Self::Lsr),
            "ASR" => Some(Self::Asr),
            "ROR" => Some(Self::Ror),
            _ => None,
        }
    }

    /// Applies the shift to a `width`-bit value.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn apply(self, value: u64, amount: u32, width: u32) -> u64 {
        let mask = ones(width);
        let value = value & mask;
        let amount = amount % width;
        let shifted = match self {
            Self::Lsl => value << amount,
            Self::Lsr => value >> amount,
            Self::Asr => (sign_extend(value, width) >> amount) as u64,
            Self::Ror => {
                if amount == 0 {
                    value
                } else {
                    (value >> amount) | (value << (width - amount))
                }
            }
        };
        shifted & mask
    }
}

/// Extend applied to a register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Extend {
    Uxtb,
    Uxth,
    Uxtw,
    Uxtx,
    Sxtb,
    Sxth,
    Sxtw,
    Sxtx,
}

impl Extend {
    /// Decodes a 3-bit `option` field.
    #[must_use]
    pub const fn from_bits(value: u32) -> Self {
        match value & 0b111 {
            0b000 => Self::Uxtb,
            0b001 => Self::Uxth,
            0b010 => Self::Uxtw,
            0b011 => Self::Uxtx,
            0b100 => Self::Sxtb,
            0b101 => Self::Sxth,
            0b110 => Self::Sxtw,
            _ => Self::Sxtx,
        }
    }

    /// 3-bit `option` field.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Resolves an extend name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "UXTB" => Some(Self::Uxtb),
            "UXTH" => Some(Self::Uxth),
            "UXTW" => Some(Self::Uxtw),
            "UXTX" => Some(Self::Uxtx),
            "SXTB" => Some(Self::Sxtb),
            "SXTH" => Some(Self::Sxth),
            "SXTW" => Some(Self::Sxtw),
            "SXTX" => Some(Self::Sxtx),
            _ => None,
        }
    }

    /// Extends `value` and shifts it left by `shift`.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn apply(self, value: u64, shift: u32) -> u64 {
        let extended = match self {
            Self::Uxtb => value & 0xFF,
            Self::Uxth => value & 0xFFFF,
            Self::Uxtw => value & 0xFFFF_FFFF,
            Self::Uxtx | Self::Sxtx => value,
            Self::Sxtb => sign_extend(value, 8) as u64,
            Self::Sxth => sign_extend(value, 16) as u64,
            Self::Sxtw => sign_extend(value, 32) as u64,
        };
        extended << shift
    }
}

/// Decodes an `N:immr:imms` logical immediate for a `width`-bit operation.
///
/// Returns `None` for reserved encodings.
#[must_use]
pub const fn decode_bit_masks(n: bool, immr: u32, imms: u32, width: u32) -> Option<u64> {
    let combined = ((n as u32) << 6) | (!imms & 0x3F);
    if combined == 0 {
        return None;
    }
    let len = 31 - combined.leading_zeros();
    if len < 1 {
        return None;
    }
    let esize = 1u32 << len;
    if esize > width {
        return None;
    }
    let levels = esize - 1;
    let s = imms & levels;
    let r = immr & levels;
    if s == levels {
        return None;
    }

    let element_mask = ones(esize);
    let welem = ones(s + 1);
    let rotated = if r == 0 {
        welem
    } else {
        ((welem >> r) | (welem << (esize - r))) & element_mask
    };

    let mut pattern = 0u64;
    let mut offset = 0;
    while offset < width {
        pattern |= rotated << offset;
        offset += esize;
    }
    Some(pattern & ones(width))
}

/// Encodes a logical immediate as `(N, immr, imms)` for a `width`-bit operation.
///
/// Returns `None` when the value is not a replicated rotated run of ones
/// (including all-zeros and all-ones).
#[must_use]
pub fn encode_bit_masks(value: u64, width: u32) -> Option<(bool, u32, u32)> {
    let value = value & ones(width);
    if value == 0 || value == ones(width) {
        return None;
    }

    let mut size = width;
    while size > 2 {
        let half = size / 2;
        let mask = ones(half);
        if value & mask != (value >> half) & mask {
            break;
        }
        size = half;
    }

    let mask = ones(size);
    let element = value & mask;
    let ones_count = element.count_ones();

    let rotation = (0..size).find(|&r| {
        let rotated = if r == 0 {
            element
        } else {
            ((element >> r) | (element << (size - r))) & mask
        };
        rotated == ones(ones_count)
    })?;
    let immr = (size - rotation) % size;

    let n = size == 64;
    let imms = if n {
        ones_count - 1
    } else {
        ((!(size * 2 - 1)) & 0x3F) | (ones_count - 1)
    };

    Some((n, immr, imms))
}

/// Expands an 8-bit floating-point immediate into single-precision bits.
#[must_use]
pub const fn expand_fp_imm_single(imm8: u8) -> u32 {
    let imm8 = imm8 as u32;
    let sign = (imm8 >> 7) & 1;
    let b6 = (imm8 >> 6) & 1;
    let replicated = if b6 == 1 { 0b1_1111 } else { 0 };
    let exp = ((b6 ^ 1) << 7) | (replicated << 2) | ((imm8 >> 4) & 0b11);
    let frac = (imm8 & 0xF) << 19;
    (sign << 31) | (exp << 23) | frac
}

/// Expands an 8-bit floating-point immediate into double-precision bits.
#[must_use]
pub const fn expand_fp_imm_double(imm8: u8) -> u64 {
    let imm8 = imm8 as u64;
    let sign = (imm8 >> 7) & 1;
    let b6 = (imm8 >> 6) & 1;
    let replicated = if b6 == 1 { 0xFF } else { 0 };
    let exp = ((b6 ^ 1) << 10) | (replicated << 2) | ((imm8 >> 4) & 0b11);
    let frac = (imm8 & 0xF) << 48;
    (sign << 63) | (exp << 52) | frac
}

/// Finds the 8-bit immediate that expands to `value`, if one exists.
#[must_use]
pub fn fp_imm8_for(value: f64) -> Option<u8> {
    (0..=u8::MAX).find(|&imm8| f64::from_bits(expand_fp_imm_double(imm8)) == value)
}
