//! Integer helpers for instruction execution.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use crate::decoder::{BitfieldOp, DataProc1Op};
use crate::encoding::{ones, sign_extend};
use crate::Nzcv;

/// Operand width in bits for the `sf` field.
#[must_use]
pub const fn width_of(sf: bool) -> u32 {
    if sf {
        64
    } else {
        32
    }
}

/// `AddWithCarry` over a `width`-bit operation, returning the truncated result
/// and the flags it would set.
#[must_use]
pub fn add_with_carry(x: u64, y: u64, carry_in: bool, width: u32) -> (u64, Nzcv) {
    let mask = ones(width);
    let x = x & mask;
    let y = y & mask;
    let carry = u128::from(carry_in);

    let unsigned_sum = u128::from(x) + u128::from(y) + carry;
    let signed_sum = i128::from(sign_extend(x, width)) + i128::from(sign_extend(y, width))
        + carry as i128;
    let result = (unsigned_sum as u64) & mask;

    let flags = Nzcv {
        n: result >> (width - 1) & 1 == 1,
        z: result == 0,
        c: u128::from(result) != unsigned_sum,
        v: i128::from(sign_extend(result, width)) != signed_sum,
    };
    (result, flags)
}

/// Flags set by `ANDS`/`BICS`: N and Z from the result, C and V cleared.
#[must_use]
pub const fn logical_flags(result: u64, width: u32) -> Nzcv {
    Nzcv {
        n: (result >> (width - 1)) & 1 == 1,
        z: result & ones(width) == 0,
        c: false,
        v: false,
    }
}

/// Executes `SBFM`/`BFM`/`UBFM` on `width`-bit operands.
///
/// `dst` is only consulted by `BFM`, which keeps the bits outside the field.
#[must_use]
pub const fn bitfield_move(
    op: BitfieldOp,
    width: u32,
    dst: u64,
    src: u64,
    immr: u32,
    imms: u32,
) -> u64 {
    let mask = ones(width);
    // (field length, source lsb, destination lsb)
    let (len, from, to) = if imms >= immr {
        (imms - immr + 1, immr, 0)
    } else {
        (imms + 1, 0, width - immr)
    };
    let field = (src >> from) & ones(len);
    let placed = (field << to) & mask;
    let field_mask = (ones(len) << to) & mask;

    match op {
        BitfieldOp::Ubfm => placed,
        BitfieldOp::Bfm => (dst & !field_mask & mask) | placed,
        BitfieldOp::Sbfm => {
            let top = to + len;
            if (field >> (len - 1)) & 1 == 1 && top < width {
                placed | (mask & !ones(top))
            } else {
                placed
            }
        }
    }
}

/// `EXTR`: the low `width` bits of `(hi:lo) >> lsb`.
#[must_use]
pub const fn extract(hi: u64, lo: u64, lsb: u32, width: u32) -> u64 {
    let mask = ones(width);
    let joined = ((hi as u128 & mask as u128) << width) | (lo & mask) as u128;
    (joined >> lsb) as u64 & mask
}

/// One-source data processing on a `width`-bit operand.
#[must_use]
pub const fn data_proc_1(op: DataProc1Op, value: u64, width: u32) -> u64 {
    let mask = ones(width);
    let value = value & mask;
    match op {
        DataProc1Op::Rbit => value.reverse_bits() >> (64 - width),
        DataProc1Op::Rev16 => {
            let lanes = 0x00FF_00FF_00FF_00FF;
            (((value & lanes) << 8) | ((value >> 8) & lanes)) & mask
        }
        DataProc1Op::Rev32 => {
            let swapped = value.swap_bytes();
            swapped.rotate_left(32)
        }
        DataProc1Op::Rev => value.swap_bytes() >> (64 - width),
        DataProc1Op::Clz => count_leading_zeros(value, width) as u64,
        DataProc1Op::Cls => {
            let sign = (value >> (width - 1)) & 1 == 1;
            let folded = if sign { !value & mask } else { value };
            (count_leading_zeros(folded, width) - 1) as u64
        }
    }
}

const fn count_leading_zeros(value: u64, width: u32) -> u32 {
    value.leading_zeros() - (64 - width)
}

/// Unsigned division with the architectural divide-by-zero result of 0.
#[must_use]
pub const fn unsigned_divide(n: u64, m: u64, width: u32) -> u64 {
    let mask = ones(width);
    let (n, m) = (n & mask, m & mask);
    if m == 0 {
        0
    } else {
        n / m
    }
}

/// Signed division, truncating toward zero, with divide-by-zero returning 0.
#[must_use]
pub const fn signed_divide(n: u64, m: u64, width: u32) -> u64 {
    let n = sign_extend(n, width);
    let m = sign_extend(m, width);
    if m == 0 {
        0
    } else {
        (n.wrapping_div(m) as u64) & ones(width)
    }
}

/// Little-endian bytes of the low `size` bytes of `value`.
#[must_use]
pub fn to_le_bytes(value: u128, size: usize) -> Vec<u8> {
    value.to_le_bytes()[..size].to_vec()
}

/// Little-endian value of up to 16 bytes.
#[must_use]
pub fn from_le_bytes(bytes: &[u8]) -> u128 {
    bytes
        .iter()
        .rev()
        .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn add_with_carry_sets_carry_and_zero_on_wraparound() {
        let (result, flags) = add_with_carry(u64::MAX, 1, false, 64);
        assert_eq!(result, 0);
        assert!(flags.z);
        assert!(flags.c);
        assert!(!flags.v);
        assert!(!flags.n);
    }

    #[test]
    fn add_with_carry_detects_signed_overflow_in_32_bits() {
        let (result, flags) = add_with_carry(0x7FFF_FFFF, 1, false, 32);
        assert_eq!(result, 0x8000_0000);
        assert!(flags.n);
        assert!(flags.v);
        assert!(!flags.c);
    }

    #[test]
    fn subtraction_of_equal_values_sets_z_and_c() {
        // CMP X0, X0 is X0 + !X0 + 1
        let (result, flags) = add_with_carry(5, !5, true, 64);
        assert_eq!(result, 0);
        assert!(flags.z);
        assert!(flags.c);
    }

    #[rstest]
    // LSL W0, W1, #4 == UBFM W0, W1, #28, #27
    #[case(BitfieldOp::Ubfm, 32, 0, 0x0000_000F, 28, 27, 0x0000_00F0)]
    // LSR X0, X1, #8 == UBFM X0, X1, #8, #63
    #[case(BitfieldOp::Ubfm, 64, 0, 0xFF00, 8, 63, 0xFF)]
    // ASR W0, W1, #4 == SBFM W0, W1, #4, #31
    #[case(BitfieldOp::Sbfm, 32, 0, 0x8000_0000, 4, 31, 0xF800_0000)]
    // SXTB X0, W1 == SBFM X0, X1, #0, #7
    #[case(BitfieldOp::Sbfm, 64, 0, 0x80, 0, 7, 0xFFFF_FFFF_FFFF_FF80)]
    // BFI X0, X1, #8, #4 == BFM X0, X1, #56, #3
    #[case(BitfieldOp::Bfm, 64, 0xFFFF, 0x5, 56, 3, 0xF5FF)]
    // BFXIL W0, W1, #4, #4 == BFM W0, W1, #4, #7
    #[case(BitfieldOp::Bfm, 32, 0xFFFF_FFFF, 0xA0, 4, 7, 0xFFFF_FFFA)]
    fn bitfield_moves_match_aliases(
        #[case] op: BitfieldOp,
        #[case] width: u32,
        #[case] dst: u64,
        #[case] src: u64,
        #[case] immr: u32,
        #[case] imms: u32,
        #[case] expected: u64,
    ) {
        assert_eq!(bitfield_move(op, width, dst, src, immr, imms), expected);
    }

    #[rstest]
    #[case(DataProc1Op::Rbit, 32, 1, 0x8000_0000)]
    #[case(DataProc1Op::Rev, 32, 0x1122_3344, 0x4433_2211)]
    #[case(DataProc1Op::Rev16, 64, 0x1122_3344_5566_7788, 0x2211_4433_6655_8877)]
    #[case(DataProc1Op::Rev32, 64, 0x1122_3344_5566_7788, 0x4433_2211_8877_6655)]
    #[case(DataProc1Op::Clz, 64, 1, 63)]
    #[case(DataProc1Op::Clz, 32, 0, 32)]
    #[case(DataProc1Op::Cls, 64, u64::MAX, 63)]
    #[case(DataProc1Op::Cls, 32, 0x0000_0001, 30)]
    fn one_source_operations(
        #[case] op: DataProc1Op,
        #[case] width: u32,
        #[case] value: u64,
        #[case] expected: u64,
    ) {
        assert_eq!(data_proc_1(op, value, width), expected);
    }

    #[test]
    fn division_by_zero_yields_zero() {
        assert_eq!(unsigned_divide(10, 0, 64), 0);
        assert_eq!(signed_divide(10, 0, 32), 0);
    }

    #[test]
    fn signed_division_truncates_toward_zero() {
        assert_eq!(signed_divide((-7i64) as u64, 2, 64), (-3i64) as u64);
        assert_eq!(signed_divide(0xFFFF_FFF9, 2, 32), 0xFFFF_FFFD);
    }

    #[test]
    fn extract_joins_registers() {
        assert_eq!(extract(0x1, 0x8000_0000_0000_0000, 63, 64), 0x3);
        assert_eq!(extract(0xAB, 0xCD00_0000, 24, 32), 0xABCD);
    }

    proptest! {
        #[test]
        fn add_with_carry_matches_wrapping_add(x in any::<u64>(), y in any::<u64>()) {
            let (result, _) = add_with_carry(x, y, false, 64);
            prop_assert_eq!(result, x.wrapping_add(y));
        }

        #[test]
        fn little_endian_helpers_invert(value in any::<u64>()) {
            let bytes = to_le_bytes(u128::from(value), 8);
            prop_assert_eq!(from_le_bytes(&bytes), u128::from(value));
        }
    }
}
