//! Scalar floating-point arithmetic on raw register bit patterns.
//!
//! Single and double precision are computed with the host's IEEE 754 types
//! using round-to-nearest-even. Half precision is only moved, never computed.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use std::cmp::Ordering;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::decoder::{FpOp1, FpOp2, FpType};
use crate::encoding::{expand_fp_imm_double, expand_fp_imm_single, ones};
use crate::fault::FaultCode;

trait Float:
    Copy
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    const ZERO: Self;

    fn from_raw(bits: u64) -> Self;
    fn into_raw(self) -> u64;
    fn is_nan(self) -> bool;
    fn is_sign_negative(self) -> bool;
    /// Quiet NaN with a clear sign bit and an all-zero payload.
    fn default_nan() -> Self;
    fn abs(self) -> Self;
    fn sqrt(self) -> Self;
}

impl Float for f32 {
    const ZERO: Self = 0.0;

    fn from_raw(bits: u64) -> Self {
        Self::from_bits(bits as u32)
    }

    fn into_raw(self) -> u64 {
        u64::from(self.to_bits())
    }

    fn is_nan(self) -> bool {
        self.is_nan()
    }

    fn is_sign_negative(self) -> bool {
        self.is_sign_negative()
    }

    fn default_nan() -> Self {
        Self::from_bits(0x7FC0_0000)
    }

    fn abs(self) -> Self {
        self.abs()
    }

    fn sqrt(self) -> Self {
        self.sqrt()
    }
}

impl Float for f64 {
    const ZERO: Self = 0.0;

    fn from_raw(bits: u64) -> Self {
        Self::from_bits(bits)
    }

    fn into_raw(self) -> u64 {
        self.to_bits()
    }

    fn is_nan(self) -> bool {
        self.is_nan()
    }

    fn is_sign_negative(self) -> bool {
        self.is_sign_negative()
    }

    fn default_nan() -> Self {
        Self::from_bits(0x7FF8_0000_0000_0000)
    }

    fn abs(self) -> Self {
        self.abs()
    }

    fn sqrt(self) -> Self {
        self.sqrt()
    }
}

/// Replaces a NaN generated from non-NaN operands with the default NaN.
fn invalid_to_default<T: Float>(result: T, inputs_nan: bool) -> T {
    if result.is_nan() && !inputs_nan {
        T::default_nan()
    } else {
        result
    }
}

fn binary<T: Float>(op: FpOp2, a: u64, b: u64) -> u64 {
    let (a, b) = (T::from_raw(a), T::from_raw(b));
    let operand_nan = a.is_nan() || b.is_nan();
    let result = match op {
        FpOp2::Add => invalid_to_default(a + b, operand_nan),
        FpOp2::Sub => invalid_to_default(a - b, operand_nan),
        FpOp2::Mul => invalid_to_default(a * b, operand_nan),
        FpOp2::Div => invalid_to_default(a / b, operand_nan),
        FpOp2::Nmul => -invalid_to_default(a * b, operand_nan),
        FpOp2::Max | FpOp2::Min if a.is_nan() => a,
        FpOp2::Max | FpOp2::Min if b.is_nan() => b,
        // +0 and -0 compare equal; the sign decides.
        FpOp2::Max if a.partial_cmp(&b) == Some(Ordering::Equal) => {
            if a.is_sign_negative() {
                b
            } else {
                a
            }
        }
        FpOp2::Min if a.partial_cmp(&b) == Some(Ordering::Equal) => {
            if a.is_sign_negative() {
                a
            } else {
                b
            }
        }
        FpOp2::Max => {
            if a > b {
                a
            } else {
                b
            }
        }
        FpOp2::Min => {
            if a < b {
                a
            } else {
                b
            }
        }
    };
    result.into_raw()
}

fn unary<T: Float>(op: FpOp1, a: u64) -> u64 {
    let a = T::from_raw(a);
    let result = match op {
        FpOp1::Mov | FpOp1::ConvertTo(_) => a,
        FpOp1::Abs => a.abs(),
        FpOp1::Neg => -a,
        FpOp1::Sqrt => invalid_to_default(a.sqrt(), a.is_nan()),
    };
    result.into_raw()
}

fn compare<T: Float>(a: u64, b: Option<u64>) -> Option<Ordering> {
    let a = T::from_raw(a);
    let b = b.map_or(T::ZERO, T::from_raw);
    a.partial_cmp(&b)
}

/// Two-source arithmetic (`FADD`, `FMUL`, `FMAX`, ...).
///
/// # Errors
///
/// Half-precision arithmetic is [`FaultCode::UnsupportedEncoding`].
pub fn fp_binary(ftype: FpType, op: FpOp2, a: u64, b: u64) -> Result<u64, FaultCode> {
    match ftype {
        FpType::Single => Ok(binary::<f32>(op, a, b)),
        FpType::Double => Ok(binary::<f64>(op, a, b)),
        FpType::Half => Err(FaultCode::UnsupportedEncoding),
    }
}

/// One-source arithmetic, including precision conversion. Returns the result
/// bits and the precision they are in.
///
/// # Errors
///
/// Half-precision arithmetic is [`FaultCode::UnsupportedEncoding`].
pub fn fp_unary(ftype: FpType, op: FpOp1, a: u64) -> Result<(u64, FpType), FaultCode> {
    match (ftype, op) {
        (FpType::Half, FpOp1::Mov) => Ok((a & ones(16), FpType::Half)),
        (FpType::Single, FpOp1::ConvertTo(FpType::Double)) => Ok((
            f64::from(f32::from_raw(a)).into_raw(),
            FpType::Double,
        )),
        (FpType::Double, FpOp1::ConvertTo(FpType::Single)) => {
            Ok(((f64::from_raw(a) as f32).into_raw(), FpType::Single))
        }
        (FpType::Half, _) | (_, FpOp1::ConvertTo(_)) => Err(FaultCode::UnsupportedEncoding),
        (FpType::Single, op) => Ok((unary::<f32>(op, a), FpType::Single)),
        (FpType::Double, op) => Ok((unary::<f64>(op, a), FpType::Double)),
    }
}

/// Ordering of `a` against `b` (or `+0.0`); `None` when unordered.
///
/// # Errors
///
/// Half-precision compares are [`FaultCode::UnsupportedEncoding`].
pub fn fp_compare(ftype: FpType, a: u64, b: Option<u64>) -> Result<Option<Ordering>, FaultCode> {
    match ftype {
        FpType::Single => Ok(compare::<f32>(a, b)),
        FpType::Double => Ok(compare::<f64>(a, b)),
        FpType::Half => Err(FaultCode::UnsupportedEncoding),
    }
}

/// Expands the 8-bit `FMOV` immediate.
///
/// # Errors
///
/// Half precision is [`FaultCode::UnsupportedEncoding`].
pub fn fp_immediate(ftype: FpType, imm8: u8) -> Result<u64, FaultCode> {
    match ftype {
        FpType::Single => Ok(u64::from(expand_fp_imm_single(imm8))),
        FpType::Double => Ok(expand_fp_imm_double(imm8)),
        FpType::Half => Err(FaultCode::UnsupportedEncoding),
    }
}

/// `SCVTF`/`UCVTF`: integer in a `width`-bit general register to float bits.
///
/// # Errors
///
/// Half precision is [`FaultCode::UnsupportedEncoding`].
pub fn int_to_fp(ftype: FpType, value: u64, width: u32, signed: bool) -> Result<u64, FaultCode> {
    let value = value & ones(width);
    let signed_value = crate::encoding::sign_extend(value, width);
    match (ftype, signed) {
        (FpType::Single, true) => Ok((signed_value as f32).into_raw()),
        (FpType::Single, false) => Ok((value as f32).into_raw()),
        (FpType::Double, true) => Ok((signed_value as f64).into_raw()),
        (FpType::Double, false) => Ok((value as f64).into_raw()),
        (FpType::Half, _) => Err(FaultCode::UnsupportedEncoding),
    }
}

/// `FCVTZS`/`FCVTZU`: float bits to a `width`-bit integer, rounding toward
/// zero and saturating. NaN converts to 0.
///
/// # Errors
///
/// Half precision is [`FaultCode::UnsupportedEncoding`].
pub fn fp_to_int(ftype: FpType, bits: u64, width: u32, signed: bool) -> Result<u64, FaultCode> {
    let value = match ftype {
        FpType::Single => f64::from(f32::from_raw(bits)),
        FpType::Double => f64::from_raw(bits),
        FpType::Half => return Err(FaultCode::UnsupportedEncoding),
    };
    let converted = match (width, signed) {
        (64, true) => value as i64 as u64,
        (64, false) => value as u64,
        (_, true) => u64::from(value as i32 as u32),
        (_, false) => u64::from(value as u32),
    };
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(value: f64) -> u64 {
        value.to_bits()
    }

    fn s(value: f32) -> u64 {
        u64::from(value.to_bits())
    }

    #[rstest]
    #[case(FpOp2::Add, 1.5, 2.25, 3.75)]
    #[case(FpOp2::Sub, 1.5, 2.25, -0.75)]
    #[case(FpOp2::Mul, 1.5, 2.0, 3.0)]
    #[case(FpOp2::Div, 1.0, 4.0, 0.25)]
    #[case(FpOp2::Nmul, 2.0, 3.0, -6.0)]
    #[case(FpOp2::Max, -1.0, 2.0, 2.0)]
    #[case(FpOp2::Min, -1.0, 2.0, -1.0)]
    fn double_arithmetic(#[case] op: FpOp2, #[case] a: f64, #[case] b: f64, #[case] expected: f64) {
        assert_eq!(fp_binary(FpType::Double, op, d(a), d(b)), Ok(d(expected)));
    }

    #[test]
    fn max_and_min_propagate_nan() {
        let result = fp_binary(FpType::Single, FpOp2::Max, s(f32::NAN), s(1.0)).expect("single");
        assert!(f32::from_bits(result as u32).is_nan());
        let result = fp_binary(FpType::Double, FpOp2::Min, d(1.0), d(f64::NAN)).expect("double");
        assert!(f64::from_bits(result).is_nan());
    }

    #[rstest]
    #[case(FpOp2::Div, 0.0, 0.0)]
    #[case(FpOp2::Add, f64::INFINITY, f64::NEG_INFINITY)]
    #[case(FpOp2::Sub, f64::INFINITY, f64::INFINITY)]
    #[case(FpOp2::Mul, 0.0, f64::INFINITY)]
    fn invalid_operations_yield_the_default_nan(#[case] op: FpOp2, #[case] a: f64, #[case] b: f64) {
        assert_eq!(
            fp_binary(FpType::Double, op, d(a), d(b)),
            Ok(0x7FF8_0000_0000_0000)
        );
        assert_eq!(
            fp_binary(FpType::Single, op, s(a as f32), s(b as f32)),
            Ok(0x7FC0_0000)
        );
    }

    #[test]
    fn square_root_of_a_negative_is_the_default_nan() {
        assert_eq!(
            fp_unary(FpType::Double, FpOp1::Sqrt, d(-1.0)),
            Ok((0x7FF8_0000_0000_0000, FpType::Double))
        );
        assert_eq!(
            fp_unary(FpType::Single, FpOp1::Sqrt, s(-4.0)),
            Ok((0x7FC0_0000, FpType::Single))
        );
    }

    #[test]
    fn nan_operands_keep_their_payload() {
        let quiet = 0x7FF8_0000_0000_0001;
        assert_eq!(fp_binary(FpType::Double, FpOp2::Add, quiet, d(1.0)), Ok(quiet));
    }

    #[rstest]
    #[case(FpOp2::Max, 0.0, -0.0, 0.0)]
    #[case(FpOp2::Max, -0.0, 0.0, 0.0)]
    #[case(FpOp2::Min, 0.0, -0.0, -0.0)]
    #[case(FpOp2::Min, -0.0, 0.0, -0.0)]
    fn signed_zeros_order_by_sign(
        #[case] op: FpOp2,
        #[case] a: f64,
        #[case] b: f64,
        #[case] expected: f64,
    ) {
        assert_eq!(fp_binary(FpType::Double, op, d(a), d(b)), Ok(d(expected)));
        assert_eq!(
            fp_binary(FpType::Single, op, s(a as f32), s(b as f32)),
            Ok(s(expected as f32))
        );
    }

    #[test]
    fn conversions_between_precisions() {
        assert_eq!(
            fp_unary(FpType::Single, FpOp1::ConvertTo(FpType::Double), s(1.5)),
            Ok((d(1.5), FpType::Double))
        );
        assert_eq!(
            fp_unary(FpType::Double, FpOp1::ConvertTo(FpType::Single), d(-2.0)),
            Ok((s(-2.0), FpType::Single))
        );
    }

    #[test]
    fn compare_reports_unordered_for_nan() {
        assert_eq!(fp_compare(FpType::Double, d(f64::NAN), Some(d(1.0))), Ok(None));
        assert_eq!(
            fp_compare(FpType::Single, s(-1.0), None),
            Ok(Some(Ordering::Less))
        );
    }

    #[test]
    fn integer_conversions_round_toward_zero_and_saturate() {
        assert_eq!(fp_to_int(FpType::Double, d(-2.7), 64, true), Ok((-2i64) as u64));
        assert_eq!(fp_to_int(FpType::Double, d(-2.7), 64, false), Ok(0));
        assert_eq!(fp_to_int(FpType::Double, d(1e20), 32, true), Ok(0x7FFF_FFFF));
        assert_eq!(fp_to_int(FpType::Single, s(f32::NAN), 64, true), Ok(0));
        assert_eq!(int_to_fp(FpType::Double, 0xFFFF_FFFF, 32, true), Ok(d(-1.0)));
        assert_eq!(int_to_fp(FpType::Double, 0xFFFF_FFFF, 32, false), Ok(d(4_294_967_295.0)));
    }

    #[test]
    fn half_precision_arithmetic_is_unsupported() {
        assert_eq!(
            fp_binary(FpType::Half, FpOp2::Add, 0, 0),
            Err(FaultCode::UnsupportedEncoding)
        );
    }

    #[test]
    fn immediate_one_expands_per_precision() {
        // #1.0 is imm8 0x70
        assert_eq!(fp_immediate(FpType::Single, 0x70), Ok(s(1.0)));
        assert_eq!(fp_immediate(FpType::Double, 0x70), Ok(d(1.0)));
    }
}
