//! Advanced SIMD lane arithmetic on 128-bit register values.

#![allow(clippy::cast_possible_truncation, clippy::cast_lossless)]

use crate::decoder::SimdOp;

const LOW_HALF: u128 = u64::MAX as u128;

/// Mask covering the active part of a vector: 64 bits, or 128 when `q` is set.
#[must_use]
pub const fn vector_mask(q: bool) -> u128 {
    if q {
        u128::MAX
    } else {
        LOW_HALF
    }
}

const fn lane_mask(esize: u32) -> u128 {
    if esize >= 128 {
        u128::MAX
    } else {
        (1u128 << esize) - 1
    }
}

/// Applies a three-same operation lane by lane. Lanes are `8 << size` bits.
#[must_use]
pub fn three_same(op: SimdOp, q: bool, size: u8, a: u128, b: u128) -> u128 {
    let active = vector_mask(q);
    let bitwise = match op {
        SimdOp::And => Some(a & b),
        SimdOp::Bic => Some(a & !b),
        SimdOp::Orr => Some(a | b),
        SimdOp::Orn => Some(a | !b),
        SimdOp::Eor => Some(a ^ b),
        SimdOp::Add | SimdOp::Sub | SimdOp::Mul => None,
    };
    if let Some(value) = bitwise {
        return value & active;
    }

    let esize = 8u32 << size;
    let lanes = if q { 128 / esize } else { 64 / esize };
    let mask = lane_mask(esize);
    (0..lanes).fold(0u128, |acc, lane| {
        let shift = lane * esize;
        let x = (a >> shift) & mask;
        let y = (b >> shift) & mask;
        let result = match op {
            SimdOp::Sub => x.wrapping_sub(y),
            SimdOp::Mul => x.wrapping_mul(y),
            _ => x.wrapping_add(y),
        } & mask;
        acc | (result << shift)
    })
}

/// Replicates the low `8 << esize_log2` bits of `element` across the vector.
#[must_use]
pub fn duplicate(element: u64, esize_log2: u8, q: bool) -> u128 {
    let esize = 8u32 << esize_log2;
    let element = u128::from(element) & lane_mask(esize);
    let lanes = if q { 128 / esize } else { 64 / esize };
    (0..lanes).fold(0u128, |acc, lane| acc | (element << (lane * esize)))
}

/// Reads element `index` of width `8 << esize_log2`.
#[must_use]
pub fn element(vector: u128, esize_log2: u8, index: u8) -> u64 {
    let esize = 8u32 << esize_log2;
    ((vector >> (u32::from(index) * esize)) & lane_mask(esize)) as u64
}

/// Replaces element `index` of width `8 << esize_log2`, keeping the others.
#[must_use]
pub fn insert(vector: u128, esize_log2: u8, index: u8, value: u64) -> u128 {
    let esize = 8u32 << esize_log2;
    let shift = u32::from(index) * esize;
    let mask = lane_mask(esize) << shift;
    (vector & !mask) | ((u128::from(value) << shift) & mask)
}
