// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bit-level range algorithms shared by the native (`u64`) and the wide
//! ([BigUint]) segment representations.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use std::fmt;

/// The handful of integer operations the range algorithms need.
pub(crate) trait RangeInt: Clone + Ord + fmt::Debug {
    fn nil() -> Self;
    /// `2^bits - 1`
    fn ones(bits: u32) -> Self;
    fn and(&self, rhs: &Self) -> Self;
    fn or(&self, rhs: &Self) -> Self;
    fn xor(&self, rhs: &Self) -> Self;
    fn succ(&self) -> Self;
    fn is_nil(&self) -> bool;
    /// Number of significant bits (0 for zero).
    fn bit_len(&self) -> u32;
    fn trailing_zeros_in(&self, bits: u32) -> u32;
    fn trailing_ones_in(&self, bits: u32) -> u32;
    fn to_big(&self) -> BigUint;
}

impl RangeInt for u64 {
    #[inline]
    fn nil() -> Self {
        0
    }
    #[inline]
    fn ones(bits: u32) -> Self {
        if bits >= u64::BITS {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        }
    }
    #[inline]
    fn and(&self, rhs: &Self) -> Self {
        self & rhs
    }
    #[inline]
    fn or(&self, rhs: &Self) -> Self {
        self | rhs
    }
    #[inline]
    fn xor(&self, rhs: &Self) -> Self {
        self ^ rhs
    }
    #[inline]
    fn succ(&self) -> Self {
        self + 1
    }
    #[inline]
    fn is_nil(&self) -> bool {
        *self == 0
    }
    #[inline]
    fn bit_len(&self) -> u32 {
        u64::BITS - self.leading_zeros()
    }
    #[inline]
    fn trailing_zeros_in(&self, bits: u32) -> u32 {
        self.trailing_zeros().min(bits)
    }
    #[inline]
    fn trailing_ones_in(&self, bits: u32) -> u32 {
        self.trailing_ones().min(bits)
    }
    #[inline]
    fn to_big(&self) -> BigUint {
        BigUint::from(*self)
    }
}

impl RangeInt for BigUint {
    fn nil() -> Self {
        BigUint::zero()
    }
    fn ones(bits: u32) -> Self {
        (BigUint::one() << bits) - 1u32
    }
    fn and(&self, rhs: &Self) -> Self {
        self & rhs
    }
    fn or(&self, rhs: &Self) -> Self {
        self | rhs
    }
    fn xor(&self, rhs: &Self) -> Self {
        self ^ rhs
    }
    fn succ(&self) -> Self {
        self + 1u32
    }
    fn is_nil(&self) -> bool {
        self.is_zero()
    }
    fn bit_len(&self) -> u32 {
        self.bits() as u32
    }
    fn trailing_zeros_in(&self, bits: u32) -> u32 {
        self.trailing_zeros()
            .and_then(|tz| tz.to_u32())
            .map_or(bits, |tz| tz.min(bits))
    }
    fn trailing_ones_in(&self, bits: u32) -> u32 {
        // trailing ones of x == trailing zeros of x + 1
        self.succ()
            .trailing_zeros()
            .and_then(|tz| tz.to_u32())
            .map_or(0, |tz| tz.min(bits))
    }
    fn to_big(&self) -> BigUint {
        self.clone()
    }
}

/* ---------------------------------- */

/// Low `bits - prefix` bits set.
#[inline]
pub(crate) fn host_mask<T: RangeInt>(bits: u8, prefix: u8) -> T {
    T::ones(bits.saturating_sub(prefix) as u32)
}

/// High `prefix` bits (of `bits`) set.
#[inline]
pub(crate) fn network_mask<T: RangeInt>(bits: u8, prefix: u8) -> T {
    T::ones(bits as u32).xor(&host_mask::<T>(bits, prefix))
}

/// `lower..=upper` consists of whole blocks for `prefix`: host bits of `lower`
/// are all zero and host bits of `upper` are all one.
pub(crate) fn is_prefix_block<T: RangeInt>(lower: &T, upper: &T, bits: u8, prefix: u8) -> bool {
    let host: T = host_mask(bits, prefix);
    lower.and(&host).is_nil() && upper.and(&host) == host
}

/// Like [is_prefix_block] but the network bits must be a single value too.
pub(crate) fn is_single_prefix_block<T: RangeInt>(lower: &T, upper: &T, bits: u8, prefix: u8) -> bool {
    let host: T = host_mask(bits, prefix);
    lower.and(&host).is_nil() && lower.or(&host) == *upper
}

/// Smallest prefix for which `lower..=upper` is a range of prefix blocks.
pub(crate) fn min_prefix_for_block<T: RangeInt>(lower: &T, upper: &T, bits: u8) -> u8 {
    let b: u32 = bits as u32;
    let host: u32 = lower.trailing_zeros_in(b).min(upper.trailing_ones_in(b));
    bits - host as u8
}

/// The prefix for which `lower..=upper` is exactly one prefix block, if any.
pub(crate) fn prefix_for_single_block<T: RangeInt>(lower: &T, upper: &T, bits: u8) -> Option<u8> {
    let prefix: u8 = min_prefix_for_block(lower, upper, bits);
    match lower.xor(upper) == host_mask::<T>(bits, prefix) {
        true => Some(prefix),
        false => None,
    }
}

/**
Mask every value of `lower..=upper` with `mask`.

Returns the bounds of `{x & mask}` when that set is one contiguous range and
`None` when masking would fragment it.

Let `h` be the highest bit that varies across the range and `k` the highest
mask bit at or below `h`. Mask bits below `k` must all be set. When `k == h`
the result is simply `[lower & mask, upper & mask]`. When `k < h` the bits
`k+1..=h` vanish, so the range folds onto the residues modulo `2^(k+1)`: the
part below the carry into bit `h` covers `[lower mod 2^(k+1), max]`, the part
above it covers `[0, upper mod 2^(k+1)]`, and together they must leave no gap.
*/
pub(crate) fn mask_range<T: RangeInt>(lower: &T, upper: &T, mask: &T, bits: u8) -> Option<(T, T)> {
    if lower == upper {
        let v: T = lower.and(mask);
        return Some((v.clone(), v));
    }
    let max: T = T::ones(bits as u32);
    if mask.is_nil() || *mask == max {
        return Some((lower.and(mask), upper.and(mask)));
    }

    let h: u32 = lower.xor(upper).bit_len() - 1;
    let mask_low: T = mask.and(&T::ones(h + 1));
    if mask_low.is_nil() {
        // every varying bit is masked away
        let v: T = lower.and(mask);
        return Some((v.clone(), v));
    }

    let k: u32 = mask_low.bit_len() - 1;
    let below: T = T::ones(k);
    if mask.and(&below) != below {
        return None;
    }
    if k == h {
        return Some((lower.and(mask), upper.and(mask)));
    }

    let residue: T = T::ones(k + 1);
    let ones_h: T = T::ones(h);
    let lower_full: bool = lower.and(&ones_h) <= ones_h.xor(&residue);
    let upper_full: bool = upper.and(&ones_h) >= residue;
    let a: T = lower.and(&residue);
    let b: T = upper.and(&residue);
    if !(lower_full || upper_full || a <= b.succ()) {
        return None;
    }
    let lo: T = lower.and(mask).xor(&a);
    let hi: T = lo.or(&residue);
    Some((lo, hi))
}

/// Bitwise-OR counterpart of [mask_range]: `x | m == !(!x & !m)`, and the
/// complement of `lower..=upper` is `!upper..=!lower`.
pub(crate) fn or_range<T: RangeInt>(lower: &T, upper: &T, operand: &T, bits: u8) -> Option<(T, T)> {
    let max: T = T::ones(bits as u32);
    let (lo, hi) = mask_range(&upper.xor(&max), &lower.xor(&max), &operand.xor(&max), bits)?;
    Some((hi.xor(&max), lo.xor(&max)))
}

/// Number of digits needed to print `value` in `radix`.
pub(crate) fn digit_count(value: &BigUint, radix: u32) -> usize {
    if value.is_zero() {
        return 1;
    }
    value.to_str_radix(radix).len()
}

/* -------------------------------------------------------------------------- */
