// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    bits::{self, RangeInt},
    iterators::SegmentIter,
    strings::*,
    AddressError,
};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

type RangeOp<T> = fn(&T, &T, &T, u8) -> Option<(T, T)>;

/// Widest segment stored in a native `u64`.
pub(crate) const NATIVE_BITS: u8 = 64;

/// Inclusive bounds of a segment. The representation is picked from the bit
/// count when the segment is built: `Native` up to 64 bits, `Wide` above.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) enum Bounds {
    Native { lower: u64, upper: u64 },
    Wide { lower: BigUint, upper: BigUint },
}

impl Bounds {
    /// Build bounds for a `bits` wide segment from arbitrary precision values.
    pub(crate) fn from_big(bits: u8, lower: BigUint, upper: BigUint) -> Self {
        match (bits <= NATIVE_BITS, lower.to_u64(), upper.to_u64()) {
            (true, Some(lower), Some(upper)) => Bounds::Native { lower, upper },
            _ => Bounds::Wide { lower, upper },
        }
    }

    /// Single-valued bounds holding the network (or host) mask for `prefix`.
    pub(crate) fn mask_for(bits: u8, prefix: u8, host: bool) -> Self {
        match bits <= NATIVE_BITS {
            true => {
                let v: u64 = match host {
                    true => bits::host_mask(bits, prefix),
                    false => bits::network_mask(bits, prefix),
                };
                Bounds::Native { lower: v, upper: v }
            }
            false => {
                let v: BigUint = match host {
                    true => bits::host_mask(bits, prefix),
                    false => bits::network_mask(bits, prefix),
                };
                Bounds::Wide { lower: v.clone(), upper: v }
            }
        }
    }

    pub(crate) fn lower_big(&self) -> BigUint {
        match self {
            Bounds::Native { lower, .. } => BigUint::from(*lower),
            Bounds::Wide { lower, .. } => lower.clone(),
        }
    }

    pub(crate) fn upper_big(&self) -> BigUint {
        match self {
            Bounds::Native { upper, .. } => BigUint::from(*upper),
            Bounds::Wide { upper, .. } => upper.clone(),
        }
    }
}

struct SegmentInner {
    bits: u8,
    bounds: Bounds,
    prefix: Option<u8>,
}

/**
One division of an address: an immutable, inclusive range `lower..=upper` of
`bits` wide values, optionally annotated with a segment-local prefix length.

Cloning is cheap (shared handle). Equality and hashing look at the bit count
and the values only; the prefix annotation does not take part.
*/
#[derive(Clone)]
pub struct Segment {
    inner: Arc<SegmentInner>,
}

impl Segment {
    /// Single-valued segment.
    pub fn new(bits: u8, value: u64) -> Result<Self, AddressError> {
        Self::with_range(bits, value, value, None)
    }

    /**
    Segment covering `lower..=upper` (swapped if given in reverse).

    The prefix is stored as given; no prefix block expansion happens here.
    Use a [Creator](super::Creator) for policy-aware construction.
    */
    pub fn with_range(bits: u8, lower: u64, upper: u64, prefix: Option<u8>) -> Result<Self, AddressError> {
        if bits == 0 || bits > NATIVE_BITS {
            return Err(AddressError::InvalidBitCount(bits as u32));
        }
        let (lower, upper) = if lower <= upper { (lower, upper) } else { (upper, lower) };
        if upper > u64::ones(bits as u32) {
            return Err(AddressError::ValueOutOfRange {
                value: upper.into(),
                bits,
            });
        }
        check_seg_prefix(prefix, bits)?;
        Ok(Self::from_parts(bits, Bounds::Native { lower, upper }, prefix))
    }

    /// Segment of any width from arbitrary precision bounds.
    pub fn with_big_range(
        bits: u8,
        lower: BigUint,
        upper: BigUint,
        prefix: Option<u8>,
    ) -> Result<Self, AddressError> {
        if bits == 0 {
            return Err(AddressError::InvalidBitCount(0));
        }
        let (lower, upper) = if lower <= upper { (lower, upper) } else { (upper, lower) };
        if upper.bits() > bits as u64 {
            return Err(AddressError::ValueOutOfRange { value: upper, bits });
        }
        check_seg_prefix(prefix, bits)?;
        Ok(Self::from_parts(bits, Bounds::from_big(bits, lower, upper), prefix))
    }

    pub(crate) fn from_parts(bits: u8, bounds: Bounds, prefix: Option<u8>) -> Self {
        debug_assert!(match &bounds {
            Bounds::Native { lower, upper } => lower <= upper,
            Bounds::Wide { lower, upper } => lower <= upper,
        }, "{PANIC_NAUGHTY}");
        Self {
            inner: Arc::new(SegmentInner { bits, bounds, prefix }),
        }
    }

    /// Same handle when nothing changes.
    pub(crate) fn with_bounds(&self, bounds: Bounds, prefix: Option<u8>) -> Self {
        if bounds == self.inner.bounds && prefix == self.inner.prefix {
            return self.clone();
        }
        Self::from_parts(self.inner.bits, bounds, prefix)
    }

    #[inline]
    pub(crate) fn bounds(&self) -> &Bounds {
        &self.inner.bounds
    }

    /* ---------------------------------- */

    #[inline]
    pub fn bit_count(&self) -> u8 {
        self.inner.bits
    }

    /// Segment-local prefix length.
    #[inline]
    pub fn prefix_len(&self) -> Option<u8> {
        self.inner.prefix
    }

    /// Whether this segment uses the native 64-bit representation.
    #[inline]
    pub fn is_native(&self) -> bool {
        matches!(self.inner.bounds, Bounds::Native { .. })
    }

    pub fn lower_u64(&self) -> Option<u64> {
        match &self.inner.bounds {
            Bounds::Native { lower, .. } => Some(*lower),
            Bounds::Wide { lower, .. } => lower.to_u64(),
        }
    }

    pub fn upper_u64(&self) -> Option<u64> {
        match &self.inner.bounds {
            Bounds::Native { upper, .. } => Some(*upper),
            Bounds::Wide { upper, .. } => upper.to_u64(),
        }
    }

    pub fn lower_value(&self) -> BigUint {
        self.inner.bounds.lower_big()
    }

    pub fn upper_value(&self) -> BigUint {
        self.inner.bounds.upper_big()
    }

    /// Largest value this segment's bit count can hold.
    pub fn max_value(&self) -> BigUint {
        BigUint::ones(self.inner.bits as u32)
    }

    pub fn is_multiple(&self) -> bool {
        match &self.inner.bounds {
            Bounds::Native { lower, upper } => lower != upper,
            Bounds::Wide { lower, upper } => lower != upper,
        }
    }

    /// Covers every value `0..=max`.
    pub fn is_full_range(&self) -> bool {
        let bits: u32 = self.inner.bits as u32;
        match &self.inner.bounds {
            Bounds::Native { lower, upper } => *lower == 0 && *upper == u64::ones(bits),
            Bounds::Wide { lower, upper } => lower.is_zero() && *upper == BigUint::ones(bits),
        }
    }

    /// Number of values, `upper - lower + 1`.
    pub fn value_count(&self) -> BigUint {
        match &self.inner.bounds {
            Bounds::Native { lower, upper } => BigUint::from((upper - lower) as u128 + 1),
            Bounds::Wide { lower, upper } => upper - lower + 1u32,
        }
    }

    /// [Segment::value_count] when it fits in a [u128].
    pub(crate) fn count_u128(&self) -> Option<u128> {
        match &self.inner.bounds {
            Bounds::Native { lower, upper } => Some((upper - lower) as u128 + 1),
            Bounds::Wide { lower, upper } => (upper - lower + 1u32).to_u128(),
        }
    }

    /// Digits needed to print the upper value in `radix`.
    pub fn digit_count(&self, radix: u32) -> usize {
        bits::digit_count(&self.upper_value(), radix)
    }

    /// Whether every value of `other` is also in `self`.
    pub fn contains(&self, other: &Segment) -> bool {
        if self.inner.bits != other.inner.bits {
            return false;
        }
        match (&self.inner.bounds, &other.inner.bounds) {
            (Bounds::Native { lower, upper }, Bounds::Native { lower: ol, upper: ou }) => {
                lower <= ol && ou <= upper
            }
            (a, b) => a.lower_big() <= b.lower_big() && b.upper_big() <= a.upper_big(),
        }
    }

    /// Values common to both segments, keeping this segment's prefix.
    pub fn intersect(&self, other: &Segment) -> Option<Segment> {
        let (lower, upper) = (
            self.lower_value().max(other.lower_value()),
            self.upper_value().min(other.upper_value()),
        );
        if lower > upper {
            return None;
        }
        let bounds: Bounds = Bounds::from_big(self.inner.bits, lower, upper);
        Some(self.with_bounds(bounds, self.inner.prefix))
    }

    /* ---------------------------------- */

    /// `lower..=upper` is a (range of) block(s) for the local `prefix`.
    pub fn is_prefix_block(&self, prefix: u8) -> bool {
        let b: u8 = self.inner.bits;
        if prefix >= b {
            return true;
        }
        match &self.inner.bounds {
            Bounds::Native { lower, upper } => bits::is_prefix_block(lower, upper, b, prefix),
            Bounds::Wide { lower, upper } => bits::is_prefix_block(lower, upper, b, prefix),
        }
    }

    /// Exactly one block for the local `prefix`.
    pub fn is_single_prefix_block(&self, prefix: u8) -> bool {
        let b: u8 = self.inner.bits;
        let prefix: u8 = prefix.min(b);
        match &self.inner.bounds {
            Bounds::Native { lower, upper } => bits::is_single_prefix_block(lower, upper, b, prefix),
            Bounds::Wide { lower, upper } => bits::is_single_prefix_block(lower, upper, b, prefix),
        }
    }

    pub fn min_prefix_len_for_block(&self) -> u8 {
        let b: u8 = self.inner.bits;
        match &self.inner.bounds {
            Bounds::Native { lower, upper } => bits::min_prefix_for_block(lower, upper, b),
            Bounds::Wide { lower, upper } => bits::min_prefix_for_block(lower, upper, b),
        }
    }

    pub fn prefix_len_for_single_block(&self) -> Option<u8> {
        let b: u8 = self.inner.bits;
        match &self.inner.bounds {
            Bounds::Native { lower, upper } => bits::prefix_for_single_block(lower, upper, b),
            Bounds::Wide { lower, upper } => bits::prefix_for_single_block(lower, upper, b),
        }
    }

    /// Same values with another prefix annotation.
    pub fn with_prefix_len(&self, prefix: Option<u8>) -> Result<Segment, AddressError> {
        check_seg_prefix(prefix, self.inner.bits)?;
        Ok(self.with_bounds(self.inner.bounds.clone(), prefix))
    }

    /// Expand to the enclosing block(s) of the local `prefix`, annotated with it.
    pub fn to_prefix_block(&self, prefix: u8) -> Segment {
        let b: u8 = self.inner.bits;
        let prefix: u8 = prefix.min(b);
        let bounds: Bounds = match &self.inner.bounds {
            Bounds::Native { lower, upper } => {
                let host: u64 = bits::host_mask(b, prefix);
                Bounds::Native {
                    lower: lower & !host,
                    upper: upper | host,
                }
            }
            Bounds::Wide { lower, upper } => {
                let host: BigUint = bits::host_mask(b, prefix);
                let net: BigUint = bits::network_mask(b, prefix);
                Bounds::Wide {
                    lower: lower & &net,
                    upper: upper | &host,
                }
            }
        };
        self.with_bounds(bounds, Some(prefix))
    }

    /**
    Mask every value with the lower value of `mask`.

    ## Errors
    - [AddressError::SizeMismatch] if the bit counts differ
    - [AddressError::IncompatibleRange] if the result would not be contiguous
    */
    pub fn mask(&self, mask: &Segment) -> Result<Segment, AddressError> {
        self.check_size(mask)?;
        self.apply(mask.bounds(), false, None)
    }

    /// Bitwise OR of every value with the lower value of `operand`.
    pub fn bitwise_or(&self, operand: &Segment) -> Result<Segment, AddressError> {
        self.check_size(operand)?;
        self.apply(operand.bounds(), true, None)
    }

    /// Apply the network mask of the local `prefix`.
    pub(crate) fn mask_network(&self, prefix: u8) -> Result<Segment, AddressError> {
        let operand: Bounds = Bounds::mask_for(self.inner.bits, prefix, false);
        self.apply(&operand, false, None)
    }

    /// Apply the host mask of the local `prefix`, clearing the network bits.
    pub(crate) fn mask_host(&self, prefix: u8) -> Result<Segment, AddressError> {
        let operand: Bounds = Bounds::mask_for(self.inner.bits, prefix, true);
        self.apply(&operand, false, None)
    }

    /// OR in the host mask of the local `prefix`.
    pub(crate) fn or_host(&self, prefix: u8) -> Result<Segment, AddressError> {
        let operand: Bounds = Bounds::mask_for(self.inner.bits, prefix, true);
        self.apply(&operand, true, None)
    }

    fn apply(&self, operand: &Bounds, or: bool, prefix: Option<u8>) -> Result<Segment, AddressError> {
        let b: u8 = self.inner.bits;
        let result: Option<Bounds> = match (&self.inner.bounds, operand) {
            (Bounds::Native { lower, upper }, Bounds::Native { lower: m, .. }) => {
                let f: RangeOp<u64> = if or { bits::or_range } else { bits::mask_range };
                f(lower, upper, m, b).map(|(lower, upper)| Bounds::Native { lower, upper })
            }
            (bounds, operand) => {
                let f: RangeOp<BigUint> = if or { bits::or_range } else { bits::mask_range };
                let (lower, upper, m) = (bounds.lower_big(), bounds.upper_big(), operand.lower_big());
                f(&lower, &upper, &m, b).map(|(lower, upper)| Bounds::from_big(b, lower, upper))
            }
        };
        match result {
            Some(bounds) => Ok(self.with_bounds(bounds, prefix)),
            None => {
                tracing::debug!(segment = %self, operand = %operand.lower_big(), or, "incompatible range");
                Err(AddressError::IncompatibleRange {
                    lower: self.lower_value(),
                    upper: self.upper_value(),
                    operand: operand.lower_big(),
                })
            }
        }
    }

    fn check_size(&self, other: &Segment) -> Result<(), AddressError> {
        if self.inner.bits != other.inner.bits {
            return Err(AddressError::SizeMismatch {
                left: self.inner.bits as u32,
                right: other.inner.bits as u32,
            });
        }
        Ok(())
    }

    /* ---------------------------------- */

    /// Iterate every single value, lowest first. Each call starts over.
    pub fn iter(&self) -> SegmentIter {
        SegmentIter::values(self.clone())
    }

    /// Iterate the blocks of the local `prefix` overlapping this segment.
    pub fn prefix_block_iter(&self, prefix: u8) -> SegmentIter {
        SegmentIter::blocks(self.clone(), prefix.min(self.inner.bits))
    }

    /// Lower (and upper) value in `radix`, joined with a dash for ranges.
    pub fn to_string_radix(&self, radix: u32) -> String {
        let lower: String = self.lower_value().to_str_radix(radix);
        match self.is_multiple() {
            true => format!("{lower}{DASH}{}", self.upper_value().to_str_radix(radix)),
            false => lower,
        }
    }
}

#[inline]
fn check_seg_prefix(prefix: Option<u8>, bits: u8) -> Result<(), AddressError> {
    match prefix {
        Some(p) if p > bits => Err(AddressError::PrefixLengthOutOfRange {
            prefix: p as i32,
            max: bits,
        }),
        _ => Ok(()),
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.bits == other.inner.bits && self.inner.bounds == other.inner.bounds)
    }
}

impl Eq for Segment {}

impl Hash for Segment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.bits.hash(state);
        self.inner.bounds.hash(state);
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_radix(10))
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("bits", &self.inner.bits)
            .field("lower", &self.lower_value())
            .field("upper", &self.upper_value())
            .field("prefix", &self.inner.prefix)
            .finish()
    }
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(lower: u64, upper: u64) -> Segment {
        Segment::with_range(8, lower, upper, None).unwrap()
    }

    #[test]
    fn test_construction() {
        assert!(Segment::new(8, 256).is_err());
        assert!(Segment::new(0, 0).is_err());
        assert!(Segment::with_range(8, 0, 1, Some(9)).is_err());

        let s = seg(20, 10);
        assert_eq!(s.lower_u64(), Some(10));
        assert_eq!(s.upper_u64(), Some(20));
        assert_eq!(s.value_count(), BigUint::from(11u32));
        assert!(s.is_multiple());
        assert!(!s.is_full_range());
        assert!(seg(0, 255).is_full_range());
    }

    #[test]
    fn test_wide_selection() {
        let s = Segment::with_big_range(16, 1u32.into(), 9u32.into(), None).unwrap();
        assert!(s.is_native());

        let max: BigUint = BigUint::ones(128);
        let w = Segment::with_big_range(128, BigUint::zero(), max.clone(), None).unwrap();
        assert!(!w.is_native());
        assert!(w.is_full_range());
        assert_eq!(w.value_count(), max + 1u32);
        assert_eq!(w.count_u128(), None);
        assert_eq!(w.min_prefix_len_for_block(), 0);
    }

    #[test]
    fn test_equality_ignores_prefix() {
        let a = Segment::with_range(8, 4, 7, Some(6)).unwrap();
        let b = seg(4, 7);
        assert_eq!(a, b);
        assert_ne!(a, seg(4, 6));
        assert_ne!(a, Segment::with_range(16, 4, 7, None).unwrap());
    }

    #[test]
    fn test_prefix_queries() {
        let s = seg(0, 127);
        assert!(s.is_prefix_block(1));
        assert!(s.is_single_prefix_block(1));
        assert!(!s.is_prefix_block(0));
        assert_eq!(s.min_prefix_len_for_block(), 1);
        assert_eq!(s.prefix_len_for_single_block(), Some(1));

        let s = seg(16, 63);
        assert!(s.is_prefix_block(4));
        assert!(!s.is_single_prefix_block(4));
        assert_eq!(s.prefix_len_for_single_block(), None);
    }

    #[test]
    fn test_to_prefix_block() {
        let s = Segment::new(8, 0x57).unwrap();
        let b = s.to_prefix_block(4);
        assert_eq!((b.lower_u64(), b.upper_u64()), (Some(0x50), Some(0x5f)));
        assert_eq!(b.prefix_len(), Some(4));
        // already a block with the same prefix: same handle
        let again = b.to_prefix_block(4);
        assert!(Arc::ptr_eq(&b.inner, &again.inner));
    }

    #[test]
    fn test_mask_and_or() {
        let s = seg(0, 255);
        let m = s.mask(&Segment::new(8, 0).unwrap()).unwrap();
        assert_eq!(m, Segment::new(8, 0).unwrap());

        let err = seg(1, 2).mask(&Segment::new(8, 0xfe).unwrap());
        assert!(matches!(err, Err(AddressError::IncompatibleRange { .. })));

        let o = seg(0, 3).bitwise_or(&Segment::new(8, 0xfc).unwrap()).unwrap();
        assert_eq!((o.lower_u64(), o.upper_u64()), (Some(0xfc), Some(0xff)));

        let mismatch = seg(0, 3).mask(&Segment::new(16, 1).unwrap());
        assert!(matches!(mismatch, Err(AddressError::SizeMismatch { .. })));
    }

    #[test]
    fn test_display() {
        assert_eq!(seg(1, 9).to_string(), "1-9");
        assert_eq!(Segment::new(16, 0xabc).unwrap().to_string_radix(16), "abc");
        assert_eq!(Segment::new(16, 0xabc).unwrap().digit_count(16), 3);
    }

    #[test]
    fn test_block_equivalence_not_textual() {
        let block = Segment::with_range(16, 0x000, 0xfff, None).unwrap();
        assert_eq!(block.prefix_len_for_single_block(), Some(4));
        assert_eq!(block.to_string_radix(16), "0-fff");

        let shifted = Segment::with_range(16, 0x001, 0xfff, None).unwrap();
        assert_eq!(shifted.prefix_len_for_single_block(), None);
        assert!(!shifted.is_prefix_block(4));
        assert_eq!(shifted.to_string_radix(16), "1-fff");
    }
}
