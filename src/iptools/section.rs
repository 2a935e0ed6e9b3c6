// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    bits::RangeInt,
    creator::Creator,
    family::{IpFam, PrefixPolicy},
    segment::{Bounds, Segment, NATIVE_BITS},
    strings::*,
    AddressError, MAX_SECTION_BITS,
};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, OnceLock},
};

pub(crate) struct SectionInner {
    divs: Vec<Segment>,
    fam: Option<IpFam>,
    policy: PrefixPolicy,
    bit_count: u8,
    prefix: OnceLock<Option<u8>>,
    count: OnceLock<BigUint>,
    min_prefix: OnceLock<u8>,
    single_block: OnceLock<Option<u8>>,
    lower: OnceLock<Section>,
    upper: OnceLock<Section>,
    lower_bytes: OnceLock<Vec<u8>>,
    upper_bytes: OnceLock<Vec<u8>>,
}

/**
An ordered, fixed-length sequence of [Segment]s.

The prefix length follows the segments: at most one segment carries a
partial prefix, every segment before it carries none and every segment after
it carries `Some(0)`. Constructors rewrite the segment annotations into this
shape.

Derived quantities (count, bounds, bytes, block prefixes) are computed on
first use and cached. Cloning shares the same instance; operations that do
not change anything return such a clone.
*/
#[derive(Clone)]
pub struct Section {
    inner: Arc<SectionInner>,
}

/// Segment-local prefix for a division at bit `offset` of `width` bits.
#[inline]
pub(crate) fn segment_prefix(prefix: Option<u8>, offset: u32, width: u8) -> Option<u8> {
    let p: u32 = prefix? as u32;
    if p <= offset {
        Some(0)
    } else if p >= offset + width as u32 {
        if p == offset + width as u32 {
            Some(width)
        } else {
            None
        }
    } else {
        Some((p - offset) as u8)
    }
}

impl Section {
    /**
    Generic section of arbitrary divisions, not bound to an address family.

    The section prefix is taken from the first segment carrying one.

    ## Errors
    - [AddressError::InvalidBitCount] if the total exceeds 255 bits
    */
    pub fn new(divs: Vec<Segment>) -> Result<Self, AddressError> {
        Self::from_segments(divs, None, PrefixPolicy::default(), None)
    }

    /// Validate the layout, then build with normalized segment prefixes.
    /// An explicit `prefix` wins over the segment annotations.
    pub(crate) fn from_segments(
        divs: Vec<Segment>,
        fam: Option<IpFam>,
        policy: PrefixPolicy,
        prefix: Option<u8>,
    ) -> Result<Self, AddressError> {
        let total: u32 = divs.iter().map(|s| s.bit_count() as u32).sum();
        if total > MAX_SECTION_BITS {
            return Err(AddressError::InvalidBitCount(total));
        }
        if let Some(p) = prefix {
            if p as u32 > total {
                return Err(AddressError::PrefixLengthOutOfRange {
                    prefix: p as i32,
                    max: total as u8,
                });
            }
        }
        let prefix: Option<u8> = prefix.or_else(|| derive_prefix(&divs));
        Ok(Self::build(divs, fam, policy, prefix))
    }

    /// Infallible constructor for layouts already known to be valid.
    pub(crate) fn build(divs: Vec<Segment>, fam: Option<IpFam>, policy: PrefixPolicy, prefix: Option<u8>) -> Self {
        let mut offset: u32 = 0;
        let divs: Vec<Segment> = divs
            .into_iter()
            .map(|s| {
                let width: u8 = s.bit_count();
                let p: Option<u8> = segment_prefix(prefix, offset, width);
                offset += width as u32;
                match s.prefix_len() == p {
                    true => s,
                    false => s.with_bounds(s.bounds().clone(), p),
                }
            })
            .collect();
        let bit_count: u8 = offset as u8;
        let cached: OnceLock<Option<u8>> = OnceLock::new();
        let _ = cached.set(prefix);
        Self {
            inner: Arc::new(SectionInner {
                divs,
                fam,
                policy,
                bit_count,
                prefix: cached,
                count: OnceLock::new(),
                min_prefix: OnceLock::new(),
                single_block: OnceLock::new(),
                lower: OnceLock::new(),
                upper: OnceLock::new(),
                lower_bytes: OnceLock::new(),
                upper_bytes: OnceLock::new(),
            }),
        }
    }

    /// New section with this one's family and policy; same handle if unchanged.
    pub(crate) fn derive(&self, divs: Vec<Segment>, prefix: Option<u8>) -> Section {
        let unchanged: bool = prefix == self.prefix_len()
            && divs.len() == self.inner.divs.len()
            && divs.iter().zip(self.inner.divs.iter()).all(|(a, b)| a == b && a.prefix_len() == b.prefix_len());
        if unchanged {
            return self.clone();
        }
        Self::build(divs, self.inner.fam, self.inner.policy, prefix)
    }

    /// Segment with this section's family caches when one applies.
    pub(crate) fn new_segment(&self, bits: u8, bounds: Bounds, prefix: Option<u8>) -> Segment {
        match self.inner.fam {
            Some(fam) if fam.config().bits_per_segment == bits => {
                Creator::get(fam, self.inner.policy).intern(bounds, prefix)
            }
            _ => Segment::from_parts(bits, bounds, prefix),
        }
    }

    /// Same layout as `self`, holding the range whose bounds are `lower` and
    /// `upper`. Only meaningful when that range is representable, which holds
    /// for prefix blocks and sequential blocks.
    pub(crate) fn with_values(&self, lower: &BigUint, upper: &BigUint, prefix: Option<u8>) -> Section {
        let n: usize = self.inner.divs.len();
        let mut divs: Vec<Segment> = Vec::with_capacity(n);
        let (mut lo, mut hi) = (lower.clone(), upper.clone());
        for seg in self.inner.divs.iter().rev() {
            let bits: u8 = seg.bit_count();
            let m: BigUint = BigUint::ones(bits as u32);
            let bounds: Bounds = Bounds::from_big(bits, &lo & &m, &hi & &m);
            divs.push(self.new_segment(bits, bounds, None));
            lo >>= bits as usize;
            hi >>= bits as usize;
        }
        divs.reverse();
        Self::build(divs, self.inner.fam, self.inner.policy, prefix)
    }

    /// Native counterpart of [Section::with_values] for single values.
    pub(crate) fn with_u64(&self, value: u64, prefix: Option<u8>) -> Section {
        let mut divs: Vec<Segment> = Vec::with_capacity(self.inner.divs.len());
        let mut v: u64 = value;
        for seg in self.inner.divs.iter().rev() {
            let bits: u8 = seg.bit_count();
            let d: u64 = v & u64::ones(bits as u32);
            divs.push(self.new_segment(bits, Bounds::Native { lower: d, upper: d }, None));
            v = v.checked_shr(bits as u32).unwrap_or(0);
        }
        divs.reverse();
        Self::build(divs, self.inner.fam, self.inner.policy, prefix)
    }

    /// Bit layouts and configurations must agree for binary operations.
    pub(crate) fn check_compatible(&self, other: &Section) -> Result<(), AddressError> {
        let same_layout: bool = self.inner.divs.len() == other.inner.divs.len()
            && self
                .inner
                .divs
                .iter()
                .zip(other.inner.divs.iter())
                .all(|(a, b)| a.bit_count() == b.bit_count());
        if !same_layout {
            return Err(AddressError::SizeMismatch {
                left: self.inner.bit_count as u32,
                right: other.inner.bit_count as u32,
            });
        }
        if self.inner.policy != other.inner.policy || self.inner.fam != other.inner.fam {
            return Err(AddressError::NetworkMismatch);
        }
        Ok(())
    }

    /* ---------------------------------- */

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.inner.divs
    }

    #[inline]
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.inner.divs.get(index)
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.inner.divs.len()
    }

    #[inline]
    pub fn bit_count(&self) -> u8 {
        self.inner.bit_count
    }

    #[inline]
    pub fn byte_count(&self) -> usize {
        (self.inner.bit_count as usize).div_ceil(8)
    }

    #[inline]
    pub fn family(&self) -> Option<IpFam> {
        self.inner.fam
    }

    #[inline]
    pub fn policy(&self) -> PrefixPolicy {
        self.inner.policy
    }

    pub fn prefix_len(&self) -> Option<u8> {
        *self.inner.prefix.get_or_init(|| derive_prefix(&self.inner.divs))
    }

    #[inline]
    pub fn is_prefixed(&self) -> bool {
        self.prefix_len().is_some()
    }

    /// Number of individual values: the product of the segment value counts.
    pub fn count(&self) -> BigUint {
        self.inner
            .count
            .get_or_init(|| {
                self.inner
                    .divs
                    .iter()
                    .fold(BigUint::one(), |acc, s| acc * s.value_count())
            })
            .clone()
    }

    pub fn is_multiple(&self) -> bool {
        self.inner.divs.iter().any(Segment::is_multiple)
    }

    pub fn is_full_range(&self) -> bool {
        self.inner.divs.iter().all(Segment::is_full_range)
    }

    /// Whether the values form one run `lower..=upper`: after the first
    /// multi-valued segment, every segment must be full range.
    pub fn is_sequential(&self) -> bool {
        match self.inner.divs.iter().position(Segment::is_multiple) {
            Some(i) => self.inner.divs[i + 1..].iter().all(Segment::is_full_range),
            None => true,
        }
    }

    /// Lowest single value (prefix annotation kept).
    pub fn lower(&self) -> Section {
        if !self.is_multiple() {
            return self.clone();
        }
        self.inner
            .lower
            .get_or_init(|| self.bound(false))
            .clone()
    }

    /// Highest single value (prefix annotation kept).
    pub fn upper(&self) -> Section {
        if !self.is_multiple() {
            return self.clone();
        }
        self.inner
            .upper
            .get_or_init(|| self.bound(true))
            .clone()
    }

    fn bound(&self, upper: bool) -> Section {
        let divs: Vec<Segment> = self
            .inner
            .divs
            .iter()
            .map(|s| {
                let v: BigUint = if upper { s.upper_value() } else { s.lower_value() };
                let bounds: Bounds = Bounds::from_big(s.bit_count(), v.clone(), v);
                self.new_segment(s.bit_count(), bounds, s.prefix_len())
            })
            .collect();
        Self::build(divs, self.inner.fam, self.inner.policy, self.prefix_len())
    }

    /// Lower bound as one integer.
    pub fn lower_value(&self) -> BigUint {
        self.fold_big(Segment::lower_value)
    }

    /// Upper bound as one integer.
    pub fn upper_value(&self) -> BigUint {
        self.fold_big(Segment::upper_value)
    }

    fn fold_big(&self, f: fn(&Segment) -> BigUint) -> BigUint {
        self.inner
            .divs
            .iter()
            .fold(BigUint::zero(), |acc, s| (acc << s.bit_count() as usize) | f(s))
    }

    /// Lower bound as a native integer, for sections up to 64 bits.
    pub(crate) fn lower_u64(&self) -> Option<u64> {
        self.fold_u64(Segment::lower_u64)
    }

    pub(crate) fn upper_u64(&self) -> Option<u64> {
        self.fold_u64(Segment::upper_u64)
    }

    fn fold_u64(&self, f: fn(&Segment) -> Option<u64>) -> Option<u64> {
        if self.inner.bit_count > NATIVE_BITS {
            return None;
        }
        self.inner.divs.iter().try_fold(0u64, |acc, s| {
            Some(acc.checked_shl(s.bit_count() as u32).unwrap_or(0) | f(s)?)
        })
    }

    /// Largest value the section's bit count can hold.
    pub fn max_value(&self) -> BigUint {
        BigUint::ones(self.inner.bit_count as u32)
    }

    /// Big-endian bytes of the lower bound, `byte_count()` long.
    pub fn bytes(&self) -> &[u8] {
        self.inner
            .lower_bytes
            .get_or_init(|| to_be_bytes(&self.lower_value(), self.byte_count()))
    }

    /// Big-endian bytes of the upper bound.
    pub fn upper_bytes(&self) -> &[u8] {
        self.inner
            .upper_bytes
            .get_or_init(|| to_be_bytes(&self.upper_value(), self.byte_count()))
    }

    /// Whether every value of `other` is in `self` (same layout required).
    pub fn contains(&self, other: &Section) -> bool {
        self.check_compatible(other).is_ok()
            && self
                .inner
                .divs
                .iter()
                .zip(other.inner.divs.iter())
                .all(|(a, b)| a.contains(b))
    }

    /// Cached block prefix queries; see `prefix.rs`.
    pub(crate) fn cached_min_prefix(&self, f: impl FnOnce() -> u8) -> u8 {
        *self.inner.min_prefix.get_or_init(f)
    }

    pub(crate) fn cached_single_block(&self, f: impl FnOnce() -> Option<u8>) -> Option<u8> {
        *self.inner.single_block.get_or_init(f)
    }

    /* ---------------------------------- */

    /**
    Join every segment into one division spanning the whole section.

    ## Errors
    - [AddressError::IncompatibleRange] if the section is not sequential, so
      its values cannot be described by one `lower..=upper` range
    */
    pub fn join_all(&self) -> Result<Segment, AddressError> {
        join_segments(&self.inner.divs, self.prefix_len())
    }

    /**
    Join each run of `per_division` consecutive segments into one division
    (the last run may be shorter). The result is a generic section.

    Segments wider than 64 bits switch to the arbitrary precision representation.
    */
    pub fn joined(&self, per_division: usize) -> Result<Section, AddressError> {
        let per_division: usize = per_division.max(1);
        let mut offset: u32 = 0;
        let mut divs: Vec<Segment> = Vec::with_capacity(self.inner.divs.len().div_ceil(per_division));
        for chunk in self.inner.divs.chunks(per_division) {
            let width: u32 = chunk.iter().map(|s| s.bit_count() as u32).sum();
            let local: Option<u8> = segment_prefix(self.prefix_len(), offset, width as u8);
            divs.push(join_segments(chunk, local)?);
            offset += width;
        }
        Ok(Self::build(divs, None, self.inner.policy, self.prefix_len()))
    }

    /// Display with segment values in `radix`, joined by `sep`.
    pub fn to_string_with(&self, radix: u32, sep: &str) -> String {
        let body: String = self
            .inner
            .divs
            .iter()
            .map(|s| s.to_string_radix(radix))
            .collect::<Vec<String>>()
            .join(sep);
        match self.prefix_len() {
            Some(p) => format!("{body}{SLASH}{p}"),
            None => body,
        }
    }
}

/// Section prefix from segment annotations: the first annotated segment wins.
fn derive_prefix(divs: &[Segment]) -> Option<u8> {
    let mut offset: u32 = 0;
    for s in divs {
        if let Some(p) = s.prefix_len() {
            return Some((offset + p as u32) as u8);
        }
        offset += s.bit_count() as u32;
    }
    None
}

fn join_segments(segs: &[Segment], prefix: Option<u8>) -> Result<Segment, AddressError> {
    let width: u32 = segs.iter().map(|s| s.bit_count() as u32).sum();
    if width == 0 || width > MAX_SECTION_BITS {
        return Err(AddressError::InvalidBitCount(width));
    }
    let (mut lower, mut upper) = (BigUint::zero(), BigUint::zero());
    let mut ranged: bool = false;
    for s in segs {
        if ranged && !s.is_full_range() {
            return Err(AddressError::IncompatibleRange {
                lower: s.lower_value(),
                upper: s.upper_value(),
                operand: s.max_value(),
            });
        }
        ranged |= s.is_multiple();
        lower = (lower << s.bit_count() as usize) | s.lower_value();
        upper = (upper << s.bit_count() as usize) | s.upper_value();
    }
    let width: u8 = width as u8;
    Ok(Segment::from_parts(width, Bounds::from_big(width, lower, upper), prefix))
}

/// Big-endian, zero padded to `len` bytes.
pub(crate) fn to_be_bytes(value: &BigUint, len: usize) -> Vec<u8> {
    let raw: Vec<u8> = match value.is_zero() {
        true => Vec::new(),
        false => value.to_bytes_be(),
    };
    let mut out: Vec<u8> = vec![0u8; len.saturating_sub(raw.len())];
    out.extend_from_slice(&raw[raw.len().saturating_sub(len)..]);
    out
}

impl PartialEq for Section {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.divs == other.inner.divs
    }
}

impl Eq for Section {}

impl Hash for Section {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.divs.hash(state);
    }
}

impl PartialOrd for Section {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Section {
    /// By bit count, then lower value, then upper value (wider ranges sort
    /// after narrower ones with the same lower bound), then division layout.
    fn cmp(&self, other: &Self) -> Ordering {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return Ordering::Equal;
        }
        self.inner
            .bit_count
            .cmp(&other.inner.bit_count)
            .then_with(|| match (self.lower_u64(), other.lower_u64()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => self.lower_value().cmp(&other.lower_value()),
            })
            .then_with(|| match (self.upper_u64(), other.upper_u64()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => self.upper_value().cmp(&other.upper_value()),
            })
            .then_with(|| {
                let a = self.inner.divs.iter().map(Segment::bit_count);
                let b = other.inner.divs.iter().map(Segment::bit_count);
                a.cmp(b)
            })
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: String = match self.inner.fam {
            Some(IpFam::V6) => self.to_string_with(16, COLON),
            Some(IpFam::V4) => self.to_string_with(10, DOT),
            None => self.to_string_with(16, COLON),
        };
        f.write_str(&s)
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("fam", &self.inner.fam)
            .field("value", &self.to_string())
            .field("bits", &self.inner.bit_count)
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

    fn sect(ranges: &[(u64, u64)]) -> Section {
        Section::new(ranges.iter().map(|&(l, u)| seg(l, u)).collect()).unwrap()
    }

    #[test]
    fn test_segment_prefix_shape() {
        // /16 over 4x8 bits: None, Some(8), Some(0), Some(0)
        let got: Vec<Option<u8>> = (0..4).map(|i| segment_prefix(Some(16), i * 8, 8)).collect();
        assert_eq!(got, vec![None, Some(8), Some(0), Some(0)]);
        let got: Vec<Option<u8>> = (0..4).map(|i| segment_prefix(Some(0), i * 8, 8)).collect();
        assert_eq!(got, vec![Some(0); 4]);
        let got: Vec<Option<u8>> = (0..4).map(|i| segment_prefix(Some(20), i * 8, 8)).collect();
        assert_eq!(got, vec![None, None, Some(4), Some(0)]);
        assert_eq!(segment_prefix(None, 0, 8), None);
    }

    #[test]
    fn test_normalizes_boundary_tail() {
        // None, None, Some(0), Some(0) is rewritten to None, Some(8), Some(0), Some(0)
        let divs = vec![
            seg(10, 10),
            seg(1, 1),
            Segment::with_range(8, 0, 255, Some(0)).unwrap(),
            Segment::with_range(8, 0, 255, Some(0)).unwrap(),
        ];
        let s = Section::new(divs).unwrap();
        assert_eq!(s.prefix_len(), Some(16));
        assert_eq!(s.segment(1).unwrap().prefix_len(), Some(8));
        assert_eq!(s.segment(0).unwrap().prefix_len(), None);
    }

    #[test]
    fn test_count_and_bounds() {
        let s = sect(&[(10, 10), (0, 3), (5, 6), (0, 255)]);
        assert_eq!(s.count(), BigUint::from(4u32 * 2 * 256));
        assert!(!s.is_sequential());
        assert_eq!(s.lower().bytes(), &[10, 0, 5, 0]);
        assert_eq!(s.upper().bytes(), &[10, 3, 6, 255]);
        assert_eq!(s.upper_bytes(), &[10, 3, 6, 255]);
        assert_eq!(s.lower_value(), BigUint::from(0x0a000500u32));
        assert_eq!(s.lower_u64(), Some(0x0a000500));

        let single = sect(&[(1, 1), (2, 2)]);
        assert!(Arc::ptr_eq(&single.lower().inner, &single.inner));
        assert_eq!(single.count(), BigUint::one());
    }

    #[test]
    fn test_sequential() {
        assert!(sect(&[(10, 10), (0, 3), (0, 255)]).is_sequential());
        assert!(sect(&[(10, 10), (3, 3), (7, 7)]).is_sequential());
        assert!(!sect(&[(0, 1), (0, 1)]).is_sequential());
    }

    #[test]
    fn test_contains() {
        let big = sect(&[(10, 10), (0, 255)]);
        assert!(big.contains(&sect(&[(10, 10), (4, 9)])));
        assert!(!big.contains(&sect(&[(11, 11), (4, 9)])));
        assert!(!big.contains(&sect(&[(10, 10)])));
    }

    #[test]
    fn test_ordering() {
        let a = sect(&[(10, 10), (0, 0)]);
        let b = sect(&[(10, 10), (0, 255)]);
        let c = sect(&[(10, 10), (1, 1)]);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn test_join() {
        let s = sect(&[(10, 10), (0, 3), (0, 255), (0, 255)]);
        let j = s.join_all().unwrap();
        assert_eq!(j.bit_count(), 32);
        assert_eq!(j.lower_u64(), Some(0x0a000000));
        assert_eq!(j.upper_u64(), Some(0x0a03ffff));

        let bad = sect(&[(0, 1), (5, 5)]);
        assert!(matches!(bad.join_all(), Err(AddressError::IncompatibleRange { .. })));

        let halves = s.joined(2).unwrap();
        assert_eq!(halves.segment_count(), 2);
        assert_eq!(halves.segment(1).unwrap().bit_count(), 16);
        assert!(halves.segment(1).unwrap().is_full_range());
    }

    #[test]
    fn test_join_wide() {
        let divs: Vec<Segment> = (0..8)
            .map(|_| Segment::with_range(16, 0, 0xffff, None).unwrap())
            .collect();
        let s = Section::new(divs).unwrap();
        let j = s.join_all().unwrap();
        assert!(!j.is_native());
        assert!(j.is_full_range());
        assert_eq!(s.count(), BigUint::one() << 128usize);
    }

    #[test]
    fn test_to_be_bytes() {
        assert_eq!(to_be_bytes(&BigUint::zero(), 4), vec![0, 0, 0, 0]);
        assert_eq!(to_be_bytes(&BigUint::from(0x0102u32), 4), vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_too_wide() {
        let divs: Vec<Segment> = (0..5)
            .map(|_| Segment::with_range(64, 0, 1, None).unwrap())
            .collect();
        assert!(matches!(Section::new(divs), Err(AddressError::InvalidBitCount(320))));
    }
}
