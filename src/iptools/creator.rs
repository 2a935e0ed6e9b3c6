// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    addresses::Address,
    bits::RangeInt,
    family::{FamilyConfig, IpFam, PrefixPolicy},
    section::Section,
    segment::{Bounds, Segment},
    AddressError,
};
use lazy_static::lazy_static;
use num_bigint::BigUint;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::OnceLock};

/// Single values below this get a fixed interning slot.
const SINGLES_MAX: usize = 256;
/// Upper bound on interned ranged (or prefixed) segments per creator.
const RANGES_MAX: usize = 4096;

// One shared creator per family and prefix policy.
// Built on first use, once per program execution.
lazy_static! {
    static ref V4_SUBNETS: Creator = Creator::new(IpFam::V4, PrefixPolicy::PrefixedAreSubnets);
    static ref V4_EXPLICIT: Creator = Creator::new(IpFam::V4, PrefixPolicy::ExplicitSubnets);
    static ref V6_SUBNETS: Creator = Creator::new(IpFam::V6, PrefixPolicy::PrefixedAreSubnets);
    static ref V6_EXPLICIT: Creator = Creator::new(IpFam::V6, PrefixPolicy::ExplicitSubnets);
}

type RangeKey = (u64, u64, Option<u8>);

/**
Builds segments, sections and addresses of one address family.

Enforces the family layout (segment count and width) and applies the
[PrefixPolicy]: under [PrefixPolicy::PrefixedAreSubnets] a prefix length
given here expands the values to the whole prefix block.

Small single values and recently built ranges are interned, so equal
segments share one instance. Interning races are benign: two threads may
build the same segment, one of them ends up cached.
*/
pub struct Creator {
    config: &'static FamilyConfig,
    policy: PrefixPolicy,
    singles: Box<[OnceLock<Segment>]>,
    ranges: RwLock<HashMap<RangeKey, Segment>>,
}

impl Creator {
    pub fn new(fam: IpFam, policy: PrefixPolicy) -> Self {
        let config: &'static FamilyConfig = fam.config();
        let slots: usize = SINGLES_MAX.min(config.max_segment_value as usize + 1);
        Self {
            config,
            policy,
            singles: (0..slots).map(|_| OnceLock::new()).collect(),
            ranges: RwLock::new(HashMap::new()),
        }
    }

    /// Shared creator for a family and policy.
    pub fn get(fam: IpFam, policy: PrefixPolicy) -> &'static Creator {
        match (fam, policy) {
            (IpFam::V4, PrefixPolicy::PrefixedAreSubnets) => &V4_SUBNETS,
            (IpFam::V4, PrefixPolicy::ExplicitSubnets) => &V4_EXPLICIT,
            (IpFam::V6, PrefixPolicy::PrefixedAreSubnets) => &V6_SUBNETS,
            (IpFam::V6, PrefixPolicy::ExplicitSubnets) => &V6_EXPLICIT,
        }
    }

    pub fn ipv4() -> &'static Creator {
        Self::get(IpFam::V4, PrefixPolicy::default())
    }

    pub fn ipv6() -> &'static Creator {
        Self::get(IpFam::V6, PrefixPolicy::default())
    }

    #[inline]
    pub fn family(&self) -> IpFam {
        self.config.fam
    }

    #[inline]
    pub fn policy(&self) -> PrefixPolicy {
        self.policy
    }

    #[inline]
    pub fn config(&self) -> &'static FamilyConfig {
        self.config
    }

    /// Shared instance for a segment of this family's width.
    pub(crate) fn intern(&self, bounds: Bounds, prefix: Option<u8>) -> Segment {
        let bits: u8 = self.config.bits_per_segment;
        let (lower, upper) = match bounds {
            Bounds::Native { lower, upper } => (lower, upper),
            wide => return Segment::from_parts(bits, wide, prefix),
        };
        if lower == upper && prefix.is_none() && (lower as usize) < self.singles.len() {
            return self.singles[lower as usize]
                .get_or_init(|| Segment::from_parts(bits, Bounds::Native { lower, upper }, None))
                .clone();
        }
        let key: RangeKey = (lower, upper, prefix);
        if let Some(seg) = self.ranges.read().get(&key) {
            return seg.clone();
        }
        let seg: Segment = Segment::from_parts(bits, Bounds::Native { lower, upper }, prefix);
        let mut map = self.ranges.write();
        if map.len() >= RANGES_MAX {
            tracing::trace!(fam = ?self.config.fam, lower, upper, "range cache full");
            return seg;
        }
        map.entry(key).or_insert(seg).clone()
    }

    /* ---------------------------------- */

    /// Single-valued segment.
    pub fn segment(&self, value: u64) -> Result<Segment, AddressError> {
        self.check_value(value)?;
        Ok(self.intern(Bounds::Native { lower: value, upper: value }, None))
    }

    /**
    Segment covering `lower..=upper` (swapped if reversed), with an optional
    segment-local prefix.

    Under [PrefixPolicy::PrefixedAreSubnets] a prefix expands the range to the
    enclosing block(s).
    */
    pub fn range_segment(&self, lower: u64, upper: u64, prefix: Option<u8>) -> Result<Segment, AddressError> {
        let bits: u8 = self.config.bits_per_segment;
        let (lower, upper) = if lower <= upper { (lower, upper) } else { (upper, lower) };
        self.check_value(upper)?;
        if let Some(p) = prefix {
            if p > bits {
                return Err(AddressError::PrefixLengthOutOfRange { prefix: p as i32, max: bits });
            }
        }
        let seg: Segment = self.intern(Bounds::Native { lower, upper }, prefix);
        match (self.policy, prefix) {
            (PrefixPolicy::PrefixedAreSubnets, Some(p)) => Ok(seg.to_prefix_block(p)),
            _ => Ok(seg),
        }
    }

    /**
    Section of exactly this family's segments. The prefix length is taken
    from `prefix`, or else from the first segment carrying one.

    ## Errors
    - [AddressError::InvalidSegmentCount] for the wrong number of segments
    - [AddressError::SizeMismatch] for a segment of the wrong width
    - [AddressError::PrefixLengthOutOfRange] for a prefix beyond the bit count
    */
    pub fn section(&self, segments: Vec<Segment>, prefix: Option<u8>) -> Result<Section, AddressError> {
        self.check_count(segments.len())?;
        let bits: u8 = self.config.bits_per_segment;
        if let Some(s) = segments.iter().find(|s| s.bit_count() != bits) {
            return Err(AddressError::SizeMismatch {
                left: bits as u32,
                right: s.bit_count() as u32,
            });
        }
        let section: Section = Section::from_segments(segments, Some(self.config.fam), self.policy, prefix)?;
        Ok(self.apply_policy(section))
    }

    /// Section of single values, most significant first.
    pub fn section_from_values(&self, values: &[u64], prefix: Option<u8>) -> Result<Section, AddressError> {
        self.check_count(values.len())?;
        let segments: Vec<Segment> = values
            .iter()
            .map(|&v| self.segment(v))
            .collect::<Result<Vec<Segment>, AddressError>>()?;
        self.section(segments, prefix)
    }

    /// Section of `(lower, upper)` segment ranges, most significant first.
    pub fn section_from_ranges(&self, ranges: &[(u64, u64)], prefix: Option<u8>) -> Result<Section, AddressError> {
        self.check_count(ranges.len())?;
        let segments: Vec<Segment> = ranges
            .iter()
            .map(|&(l, u)| self.range_segment(l, u, None))
            .collect::<Result<Vec<Segment>, AddressError>>()?;
        self.section(segments, prefix)
    }

    /**
    Section from big-endian bytes.

    Input shorter than the family width is sign extended: padded with `0xff`
    if the first byte has its high bit set, with zeros otherwise. Longer input
    is accepted when the surplus leading bytes are pure sign extension (all
    `0x00`, or all `0xff` followed by a byte with the high bit set).

    ## Errors
    - [AddressError::InvalidSegmentCount] for longer input that is not sign extension
    */
    pub fn section_from_bytes(&self, bytes: &[u8], prefix: Option<u8>) -> Result<Section, AddressError> {
        let bytes: Vec<u8> = sign_extend(bytes, self.config.byte_count())?;
        let values: Vec<u64> = bytes
            .chunks(self.config.bytes_per_segment)
            .map(|c| c.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
            .collect();
        self.section_from_values(&values, prefix)
    }

    /// Section holding one integer value of the full family width.
    pub fn section_from_value(&self, value: &BigUint, prefix: Option<u8>) -> Result<Section, AddressError> {
        let bits: u8 = self.config.bit_count();
        if value.bits() > bits as u64 {
            return Err(AddressError::ValueOutOfRange {
                value: value.clone(),
                bits,
            });
        }
        let width: usize = self.config.bits_per_segment as usize;
        let mask: BigUint = BigUint::ones(width as u32);
        let values: Vec<u64> = (0..self.config.segment_count)
            .rev()
            .map(|i| {
                let digit: BigUint = (value >> (i * width)) & &mask;
                digit.iter_u64_digits().next().unwrap_or(0)
            })
            .collect();
        self.section_from_values(&values, prefix)
    }

    /// Section of values already known to fit the layout.
    pub(crate) fn known_section(&self, values: &[u64], prefix: Option<u8>) -> Section {
        let segments: Vec<Segment> = values
            .iter()
            .map(|&v| self.intern(Bounds::Native { lower: v, upper: v }, None))
            .collect();
        let section: Section = Section::build(segments, Some(self.config.fam), self.policy, prefix);
        self.apply_policy(section)
    }

    /// Address over a section of this family.
    pub fn address(&self, section: Section) -> Result<Address, AddressError> {
        if section.family() != Some(self.config.fam) || section.policy() != self.policy {
            return Err(AddressError::NetworkMismatch);
        }
        Address::new(section)
    }

    /// Address from big-endian bytes; see [Creator::section_from_bytes].
    pub fn address_from_bytes(&self, bytes: &[u8], prefix: Option<u8>) -> Result<Address, AddressError> {
        Address::new(self.section_from_bytes(bytes, prefix)?)
    }

    /* ---------------------------------- */

    fn apply_policy(&self, section: Section) -> Section {
        match self.policy {
            PrefixPolicy::PrefixedAreSubnets => section.to_prefix_block(),
            PrefixPolicy::ExplicitSubnets => section,
        }
    }

    fn check_count(&self, actual: usize) -> Result<(), AddressError> {
        if actual != self.config.segment_count {
            return Err(AddressError::InvalidSegmentCount {
                expected: self.config.segment_count,
                actual,
            });
        }
        Ok(())
    }

    fn check_value(&self, value: u64) -> Result<(), AddressError> {
        if value > self.config.max_segment_value {
            return Err(AddressError::ValueOutOfRange {
                value: value.into(),
                bits: self.config.bits_per_segment,
            });
        }
        Ok(())
    }
}

/// Fit `bytes` to exactly `len` bytes under two's-complement sign extension.
pub(crate) fn sign_extend(bytes: &[u8], len: usize) -> Result<Vec<u8>, AddressError> {
    if bytes.len() <= len {
        let negative: bool = bytes.first().is_some_and(|b| b & 0x80 != 0);
        let pad: u8 = if negative { 0xff } else { 0x00 };
        let mut out: Vec<u8> = vec![pad; len - bytes.len()];
        out.extend_from_slice(bytes);
        return Ok(out);
    }
    let (extra, kept) = bytes.split_at(bytes.len() - len);
    let zeros: bool = extra.iter().all(|&b| b == 0x00);
    let ones: bool = extra.iter().all(|&b| b == 0xff) && kept.first().is_some_and(|b| b & 0x80 != 0);
    if zeros || ones {
        return Ok(kept.to_vec());
    }
    Err(AddressError::InvalidSegmentCount {
        expected: len,
        actual: bytes.len(),
    })
}

/* -------------------------------------------------------------------------- */
