// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prefix (CIDR block) queries and prefix-driven transformations of a [Section].

use super::{
    bits::RangeInt,
    check_prefix,
    family::PrefixPolicy,
    section::Section,
    segment::{Bounds, Segment},
    AddressError,
};
use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Position of a division relative to a prefix boundary.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Side {
    /// entirely inside the network part
    Network,
    /// split by the boundary; holds the local prefix (`1..width`)
    Boundary(u8),
    /// entirely inside the host part
    Host,
}

#[inline]
pub(crate) fn side(len: u8, offset: u32, width: u8) -> Side {
    let len: u32 = len as u32;
    if len >= offset + width as u32 {
        Side::Network
    } else if len <= offset {
        Side::Host
    } else {
        Side::Boundary((len - offset) as u8)
    }
}

impl Section {
    /// Each division with its [Side] for `len`.
    pub(crate) fn sides(&self, len: u8) -> impl Iterator<Item = (&Segment, Side)> + '_ {
        let mut offset: u32 = 0;
        self.segments().iter().map(move |s| {
            let sd: Side = side(len, offset, s.bit_count());
            offset += s.bit_count() as u32;
            (s, sd)
        })
    }

    fn checked_len(&self, len: u8) -> Result<u8, AddressError> {
        check_prefix(len as i32, self.bit_count())
    }

    /**
    Whether the section is a range of whole prefix blocks for `len`: the
    division holding the boundary spans complete blocks of its local prefix
    and every later division is full range. Earlier divisions may be ranges.
    */
    pub fn is_prefix_block(&self, len: u8) -> bool {
        if len > self.bit_count() {
            return false;
        }
        self.sides(len).all(|(s, sd)| match sd {
            Side::Network => true,
            Side::Boundary(p) => s.is_prefix_block(p),
            Side::Host => s.is_full_range(),
        })
    }

    /// Like [Section::is_prefix_block], but the network part must be a single
    /// value, so the section is exactly one block.
    pub fn is_single_prefix_block(&self, len: u8) -> bool {
        if len > self.bit_count() {
            return false;
        }
        self.sides(len).all(|(s, sd)| match sd {
            Side::Network => !s.is_multiple(),
            Side::Boundary(p) => s.is_single_prefix_block(p),
            Side::Host => s.is_full_range(),
        })
    }

    /// Whether the section has a prefix length and is a block for it.
    pub fn is_prefixed_block(&self) -> bool {
        self.prefix_len().is_some_and(|p| self.is_prefix_block(p))
    }

    /**
    Smallest `len` for which [Section::is_prefix_block] holds.

    Walks from the least significant division: a full range division moves
    the boundary across it entirely, the first other division settles it.
    */
    pub fn min_prefix_len_for_block(&self) -> u8 {
        self.cached_min_prefix(|| {
            let mut total: u8 = self.bit_count();
            for s in self.segments().iter().rev() {
                let p: u8 = s.min_prefix_len_for_block();
                total -= s.bit_count() - p;
                if p != 0 {
                    break;
                }
            }
            total
        })
    }

    /**
    The prefix length for which the whole section is exactly one prefix block.

    `None` when no such length exists. Note that a segment `0x000-0xfff` is a
    block (prefix 4 in 16 bits) while `0x001-0xfff` is not, however similar
    their textual forms may look.
    */
    pub fn prefix_len_for_single_block(&self) -> Option<u8> {
        self.cached_single_block(|| {
            let p: u8 = self.min_prefix_len_for_block();
            match self.is_single_prefix_block(p) {
                true => Some(p),
                false => None,
            }
        })
    }

    /// Number of distinct `len`-bit prefixes among the values.
    pub fn prefix_count(&self, len: u8) -> Result<BigUint, AddressError> {
        let len: u8 = self.checked_len(len)?;
        Ok(self.sides(len).fold(BigUint::one(), |acc, (s, sd)| match sd {
            Side::Network => acc * s.value_count(),
            Side::Boundary(p) => {
                let shift: usize = (s.bit_count() - p) as usize;
                acc * ((s.upper_value() >> shift) - (s.lower_value() >> shift) + 1u32)
            }
            Side::Host => acc,
        }))
    }

    /// The network part (first `len` bits) holds a single value.
    pub fn is_single_network(&self) -> bool {
        let len: u8 = match self.prefix_len() {
            Some(p) => p,
            None => return !self.is_multiple(),
        };
        self.sides(len).all(|(s, sd)| match sd {
            Side::Network => !s.is_multiple(),
            Side::Boundary(p) => {
                let shift: usize = (s.bit_count() - p) as usize;
                (s.lower_value() >> shift) == (s.upper_value() >> shift)
            }
            Side::Host => true,
        })
    }

    /* ---------------------------------- */

    /// Same values, annotated with `len`. Under [PrefixPolicy::PrefixedAreSubnets]
    /// the values are expanded to the prefix block first.
    pub fn set_prefix_len(&self, len: u8) -> Result<Section, AddressError> {
        let len: u8 = self.checked_len(len)?;
        match self.policy() {
            PrefixPolicy::PrefixedAreSubnets => self.to_prefix_block_len(len),
            PrefixPolicy::ExplicitSubnets => Ok(self.derive(self.segments().to_vec(), Some(len))),
        }
    }

    /// Same values without a prefix length.
    pub fn without_prefix_len(&self) -> Section {
        self.derive(self.segments().to_vec(), None)
    }

    /// Move the prefix by `delta` bits; a section without prefix counts as
    /// fully prefixed.
    pub fn adjust_prefix_len(&self, delta: i32) -> Result<Section, AddressError> {
        let base: i32 = self.prefix_len().unwrap_or(self.bit_count()) as i32;
        let len: u8 = check_prefix(base + delta, self.bit_count())?;
        self.set_prefix_len(len)
    }

    /// Expand to the prefix block(s) of the current prefix; unchanged without one.
    pub fn to_prefix_block(&self) -> Section {
        match self.prefix_len() {
            Some(p) => self.expand_to_blocks(p),
            None => self.clone(),
        }
    }

    /// Expand to the prefix block(s) of `len`, annotated with `len`.
    pub fn to_prefix_block_len(&self, len: u8) -> Result<Section, AddressError> {
        let len: u8 = self.checked_len(len)?;
        Ok(self.expand_to_blocks(len))
    }

    fn expand_to_blocks(&self, len: u8) -> Section {
        if self.prefix_len() == Some(len) && self.is_prefix_block(len) {
            return self.clone();
        }
        let divs: Vec<Segment> = self
            .sides(len)
            .map(|(s, sd)| match sd {
                Side::Network => s.clone(),
                Side::Boundary(p) => s.to_prefix_block(p),
                Side::Host => s.to_prefix_block(0),
            })
            .collect();
        self.derive(divs, Some(len))
    }

    /// Annotate with the single-block prefix length, if there is one.
    pub fn assign_prefix_for_single_block(&self) -> Option<Section> {
        let p: u8 = self.prefix_len_for_single_block()?;
        Some(self.derive(self.segments().to_vec(), Some(p)))
    }

    /// Annotate with [Section::min_prefix_len_for_block].
    pub fn assign_min_prefix_for_block(&self) -> Section {
        let p: u8 = self.min_prefix_len_for_block();
        self.derive(self.segments().to_vec(), Some(p))
    }

    /* ---------------------------------- */

    /// Some value has all host bits zero for `len`.
    pub fn includes_zero_host_len(&self, len: u8) -> bool {
        len <= self.bit_count()
            && self.sides(len).all(|(s, sd)| match sd {
                Side::Network => true,
                Side::Boundary(p) => host_bits_of(s, p, false),
                Side::Host => host_bits_of(s, 0, false),
            })
    }

    pub fn includes_zero_host(&self) -> bool {
        self.prefix_len().is_some_and(|p| self.includes_zero_host_len(p))
    }

    /// Some value has all host bits one for `len`.
    pub fn includes_max_host_len(&self, len: u8) -> bool {
        len <= self.bit_count()
            && self.sides(len).all(|(s, sd)| match sd {
                Side::Network => true,
                Side::Boundary(p) => host_bits_of(s, p, true),
                Side::Host => host_bits_of(s, 0, true),
            })
    }

    pub fn includes_max_host(&self) -> bool {
        self.prefix_len().is_some_and(|p| self.includes_max_host_len(p))
    }

    /// Every value has all host bits zero for `len`.
    pub fn is_zero_host_len(&self, len: u8) -> bool {
        len <= self.bit_count()
            && self.sides(len).all(|(s, sd)| match sd {
                Side::Network => true,
                Side::Boundary(p) => (s.upper_value() & bits_host(s, p)).is_zero(),
                Side::Host => s.upper_value().is_zero(),
            })
    }

    pub fn is_zero_host(&self) -> bool {
        self.prefix_len().is_some_and(|p| self.is_zero_host_len(p))
    }

    /**
    Lowest address of each prefix block: every host bit cleared.

    Without a prefix the whole section is host, giving the all-zero value.

    ## Errors
    - [AddressError::IncompatibleRange] if the division holding the boundary
      cannot be masked into a contiguous range
    */
    pub fn to_zero_host(&self) -> Result<Section, AddressError> {
        match self.prefix_len() {
            None => self.host_fill(0, false, None),
            Some(p) => {
                if self.includes_zero_host() && self.is_single_network() {
                    return Ok(self.lower());
                }
                self.host_fill(p, false, Some(p))
            }
        }
    }

    /// [Section::to_zero_host] for `len`, keeping the current prefix annotation.
    pub fn to_zero_host_len(&self, len: u8) -> Result<Section, AddressError> {
        let len: u8 = self.checked_len(len)?;
        self.host_fill(len, false, self.prefix_len())
    }

    /// Highest address of each prefix block: every host bit set.
    pub fn to_max_host(&self) -> Result<Section, AddressError> {
        match self.prefix_len() {
            None => self.host_fill(0, true, None),
            Some(p) => {
                if self.includes_max_host() && self.is_single_network() {
                    return Ok(self.upper());
                }
                self.host_fill(p, true, Some(p))
            }
        }
    }

    /// [Section::to_max_host] for `len`, keeping the current prefix annotation.
    pub fn to_max_host_len(&self, len: u8) -> Result<Section, AddressError> {
        let len: u8 = self.checked_len(len)?;
        self.host_fill(len, true, self.prefix_len())
    }

    fn host_fill(&self, len: u8, ones: bool, prefix: Option<u8>) -> Result<Section, AddressError> {
        let mut divs: Vec<Segment> = Vec::with_capacity(self.segment_count());
        for (s, sd) in self.sides(len) {
            divs.push(match (sd, ones) {
                (Side::Network, _) => s.clone(),
                (Side::Boundary(p), false) => s.mask_network(p)?,
                (Side::Boundary(p), true) => s.or_host(p)?,
                (Side::Host, _) => {
                    let v: BigUint = if ones { s.max_value() } else { BigUint::zero() };
                    self.new_segment(s.bit_count(), Bounds::from_big(s.bit_count(), v.clone(), v), None)
                }
            });
        }
        Ok(self.derive(divs, prefix))
    }

    /* ---------------------------------- */

    /**
    Mask every value with the lower value of `mask`, division by division.

    The result carries no prefix length.

    ## Errors
    - [AddressError::SizeMismatch] / [AddressError::NetworkMismatch] for operands
      of another layout or configuration
    - [AddressError::IncompatibleRange] if a division would fragment
    */
    pub fn mask(&self, mask: &Section) -> Result<Section, AddressError> {
        self.check_compatible(mask)?;
        let divs: Vec<Segment> = self
            .segments()
            .iter()
            .zip(mask.segments())
            .map(|(s, m)| s.mask(m))
            .collect::<Result<Vec<Segment>, AddressError>>()?;
        Ok(self.derive(divs, None))
    }

    /// Bitwise OR of every value with the lower value of `operand`.
    pub fn bitwise_or(&self, operand: &Section) -> Result<Section, AddressError> {
        self.check_compatible(operand)?;
        let divs: Vec<Segment> = self
            .segments()
            .iter()
            .zip(operand.segments())
            .map(|(s, m)| s.bitwise_or(m))
            .collect::<Result<Vec<Segment>, AddressError>>()?;
        Ok(self.derive(divs, None))
    }

    /// The network (mask) section for `len` in this layout: network bits set.
    pub fn network_mask(&self, len: u8) -> Result<Section, AddressError> {
        let len: u8 = self.checked_len(len)?;
        let divs: Vec<Segment> = self
            .sides(len)
            .map(|(s, sd)| {
                let b: u8 = s.bit_count();
                let bounds: Bounds = match sd {
                    Side::Network => Bounds::mask_for(b, b, false),
                    Side::Boundary(p) => Bounds::mask_for(b, p, false),
                    Side::Host => Bounds::mask_for(b, 0, false),
                };
                self.new_segment(b, bounds, None)
            })
            .collect();
        Ok(self.derive(divs, None))
    }

    /// The host mask section for `len` in this layout: host bits set.
    pub fn host_mask(&self, len: u8) -> Result<Section, AddressError> {
        let len: u8 = self.checked_len(len)?;
        let divs: Vec<Segment> = self
            .sides(len)
            .map(|(s, sd)| {
                let b: u8 = s.bit_count();
                let bounds: Bounds = match sd {
                    Side::Network => Bounds::mask_for(b, b, true),
                    Side::Boundary(p) => Bounds::mask_for(b, p, true),
                    Side::Host => Bounds::mask_for(b, 0, true),
                };
                self.new_segment(b, bounds, None)
            })
            .collect();
        Ok(self.derive(divs, None))
    }

    /// The divisions holding the first `len` bits, the last one masked to its
    /// network bits. Carries prefix `len`.
    pub fn network_section(&self, len: u8) -> Result<Section, AddressError> {
        let len: u8 = self.checked_len(len)?;
        let mut divs: Vec<Segment> = Vec::new();
        for (s, sd) in self.sides(len) {
            match sd {
                Side::Network => divs.push(s.clone()),
                Side::Boundary(p) => divs.push(s.mask_network(p)?),
                Side::Host => break,
            }
        }
        Section::from_segments(divs, self.family(), self.policy(), Some(len))
    }

    /// The divisions holding the bits after `len`, the first one masked to
    /// its host bits. Carries no prefix.
    pub fn host_section(&self, len: u8) -> Result<Section, AddressError> {
        let len: u8 = self.checked_len(len)?;
        let mut divs: Vec<Segment> = Vec::new();
        for (s, sd) in self.sides(len) {
            match sd {
                Side::Network => {}
                Side::Boundary(p) => divs.push(s.mask_host(p)?),
                Side::Host => divs.push(s.clone()),
            }
        }
        Section::from_segments(divs, self.family(), self.policy(), None)
    }
}

#[inline]
fn bits_host(s: &Segment, p: u8) -> BigUint {
    BigUint::ones((s.bit_count() - p) as u32)
}

/// The segment holds a value whose host bits (below local `p`) are all zero,
/// or all one when `ones`.
fn host_bits_of(s: &Segment, p: u8, ones: bool) -> bool {
    let host: BigUint = bits_host(s, p);
    let (lower, upper) = (s.lower_value(), s.upper_value());
    match ones {
        // smallest value >= lower with every host bit set
        true => (&lower | &host) <= upper,
        false => {
            let low: BigUint = &lower & &host;
            low.is_zero() || lower - low + host + 1u32 <= upper
        }
    }
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iptools::IpFam;

    fn v4(ranges: [(u64, u64); 4], prefix: Option<u8>) -> Section {
        let divs: Vec<Segment> = ranges
            .iter()
            .map(|&(l, u)| Segment::with_range(8, l, u, None).unwrap())
            .collect();
        Section::from_segments(divs, Some(IpFam::V4), PrefixPolicy::default(), prefix).unwrap()
    }

    #[test]
    fn test_side() {
        assert_eq!(side(16, 0, 8), Side::Network);
        assert_eq!(side(16, 8, 8), Side::Network);
        assert_eq!(side(16, 16, 8), Side::Host);
        assert_eq!(side(20, 16, 8), Side::Boundary(4));
    }

    #[test]
    fn test_prefix_block_192_168() {
        let g = v4([(192, 192), (168, 168), (0, 255), (0, 255)], Some(16));
        assert!(g.is_prefix_block(16));
        assert!(g.is_single_prefix_block(16));
        assert!(g.is_prefixed_block());
        assert_eq!(g.min_prefix_len_for_block(), 16);
        assert_eq!(g.prefix_len_for_single_block(), Some(16));
        assert_eq!(g.count(), BigUint::from(65536u32));
        // every section is trivially a block of its full bit count
        assert!(g.is_prefix_block(32));
        assert!(!g.is_prefix_block(8));
    }

    #[test]
    fn test_range_of_blocks() {
        let g = v4([(10, 10), (0, 3), (0, 255), (0, 255)], None);
        assert!(g.is_prefix_block(16));
        assert!(!g.is_single_prefix_block(16));
        assert!(g.is_single_prefix_block(14));
        assert_eq!(g.min_prefix_len_for_block(), 14);
        assert_eq!(g.prefix_len_for_single_block(), Some(14));
        assert_eq!(g.prefix_count(16).unwrap(), BigUint::from(4u32));
        assert_eq!(g.prefix_count(8).unwrap(), BigUint::one());

        let g = v4([(10, 10), (1, 3), (0, 255), (0, 255)], None);
        assert_eq!(g.min_prefix_len_for_block(), 16);
        assert_eq!(g.prefix_len_for_single_block(), None);
    }

    #[test]
    fn test_zero_and_max_host() {
        let g = v4([(192, 192), (168, 168), (0, 255), (0, 255)], Some(16));
        let zero = g.to_zero_host().unwrap();
        assert_eq!(zero.bytes(), &[192, 168, 0, 0]);
        assert!(!zero.is_multiple());
        assert_eq!(zero.prefix_len(), Some(16));
        let max = g.to_max_host().unwrap();
        assert_eq!(max.bytes(), &[192, 168, 255, 255]);

        // range in the network part: a range of zero hosts
        let g = v4([(10, 10), (0, 3), (0, 255), (7, 9)], Some(16));
        let zero = g.to_zero_host().unwrap();
        assert_eq!(zero.lower().bytes(), &[10, 0, 0, 0]);
        assert_eq!(zero.upper().bytes(), &[10, 3, 0, 0]);

        // no prefix: everything is host
        let g = v4([(1, 1), (2, 2), (3, 3), (4, 4)], None);
        assert_eq!(g.to_zero_host().unwrap().bytes(), &[0, 0, 0, 0]);
        assert_eq!(g.to_max_host().unwrap().bytes(), &[255, 255, 255, 255]);
    }

    #[test]
    fn test_zero_host_incompatible() {
        // 10.0.0.1-10.0.0.2, zero host for /31 fragments into {0, 2}
        let g = v4([(10, 10), (0, 0), (0, 0), (1, 2)], None);
        let r = g.to_zero_host_len(31);
        assert!(matches!(r, Err(AddressError::IncompatibleRange { .. })));
    }

    #[test]
    fn test_host_predicates() {
        let g = v4([(10, 10), (0, 0), (0, 0), (5, 200)], Some(28));
        assert!(g.includes_zero_host());
        assert!(g.includes_max_host());
        assert!(!g.is_zero_host());

        let g = v4([(10, 10), (0, 0), (0, 0), (1, 14)], Some(28));
        assert!(!g.includes_zero_host());
        assert!(!g.includes_max_host());

        let g = v4([(10, 10), (0, 0), (0, 0), (16, 16)], Some(28));
        assert!(g.is_zero_host());
    }

    #[test]
    fn test_set_prefix_policy() {
        let g = v4([(10, 10), (1, 1), (2, 2), (3, 3)], None);
        let b = g.set_prefix_len(16).unwrap();
        assert_eq!(b.prefix_len(), Some(16));
        assert_eq!(b.count(), BigUint::from(65536u32));
        assert_eq!(b.lower().bytes(), &[10, 1, 0, 0]);

        let divs: Vec<Segment> = [10u64, 1, 2, 3].iter().map(|&v| Segment::new(8, v).unwrap()).collect();
        let e = Section::from_segments(divs, None, PrefixPolicy::ExplicitSubnets, None).unwrap();
        let a = e.set_prefix_len(16).unwrap();
        assert_eq!(a.prefix_len(), Some(16));
        assert!(!a.is_multiple());

        assert!(g.set_prefix_len(33).is_err());
        assert_eq!(b.adjust_prefix_len(-8).unwrap().prefix_len(), Some(8));
        assert!(b.adjust_prefix_len(-17).is_err());
        assert_eq!(b.without_prefix_len().prefix_len(), None);
    }

    #[test]
    fn test_to_prefix_block_identity() {
        let g = v4([(192, 192), (168, 168), (0, 255), (0, 255)], Some(16));
        let same = g.to_prefix_block_len(16).unwrap();
        assert_eq!(same, g);
        assert_eq!(g.to_prefix_block(), g);
        let wider = g.to_prefix_block_len(8).unwrap();
        assert_eq!(wider.upper().bytes(), &[192, 255, 255, 255]);
    }

    #[test]
    fn test_assign_prefix() {
        let g = v4([(10, 10), (0, 3), (0, 255), (0, 255)], None);
        assert_eq!(g.assign_prefix_for_single_block().unwrap().prefix_len(), Some(14));
        let g = v4([(10, 10), (1, 3), (0, 255), (0, 255)], None);
        assert!(g.assign_prefix_for_single_block().is_none());
        assert_eq!(g.assign_min_prefix_for_block().prefix_len(), Some(16));
    }

    #[test]
    fn test_mask_scenarios() {
        let netmask = v4([(255, 255), (255, 255), (255, 255), (0, 0)], None);
        let g = v4([(10, 10), (0, 0), (0, 0), (0, 255)], None);
        let m = g.mask(&netmask).unwrap();
        assert!(!m.is_multiple());
        assert_eq!(m.bytes(), &[10, 0, 0, 0]);

        let g = v4([(10, 10), (0, 0), (0, 0), (1, 255)], None);
        assert_eq!(g.mask(&netmask).unwrap().bytes(), &[10, 0, 0, 0]);

        let m254 = v4([(255, 255), (255, 255), (255, 255), (254, 254)], None);
        let g = v4([(10, 10), (0, 0), (0, 0), (1, 2)], None);
        assert!(matches!(g.mask(&m254), Err(AddressError::IncompatibleRange { .. })));

        let hostmask = g.host_mask(24).unwrap();
        let o = g.bitwise_or(&hostmask).unwrap();
        assert_eq!(o.bytes(), &[10, 0, 0, 255]);
        assert_eq!(g.network_mask(24).unwrap(), netmask);
    }

    #[test]
    fn test_network_and_host_sections() {
        let g = v4([(10, 10), (1, 1), (0x37, 0x37), (4, 4)], None);
        let n = g.network_section(20).unwrap();
        assert_eq!(n.segment_count(), 3);
        assert_eq!(n.segment(2).unwrap().lower_u64(), Some(0x30));
        assert_eq!(n.prefix_len(), Some(20));
        let h = g.host_section(20).unwrap();
        assert_eq!(h.segment_count(), 2);
        assert_eq!(h.segment(0).unwrap().lower_u64(), Some(0x07));
        assert_eq!(h.segment(1).unwrap().lower_u64(), Some(4));
    }
}
