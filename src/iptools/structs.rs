// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    collapsing::{merge_spans, to_prefix_blocks, to_sequential_blocks, Span},
    section::Section,
    strings::*,
    AddressError,
};
use num_bigint::BigUint;
use std::fmt;

/**
Inclusive range of single values (endpoints are included), in the layout of
the sections it was built from.

Unlike a [Section], any `lower..=upper` run can be held, whether or not the
divisions could express it.
*/
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct IpRange {
    lower: Section,
    upper: Section,
}

impl IpRange {
    /**
    Create a new [IpRange] from the lowest value of either section to the
    highest. Endpoints are stored without prefix length.

    ## Errors
    - [AddressError::SizeMismatch] / [AddressError::NetworkMismatch] if the
      sections do not share one layout and configuration
    */
    pub fn new(a: &Section, b: &Section) -> Result<Self, AddressError> {
        a.check_compatible(b)?;
        let lower: Section = match a.lower_value() <= b.lower_value() {
            true => a.lower(),
            false => b.lower(),
        };
        let upper: Section = match a.upper_value() >= b.upper_value() {
            true => a.upper(),
            false => b.upper(),
        };
        Ok(Self {
            lower: lower.without_prefix_len(),
            upper: upper.without_prefix_len(),
        })
    }

    /**
    The range a sequential section covers.

    ## Errors
    - [AddressError::IncompatibleRange] if the section is not sequential
    */
    pub fn from_section(s: &Section) -> Result<Self, AddressError> {
        if !s.is_sequential() {
            return Err(AddressError::IncompatibleRange {
                lower: s.lower_value(),
                upper: s.upper_value(),
                operand: s.count(),
            });
        }
        Ok(Self {
            lower: s.lower().without_prefix_len(),
            upper: s.upper().without_prefix_len(),
        })
    }

    fn from_span(template: &Section, r: &Span) -> Self {
        Self {
            lower: template.with_values(&r.lower, &r.lower, None),
            upper: template.with_values(&r.upper, &r.upper, None),
        }
    }

    fn span(&self) -> Span {
        Span {
            lower: self.lower.lower_value(),
            upper: self.upper.upper_value(),
        }
    }

    #[inline]
    pub fn lower(&self) -> &Section {
        &self.lower
    }

    #[inline]
    pub fn upper(&self) -> &Section {
        &self.upper
    }

    /// The number of values in the range. Cannot be a native integer due to
    /// wide layouts.
    pub fn count(&self) -> BigUint {
        self.upper.upper_value() - self.lower.lower_value() + 1u32
    }

    fn same_layout(&self, other: &Section) -> bool {
        self.lower.check_compatible(other).is_ok()
    }

    /// Every value of `s` lies in the range.
    pub fn contains(&self, s: &Section) -> bool {
        self.same_layout(s) && s.lower_value() >= self.lower.lower_value() && s.upper_value() <= self.upper.upper_value()
    }

    pub fn overlaps(&self, other: &IpRange) -> bool {
        self.same_layout(&other.lower)
            && self.lower.lower_value() <= other.upper.upper_value()
            && other.lower.lower_value() <= self.upper.upper_value()
    }

    /// The overlapping run, if any. Ranges of different layouts never overlap.
    pub fn intersect(&self, other: &IpRange) -> Option<IpRange> {
        if !self.overlaps(other) {
            return None;
        }
        let (a, b) = (self.span(), other.span());
        let r: Span = Span {
            lower: a.lower.max(b.lower),
            upper: a.upper.min(b.upper),
        };
        Some(Self::from_span(&self.lower, &r))
    }

    /// What remains of the range without `other`: nothing, one run, or two
    /// runs when `other` is strictly inside.
    pub fn subtract(&self, other: &IpRange) -> Vec<IpRange> {
        if !self.overlaps(other) {
            return vec![self.clone()];
        }
        let (a, b) = (self.span(), other.span());
        let mut out: Vec<IpRange> = Vec::with_capacity(2);
        if b.lower > a.lower {
            let r: Span = Span {
                lower: a.lower.clone(),
                upper: &b.lower - 1u32,
            };
            out.push(Self::from_span(&self.lower, &r));
        }
        if b.upper < a.upper {
            let r: Span = Span {
                lower: &b.upper + 1u32,
                upper: a.upper,
            };
            out.push(Self::from_span(&self.lower, &r));
        }
        out
    }

    /**
    Merge overlapping/adjacent ranges; the result is sorted.

    ## Errors
    - [AddressError::SizeMismatch] / [AddressError::NetworkMismatch] if the
      ranges do not share one layout and configuration
    */
    pub fn join(ranges: &[IpRange]) -> Result<Vec<IpRange>, AddressError> {
        let Some(first) = ranges.first() else {
            return Ok(Vec::new());
        };
        let mut spans: Vec<Span> = Vec::with_capacity(ranges.len());
        for r in ranges {
            first.lower.check_compatible(&r.lower)?;
            spans.push(r.span());
        }
        spans.sort();
        Ok(merge_spans(spans)
            .iter()
            .map(|r| Self::from_span(&first.lower, r))
            .collect())
    }

    /// The minimal prefix blocks covering exactly this range.
    pub fn to_prefix_blocks(&self) -> Vec<Section> {
        to_prefix_blocks(&self.lower, &[self.span()])
    }

    /// The fewest sequential sections covering exactly this range.
    pub fn to_sequential_blocks(&self) -> Vec<Section> {
        to_sequential_blocks(&self.lower, &[self.span()])
    }

    /**
    Return an iterator over all values in the range.

    NOTE: Wide ranges (IPv6 especially) can produce a very large number of
    values. Use with caution.
    */
    pub fn iter(&self) -> IpRangeIterator {
        IpRangeIterator {
            current: self.lower.clone(),
            end: self.upper.upper_value(),
            done: false,
        }
    }
}

impl IntoIterator for IpRange {
    type Item = Section;
    type IntoIter = IpRangeIterator;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{DASH}{}", self.lower, self.upper)
    }
}

/* ---------------------------------- */

/// Iterator over an [IpRange].
pub struct IpRangeIterator {
    current: Section,
    end: BigUint,
    done: bool,
}

impl Iterator for IpRangeIterator {
    type Item = Section;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result: Section = self.current.clone();

        if result.lower_value() >= self.end {
            self.done = true;
        } else {
            match self.current.increment(1) {
                Ok(next) => self.current = next,
                Err(_) => self.done = true,
            }
        }

        Some(result)
    }
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iptools::{Address, Creator};
    use ipnet::IpNet;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    const TEST_V4: &str = "192.168.1.0/30";
    const TEST_V6: &str = "::/126";

    fn v4(a: u8, b: u8, c: u8, d: u8) -> Section {
        Address::from(Ipv4Addr::new(a, b, c, d)).into_section()
    }

    fn range(lo: u8, hi: u8) -> IpRange {
        IpRange::new(&v4(10, 0, 0, lo), &v4(10, 0, 0, hi)).unwrap()
    }

    fn ips(items: impl Iterator<Item = Section>) -> Vec<IpAddr> {
        items.map(|s| Address::new(s).unwrap().to_ip_addr()).collect()
    }

    #[test]
    fn test_iprange_iter_v4() {
        let ip_range: IpRange = range(1, 5);
        let expected: Vec<IpAddr> = (1..=5).map(|d| IpAddr::V4(Ipv4Addr::new(10, 0, 0, d))).collect();
        assert_eq!(ips(ip_range.iter()), expected);
        assert_eq!(ip_range.count(), BigUint::from(5u32));
        assert_eq!(ips(ip_range.into_iter()).len(), 5);
    }

    #[test]
    fn test_iprange_iter_v6() {
        let a = Address::from(Ipv6Addr::from(1u128)).into_section();
        let b = Address::from(Ipv6Addr::from(5u128)).into_section();
        let ip_range: IpRange = IpRange::new(&b, &a).unwrap();
        let expected: Vec<IpAddr> = (1..=5u128).map(|v| IpAddr::V6(Ipv6Addr::from(v))).collect();
        assert_eq!(ips(ip_range.iter()), expected);
    }

    #[test]
    fn test_from_section() {
        let net: IpNet = TEST_V4.parse().unwrap();
        let r = IpRange::from_section(&Address::from(net)).unwrap();
        assert_eq!(r.count(), BigUint::from(4u32));
        assert_eq!(r.lower().prefix_len(), None);
        assert_eq!(r.to_prefix_blocks().len(), 1);

        let net: IpNet = TEST_V6.parse().unwrap();
        let r = IpRange::from_section(&Address::from(net)).unwrap();
        assert_eq!(r.count(), BigUint::from(4u32));

        let split: Section = Creator::ipv4()
            .section_from_ranges(&[(10, 10), (0, 1), (5, 5), (0, 0)], None)
            .unwrap();
        assert!(matches!(IpRange::from_section(&split), Err(AddressError::IncompatibleRange { .. })));
    }

    #[test]
    fn test_set_ops() {
        let r = range(10, 20);
        assert!(r.overlaps(&range(20, 30)));
        assert!(!r.overlaps(&range(21, 30)));
        assert_eq!(r.intersect(&range(15, 30)).unwrap(), range(15, 20));
        assert!(r.intersect(&range(21, 30)).is_none());

        assert_eq!(r.subtract(&range(12, 14)), vec![range(10, 11), range(15, 20)]);
        assert_eq!(r.subtract(&range(0, 14)), vec![range(15, 20)]);
        assert!(r.subtract(&range(0, 255)).is_empty());
        assert_eq!(r.subtract(&range(30, 40)), vec![r.clone()]);

        assert!(r.contains(&v4(10, 0, 0, 15)));
        assert!(!r.contains(&v4(10, 0, 0, 21)));
    }

    #[test]
    fn test_join() {
        let joined = IpRange::join(&[range(30, 40), range(10, 20), range(21, 25)]).unwrap();
        assert_eq!(joined, vec![range(10, 25), range(30, 40)]);
        assert!(IpRange::join(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_blocks() {
        let r = IpRange::new(&v4(10, 0, 0, 250), &v4(10, 0, 1, 5)).unwrap();
        assert_eq!(r.to_sequential_blocks().len(), 2);
        // .250/31 .252/30 1.0/30 1.4/31
        assert_eq!(r.to_prefix_blocks().len(), 4);
        assert_eq!(r.to_string(), "10.0.0.250-10.0.1.5");
    }
}
