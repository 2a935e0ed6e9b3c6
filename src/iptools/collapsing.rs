// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    bits::RangeInt,
    section::Section,
    segment::{Bounds, Segment},
    AddressError,
};
use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Inclusive run of values `lower..=upper` in the integer space of a layout.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub(crate) struct Span {
    pub lower: BigUint,
    /// inclusive
    pub upper: BigUint,
}

impl Span {
    fn of(s: &Section) -> Self {
        Span {
            lower: s.lower_value(),
            upper: s.upper_value(),
        }
    }
}

/**
Merge sections into an equivalent, minimal set of prefix blocks.
- removes values covered more than once
- merges adjacent/overlapping ranges

The union of the returned blocks is exactly the union of the inputs, the
blocks are disjoint and sorted, and no two of them combine into one larger
block. Each block carries its prefix length.

This does *not* enumerate values, apart from splitting non-sequential inputs
into their sequential blocks.

## Errors
- [AddressError::SizeMismatch] / [AddressError::NetworkMismatch] if the inputs
  do not share one layout and configuration
*/
pub fn merge_to_prefix_blocks(sections: &[Section]) -> Result<Vec<Section>, AddressError> {
    let Some(template) = sections.first() else {
        return Ok(Vec::new());
    };
    let merged: Vec<Span> = collect_spans(sections)?;
    Ok(to_prefix_blocks(template, &merged))
}

/**
Merge sections into an equivalent, minimal set of sequential sections.

Never returns more sections than [merge_to_prefix_blocks]; a contiguous
union that is itself representable comes back as a single section.
*/
pub fn merge_to_sequential_blocks(sections: &[Section]) -> Result<Vec<Section>, AddressError> {
    let Some(template) = sections.first() else {
        return Ok(Vec::new());
    };
    let merged: Vec<Span> = collect_spans(sections)?;
    Ok(to_sequential_blocks(template, &merged))
}

/**
Like [merge_to_prefix_blocks], but nearby runs separated by <= `max_gap`
values are merged as well (over-approximation).
*/
pub fn merge_to_prefix_blocks_fuzzy(sections: &[Section], max_gap: &BigUint) -> Result<Vec<Section>, AddressError> {
    let Some(template) = sections.first() else {
        return Ok(Vec::new());
    };
    let merged: Vec<Span> = merge_spans_fuzzy(&collect_spans(sections)?, max_gap);
    Ok(to_prefix_blocks(template, &merged))
}

/**
The minimal prefix blocks covering every value from the lowest value of `a`
and `b` to the highest, whether or not the values in between belong to
either of them.
*/
pub fn span_with_prefix_blocks(a: &Section, b: &Section) -> Result<Vec<Section>, AddressError> {
    let span: Span = span_between(a, b)?;
    Ok(to_prefix_blocks(a, &[span]))
}

/// [span_with_prefix_blocks] with sequential sections instead of prefix
/// blocks; often a single section suffices.
pub fn span_with_sequential_blocks(a: &Section, b: &Section) -> Result<Vec<Section>, AddressError> {
    let span: Span = span_between(a, b)?;
    Ok(to_sequential_blocks(a, &[span]))
}

/* ---------------------------------- */

fn span_between(a: &Section, b: &Section) -> Result<Span, AddressError> {
    a.check_compatible(b)?;
    Ok(Span {
        lower: a.lower_value().min(b.lower_value()),
        upper: a.upper_value().max(b.upper_value()),
    })
}

/// Sorted and merged runs covering every input.
fn collect_spans(sections: &[Section]) -> Result<Vec<Span>, AddressError> {
    let mut spans: Vec<Span> = Vec::with_capacity(sections.len());
    if let Some(first) = sections.first() {
        for s in sections {
            first.check_compatible(s)?;
            match s.is_sequential() {
                true => spans.push(Span::of(s)),
                false => spans.extend(s.sequential_block_iter().map(|b| Span::of(&b))),
            }
        }
    }

    // 1) Sort runs
    spans.sort();

    // 2) Merge overlaps/adjacent
    let merged: Vec<Span> = merge_spans(spans);
    tracing::trace!(inputs = sections.len(), runs = merged.len(), "merged spans");
    Ok(merged)
}

/// Merge overlapping/adjacent runs. Input must be sorted.
pub(crate) fn merge_spans(sorted: Vec<Span>) -> Vec<Span> {
    let mut out: Vec<Span> = Vec::with_capacity(sorted.len());
    for r in sorted {
        if let Some(last) = out.last_mut() {
            // overlap or adjacency?
            if r.lower <= &last.upper + 1u32 {
                if r.upper > last.upper {
                    last.upper = r.upper;
                }
                continue;
            }
        }
        out.push(r);
    }
    out
}

/**
Merge nearby runs separated by <= `max_gap` values (fuzzy over-approximation).

Input must be sorted and previously merged, or it'll be a GIGO situation.
*/
fn merge_spans_fuzzy(merged: &[Span], max_gap: &BigUint) -> Vec<Span> {
    let mut out: Vec<Span> = Vec::with_capacity(merged.len());
    for r in merged.iter().cloned() {
        if let Some(last) = out.last_mut() {
            let gap: BigUint = &r.lower - &last.upper - 1u32;
            if gap <= *max_gap {
                // swallow the gap by extending the upper bound
                last.upper = r.upper.max(last.upper.clone());
                continue;
            }
        }
        out.push(r);
    }
    out
}

/// Decompose a run into the minimal set of prefix blocks: `(lower, prefix)`.
pub(crate) fn span_to_prefix_blocks(r: &Span, bits: u8) -> Vec<(BigUint, u8)> {
    let mut start: BigUint = r.lower.clone();
    let mut out: Vec<(BigUint, u8)> = Vec::new();

    loop {
        // largest block aligned at 'start'; zero is aligned to anything
        let align: u32 = start.trailing_zeros_in(bits as u32);

        // largest block that fits in the remaining run
        let remaining: BigUint = &r.upper - &start + 1u32;
        let fit: u32 = remaining.bit_len() - 1;

        let host: u32 = align.min(fit);
        out.push((start.clone(), bits - host as u8));

        // advance start by block size = 2^host
        start += BigUint::one() << host as usize;
        if start > r.upper {
            break;
        }
    }
    out
}

/**
Decompose a run into the fewest sections representable in the layout
`widths` (bit counts, most significant first): a section is sequential when
its divisions are single values down to one ranged division, followed by
full range ones.
*/
pub(crate) fn span_to_sequential(r: &Span, widths: &[u8]) -> Vec<Span> {
    let total: u32 = widths.iter().map(|&w| w as u32).sum();
    let mut start: BigUint = r.lower.clone();
    let mut out: Vec<Span> = Vec::new();

    loop {
        let mut tail: u32 = total;
        let mut end: Option<BigUint> = None;
        for &w in widths {
            tail -= w as u32;
            let tail_mask: BigUint = BigUint::ones(tail);
            // ranging this division needs every later one to start at zero
            // and end at its max
            if !(&start & &tail_mask).is_zero() || (&start | &tail_mask) > r.upper {
                continue;
            }
            let top: BigUint = &start | (BigUint::ones(w as u32) << tail as usize) | &tail_mask;
            end = Some(match top <= r.upper {
                true => top,
                false => (((&r.upper + 1u32) >> (tail as usize)) << (tail as usize)) - 1u32,
            });
            break;
        }
        // the last division always qualifies
        let end: BigUint = end.unwrap_or_else(|| start.clone());
        let done: bool = end >= r.upper;
        out.push(Span {
            lower: start,
            upper: end.clone(),
        });
        if done {
            break;
        }
        start = end + 1u32;
    }
    out
}

pub(crate) fn to_prefix_blocks(template: &Section, merged: &[Span]) -> Vec<Section> {
    let bits: u8 = template.bit_count();
    let mut out: Vec<Section> = Vec::new();
    for r in merged {
        for (lower, prefix) in span_to_prefix_blocks(r, bits) {
            let upper: BigUint = &lower | BigUint::ones((bits - prefix) as u32);
            out.push(template.with_values(&lower, &upper, Some(prefix)));
        }
    }
    tracing::trace!(runs = merged.len(), blocks = out.len(), "prefix blocks");
    out
}

pub(crate) fn to_sequential_blocks(template: &Section, merged: &[Span]) -> Vec<Section> {
    let widths: Vec<u8> = template.segments().iter().map(Segment::bit_count).collect();
    let out: Vec<Section> = merged
        .iter()
        .flat_map(|r| span_to_sequential(r, &widths))
        .map(|r| template.with_values(&r.lower, &r.upper, None))
        .collect();
    tracing::trace!(runs = merged.len(), blocks = out.len(), "sequential blocks");
    out
}

/* -------------------------------------------------------------------------- */

impl Section {
    /**
    Values present in both sections, or `None` if they are disjoint.

    Both are treated as sets of individual values; the result is their exact
    intersection, built division by division. A section fully inside `other`
    comes back as is; any other result carries no prefix length.
    */
    pub fn intersect(&self, other: &Section) -> Result<Option<Section>, AddressError> {
        self.check_compatible(other)?;
        if other.contains(self) {
            return Ok(Some(self.clone()));
        }
        let divs: Option<Vec<Segment>> = self
            .segments()
            .iter()
            .zip(other.segments())
            .map(|(a, b)| a.intersect(b))
            .collect();
        Ok(divs.map(|d| self.derive(d, None)))
    }

    /**
    Values of this section that are not in `other`, as disjoint sections in
    ascending order.

    Empty when `other` covers everything, `[self]` when they are disjoint.
    For sequential sections the result has at most two parts (a strict
    interior cut splits the range); in general at most two per division.
    */
    pub fn subtract(&self, other: &Section) -> Result<Vec<Section>, AddressError> {
        let Some(common) = self.intersect(other)? else {
            return Ok(vec![self.clone()]);
        };
        if common == *self {
            return Ok(Vec::new());
        }
        let mut out: Vec<Section> = Vec::new();
        for i in 0..self.segment_count() {
            for rest in segment_minus(&self.segments()[i], &common.segments()[i]) {
                let mut divs: Vec<Segment> = Vec::with_capacity(self.segment_count());
                divs.extend_from_slice(&common.segments()[..i]);
                divs.push(rest);
                divs.extend_from_slice(&self.segments()[i + 1..]);
                out.push(self.derive(divs, None));
            }
        }
        out.sort();
        tracing::trace!(section = %self, parts = out.len(), "subtracted");
        Ok(out)
    }
}

/// The up to two runs of `s` outside `cut`; `cut` must lie within `s`.
fn segment_minus(s: &Segment, cut: &Segment) -> Vec<Segment> {
    let bits: u8 = s.bit_count();
    let (lower, upper) = (s.lower_value(), s.upper_value());
    let (cl, cu) = (cut.lower_value(), cut.upper_value());
    let mut out: Vec<Segment> = Vec::with_capacity(2);
    if cl > lower {
        out.push(s.with_bounds(Bounds::from_big(bits, lower, cl - 1u32), None));
    }
    if cu < upper {
        out.push(s.with_bounds(Bounds::from_big(bits, cu + 1u32, upper), None));
    }
    out
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iptools::Address;
    use ipnet::IpNet;

    const TST_A_1: &str = "192.168.0.0/24";
    const TST_A_2: &str = "192.168.1.0/24";
    const RES_T_A: &str = "192.168.0.0/23";

    const TST_B_1: &str = "10.0.0.0/8";
    const TST_B_2: &str = "10.1.2.0/24";
    const RES_T_B: &str = "10.0.0.0/8";

    const TST_C_1: &str = "2001:db8::/65";
    const TST_C_2: &str = "2001:db8:0:0:8000::/65";
    const RES_T_C: &str = "2001:db8::/64";

    const TST_D_V4: [&str; 4] = ["172.16.0.4/32", "172.16.0.5/32", "172.16.0.6/32", "172.16.0.7/32"];
    const RES_D_V4: &str = "172.16.0.4/30";

    const TST_E_V4: [&str; 4] = ["172.16.0.8/32", "172.16.0.11/32", "172.16.0.13/32", "172.16.0.15/32"];
    const RES_E_V4: &str = "172.16.0.8/29";

    fn net(s: &str) -> Section {
        let n: IpNet = s.parse().unwrap();
        Address::from(n).into_section()
    }

    fn nets(items: &[&str]) -> Vec<Section> {
        items.iter().map(|s| net(s)).collect()
    }

    fn cidrs(out: &[Section]) -> Vec<String> {
        out.iter()
            .map(|s| Address::new(s.clone()).unwrap().to_ipnet().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_merges_halves() {
        let out = merge_to_prefix_blocks(&nets(&["10.0.0.0/25", "10.0.0.128/25"])).unwrap();
        assert_eq!(cidrs(&out), vec!["10.0.0.0/24"]);
        assert_eq!(out[0].prefix_len(), Some(24));
        assert!(out[0].is_single_prefix_block(24));
    }

    #[test]
    fn test_merges_adjacent_v4() {
        let out = merge_to_prefix_blocks(&nets(&[TST_A_1, TST_A_2])).unwrap();
        assert_eq!(cidrs(&out), vec![RES_T_A]);
    }

    #[test]
    fn test_removes_redundant() {
        let out = merge_to_prefix_blocks(&nets(&[TST_B_2, TST_B_1])).unwrap();
        assert_eq!(cidrs(&out), vec![RES_T_B]);
    }

    #[test]
    fn test_handles_ipv6_merge() {
        let out = merge_to_prefix_blocks(&nets(&[TST_C_1, TST_C_2])).unwrap();
        assert_eq!(cidrs(&out), vec![RES_T_C]);
    }

    #[test]
    fn test_hosts_collapse() {
        let out = merge_to_prefix_blocks(&nets(&TST_D_V4)).unwrap();
        assert_eq!(cidrs(&out), vec![RES_D_V4]);
        let seq = merge_to_sequential_blocks(&nets(&TST_D_V4)).unwrap();
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn test_fuzzy_merge() {
        let out = merge_to_prefix_blocks_fuzzy(&nets(&TST_E_V4), &BigUint::from(2u32)).unwrap();
        assert_eq!(cidrs(&out), vec![RES_E_V4]);
        let exact = merge_to_prefix_blocks(&nets(&TST_E_V4)).unwrap();
        assert_eq!(exact.len(), 4);
    }

    #[test]
    fn test_merge_is_minimal_and_exact() {
        let input = nets(&["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/30", "10.0.0.9/32", "10.0.0.8/32"]);
        let out = merge_to_prefix_blocks(&input).unwrap();
        assert_eq!(
            cidrs(&out),
            vec!["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/30", "10.0.0.8/31"]
        );
        let total: BigUint = out.iter().map(Section::count).sum();
        assert_eq!(total, BigUint::from(9u32));
        // disjoint, sorted
        for w in out.windows(2) {
            assert!(w[0].upper_value() < w[1].lower_value());
        }
        assert!(merge_to_prefix_blocks(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_merge_non_sequential_input() {
        // 10.0.0-1.5 is two separate values
        let divs: Vec<Segment> = [(10, 10), (0, 0), (0, 1), (5, 5)]
            .iter()
            .map(|&(l, u)| Segment::with_range(8, l, u, None).unwrap())
            .collect();
        let g = Section::new(divs).unwrap();
        let out = merge_to_prefix_blocks(&[g]).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|s| !s.is_multiple()));
    }

    #[test]
    fn test_mismatch() {
        let r = merge_to_prefix_blocks(&nets(&["10.0.0.0/8", "::/0"]));
        assert!(matches!(r, Err(AddressError::SizeMismatch { .. })));
    }

    #[test]
    fn test_span() {
        let a = net("10.0.0.1/32");
        let b = net("10.0.0.6/32");
        let blocks = span_with_prefix_blocks(&b, &a).unwrap();
        assert_eq!(
            cidrs(&blocks),
            vec!["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/31", "10.0.0.6/32"]
        );
        let seq = span_with_sequential_blocks(&a, &b).unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq[0].lower().bytes(), &[10, 0, 0, 1]);
        assert_eq!(seq[0].upper().bytes(), &[10, 0, 0, 6]);

        let seq = span_with_sequential_blocks(&net("10.0.0.250/32"), &net("10.0.1.5/32")).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].upper().bytes(), &[10, 0, 0, 255]);
        assert_eq!(seq[1].lower().bytes(), &[10, 0, 1, 0]);
        assert!(seq.iter().all(Section::is_sequential));
    }

    #[test]
    fn test_span_to_sequential() {
        // 8/8 layout: 0x01ff..0x0402 is [01ff], [0200-03ff], [0400-0402]
        let r = Span {
            lower: BigUint::from(0x01ffu32),
            upper: BigUint::from(0x0402u32),
        };
        let got: Vec<(u32, u32)> = span_to_sequential(&r, &[8, 8])
            .iter()
            .map(|s| (s.lower.clone().try_into().unwrap(), s.upper.clone().try_into().unwrap()))
            .collect();
        assert_eq!(got, vec![(0x01ff, 0x01ff), (0x0200, 0x03ff), (0x0400, 0x0402)]);
    }

    #[test]
    fn test_span_to_prefix_blocks_full() {
        let r = Span {
            lower: BigUint::zero(),
            upper: BigUint::ones(128),
        };
        assert_eq!(span_to_prefix_blocks(&r, 128), vec![(BigUint::zero(), 0)]);
    }

    #[test]
    fn test_intersect() {
        let a = net("10.0.0.0/23");
        let b = net("10.0.1.0/24");
        let i = a.intersect(&b).unwrap().unwrap();
        assert_eq!(i, b);
        assert_eq!(b.intersect(&a).unwrap().unwrap().prefix_len(), Some(24));
        assert!(a.intersect(&net("10.0.2.0/24")).unwrap().is_none());
        assert!(a.intersect(&net("::/0")).is_err());
    }

    #[test]
    fn test_subtract() {
        let whole = net("10.0.0.0/24");
        let divs: Vec<Segment> = [(10, 10), (0, 0), (0, 0), (10, 20)]
            .iter()
            .map(|&(l, u)| Segment::with_range(8, l, u, None).unwrap())
            .collect();
        let cut = Section::from_segments(divs, whole.family(), whole.policy(), None).unwrap();
        let parts = whole.subtract(&cut).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].upper().bytes(), &[10, 0, 0, 9]);
        assert_eq!(parts[1].lower().bytes(), &[10, 0, 0, 21]);
        assert_eq!(parts[1].upper().bytes(), &[10, 0, 0, 255]);

        assert!(cut.subtract(&whole).unwrap().is_empty());
        let other = net("10.0.1.0/24");
        assert_eq!(whole.subtract(&other).unwrap(), vec![whole.clone()]);

        // edge cut leaves one part
        let low = net("10.0.0.0/25");
        let parts = whole.subtract(&low).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].lower().bytes(), &[10, 0, 0, 128]);
    }

    #[test]
    fn test_subtract_product() {
        let mk = |r: [(u64, u64); 4]| {
            let divs: Vec<Segment> = r.iter().map(|&(l, u)| Segment::with_range(8, l, u, None).unwrap()).collect();
            Section::new(divs).unwrap()
        };
        let g = mk([(10, 10), (0, 1), (0, 1), (7, 7)]);
        let cut = mk([(10, 10), (0, 0), (0, 0), (7, 7)]);
        let parts = g.subtract(&cut).unwrap();
        let total: BigUint = parts.iter().map(Section::count).sum();
        assert_eq!(total, BigUint::from(3u32));
        for p in &parts {
            assert!(p.intersect(&cut).unwrap().is_none());
            assert!(g.contains(p));
        }
    }
}
