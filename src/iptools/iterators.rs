// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    prefix::Side,
    section::Section,
    segment::{Bounds, Segment},
    AddressError,
};
use num_bigint::BigUint;
use num_traits::One;

enum Cursor {
    /// segments up to 64 bits; `u128` so a 2^64 step cannot overflow
    Native { next: u128, last: u128, step: u128 },
    Wide { next: BigUint, last: BigUint, step: BigUint },
    Once(Option<Segment>),
}

/// Iterator over the values (or prefix blocks) of a [Segment], lowest first.
pub struct SegmentIter {
    bits: u8,
    prefix: Option<u8>,
    cursor: Cursor,
}

impl SegmentIter {
    /// Every single value; a single-valued segment yields itself.
    pub(crate) fn values(seg: Segment) -> Self {
        if !seg.is_multiple() {
            return Self::once(seg);
        }
        Self::stepping(&seg, 0, None)
    }

    /// Every block of the local `prefix` that overlaps the segment.
    pub(crate) fn blocks(seg: Segment, prefix: u8) -> Self {
        let host: u8 = seg.bit_count() - prefix;
        Self::stepping(&seg, host, Some(prefix))
    }

    pub(crate) fn once(seg: Segment) -> Self {
        Self {
            bits: seg.bit_count(),
            prefix: seg.prefix_len(),
            cursor: Cursor::Once(Some(seg)),
        }
    }

    fn stepping(seg: &Segment, host: u8, prefix: Option<u8>) -> Self {
        let cursor: Cursor = match seg.bounds() {
            Bounds::Native { lower, upper } => {
                let step: u128 = 1u128 << host;
                let net: u128 = !(step - 1);
                Cursor::Native {
                    next: *lower as u128 & net,
                    last: *upper as u128 & net,
                    step,
                }
            }
            Bounds::Wide { lower, upper } => {
                let step: BigUint = BigUint::one() << host as usize;
                let host_mask: BigUint = &step - 1u32;
                Cursor::Wide {
                    next: lower - (lower & &host_mask),
                    last: upper - (upper & &host_mask),
                    step,
                }
            }
        };
        Self {
            bits: seg.bit_count(),
            prefix,
            cursor,
        }
    }
}

impl Iterator for SegmentIter {
    type Item = Segment;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.cursor {
            Cursor::Once(seg) => seg.take(),
            Cursor::Native { next, last, step } => {
                if *next > *last {
                    return None;
                }
                let lower: u128 = *next;
                *next += *step;
                let bounds: Bounds = Bounds::Native {
                    lower: lower as u64,
                    upper: (lower + *step - 1) as u64,
                };
                Some(Segment::from_parts(self.bits, bounds, self.prefix))
            }
            Cursor::Wide { next, last, step } => {
                if *next > *last {
                    return None;
                }
                let lower: BigUint = next.clone();
                *next += &*step;
                let upper: BigUint = &*next - 1u32;
                Some(Segment::from_parts(self.bits, Bounds::from_big(self.bits, lower, upper), self.prefix))
            }
        }
    }
}

/* ---------------------------------- */

/// How one division advances inside a [SectionIter].
#[derive(Clone, Copy, Debug)]
enum Step {
    Values,
    Blocks(u8),
    /// the division is kept as is
    Whole,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Once,
    Fresh,
    Running,
    Done,
}

type Exclude = Box<dyn Fn(&Section) -> bool>;

/**
Odometer over the divisions of a [Section]: the least significant division
advances first, and when it runs out it starts over while the next one
advances. Items come out lowest first.

An optional exclusion predicate drops assembled items it returns `true` for.
*/
pub struct SectionIter {
    section: Section,
    plan: Vec<Step>,
    divs: Vec<SegmentIter>,
    current: Vec<Segment>,
    prefix: Option<u8>,
    exclude: Option<Exclude>,
    state: State,
}

impl SectionIter {
    fn new(section: Section, plan: Vec<Step>, prefix: Option<u8>, exclude: Option<Exclude>) -> Self {
        let state: State = match section.is_multiple() || plan.iter().any(|s| matches!(s, Step::Blocks(_))) {
            true => State::Fresh,
            false => State::Once,
        };
        Self {
            section,
            plan,
            divs: Vec::new(),
            current: Vec::new(),
            prefix,
            exclude,
            state,
        }
    }

    fn fresh(&self, i: usize) -> SegmentIter {
        let seg: Segment = self.section.segments()[i].clone();
        match self.plan[i] {
            Step::Values => SegmentIter::values(seg),
            Step::Blocks(p) => SegmentIter::blocks(seg, p),
            Step::Whole => SegmentIter::once(seg),
        }
    }

    /// Move the odometer one notch; false once the most significant division
    /// runs out.
    fn advance(&mut self) -> bool {
        for i in (0..self.divs.len()).rev() {
            if let Some(s) = self.divs[i].next() {
                self.current[i] = s;
                return true;
            }
            let mut fresh: SegmentIter = self.fresh(i);
            match fresh.next() {
                Some(s) => self.current[i] = s,
                None => return false,
            }
            self.divs[i] = fresh;
        }
        false
    }
}

impl Iterator for SectionIter {
    type Item = Section;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item: Section = match self.state {
                State::Done => return None,
                State::Once => {
                    self.state = State::Done;
                    self.section.derive(self.section.segments().to_vec(), self.prefix)
                }
                State::Fresh => {
                    self.divs = (0..self.plan.len()).map(|i| self.fresh(i)).collect();
                    let first: Option<Vec<Segment>> = self.divs.iter_mut().map(|d| d.next()).collect();
                    match first {
                        Some(first) => self.current = first,
                        None => {
                            self.state = State::Done;
                            return None;
                        }
                    }
                    self.state = State::Running;
                    self.section.derive(self.current.clone(), self.prefix)
                }
                State::Running => {
                    if !self.advance() {
                        self.state = State::Done;
                        return None;
                    }
                    self.section.derive(self.current.clone(), self.prefix)
                }
            };
            if self.exclude.as_ref().is_some_and(|f| f(&item)) {
                continue;
            }
            return Some(item);
        }
    }
}

/* -------------------------------------------------------------------------- */

impl Section {
    /**
    Iterate every single value, lowest first. Each call starts over.

    A single-valued section yields itself. Items keep this section's prefix
    length as an annotation.

    NOTE: Large ranges (a whole IPv6 /64, say) produce astronomically many
    items. Bound the iteration yourself.
    */
    pub fn iter(&self) -> SectionIter {
        let plan: Vec<Step> = vec![Step::Values; self.segment_count()];
        SectionIter::new(self.clone(), plan, self.prefix_len(), None)
    }

    /// [Section::iter] without the items `exclude` returns `true` for.
    pub fn iter_filtered<F>(&self, exclude: F) -> SectionIter
    where
        F: Fn(&Section) -> bool + 'static,
    {
        let plan: Vec<Step> = vec![Step::Values; self.segment_count()];
        SectionIter::new(self.clone(), plan, self.prefix_len(), Some(Box::new(exclude)))
    }

    /// [Section::iter] skipping values whose host bits are all zero. Without a
    /// prefix length (or with a full-length one) nothing is skipped.
    pub fn non_zero_host_iter(&self) -> SectionIter {
        match self.prefix_len() {
            Some(p) if p < self.bit_count() => self.iter_filtered(move |s| s.is_zero_host_len(p)),
            _ => self.iter(),
        }
    }

    /// Iterate the `len` prefix blocks overlapping this section, each one
    /// annotated with `len`.
    pub fn prefix_block_iter(&self, len: u8) -> Result<SectionIter, AddressError> {
        if len > self.bit_count() {
            return Err(AddressError::PrefixLengthOutOfRange {
                prefix: len as i32,
                max: self.bit_count(),
            });
        }
        let plan: Vec<Step> = self
            .sides(len)
            .map(|(_, sd)| match sd {
                Side::Network => Step::Values,
                Side::Boundary(p) => Step::Blocks(p),
                Side::Host => Step::Blocks(0),
            })
            .collect();
        Ok(SectionIter::new(self.clone(), plan, Some(len), None))
    }

    /**
    Split into sequential sections, lowest first: every division before the
    last one that is not full range advances value by value, the rest are
    kept whole. A sequential section yields itself.
    */
    pub fn sequential_block_iter(&self) -> SectionIter {
        let plan: Vec<Step> = match self.sequential_split() {
            Some(i) => (0..self.segment_count())
                .map(|j| if j < i { Step::Values } else { Step::Whole })
                .collect(),
            None => vec![Step::Whole; self.segment_count()],
        };
        SectionIter::new(self.clone(), plan, self.prefix_len(), None)
    }

    /// Number of items [Section::sequential_block_iter] yields.
    pub fn sequential_block_count(&self) -> BigUint {
        match self.sequential_split() {
            Some(i) => self.segments()[..i]
                .iter()
                .fold(BigUint::one(), |acc, s| acc * s.value_count()),
            None => BigUint::one(),
        }
    }

    /// Index of the last division that is not full range, if any.
    fn sequential_split(&self) -> Option<usize> {
        self.segments().iter().rposition(|s| !s.is_full_range())
    }
}

impl IntoIterator for &Section {
    type Item = Section;
    type IntoIter = SectionIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/* -------------------------------------------------------------------------- */
