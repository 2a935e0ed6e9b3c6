// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stepping through the enumeration order of a [Section].

use super::{
    section::Section,
    segment::{Bounds, Segment, NATIVE_BITS},
    AddressError,
};
use num_bigint::{BigInt, BigUint};
use num_traits::{ToPrimitive, Zero};

impl Section {
    /**
    The value `n` positions away from this section in its enumeration order.

    - single value: plain scalar addition
    - range, `0 <= n < count`: the `n`-th value counted from the lower bound,
      with the divisions acting as one mixed-radix counter
    - range, `n >= count`: continues past the upper bound by `n - (count - 1)`
    - range, `n < 0`: goes back from the lower bound by `|n|`

    The result is a single value keeping this section's prefix length as a
    plain annotation; it is never expanded to the prefix block.

    ## Errors
    - [AddressError::ArithmeticOverflow] if the result leaves `0..=max_value()`
    */
    pub fn increment(&self, n: i128) -> Result<Section, AddressError> {
        if n == 0 && !self.is_multiple() {
            return Ok(self.clone());
        }
        if self.bit_count() <= NATIVE_BITS {
            self.increment_native(n)
        } else {
            self.increment_wide(n)
        }
    }

    /// Shorthand for `increment(-n)`.
    pub fn decrement(&self, n: i128) -> Result<Section, AddressError> {
        let neg: i128 = n.checked_neg().ok_or_else(|| overflow(self, n))?;
        self.increment(neg)
    }

    fn increment_native(&self, n: i128) -> Result<Section, AddressError> {
        let (lower, upper) = match (self.lower_u64(), self.upper_u64()) {
            (Some(l), Some(u)) => (l as i128, u as i128),
            _ => return self.increment_wide(n),
        };
        let max: i128 = u64::MAX as i128 >> (NATIVE_BITS - self.bit_count());
        let count: i128 = match self.count().to_i128() {
            Some(c) => c,
            None => return self.increment_wide(n),
        };
        let target: Option<i128> = match (self.is_multiple(), n) {
            (false, _) => lower.checked_add(n),
            (true, n) if n < 0 => lower.checked_add(n),
            (true, n) if n >= count => upper.checked_add(n - (count - 1)),
            (true, n) => return Ok(self.nth_native(n as u128)),
        };
        match target {
            Some(t) if (0..=max).contains(&t) => Ok(self.with_u64(t as u64, self.prefix_len())),
            _ => Err(overflow(self, n)),
        }
    }

    fn increment_wide(&self, n: i128) -> Result<Section, AddressError> {
        let lower: BigInt = BigInt::from(self.lower_value());
        let count: BigInt = BigInt::from(self.count());
        let step: BigInt = BigInt::from(n);
        let target: BigInt = match (self.is_multiple(), n) {
            (false, _) => lower + step,
            (true, n) if n < 0 => lower + step,
            (true, _) if step >= count => BigInt::from(self.upper_value()) + step - count + 1,
            (true, n) => return Ok(self.nth_wide(BigUint::from(n as u128))),
        };
        match target.to_biguint() {
            Some(t) if t <= self.max_value() => Ok(self.with_values(&t, &t, self.prefix_len())),
            _ => Err(overflow(self, n)),
        }
    }

    /// `n`-th value of the range, `n < count`, for counts that fit a [u128].
    fn nth_native(&self, mut n: u128) -> Section {
        let mut divs: Vec<Segment> = Vec::with_capacity(self.segment_count());
        for s in self.segments().iter().rev() {
            let (lower, radix) = match (s.lower_u64(), s.count_u128()) {
                (Some(l), Some(r)) => (l, r),
                _ => return self.nth_wide(BigUint::from(n)),
            };
            let digit: u64 = (n % radix) as u64;
            n /= radix;
            let v: u64 = lower + digit;
            divs.push(self.new_segment(s.bit_count(), Bounds::Native { lower: v, upper: v }, None));
        }
        divs.reverse();
        self.derive(divs, self.prefix_len())
    }

    fn nth_wide(&self, mut n: BigUint) -> Section {
        let mut divs: Vec<Segment> = Vec::with_capacity(self.segment_count());
        for s in self.segments().iter().rev() {
            let radix: BigUint = s.value_count();
            let digit: BigUint = &n % &radix;
            n /= &radix;
            let v: BigUint = s.lower_value() + digit;
            let bounds: Bounds = Bounds::from_big(s.bit_count(), v.clone(), v);
            divs.push(self.new_segment(s.bit_count(), bounds, None));
        }
        divs.reverse();
        self.derive(divs, self.prefix_len())
    }

    /**
    Position of the single value `value` in this section's enumeration order,
    so that `increment(ordinal)` gives `value` back.

    `None` if `value` is a range, has another layout, or is not contained.
    */
    pub fn ordinal_of(&self, value: &Section) -> Option<BigUint> {
        if value.is_multiple() || !self.contains(value) {
            return None;
        }
        let ord: BigUint = self
            .segments()
            .iter()
            .zip(value.segments())
            .fold(BigUint::zero(), |acc, (range, v)| {
                acc * range.value_count() + (v.lower_value() - range.lower_value())
            });
        Some(ord)
    }
}

fn overflow(s: &Section, n: i128) -> AddressError {
    let sign: char = if n < 0 { '-' } else { '+' };
    tracing::debug!(section = %s, n, "increment overflow");
    AddressError::ArithmeticOverflow {
        value: format!("{s} {sign} {}", n.unsigned_abs()),
    }
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iptools::{IpFam, PrefixPolicy};

    fn v4(ranges: [(u64, u64); 4], prefix: Option<u8>) -> Section {
        let divs: Vec<Segment> = ranges
            .iter()
            .map(|&(l, u)| Segment::with_range(8, l, u, None).unwrap())
            .collect();
        Section::from_segments(divs, Some(IpFam::V4), PrefixPolicy::default(), prefix).unwrap()
    }

    fn v6_single(v: u128) -> Section {
        let divs: Vec<Segment> = (0..8)
            .rev()
            .map(|i| Segment::new(16, ((v >> (i * 16)) & 0xffff) as u64).unwrap())
            .collect();
        Section::from_segments(divs, Some(IpFam::V6), PrefixPolicy::default(), None).unwrap()
    }

    #[test]
    fn test_increment_block() {
        let g = v4([(192, 192), (168, 168), (0, 255), (0, 255)], Some(16));
        assert_eq!(g.increment(0).unwrap().bytes(), &[192, 168, 0, 0]);
        assert_eq!(g.increment(65535).unwrap().bytes(), &[192, 168, 255, 255]);
        assert_eq!(g.increment(65535).unwrap(), g.upper());
        assert_eq!(g.increment(256).unwrap().bytes(), &[192, 168, 1, 0]);
        // past the upper bound: scalar continuation
        assert_eq!(g.increment(65536).unwrap().bytes(), &[192, 169, 0, 0]);
        assert_eq!(g.increment(-1).unwrap().bytes(), &[192, 167, 255, 255]);
    }

    #[test]
    fn test_increment_keeps_prefix() {
        let g = v4([(192, 192), (168, 168), (0, 255), (0, 255)], Some(16));
        for n in [0i128, 5, 300, 65535] {
            let stepped = g.increment(n).unwrap();
            let walked = g.iter().nth(n as usize).unwrap();
            assert_eq!(stepped, walked);
            assert_eq!(stepped.prefix_len(), Some(16));
            assert_eq!(walked.prefix_len(), Some(16));
            assert!(!stepped.is_multiple());
        }
        assert_eq!(g.increment(65536).unwrap().prefix_len(), Some(16));
        assert_eq!(g.decrement(1).unwrap().prefix_len(), Some(16));

        let host = g.increment(7).unwrap();
        assert_eq!(host.increment(1).unwrap().prefix_len(), Some(16));
        assert_eq!(host.increment(0).unwrap().prefix_len(), Some(16));
        assert_eq!(v4([(1, 1); 4], None).increment(3).unwrap().prefix_len(), None);
    }

    #[test]
    fn test_increment_mixed_radix() {
        // two ranged divisions: enumeration is 1.1.5.7, 1.1.5.8, 1.1.6.7, ...
        let g = v4([(1, 1), (1, 1), (5, 6), (7, 8)], None);
        let got: Vec<Vec<u8>> = (0..4).map(|i| g.increment(i).unwrap().bytes().to_vec()).collect();
        assert_eq!(
            got,
            vec![vec![1, 1, 5, 7], vec![1, 1, 5, 8], vec![1, 1, 6, 7], vec![1, 1, 6, 8]]
        );
        assert_eq!(g.increment(4).unwrap().bytes(), &[1, 1, 6, 9]);
    }

    #[test]
    fn test_increment_single_overflow() {
        let top = v4([(255, 255), (255, 255), (255, 255), (255, 254)], None);
        let top = top.increment(0).unwrap();
        assert_eq!(top.increment(1).unwrap().bytes(), &[255, 255, 255, 255]);
        assert!(matches!(top.increment(2), Err(AddressError::ArithmeticOverflow { .. })));

        let zero = v4([(0, 0); 4], None);
        assert!(matches!(zero.decrement(1), Err(AddressError::ArithmeticOverflow { .. })));
        assert!(matches!(zero.decrement(i128::MIN), Err(AddressError::ArithmeticOverflow { .. })));
        assert_eq!(zero.increment(0).unwrap(), zero);
    }

    #[test]
    fn test_increment_wide() {
        let a = v6_single(u128::MAX - 1);
        assert_eq!(a.increment(1).unwrap().upper_value(), BigUint::from(u128::MAX));
        assert!(matches!(a.increment(2), Err(AddressError::ArithmeticOverflow { .. })));
        let b = v6_single(0x10);
        assert_eq!(b.increment(-16).unwrap().lower_value(), BigUint::zero());

        // ::/64 as a range of 2^64 values
        let mut divs: Vec<Segment> = (0..4).map(|_| Segment::new(16, 0).unwrap()).collect();
        divs.extend((0..4).map(|_| Segment::with_range(16, 0, 0xffff, None).unwrap()));
        let net = Section::from_segments(divs, Some(IpFam::V6), PrefixPolicy::default(), Some(64)).unwrap();
        let x = net.increment(0x1_0000).unwrap();
        assert_eq!(x.lower_value(), BigUint::from(0x1_0000u32));
        let past = net.increment(u64::MAX as i128 + 1).unwrap();
        assert_eq!(past.lower_value(), BigUint::from(1u128 << 64));
    }

    #[test]
    fn test_ordinal() {
        let g = v4([(1, 1), (1, 1), (5, 6), (7, 8)], None);
        for i in 0..4i128 {
            let v = g.increment(i).unwrap();
            assert_eq!(g.ordinal_of(&v), Some(BigUint::from(i as u32)));
        }
        let lo = g.ordinal_of(&g.lower()).unwrap();
        let hi = g.ordinal_of(&g.upper()).unwrap();
        assert_eq!(g.count(), hi - lo + 1u32);
        assert_eq!(g.ordinal_of(&g), None);
        assert_eq!(g.ordinal_of(&v4([(1, 1), (1, 1), (5, 5), (9, 9)], None)), None);
    }
}
