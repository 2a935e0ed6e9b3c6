// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{IPV4_BITS, IPV6_BITS};
use serde::{Deserialize, Serialize};

/// IP address family
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IpFam {
    V4,
    V6,
}

impl IpFam {
    /// Constant table for this family.
    pub const fn config(&self) -> &'static FamilyConfig {
        match self {
            IpFam::V4 => &IPV4,
            IpFam::V6 => &IPV6,
        }
    }

    pub const fn bit_count(&self) -> u8 {
        match self {
            IpFam::V4 => IPV4_BITS,
            IpFam::V6 => IPV6_BITS,
        }
    }
}

/**
How a prefix length given at construction is interpreted.

- `PrefixedAreSubnets`: a prefix length implies the whole prefix block, so
  `192.168.1.7` with prefix 16 becomes `192.168.0.0-192.168.255.255`.
- `ExplicitSubnets`: the prefix is an annotation only; values are kept as given.

Only construction (the [Creator](super::Creator) and `set_prefix_len`) looks at
the policy. Derived objects such as lower/upper bounds or iterator items carry
the annotation without being expanded again.
*/
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PrefixPolicy {
    #[default]
    PrefixedAreSubnets,
    ExplicitSubnets,
}

/// Per-family constant data.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FamilyConfig {
    pub fam: IpFam,
    pub segment_count: usize,
    pub bits_per_segment: u8,
    pub bytes_per_segment: usize,
    pub max_segment_value: u64,
    /// radix used when displaying segment values
    pub radix: u32,
}

impl FamilyConfig {
    #[inline]
    pub const fn bit_count(&self) -> u8 {
        (self.segment_count * self.bits_per_segment as usize) as u8
    }

    #[inline]
    pub const fn byte_count(&self) -> usize {
        self.segment_count * self.bytes_per_segment
    }
}

pub const IPV4: FamilyConfig = FamilyConfig {
    fam: IpFam::V4,
    segment_count: 4,
    bits_per_segment: 8,
    bytes_per_segment: 1,
    max_segment_value: 0xff,
    radix: 10,
};

pub const IPV6: FamilyConfig = FamilyConfig {
    fam: IpFam::V6,
    segment_count: 8,
    bits_per_segment: 16,
    bytes_per_segment: 2,
    max_segment_value: 0xffff,
    radix: 16,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_tables() {
        assert_eq!(IPV4.bit_count(), IPV4_BITS);
        assert_eq!(IPV6.bit_count(), IPV6_BITS);
        assert_eq!(IPV4.byte_count(), 4);
        assert_eq!(IPV6.byte_count(), 16);
        assert_eq!(IpFam::V6.config().radix, 16);
    }

    #[test]
    fn test_policy_default() {
        assert_eq!(PrefixPolicy::default(), PrefixPolicy::PrefixedAreSubnets);
    }
}
