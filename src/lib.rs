// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
Range arithmetic for hierarchical, IP-style addresses.

A [Segment] is an inclusive run of values in a fixed bit width. A [Section]
is an ordered sequence of segments, read as one big-endian integer, which
represents the cartesian product of its segments' ranges. Sections carry an
optional prefix length and answer prefix-block, masking, host, increment,
iteration, merge and set questions. [Creator] is the shared factory for a
family/policy configuration, and [Address] ties a section to IPv4 or IPv6.

```
use iparith::{Address, Creator};

let c = Creator::ipv4();
let net = c.section_from_values(&[192, 168, 0, 0], Some(16)).unwrap();
assert!(net.is_prefixed_block());
assert_eq!(net.to_string(), "192.168.0-255.0-255/16");

let first = net.increment(0).unwrap();
assert_eq!(Address::new(first).unwrap().to_string(), "192.168.0.0/16");
```
*/

pub mod iptools;

pub use iptools::{
    merge_to_prefix_blocks, merge_to_prefix_blocks_fuzzy, merge_to_sequential_blocks, span_with_prefix_blocks,
    span_with_sequential_blocks, Address, AddressError, AddressKey, Creator, FamilyConfig, IpFam, IpRange,
    IpRangeIterator, PrefixPolicy, Section, SectionIter, Segment, SegmentIter, IPV4, IPV6,
};
