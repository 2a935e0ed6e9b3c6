// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Range arithmetic over IP-style hierarchical addresses.
//!
//! An address is an ordered sequence of [Segment]s, each holding either a
//! single value or a contiguous `lower..=upper` range. Segments compose into a
//! [Section]; a section bound to an address family becomes an [Address].
//! Everything in here is immutable: operations hand back new objects (or the
//! original handle when nothing changes).

mod addresses;
mod bits;
mod collapsing;
mod creator;
mod family;
mod increment;
mod iterators;
mod prefix;
mod section;
mod segment;
mod strings;
mod structs;

use num_bigint::BigUint;
use std::{error, fmt};
use strings::*;

pub use addresses::{Address, AddressKey};
pub use collapsing::*;
pub use creator::Creator;
pub use family::{FamilyConfig, IpFam, PrefixPolicy, IPV4, IPV6};
pub use iterators::{SectionIter, SegmentIter};
pub use section::Section;
pub use segment::Segment;
pub use structs::{IpRange, IpRangeIterator};

pub(crate) const IPV4_BITS: u8 = 32;
pub(crate) const IPV6_BITS: u8 = 128;
/// Widest section we accept; prefix lengths are carried as [u8].
pub(crate) const MAX_SECTION_BITS: u32 = u8::MAX as u32;

#[rustfmt::skip]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AddressError {
    /// wrong number of segments (or bytes) for the address family
    InvalidSegmentCount { expected: usize, actual: usize },
    PrefixLengthOutOfRange { prefix: i32, max: u8 },
    /// mask/OR would fragment a range, or divisions cannot be joined
    IncompatibleRange { lower: BigUint, upper: BigUint, operand: BigUint },
    /// operands have different segment/bit layouts (bit counts)
    SizeMismatch { left: u32, right: u32 },
    ArithmeticOverflow { value: String },
    /// operands were built under different family/prefix configurations
    NetworkMismatch,
    ValueOutOfRange { value: BigUint, bits: u8 },
    InvalidBitCount(u32),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::InvalidSegmentCount { expected, actual } => {
                write!(f, "{ERR_SEG_COUNT}: expected {expected}, got {actual}")
            }
            AddressError::PrefixLengthOutOfRange { prefix, max } => {
                write!(f, "{ERR_PREFIX_RANGE}: {prefix} (max {max})")
            }
            AddressError::IncompatibleRange { lower, upper, operand } => {
                write!(f, "{ERR_INCOMPATIBLE}: {lower}{DASH}{upper} with {operand:#x}")
            }
            AddressError::SizeMismatch { left, right } => {
                write!(f, "{ERR_SIZE_MISMATCH}: {left} bits vs {right} bits")
            }
            AddressError::ArithmeticOverflow { value } => {
                write!(f, "{ERR_OVERFLOW}: {value}")
            }
            AddressError::NetworkMismatch => {
                write!(f, "{ERR_NETWORK_MISMATCH}")
            }
            AddressError::ValueOutOfRange { value, bits } => {
                write!(f, "{ERR_VALUE_RANGE} in {bits} bits: {value}")
            }
            AddressError::InvalidBitCount(bits) => {
                write!(f, "{ERR_BIT_COUNT}: {bits}")
            }
        }
    }
}

impl error::Error for AddressError {}

/// Validate a prefix length against a total bit count.
#[inline]
pub(crate) fn check_prefix(prefix: i32, bits: u8) -> Result<u8, AddressError> {
    if prefix < 0 || prefix > bits as i32 {
        return Err(AddressError::PrefixLengthOutOfRange { prefix, max: bits });
    }
    Ok(prefix as u8)
}
