// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    collapsing,
    creator::Creator,
    family::{FamilyConfig, IpFam, PrefixPolicy},
    section::Section,
    strings::*,
    AddressError,
};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    ops::Deref,
};

/**
A [Section] bound to an IP address family, covering the full family width.

Dereferences to the section for every query; the operations below are the
ones that hand back an [Address] rather than a bare section.
*/
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    section: Section,
    fam: IpFam,
}

/// Stable, comparable view of an address: family, lower and upper bytes,
/// prefix length. Orders by family, then lower bytes, then upper bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AddressKey {
    pub fam: IpFam,
    pub lower: Vec<u8>,
    pub upper: Vec<u8>,
    pub prefix: Option<u8>,
}

impl Address {
    /**
    Wrap a section built for an address family.

    ## Errors
    - [AddressError::NetworkMismatch] if the section has no family
    - [AddressError::InvalidSegmentCount] / [AddressError::SizeMismatch] if the
      layout is not the family's
    */
    pub fn new(section: Section) -> Result<Self, AddressError> {
        let fam: IpFam = section.family().ok_or(AddressError::NetworkMismatch)?;
        let config: &FamilyConfig = fam.config();
        if section.segment_count() != config.segment_count {
            return Err(AddressError::InvalidSegmentCount {
                expected: config.segment_count,
                actual: section.segment_count(),
            });
        }
        if section.bit_count() != config.bit_count() {
            return Err(AddressError::SizeMismatch {
                left: config.bit_count() as u32,
                right: section.bit_count() as u32,
            });
        }
        Ok(Self { section, fam })
    }

    /// Constructor for sections derived from an address of family `fam`.
    #[inline]
    fn wrap(fam: IpFam) -> impl Fn(Section) -> Address {
        move |section| Address { section, fam }
    }

    #[inline]
    fn derived(&self, section: Section) -> Address {
        Address { section, fam: self.fam }
    }

    #[inline]
    pub fn family(&self) -> IpFam {
        self.fam
    }

    #[inline]
    pub fn section(&self) -> &Section {
        &self.section
    }

    #[inline]
    pub fn into_section(self) -> Section {
        self.section
    }

    /// Lowest address as an [IpAddr].
    pub fn to_ip_addr(&self) -> IpAddr {
        ip_from_bytes(self.family(), self.section.bytes())
    }

    /// Highest address as an [IpAddr].
    pub fn upper_ip_addr(&self) -> IpAddr {
        ip_from_bytes(self.family(), self.section.upper_bytes())
    }

    /// The address as an [IpNet], if it is exactly one prefix block.
    pub fn to_ipnet(&self) -> Option<IpNet> {
        let prefix: u8 = self.section.prefix_len_for_single_block()?;
        IpNet::new(self.to_ip_addr(), prefix).ok()
    }

    pub fn key(&self) -> AddressKey {
        AddressKey {
            fam: self.family(),
            lower: self.section.bytes().to_vec(),
            upper: self.section.upper_bytes().to_vec(),
            prefix: self.section.prefix_len(),
        }
    }

    /* ---------------------------------- */

    pub fn lower(&self) -> Address {
        self.derived(self.section.lower())
    }

    pub fn upper(&self) -> Address {
        self.derived(self.section.upper())
    }

    pub fn to_zero_host(&self) -> Result<Address, AddressError> {
        self.section.to_zero_host().map(Self::wrap(self.fam))
    }

    pub fn to_max_host(&self) -> Result<Address, AddressError> {
        self.section.to_max_host().map(Self::wrap(self.fam))
    }

    pub fn mask(&self, mask: &Address) -> Result<Address, AddressError> {
        self.section.mask(&mask.section).map(Self::wrap(self.fam))
    }

    pub fn bitwise_or(&self, operand: &Address) -> Result<Address, AddressError> {
        self.section.bitwise_or(&operand.section).map(Self::wrap(self.fam))
    }

    pub fn increment(&self, n: i128) -> Result<Address, AddressError> {
        self.section.increment(n).map(Self::wrap(self.fam))
    }

    pub fn decrement(&self, n: i128) -> Result<Address, AddressError> {
        self.section.decrement(n).map(Self::wrap(self.fam))
    }

    pub fn set_prefix_len(&self, len: u8) -> Result<Address, AddressError> {
        self.section.set_prefix_len(len).map(Self::wrap(self.fam))
    }

    pub fn without_prefix_len(&self) -> Address {
        self.derived(self.section.without_prefix_len())
    }

    pub fn to_prefix_block(&self) -> Address {
        self.derived(self.section.to_prefix_block())
    }

    /// Every single address, lowest first.
    pub fn iter(&self) -> impl Iterator<Item = Address> {
        self.section.iter().map(Self::wrap(self.fam))
    }

    pub fn prefix_block_iter(&self, len: u8) -> Result<impl Iterator<Item = Address>, AddressError> {
        Ok(self.section.prefix_block_iter(len)?.map(Self::wrap(self.fam)))
    }

    pub fn intersect(&self, other: &Address) -> Result<Option<Address>, AddressError> {
        Ok(self.section.intersect(&other.section)?.map(Self::wrap(self.fam)))
    }

    pub fn subtract(&self, other: &Address) -> Result<Vec<Address>, AddressError> {
        Ok(wrap_all(self.fam, self.section.subtract(&other.section)?))
    }

    pub fn span_with_prefix_blocks(&self, other: &Address) -> Result<Vec<Address>, AddressError> {
        Ok(wrap_all(self.fam, collapsing::span_with_prefix_blocks(&self.section, &other.section)?))
    }

    pub fn span_with_sequential_blocks(&self, other: &Address) -> Result<Vec<Address>, AddressError> {
        Ok(wrap_all(self.fam, collapsing::span_with_sequential_blocks(&self.section, &other.section)?))
    }

    /// See [collapsing::merge_to_prefix_blocks].
    pub fn merge_to_prefix_blocks(addrs: &[Address]) -> Result<Vec<Address>, AddressError> {
        let Some(first) = addrs.first() else {
            return Ok(Vec::new());
        };
        let sections: Vec<Section> = addrs.iter().map(|a| a.section.clone()).collect();
        Ok(wrap_all(first.fam, collapsing::merge_to_prefix_blocks(&sections)?))
    }

    /// See [collapsing::merge_to_sequential_blocks].
    pub fn merge_to_sequential_blocks(addrs: &[Address]) -> Result<Vec<Address>, AddressError> {
        let Some(first) = addrs.first() else {
            return Ok(Vec::new());
        };
        let sections: Vec<Section> = addrs.iter().map(|a| a.section.clone()).collect();
        Ok(wrap_all(first.fam, collapsing::merge_to_sequential_blocks(&sections)?))
    }
}

fn wrap_all(fam: IpFam, sections: Vec<Section>) -> Vec<Address> {
    sections.into_iter().map(Address::wrap(fam)).collect()
}

fn ip_from_bytes(fam: IpFam, bytes: &[u8]) -> IpAddr {
    match fam {
        IpFam::V4 => IpAddr::V4(Ipv4Addr::from(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))),
        IpFam::V6 => IpAddr::V6(Ipv6Addr::from(bytes.iter().fold(0u128, |acc, &b| (acc << 8) | b as u128))),
    }
}

impl Deref for Address {
    type Target = Section;

    fn deref(&self) -> &Self::Target {
        &self.section
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        let values: Vec<u64> = ip.octets().iter().map(|&o| o as u64).collect();
        Self {
            section: Creator::ipv4().known_section(&values, None),
            fam: IpFam::V4,
        }
    }
}

impl From<Ipv6Addr> for Address {
    fn from(ip: Ipv6Addr) -> Self {
        let values: Vec<u64> = ip.segments().iter().map(|&s| s as u64).collect();
        Self {
            section: Creator::ipv6().known_section(&values, None),
            fam: IpFam::V6,
        }
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(ip) => ip.into(),
            IpAddr::V6(ip) => ip.into(),
        }
    }
}

impl From<IpNet> for Address {
    /// Built under the default policy, so the result is the whole block.
    fn from(net: IpNet) -> Self {
        let prefix: Option<u8> = Some(net.prefix_len());
        let (fam, values): (IpFam, Vec<u64>) = match net {
            IpNet::V4(n) => (IpFam::V4, n.addr().octets().iter().map(|&o| o as u64).collect()),
            IpNet::V6(n) => (IpFam::V6, n.addr().segments().iter().map(|&s| s as u64).collect()),
        };
        let section: Section = Creator::get(fam, PrefixPolicy::default()).known_section(&values, prefix);
        Self { section, fam }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(net) = self.to_ipnet().filter(|n| Some(n.prefix_len()) == self.prefix_len()) {
            return write!(f, "{net}");
        }
        if self.is_multiple() {
            return write!(f, "{}", self.section);
        }
        match self.prefix_len() {
            Some(p) => write!(f, "{}{SLASH}{p}", self.to_ip_addr()),
            None => write!(f, "{}", self.to_ip_addr()),
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Address").field(&self.to_string()).finish()
    }
}

/* -------------------------------------------------------------------------- */
