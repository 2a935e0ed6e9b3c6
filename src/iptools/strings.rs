// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

pub(crate) static DASH: &str = "-";
pub(crate) static SLASH: &str = "/";
pub(crate) static DOT: &str = ".";
pub(crate) static COLON: &str = ":";

// mod.rs
pub(crate) static ERR_SEG_COUNT: &str = "wrong number of segments or bytes";
pub(crate) static ERR_PREFIX_RANGE: &str = "prefix length out of range";
pub(crate) static ERR_INCOMPATIBLE: &str = "operation would not produce a contiguous range";
pub(crate) static ERR_SIZE_MISMATCH: &str = "bit layouts differ";
pub(crate) static ERR_OVERFLOW: &str = "value exceeds the representable address space";
pub(crate) static ERR_NETWORK_MISMATCH: &str = "operands built under different address configurations";
pub(crate) static ERR_VALUE_RANGE: &str = "segment value does not fit";
pub(crate) static ERR_BIT_COUNT: &str = "invalid bit count";

// segment.rs / section.rs
pub(crate) static PANIC_NAUGHTY: &str = "Naughty programmer! Lower cannot be larger than upper!";
