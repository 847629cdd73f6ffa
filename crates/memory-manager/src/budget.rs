// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory budget configuration and parsing.
//!
//! A [`MemoryBudget`] is the ceiling on the single arena a runtime context
//! allocates at initialization. It parses human-readable strings so it can
//! be written directly in a TOML config.

use crate::MemoryError;
use std::fmt;
use std::str::FromStr;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const GIB: usize = 1024 * MIB;

/// Accepted suffixes, longest first so `"MB"` wins over `"B"`.
const SUFFIXES: &[(&str, usize)] = &[
    ("GB", GIB),
    ("MB", MIB),
    ("KB", KIB),
    ("G", GIB),
    ("M", MIB),
    ("K", KIB),
    ("B", 1),
];

/// A hard ceiling on arena size.
///
/// # Parsing
/// A byte count with an optional binary suffix, case-insensitive:
/// `"16M"`/`"16MB"` (× 1024²), `"1G"`/`"1GB"` (× 1024³), `"64K"`/`"64KB"`
/// (× 1024), `"512B"` or a plain `"512"`.
///
/// # Examples
/// ```
/// use memory_manager::MemoryBudget;
///
/// let b: MemoryBudget = "64K".parse().unwrap();
/// assert_eq!(b.as_bytes(), 65536);
/// assert!(b.fits(65536));
/// assert!(!b.fits(65537));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct MemoryBudget {
    bytes: usize,
}

impl MemoryBudget {
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    pub fn from_kb(kb: usize) -> Self {
        Self::from_bytes(kb.saturating_mul(KIB))
    }

    pub fn from_mb(mb: usize) -> Self {
        Self::from_bytes(mb.saturating_mul(MIB))
    }

    pub fn from_gb(gb: usize) -> Self {
        Self::from_bytes(gb.saturating_mul(GIB))
    }

    /// Returns the budget in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Returns the budget in megabytes (truncated).
    pub fn as_mb(&self) -> usize {
        self.bytes / MIB
    }

    /// Returns `true` if an allocation of `bytes` stays within the budget.
    pub fn fits(&self, bytes: usize) -> bool {
        bytes <= self.bytes
    }

    /// Parses a human-readable budget string.
    ///
    /// # Errors
    /// [`MemoryError::InvalidBudget`] for an empty, non-numeric, zero or
    /// overflowing value.
    pub fn parse(s: &str) -> Result<Self, MemoryError> {
        let input = s.trim();
        let invalid = |detail: &str| MemoryError::InvalidBudget {
            input: input.to_string(),
            detail: detail.to_string(),
        };
        if input.is_empty() {
            return Err(invalid("empty string"));
        }

        let upper = input.to_ascii_uppercase();
        let (digits, unit) = SUFFIXES
            .iter()
            .find_map(|&(suffix, unit)| upper.strip_suffix(suffix).map(|rest| (rest, unit)))
            .unwrap_or((upper.as_str(), 1));

        let value: usize = digits
            .trim()
            .parse()
            .map_err(|_| invalid("expected a number followed by an optional suffix (K, M, G)"))?;
        let bytes = value
            .checked_mul(unit)
            .ok_or_else(|| invalid("value overflows"))?;
        if bytes == 0 {
            return Err(invalid("budget must be non-zero"));
        }
        Ok(Self { bytes })
    }
}

impl FromStr for MemoryBudget {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, unit) in [("GB", GIB), ("MB", MIB), ("KB", KIB)] {
            if self.bytes >= unit && self.bytes % unit == 0 {
                return write!(f, "{} {label}", self.bytes / unit);
            }
        }
        write!(f, "{} B", self.bytes)
    }
}
