// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! memory_budget = "16M"
//! builtin_variant = 100   # -1 disables the always-built-in variant
//! enable_profiling = true
//! ```

use memory_manager::MemoryBudget;
use std::path::Path;

use crate::RuntimeError;

/// Variant id that, by convention, always selects the built-in implementation.
pub const DEFAULT_BUILTIN_VARIANT: u16 = 100;

/// Configuration for an execution context.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Ceiling on the context's buffer arena (human-readable, e.g. `"16M"`).
    #[serde(default = "default_budget")]
    pub memory_budget: String,
    /// Function variant id that skips all overrides and binds the built-in.
    /// `None` disables the convention.
    #[serde(default = "default_builtin_variant", with = "variant_sentinel")]
    pub builtin_variant: Option<u16>,
    /// Whether to collect per-function timings during `forward`.
    #[serde(default)]
    pub enable_profiling: bool,
}

fn default_budget() -> String {
    "16M".to_string()
}

fn default_builtin_variant() -> Option<u16> {
    Some(DEFAULT_BUILTIN_VARIANT)
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Parses the memory budget string into a [`MemoryBudget`].
    pub fn parse_budget(&self) -> Result<MemoryBudget, RuntimeError> {
        MemoryBudget::parse(&self.memory_budget)
            .map_err(|e| RuntimeError::ConfigError(format!("invalid budget: {e}")))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            memory_budget: default_budget(),
            builtin_variant: default_builtin_variant(),
            enable_profiling: false,
        }
    }
}

/// TOML has no null: the sentinel is stored as an integer, negative = off.
mod variant_sentinel {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u16>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_i64(i64::from(*v)),
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        if raw < 0 {
            return Ok(None);
        }
        u16::try_from(raw)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("builtin_variant {raw} exceeds 65535")))
    }
}
