// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared helpers.

pub mod inspect;
pub mod run;

use std::path::Path;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

/// Installs the log subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Memory-maps a descriptor file.
pub fn map_descriptor(path: &Path) -> anyhow::Result<memmap2::Mmap> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot open '{}'", path.display()))?;
    // SAFETY: the mapping is read-only and dropped before the command returns.
    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .with_context(|| format!("cannot map '{}'", path.display()))?;
    tracing::info!("mapped {} ({} bytes)", path.display(), mmap.len());
    Ok(mmap)
}
