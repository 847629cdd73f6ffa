// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `nnb-rt inspect` command: decode a descriptor and print its tables.

use std::path::PathBuf;

use nnb_format::{Network, Storage};
use nnb_runtime::BuiltinRegistry;

pub fn execute(model: PathBuf, json: bool) -> anyhow::Result<()> {
    let mmap = super::map_descriptor(&model)?;
    let network = Network::parse(&mmap)
        .map_err(|e| anyhow::anyhow!("failed to decode '{}': {e}", model.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&network.to_summary())?);
        return Ok(());
    }

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              nnb-rt · Descriptor Inspector           ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Summary ────────────────────────────────────────────────
    println!("  File:       {}", model.display());
    println!("  Version:    {} (api level {})", network.version(), network.api_level());
    println!("  Blocks:     {}", network.block_count());
    println!("  Variables:  {}", network.variables().len());
    println!("  Functions:  {}", network.functions().len());
    println!(
        "  Parameters: {:.1} KB, all variables {:.1} KB",
        network.total_parameter_bytes() as f64 / 1024.0,
        network.total_variable_bytes() as f64 / 1024.0,
    );
    println!();

    // ── Buffers ────────────────────────────────────────────────
    println!("  Buffers:");
    for (i, size) in network.buffers().iter().enumerate() {
        println!("   [{i}] {size} elements");
    }
    println!();

    // ── Variables ──────────────────────────────────────────────
    println!(
        "  {:<4} {:<6} {:<13} {:<8} {:<18} {:>10} {:<10}",
        "Idx", "Id", "Role", "Type", "Shape", "Bytes", "Storage",
    );
    println!("  {}", "-".repeat(76));
    for v in network.variables() {
        let storage = match v.storage {
            Storage::Buffer(b) => format!("buffer {b}"),
            Storage::Parameter(block) => format!("block {block}"),
        };
        println!(
            "  {:<4} {:<6} {:<13} {:<8} {:<18} {:>10} {:<10}",
            v.index,
            v.id,
            v.role.as_str(),
            v.dtype.as_str(),
            v.shape.to_string(),
            v.size_bytes(),
            storage,
        );
    }
    println!();

    // ── Functions ──────────────────────────────────────────────
    let builtins = BuiltinRegistry::with_defaults();
    println!(
        "  {:<4} {:<20} {:>7} {:<14} {:<10} {:<8}",
        "Idx", "Type", "Variant", "Inputs", "Outputs", "Built-in",
    );
    println!("  {}", "-".repeat(68));
    for f in network.functions() {
        println!(
            "  {:<4} {:<20} {:>7} {:<14} {:<10} {:<8}",
            f.index,
            f.function_type.to_string(),
            f.variant,
            format!("{:?}", f.inputs),
            format!("{:?}", f.outputs),
            if builtins.supports(f.function_type) { "yes" } else { "no" },
        );
    }
    println!();
    Ok(())
}
