// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: select operator implementations by variant id.
//!
//! Two overrides are registered for `Affine`; each claims one variant id.
//! The same network is built once per variant and the bound implementation
//! is reported. Variant 100 always binds the built-in.
//!
//! ```bash
//! cargo run -p nnb-runtime --example variant_selection
//! ```

use nnb_format::{FunctionSpec, FunctionType, NetworkWriter, VariableSpec};
use nnb_runtime::{Context, FunctionInfo, Resolution, Slot};

/// x[1,4] ─Affine(W[4,2])─► y[1,2]
fn network(variant: u16) -> Vec<u8> {
    let mut w = NetworkWriter::new();
    let bx = w.buffer(4);
    let by = w.buffer(2);
    let x = w.variable(VariableSpec::buffer(0, &[1, 4], bx));
    let y = w.variable(VariableSpec::buffer(1, &[1, 2], by));
    let weight = w.variable(VariableSpec::parameter_f32(
        2,
        &[4, 2],
        &[1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0],
    ));
    w.function(
        FunctionSpec::new(FunctionType::Affine, &[x, weight], &[y])
            .with_variant(variant)
            .with_i32_param(1),
    );
    w.inputs(&[x]).outputs(&[y]);
    w.to_bytes()
}

/// Resolver claiming `variant` with an execute routine that fills the
/// output with `marker`.
fn marker_override(variant: u16, marker: f32) -> impl Fn(&FunctionInfo, &mut Slot) -> Resolution {
    move |info: &FunctionInfo, slot: &mut Slot| {
        if info.variant != variant {
            return Resolution::NotMatched;
        }
        slot.set_execute(move |inv| {
            inv.output_f32_mut(0)?.fill(marker);
            Ok(())
        });
        Resolution::Matched
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("{:<8} {:<14} {:<20}", "Variant", "Bound to", "Output");
    println!("{}", "-".repeat(44));

    for variant in [0u16, 1, 2, 100] {
        let mut ctx = Context::new();
        ctx.register_override(FunctionType::Affine, marker_override(1, -1.0))?;
        ctx.register_override(FunctionType::Affine, marker_override(2, -2.0))?;
        ctx.register_override(FunctionType::Affine, marker_override(100, -100.0))?;

        ctx.initialize(&network(variant))?;
        ctx.input_f32_mut(0)?.copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        ctx.forward()?;

        println!(
            "{:<8} {:<14} {:<20}",
            variant,
            ctx.binding_source(0)?.to_string(),
            format!("{:?}", ctx.output_f32(0)?),
        );
        ctx.free()?;
    }

    Ok(())
}
