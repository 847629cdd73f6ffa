// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `nnb-rt run` command: bind a descriptor and run forward passes.
//!
//! ```text
//! Context::with_config → initialize(mmap) → copy inputs → forward × N → write outputs → free
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context as _;
use nnb_runtime::{Context, RuntimeConfig};

pub struct RunArgs {
    pub model: PathBuf,
    pub inputs: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub repeat: usize,
    pub json: bool,
}

pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => RuntimeConfig::from_file(path)?,
        None => RuntimeConfig::default(),
    };
    config.enable_profiling |= args.json;

    let mmap = super::map_descriptor(&args.model)?;
    let mut ctx = Context::with_config(config);
    let result = drive(&mut ctx, &mmap, &args);
    // Free on every exit path once the context exists.
    if let Err(e) = ctx.free() {
        tracing::warn!("free failed: {e}");
    }
    result
}

fn drive(ctx: &mut Context, descriptor: &[u8], args: &RunArgs) -> anyhow::Result<()> {
    ctx.initialize(descriptor)
        .with_context(|| format!("cannot initialize '{}'", args.model.display()))?;

    let input_count = ctx.input_count()?;
    if args.inputs.len() > input_count {
        anyhow::bail!(
            "{} input files given, network has {input_count} inputs",
            args.inputs.len()
        );
    }
    if args.inputs.len() < input_count {
        tracing::warn!(
            "{} of {input_count} inputs provided; the rest stay zero-filled",
            args.inputs.len()
        );
    }
    for (i, path) in args.inputs.iter().enumerate() {
        let data =
            std::fs::read(path).with_context(|| format!("cannot read '{}'", path.display()))?;
        let expected = ctx.input_byte_size(i)?;
        if data.len() != expected {
            anyhow::bail!(
                "input {i} ('{}') is {} bytes, expected {expected}",
                path.display(),
                data.len()
            );
        }
        ctx.input_buffer(i)?.copy_from_slice(&data);
    }

    let repeat = args.repeat.max(1);
    let start = Instant::now();
    for _ in 0..repeat {
        ctx.forward()?;
    }
    let elapsed = start.elapsed();

    if args.json {
        if let Some(metrics) = ctx.last_metrics() {
            println!("{}", serde_json::to_string_pretty(metrics)?);
        }
    } else {
        println!(
            "  {} forward passes in {:.3}ms ({:.3}ms each)",
            repeat,
            elapsed.as_secs_f64() * 1000.0,
            elapsed.as_secs_f64() * 1000.0 / repeat as f64,
        );
        for i in 0..ctx.function_count()? {
            println!("   function [{i}] bound to {}", ctx.binding_source(i)?);
        }
        if let Some(metrics) = ctx.last_metrics() {
            println!("   {}", metrics.summary());
        }
    }

    for i in 0..ctx.output_count()? {
        let variable = ctx.output_variable(i)?;
        let (shape, dtype) = (variable.shape.clone(), variable.dtype);
        match &args.output_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("cannot create '{}'", dir.display()))?;
                let path = dir.join(format!("output_{i}.bin"));
                std::fs::write(&path, ctx.output_buffer(i)?)
                    .with_context(|| format!("cannot write '{}'", path.display()))?;
                if !args.json {
                    println!("   output {i} {dtype} {shape} → {}", path.display());
                }
            }
            None if !args.json => match ctx.output_f32(i) {
                Ok(values) => println!("   output {i} {shape}: {}", preview(values)),
                Err(_) => println!("   output {i} {dtype} {shape}: {} bytes", ctx.output_byte_size(i)?),
            },
            None => {}
        }
    }
    Ok(())
}

/// First few values of an output.
fn preview(values: &[f32]) -> String {
    const SHOWN: usize = 8;
    let head: Vec<String> = values.iter().take(SHOWN).map(|v| format!("{v:.4}")).collect();
    let tail = if values.len() > SHOWN { ", ..." } else { "" };
    format!("[{}{tail}]", head.join(", "))
}
