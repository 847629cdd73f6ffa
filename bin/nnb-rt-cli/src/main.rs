// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # nnb-rt
//!
//! Command-line interface for the NNB runtime.
//!
//! ## Usage
//! ```bash
//! # Decode a descriptor and print its tables
//! nnb-rt inspect ./affine_000.nnb --json
//!
//! # Run it with built-in operators, inputs as raw little-endian files
//! nnb-rt run ./affine_000.nnb --input x.bin --output-dir out/ --repeat 10
//! ```

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "nnb-rt",
    about = "Operator dispatch runtime for NNB network descriptors",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a descriptor and print its buffers, variables and functions.
    Inspect {
        /// Path to the `.nnb` file.
        model: PathBuf,

        /// Print the decoded tables as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Initialize a context from a descriptor and run forward passes.
    Run {
        /// Path to the `.nnb` file.
        model: PathBuf,

        /// Raw input data, one file per network input, in input order.
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Directory to write each output as `output_<i>.bin`.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Path to a TOML runtime configuration.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of forward passes.
        #[arg(long, default_value_t = 1)]
        repeat: usize,

        /// Print profiling metrics as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Inspect { model, json } => commands::inspect::execute(model, json),
        Commands::Run {
            model,
            input,
            output_dir,
            config,
            repeat,
            json,
        } => commands::run::execute(commands::run::RunArgs {
            model,
            inputs: input,
            output_dir,
            config,
            repeat,
            json,
        }),
    }
}
