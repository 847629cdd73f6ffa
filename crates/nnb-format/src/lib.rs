// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # nnb-format
//!
//! Decoder for NNB, the compact binary descriptor of a precompiled
//! inference network.
//!
//! An NNB blob carries everything the runtime needs to bind and execute a
//! network, with no external metadata:
//!
//! - [`Variable`] — id, [`DType`](tensor_core::DType), shape and storage
//!   (a runtime buffer, or a parameter block embedded in the descriptor).
//! - [`Function`] — an operator node: [`FunctionType`] tag, implementation
//!   variant id, input/output variable indices and raw parameters.
//! - [`Network`] — the validated tables, borrowing the blob for parameter data.
//!
//! # Layout
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Header (56 bytes, little-endian)         │
//! │   version, api_level                     │
//! │   buffers / variables / functions /      │
//! │   inputs / outputs  (count, block) lists │
//! │   block_count, data_size                 │
//! ├──────────────────────────────────────────┤
//! │ Block offset table (block_count × u32)   │
//! ├──────────────────────────────────────────┤
//! │ Data region (data_size bytes)            │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Example
//! ```no_run
//! let bytes = std::fs::read("model.nnb").unwrap();
//! let network = nnb_format::Network::parse(&bytes).unwrap();
//! println!("{}", network.summary());
//! for function in network.functions() {
//!     println!("  {}", function.summary());
//! }
//! ```

mod error;
mod function;
pub mod network;
mod reader;
mod variable;
#[cfg(feature = "writer")]
pub mod writer;

pub use error::FormatError;
pub use function::{AffineParams, AxisParams, Function, FunctionType, ScalarParams};
pub use network::{Network, NetworkSummary, SUPPORTED_VERSIONS};
pub use variable::{Storage, Variable, VariableRole};
#[cfg(feature = "writer")]
pub use writer::{FunctionSpec, NetworkWriter, VariableSpec};
