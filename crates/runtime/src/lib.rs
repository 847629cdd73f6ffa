// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # nnb-runtime
//!
//! Operator dispatch and execution context for NNB networks.
//!
//! A [`Context`] binds one descriptor at a time:
//! - Each function node is resolved once, at `initialize`, through the
//!   override chain registered for its type and then the built-in registry
//!   (see [`DispatchTable`]).
//! - Variables live in a single arena allocated at `initialize` within the
//!   configured memory budget; parameter data is copied in from the
//!   descriptor.
//! - `forward` runs every bound function in descriptor order and can be
//!   called any number of times, with the caller rewriting input buffers in
//!   between.
//!
//! # Lifecycle
//! ```text
//! Configuring ──initialize──► Ready ──free──► Freed
//!      ▲  register_override      │ forward
//!      └──────────────┘          └──────┘
//! ```
//! Calls outside that order fail with [`RuntimeError::InvalidState`].
//!
//! # Overrides
//! ```no_run
//! use nnb_format::FunctionType;
//! use nnb_runtime::{Context, FunctionInfo, Resolution, Slot};
//!
//! # fn example(bytes: &[u8]) -> Result<(), nnb_runtime::RuntimeError> {
//! let mut ctx = Context::new();
//! ctx.register_override(FunctionType::ReLU, |info: &FunctionInfo, slot: &mut Slot| {
//!     if info.variant != 3 {
//!         return Resolution::NotMatched;
//!     }
//!     slot.set_execute(|inv| {
//!         let x = inv.input_f32(0)?;
//!         for (y, v) in inv.output_f32_mut(0)?.iter_mut().zip(x) {
//!             *y = v.max(0.0);
//!         }
//!         Ok(())
//!     });
//!     Resolution::Matched
//! })?;
//! ctx.initialize(bytes)?;
//! ctx.forward()?;
//! ctx.free()?;
//! # Ok(())
//! # }
//! ```

mod builtin;
mod config;
mod context;
mod dispatch;
mod error;
mod forward;
mod function;
mod metrics;

pub use builtin::{BuiltinInstaller, BuiltinRegistry};
pub use config::{RuntimeConfig, DEFAULT_BUILTIN_VARIANT};
pub use context::{Context, ContextState};
pub use dispatch::{DispatchTable, Resolution, Resolver};
pub use error::{status_of, KernelError, RuntimeError, Status};
pub use function::{BindingSource, ExecuteFn, FunctionInfo, Invocation, LocalState, ReleaseFn, Slot};
pub use metrics::{ForwardMetrics, FunctionMetrics};
