// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-manager
//!
//! Budget-bounded storage for the variables of an NNB network.
//!
//! # Key Components
//!
//! - [`MemoryBudget`] — a hard memory ceiling with human-readable parsing
//!   (`"64K"`, `"16M"`, etc.).
//! - [`BufferArena`] — one allocation made when a context is initialized,
//!   split into a fixed, aligned region per variable. Forward passes only
//!   borrow regions; they never allocate.
//!
//! # Ownership Model
//!
//! ```text
//! BufferArena::allocate(sizes, budget)
//!       │
//!       ▼
//!   Vec<u128> backing store (zero-filled)
//!       │
//!       │  regions_mut()
//!       ▼
//!   Vec<&mut [u8]>  ◄─── one disjoint slice per region
//! ```
//!
//! Handing out all regions as disjoint slices in one call lets the caller
//! read some variables while writing others without any interior
//! mutability.

mod arena;
mod budget;
mod error;

pub use arena::{BufferArena, REGION_ALIGN};
pub use budget::MemoryBudget;
pub use error::MemoryError;
