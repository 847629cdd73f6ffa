// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for memory management.

/// Errors that can occur while sizing or allocating the buffer arena.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The arena would exceed the memory budget, or the allocator refused it.
    #[error("out of memory: requested {requested_bytes} bytes, budget is {budget_bytes}")]
    OutOfMemory {
        requested_bytes: usize,
        budget_bytes: usize,
    },

    /// The combined region sizes do not fit in `usize`.
    #[error("arena layout overflows: region {region} of {size} bytes")]
    LayoutOverflow { region: usize, size: usize },

    /// A budget string could not be parsed.
    #[error("invalid memory budget '{input}': {detail}")]
    InvalidBudget { input: String, detail: String },
}
