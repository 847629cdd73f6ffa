// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for kernel execution.

use crate::Shape;

/// Errors that can occur inside a built-in kernel.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// A slice length does not match what the operation expects.
    #[error("{op}: expected {expected} elements, got {actual}")]
    BufferSizeMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Two operands have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// An axis argument lies outside the operand's rank.
    #[error("{op}: axis {axis} out of range for rank {rank}")]
    AxisOutOfRange {
        op: &'static str,
        axis: usize,
        rank: usize,
    },

    /// The requested data type is not supported for this operation.
    #[error("unsupported dtype {dtype} for operation {op}")]
    UnsupportedDType {
        op: &'static str,
        dtype: crate::DType,
    },
}
