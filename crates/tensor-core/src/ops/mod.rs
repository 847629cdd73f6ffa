// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Built-in kernels.
//!
//! Each kernel works on flat, row-major `f32` slices and writes into a
//! caller-provided output slice, so the forward path never allocates.

mod activation_op;
mod affine_op;
mod elementwise_op;
mod softmax_op;

pub use activation_op::{leaky_relu, relu, sigmoid, tanh};
pub use affine_op::affine;
pub use elementwise_op::{add2, add_scalar, mul2, mul_scalar, sub2};
pub use softmax_op::softmax;

use crate::TensorError;

/// Checks that `actual` equals `expected`, naming `op` in the error.
pub(crate) fn check_len(op: &'static str, expected: usize, actual: usize) -> Result<(), TensorError> {
    if expected != actual {
        return Err(TensorError::BufferSizeMismatch {
            op,
            expected,
            actual,
        });
    }
    Ok(())
}
