// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Binary element-wise and scalar arithmetic.
//!
//! Binary operations require both operands to have the same number of
//! elements; broadcasting variants are not built in.

use super::check_len;
use crate::TensorError;

fn zip_binary(
    op: &'static str,
    lhs: &[f32],
    rhs: &[f32],
    output: &mut [f32],
    f: impl Fn(f32, f32) -> f32,
) -> Result<(), TensorError> {
    check_len(op, lhs.len(), rhs.len())?;
    check_len(op, lhs.len(), output.len())?;
    for ((d, &a), &b) in output.iter_mut().zip(lhs).zip(rhs) {
        *d = f(a, b);
    }
    Ok(())
}

/// `output = lhs + rhs`.
pub fn add2(lhs: &[f32], rhs: &[f32], output: &mut [f32]) -> Result<(), TensorError> {
    zip_binary("add2", lhs, rhs, output, |a, b| a + b)
}

/// `output = lhs - rhs`.
pub fn sub2(lhs: &[f32], rhs: &[f32], output: &mut [f32]) -> Result<(), TensorError> {
    zip_binary("sub2", lhs, rhs, output, |a, b| a - b)
}

/// `output = lhs * rhs`.
pub fn mul2(lhs: &[f32], rhs: &[f32], output: &mut [f32]) -> Result<(), TensorError> {
    zip_binary("mul2", lhs, rhs, output, |a, b| a * b)
}

/// `output = input + value`.
pub fn add_scalar(input: &[f32], output: &mut [f32], value: f32) -> Result<(), TensorError> {
    check_len("add_scalar", input.len(), output.len())?;
    for (d, &x) in output.iter_mut().zip(input) {
        *d = x + value;
    }
    Ok(())
}

/// `output = input * value`.
pub fn mul_scalar(input: &[f32], output: &mut [f32], value: f32) -> Result<(), TensorError> {
    check_len("mul_scalar", input.len(), output.len())?;
    for (d, &x) in output.iter_mut().zip(input) {
        *d = x * value;
    }
    Ok(())
}
