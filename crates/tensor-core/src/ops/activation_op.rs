// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise activation functions.

use super::check_len;
use crate::TensorError;

fn map_unary(
    op: &'static str,
    input: &[f32],
    output: &mut [f32],
    f: impl Fn(f32) -> f32,
) -> Result<(), TensorError> {
    check_len(op, input.len(), output.len())?;
    for (d, &x) in output.iter_mut().zip(input) {
        *d = f(x);
    }
    Ok(())
}

/// Rectified linear unit: `max(x, 0)`.
pub fn relu(input: &[f32], output: &mut [f32]) -> Result<(), TensorError> {
    map_unary("relu", input, output, |x| x.max(0.0))
}

/// Leaky ReLU: `x` for positive inputs, `alpha * x` otherwise.
pub fn leaky_relu(input: &[f32], output: &mut [f32], alpha: f32) -> Result<(), TensorError> {
    map_unary("leaky_relu", input, output, |x| if x > 0.0 { x } else { alpha * x })
}

/// Logistic sigmoid: `1 / (1 + exp(-x))`.
pub fn sigmoid(input: &[f32], output: &mut [f32]) -> Result<(), TensorError> {
    map_unary("sigmoid", input, output, |x| 1.0 / (1.0 + (-x).exp()))
}

/// Hyperbolic tangent.
pub fn tanh(input: &[f32], output: &mut [f32]) -> Result<(), TensorError> {
    map_unary("tanh", input, output, f32::tanh)
}
