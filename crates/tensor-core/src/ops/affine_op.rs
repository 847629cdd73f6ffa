// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Affine (fully connected) transform.

use super::check_len;
use crate::{Shape, TensorError};

/// Computes `output = reshape(input, [outer, k]) @ reshape(weight, [k, n]) + bias`.
///
/// The input is flattened at `base_axis`: dimensions before it form the
/// batch (`outer`), dimensions from it onward form the reduction size `k`.
/// The weight's first dimension must equal `k`; its remaining dimensions
/// form the output feature size `n`. `bias`, when present, holds `n` values.
///
/// # Errors
/// - [`TensorError::AxisOutOfRange`] if `base_axis` exceeds the input rank.
/// - [`TensorError::ShapeMismatch`] if the weight does not start with `k`.
/// - [`TensorError::BufferSizeMismatch`] if any slice length disagrees
///   with its shape.
pub fn affine(
    input: &[f32],
    input_shape: &Shape,
    weight: &[f32],
    weight_shape: &Shape,
    bias: Option<&[f32]>,
    output: &mut [f32],
    base_axis: usize,
) -> Result<(), TensorError> {
    let (outer, k) = input_shape
        .split_at_axis(base_axis)
        .ok_or(TensorError::AxisOutOfRange {
            op: "affine",
            axis: base_axis,
            rank: input_shape.rank(),
        })?;

    // A rank-0 weight has no reduction dimension and fails the split.
    let shape_mismatch = || TensorError::ShapeMismatch {
        op: "affine",
        lhs: input_shape.clone(),
        rhs: weight_shape.clone(),
    };
    let (weight_k, n) = weight_shape.split_at_axis(1).ok_or_else(shape_mismatch)?;
    if weight_k != k {
        return Err(shape_mismatch());
    }

    check_len("affine (input)", outer * k, input.len())?;
    check_len("affine (weight)", k * n, weight.len())?;
    check_len("affine (output)", outer * n, output.len())?;
    if let Some(b) = bias {
        check_len("affine (bias)", n, b.len())?;
    }

    // ikj loop order keeps the inner loop a saxpy over a contiguous row of
    // the output and of the weight.
    for i in 0..outer {
        let out_row = &mut output[i * n..(i + 1) * n];
        match bias {
            Some(b) => out_row.copy_from_slice(b),
            None => out_row.fill(0.0),
        }
        for p in 0..k {
            let a_ip = input[i * k + p];
            let w_row = &weight[p * n..(p + 1) * n];
            for (o, &w) in out_row.iter_mut().zip(w_row) {
                *o += a_ip * w;
            }
        }
    }

    Ok(())
}
