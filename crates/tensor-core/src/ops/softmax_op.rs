// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax activation operation.

use super::check_len;
use crate::{Shape, TensorError};

/// Computes softmax along `axis`: `output[i] = exp(x[i] - max) / sum(exp(x - max))`.
///
/// Uses the numerically stable variant that subtracts the maximum value
/// before exponentiation to prevent overflow.
///
/// # Errors
/// Returns [`TensorError::AxisOutOfRange`] if `axis >= shape.rank()`.
/// Returns [`TensorError::BufferSizeMismatch`] if either slice length
/// differs from `shape.num_elements()`.
pub fn softmax(
    input: &[f32],
    output: &mut [f32],
    shape: &Shape,
    axis: usize,
) -> Result<(), TensorError> {
    let size = shape.dim(axis).ok_or(TensorError::AxisOutOfRange {
        op: "softmax",
        axis,
        rank: shape.rank(),
    })?;
    check_len("softmax (input)", shape.num_elements(), input.len())?;
    check_len("softmax (output)", shape.num_elements(), output.len())?;
    if size == 0 {
        return Ok(());
    }

    let inner: usize = shape.dims()[axis + 1..].iter().product();
    let outer = input.len() / (size * inner).max(1);

    for o in 0..outer {
        for i in 0..inner {
            let base = o * size * inner + i;
            let at = |j: usize| base + j * inner;

            // Find max for numerical stability.
            let max_val = (0..size)
                .map(|j| input[at(j)])
                .fold(f32::NEG_INFINITY, f32::max);

            let mut sum = 0.0f32;
            for j in 0..size {
                let e = (input[at(j)] - max_val).exp();
                output[at(j)] = e;
                sum += e;
            }

            if sum > 0.0 {
                let inv_sum = 1.0 / sum;
                for j in 0..size {
                    output[at(j)] *= inv_sum;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &[f32], b: &[f32], tol: f32) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < tol)
    }

    #[test]
    fn test_softmax_uniform() {
        let input = [1.0, 1.0, 1.0, 1.0];
        let mut output = [0.0f32; 4];

        softmax(&input, &mut output, &Shape::vector(4), 0).unwrap();

        assert!(approx_eq(&output, &[0.25, 0.25, 0.25, 0.25], 1e-5));
    }

    #[test]
    fn test_softmax_monotonic() {
        let input = [1.0, 2.0, 3.0];
        let mut output = [0.0f32; 3];

        softmax(&input, &mut output, &Shape::vector(3), 0).unwrap();

        assert!(output[0] < output[1]);
        assert!(output[1] < output[2]);
        let sum: f32 = output.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_softmax_last_axis_rows() {
        let input = [1.0, 2.0, 3.0, 1.0, 1.0, 1.0];
        let mut output = [0.0f32; 6];

        softmax(&input, &mut output, &Shape::matrix(2, 3), 1).unwrap();

        let sum0: f32 = output[0..3].iter().sum();
        assert!((sum0 - 1.0).abs() < 1e-5);
        assert!(approx_eq(&output[3..6], &[1.0 / 3.0; 3], 1e-5));
    }

    #[test]
    fn test_softmax_first_axis_columns() {
        // Columns of [[0, 5], [0, 5]] are each uniform.
        let input = [0.0, 5.0, 0.0, 5.0];
        let mut output = [0.0f32; 4];

        softmax(&input, &mut output, &Shape::matrix(2, 2), 0).unwrap();

        assert!(approx_eq(&output, &[0.5, 0.5, 0.5, 0.5], 1e-6));
    }

    #[test]
    fn test_softmax_numerical_stability() {
        let input = [1000.0, 1001.0, 1002.0];
        let mut output = [0.0f32; 3];

        softmax(&input, &mut output, &Shape::vector(3), 0).unwrap();

        let sum: f32 = output.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(output.iter().all(|&x| x.is_finite()));
    }

    #[test]
    fn test_softmax_bad_axis() {
        let input = [0.0; 4];
        let mut output = [0.0f32; 4];
        let result = softmax(&input, &mut output, &Shape::matrix(2, 2), 2);
        assert!(matches!(result, Err(TensorError::AxisOutOfRange { axis: 2, rank: 2, .. })));
    }
}
