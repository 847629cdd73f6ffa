// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Element types, shapes and the built-in f32 kernels used by the NNB runtime.
//!
//! This crate provides:
//! - [`DType`] — the element types an NNB variable can declare (float and
//!   the fixed-point / sign encodings), with their on-wire codes.
//! - [`Shape`] — dimension descriptors with element-count and byte-size helpers.
//! - Kernels over flat `f32` slices: affine, softmax, element-wise
//!   activations, binary element-wise and scalar operations.
//!
//! # Design Goals
//! - Kernels never allocate: they read from input slices and write into
//!   caller-provided output slices of the exact expected length.
//! - Every length or shape disagreement is reported as a [`TensorError`]
//!   rather than a panic.

mod dtype;
mod error;
mod ops;
mod shape;

pub use dtype::DType;
pub use error::TensorError;
pub use ops::{
    add2, add_scalar, affine, leaky_relu, mul2, mul_scalar, relu, sigmoid, softmax, sub2, tanh,
};
pub use shape::Shape;
