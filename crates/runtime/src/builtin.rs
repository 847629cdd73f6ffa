// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Built-in implementations, keyed by `(function type, variant)`.
//!
//! An installer validates a node's arity, shapes and parameters at
//! `initialize` and installs an execute routine over the `tensor-core`
//! kernels. Every built-in here is registered as variant 0, the default
//! that any variant without its own entry falls back to.

use std::collections::HashMap;

use nnb_format::{AffineParams, AxisParams, FormatError, FunctionType, ScalarParams};
use tensor_core::Shape;

use crate::function::{FunctionInfo, Slot};

/// Validates a node and installs its execute routine.
pub type BuiltinInstaller = fn(&FunctionInfo, &mut Slot) -> Result<(), FormatError>;

/// Negative slope used by `LeakyReLU` when the node carries no parameter.
const DEFAULT_LEAKY_ALPHA: f32 = 0.1;

/// Table of built-in implementations.
#[derive(Clone, Default)]
pub struct BuiltinRegistry {
    entries: HashMap<(FunctionType, u16), BuiltinInstaller>,
}

impl BuiltinRegistry {
    /// A registry with no built-ins.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard set of float built-ins, all as variant 0.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(FunctionType::Affine, 0, install_affine);
        registry.register(FunctionType::ReLU, 0, install_relu);
        registry.register(FunctionType::LeakyReLU, 0, install_leaky_relu);
        registry.register(FunctionType::Sigmoid, 0, install_sigmoid);
        registry.register(FunctionType::Tanh, 0, install_tanh);
        registry.register(FunctionType::Softmax, 0, install_softmax);
        registry.register(FunctionType::Add2, 0, install_add2);
        registry.register(FunctionType::Sub2, 0, install_sub2);
        registry.register(FunctionType::Mul2, 0, install_mul2);
        registry.register(FunctionType::AddScalar, 0, install_add_scalar);
        registry.register(FunctionType::MulScalar, 0, install_mul_scalar);
        registry
    }

    /// Registers (or replaces) the built-in for `(function_type, variant)`.
    pub fn register(&mut self, function_type: FunctionType, variant: u16, installer: BuiltinInstaller) {
        self.entries.insert((function_type, variant), installer);
    }

    /// Finds the installer for `(function_type, variant)`, falling back to
    /// variant 0.
    pub fn lookup(&self, function_type: FunctionType, variant: u16) -> Option<BuiltinInstaller> {
        self.entries
            .get(&(function_type, variant))
            .or_else(|| self.entries.get(&(function_type, 0)))
            .copied()
    }

    /// Returns `true` if some built-in would bind `function_type`.
    pub fn supports(&self, function_type: FunctionType) -> bool {
        self.entries.keys().any(|(ty, _)| *ty == function_type)
    }

    /// Function types with at least one built-in, ordered by type code.
    pub fn function_types(&self) -> Vec<FunctionType> {
        let mut types: Vec<FunctionType> = self.entries.keys().map(|(ty, _)| *ty).collect();
        types.sort_by_key(|ty| ty.code());
        types.dedup();
        types
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.function_types()).finish()
    }
}

// ── Validation helpers ─────────────────────────────────────────────

fn invalid(info: &FunctionInfo, detail: String) -> FormatError {
    FormatError::InvalidFunction {
        function: info.index,
        detail,
    }
}

fn expect_arity(
    info: &FunctionInfo,
    min_inputs: usize,
    max_inputs: usize,
    outputs: usize,
) -> Result<(), FormatError> {
    let n_in = info.inputs.len();
    if n_in < min_inputs || n_in > max_inputs || info.outputs.len() != outputs {
        let expected = if min_inputs == max_inputs {
            min_inputs.to_string()
        } else {
            format!("{min_inputs}..={max_inputs}")
        };
        return Err(invalid(
            info,
            format!(
                "{} takes {expected} inputs and {outputs} outputs, got {} and {}",
                info.function_type,
                n_in,
                info.outputs.len()
            ),
        ));
    }
    Ok(())
}

fn expect_same_size(info: &FunctionInfo) -> Result<(), FormatError> {
    let expected = info.outputs[0].num_elements();
    if let Some(v) = info.inputs.iter().find(|v| v.num_elements() != expected) {
        return Err(invalid(
            info,
            format!(
                "{} input variable {} has shape {}, output has {} elements",
                info.function_type,
                v.index,
                v.shape,
                expected
            ),
        ));
    }
    Ok(())
}

// ── Installers ─────────────────────────────────────────────────────

fn install_affine(info: &FunctionInfo, slot: &mut Slot) -> Result<(), FormatError> {
    expect_arity(info, 2, 3, 1)?;
    let base_axis = AffineParams::parse(&info.params)?.base_axis;

    let input_shape: Shape = info.inputs[0].shape.clone();
    let weight_shape: Shape = info.inputs[1].shape.clone();
    let (outer, k) = input_shape.split_at_axis(base_axis).ok_or_else(|| {
        invalid(
            info,
            format!("base_axis {base_axis} out of range for input {input_shape}"),
        )
    })?;
    let (_, n) = weight_shape
        .split_at_axis(1)
        .filter(|&(wk, _)| wk == k)
        .ok_or_else(|| {
            invalid(
                info,
                format!("weight {weight_shape} does not match input {input_shape} at axis {base_axis}"),
            )
        })?;
    if info.outputs[0].num_elements() != outer * n {
        return Err(invalid(
            info,
            format!(
                "output {} does not hold {outer}x{n} elements",
                info.outputs[0].shape
            ),
        ));
    }
    let has_bias = info.inputs.len() == 3;
    if has_bias && info.inputs[2].num_elements() != n {
        return Err(invalid(
            info,
            format!("bias {} does not hold {n} elements", info.inputs[2].shape),
        ));
    }

    slot.set_execute(move |inv| {
        let x = inv.input_f32(0)?;
        let w = inv.input_f32(1)?;
        let b = if has_bias { Some(inv.input_f32(2)?) } else { None };
        let y = inv.output_f32_mut(0)?;
        tensor_core::affine(x, &input_shape, w, &weight_shape, b, y, base_axis)?;
        Ok(())
    });
    Ok(())
}

fn install_unary(
    info: &FunctionInfo,
    slot: &mut Slot,
    op: fn(&[f32], &mut [f32]) -> Result<(), tensor_core::TensorError>,
) -> Result<(), FormatError> {
    expect_arity(info, 1, 1, 1)?;
    expect_same_size(info)?;
    slot.set_execute(move |inv| {
        let x = inv.input_f32(0)?;
        op(x, inv.output_f32_mut(0)?)?;
        Ok(())
    });
    Ok(())
}

fn install_relu(info: &FunctionInfo, slot: &mut Slot) -> Result<(), FormatError> {
    install_unary(info, slot, tensor_core::relu)
}

fn install_sigmoid(info: &FunctionInfo, slot: &mut Slot) -> Result<(), FormatError> {
    install_unary(info, slot, tensor_core::sigmoid)
}

fn install_tanh(info: &FunctionInfo, slot: &mut Slot) -> Result<(), FormatError> {
    install_unary(info, slot, tensor_core::tanh)
}

fn install_leaky_relu(info: &FunctionInfo, slot: &mut Slot) -> Result<(), FormatError> {
    expect_arity(info, 1, 1, 1)?;
    expect_same_size(info)?;
    let alpha = if info.params.is_empty() {
        DEFAULT_LEAKY_ALPHA
    } else {
        ScalarParams::parse(info.function_type, &info.params)?.value
    };
    slot.set_execute(move |inv| {
        let x = inv.input_f32(0)?;
        tensor_core::leaky_relu(x, inv.output_f32_mut(0)?, alpha)?;
        Ok(())
    });
    Ok(())
}

fn install_softmax(info: &FunctionInfo, slot: &mut Slot) -> Result<(), FormatError> {
    expect_arity(info, 1, 1, 1)?;
    expect_same_size(info)?;
    let shape = info.inputs[0].shape.clone();
    let axis = if info.params.is_empty() {
        shape.rank().saturating_sub(1)
    } else {
        AxisParams::parse(info.function_type, &info.params)?.axis
    };
    if axis >= shape.rank() {
        return Err(invalid(
            info,
            format!("softmax axis {axis} out of range for {shape}"),
        ));
    }
    slot.set_execute(move |inv| {
        let x = inv.input_f32(0)?;
        tensor_core::softmax(x, inv.output_f32_mut(0)?, &shape, axis)?;
        Ok(())
    });
    Ok(())
}

fn install_binary(
    info: &FunctionInfo,
    slot: &mut Slot,
    op: fn(&[f32], &[f32], &mut [f32]) -> Result<(), tensor_core::TensorError>,
) -> Result<(), FormatError> {
    expect_arity(info, 2, 2, 1)?;
    expect_same_size(info)?;
    slot.set_execute(move |inv| {
        let a = inv.input_f32(0)?;
        let b = inv.input_f32(1)?;
        op(a, b, inv.output_f32_mut(0)?)?;
        Ok(())
    });
    Ok(())
}

fn install_add2(info: &FunctionInfo, slot: &mut Slot) -> Result<(), FormatError> {
    install_binary(info, slot, tensor_core::add2)
}

fn install_sub2(info: &FunctionInfo, slot: &mut Slot) -> Result<(), FormatError> {
    install_binary(info, slot, tensor_core::sub2)
}

fn install_mul2(info: &FunctionInfo, slot: &mut Slot) -> Result<(), FormatError> {
    install_binary(info, slot, tensor_core::mul2)
}

fn install_scalar(
    info: &FunctionInfo,
    slot: &mut Slot,
    op: fn(&[f32], &mut [f32], f32) -> Result<(), tensor_core::TensorError>,
) -> Result<(), FormatError> {
    expect_arity(info, 1, 1, 1)?;
    expect_same_size(info)?;
    let value = ScalarParams::parse(info.function_type, &info.params)?.value;
    slot.set_execute(move |inv| {
        let x = inv.input_f32(0)?;
        op(x, inv.output_f32_mut(0)?, value)?;
        Ok(())
    });
    Ok(())
}

fn install_add_scalar(info: &FunctionInfo, slot: &mut Slot) -> Result<(), FormatError> {
    install_scalar(info, slot, tensor_core::add_scalar)
}

fn install_mul_scalar(info: &FunctionInfo, slot: &mut Slot) -> Result<(), FormatError> {
    install_scalar(info, slot, tensor_core::mul_scalar)
}
