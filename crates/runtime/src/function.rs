// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Function contexts: what a bound function node carries between
//! `initialize` and `free`.
//!
//! ```text
//! Resolver::try_resolve(&FunctionInfo, &mut Slot)
//!       │  Matched
//!       ▼
//!   Slot { execute, release, state }
//!       │  into_binding()
//!       ▼
//!   FunctionContext ──► forward: execute(&mut Invocation)
//!       │  drop (free / failed initialize / Context drop)
//!       ▼
//!   release(&mut state)   (exactly once)
//! ```

use std::any::Any;

use nnb_format::{Function, FunctionType, Network, Variable};
use tensor_core::DType;

use crate::KernelError;

/// Implementation-private state attached to a bound function.
pub type LocalState = Option<Box<dyn Any>>;

/// Execute routine: runs one function node.
pub type ExecuteFn = Box<dyn FnMut(&mut Invocation<'_, '_>) -> Result<(), KernelError>>;

/// Release routine: runs once when the function context is torn down.
pub type ReleaseFn = Box<dyn FnOnce(&mut LocalState)>;

// ── FunctionInfo ───────────────────────────────────────────────────

/// Everything a resolver or execute routine may inspect about a node.
///
/// Owned: a context keeps no borrow of the descriptor after `initialize`.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    /// Position in the function table (= execution order).
    pub index: usize,
    pub function_type: FunctionType,
    /// Implementation variant id from the descriptor.
    pub variant: u16,
    /// Input variables, in operator argument order.
    pub inputs: Vec<Variable>,
    /// Output variables, in operator argument order.
    pub outputs: Vec<Variable>,
    /// Raw operator parameters.
    pub params: Vec<u8>,
}

impl FunctionInfo {
    pub(crate) fn from_network(network: &Network<'_>, function: &Function) -> Self {
        let lookup = |indices: &[usize]| {
            indices
                .iter()
                .filter_map(|&i| network.variable(i).cloned())
                .collect()
        };
        Self {
            index: function.index,
            function_type: function.function_type,
            variant: function.variant,
            inputs: lookup(&function.inputs),
            outputs: lookup(&function.outputs),
            params: function.params.clone(),
        }
    }

    /// Returns `true` if every input and output holds `dtype` elements.
    pub fn all_dtype(&self, dtype: DType) -> bool {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .all(|v| v.dtype == dtype)
    }
}

// ── Slot ───────────────────────────────────────────────────────────

/// Where a resolver installs its routines.
///
/// A resolver that reports [`Resolution::Matched`](crate::Resolution) must
/// have called [`Slot::set_execute`]. Anything installed by a resolver that
/// declines is discarded without running its release routine.
#[derive(Default)]
pub struct Slot {
    execute: Option<ExecuteFn>,
    release: Option<ReleaseFn>,
    state: LocalState,
}

impl Slot {
    /// Installs the execute routine.
    pub fn set_execute<F>(&mut self, execute: F)
    where
        F: FnMut(&mut Invocation<'_, '_>) -> Result<(), KernelError> + 'static,
    {
        self.execute = Some(Box::new(execute));
    }

    /// Installs the release routine.
    pub fn set_release<F>(&mut self, release: F)
    where
        F: FnOnce(&mut LocalState) + 'static,
    {
        self.release = Some(Box::new(release));
    }

    /// Attaches implementation-private state.
    pub fn set_state<T: Any>(&mut self, state: T) {
        self.state = Some(Box::new(state));
    }

    /// Returns `true` once an execute routine is installed.
    pub fn is_bound(&self) -> bool {
        self.execute.is_some()
    }

    pub(crate) fn into_binding(self) -> Option<Binding> {
        Some(Binding {
            execute: self.execute?,
            release: self.release,
            state: self.state,
        })
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("has_execute", &self.execute.is_some())
            .field("has_release", &self.release.is_some())
            .field("has_state", &self.state.is_some())
            .finish()
    }
}

// ── Binding ────────────────────────────────────────────────────────

/// Installed routines plus private state. Dropping it runs the release
/// routine.
pub(crate) struct Binding {
    execute: ExecuteFn,
    release: Option<ReleaseFn>,
    state: LocalState,
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("has_release", &self.release.is_some())
            .field("has_state", &self.state.is_some())
            .finish()
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(&mut self.state);
        }
    }
}

/// Which implementation a function ended up bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingSource {
    /// The override at this position in the function type's chain.
    Override(usize),
    /// The built-in registry.
    Builtin,
}

impl std::fmt::Display for BindingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Override(position) => write!(f, "override #{position}"),
            Self::Builtin => f.write_str("built-in"),
        }
    }
}

// ── FunctionContext ────────────────────────────────────────────────

/// A function node bound to its implementation.
pub(crate) struct FunctionContext {
    info: FunctionInfo,
    source: BindingSource,
    binding: Binding,
    /// Output regions of the call in flight; empty between calls.
    scratch: Vec<&'static mut [u8]>,
}

impl FunctionContext {
    pub(crate) fn new(info: FunctionInfo, source: BindingSource, binding: Binding) -> Self {
        Self {
            info,
            source,
            binding,
            scratch: Vec::new(),
        }
    }

    pub(crate) fn info(&self) -> &FunctionInfo {
        &self.info
    }

    pub(crate) fn source(&self) -> BindingSource {
        self.source
    }

    /// Runs the execute routine over the per-variable regions.
    ///
    /// Output regions are moved out of `regions` for the duration of the
    /// call so the routine holds them exclusively, then put back. Inputs
    /// are read in place. Allocates only on the first call.
    pub(crate) fn execute(&mut self, regions: &mut [&mut [u8]]) -> Result<(), KernelError> {
        let info = &self.info;
        let mut outputs = recycle(std::mem::take(&mut self.scratch));
        outputs.extend(
            info.outputs
                .iter()
                .map(|v| std::mem::take(&mut regions[v.index])),
        );

        let result = {
            let mut invocation = Invocation {
                info,
                regions: &*regions,
                outputs: outputs.as_mut_slice(),
                state: &mut self.binding.state,
            };
            (self.binding.execute)(&mut invocation)
        };

        for (variable, region) in info.outputs.iter().zip(outputs.drain(..)) {
            regions[variable.index] = region;
        }
        self.scratch = recycle(outputs);
        result
    }
}

impl std::fmt::Debug for FunctionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionContext")
            .field("index", &self.info.index)
            .field("function_type", &self.info.function_type)
            .field("variant", &self.info.variant)
            .field("source", &self.source)
            .finish()
    }
}

// ── Invocation ─────────────────────────────────────────────────────

/// Arguments of one execute call: read-only inputs, exclusive outputs
/// sized exactly to their variables, and the private state.
///
/// Input views live for `'a` independently of `&self`, so a routine can
/// hold its inputs while writing an output.
pub struct Invocation<'a, 'r> {
    info: &'a FunctionInfo,
    /// Every variable's region, indexed by variable; outputs are empty here.
    regions: &'a [&'r mut [u8]],
    outputs: &'a mut [&'r mut [u8]],
    state: &'a mut LocalState,
}

impl<'a, 'r> Invocation<'a, 'r> {
    pub fn info(&self) -> &'a FunctionInfo {
        self.info
    }

    pub fn function_type(&self) -> FunctionType {
        self.info.function_type
    }

    pub fn variant(&self) -> u16 {
        self.info.variant
    }

    pub fn params(&self) -> &'a [u8] {
        &self.info.params
    }

    pub fn input_count(&self) -> usize {
        self.info.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn input_variable(&self, index: usize) -> Result<&'a Variable, KernelError> {
        self.info.inputs.get(index).ok_or(KernelError::MissingArgument {
            argument: "input",
            index,
            count: self.info.inputs.len(),
        })
    }

    pub fn output_variable(&self, index: usize) -> Result<&'a Variable, KernelError> {
        self.info.outputs.get(index).ok_or(KernelError::MissingArgument {
            argument: "output",
            index,
            count: self.info.outputs.len(),
        })
    }

    /// Raw bytes of input `index`.
    pub fn input(&self, index: usize) -> Result<&'a [u8], KernelError> {
        let variable = self.input_variable(index)?;
        let regions: &'a [&'r mut [u8]] = self.regions;
        regions
            .get(variable.index)
            .map(|region| &**region)
            .ok_or(KernelError::MissingArgument {
                argument: "input",
                index,
                count: self.info.inputs.len(),
            })
    }

    /// Raw bytes of output `index`.
    pub fn output(&mut self, index: usize) -> Result<&mut [u8], KernelError> {
        let count = self.outputs.len();
        self.outputs
            .get_mut(index)
            .map(|region| &mut **region)
            .ok_or(KernelError::MissingArgument {
                argument: "output",
                index,
                count,
            })
    }

    /// Input `index` viewed as `f32`.
    pub fn input_f32(&self, index: usize) -> Result<&'a [f32], KernelError> {
        expect_f32("input_f32", self.input_variable(index)?)?;
        bytemuck::try_cast_slice(self.input(index)?).map_err(|_| KernelError::Misaligned {
            argument: "input",
            index,
            view: "f32",
        })
    }

    /// Output `index` viewed as `f32`.
    pub fn output_f32_mut(&mut self, index: usize) -> Result<&mut [f32], KernelError> {
        expect_f32("output_f32_mut", self.output_variable(index)?)?;
        bytemuck::try_cast_slice_mut(self.output(index)?).map_err(|_| KernelError::Misaligned {
            argument: "output",
            index,
            view: "f32",
        })
    }

    /// The function's private state cell.
    pub fn state(&mut self) -> &mut LocalState {
        &mut *self.state
    }

    /// The private state downcast to `T`, if present and of that type.
    pub fn state_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.state.as_mut()?.downcast_mut::<T>()
    }
}

/// Empties `buffer` and returns its allocation retyped for another borrow.
///
/// `Vec` collects a mapped `IntoIter` of a same-layout element in place,
/// so the capacity carries over.
pub(crate) fn recycle<'x, 'y>(mut buffer: Vec<&'x mut [u8]>) -> Vec<&'y mut [u8]> {
    buffer.clear();
    buffer.into_iter().filter_map(|_| None).collect()
}

fn expect_f32(op: &'static str, variable: &Variable) -> Result<(), KernelError> {
    if variable.dtype != DType::F32 {
        return Err(tensor_core::TensorError::UnsupportedDType {
            op,
            dtype: variable.dtype,
        }
        .into());
    }
    Ok(())
}
