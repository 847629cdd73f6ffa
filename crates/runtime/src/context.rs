// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The execution context and its lifecycle.
//!
//! ```text
//! Context::new()            Configuring ◄─┐ register_override()
//!     │  initialize(bytes)       │        │ (failed initialize)
//!     ▼                          ▼        │
//!   decode ─► resolve every function ─► allocate arena ─► Ready
//!                                                          │ forward() (any number)
//!                                                          │ input_buffer()/output_buffer()
//!                                                          ▼
//!                                               free() ─► Freed
//! ```
//!
//! Lifecycle is checked at runtime: any call outside its state fails with
//! [`RuntimeError::InvalidState`] and leaves the context untouched.

use memory_manager::BufferArena;
use nnb_format::{FunctionType, Network, Variable};
use tensor_core::DType;

use crate::builtin::BuiltinRegistry;
use crate::dispatch::{DispatchTable, Resolver};
use crate::function::{BindingSource, FunctionContext, FunctionInfo};
use crate::{forward, ForwardMetrics, RuntimeConfig, RuntimeError};

/// Lifecycle state of a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextState {
    /// Accepting override registrations; no descriptor bound.
    Configuring,
    /// Descriptor bound, every function resolved, buffers allocated.
    Ready,
    /// Terminal.
    Freed,
}

impl ContextState {
    /// Returns a human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuring => "configuring",
            Self::Ready => "ready",
            Self::Freed => "freed",
        }
    }
}

impl std::fmt::Display for ContextState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What `initialize` binds. Dropping it releases every function's state.
struct Bound {
    inputs: Vec<Variable>,
    outputs: Vec<Variable>,
    functions: Vec<FunctionContext>,
    arena: BufferArena,
    /// Region table reused by every forward pass.
    scratch: Vec<&'static mut [u8]>,
}

/// Owns one bound network: its resolved functions and its buffers.
///
/// # Example
/// ```no_run
/// use nnb_runtime::Context;
///
/// # fn example(bytes: &[u8]) -> Result<(), nnb_runtime::RuntimeError> {
/// let mut ctx = Context::new();
/// ctx.initialize(bytes)?;
/// ctx.input_f32_mut(0)?.fill(1.0);
/// ctx.forward()?;
/// println!("{:?}", ctx.output_f32(0)?);
/// ctx.free()?;
/// # Ok(())
/// # }
/// ```
pub struct Context {
    config: RuntimeConfig,
    state: ContextState,
    dispatch: DispatchTable,
    bound: Option<Bound>,
    last_metrics: Option<ForwardMetrics>,
}

impl Context {
    /// Creates a context with the default configuration and built-ins.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates a context with the standard built-ins.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_builtins(config, BuiltinRegistry::with_defaults())
    }

    /// Creates a context with a caller-supplied built-in registry.
    pub fn with_builtins(config: RuntimeConfig, builtins: BuiltinRegistry) -> Self {
        let dispatch = DispatchTable::new(builtins, config.builtin_variant);
        Self {
            config,
            state: ContextState::Configuring,
            dispatch,
            bound: None,
            last_metrics: None,
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn invalid_state(&self, operation: &'static str) -> RuntimeError {
        RuntimeError::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn bound(&self, operation: &'static str) -> Result<&Bound, RuntimeError> {
        match (&self.bound, self.state) {
            (Some(bound), ContextState::Ready) => Ok(bound),
            _ => Err(self.invalid_state(operation)),
        }
    }

    fn bound_mut(&mut self, operation: &'static str) -> Result<&mut Bound, RuntimeError> {
        let state = self.state;
        match self.bound.as_mut() {
            Some(bound) if state == ContextState::Ready => Ok(bound),
            _ => Err(RuntimeError::InvalidState { operation, state }),
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Appends `resolver` to the override chain of `function_type`.
    ///
    /// # Errors
    /// [`RuntimeError::InvalidState`] unless the context is configuring.
    pub fn register_override<R>(
        &mut self,
        function_type: FunctionType,
        resolver: R,
    ) -> Result<(), RuntimeError>
    where
        R: Resolver + 'static,
    {
        if self.state != ContextState::Configuring {
            return Err(self.invalid_state("register an override"));
        }
        self.dispatch.register(function_type, Box::new(resolver));
        Ok(())
    }

    /// Binds a descriptor: decodes it, resolves every function and
    /// allocates one zero-filled region per variable, with parameter
    /// variables filled from the descriptor.
    ///
    /// On error nothing stays bound: functions resolved so far are released
    /// and the context remains configuring.
    ///
    /// # Errors
    /// - [`RuntimeError::InvalidState`] unless the context is configuring.
    /// - [`RuntimeError::ConfigError`] if the memory budget does not parse.
    /// - [`RuntimeError::MalformedDescriptor`] if decoding fails.
    /// - [`RuntimeError::UnsupportedOperator`] if a function cannot be bound.
    /// - [`RuntimeError::Memory`] if the buffers exceed the budget.
    pub fn initialize(&mut self, descriptor: &[u8]) -> Result<(), RuntimeError> {
        if self.state != ContextState::Configuring {
            return Err(self.invalid_state("initialize"));
        }
        let budget = self.config.parse_budget()?;
        let network = Network::parse(descriptor)?;
        tracing::debug!("{}", network.summary());

        let mut functions = Vec::with_capacity(network.functions().len());
        for function in network.functions() {
            let info = FunctionInfo::from_network(&network, function);
            let (binding, source) = self.dispatch.resolve(&info)?;
            functions.push(FunctionContext::new(info, source, binding));
        }

        let sizes: Vec<usize> = network.variables().iter().map(Variable::size_bytes).collect();
        let mut arena = BufferArena::allocate(&sizes, budget)?;
        for variable in network.variables() {
            if let (Some(data), Some(region)) =
                (network.parameter_data(variable), arena.region_mut(variable.index))
            {
                region.copy_from_slice(data);
            }
        }

        let select = |indices: &[usize]| -> Vec<Variable> {
            indices
                .iter()
                .filter_map(|&i| network.variable(i).cloned())
                .collect()
        };
        let overridden = functions
            .iter()
            .filter(|f| matches!(f.source(), BindingSource::Override(_)))
            .count();
        tracing::info!(
            "context ready: {} functions ({} overridden), {} variables, arena {} bytes of {}",
            functions.len(),
            overridden,
            sizes.len(),
            arena.total_bytes(),
            budget,
        );

        self.bound = Some(Bound {
            inputs: select(network.inputs()),
            outputs: select(network.outputs()),
            functions,
            arena,
            scratch: Vec::new(),
        });
        self.state = ContextState::Ready;
        Ok(())
    }

    /// Runs every function once, in descriptor order.
    ///
    /// # Errors
    /// - [`RuntimeError::InvalidState`] unless the context is ready.
    /// - [`RuntimeError::OperatorExecutionFailure`] if an execute routine
    ///   fails. The pass stops there and the context stays ready.
    pub fn forward(&mut self) -> Result<(), RuntimeError> {
        let profiling = self.config.enable_profiling;
        let bound = self.bound_mut("forward")?;
        let metrics = forward::run(
            &mut bound.functions,
            &mut bound.arena,
            &mut bound.scratch,
            profiling,
        )?;
        if metrics.is_some() {
            self.last_metrics = metrics;
        }
        Ok(())
    }

    /// Releases every function's private state and the buffers.
    ///
    /// # Errors
    /// [`RuntimeError::InvalidState`] if the context is already freed.
    pub fn free(&mut self) -> Result<(), RuntimeError> {
        if self.state == ContextState::Freed {
            return Err(self.invalid_state("free"));
        }
        if let Some(bound) = self.bound.take() {
            let count = bound.functions.len();
            drop(bound);
            tracing::info!("context freed: {count} functions released");
        }
        self.last_metrics = None;
        self.state = ContextState::Freed;
        Ok(())
    }

    // ── Inputs ─────────────────────────────────────────────────────

    pub fn input_count(&self) -> Result<usize, RuntimeError> {
        Ok(self.bound("query inputs")?.inputs.len())
    }

    /// Descriptor of network input `index`.
    pub fn input_variable(&self, index: usize) -> Result<&Variable, RuntimeError> {
        let inputs = &self.bound("query inputs")?.inputs;
        inputs.get(index).ok_or(RuntimeError::IndexOutOfRange {
            what: "input",
            index,
            count: inputs.len(),
        })
    }

    /// Element count of network input `index`.
    pub fn input_size(&self, index: usize) -> Result<usize, RuntimeError> {
        Ok(self.input_variable(index)?.num_elements())
    }

    /// Byte size of network input `index`.
    pub fn input_byte_size(&self, index: usize) -> Result<usize, RuntimeError> {
        Ok(self.input_variable(index)?.size_bytes())
    }

    /// Writable buffer of network input `index`.
    pub fn input_buffer(&mut self, index: usize) -> Result<&mut [u8], RuntimeError> {
        let bound = self.bound_mut("access inputs")?;
        let variable = lookup(&bound.inputs, "input", index)?.index;
        region_mut(&mut bound.arena, variable)
    }

    /// Writable buffer of network input `index` viewed as `f32`.
    pub fn input_f32_mut(&mut self, index: usize) -> Result<&mut [f32], RuntimeError> {
        let bound = self.bound_mut("access inputs")?;
        let variable = lookup(&bound.inputs, "input", index)?;
        let (region, dtype) = (variable.index, variable.dtype);
        expect_f32(region, dtype)?;
        as_f32_mut(region_mut(&mut bound.arena, region)?, region)
    }

    // ── Outputs ────────────────────────────────────────────────────

    pub fn output_count(&self) -> Result<usize, RuntimeError> {
        Ok(self.bound("query outputs")?.outputs.len())
    }

    /// Descriptor of network output `index`.
    pub fn output_variable(&self, index: usize) -> Result<&Variable, RuntimeError> {
        let outputs = &self.bound("query outputs")?.outputs;
        outputs.get(index).ok_or(RuntimeError::IndexOutOfRange {
            what: "output",
            index,
            count: outputs.len(),
        })
    }

    /// Element count of network output `index`.
    pub fn output_size(&self, index: usize) -> Result<usize, RuntimeError> {
        Ok(self.output_variable(index)?.num_elements())
    }

    /// Byte size of network output `index`.
    pub fn output_byte_size(&self, index: usize) -> Result<usize, RuntimeError> {
        Ok(self.output_variable(index)?.size_bytes())
    }

    /// Buffer of network output `index`.
    pub fn output_buffer(&self, index: usize) -> Result<&[u8], RuntimeError> {
        let bound = self.bound("access outputs")?;
        let variable = lookup(&bound.outputs, "output", index)?.index;
        bound
            .arena
            .region(variable)
            .ok_or(RuntimeError::IndexOutOfRange {
                what: "buffer",
                index: variable,
                count: bound.arena.len(),
            })
    }

    /// Writable buffer of network output `index`.
    pub fn output_buffer_mut(&mut self, index: usize) -> Result<&mut [u8], RuntimeError> {
        let bound = self.bound_mut("access outputs")?;
        let variable = lookup(&bound.outputs, "output", index)?.index;
        region_mut(&mut bound.arena, variable)
    }

    /// Buffer of network output `index` viewed as `f32`.
    pub fn output_f32(&self, index: usize) -> Result<&[f32], RuntimeError> {
        let variable = self.output_variable(index)?;
        let (region, dtype) = (variable.index, variable.dtype);
        expect_f32(region, dtype)?;
        bytemuck::try_cast_slice(self.output_buffer(index)?).map_err(|_| {
            RuntimeError::DTypeMismatch {
                variable: region,
                dtype,
                view: "f32",
            }
        })
    }

    // ── Functions ──────────────────────────────────────────────────

    /// Number of bound functions.
    pub fn function_count(&self) -> Result<usize, RuntimeError> {
        Ok(self.bound("query functions")?.functions.len())
    }

    /// Which implementation function `index` was bound to.
    pub fn binding_source(&self, index: usize) -> Result<BindingSource, RuntimeError> {
        let functions = &self.bound("query functions")?.functions;
        functions
            .get(index)
            .map(FunctionContext::source)
            .ok_or(RuntimeError::IndexOutOfRange {
                what: "function",
                index,
                count: functions.len(),
            })
    }

    /// Timings of the latest profiled forward pass.
    pub fn last_metrics(&self) -> Option<&ForwardMetrics> {
        self.last_metrics.as_ref()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("dispatch", &self.dispatch)
            .field(
                "functions",
                &self.bound.as_ref().map_or(0, |b| b.functions.len()),
            )
            .finish()
    }
}

fn lookup<'v>(
    variables: &'v [Variable],
    what: &'static str,
    index: usize,
) -> Result<&'v Variable, RuntimeError> {
    variables.get(index).ok_or(RuntimeError::IndexOutOfRange {
        what,
        index,
        count: variables.len(),
    })
}

fn region_mut(arena: &mut BufferArena, variable: usize) -> Result<&mut [u8], RuntimeError> {
    let count = arena.len();
    arena.region_mut(variable).ok_or(RuntimeError::IndexOutOfRange {
        what: "buffer",
        index: variable,
        count,
    })
}

fn expect_f32(variable: usize, dtype: DType) -> Result<(), RuntimeError> {
    if dtype != DType::F32 {
        return Err(RuntimeError::DTypeMismatch {
            variable,
            dtype,
            view: "f32",
        });
    }
    Ok(())
}

fn as_f32_mut(region: &mut [u8], variable: usize) -> Result<&mut [f32], RuntimeError> {
    bytemuck::try_cast_slice_mut(region).map_err(|_| RuntimeError::DTypeMismatch {
        variable,
        dtype: DType::F32,
        view: "f32",
    })
}
