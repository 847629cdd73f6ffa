// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Override chains and built-in fallback.
//!
//! Each function node is resolved once, at `initialize`:
//!
//! ```text
//! variant == builtin_variant? ──yes──────────────────────────┐
//!       │ no                                                 │
//!       ▼                                                    ▼
//! chain[type]: r0 ─NotMatched─► r1 ─NotMatched─► … ──► BuiltinRegistry
//!               │ Matched        │ Matched              (type, variant)
//!               ▼                ▼                      then (type, 0)
//!           bound (override #0)  bound (override #1)          │ none
//!                                                             ▼
//!                                                    UnsupportedOperator
//! ```

use std::collections::HashMap;

use nnb_format::FunctionType;
use tensor_core::DType;

use crate::builtin::BuiltinRegistry;
use crate::function::{Binding, BindingSource, FunctionInfo, Slot};
use crate::{RuntimeError, Status};

/// A resolver's answer for one function node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The resolver installed an execute routine and owns the node.
    Matched,
    /// The resolver declines; the next candidate is tried.
    NotMatched,
}

impl Resolution {
    /// Status code of this answer.
    pub fn status(self) -> Status {
        match self {
            Self::Matched => Status::NoError,
            Self::NotMatched => Status::FunctionNotMatched,
        }
    }
}

/// A candidate implementation for one function type.
///
/// Implementations usually check [`FunctionInfo::variant`] and decline the
/// ids they do not handle, so several implementations of one operator can
/// coexist and be selected by the descriptor.
///
/// Any `Fn(&FunctionInfo, &mut Slot) -> Resolution` closure is a resolver.
pub trait Resolver {
    fn try_resolve(&self, info: &FunctionInfo, slot: &mut Slot) -> Resolution;
}

impl<F> Resolver for F
where
    F: Fn(&FunctionInfo, &mut Slot) -> Resolution,
{
    fn try_resolve(&self, info: &FunctionInfo, slot: &mut Slot) -> Resolution {
        self(info, slot)
    }
}

/// Registered override chains plus the built-in registry.
pub struct DispatchTable {
    chains: HashMap<FunctionType, Vec<Box<dyn Resolver>>>,
    builtins: BuiltinRegistry,
    builtin_variant: Option<u16>,
}

impl DispatchTable {
    /// Creates a table with no overrides.
    pub fn new(builtins: BuiltinRegistry, builtin_variant: Option<u16>) -> Self {
        Self {
            chains: HashMap::new(),
            builtins,
            builtin_variant,
        }
    }

    /// Appends `resolver` to the chain of `function_type`. Registration
    /// order is trial order; duplicates are kept.
    pub fn register(&mut self, function_type: FunctionType, resolver: Box<dyn Resolver>) {
        let chain = self.chains.entry(function_type).or_default();
        chain.push(resolver);
        tracing::debug!(
            "override #{} registered for {}",
            chain.len() - 1,
            function_type
        );
    }

    /// Number of overrides registered for `function_type`.
    pub fn chain_len(&self, function_type: FunctionType) -> usize {
        self.chains.get(&function_type).map_or(0, Vec::len)
    }

    /// Binds one function node.
    ///
    /// # Errors
    /// - [`RuntimeError::UnsupportedOperator`] when nothing binds the node,
    ///   or when an override reports a match without installing an execute
    ///   routine.
    /// - [`RuntimeError::MalformedDescriptor`] when the built-in rejects the
    ///   node's parameters or arity.
    pub(crate) fn resolve(
        &self,
        info: &FunctionInfo,
    ) -> Result<(Binding, BindingSource), RuntimeError> {
        let unsupported = |detail: String| RuntimeError::UnsupportedOperator {
            function: info.index,
            function_type: info.function_type,
            variant: info.variant,
            detail,
        };

        if self.builtin_variant == Some(info.variant) {
            tracing::debug!(
                "function {} ({}) uses variant {}: overrides skipped",
                info.index,
                info.function_type,
                info.variant
            );
        } else if let Some(chain) = self.chains.get(&info.function_type) {
            for (position, resolver) in chain.iter().enumerate() {
                let mut slot = Slot::default();
                match resolver.try_resolve(info, &mut slot) {
                    Resolution::Matched => {
                        let binding = slot.into_binding().ok_or_else(|| {
                            unsupported(format!(
                                "override #{position} reported a match without installing an execute routine"
                            ))
                        })?;
                        if let FunctionType::Other(code) = info.function_type {
                            tracing::warn!(
                                "function {} has unknown type code {code}; bound by override #{position}",
                                info.index
                            );
                        }
                        tracing::debug!(
                            "function {} ({} variant {}) bound to override #{position}",
                            info.index,
                            info.function_type,
                            info.variant
                        );
                        return Ok((binding, BindingSource::Override(position)));
                    }
                    Resolution::NotMatched => {
                        tracing::debug!(
                            "override #{position} declined function {} ({} variant {})",
                            info.index,
                            info.function_type,
                            info.variant
                        );
                    }
                }
            }
        }

        let install = self
            .builtins
            .lookup(info.function_type, info.variant)
            .ok_or_else(|| unsupported("no override matched and no built-in is registered".into()))?;
        if !info.all_dtype(DType::F32) {
            return Err(unsupported(
                "built-in implementations only handle float variables".into(),
            ));
        }

        let mut slot = Slot::default();
        install(info, &mut slot)?;
        let binding = slot
            .into_binding()
            .ok_or_else(|| unsupported("built-in installed no execute routine".into()))?;
        tracing::debug!(
            "function {} ({} variant {}) bound to built-in",
            info.index,
            info.function_type,
            info.variant
        );
        Ok((binding, BindingSource::Builtin))
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chains: HashMap<_, _> = self
            .chains
            .iter()
            .map(|(ty, chain)| (ty.to_string(), chain.len()))
            .collect();
        f.debug_struct("DispatchTable")
            .field("chains", &chains)
            .field("builtins", &self.builtins.len())
            .field("builtin_variant", &self.builtin_variant)
            .finish()
    }
}
