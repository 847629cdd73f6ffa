// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error and status types for the runtime.

use nnb_format::{FormatError, FunctionType};
use tensor_core::TensorError;

use crate::ContextState;

/// Closed set of status codes reported by the runtime.
///
/// Every [`RuntimeError`] maps to exactly one code through
/// [`RuntimeError::status`]; [`Resolution`](crate::Resolution) maps to
/// `NoError` or `FunctionNotMatched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NoError,
    /// A resolver declined a function; only used while resolving.
    FunctionNotMatched,
    InvalidState,
    MalformedDescriptor,
    UnsupportedOperator,
    OperatorExecutionFailure,
    OutOfMemory,
    InvalidConfig,
    InvalidArgument,
}

impl Status {
    /// Returns a human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoError => "no error",
            Self::FunctionNotMatched => "function not matched",
            Self::InvalidState => "invalid state",
            Self::MalformedDescriptor => "malformed descriptor",
            Self::UnsupportedOperator => "unsupported operator",
            Self::OperatorExecutionFailure => "operator execution failure",
            Self::OutOfMemory => "out of memory",
            Self::InvalidConfig => "invalid configuration",
            Self::InvalidArgument => "invalid argument",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::NoError)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by an execute routine.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// A tensor kernel rejected its operands.
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// The routine asked for an argument the function does not have.
    #[error("{argument} {index} requested, function has {count}")]
    MissingArgument {
        argument: &'static str,
        index: usize,
        count: usize,
    },

    /// A region could not be viewed with the requested element type.
    #[error("{argument} {index} is not aligned for {view}")]
    Misaligned {
        argument: &'static str,
        index: usize,
        view: &'static str,
    },

    /// Implementation-specific failure.
    #[error("{0}")]
    Failed(String),
}

impl KernelError {
    /// Creates an implementation-specific failure.
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::Failed(detail.into())
    }
}

/// Errors returned by [`Context`](crate::Context) operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The operation is not allowed in the context's current state.
    #[error("cannot {operation} while the context is {state}")]
    InvalidState {
        operation: &'static str,
        state: ContextState,
    },

    /// The descriptor failed structural validation.
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(#[from] FormatError),

    /// Neither an override nor a built-in could bind a function.
    #[error("unsupported operator {function_type} (variant {variant}) at function {function}: {detail}")]
    UnsupportedOperator {
        function: usize,
        function_type: FunctionType,
        variant: u16,
        detail: String,
    },

    /// An execute routine failed during `forward`.
    #[error("function {function} ({function_type}) failed: {source}")]
    OperatorExecutionFailure {
        function: usize,
        function_type: FunctionType,
        #[source]
        source: KernelError,
    },

    /// The arena could not be sized or allocated.
    #[error("memory error: {0}")]
    Memory(#[from] memory_manager::MemoryError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// An input/output/function index is out of range.
    #[error("{what} index {index} out of range (count: {count})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },

    /// A typed buffer view was requested for a variable of another type.
    #[error("variable {variable} holds {dtype} elements, cannot view as {view}")]
    DTypeMismatch {
        variable: usize,
        dtype: tensor_core::DType,
        view: &'static str,
    },
}

impl RuntimeError {
    /// Maps the error to its status code.
    pub fn status(&self) -> Status {
        use memory_manager::MemoryError;
        match self {
            Self::InvalidState { .. } => Status::InvalidState,
            Self::MalformedDescriptor(_) => Status::MalformedDescriptor,
            Self::UnsupportedOperator { .. } => Status::UnsupportedOperator,
            Self::OperatorExecutionFailure { .. } => Status::OperatorExecutionFailure,
            Self::Memory(MemoryError::InvalidBudget { .. }) => Status::InvalidConfig,
            Self::Memory(_) => Status::OutOfMemory,
            Self::ConfigError(_) => Status::InvalidConfig,
            Self::IndexOutOfRange { .. } | Self::DTypeMismatch { .. } => Status::InvalidArgument,
        }
    }
}

/// Maps a result to its status code.
pub fn status_of<T>(result: &Result<T, RuntimeError>) -> Status {
    match result {
        Ok(_) => Status::NoError,
        Err(e) => e.status(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = RuntimeError::InvalidState {
            operation: "forward",
            state: ContextState::Configuring,
        };
        assert_eq!(err.status(), Status::InvalidState);
        assert_eq!(err.to_string(), "cannot forward while the context is configuring");

        let err = RuntimeError::Memory(memory_manager::MemoryError::OutOfMemory {
            requested_bytes: 10,
            budget_bytes: 1,
        });
        assert_eq!(err.status(), Status::OutOfMemory);

        let err = RuntimeError::OperatorExecutionFailure {
            function: 2,
            function_type: FunctionType::ReLU,
            source: KernelError::failed("boom"),
        };
        assert_eq!(err.status(), Status::OperatorExecutionFailure);
        assert_eq!(err.to_string(), "function 2 (ReLU) failed: boom");
    }

    #[test]
    fn test_status_of() {
        let ok: Result<(), RuntimeError> = Ok(());
        assert_eq!(status_of(&ok), Status::NoError);
        assert!(Status::NoError.is_ok());

        let err: Result<(), RuntimeError> = Err(RuntimeError::ConfigError("bad".into()));
        assert_eq!(status_of(&err), Status::InvalidConfig);
        assert_eq!(Status::FunctionNotMatched.to_string(), "function not matched");
    }
}
