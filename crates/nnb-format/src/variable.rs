// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Variable definitions.
//!
//! A [`Variable`] describes one tensor of the network: its element type,
//! shape and where its data lives. Buffer-backed variables get their
//! storage from the runtime; parameter variables carry their data inside
//! the descriptor.

use tensor_core::{DType, Shape};

/// Where a variable's data lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    /// Runtime buffer with the given index in the buffer table.
    Buffer(usize),
    /// Descriptor memory block holding the initial (parameter) data.
    Parameter(usize),
}

/// How a variable is used by the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableRole {
    /// Listed as a network input; the caller fills it before `forward`.
    Input,
    /// Listed as a network output.
    Output,
    /// Weights or other constants embedded in the descriptor.
    Parameter,
    /// Produced and consumed inside the graph.
    Intermediate,
}

impl VariableRole {
    /// Returns a human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Parameter => "parameter",
            Self::Intermediate => "intermediate",
        }
    }
}

impl std::fmt::Display for VariableRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded variable entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Variable {
    /// Position in the descriptor's variable table.
    pub index: usize,
    /// Semantic id assigned by the encoder.
    pub id: u32,
    /// Declared shape.
    pub shape: Shape,
    /// Element type.
    pub dtype: DType,
    /// Binary point position for fixed-point types (0 for float).
    pub fixed_point_position: u8,
    /// Backing storage.
    pub storage: Storage,
    /// Usage within the network.
    pub role: VariableRole,
}

impl Variable {
    /// Number of elements declared by the shape.
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Size of the variable's data in bytes.
    pub fn size_bytes(&self) -> usize {
        self.shape.size_bytes(self.dtype)
    }

    /// Returns `true` if the data is embedded in the descriptor.
    pub fn is_parameter(&self) -> bool {
        matches!(self.storage, Storage::Parameter(_))
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        let storage = match self.storage {
            Storage::Buffer(b) => format!("buffer {b}"),
            Storage::Parameter(block) => format!("block {block}"),
        };
        format!(
            "[{}] id={} {} {} {} ({} bytes, {})",
            self.index,
            self.id,
            self.role,
            self.dtype,
            self.shape,
            self.size_bytes(),
            storage,
        )
    }
}
