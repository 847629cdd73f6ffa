// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Minimal NNB writer for tests, benchmarks and tooling.
//!
//! Blocks are laid out in the order the reference encoder emits them:
//! network inputs, network outputs, buffer table, then per variable its
//! shape, parameter data and entry, the variable table, then per function
//! its input list, output list and entry, and finally the function table.

use tensor_core::DType;

use crate::network::{HEADER_SIZE, SUPPORTED_VERSIONS};
use crate::FunctionType;

const DEFAULT_API_LEVEL: u32 = 44;

#[derive(Debug, Clone)]
enum Backing {
    Buffer(usize),
    Data(Vec<u8>),
}

/// A variable to be written.
#[derive(Debug, Clone)]
pub struct VariableSpec {
    id: u32,
    shape: Vec<usize>,
    dtype: DType,
    fixed_point_position: u8,
    backing: Backing,
}

impl VariableSpec {
    /// An `f32` variable stored in runtime buffer `buffer`.
    pub fn buffer(id: u32, shape: &[usize], buffer: usize) -> Self {
        Self {
            id,
            shape: shape.to_vec(),
            dtype: DType::F32,
            fixed_point_position: 0,
            backing: Backing::Buffer(buffer),
        }
    }

    /// A parameter variable with raw initial data.
    pub fn parameter(id: u32, shape: &[usize], data: Vec<u8>) -> Self {
        Self {
            id,
            shape: shape.to_vec(),
            dtype: DType::F32,
            fixed_point_position: 0,
            backing: Backing::Data(data),
        }
    }

    /// A parameter variable holding `f32` values.
    pub fn parameter_f32(id: u32, shape: &[usize], values: &[f32]) -> Self {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::parameter(id, shape, data)
    }

    /// Overrides the element type.
    pub fn with_dtype(mut self, dtype: DType, fixed_point_position: u8) -> Self {
        self.dtype = dtype;
        self.fixed_point_position = fixed_point_position;
        self
    }
}

/// A function to be written.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    function_type: FunctionType,
    variant: u16,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    params: Vec<u8>,
}

impl FunctionSpec {
    /// A function with variant 0 and no parameters.
    pub fn new(function_type: FunctionType, inputs: &[usize], outputs: &[usize]) -> Self {
        Self {
            function_type,
            variant: 0,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
            params: Vec::new(),
        }
    }

    pub fn with_variant(mut self, variant: u16) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_params(mut self, params: Vec<u8>) -> Self {
        self.params = params;
        self
    }

    /// Appends a little-endian `i32` parameter.
    pub fn with_i32_param(mut self, value: i32) -> Self {
        self.params.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a little-endian `f32` parameter.
    pub fn with_f32_param(mut self, value: f32) -> Self {
        self.params.extend_from_slice(&value.to_le_bytes());
        self
    }
}

/// Builds an NNB blob.
///
/// The writer does not validate; feeding its output to
/// [`Network::parse`](crate::Network::parse) is how malformed
/// descriptors are produced on purpose in tests.
#[derive(Debug, Clone)]
pub struct NetworkWriter {
    api_level: u32,
    buffers: Vec<usize>,
    variables: Vec<VariableSpec>,
    functions: Vec<FunctionSpec>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
}

impl Default for NetworkWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkWriter {
    pub fn new() -> Self {
        Self {
            api_level: DEFAULT_API_LEVEL,
            buffers: Vec::new(),
            variables: Vec::new(),
            functions: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_api_level(mut self, api_level: u32) -> Self {
        self.api_level = api_level;
        self
    }

    /// Adds a buffer of `elements` elements and returns its index.
    pub fn buffer(&mut self, elements: usize) -> usize {
        self.buffers.push(elements);
        self.buffers.len() - 1
    }

    /// Adds a variable and returns its index.
    pub fn variable(&mut self, spec: VariableSpec) -> usize {
        self.variables.push(spec);
        self.variables.len() - 1
    }

    /// Adds a function and returns its index.
    pub fn function(&mut self, spec: FunctionSpec) -> usize {
        self.functions.push(spec);
        self.functions.len() - 1
    }

    pub fn inputs(&mut self, variables: &[usize]) -> &mut Self {
        self.inputs = variables.to_vec();
        self
    }

    pub fn outputs(&mut self, variables: &[usize]) -> &mut Self {
        self.outputs = variables.to_vec();
        self
    }

    /// Serializes the descriptor.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut blocks = BlockList::default();

        let inputs = blocks.push_indices(&self.inputs);
        let outputs = blocks.push_indices(&self.outputs);
        let buffers = blocks.push_indices(&self.buffers);

        let mut variable_blocks = Vec::with_capacity(self.variables.len());
        for v in &self.variables {
            let shape = blocks.push_indices(&v.shape);
            let data_index = match &v.backing {
                Backing::Buffer(b) => -(*b as i32) - 1,
                Backing::Data(data) => blocks.push(data.clone()),
            };
            let mut entry = Vec::with_capacity(20);
            entry.extend_from_slice(&v.id.to_le_bytes());
            put_list(&mut entry, v.shape.len(), shape);
            let type_word = v.dtype.code() | (u32::from(v.fixed_point_position & 0xf) << 4);
            entry.extend_from_slice(&type_word.to_le_bytes());
            entry.extend_from_slice(&data_index.to_le_bytes());
            variable_blocks.push(blocks.push(entry));
        }
        let variables = blocks.push_i32s(&variable_blocks);

        let mut function_blocks = Vec::with_capacity(self.functions.len());
        for f in &self.functions {
            let f_inputs = blocks.push_indices(&f.inputs);
            let f_outputs = blocks.push_indices(&f.outputs);
            let mut entry = Vec::with_capacity(20 + f.params.len());
            entry.extend_from_slice(&f.function_type.code().to_le_bytes());
            entry.extend_from_slice(&f.variant.to_le_bytes());
            put_list(&mut entry, f.inputs.len(), f_inputs);
            put_list(&mut entry, f.outputs.len(), f_outputs);
            entry.extend_from_slice(&f.params);
            function_blocks.push(blocks.push(entry));
        }
        let functions = blocks.push_i32s(&function_blocks);

        let data_size: usize = blocks.0.iter().map(Vec::len).sum();
        let mut out = Vec::with_capacity(HEADER_SIZE + 4 * blocks.0.len() + data_size);
        out.extend_from_slice(&SUPPORTED_VERSIONS[0].to_le_bytes());
        out.extend_from_slice(&self.api_level.to_le_bytes());
        put_list(&mut out, self.buffers.len(), buffers);
        put_list(&mut out, self.variables.len(), variables);
        put_list(&mut out, self.functions.len(), functions);
        put_list(&mut out, self.inputs.len(), inputs);
        put_list(&mut out, self.outputs.len(), outputs);
        out.extend_from_slice(&(blocks.0.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data_size as u32).to_le_bytes());

        let mut offset = 0u32;
        for block in &blocks.0 {
            out.extend_from_slice(&offset.to_le_bytes());
            offset += block.len() as u32;
        }
        for block in &blocks.0 {
            out.extend_from_slice(block);
        }
        out
    }
}

#[derive(Default)]
struct BlockList(Vec<Vec<u8>>);

impl BlockList {
    fn push(&mut self, bytes: Vec<u8>) -> i32 {
        self.0.push(bytes);
        (self.0.len() - 1) as i32
    }

    fn push_i32s(&mut self, values: &[i32]) -> i32 {
        self.push(values.iter().flat_map(|v| v.to_le_bytes()).collect())
    }

    fn push_indices(&mut self, values: &[usize]) -> i32 {
        self.push(values.iter().flat_map(|&v| (v as i32).to_le_bytes()).collect())
    }
}

fn put_list(out: &mut Vec<u8>, count: usize, block: i32) {
    out.extend_from_slice(&(count as u32).to_le_bytes());
    out.extend_from_slice(&block.to_le_bytes());
}
