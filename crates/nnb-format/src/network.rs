// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Validated view of an NNB descriptor.
//!
//! [`Network::parse`] checks the whole blob up front: every list, block and
//! index reference is resolved before a [`Network`] is handed out, so the
//! runtime never has to re-check a table entry. The only borrow kept into
//! the blob is the data region, for [`Network::parameter_data`].
//!
//! ```text
//! offset  field
//! 0       version            u32
//! 4       api_level          u32
//! 8       buffers            (count, block)   i32 element counts
//! 16      variables          (count, block)   i32 block index per entry
//! 24      functions          (count, block)   i32 block index per entry
//! 32      inputs             (count, block)   i32 variable indices
//! 40      outputs            (count, block)   i32 variable indices
//! 48      block_count, data_size
//! 56      block offset table (block_count × u32, relative to data start)
//! 56+4n   data region        (data_size bytes)
//! ```

use std::fmt;
use std::ops::Range;

use tensor_core::{DType, Shape};

use crate::reader::{read_i32, read_list, read_u16, read_u32, ListRef};
use crate::{FormatError, Function, FunctionType, Storage, Variable, VariableRole};

/// Descriptor versions this decoder understands.
pub const SUPPORTED_VERSIONS: &[u32] = &[2];

pub(crate) const HEADER_SIZE: usize = 56;
pub(crate) const VARIABLE_ENTRY_SIZE: usize = 20;
pub(crate) const FUNCTION_HEAD_SIZE: usize = 20;

// ── Blocks ─────────────────────────────────────────────────────────

/// The data region split into its memory blocks.
#[derive(Debug, Clone)]
struct Blocks<'a> {
    data: &'a [u8],
    ranges: Vec<Range<usize>>,
}

impl<'a> Blocks<'a> {
    fn parse(table: &[u8], data: &'a [u8]) -> Result<Self, FormatError> {
        let data_size = data.len();
        let offsets: Vec<usize> = table
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as usize)
            .collect();

        let mut previous = 0;
        for (block, &offset) in offsets.iter().enumerate() {
            if offset > data_size || offset < previous {
                return Err(FormatError::BadBlockOffset {
                    block,
                    offset,
                    data_size,
                });
            }
            previous = offset;
        }
        let ranges = offsets
            .iter()
            .enumerate()
            .map(|(block, &start)| start..offsets.get(block + 1).copied().unwrap_or(data_size))
            .collect();

        Ok(Self { data, ranges })
    }

    fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Resolves a block reference.
    fn get(&self, index: i32, what: &'static str) -> Result<(usize, &'a [u8]), FormatError> {
        let out_of_range = || FormatError::IndexOutOfRange {
            what,
            index: i64::from(index),
            count: self.ranges.len(),
        };
        let block = usize::try_from(index).map_err(|_| out_of_range())?;
        let range = self.ranges.get(block).ok_or_else(out_of_range)?;
        Ok((block, &self.data[range.clone()]))
    }

    /// Reads the `i32` array a list points at. An empty list reads nothing,
    /// whatever its block index.
    fn i32_list(&self, list: ListRef, what: &'static str) -> Result<Vec<i32>, FormatError> {
        if list.count == 0 {
            return Ok(Vec::new());
        }
        let (block, bytes) = self.get(list.block, what)?;
        let needed = (list.count as usize).saturating_mul(4);
        let items = bytes.get(..needed).ok_or(FormatError::BlockTooShort {
            block,
            what,
            needed,
            actual: bytes.len(),
        })?;
        Ok(items
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}

// ── Network ────────────────────────────────────────────────────────

/// A decoded, validated NNB descriptor.
///
/// Holds owned tables plus a borrow of the descriptor's data region for
/// parameter blocks.
#[derive(Debug, Clone)]
pub struct Network<'a> {
    version: u32,
    api_level: u32,
    buffers: Vec<usize>,
    variables: Vec<Variable>,
    functions: Vec<Function>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    blocks: Blocks<'a>,
}

impl<'a> Network<'a> {
    /// Decodes and validates a descriptor.
    ///
    /// # Errors
    /// Any [`FormatError`]; the input is never modified and decoding never
    /// panics on malformed bytes.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::Truncated {
                section: "header",
                needed: HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        let header_u32 = |offset: usize| {
            read_u32(bytes, offset).ok_or(FormatError::Truncated {
                section: "header",
                needed: HEADER_SIZE,
                actual: bytes.len(),
            })
        };
        let header_list = |offset: usize| {
            read_list(bytes, offset).ok_or(FormatError::Truncated {
                section: "header",
                needed: HEADER_SIZE,
                actual: bytes.len(),
            })
        };

        let version = header_u32(0)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(FormatError::UnsupportedVersion {
                version,
                supported: SUPPORTED_VERSIONS,
            });
        }
        let api_level = header_u32(4)?;
        let buffer_list = header_list(8)?;
        let variable_list = header_list(16)?;
        let function_list = header_list(24)?;
        let input_list = header_list(32)?;
        let output_list = header_list(40)?;
        let block_count = header_u32(48)? as usize;
        let data_size = header_u32(52)? as usize;

        let table_end = block_count
            .checked_mul(4)
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .unwrap_or(usize::MAX);
        let table = bytes.get(HEADER_SIZE..table_end).ok_or(FormatError::Truncated {
            section: "block offset table",
            needed: table_end,
            actual: bytes.len(),
        })?;
        let data_end = table_end.checked_add(data_size).unwrap_or(usize::MAX);
        let data = bytes.get(table_end..data_end).ok_or(FormatError::Truncated {
            section: "data region",
            needed: data_end,
            actual: bytes.len(),
        })?;
        if bytes.len() > data_end {
            tracing::warn!(
                "ignoring {} trailing bytes after the NNB data region",
                bytes.len() - data_end
            );
        }

        let blocks = Blocks::parse(table, data)?;

        let buffers = blocks
            .i32_list(buffer_list, "buffer table")?
            .into_iter()
            .enumerate()
            .map(|(buffer, size)| {
                usize::try_from(size).map_err(|_| FormatError::InvalidBuffer {
                    buffer,
                    detail: format!("negative element count {size}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let variable_blocks = blocks.i32_list(variable_list, "variable table")?;
        let variable_count = variable_blocks.len();
        let variable_index = |what: &'static str, raw: i32| {
            usize::try_from(raw)
                .ok()
                .filter(|&i| i < variable_count)
                .ok_or(FormatError::IndexOutOfRange {
                    what,
                    index: i64::from(raw),
                    count: variable_count,
                })
        };

        let inputs = blocks
            .i32_list(input_list, "network inputs")?
            .into_iter()
            .map(|raw| variable_index("network input variable", raw))
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = blocks
            .i32_list(output_list, "network outputs")?
            .into_iter()
            .map(|raw| variable_index("network output variable", raw))
            .collect::<Result<Vec<_>, _>>()?;

        let variables = variable_blocks
            .iter()
            .enumerate()
            .map(|(index, &block)| {
                decode_variable(&blocks, &buffers, index, block, &inputs, &outputs)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let functions = blocks
            .i32_list(function_list, "function table")?
            .into_iter()
            .enumerate()
            .map(|(index, block)| decode_function(&blocks, index, block, &variable_index))
            .collect::<Result<Vec<_>, _>>()?;

        let network = Self {
            version,
            api_level,
            buffers,
            variables,
            functions,
            inputs,
            outputs,
            blocks,
        };
        tracing::debug!("decoded NNB descriptor: {}", network.summary());
        Ok(network)
    }

    /// Descriptor format version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// API level recorded by the encoder.
    pub fn api_level(&self) -> u32 {
        self.api_level
    }

    /// Buffer table: element count of each runtime buffer.
    pub fn buffers(&self) -> &[usize] {
        &self.buffers
    }

    /// All variables in table order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// All functions in execution order.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Variable indices of the network inputs.
    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    /// Variable indices of the network outputs.
    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    /// Returns a variable by index.
    pub fn variable(&self, index: usize) -> Option<&Variable> {
        self.variables.get(index)
    }

    /// Returns a function by index.
    pub fn function(&self, index: usize) -> Option<&Function> {
        self.functions.get(index)
    }

    /// Number of memory blocks in the data region.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the initial data of a parameter variable, exactly
    /// `variable.size_bytes()` long. `None` for buffer-backed variables.
    pub fn parameter_data(&self, variable: &Variable) -> Option<&'a [u8]> {
        let Storage::Parameter(block) = variable.storage else {
            return None;
        };
        let range = self.blocks.ranges.get(block)?;
        self.blocks.data.get(range.clone())?.get(..variable.size_bytes())
    }

    /// Total bytes of parameter data embedded in the descriptor.
    pub fn total_parameter_bytes(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.is_parameter())
            .map(Variable::size_bytes)
            .sum()
    }

    /// Total bytes needed to hold every variable separately.
    pub fn total_variable_bytes(&self) -> usize {
        self.variables.iter().map(Variable::size_bytes).sum()
    }

    /// Returns a serializable snapshot of the decoded tables.
    pub fn to_summary(&self) -> NetworkSummary<'_> {
        NetworkSummary {
            version: self.version,
            api_level: self.api_level,
            buffers: &self.buffers,
            inputs: &self.inputs,
            outputs: &self.outputs,
            variables: &self.variables,
            functions: &self.functions,
            parameter_bytes: self.total_parameter_bytes(),
        }
    }

    /// Returns a summary string describing the descriptor.
    pub fn summary(&self) -> String {
        format!(
            "NNB v{} (api {}): {} variables, {} functions, {} buffers, {} inputs, {} outputs, {} parameter bytes",
            self.version,
            self.api_level,
            self.variables.len(),
            self.functions.len(),
            self.buffers.len(),
            self.inputs.len(),
            self.outputs.len(),
            self.total_parameter_bytes(),
        )
    }
}

impl fmt::Display for Network<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for (i, size) in self.buffers.iter().enumerate() {
            writeln!(f, "  buffer [{i}] {size} elements")?;
        }
        for variable in &self.variables {
            writeln!(f, "  {}", variable.summary())?;
        }
        for function in &self.functions {
            writeln!(f, "  {}", function.summary())?;
        }
        Ok(())
    }
}

/// Serializable view of a [`Network`], used for JSON output.
#[derive(Debug, serde::Serialize)]
pub struct NetworkSummary<'n> {
    pub version: u32,
    pub api_level: u32,
    pub buffers: &'n [usize],
    pub inputs: &'n [usize],
    pub outputs: &'n [usize],
    pub variables: &'n [Variable],
    pub functions: &'n [Function],
    pub parameter_bytes: usize,
}

// ── Entry decoding ─────────────────────────────────────────────────

fn decode_variable(
    blocks: &Blocks<'_>,
    buffers: &[usize],
    index: usize,
    block: i32,
    inputs: &[usize],
    outputs: &[usize],
) -> Result<Variable, FormatError> {
    let (block_index, entry) = blocks.get(block, "variable entry")?;
    let too_short = || FormatError::BlockTooShort {
        block: block_index,
        what: "variable entry",
        needed: VARIABLE_ENTRY_SIZE,
        actual: entry.len(),
    };
    let invalid = |detail: String| FormatError::InvalidVariable {
        variable: index,
        detail,
    };

    let id = read_u32(entry, 0).ok_or_else(too_short)?;
    let shape_list = read_list(entry, 4).ok_or_else(too_short)?;
    let type_word = read_u32(entry, 12).ok_or_else(too_short)?;
    let data_index = read_i32(entry, 16).ok_or_else(too_short)?;

    let dims = blocks
        .i32_list(shape_list, "variable shape")?
        .into_iter()
        .map(|d| usize::try_from(d).map_err(|_| invalid(format!("negative dimension {d}"))))
        .collect::<Result<Vec<_>, _>>()?;
    let shape = Shape::new(dims);

    let dtype = DType::from_code(type_word & 0xf)
        .ok_or_else(|| invalid(format!("unknown element type code {}", type_word & 0xf)))?;
    let fixed_point_position = ((type_word >> 4) & 0xf) as u8;

    let elements = shape
        .checked_num_elements()
        .ok_or_else(|| invalid(format!("shape {shape} overflows")))?;
    let size_bytes = elements
        .checked_mul(dtype.size_bytes())
        .ok_or_else(|| invalid(format!("shape {shape} overflows")))?;

    let storage = if data_index < 0 {
        let raw = -(i64::from(data_index)) - 1;
        let buffer = usize::try_from(raw)
            .ok()
            .filter(|&b| b < buffers.len())
            .ok_or(FormatError::IndexOutOfRange {
                what: "buffer",
                index: raw,
                count: buffers.len(),
            })?;
        if elements > buffers[buffer] {
            return Err(invalid(format!(
                "{elements} elements do not fit buffer {buffer} of {} elements",
                buffers[buffer]
            )));
        }
        Storage::Buffer(buffer)
    } else {
        let (param_block, data) = blocks.get(data_index, "parameter data")?;
        if data.len() < size_bytes {
            return Err(FormatError::BlockTooShort {
                block: param_block,
                what: "parameter data",
                needed: size_bytes,
                actual: data.len(),
            });
        }
        Storage::Parameter(param_block)
    };

    let role = if inputs.contains(&index) {
        VariableRole::Input
    } else if outputs.contains(&index) {
        VariableRole::Output
    } else if matches!(storage, Storage::Parameter(_)) {
        VariableRole::Parameter
    } else {
        VariableRole::Intermediate
    };

    Ok(Variable {
        index,
        id,
        shape,
        dtype,
        fixed_point_position,
        storage,
        role,
    })
}

fn decode_function(
    blocks: &Blocks<'_>,
    index: usize,
    block: i32,
    variable_index: &dyn Fn(&'static str, i32) -> Result<usize, FormatError>,
) -> Result<Function, FormatError> {
    let (block_index, entry) = blocks.get(block, "function entry")?;
    let too_short = || FormatError::BlockTooShort {
        block: block_index,
        what: "function entry",
        needed: FUNCTION_HEAD_SIZE,
        actual: entry.len(),
    };

    let function_type = FunctionType::from_code(read_u16(entry, 0).ok_or_else(too_short)?);
    let variant = read_u16(entry, 2).ok_or_else(too_short)?;
    let input_list = read_list(entry, 4).ok_or_else(too_short)?;
    let output_list = read_list(entry, 12).ok_or_else(too_short)?;
    let params = entry.get(FUNCTION_HEAD_SIZE..).unwrap_or_default().to_vec();

    let inputs = blocks
        .i32_list(input_list, "function inputs")?
        .into_iter()
        .map(|raw| variable_index("function input variable", raw))
        .collect::<Result<Vec<_>, _>>()?;
    let outputs = blocks
        .i32_list(output_list, "function outputs")?
        .into_iter()
        .map(|raw| variable_index("function output variable", raw))
        .collect::<Result<Vec<_>, _>>()?;

    // Outputs are written through exclusive slices: no output may appear
    // twice or double as an input.
    for (i, out) in outputs.iter().enumerate() {
        if outputs[..i].contains(out) {
            return Err(FormatError::InvalidFunction {
                function: index,
                detail: format!("variable {out} listed twice as an output"),
            });
        }
        if inputs.contains(out) {
            return Err(FormatError::InvalidFunction {
                function: index,
                detail: format!("variable {out} is both an input and an output"),
            });
        }
    }

    Ok(Function {
        index,
        function_type,
        variant,
        inputs,
        outputs,
        params,
    })
}
