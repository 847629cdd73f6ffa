// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Function (operator node) definitions and parameter decoding.
//!
//! A function entry starts with a fixed 20-byte head:
//!
//! ```text
//! 0   type     u16   operator tag (FunctionType)
//! 2   impl     u16   implementation variant; 0 selects the built-in
//! 4   inputs   list  (count, block) of variable indices
//! 12  outputs  list  (count, block) of variable indices
//! 20  params   operator-specific, to the end of the block
//! ```

use crate::reader::{read_f32, read_i32};
use crate::FormatError;

macro_rules! function_types {
    ($($variant:ident = $code:literal => $name:literal,)*) => {
        /// Operator tag of a function node.
        ///
        /// The numbering is the encoder's function enumeration. Tags this
        /// runtime does not name are preserved in [`FunctionType::Other`] so
        /// that a caller-registered resolver can still claim them.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
        pub enum FunctionType {
            $($variant,)*
            /// A tag outside the named set.
            Other(u16),
        }

        impl FunctionType {
            /// Decodes a wire tag.
            pub fn from_code(code: u16) -> Self {
                match code {
                    $($code => Self::$variant,)*
                    other => Self::Other(other),
                }
            }

            /// Returns the wire tag.
            pub fn code(self) -> u16 {
                match self {
                    $(Self::$variant => $code,)*
                    Self::Other(code) => code,
                }
            }

            /// Returns the operator name as the encoder spells it.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                    Self::Other(_) => "Unknown",
                }
            }

            /// Parses an operator name, ignoring ASCII case and `_`/`-`.
            ///
            /// Returns `None` for names outside the named set.
            pub fn from_name(name: &str) -> Option<Self> {
                let wanted: String = name.chars().filter(|c| *c != '_' && *c != '-').collect();
                [$(Self::$variant,)*]
                    .into_iter()
                    .find(|t| t.name().eq_ignore_ascii_case(&wanted))
            }
        }
    };
}

function_types! {
    Affine = 0 => "Affine",
    Convolution = 1 => "Convolution",
    DepthwiseConvolution = 2 => "DepthwiseConvolution",
    Deconvolution = 3 => "Deconvolution",
    DepthwiseDeconvolution = 4 => "DepthwiseDeconvolution",
    MaxPooling = 5 => "MaxPooling",
    AveragePooling = 6 => "AveragePooling",
    GlobalAveragePooling = 7 => "GlobalAveragePooling",
    SumPooling = 8 => "SumPooling",
    Unpooling = 9 => "Unpooling",
    Embed = 10 => "Embed",
    Sigmoid = 11 => "Sigmoid",
    Swish = 12 => "Swish",
    Tanh = 13 => "Tanh",
    ReLU = 14 => "ReLU",
    LeakyReLU = 15 => "LeakyReLU",
    Softmax = 16 => "Softmax",
    ELU = 17 => "ELU",
    SELU = 18 => "SELU",
    CReLU = 19 => "CReLU",
    CELU = 20 => "CELU",
    PReLU = 21 => "PReLU",
    BatchNormalization = 22 => "BatchNormalization",
    MeanSubtraction = 23 => "MeanSubtraction",
    ClipGradByValue = 24 => "ClipGradByValue",
    ClipGradByNorm = 25 => "ClipGradByNorm",
    Sum = 26 => "Sum",
    Mean = 27 => "Mean",
    Max = 28 => "Max",
    Min = 29 => "Min",
    Prod = 30 => "Prod",
    ReduceSum = 31 => "ReduceSum",
    ReduceMean = 32 => "ReduceMean",
    Add2 = 33 => "Add2",
    BcAdd2 = 34 => "BcAdd2",
    Sub2 = 35 => "Sub2",
    Mul2 = 36 => "Mul2",
    Div2 = 37 => "Div2",
    Pow2 = 38 => "Pow2",
    AddScalar = 39 => "AddScalar",
    MulScalar = 40 => "MulScalar",
}

impl std::fmt::Display for FunctionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Other(code) => write!(f, "Unknown({code})"),
            known => f.write_str(known.name()),
        }
    }
}

/// A decoded function entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Function {
    /// Position in the descriptor's function table (= execution order).
    pub index: usize,
    /// Operator tag.
    pub function_type: FunctionType,
    /// Implementation variant id.
    pub variant: u16,
    /// Input variable indices, in operator argument order.
    pub inputs: Vec<usize>,
    /// Output variable indices, in operator argument order.
    pub outputs: Vec<usize>,
    /// Operator-specific parameter bytes following the entry head.
    #[serde(skip)]
    pub params: Vec<u8>,
}

impl Function {
    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} (impl {}) inputs {:?} -> outputs {:?}, {} param bytes",
            self.index,
            self.function_type,
            self.variant,
            self.inputs,
            self.outputs,
            self.params.len(),
        )
    }
}

fn param_i32(function_type: FunctionType, params: &[u8], offset: usize, field: &str) -> Result<i32, FormatError> {
    read_i32(params, offset).ok_or_else(|| FormatError::InvalidParameters {
        function_type,
        detail: format!("missing '{field}' at byte {offset} ({} bytes present)", params.len()),
    })
}

fn non_negative(function_type: FunctionType, value: i32, field: &str) -> Result<usize, FormatError> {
    usize::try_from(value).map_err(|_| FormatError::InvalidParameters {
        function_type,
        detail: format!("'{field}' must be non-negative, got {value}"),
    })
}

/// Parameters of [`FunctionType::Affine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffineParams {
    /// Axis at which the input is flattened into `(batch, features)`.
    pub base_axis: usize,
}

impl AffineParams {
    /// Decodes `base_axis: i32`.
    pub fn parse(params: &[u8]) -> Result<Self, FormatError> {
        let raw = param_i32(FunctionType::Affine, params, 0, "base_axis")?;
        Ok(Self {
            base_axis: non_negative(FunctionType::Affine, raw, "base_axis")?,
        })
    }
}

/// Single-axis parameters (e.g. [`FunctionType::Softmax`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisParams {
    pub axis: usize,
}

impl AxisParams {
    /// Decodes `axis: i32`.
    pub fn parse(function_type: FunctionType, params: &[u8]) -> Result<Self, FormatError> {
        let raw = param_i32(function_type, params, 0, "axis")?;
        Ok(Self {
            axis: non_negative(function_type, raw, "axis")?,
        })
    }
}

/// Single float parameter: the scalar operand of `AddScalar`/`MulScalar`
/// or the negative slope of `LeakyReLU`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarParams {
    pub value: f32,
}

impl ScalarParams {
    /// Decodes `value: f32`.
    pub fn parse(function_type: FunctionType, params: &[u8]) -> Result<Self, FormatError> {
        let value = read_f32(params, 0).ok_or_else(|| FormatError::InvalidParameters {
            function_type,
            detail: format!("missing scalar value ({} bytes present)", params.len()),
        })?;
        Ok(Self { value })
    }
}
