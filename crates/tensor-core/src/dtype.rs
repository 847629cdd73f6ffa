// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported variable element types.

/// Enumerates the element encodings an NNB variable can hold.
///
/// The discriminants are the 4-bit codes stored in the low nibble of a
/// variable's `type` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DType {
    /// 32-bit IEEE 754 floating point.
    F32,
    /// 16-bit fixed point; the binary point position is stored per variable.
    Fixed16,
    /// 8-bit fixed point; the binary point position is stored per variable.
    Fixed8,
    /// Sign-only (binarised) values, one byte per element.
    Sign,
}

impl DType {
    /// Decodes the 4-bit wire code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(DType::F32),
            1 => Some(DType::Fixed16),
            2 => Some(DType::Fixed8),
            3 => Some(DType::Sign),
            _ => None,
        }
    }

    /// Returns the 4-bit wire code.
    pub fn code(self) -> u32 {
        match self {
            DType::F32 => 0,
            DType::Fixed16 => 1,
            DType::Fixed8 => 2,
            DType::Sign => 3,
        }
    }

    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::Fixed16 => 2,
            DType::Fixed8 => 1,
            DType::Sign => 1,
        }
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "float",
            DType::Fixed16 => "fixed16",
            DType::Fixed8 => "fixed8",
            DType::Sign => "sign",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
