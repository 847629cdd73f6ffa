// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for descriptor decoding.

use crate::FunctionType;

/// Structural problems found while decoding an NNB descriptor.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The blob ends before a section it declares.
    #[error("descriptor truncated in {section}: need {needed} bytes, have {actual}")]
    Truncated {
        section: &'static str,
        needed: usize,
        actual: usize,
    },

    /// The declared format version is not understood by this runtime.
    #[error("unsupported descriptor version {version} (supported: {supported:?})")]
    UnsupportedVersion {
        version: u32,
        supported: &'static [u32],
    },

    /// A block offset lies outside the data region or before its predecessor.
    #[error("block {block} has invalid offset {offset} (data region is {data_size} bytes)")]
    BadBlockOffset {
        block: usize,
        offset: usize,
        data_size: usize,
    },

    /// A reference to a block, buffer or variable is out of range.
    #[error("{what} index {index} out of range (count: {count})")]
    IndexOutOfRange {
        what: &'static str,
        index: i64,
        count: usize,
    },

    /// A block is shorter than the structure it should contain.
    #[error("block {block} holding {what} is {actual} bytes, need {needed}")]
    BlockTooShort {
        block: usize,
        what: &'static str,
        needed: usize,
        actual: usize,
    },

    /// A buffer entry is invalid (e.g., negative size).
    #[error("invalid buffer {buffer}: {detail}")]
    InvalidBuffer { buffer: usize, detail: String },

    /// A variable entry is invalid or inconsistent with its storage.
    #[error("invalid variable {variable}: {detail}")]
    InvalidVariable { variable: usize, detail: String },

    /// A function entry is invalid or references variables inconsistently.
    #[error("invalid function {function}: {detail}")]
    InvalidFunction { function: usize, detail: String },

    /// Operator-specific parameters could not be decoded.
    #[error("invalid parameters for {function_type}: {detail}")]
    InvalidParameters {
        function_type: FunctionType,
        detail: String,
    },
}
