// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Little-endian field readers over borrowed bytes.
//!
//! All readers return `None` instead of panicking when the field does not
//! fit; callers turn that into a [`FormatError`](crate::FormatError) with
//! context.

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let end = offset.checked_add(2)?;
    let field = bytes.get(offset..end)?;
    Some(u16::from_le_bytes([field[0], field[1]]))
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let field = bytes.get(offset..end)?;
    Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
}

pub(crate) fn read_i32(bytes: &[u8], offset: usize) -> Option<i32> {
    read_u32(bytes, offset).map(|v| v as i32)
}

pub(crate) fn read_f32(bytes: &[u8], offset: usize) -> Option<f32> {
    read_u32(bytes, offset).map(f32::from_bits)
}

/// A `(count, block)` list reference as stored in the header and entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListRef {
    pub count: u32,
    pub block: i32,
}

pub(crate) fn read_list(bytes: &[u8], offset: usize) -> Option<ListRef> {
    Some(ListRef {
        count: read_u32(bytes, offset)?,
        block: read_i32(bytes, offset.checked_add(4)?)?,
    })
}
