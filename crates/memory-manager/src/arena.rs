// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Single-allocation buffer arena.
//!
//! The [`BufferArena`] is sized once from the list of region sizes, checked
//! against a [`MemoryBudget`] and allocated in one go. After that it never
//! allocates again: regions are handed out as byte slices carved from the
//! one backing store.
//!
//! # Layout
//! ```text
//! ┌────────────┬──┬──────────────────┬────┬────────┬───┐
//! │ region 0   │░░│ region 1         │░░░░│ reg. 2 │░░░│
//! └────────────┴──┴──────────────────┴────┴────────┴───┘
//!  ^ 0            ^ 16·k               ^ 16·m
//! ```
//! Every region starts at a multiple of [`REGION_ALIGN`] bytes from the
//! base, and the base is `u128`-aligned, so any region can be viewed as
//! `f32`/`i16` through `bytemuck` without an alignment failure.

use std::ops::Range;

use crate::{MemoryBudget, MemoryError};

/// Byte alignment of every region's start offset.
pub const REGION_ALIGN: usize = 16;

/// One up-front allocation split into fixed, disjoint regions.
///
/// # Example
/// ```
/// use memory_manager::{BufferArena, MemoryBudget};
///
/// let mut arena = BufferArena::allocate(&[24, 4, 100], MemoryBudget::from_kb(1)).unwrap();
/// assert_eq!(arena.len(), 3);
/// assert_eq!(arena.region(1).unwrap().len(), 4);
///
/// let mut regions = arena.regions_mut();
/// regions[0].fill(1);
/// regions[2].fill(2);
/// ```
#[derive(Debug)]
pub struct BufferArena {
    storage: Vec<u128>,
    regions: Vec<Range<usize>>,
    budget: MemoryBudget,
}

impl BufferArena {
    /// Lays out one region per entry of `sizes` and allocates them all at
    /// once, zero-filled.
    ///
    /// # Errors
    /// - [`MemoryError::LayoutOverflow`] if the layout does not fit `usize`.
    /// - [`MemoryError::OutOfMemory`] if the padded total exceeds `budget`
    ///   or the system allocator refuses the request.
    pub fn allocate(sizes: &[usize], budget: MemoryBudget) -> Result<Self, MemoryError> {
        let mut regions = Vec::with_capacity(sizes.len());
        let mut offset = 0usize;
        for (region, &size) in sizes.iter().enumerate() {
            let overflow = MemoryError::LayoutOverflow { region, size };
            let end = offset.checked_add(size).ok_or(overflow)?;
            regions.push(offset..end);
            offset = align_up(end).ok_or(MemoryError::LayoutOverflow { region, size })?;
        }

        let total_bytes = offset;
        let out_of_memory = || MemoryError::OutOfMemory {
            requested_bytes: total_bytes,
            budget_bytes: budget.as_bytes(),
        };
        if !budget.fits(total_bytes) {
            return Err(out_of_memory());
        }

        let words = total_bytes / REGION_ALIGN;
        let mut storage: Vec<u128> = Vec::new();
        storage.try_reserve_exact(words).map_err(|_| out_of_memory())?;
        storage.resize(words, 0);

        tracing::debug!(
            "buffer arena allocated: {} regions, {} bytes of {}",
            regions.len(),
            total_bytes,
            budget,
        );

        Ok(Self {
            storage,
            regions,
            budget,
        })
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` if the arena has no regions.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Total allocated bytes, including alignment padding.
    pub fn total_bytes(&self) -> usize {
        self.storage.len() * REGION_ALIGN
    }

    /// The budget the arena was checked against.
    pub fn budget(&self) -> MemoryBudget {
        self.budget
    }

    /// Size of region `index` in bytes.
    pub fn region_size(&self, index: usize) -> Option<usize> {
        self.regions.get(index).map(|r| r.len())
    }

    /// Read-only view of region `index`.
    pub fn region(&self, index: usize) -> Option<&[u8]> {
        let range = self.regions.get(index)?.clone();
        bytemuck::cast_slice::<u128, u8>(&self.storage).get(range)
    }

    /// Mutable view of region `index`.
    pub fn region_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        let range = self.regions.get(index)?.clone();
        bytemuck::cast_slice_mut::<u128, u8>(&mut self.storage).get_mut(range)
    }

    /// Splits the arena into one mutable slice per region, in region order.
    ///
    /// The slices are disjoint, so callers may hold several of them at once.
    pub fn regions_mut(&mut self) -> Vec<&mut [u8]> {
        let mut out = Vec::with_capacity(self.regions.len());
        self.regions_into(&mut out);
        out
    }

    /// Same as [`regions_mut`](Self::regions_mut), filling `out` (cleared
    /// first) so a caller can keep one table across passes.
    pub fn regions_into<'a>(&'a mut self, out: &mut Vec<&'a mut [u8]>) {
        out.clear();
        out.reserve(self.regions.len());
        let mut rest: &mut [u8] = bytemuck::cast_slice_mut(&mut self.storage);
        let mut consumed = 0;
        for range in &self.regions {
            let (_, tail) = std::mem::take(&mut rest).split_at_mut(range.start - consumed);
            let (region, tail) = tail.split_at_mut(range.len());
            out.push(region);
            rest = tail;
            consumed = range.end;
        }
    }

    /// Zero-fills every region.
    pub fn clear(&mut self) {
        self.storage.fill(0);
    }
}

fn align_up(offset: usize) -> Option<usize> {
    Some(offset.checked_add(REGION_ALIGN - 1)? / REGION_ALIGN * REGION_ALIGN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_aligned() {
        let arena = BufferArena::allocate(&[3, 16, 17, 0, 5], MemoryBudget::from_kb(1)).unwrap();
        assert_eq!(arena.len(), 5);
        // 3 → 16, 16 → 32, 17 → 64, 0 → 64, 5 → 80
        assert_eq!(arena.total_bytes(), 80);
        for i in 0..arena.len() {
            let base = bytemuck::cast_slice::<u128, u8>(&arena.storage).as_ptr() as usize;
            let start = arena.region(i).unwrap().as_ptr() as usize - base;
            assert_eq!(start % REGION_ALIGN, 0, "region {i} starts at {start}");
        }
        assert_eq!(arena.region_size(2), Some(17));
        assert_eq!(arena.region_size(3), Some(0));
        assert_eq!(arena.region_size(5), None);
    }

    #[test]
    fn test_regions_are_zeroed_and_disjoint() {
        let mut arena = BufferArena::allocate(&[8, 8, 8], MemoryBudget::from_kb(1)).unwrap();
        assert!(arena.region(0).unwrap().iter().all(|&b| b == 0));

        {
            let mut regions = arena.regions_mut();
            assert_eq!(regions.len(), 3);
            regions[0].fill(0xaa);
            regions[2].fill(0xbb);
        }
        assert!(arena.region(0).unwrap().iter().all(|&b| b == 0xaa));
        assert!(arena.region(1).unwrap().iter().all(|&b| b == 0));
        assert!(arena.region(2).unwrap().iter().all(|&b| b == 0xbb));
    }

    #[test]
    fn test_regions_into_reuses_table() {
        let mut stale = [9u8; 3];
        let mut arena = BufferArena::allocate(&[4, 12], MemoryBudget::from_kb(1)).unwrap();
        let mut table: Vec<&mut [u8]> = Vec::with_capacity(8);
        table.push(&mut stale[..]);

        arena.regions_into(&mut table);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].len(), 4);
        assert_eq!(table[1].len(), 12);
        assert!(table.capacity() >= 8);
        table[1].fill(7);
        drop(table);
        assert!(arena.region(1).unwrap().iter().all(|&b| b == 7));
    }

    #[test]
    fn test_region_mut_and_f32_view() {
        let mut arena = BufferArena::allocate(&[5, 16], MemoryBudget::from_kb(1)).unwrap();
        let region = arena.region_mut(1).unwrap();
        let floats: &mut [f32] = bytemuck::try_cast_slice_mut(region).unwrap();
        floats.copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);

        let back: &[f32] = bytemuck::try_cast_slice(arena.region(1).unwrap()).unwrap();
        assert_eq!(back, &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_over_budget() {
        let result = BufferArena::allocate(&[1024, 1024], MemoryBudget::from_kb(1));
        match result {
            Err(MemoryError::OutOfMemory {
                requested_bytes,
                budget_bytes,
            }) => {
                assert_eq!(requested_bytes, 2048);
                assert_eq!(budget_bytes, 1024);
            }
            other => panic!("expected OutOfMemory, got {other:?}"),
        }
    }

    #[test]
    fn test_layout_overflow() {
        let result = BufferArena::allocate(&[16, usize::MAX], MemoryBudget::from_kb(1));
        assert!(matches!(
            result,
            Err(MemoryError::LayoutOverflow { region: 1, .. })
        ));
    }

    #[test]
    fn test_empty_arena() {
        let mut arena = BufferArena::allocate(&[], MemoryBudget::from_kb(1)).unwrap();
        assert!(arena.is_empty());
        assert_eq!(arena.total_bytes(), 0);
        assert!(arena.regions_mut().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut arena = BufferArena::allocate(&[4], MemoryBudget::from_kb(1)).unwrap();
        arena.region_mut(0).unwrap().fill(7);
        arena.clear();
        assert_eq!(arena.region(0).unwrap(), &[0, 0, 0, 0]);
    }
}
