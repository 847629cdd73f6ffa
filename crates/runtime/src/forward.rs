// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! One forward pass: every bound function, in descriptor order.

use std::time::Instant;

use memory_manager::BufferArena;

use crate::function::{recycle, FunctionContext};
use crate::{ForwardMetrics, RuntimeError};

/// Executes `functions` in order over the arena's per-variable regions.
///
/// Halts at the first failing function; outputs written by earlier
/// functions stay in the arena. Returns timings when `profiling` is set.
/// `scratch` holds the region table between passes and is left empty.
pub(crate) fn run(
    functions: &mut [FunctionContext],
    arena: &mut BufferArena,
    scratch: &mut Vec<&'static mut [u8]>,
    profiling: bool,
) -> Result<Option<ForwardMetrics>, RuntimeError> {
    let pass_start = Instant::now();
    let mut metrics = profiling.then(|| ForwardMetrics::new(functions.len()));
    let mut regions = recycle(std::mem::take(scratch));
    arena.regions_into(&mut regions);

    let outcome = execute_all(functions, &mut regions, metrics.as_mut());
    *scratch = recycle(regions);
    outcome?;

    if let Some(m) = metrics.as_mut() {
        m.finalise(pass_start.elapsed());
        tracing::debug!("{}", m.summary());
    }
    Ok(metrics)
}

fn execute_all(
    functions: &mut [FunctionContext],
    regions: &mut [&mut [u8]],
    mut metrics: Option<&mut ForwardMetrics>,
) -> Result<(), RuntimeError> {
    for function in functions.iter_mut() {
        let (index, function_type) = (function.info().index, function.info().function_type);
        tracing::debug!("executing function {index} ({function_type}, {})", function.source());

        let start = Instant::now();
        function
            .execute(regions)
            .map_err(|source| RuntimeError::OperatorExecutionFailure {
                function: index,
                function_type,
                source,
            })?;

        if let Some(m) = metrics.as_deref_mut() {
            m.record_function(index, function_type, function.source(), start.elapsed());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{BindingSource, FunctionInfo, Slot};
    use crate::KernelError;
    use memory_manager::MemoryBudget;
    use nnb_format::{FunctionType, Storage, Variable, VariableRole};
    use tensor_core::{DType, Shape};

    fn var(index: usize) -> Variable {
        Variable {
            index,
            id: index as u32,
            shape: Shape::vector(2),
            dtype: DType::F32,
            fixed_point_position: 0,
            storage: Storage::Buffer(index),
            role: VariableRole::Intermediate,
        }
    }

    /// out[i] = in[i] + delta, or a failure when `delta` is NaN.
    fn add_const(index: usize, input: usize, output: usize, delta: f32) -> FunctionContext {
        let mut slot = Slot::default();
        slot.set_execute(move |inv| {
            if delta.is_nan() {
                return Err(KernelError::failed("refused"));
            }
            let x = inv.input_f32(0)?;
            for (o, v) in inv.output_f32_mut(0)?.iter_mut().zip(x) {
                *o = v + delta;
            }
            Ok(())
        });
        let info = FunctionInfo {
            index,
            function_type: FunctionType::AddScalar,
            variant: 0,
            inputs: vec![var(input)],
            outputs: vec![var(output)],
            params: vec![],
        };
        FunctionContext::new(info, BindingSource::Builtin, slot.into_binding().unwrap())
    }

    fn floats(arena: &BufferArena, region: usize) -> Vec<f32> {
        bytemuck::cast_slice(arena.region(region).unwrap()).to_vec()
    }

    #[test]
    fn test_runs_in_order() {
        let mut arena = BufferArena::allocate(&[8, 8, 8], MemoryBudget::from_kb(1)).unwrap();
        arena.region_mut(0).unwrap().copy_from_slice(bytemuck::cast_slice(&[1.0f32, 2.0]));
        let mut functions = vec![add_const(0, 0, 1, 1.0), add_const(1, 1, 2, 10.0)];

        let metrics = run(&mut functions, &mut arena, &mut Vec::new(), false).unwrap();
        assert!(metrics.is_none());
        assert_eq!(floats(&arena, 1), vec![2.0, 3.0]);
        assert_eq!(floats(&arena, 2), vec![12.0, 13.0]);
    }

    #[test]
    fn test_failure_halts_and_keeps_earlier_outputs() {
        let mut arena = BufferArena::allocate(&[8, 8, 8], MemoryBudget::from_kb(1)).unwrap();
        arena.region_mut(0).unwrap().copy_from_slice(bytemuck::cast_slice(&[1.0f32, 1.0]));
        let mut functions = vec![add_const(0, 0, 1, 1.0), add_const(1, 1, 2, f32::NAN)];

        let err = run(&mut functions, &mut arena, &mut Vec::new(), false).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::OperatorExecutionFailure { function: 1, function_type: FunctionType::AddScalar, .. }
        ));
        assert_eq!(floats(&arena, 1), vec![2.0, 2.0]);
        assert_eq!(floats(&arena, 2), vec![0.0, 0.0]);
    }

    #[test]
    fn test_region_table_is_kept_between_passes() {
        let mut arena = BufferArena::allocate(&[8, 8, 8], MemoryBudget::from_kb(1)).unwrap();
        let mut functions = vec![add_const(0, 0, 1, 1.0), add_const(1, 1, 2, 1.0)];
        let mut scratch = Vec::new();

        run(&mut functions, &mut arena, &mut scratch, false).unwrap();
        assert!(scratch.is_empty());
        let capacity = scratch.capacity();
        assert!(capacity >= 3);
        for _ in 0..3 {
            run(&mut functions, &mut arena, &mut scratch, false).unwrap();
            assert_eq!(scratch.capacity(), capacity);
        }
        assert_eq!(floats(&arena, 2), vec![2.0, 2.0]);

        functions.push(add_const(2, 2, 0, f32::NAN));
        assert!(run(&mut functions, &mut arena, &mut scratch, false).is_err());
        assert_eq!(scratch.capacity(), capacity);
    }

    #[test]
    fn test_profiling_records_every_function() {
        let mut arena = BufferArena::allocate(&[8, 8], MemoryBudget::from_kb(1)).unwrap();
        let mut functions = vec![add_const(0, 0, 1, 1.0)];
        let metrics = run(&mut functions, &mut arena, &mut Vec::new(), true).unwrap().unwrap();
        assert_eq!(metrics.functions.len(), 1);
        assert_eq!(metrics.functions[0].source, BindingSource::Builtin);
        assert!(metrics.total_duration >= metrics.compute_duration());
    }
}
