// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: descriptor → dispatch → forward → free.
//!
//! Networks are either the reference `affine_000.nnb` fixture or built
//! with `NetworkWriter`, and driven only through the public `Context` API.

use std::cell::Cell;
use std::rc::Rc;

use nnb_format::{FunctionSpec, FunctionType, NetworkWriter, VariableSpec};
use nnb_runtime::{
    BindingSource, Context, ContextState, FunctionInfo, KernelError, Resolution, RuntimeConfig,
    RuntimeError, Slot, Status,
};
use tensor_core::DType;

const AFFINE: &[u8] = include_bytes!("fixtures/affine_000.nnb");

// ── Helpers ────────────────────────────────────────────────────

/// x[1,4] ─ReLU(variant)─► y[1,4]
fn relu_network(variant: u16) -> Vec<u8> {
    unary_network(FunctionType::ReLU, variant, DType::F32)
}

fn unary_network(function_type: FunctionType, variant: u16, dtype: DType) -> Vec<u8> {
    let mut w = NetworkWriter::new();
    let bx = w.buffer(4);
    let by = w.buffer(4);
    let x = w.variable(VariableSpec::buffer(0, &[1, 4], bx).with_dtype(dtype, 0));
    let y = w.variable(VariableSpec::buffer(1, &[1, 4], by).with_dtype(dtype, 0));
    w.function(FunctionSpec::new(function_type, &[x], &[y]).with_variant(variant));
    w.inputs(&[x]).outputs(&[y]);
    w.to_bytes()
}

/// x[2,3] ─Affine(W[3,2], b[2])─► h[2,2] ─ReLU─► y[2,2]
fn affine_relu_network() -> Vec<u8> {
    let mut w = NetworkWriter::new();
    let bx = w.buffer(6);
    let by = w.buffer(4);
    let bh = w.buffer(4);
    let x = w.variable(VariableSpec::buffer(0, &[2, 3], bx));
    let y = w.variable(VariableSpec::buffer(1, &[2, 2], by));
    let weight = w.variable(VariableSpec::parameter_f32(
        2,
        &[3, 2],
        &[1.0, 0.0, 0.0, 1.0, 1.0, -1.0],
    ));
    let bias = w.variable(VariableSpec::parameter_f32(3, &[2], &[0.5, -1.0]));
    let h = w.variable(VariableSpec::buffer(4, &[2, 2], bh));
    w.function(FunctionSpec::new(FunctionType::Affine, &[x, weight, bias], &[h]).with_i32_param(1));
    w.function(FunctionSpec::new(FunctionType::ReLU, &[h], &[y]));
    w.inputs(&[x]).outputs(&[y]);
    w.to_bytes()
}

/// An override for every variant in `variants` that negates its input,
/// counting executions and releases.
fn negate_override(
    variants: &'static [u16],
    executed: Rc<Cell<u32>>,
    released: Rc<Cell<u32>>,
) -> impl Fn(&FunctionInfo, &mut Slot) -> Resolution {
    move |info: &FunctionInfo, slot: &mut Slot| {
        if !variants.contains(&info.variant) {
            return Resolution::NotMatched;
        }
        let executed = Rc::clone(&executed);
        slot.set_execute(move |inv| {
            executed.set(executed.get() + 1);
            let x = inv.input_f32(0)?;
            for (y, v) in inv.output_f32_mut(0)?.iter_mut().zip(x) {
                *y = -v;
            }
            Ok(())
        });
        let released = Rc::clone(&released);
        slot.set_release(move |_| released.set(released.get() + 1));
        Resolution::Matched
    }
}

fn counters() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
    (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)))
}

// ── Reference descriptor ───────────────────────────────────────

#[test]
fn test_reference_descriptor_end_to_end() {
    let mut ctx = Context::new();
    ctx.initialize(AFFINE).unwrap();

    assert_eq!(ctx.input_size(0).unwrap(), 24);
    assert_eq!(ctx.input_byte_size(0).unwrap(), 96);
    assert_eq!(ctx.output_size(0).unwrap(), 6);
    assert_eq!(ctx.input_variable(0).unwrap().shape.dims(), &[1, 4, 6]);

    ctx.input_f32_mut(0).unwrap().fill(1.0);
    ctx.forward().unwrap();
    assert!(ctx.output_f32(0).unwrap().iter().all(|&v| v == 0.0));

    ctx.free().unwrap();
    assert_eq!(ctx.state(), ContextState::Freed);
}

#[test]
fn test_size_queries_are_stable() {
    let mut ctx = Context::new();
    ctx.initialize(AFFINE).unwrap();
    for _ in 0..3 {
        assert_eq!(ctx.input_size(0).unwrap(), 24);
        ctx.forward().unwrap();
    }
    assert_eq!(ctx.input_byte_size(0).unwrap(), 96);
    assert_eq!(ctx.output_byte_size(0).unwrap(), 24);
}

#[test]
fn test_reference_descriptor_with_counting_override() {
    let executed = Rc::new(Cell::new(0u32));
    let released = Rc::new(Cell::new(0u32));
    let mut ctx = Context::new();
    let (exec_count, release_count) = (Rc::clone(&executed), Rc::clone(&released));
    ctx.register_override(FunctionType::Affine, move |info: &FunctionInfo, slot: &mut Slot| {
        if info.variant != 1 {
            return Resolution::NotMatched;
        }
        let exec_count = Rc::clone(&exec_count);
        slot.set_execute(move |_| {
            exec_count.set(exec_count.get() + 1);
            Ok(())
        });
        let release_count = Rc::clone(&release_count);
        slot.set_release(move |_| release_count.set(release_count.get() + 1));
        Resolution::Matched
    })
    .unwrap();

    ctx.initialize(AFFINE).unwrap();
    assert_eq!(ctx.binding_source(0).unwrap(), BindingSource::Override(0));
    assert_eq!(ctx.input_count().unwrap(), 1);
    assert_eq!(ctx.input_variable(0).unwrap().dtype, DType::F32);
    assert_eq!(ctx.input_size(0).unwrap() * 4, 96);

    let input: Vec<f32> = (1..=24).map(|v| v as f32).collect();
    ctx.input_f32_mut(0).unwrap().copy_from_slice(&input);
    ctx.forward().unwrap();
    assert_eq!(executed.get(), 1);
    ctx.forward().unwrap();
    assert_eq!(executed.get(), 2);
    assert!(ctx.output_f32(0).unwrap().iter().all(|&v| v == 0.0));

    assert_eq!(released.get(), 0);
    ctx.free().unwrap();
    assert_eq!(released.get(), 1);
    assert_eq!(executed.get(), 2);
}

#[test]
fn test_reference_descriptor_declined_override_uses_builtin() {
    let (executed, released) = counters();
    let mut ctx = Context::new();
    let (exec_count, release_count) = (Rc::clone(&executed), Rc::clone(&released));
    ctx.register_override(FunctionType::Affine, move |_: &FunctionInfo, slot: &mut Slot| {
        let exec_count = Rc::clone(&exec_count);
        slot.set_execute(move |_| {
            exec_count.set(exec_count.get() + 1);
            Ok(())
        });
        let release_count = Rc::clone(&release_count);
        slot.set_release(move |_| release_count.set(release_count.get() + 1));
        Resolution::NotMatched
    })
    .unwrap();

    ctx.initialize(AFFINE).unwrap();
    assert_eq!(ctx.binding_source(0).unwrap(), BindingSource::Builtin);
    ctx.input_f32_mut(0).unwrap().fill(1.0);
    ctx.forward().unwrap();
    ctx.free().unwrap();
    assert_eq!(executed.get(), 0);
    assert_eq!(released.get(), 0);
}

// ── Built-ins ──────────────────────────────────────────────────

#[test]
fn test_affine_with_known_weights() {
    let mut ctx = Context::new();
    ctx.initialize(&affine_relu_network()).unwrap();
    ctx.input_f32_mut(0)
        .unwrap()
        .copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    ctx.forward().unwrap();

    // h = x·W + b = [[4.5, -2.0], [10.5, -2.0]], then ReLU.
    assert_eq!(ctx.output_f32(0).unwrap(), &[4.5, 0.0, 10.5, 0.0]);
}

#[test]
fn test_forward_is_idempotent_and_tracks_inputs() {
    let mut ctx = Context::new();
    ctx.initialize(&relu_network(0)).unwrap();
    ctx.input_f32_mut(0)
        .unwrap()
        .copy_from_slice(&[-1.0, 2.0, -3.0, 4.0]);

    ctx.forward().unwrap();
    let first = ctx.output_f32(0).unwrap().to_vec();
    ctx.forward().unwrap();
    assert_eq!(ctx.output_f32(0).unwrap(), first.as_slice());
    assert_eq!(first, vec![0.0, 2.0, 0.0, 4.0]);

    ctx.input_f32_mut(0).unwrap()[0] = 9.0;
    ctx.forward().unwrap();
    assert_eq!(ctx.output_f32(0).unwrap()[0], 9.0);
}

#[test]
fn test_no_implementation_is_unsupported() {
    let mut ctx = Context::new();
    let err = ctx
        .initialize(&unary_network(FunctionType::Convolution, 0, DType::F32))
        .unwrap_err();
    assert_eq!(err.status(), Status::UnsupportedOperator);
    assert_eq!(ctx.state(), ContextState::Configuring);

    let mut ctx = Context::new();
    let err = ctx
        .initialize(&unary_network(FunctionType::Other(200), 0, DType::F32))
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::UnsupportedOperator { function_type: FunctionType::Other(200), .. }
    ));
}

#[test]
fn test_builtins_reject_non_float_variables() {
    let mut ctx = Context::new();
    let err = ctx
        .initialize(&unary_network(FunctionType::ReLU, 0, DType::Fixed8))
        .unwrap_err();
    assert_eq!(err.status(), Status::UnsupportedOperator);
}

// ── Overrides ──────────────────────────────────────────────────

#[test]
fn test_override_executes_once_per_forward() {
    let (executed, released) = counters();
    let mut ctx = Context::new();
    ctx.register_override(
        FunctionType::ReLU,
        negate_override(&[1], Rc::clone(&executed), Rc::clone(&released)),
    )
    .unwrap();
    ctx.initialize(&relu_network(1)).unwrap();
    assert_eq!(ctx.binding_source(0).unwrap(), BindingSource::Override(0));

    ctx.input_f32_mut(0)
        .unwrap()
        .copy_from_slice(&[1.0, -2.0, 3.0, -4.0]);
    ctx.forward().unwrap();
    assert_eq!(executed.get(), 1);
    assert_eq!(ctx.output_f32(0).unwrap(), &[-1.0, 2.0, -3.0, 4.0]);

    ctx.forward().unwrap();
    assert_eq!(executed.get(), 2);
}

#[test]
fn test_declining_override_falls_through_to_builtin() {
    let (executed, released) = counters();
    let tried = Rc::new(Cell::new(0));
    let mut ctx = Context::new();

    // Installs routines and then declines: they must be discarded unrun.
    let probe_released = Rc::clone(&released);
    let probe_tried = Rc::clone(&tried);
    ctx.register_override(FunctionType::ReLU, move |_: &FunctionInfo, slot: &mut Slot| {
        probe_tried.set(probe_tried.get() + 1);
        slot.set_execute(|_| Err(KernelError::failed("must not run")));
        let released = Rc::clone(&probe_released);
        slot.set_release(move |_| released.set(released.get() + 1));
        Resolution::NotMatched
    })
    .unwrap();
    ctx.register_override(
        FunctionType::ReLU,
        negate_override(&[5], Rc::clone(&executed), Rc::clone(&released)),
    )
    .unwrap();

    ctx.initialize(&relu_network(2)).unwrap();
    assert_eq!(tried.get(), 1);
    assert_eq!(ctx.binding_source(0).unwrap(), BindingSource::Builtin);

    ctx.input_f32_mut(0)
        .unwrap()
        .copy_from_slice(&[-1.0, 1.0, -1.0, 1.0]);
    ctx.forward().unwrap();
    assert_eq!(ctx.output_f32(0).unwrap(), &[0.0, 1.0, 0.0, 1.0]);
    assert_eq!(executed.get(), 0);

    ctx.free().unwrap();
    assert_eq!(released.get(), 0);
}

#[test]
fn test_second_override_in_chain_is_selected_by_variant() {
    let (first, _) = counters();
    let (second, released) = counters();
    let mut ctx = Context::new();
    ctx.register_override(
        FunctionType::ReLU,
        negate_override(&[1], Rc::clone(&first), Rc::clone(&released)),
    )
    .unwrap();
    ctx.register_override(
        FunctionType::ReLU,
        negate_override(&[2], Rc::clone(&second), Rc::clone(&released)),
    )
    .unwrap();
    ctx.initialize(&relu_network(2)).unwrap();
    assert_eq!(ctx.binding_source(0).unwrap(), BindingSource::Override(1));

    ctx.forward().unwrap();
    assert_eq!((first.get(), second.get()), (0, 1));
}

#[test]
fn test_builtin_sentinel_skips_overrides() {
    let (executed, released) = counters();
    let mut ctx = Context::new();
    ctx.register_override(
        FunctionType::ReLU,
        negate_override(&[100], Rc::clone(&executed), Rc::clone(&released)),
    )
    .unwrap();
    ctx.initialize(&relu_network(100)).unwrap();
    assert_eq!(ctx.binding_source(0).unwrap(), BindingSource::Builtin);

    ctx.forward().unwrap();
    assert_eq!(executed.get(), 0);
}

#[test]
fn test_configured_sentinel() {
    let config = RuntimeConfig::from_toml("builtin_variant = 7").unwrap();

    let (executed, released) = counters();
    let mut ctx = Context::with_config(config.clone());
    ctx.register_override(
        FunctionType::ReLU,
        negate_override(&[7, 100], Rc::clone(&executed), Rc::clone(&released)),
    )
    .unwrap();
    ctx.initialize(&relu_network(7)).unwrap();
    assert_eq!(ctx.binding_source(0).unwrap(), BindingSource::Builtin);

    // 100 is an ordinary variant once the sentinel moves.
    let mut ctx = Context::with_config(config);
    ctx.register_override(
        FunctionType::ReLU,
        negate_override(&[7, 100], Rc::clone(&executed), Rc::clone(&released)),
    )
    .unwrap();
    ctx.initialize(&relu_network(100)).unwrap();
    assert_eq!(ctx.binding_source(0).unwrap(), BindingSource::Override(0));
}

#[test]
fn test_sentinel_disabled() {
    let config = RuntimeConfig::from_toml("builtin_variant = -1").unwrap();
    let (executed, released) = counters();
    let mut ctx = Context::with_config(config);
    ctx.register_override(
        FunctionType::ReLU,
        negate_override(&[100], Rc::clone(&executed), Rc::clone(&released)),
    )
    .unwrap();
    ctx.initialize(&relu_network(100)).unwrap();
    assert_eq!(ctx.binding_source(0).unwrap(), BindingSource::Override(0));
}

#[test]
fn test_override_binds_unknown_function_type() {
    let (executed, released) = counters();
    let mut ctx = Context::new();
    ctx.register_override(
        FunctionType::Other(200),
        negate_override(&[0], Rc::clone(&executed), Rc::clone(&released)),
    )
    .unwrap();
    ctx.initialize(&unary_network(FunctionType::Other(200), 0, DType::F32))
        .unwrap();
    ctx.input_f32_mut(0).unwrap().fill(2.0);
    ctx.forward().unwrap();
    assert_eq!(ctx.output_f32(0).unwrap(), &[-2.0; 4]);
}

#[test]
fn test_override_handles_non_float_variables() {
    let mut ctx = Context::new();
    ctx.register_override(FunctionType::ReLU, |_: &FunctionInfo, slot: &mut Slot| {
        slot.set_execute(|inv| {
            let x = inv.input(0)?.to_vec();
            inv.output(0)?.copy_from_slice(&x);
            Ok(())
        });
        Resolution::Matched
    })
    .unwrap();
    ctx.initialize(&unary_network(FunctionType::ReLU, 3, DType::Fixed8))
        .unwrap();

    assert_eq!(ctx.input_byte_size(0).unwrap(), 4);
    let err = ctx.input_f32_mut(0).unwrap_err();
    assert!(matches!(err, RuntimeError::DTypeMismatch { dtype: DType::Fixed8, .. }));

    ctx.input_buffer(0).unwrap().copy_from_slice(&[1, 2, 3, 4]);
    ctx.forward().unwrap();
    assert_eq!(ctx.output_buffer(0).unwrap(), &[1, 2, 3, 4]);
}

#[test]
fn test_override_private_state_persists_across_forwards() {
    let mut ctx = Context::new();
    ctx.register_override(FunctionType::ReLU, |_: &FunctionInfo, slot: &mut Slot| {
        slot.set_state(0u32);
        slot.set_execute(|inv| {
            let calls = inv
                .state_mut::<u32>()
                .ok_or_else(|| KernelError::failed("state missing"))?;
            *calls += 1;
            let value = *calls as f32;
            inv.output_f32_mut(0)?.fill(value);
            Ok(())
        });
        Resolution::Matched
    })
    .unwrap();
    ctx.initialize(&relu_network(1)).unwrap();
    ctx.forward().unwrap();
    ctx.forward().unwrap();
    ctx.forward().unwrap();
    assert_eq!(ctx.output_f32(0).unwrap(), &[3.0; 4]);
}

// ── Release ────────────────────────────────────────────────────

#[test]
fn test_release_runs_once_on_free() {
    let (executed, released) = counters();
    let mut ctx = Context::new();
    ctx.register_override(
        FunctionType::ReLU,
        negate_override(&[1], Rc::clone(&executed), Rc::clone(&released)),
    )
    .unwrap();
    ctx.initialize(&relu_network(1)).unwrap();
    ctx.forward().unwrap();
    assert_eq!(released.get(), 0);

    ctx.free().unwrap();
    assert_eq!(released.get(), 1);
    assert!(ctx.free().is_err());
    drop(ctx);
    assert_eq!(released.get(), 1);
}

#[test]
fn test_release_runs_once_on_drop() {
    let (executed, released) = counters();
    {
        let mut ctx = Context::new();
        ctx.register_override(
            FunctionType::ReLU,
            negate_override(&[1], Rc::clone(&executed), Rc::clone(&released)),
        )
        .unwrap();
        ctx.initialize(&relu_network(1)).unwrap();
    }
    assert_eq!(released.get(), 1);
}

#[test]
fn test_release_runs_on_failed_initialize() {
    // ReLU binds to the override, then Convolution has no implementation.
    let mut w = NetworkWriter::new();
    let b0 = w.buffer(4);
    let b1 = w.buffer(4);
    let b2 = w.buffer(4);
    let x = w.variable(VariableSpec::buffer(0, &[4], b0));
    let h = w.variable(VariableSpec::buffer(1, &[4], b1));
    let y = w.variable(VariableSpec::buffer(2, &[4], b2));
    w.function(FunctionSpec::new(FunctionType::ReLU, &[x], &[h]).with_variant(1));
    w.function(FunctionSpec::new(FunctionType::Convolution, &[h], &[y]));
    w.inputs(&[x]).outputs(&[y]);
    let bytes = w.to_bytes();

    let (executed, released) = counters();
    let mut ctx = Context::new();
    ctx.register_override(
        FunctionType::ReLU,
        negate_override(&[1], Rc::clone(&executed), Rc::clone(&released)),
    )
    .unwrap();
    let err = ctx.initialize(&bytes).unwrap_err();
    assert_eq!(err.status(), Status::UnsupportedOperator);
    assert_eq!(released.get(), 1);
    assert_eq!(ctx.state(), ContextState::Configuring);

    drop(ctx);
    assert_eq!(released.get(), 1);
}

#[test]
fn test_release_runs_when_arena_exceeds_budget() {
    let config = RuntimeConfig {
        memory_budget: "512".into(),
        ..Default::default()
    };
    let (executed, released) = counters();
    let mut ctx = Context::with_config(config);
    ctx.register_override(
        FunctionType::Affine,
        negate_override(&[1], Rc::clone(&executed), Rc::clone(&released)),
    )
    .unwrap();

    let err = ctx.initialize(AFFINE).unwrap_err();
    assert_eq!(err.status(), Status::OutOfMemory);
    assert_eq!(released.get(), 1);
    assert_eq!(ctx.state(), ContextState::Configuring);
}

// ── Failures and lifecycle ─────────────────────────────────────

#[test]
fn test_operator_failure_keeps_context_ready() {
    let mut ctx = Context::new();
    ctx.register_override(FunctionType::ReLU, |_: &FunctionInfo, slot: &mut Slot| {
        slot.set_execute(|_| Err(KernelError::failed("device lost")));
        Resolution::Matched
    })
    .unwrap();
    ctx.initialize(&relu_network(1)).unwrap();

    let err = ctx.forward().unwrap_err();
    assert_eq!(err.status(), Status::OperatorExecutionFailure);
    assert!(err.to_string().contains("device lost"));
    assert_eq!(ctx.state(), ContextState::Ready);

    assert!(ctx.forward().is_err());
    ctx.free().unwrap();
}

#[test]
fn test_matched_without_execute_is_rejected() {
    let mut ctx = Context::new();
    ctx.register_override(FunctionType::ReLU, |_: &FunctionInfo, _: &mut Slot| {
        Resolution::Matched
    })
    .unwrap();
    let err = ctx.initialize(&relu_network(1)).unwrap_err();
    assert_eq!(err.status(), Status::UnsupportedOperator);
}

#[test]
fn test_malformed_descriptor() {
    let mut ctx = Context::new();
    let err = ctx.initialize(&[0u8; 16]).unwrap_err();
    assert_eq!(err.status(), Status::MalformedDescriptor);

    let err = ctx.initialize(&AFFINE[..AFFINE.len() - 1]).unwrap_err();
    assert_eq!(err.status(), Status::MalformedDescriptor);
    assert_eq!(ctx.state(), ContextState::Configuring);
}

#[test]
fn test_lifecycle_violations() {
    let mut ctx = Context::new();
    assert_eq!(ctx.forward().unwrap_err().status(), Status::InvalidState);

    ctx.initialize(AFFINE).unwrap();
    let late = ctx.register_override(FunctionType::Affine, |_: &FunctionInfo, _: &mut Slot| {
        Resolution::NotMatched
    });
    assert_eq!(late.unwrap_err().status(), Status::InvalidState);
    assert_eq!(ctx.initialize(AFFINE).unwrap_err().status(), Status::InvalidState);

    ctx.free().unwrap();
    assert_eq!(ctx.forward().unwrap_err().status(), Status::InvalidState);
    assert_eq!(ctx.input_buffer(0).unwrap_err().status(), Status::InvalidState);
    assert_eq!(ctx.free().unwrap_err().status(), Status::InvalidState);
}

#[test]
fn test_profiling_metrics() {
    let config = RuntimeConfig {
        enable_profiling: true,
        ..Default::default()
    };
    let mut ctx = Context::with_config(config);
    ctx.initialize(&affine_relu_network()).unwrap();
    ctx.forward().unwrap();

    let metrics = ctx.last_metrics().unwrap();
    let types: Vec<_> = metrics.functions.iter().map(|f| f.function_type).collect();
    assert_eq!(types, vec![FunctionType::Affine, FunctionType::ReLU]);
    assert!(metrics.summary().contains("2 functions"));
}
