// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the built-in kernels.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tensor_core::{affine, softmax, Shape};

fn bench_affine(c: &mut Criterion) {
    let input_shape = Shape::matrix(1, 256);
    let weight_shape = Shape::matrix(256, 128);
    let input = vec![0.5f32; 256];
    let weight = vec![0.01f32; 256 * 128];
    let bias = vec![0.1f32; 128];
    let mut output = vec![0.0f32; 128];

    c.bench_function("affine 1x256 @ 256x128", |b| {
        b.iter(|| {
            affine(
                black_box(&input),
                &input_shape,
                black_box(&weight),
                &weight_shape,
                Some(&bias),
                &mut output,
                1,
            )
            .unwrap()
        })
    });
}

fn bench_softmax(c: &mut Criterion) {
    let shape = Shape::matrix(16, 1000);
    let input: Vec<f32> = (0..16_000).map(|i| (i % 97) as f32 * 0.01).collect();
    let mut output = vec![0.0f32; 16_000];

    c.bench_function("softmax 16x1000 axis 1", |b| {
        b.iter(|| softmax(black_box(&input), &mut output, &shape, 1).unwrap())
    });
}

criterion_group!(benches, bench_affine, bench_softmax);
criterion_main!(benches);
