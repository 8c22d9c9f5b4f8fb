//! Benchmarks for circuit building and rendering
//!
//! Run with: cargo bench -p qlab-ir

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qlab_ir::{Circuit, QubitId, draw};
use std::f64::consts::PI;

fn qft_like(n: u32) -> Circuit {
    let mut circuit = Circuit::with_size("bench", n, 0);
    for target in (0..n).rev() {
        circuit.h(QubitId(target)).unwrap();
        for control in 0..target {
            let angle = PI / f64::from(1u32 << (target - control).min(30));
            circuit.cp(angle, QubitId(control), QubitId(target)).unwrap();
        }
    }
    circuit
}

/// Benchmark adding gates to a circuit
fn bench_gate_addition(c: &mut Criterion) {
    let mut group = c.benchmark_group("gate_addition");

    group.bench_function("h_gate", |b| {
        let mut circuit = Circuit::with_size("bench", 10, 0);
        b.iter(|| {
            circuit.h(black_box(QubitId(0))).unwrap();
        });
    });

    group.bench_function("cp_gate", |b| {
        let mut circuit = Circuit::with_size("bench", 10, 0);
        b.iter(|| {
            circuit
                .cp(black_box(PI / 4.0), black_box(QubitId(0)), black_box(QubitId(1)))
                .unwrap();
        });
    });

    group.finish();
}

/// Benchmark depth and text rendering of QFT-shaped circuits
fn bench_depth_and_draw(c: &mut Criterion) {
    let mut group = c.benchmark_group("qft_shape");

    for n in &[4u32, 8, 16] {
        let circuit = qft_like(*n);
        group.bench_with_input(BenchmarkId::new("depth", n), &circuit, |b, circ| {
            b.iter(|| black_box(circ.depth()));
        });
        group.bench_with_input(BenchmarkId::new("draw", n), &circuit, |b, circ| {
            b.iter(|| black_box(draw::draw(circ)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_gate_addition, bench_depth_and_draw);
criterion_main!(benches);
