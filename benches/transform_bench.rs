//! Benchmark for rewriting and memory planning
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tensor_planner::allocator::{Allocator, CpuRuntime};
use tensor_planner::graph::{Graph, GraphConfig, PlanStrategy};
use tensor_planner::ops::BinaryOp;
use tensor_planner::tensor::DataType;

/// `blocks` repetitions of Transpose pair + swap-fed MatMul + Add
fn build_graph(blocks: usize, strategy: PlanStrategy) -> Graph {
    let config = GraphConfig {
        strategy,
        ..Default::default()
    };
    let mut g = Graph::with_config(Arc::new(CpuRuntime), config);
    let w = g.add_tensor(&[8, 64, 64], DataType::Float32);
    let mut cur = g.add_tensor(&[8, 64, 64], DataType::Float32);

    for _ in 0..blocks {
        let t1 = g.add_transpose(cur, None, [0, 2, 1]).unwrap();
        let y1 = g.output(t1, 0).unwrap();
        let t2 = g.add_transpose(y1, None, [0, 2, 1]).unwrap();
        let y2 = g.output(t2, 0).unwrap();
        let t3 = g.add_transpose(y2, None, [0, 2, 1]).unwrap();
        let y3 = g.output(t3, 0).unwrap();
        let mm = g.add_matmul(y3, w, None, false, false).unwrap();
        let z = g.output(mm, 0).unwrap();
        let add = g.add_binary(BinaryOp::Add, z, cur, None).unwrap();
        cur = g.output(add, 0).unwrap();
    }
    g
}

fn transform_benchmark(c: &mut Criterion) {
    c.bench_function("optimize_64_blocks", |b| {
        b.iter_batched(
            || build_graph(64, PlanStrategy::Static),
            |mut g| black_box(g.optimize().unwrap()),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("topo_sort_64_blocks", |b| {
        b.iter_batched(
            || build_graph(64, PlanStrategy::Static),
            |mut g| {
                g.topo_sort().unwrap();
                black_box(g.op_count())
            },
            BatchSize::SmallInput,
        )
    });
}

fn planning_benchmark(c: &mut Criterion) {
    for (name, strategy) in [
        ("data_malloc_static", PlanStrategy::Static),
        ("data_malloc_liveness", PlanStrategy::Liveness),
    ] {
        c.bench_function(name, |b| {
            b.iter_batched(
                || build_graph(64, strategy),
                |mut g| {
                    g.data_malloc().unwrap();
                    black_box(g.allocator().peak())
                },
                BatchSize::SmallInput,
            )
        });
    }

    c.bench_function("allocator_churn", |b| {
        b.iter(|| {
            let mut a = Allocator::new(Arc::new(CpuRuntime));
            let mut live = Vec::with_capacity(256);
            for i in 0..1024usize {
                let size = (i * 37) % 509 + 1;
                live.push((a.alloc(size).unwrap(), size));
                if i % 3 == 0 {
                    let (addr, size) = live.swap_remove(i % live.len());
                    a.free(addr, size).unwrap();
                }
            }
            black_box(a.peak())
        })
    });
}

criterion_group!(benches, transform_benchmark, planning_benchmark);
criterion_main!(benches);
