//! Example: build, rewrite and plan a small graph
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --example plan_graph -- --liveness
//! ```

use std::env;
use std::sync::Arc;

use tensor_planner::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> PlanResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let strategy = if env::args().any(|a| a == "--liveness") {
        PlanStrategy::Liveness
    } else {
        PlanStrategy::Static
    };
    let config = GraphConfig {
        strategy,
        ..Default::default()
    };
    let mut g = Graph::with_config(Arc::new(CpuRuntime), config);

    // x -> T[0,2,1] -> T[0,2,1] -> T[0,2,1] -> MatMul(., w) -> Add(., x)
    let x = g.add_tensor(&[4, 16, 32], DataType::Float32);
    let w = g.add_tensor(&[4, 16, 8], DataType::Float32);
    let t1 = g.add_transpose(x, None, [0, 2, 1])?;
    let y1 = g.output(t1, 0)?;
    let t2 = g.add_transpose(y1, None, [0, 2, 1])?;
    let y2 = g.output(t2, 0)?;
    let t3 = g.add_transpose(y2, None, [0, 2, 1])?;
    let y3 = g.output(t3, 0)?;
    let mm = g.add_matmul(y3, w, None, false, false)?;
    let z = g.output(mm, 0)?;
    let bias = g.add_tensor(&[8], DataType::Float32);
    g.add_binary(BinaryOp::Add, z, bias, None)?;

    println!("Before optimization:\n{}", g);

    let result = g.optimize()?;
    println!(
        "Applied {} rewrites, removed {} operators and {} tensors",
        result.transforms_applied, result.operators_eliminated, result.tensors_eliminated
    );

    g.topo_sort()?;
    g.shape_infer()?;
    g.ensure_valid()?;
    g.data_malloc()?;

    println!("After planning ({:?}):\n{}", strategy, g);
    println!("{}", g.allocator().summary());
    Ok(())
}
