//! Scheduling throughput on the graph shapes that stress the passes:
//! deep chains (iterative DFS depth) and wide fan-in DAGs (frontier churn).

use std::collections::HashSet;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use sched_core::{open_loop_schedule, ScheduleConfig, SimTop, UpdateBlock, Vertex};

fn chain_top(n: usize) -> SimTop {
    let blks: Vec<_> = (0..n)
        .map(|i| UpdateBlock::new(format!("up_{}", i), || {}))
        .collect();
    let mut top = SimTop::new("bench");
    top.dag.final_upblks = blks.clone();
    let mut cons = HashSet::new();
    for pair in blks.windows(2) {
        cons.insert((Vertex::from(pair[0].clone()), Vertex::from(pair[1].clone())));
    }
    top.dag.all_constraints = Some(cons);
    top
}

fn diamond_top(layers: usize, width: usize) -> SimTop {
    let blks: Vec<Vec<_>> = (0..layers)
        .map(|l| {
            (0..width)
                .map(|i| UpdateBlock::new(format!("up_{}_{}", l, i), || {}))
                .collect()
        })
        .collect();
    let mut top = SimTop::new("bench");
    top.dag.final_upblks = blks.iter().flatten().cloned().collect();
    let mut cons = HashSet::new();
    for l in 1..layers {
        for a in &blks[l - 1] {
            for b in &blks[l] {
                cons.insert((Vertex::from(a.clone()), Vertex::from(b.clone())));
            }
        }
    }
    top.dag.all_constraints = Some(cons);
    top
}

fn bench_schedule_build(c: &mut Criterion) {
    c.bench_function("schedule_chain_1500", |b| {
        b.iter_batched(
            || chain_top(1500),
            |top| open_loop_schedule(top, ScheduleConfig::default()).unwrap(),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("schedule_diamond_8x64", |b| {
        b.iter_batched(
            || diamond_top(8, 64),
            |top| open_loop_schedule(top, ScheduleConfig::default()).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

fn bench_tick(c: &mut Criterion) {
    let sim = open_loop_schedule(chain_top(1024), ScheduleConfig::default()).unwrap();
    c.bench_function("tick_chain_1024", |b| {
        b.iter(|| {
            sim.tick().unwrap();
        })
    });
}

criterion_group!(benches, bench_schedule_build, bench_tick);
criterion_main!(benches);
