//! # Engine Benchmarks
//!
//! Performance benchmarks for seqra-core graph building and activation.
//!
//! Run with: `cargo bench -p seqra-core`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use seqra_core::{
    ActivationEngine, PatternName, RawEdge, RawNode, RawPatternGraph, ResultGraphBuilder,
    SequenceGraph, SequenceGraphBuilder, UnifiedActivationEngine, UnifiedSequenceGraphBuilder,
};
use std::collections::BTreeMap;
use std::hint::black_box;

fn raw_node(kind: &str) -> RawNode {
    RawNode {
        kind: kind.to_string(),
        pos: None,
        construction_name: None,
        element_value: None,
        role: None,
    }
}

/// Create a linear pattern of N slots: P = T0 T1 ... T(n-1).
fn linear_raw(slots: usize) -> RawPatternGraph {
    let mut nodes = BTreeMap::new();
    nodes.insert("start".to_string(), raw_node("START"));
    nodes.insert("end".to_string(), raw_node("END"));
    let mut edges = Vec::new();

    let mut prev = "start".to_string();
    for i in 0..slots {
        let id = format!("s{i}");
        nodes.insert(
            id.clone(),
            RawNode {
                pos: Some(format!("T{i}")),
                ..raw_node("SLOT")
            },
        );
        edges.push(RawEdge {
            from: prev,
            to: id.clone(),
            bypass: false,
        });
        prev = id;
    }
    edges.push(RawEdge {
        from: prev,
        to: "end".to_string(),
        bypass: false,
    });

    RawPatternGraph { nodes, edges }
}

fn linear_graph(name: &str, slots: usize) -> SequenceGraph {
    SequenceGraphBuilder::build(&PatternName::new(name), &linear_raw(slots)).expect("build")
}

/// N independent two-slot patterns, all listening for the same two types.
fn pattern_set(count: usize) -> Vec<SequenceGraph> {
    (0..count)
        .map(|i| linear_graph(&format!("P{i}"), 2))
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");

    for slots in [10, 100, 1000].iter() {
        let raw = linear_raw(*slots);
        group.bench_with_input(BenchmarkId::from_parameter(slots), &raw, |b, raw| {
            b.iter(|| black_box(SequenceGraphBuilder::build(&PatternName::new("P"), raw)));
        });
    }

    group.finish();
}

fn bench_unified_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("unified_build");

    for count in [10, 100, 1000].iter() {
        let graphs = pattern_set(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &graphs, |b, graphs| {
            b.iter(|| black_box(UnifiedSequenceGraphBuilder::build(graphs)));
        });
    }

    group.finish();
}

fn bench_token_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_dispatch");

    // One long pattern, one full match per iteration.
    for slots in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(slots), slots, |b, &slots| {
            b.iter(|| {
                let mut engine =
                    ActivationEngine::with_graphs(vec![linear_graph("P", slots)]).expect("engine");
                for i in 0..slots {
                    let _ = engine.process_input(&format!("T{i}"), "x");
                }
                black_box(engine.clock())
            });
        });
    }

    group.finish();
}

fn bench_unmatched_tokens(c: &mut Criterion) {
    let mut group = c.benchmark_group("unmatched_tokens");

    // Large pattern set, tokens nobody listens for. Measures index lookup.
    for count in [10, 100, 1000].iter() {
        let graphs = pattern_set(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &graphs, |b, graphs| {
            let mut engine = ActivationEngine::with_graphs(graphs.clone()).expect("engine");
            b.iter(|| black_box(engine.process_input("UNKNOWN", "x")));
        });
    }

    group.finish();
}

fn bench_unified_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("unified_stream");

    for slots in [10, 100].iter() {
        let unified =
            UnifiedSequenceGraphBuilder::build(&[linear_graph("P", *slots)]).expect("unified");
        group.bench_with_input(
            BenchmarkId::from_parameter(slots),
            &(unified, *slots),
            |b, (unified, slots)| {
                b.iter(|| {
                    let mut engine =
                        UnifiedActivationEngine::new(unified.clone()).expect("engine");
                    for i in 0..*slots {
                        let _ = engine.process_input(&format!("T{i}"), "x");
                    }
                    black_box(engine.events().len())
                });
            },
        );
    }

    group.finish();
}

fn bench_result_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("result_build");

    for matches in [10, 100, 1000].iter() {
        // A log of N full two-slot matches.
        let unified =
            UnifiedSequenceGraphBuilder::build(&[linear_graph("P", 2)]).expect("unified");
        let mut engine = UnifiedActivationEngine::new(unified).expect("engine");
        for _ in 0..*matches {
            let _ = engine.process_input("T0", "x");
            let _ = engine.process_input("T1", "x");
        }
        let events = engine.events().to_vec();

        group.bench_with_input(
            BenchmarkId::from_parameter(matches),
            &events,
            |b, events| {
                b.iter(|| black_box(ResultGraphBuilder::build(events)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_graph_build,
    bench_unified_build,
    bench_token_dispatch,
    bench_unmatched_tokens,
    bench_unified_stream,
    bench_result_build,
);

criterion_main!(benches);
