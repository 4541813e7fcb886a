//! Benchmarks for routing-graph mutation and snapshot capture.

use criterion::{Criterion, criterion_group, criterion_main};
use pulso_core::graph::{PortDirection, PortKind, RoutingGraph};

fn build_chain_graph(modules: usize) -> RoutingGraph {
    let mut graph = RoutingGraph::new();
    let mut prev = graph.add_effect_module("fx 0");
    for i in 1..modules {
        let next = graph.add_effect_module(format!("fx {i}"));
        let out = graph
            .module(prev)
            .unwrap()
            .find_port(PortDirection::Output, PortKind::Audio)
            .unwrap()
            .id;
        let inp = graph
            .module(next)
            .unwrap()
            .find_port(PortDirection::Input, PortKind::Audio)
            .unwrap()
            .id;
        graph
            .create_connection(prev, out, next, inp, PortKind::Audio)
            .unwrap();
        prev = next;
    }
    graph
}

fn bench_graph_mutation(c: &mut Criterion) {
    c.bench_function("graph_build_32_module_chain", |b| {
        b.iter(|| build_chain_graph(32));
    });

    c.bench_function("graph_snapshot_32", |b| {
        let graph = build_chain_graph(32);
        b.iter(|| graph.snapshot());
    });

    c.bench_function("graph_export_import_32", |b| {
        let graph = build_chain_graph(32);
        let doc = graph.export_document();
        b.iter(|| {
            let mut fresh = RoutingGraph::new();
            fresh.import_document(&doc).unwrap();
        });
    });
}

criterion_group!(benches, bench_graph_mutation);
criterion_main!(benches);
