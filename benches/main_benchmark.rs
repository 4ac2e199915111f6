use criterion::{Criterion, criterion_group, criterion_main};
use objlist::graph::object_list::{fold_stamps, gather_dynamic_dependencies};
use objlist::graph::{CompilerNode, NodeGraph, NodeId, ObjectListNode, ObjectListSpec};
use objlist::toolchain::CompilerFamily;
use std::hint::black_box;

const FILES: usize = 2_000;

/// A graph with one object list over a pre-populated directory listing.
fn large_graph() -> (NodeGraph, NodeId) {
    let mut graph = NodeGraph::new("/bench");
    graph
        .create_compiler_node("clang", CompilerNode::new("/usr/bin/clang++", CompilerFamily::Clang))
        .unwrap();

    let mut spec = ObjectListSpec::new("core", "clang", "-c %1 -o %2");
    spec.compiler_input_path = vec!["src".to_string()];
    spec.compiler_output_path = Some("out".to_string());
    let id = ObjectListNode::initialize(&mut graph, spec).unwrap();

    let listing = graph.node(id).as_object_list().unwrap().static_dependencies()[1];
    let files: Vec<String> = (0..FILES)
        .map(|i| format!("/bench/src/module{}/file{}.cpp", i % 40, i))
        .collect();
    graph.set_directory_list_files(listing, files);
    (graph, id)
}

fn bench_expansion(c: &mut Criterion) {
    let (mut graph, id) = large_graph();
    // First pass creates the nodes, later passes only look them up
    gather_dynamic_dependencies(&mut graph, id).unwrap();

    c.bench_function("gather_dynamic_dependencies_reuse", |b| {
        b.iter(|| gather_dynamic_dependencies(black_box(&mut graph), black_box(id)).unwrap())
    });
}

fn bench_fold_stamps(c: &mut Criterion) {
    let stamps: Vec<u64> = (1..=FILES as u64).map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15)).collect();
    c.bench_function("fold_stamps", |b| b.iter(|| fold_stamps(black_box(&stamps))));
}

fn bench_object_file_name(c: &mut Criterion) {
    let (graph, id) = large_graph();
    let list = graph.node(id).as_object_list().unwrap();
    c.bench_function("object_file_name", |b| {
        b.iter(|| list.object_file_name(black_box("/bench/src/module7/file123.cpp"), black_box("/bench/src/")))
    });
}

criterion_group!(benches, bench_expansion, bench_fold_stamps, bench_object_file_name);
criterion_main!(benches);
