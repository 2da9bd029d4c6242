//! Integration tests across the graph, index, analytics, and tool layers.

use atlas_graph::output::{FOOTER_NO_GREP, NOT_FOUND_PREFIX};
use atlas_graph::snapshot::{GraphSnapshot, load_snapshot, save_snapshot};
use atlas_graph::tools::{Engine, ToolContext, ToolRegistry};
use atlas_graph::types::{EdgeKind, Location, Symbol, SymbolKind};
use atlas_graph::{CancelToken, CodeGraph, SymbolIndex};
use std::sync::Arc;

fn function(id: &str, name: &str, file: &str, line: u32) -> Symbol {
    Symbol {
        id: id.to_string(),
        name: name.to_string(),
        kind: SymbolKind::Function,
        file_path: file.to_string(),
        start_line: line,
        end_line: line + 5,
        language: "go".to_string(),
        ..Default::default()
    }
}

/// A small service-shaped graph: main -> handler -> {store, render},
/// store <-> cache cycle, plus an orphan.
fn service_graph() -> CodeGraph {
    let mut graph = CodeGraph::new();
    for (id, name, file, line) in [
        ("main.go:1:main", "main", "main.go", 1),
        ("handler.go:10:handler", "handler", "handler.go", 10),
        ("store.go:5:store", "store", "store.go", 5),
        ("render.go:3:render", "render", "render.go", 3),
        ("cache.go:8:cache", "cache", "cache.go", 8),
        ("orphan.go:1:orphan", "orphan", "orphan.go", 1),
    ] {
        graph.add_node(function(id, name, file, line)).unwrap();
    }
    for (from, to) in [
        ("main.go:1:main", "handler.go:10:handler"),
        ("handler.go:10:handler", "store.go:5:store"),
        ("handler.go:10:handler", "render.go:3:render"),
        ("store.go:5:store", "cache.go:8:cache"),
        ("cache.go:8:cache", "store.go:5:store"),
    ] {
        graph
            .add_edge(from, to, EdgeKind::Calls, Location::new("x.go", 1, 1))
            .unwrap();
    }
    graph.freeze();
    graph
}

fn service_registry() -> ToolRegistry {
    let graph = Arc::new(service_graph());
    let index = SymbolIndex::new();
    for symbol in graph.all_symbols() {
        index.add(symbol.clone()).unwrap();
    }
    let engine = Arc::new(Engine::new(graph, Some(Arc::new(index))).unwrap());
    ToolRegistry::with_default_tools(engine)
}

#[test]
fn snapshot_to_engine_round_trip() {
    let graph = service_graph();
    let snapshot = GraphSnapshot::capture(&graph, "itest");

    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("graph.bin");
    save_snapshot(&path, &snapshot).unwrap();
    let loaded = load_snapshot(&path).unwrap();
    let (graph, index) = loaded.rebuild().unwrap();

    let engine = Arc::new(Engine::new(graph, Some(index)).unwrap());
    let registry = ToolRegistry::with_default_tools(engine);
    let result = registry.execute(
        "find_callers",
        &ToolContext::default(),
        serde_json::json!({"function_name": "handler"}),
    );
    assert!(result.success);
    assert!(result.output_text.starts_with("Found 1 callers of 'handler':"));
}

#[test]
fn every_tool_answer_is_definitive() {
    let registry = service_registry();
    let calls: Vec<(&str, serde_json::Value)> = vec![
        ("find_callers", serde_json::json!({"function_name": "store"})),
        ("find_callees", serde_json::json!({"function_name": "handler"})),
        ("find_implementations", serde_json::json!({"interface_name": "handler"})),
        ("find_symbol", serde_json::json!({"name": "render"})),
        ("find_references", serde_json::json!({"symbol_name": "store"})),
        ("get_call_chain", serde_json::json!({"function_name": "main"})),
        ("find_path", serde_json::json!({"from": "main", "to": "cache"})),
        ("find_hotspots", serde_json::json!({})),
        ("find_dead_code", serde_json::json!({})),
        ("find_important", serde_json::json!({})),
        ("find_cycles", serde_json::json!({})),
        ("find_articulation_points", serde_json::json!({})),
        ("find_merge_points", serde_json::json!({})),
        ("find_control_dependencies", serde_json::json!({"function_name": "main"})),
    ];

    for (tool, params) in calls {
        let result = registry.execute(tool, &ToolContext::default(), params);
        assert!(result.success, "{tool} failed: {:?}", result.error);
        let text = result.output_text.trim_end();
        assert!(
            text.ends_with(FOOTER_NO_GREP),
            "{tool} output not definitive: {text:?}"
        );
        assert!(
            text.starts_with("Found") || text.starts_with(NOT_FOUND_PREFIX),
            "{tool} has a nonconforming headline: {text:?}"
        );
        assert!(result.trace.duration_ns > 0 || result.duration.as_nanos() == 0);
        assert_eq!(result.trace.tool, tool);
        assert!(result.tokens_used > 0);
    }
}

#[test]
fn cycles_and_merge_points_agree_with_topology() {
    let registry = service_registry();

    let cycles = registry.execute(
        "find_cycles",
        &ToolContext::default(),
        serde_json::json!({"min_size": 2}),
    );
    let output = cycles.output.unwrap();
    assert_eq!(output["total_cycles"], 1);
    assert_eq!(output["cycles"][0]["size"], 2);

    let merges = registry.execute(
        "find_merge_points",
        &ToolContext::default(),
        serde_json::json!({"min_sources": 2}),
    );
    let output = merges.output.unwrap();
    // store is called by handler and cache.
    assert_eq!(output["merge_points"][0]["name"], "store");
}

#[test]
fn concurrent_readers_share_the_frozen_graph() {
    let graph = Arc::new(service_graph());
    let index = SymbolIndex::new();
    for symbol in graph.all_symbols() {
        index.add(symbol.clone()).unwrap();
    }
    let engine = Arc::new(Engine::new(graph.clone(), Some(Arc::new(index))).unwrap());

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let engine = engine.clone();
            let graph = graph.clone();
            scope.spawn(move || {
                for _ in 0..50 {
                    let traversal = graph
                        .get_call_graph("main.go:1:main", 5, &CancelToken::none())
                        .unwrap();
                    assert_eq!(traversal.visited.len(), 5);

                    let ranked = engine
                        .analytics
                        .pagerank_top(3, &CancelToken::none())
                        .unwrap();
                    assert_eq!(ranked.len(), 3);
                    // Memoized scores are identical across threads.
                    assert_eq!(ranked[0].rank, 1);
                }
            });
        }
    });
}

#[test]
fn fuzzy_resolution_is_reported_in_trace() {
    let registry = service_registry();
    let result = registry.execute(
        "find_callers",
        &ToolContext::default(),
        serde_json::json!({"function_name": "handlr"}),
    );
    assert!(result.success);
    assert_eq!(result.trace.metadata["used_fuzzy"], "true");
    assert_eq!(result.trace.metadata["resolved_id"], "handler.go:10:handler");
}

#[test]
fn graph_stats_and_index_stats() {
    let graph = service_graph();
    let stats = graph.stats();
    assert_eq!(stats.nodes, 6);
    assert_eq!(stats.edges, 5);
    assert_eq!(stats.call_edges, 5);
    // main..cache form one weak component, orphan another.
    assert_eq!(stats.components, 2);

    let index = SymbolIndex::new();
    for symbol in graph.all_symbols() {
        index.add(symbol.clone()).unwrap();
    }
    let stats = index.stats();
    assert_eq!(stats.total_symbols, 6);
    assert_eq!(stats.callable_symbols, 6);
    assert_eq!(stats.files, 6);
}
