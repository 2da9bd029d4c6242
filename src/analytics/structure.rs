//! Degree-based structure analysis: hotspots, dead code, merge points,
//! and external-node classification.

use crate::cancel::CancelToken;
use crate::classify;
use crate::error::Result;
use crate::graph::CodeGraph;
use crate::types::{CallTraversal, EdgeKind, Symbol};
use std::sync::Arc;

/// Options for hotspot scoring.
#[derive(Debug, Clone)]
pub struct HotspotOptions {
    pub top: usize,
    pub exclude_tests: bool,
    /// Restrict to symbols whose package or path contains this scope. An
    /// empty scoped result is the answer; there is no global fallback.
    pub package_scope: Option<String>,
}

impl Default for HotspotOptions {
    fn default() -> Self {
        Self {
            top: 10,
            exclude_tests: true,
            package_scope: None,
        }
    }
}

/// A symbol with high combined degree.
#[derive(Debug, Clone)]
pub struct Hotspot {
    pub symbol: Arc<Symbol>,
    pub score: f64,
    pub in_degree: usize,
    pub out_degree: usize,
}

/// Options for the dead-code report.
#[derive(Debug, Clone)]
pub struct DeadCodeOptions {
    pub limit: usize,
    pub include_exported: bool,
}

impl Default for DeadCodeOptions {
    fn default() -> Self {
        Self {
            limit: 50,
            include_exported: false,
        }
    }
}

/// A symbol with no incoming edges that is not an entry point.
#[derive(Debug, Clone)]
pub struct DeadSymbol {
    pub symbol: Arc<Symbol>,
    pub reason: String,
}

/// A node where multiple call paths converge.
#[derive(Debug, Clone)]
pub struct MergePoint {
    pub symbol: Arc<Symbol>,
    pub converging_paths: usize,
}

/// An external node observed during a traversal.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExternalNode {
    pub node_id: String,
    pub name: String,
    pub package: String,
    pub depth: u32,
}

/// Names that mark a symbol as a program entry point.
const ENTRY_POINT_NAMES: &[&str] = &["main", "init"];

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

fn in_scope(symbol: &Symbol, scope: &str) -> bool {
    symbol.package.contains(scope) || symbol.file_path.contains(scope)
}

/// Hotspots: score = in-degree + out-degree, with a small boost per
/// incoming reference edge. Sorted (score desc, id asc).
pub(crate) fn hotspots(
    graph: &CodeGraph,
    opts: &HotspotOptions,
    cancel: &CancelToken,
) -> Result<Vec<Hotspot>> {
    let mut found = Vec::new();
    for idx in graph.node_indices() {
        cancel.check()?;
        let symbol = graph.symbol_at(idx);
        if is_dunder(&symbol.name) {
            continue;
        }
        if opts.exclude_tests && classify::is_test_file(&symbol.file_path) {
            continue;
        }
        if let Some(scope) = &opts.package_scope
            && !in_scope(symbol, scope)
        {
            continue;
        }
        let in_degree = graph.incoming_edges(idx).len();
        let out_degree = graph.outgoing_edges(idx).len();
        if in_degree + out_degree == 0 {
            continue;
        }
        let reference_boost = graph
            .incoming_edges(idx)
            .iter()
            .filter(|&&edge_idx| graph.edge_data(edge_idx).kind == EdgeKind::References)
            .count() as f64
            * 0.5;
        found.push(Hotspot {
            symbol: symbol.clone(),
            score: (in_degree + out_degree) as f64 + reference_boost,
            in_degree,
            out_degree,
        });
    }
    found.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol.id.cmp(&b.symbol.id))
    });
    found.truncate(opts.top);
    Ok(found)
}

/// Dead code: no incoming edges and not an entry point. Exported symbols
/// are externally reachable, so the default view hides them.
pub(crate) fn dead_code(
    graph: &CodeGraph,
    opts: &DeadCodeOptions,
    cancel: &CancelToken,
) -> Result<Vec<DeadSymbol>> {
    let mut found = Vec::new();
    for idx in graph.node_indices() {
        cancel.check()?;
        let symbol = graph.symbol_at(idx);
        if symbol.is_external() {
            continue;
        }
        if !graph.incoming_edges(idx).is_empty() {
            continue;
        }
        if ENTRY_POINT_NAMES.contains(&symbol.name.as_str()) {
            continue;
        }
        if symbol.exported && !opts.include_exported {
            continue;
        }
        let reason = if symbol.exported {
            "no incoming edges (exported; may be called externally)".to_string()
        } else {
            "no incoming edges".to_string()
        };
        found.push(DeadSymbol {
            symbol: symbol.clone(),
            reason,
        });
    }
    found.sort_by(|a, b| a.symbol.id.cmp(&b.symbol.id));
    found.truncate(opts.limit);
    Ok(found)
}

/// Merge points: call in-degree at or above `min_sources`, ordered by
/// converging-path count descending.
pub(crate) fn merge_points(
    graph: &CodeGraph,
    min_sources: usize,
    limit: usize,
    cancel: &CancelToken,
) -> Result<Vec<MergePoint>> {
    let mut found = Vec::new();
    for idx in graph.node_indices() {
        cancel.check()?;
        let call_in = graph
            .incoming_edges(idx)
            .iter()
            .filter(|&&edge_idx| graph.edge_data(edge_idx).kind == EdgeKind::Calls)
            .count();
        if call_in >= min_sources {
            found.push(MergePoint {
                symbol: graph.symbol_at(idx).clone(),
                converging_paths: call_in,
            });
        }
    }
    found.sort_by(|a, b| {
        b.converging_paths
            .cmp(&a.converging_paths)
            .then_with(|| a.symbol.id.cmp(&b.symbol.id))
    });
    found.truncate(limit);
    Ok(found)
}

/// Identify External nodes in a traversal, with the depth they were
/// reached at. Classification happens at traversal time so the graph
/// itself stays language-agnostic.
pub(crate) fn classify_external(traversal: &CallTraversal) -> Vec<ExternalNode> {
    let depths = traversal.depth_map();
    traversal
        .visited
        .iter()
        .filter(|symbol| symbol.is_external())
        .map(|symbol| ExternalNode {
            node_id: symbol.id.clone(),
            name: symbol.name.clone(),
            package: symbol.package.clone(),
            depth: depths.get(&symbol.id).copied().unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, SymbolKind};

    fn node(id: &str, name: &str, exported: bool, file: &str) -> Symbol {
        Symbol {
            id: id.to_string(),
            name: name.to_string(),
            kind: SymbolKind::Function,
            file_path: file.to_string(),
            start_line: 1,
            end_line: 1,
            language: "go".to_string(),
            exported,
            ..Default::default()
        }
    }

    fn hub_graph() -> CodeGraph {
        // Three callers into `hub`, hub calls one helper.
        let mut graph = CodeGraph::new();
        graph.add_node(node("g:1:hub", "hub", true, "hub.go")).unwrap();
        graph.add_node(node("g:2:x", "x", false, "x.go")).unwrap();
        graph.add_node(node("g:3:y", "y", false, "y.go")).unwrap();
        graph.add_node(node("g:4:z", "z", false, "z.go")).unwrap();
        graph.add_node(node("g:5:leaf", "leaf", false, "leaf.go")).unwrap();
        for from in ["g:2:x", "g:3:y", "g:4:z"] {
            graph
                .add_edge(from, "g:1:hub", EdgeKind::Calls, Location::default())
                .unwrap();
        }
        graph
            .add_edge("g:1:hub", "g:5:leaf", EdgeKind::Calls, Location::default())
            .unwrap();
        graph.freeze();
        graph
    }

    #[test]
    fn hub_is_top_hotspot() {
        let graph = hub_graph();
        let spots = hotspots(&graph, &HotspotOptions::default(), &CancelToken::none()).unwrap();
        assert_eq!(spots[0].symbol.name, "hub");
        assert_eq!(spots[0].in_degree, 3);
        assert_eq!(spots[0].out_degree, 1);
    }

    #[test]
    fn hotspots_skip_dunder_and_tests() {
        let mut graph = CodeGraph::new();
        graph
            .add_node(node("g:1:__init__", "__init__", false, "app.py"))
            .unwrap();
        graph
            .add_node(node("t:1:helper", "helper", false, "tests/helper_test.go"))
            .unwrap();
        graph.add_node(node("g:2:user", "user", false, "app.py")).unwrap();
        graph
            .add_edge("g:2:user", "g:1:__init__", EdgeKind::Calls, Location::default())
            .unwrap();
        graph
            .add_edge("g:2:user", "t:1:helper", EdgeKind::Calls, Location::default())
            .unwrap();
        graph.freeze();

        let spots = hotspots(&graph, &HotspotOptions::default(), &CancelToken::none()).unwrap();
        assert!(spots.iter().all(|h| h.symbol.name == "user"));
    }

    #[test]
    fn package_scope_has_no_fallback() {
        let graph = hub_graph();
        let opts = HotspotOptions {
            package_scope: Some("no-such-package".to_string()),
            ..Default::default()
        };
        let spots = hotspots(&graph, &opts, &CancelToken::none()).unwrap();
        assert!(spots.is_empty());
    }

    #[test]
    fn dead_code_respects_export_filter() {
        let mut graph = CodeGraph::new();
        graph.add_node(node("g:1:funcD", "funcD", false, "d.go")).unwrap();
        graph.add_node(node("g:2:Route", "Route", true, "r.go")).unwrap();
        graph.add_node(node("g:3:main", "main", false, "main.go")).unwrap();
        graph.freeze();

        let default_view = dead_code(&graph, &DeadCodeOptions::default(), &CancelToken::none()).unwrap();
        let names: Vec<_> = default_view.iter().map(|d| d.symbol.name.as_str()).collect();
        assert!(names.contains(&"funcD"));
        assert!(!names.contains(&"Route"));
        assert!(!names.contains(&"main"));

        let opts = DeadCodeOptions {
            include_exported: true,
            ..Default::default()
        };
        let full_view = dead_code(&graph, &opts, &CancelToken::none()).unwrap();
        let names: Vec<_> = full_view.iter().map(|d| d.symbol.name.as_str()).collect();
        assert!(names.contains(&"funcD"));
        assert!(names.contains(&"Route"));
    }

    #[test]
    fn merge_points_order_by_convergence() {
        let graph = hub_graph();
        let points = merge_points(&graph, 2, 50, &CancelToken::none()).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].symbol.name, "hub");
        assert_eq!(points[0].converging_paths, 3);

        assert!(merge_points(&graph, 4, 50, &CancelToken::none())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn external_classification_reads_traversal() {
        let mut graph = CodeGraph::new();
        graph.add_node(node("g:1:main", "main", false, "main.go")).unwrap();
        graph
            .add_node(Symbol {
                id: "ext:gin.New".to_string(),
                name: "New".to_string(),
                kind: SymbolKind::External,
                package: "gin".to_string(),
                language: "go".to_string(),
                ..Default::default()
            })
            .unwrap();
        graph
            .add_edge("g:1:main", "ext:gin.New", EdgeKind::Calls, Location::default())
            .unwrap();
        graph.freeze();

        let traversal = graph
            .get_call_graph("g:1:main", 5, &CancelToken::none())
            .unwrap();
        let externals = classify_external(&traversal);
        assert_eq!(externals.len(), 1);
        assert_eq!(externals[0].package, "gin");
        assert_eq!(externals[0].depth, 1);
    }
}
