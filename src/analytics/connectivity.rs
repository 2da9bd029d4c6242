//! Articulation points and bridges on the undirected view of the graph.
//!
//! A symbol whose removal disconnects the structure is a single point of
//! failure for comprehension and refactoring; the fragility score levels
//! how many of them the codebase carries.

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::graph::CodeGraph;
use crate::types::Symbol;
use petgraph::stable_graph::NodeIndex;
use std::sync::Arc;

/// Severity levels for the articulation-point ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FragilityLevel {
    Minimal,
    Low,
    Moderate,
    High,
}

impl FragilityLevel {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 0.05 {
            Self::Minimal
        } else if ratio < 0.10 {
            Self::Low
        } else if ratio < 0.20 {
            Self::Moderate
        } else {
            Self::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "MINIMAL",
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
        }
    }
}

/// An edge whose removal disconnects the undirected graph.
#[derive(Debug, Clone)]
pub struct Bridge {
    pub from: Arc<Symbol>,
    pub to: Arc<Symbol>,
}

#[derive(Debug, Clone)]
pub struct ArticulationReport {
    pub articulation_points: Vec<Arc<Symbol>>,
    pub bridges: Vec<Bridge>,
    /// |articulation points| / |nodes|.
    pub fragility: f64,
    pub level: FragilityLevel,
}

/// Tarjan articulation points and bridges, iterative.
pub(crate) fn analyze(graph: &CodeGraph, cancel: &CancelToken) -> Result<ArticulationReport> {
    let indices: Vec<NodeIndex> = graph.node_indices().collect();
    let n = indices.len();

    // Undirected multigraph adjacency: (neighbor position, edge id). The
    // edge id distinguishes parallel edges so they never count as bridges.
    let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
    for idx in &indices {
        cancel.check()?;
        for &edge_idx in graph.outgoing_edges(*idx) {
            let (source, target) = graph.edge_endpoints(edge_idx);
            if source == target {
                continue;
            }
            adjacency[source.index()].push((target.index(), edge_idx.index()));
            adjacency[target.index()].push((source.index(), edge_idx.index()));
        }
    }

    let mut disc = vec![usize::MAX; n];
    let mut low = vec![usize::MAX; n];
    let mut is_articulation = vec![false; n];
    let mut bridge_pairs: Vec<(usize, usize)> = Vec::new();
    let mut counter = 0usize;

    // Frames: (node, entry edge id, next neighbour offset).
    let mut frames: Vec<(usize, usize, usize)> = Vec::new();

    for root in 0..n {
        if disc[root] != usize::MAX {
            continue;
        }
        disc[root] = counter;
        low[root] = counter;
        counter += 1;
        frames.push((root, usize::MAX, 0));
        let mut root_children = 0usize;

        while let Some(&mut (node, entry_edge, ref mut offset)) = frames.last_mut() {
            cancel.check()?;
            if *offset < adjacency[node].len() {
                let (neighbor, via_edge) = adjacency[node][*offset];
                *offset += 1;
                if via_edge == entry_edge {
                    continue;
                }
                if disc[neighbor] == usize::MAX {
                    if node == root {
                        root_children += 1;
                    }
                    disc[neighbor] = counter;
                    low[neighbor] = counter;
                    counter += 1;
                    frames.push((neighbor, via_edge, 0));
                } else {
                    low[node] = low[node].min(disc[neighbor]);
                }
            } else {
                frames.pop();
                if let Some(&(parent, _, _)) = frames.last() {
                    low[parent] = low[parent].min(low[node]);
                    if low[node] >= disc[parent] && parent != root {
                        is_articulation[parent] = true;
                    }
                    if low[node] > disc[parent] {
                        bridge_pairs.push((parent, node));
                    }
                }
            }
        }

        if root_children >= 2 {
            is_articulation[root] = true;
        }
    }

    let mut articulation_points: Vec<Arc<Symbol>> = is_articulation
        .iter()
        .enumerate()
        .filter(|&(_, &flag)| flag)
        .map(|(position, _)| graph.symbol_at(indices[position]).clone())
        .collect();
    articulation_points.sort_by(|a, b| a.id.cmp(&b.id));

    let mut bridges: Vec<Bridge> = bridge_pairs
        .into_iter()
        .map(|(from, to)| Bridge {
            from: graph.symbol_at(indices[from]).clone(),
            to: graph.symbol_at(indices[to]).clone(),
        })
        .collect();
    bridges.sort_by(|a, b| a.from.id.cmp(&b.from.id).then_with(|| a.to.id.cmp(&b.to.id)));

    let fragility = if n == 0 {
        0.0
    } else {
        articulation_points.len() as f64 / n as f64
    };

    Ok(ArticulationReport {
        articulation_points,
        bridges,
        fragility,
        level: FragilityLevel::from_ratio(fragility),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeKind, Location, SymbolKind};

    fn build(edges: &[(&str, &str)], nodes: &[&str]) -> CodeGraph {
        let mut graph = CodeGraph::new();
        for name in nodes {
            graph
                .add_node(Symbol {
                    id: format!("f:{name}"),
                    name: name.to_string(),
                    kind: SymbolKind::Function,
                    file_path: "f.go".to_string(),
                    start_line: 1,
                    end_line: 1,
                    language: "go".to_string(),
                    ..Default::default()
                })
                .unwrap();
        }
        for (from, to) in edges {
            graph
                .add_edge(
                    &format!("f:{from}"),
                    &format!("f:{to}"),
                    EdgeKind::Calls,
                    Location::default(),
                )
                .unwrap();
        }
        graph.freeze();
        graph
    }

    #[test]
    fn chain_middle_is_articulation_point() {
        // a - b - c: removing b disconnects a from c, both edges are bridges.
        let graph = build(&[("a", "b"), ("b", "c")], &["a", "b", "c"]);
        let report = analyze(&graph, &CancelToken::none()).unwrap();
        let names: Vec<_> = report
            .articulation_points
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["b"]);
        assert_eq!(report.bridges.len(), 2);
    }

    #[test]
    fn cycle_has_no_articulation_points() {
        let graph = build(&[("a", "b"), ("b", "c"), ("c", "a")], &["a", "b", "c"]);
        let report = analyze(&graph, &CancelToken::none()).unwrap();
        assert!(report.articulation_points.is_empty());
        assert!(report.bridges.is_empty());
    }

    #[test]
    fn parallel_edges_are_not_bridges() {
        let mut graph = CodeGraph::new();
        for name in ["a", "b"] {
            graph
                .add_node(Symbol {
                    id: format!("f:{name}"),
                    name: name.to_string(),
                    kind: SymbolKind::Function,
                    file_path: "f.go".to_string(),
                    start_line: 1,
                    end_line: 1,
                    language: "go".to_string(),
                    ..Default::default()
                })
                .unwrap();
        }
        graph
            .add_edge("f:a", "f:b", EdgeKind::Calls, Location::default())
            .unwrap();
        graph
            .add_edge("f:a", "f:b", EdgeKind::References, Location::default())
            .unwrap();
        graph.freeze();

        let report = analyze(&graph, &CancelToken::none()).unwrap();
        assert!(report.bridges.is_empty());
    }

    #[test]
    fn fragility_levels() {
        assert_eq!(FragilityLevel::from_ratio(0.0).as_str(), "MINIMAL");
        assert_eq!(FragilityLevel::from_ratio(0.07).as_str(), "LOW");
        assert_eq!(FragilityLevel::from_ratio(0.15).as_str(), "MODERATE");
        assert_eq!(FragilityLevel::from_ratio(0.5).as_str(), "HIGH");
    }

    #[test]
    fn star_center_dominates_fragility() {
        let graph = build(
            &[("hub", "a"), ("hub", "b"), ("hub", "c"), ("hub", "d")],
            &["hub", "a", "b", "c", "d"],
        );
        let report = analyze(&graph, &CancelToken::none()).unwrap();
        assert_eq!(report.articulation_points.len(), 1);
        assert_eq!(report.articulation_points[0].name, "hub");
        assert!((report.fragility - 0.2).abs() < 1e-9);
        assert_eq!(report.level, FragilityLevel::High);
    }
}
