//! Strongly connected components and cycle enumeration.
//!
//! Tarjan's algorithm, iterative so deep call chains cannot overflow the
//! stack. Components are computed over Calls edges: a cycle here means a
//! set of functions that reach each other through calls, which is the
//! notion downstream consumers care about.

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::graph::CodeGraph;
use crate::types::{EdgeKind, Symbol};
use petgraph::stable_graph::NodeIndex;
use std::sync::Arc;

pub(crate) struct SccResult {
    /// Member node positions per component.
    pub components: Vec<Vec<usize>>,
}

/// A call cycle: an SCC of size >= 2, or a single self-calling node.
#[derive(Debug, Clone)]
pub struct Cycle {
    /// Members sorted by id.
    pub members: Vec<Arc<Symbol>>,
}

impl Cycle {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Calls-edge successor positions for every node.
fn call_adjacency(graph: &CodeGraph, cancel: &CancelToken) -> Result<Vec<Vec<usize>>> {
    let mut adjacency = vec![Vec::new(); graph.node_count()];
    for idx in graph.node_indices() {
        cancel.check()?;
        for &edge_idx in graph.outgoing_edges(idx) {
            if graph.edge_data(edge_idx).kind != EdgeKind::Calls {
                continue;
            }
            let (_, target) = graph.edge_endpoints(edge_idx);
            adjacency[idx.index()].push(target.index());
        }
    }
    Ok(adjacency)
}

/// Iterative Tarjan SCC.
pub(crate) fn compute(graph: &CodeGraph, cancel: &CancelToken) -> Result<SccResult> {
    let n = graph.node_count();
    let adjacency = call_adjacency(graph, cancel)?;

    let mut index = vec![usize::MAX; n];
    let mut lowlink = vec![usize::MAX; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut counter = 0usize;

    // Explicit DFS frames: (node, next child offset).
    let mut frames: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root] != usize::MAX {
            continue;
        }
        frames.push((root, 0));
        index[root] = counter;
        lowlink[root] = counter;
        counter += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(&mut (node, ref mut child_offset)) = frames.last_mut() {
            cancel.check()?;
            if *child_offset < adjacency[node].len() {
                let child = adjacency[node][*child_offset];
                *child_offset += 1;
                if index[child] == usize::MAX {
                    index[child] = counter;
                    lowlink[child] = counter;
                    counter += 1;
                    stack.push(child);
                    on_stack[child] = true;
                    frames.push((child, 0));
                } else if on_stack[child] {
                    lowlink[node] = lowlink[node].min(index[child]);
                }
            } else {
                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[node]);
                }
                if lowlink[node] == index[node] {
                    let mut component = Vec::new();
                    loop {
                        let member = stack.pop().expect("tarjan stack underflow");
                        on_stack[member] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
    }

    Ok(SccResult { components })
}

/// Enumerate cycles of at least `min_size` members, ordered by size
/// descending then lowest member id ascending.
pub(crate) fn cycles(
    graph: &CodeGraph,
    sccs: &SccResult,
    min_size: usize,
    cancel: &CancelToken,
) -> Result<Vec<Cycle>> {
    let indices: Vec<NodeIndex> = graph.node_indices().collect();
    let mut found = Vec::new();

    for component in &sccs.components {
        cancel.check()?;
        let is_cycle = if component.len() >= 2 {
            true
        } else {
            // Single node: only a cycle when it calls itself.
            let position = component[0];
            let idx = indices[position];
            graph.outgoing_edges(idx).iter().any(|&edge_idx| {
                let data = graph.edge_data(edge_idx);
                if data.kind != EdgeKind::Calls {
                    return false;
                }
                let (_, target) = graph.edge_endpoints(edge_idx);
                target.index() == position
            })
        };
        if !is_cycle || component.len() < min_size {
            continue;
        }
        let mut members: Vec<Arc<Symbol>> = component
            .iter()
            .map(|&position| graph.symbol_at(indices[position]).clone())
            .collect();
        members.sort_by(|a, b| a.id.cmp(&b.id));
        found.push(Cycle { members });
    }

    found.sort_by(|a, b| {
        b.size()
            .cmp(&a.size())
            .then_with(|| a.members[0].id.cmp(&b.members[0].id))
    });
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, SymbolKind};

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

    fn cycles_of(graph: &CodeGraph, min_size: usize) -> Vec<Cycle> {
        let sccs = compute(graph, &CancelToken::none()).unwrap();
        cycles(graph, &sccs, min_size, &CancelToken::none()).unwrap()
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let graph = build(&[("a", "b"), ("b", "c")], &["a", "b", "c"]);
        assert!(cycles_of(&graph, 1).is_empty());
    }

    #[test]
    fn finds_simple_cycle() {
        let graph = build(&[("a", "b"), ("b", "a"), ("b", "c")], &["a", "b", "c"]);
        let found = cycles_of(&graph, 2);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].size(), 2);
        let names: Vec<_> = found[0].members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn self_loop_is_size_one_cycle() {
        let graph = build(&[("a", "a")], &["a", "b"]);
        let found = cycles_of(&graph, 1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].size(), 1);

        // Filtered out once min_size exceeds it.
        assert!(cycles_of(&graph, 2).is_empty());
    }

    #[test]
    fn larger_cycles_order_first() {
        let graph = build(
            &[
                ("a", "b"),
                ("b", "a"),
                ("x", "y"),
                ("y", "z"),
                ("z", "x"),
            ],
            &["a", "b", "x", "y", "z"],
        );
        let found = cycles_of(&graph, 2);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].size(), 3);
        assert_eq!(found[1].size(), 2);
    }

    #[test]
    fn every_scc_of_min_size_is_returned() {
        // Two disjoint two-cycles.
        let graph = build(
            &[("a", "b"), ("b", "a"), ("c", "d"), ("d", "c")],
            &["a", "b", "c", "d"],
        );
        let found = cycles_of(&graph, 2);
        assert_eq!(found.len(), 2);
    }
}
