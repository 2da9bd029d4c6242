//! Primitive queries over a frozen graph.
//!
//! All queries fail with `NotFrozen` on a mutable graph, `NodeNotFound`
//! when the start id is absent, and `Cancelled` when the caller's handle
//! fires. Result ordering is deterministic: neighbours are visited in
//! edge-insertion order.

use super::CodeGraph;
use crate::cancel::CancelToken;
use crate::error::{QueryError, Result};
use crate::types::{
    CallTraversal, CallersWithInheritance, EdgeKind, PathResult, RelatedSymbol, TraversalEdge,
};
use petgraph::stable_graph::NodeIndex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Hard cap on traversal depth, applied after clamping user input.
pub const TRAVERSAL_DEPTH_CAP: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Downstream,
    Upstream,
}

impl CodeGraph {
    fn resolve_start(&self, id: &str, op: &'static str) -> Result<NodeIndex> {
        self.ensure_frozen(op)?;
        self.node_index(id)
            .ok_or_else(|| QueryError::NodeNotFound(id.to_string()))
    }

    // ========================================================================
    // Direct Neighbours
    // ========================================================================

    /// Outgoing Calls edges from a node.
    pub fn find_callees_by_id(
        &self,
        id: &str,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<RelatedSymbol>> {
        let node = self.resolve_start(id, "find_callees_by_id")?;
        cancel.check()?;
        let mut results = Vec::new();
        for &edge_idx in self.outgoing_edges(node) {
            cancel.check()?;
            if results.len() >= limit {
                break;
            }
            let data = self.edge_data(edge_idx);
            if data.kind != EdgeKind::Calls {
                continue;
            }
            let (_, target) = self.edge_endpoints(edge_idx);
            results.push(RelatedSymbol {
                symbol: self.symbol_at(target).clone(),
                location: data.location.clone(),
                edge_kind: data.kind,
            });
        }
        Ok(results)
    }

    /// Incoming Calls edges to a node.
    pub fn find_callers_by_id(
        &self,
        id: &str,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<RelatedSymbol>> {
        let node = self.resolve_start(id, "find_callers_by_id")?;
        cancel.check()?;
        let mut results = Vec::new();
        for &edge_idx in self.incoming_edges(node) {
            cancel.check()?;
            if results.len() >= limit {
                break;
            }
            let data = self.edge_data(edge_idx);
            if data.kind != EdgeKind::Calls {
                continue;
            }
            let (source, _) = self.edge_endpoints(edge_idx);
            results.push(RelatedSymbol {
                symbol: self.symbol_at(source).clone(),
                location: data.location.clone(),
                edge_kind: data.kind,
            });
        }
        Ok(results)
    }

    /// Direct callers plus callers of each provided parent-method id.
    ///
    /// The upstream walk through an inheritance chain surfaces callers that
    /// reach the method through a parent class; results stay partitioned so
    /// the tool layer can label them per parent.
    pub fn find_callers_with_inheritance(
        &self,
        id: &str,
        parent_method_ids: &[String],
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<CallersWithInheritance> {
        let mut result = CallersWithInheritance {
            direct: self.find_callers_by_id(id, limit, cancel)?,
            ..Default::default()
        };
        for parent_id in parent_method_ids {
            cancel.check()?;
            if parent_id == id {
                continue;
            }
            match self.find_callers_by_id(parent_id, limit, cancel) {
                Ok(callers) if !callers.is_empty() => {
                    result.inherited.insert(parent_id.clone(), callers);
                }
                Ok(_) => {}
                Err(QueryError::NodeNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(result)
    }

    /// Incoming Implements or Embeds edges, de-duplicated by source id.
    ///
    /// Class-extends and struct-embedding serve the same subtype role, so
    /// both edge kinds count; a source with both edges appears once.
    pub fn find_implementations_by_id(
        &self,
        id: &str,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<RelatedSymbol>> {
        let node = self.resolve_start(id, "find_implementations_by_id")?;
        cancel.check()?;
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for &edge_idx in self.incoming_edges(node) {
            cancel.check()?;
            if results.len() >= limit {
                break;
            }
            let data = self.edge_data(edge_idx);
            if !matches!(data.kind, EdgeKind::Implements | EdgeKind::Embeds) {
                continue;
            }
            let (source, _) = self.edge_endpoints(edge_idx);
            let symbol = self.symbol_at(source);
            if !seen.insert(symbol.id.clone()) {
                continue;
            }
            results.push(RelatedSymbol {
                symbol: symbol.clone(),
                location: data.location.clone(),
                edge_kind: data.kind,
            });
        }
        Ok(results)
    }

    /// Incoming edges of any kind, de-duplicated by `(file, line)`.
    pub fn find_references_by_id(
        &self,
        id: &str,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<RelatedSymbol>> {
        let node = self.resolve_start(id, "find_references_by_id")?;
        cancel.check()?;
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for &edge_idx in self.incoming_edges(node) {
            cancel.check()?;
            if results.len() >= limit {
                break;
            }
            let data = self.edge_data(edge_idx);
            let site = (data.location.file.clone(), data.location.line);
            if !seen.insert(site) {
                continue;
            }
            let (source, _) = self.edge_endpoints(edge_idx);
            results.push(RelatedSymbol {
                symbol: self.symbol_at(source).clone(),
                location: data.location.clone(),
                edge_kind: data.kind,
            });
        }
        Ok(results)
    }

    // ========================================================================
    // Traversals
    // ========================================================================

    /// Bounded BFS downstream over Calls edges.
    pub fn get_call_graph(
        &self,
        start_id: &str,
        max_depth: u32,
        cancel: &CancelToken,
    ) -> Result<CallTraversal> {
        self.bounded_bfs(start_id, max_depth, EdgeKind::Calls, Direction::Downstream, cancel)
    }

    /// Bounded BFS upstream over Calls edges.
    pub fn get_reverse_call_graph(
        &self,
        start_id: &str,
        max_depth: u32,
        cancel: &CancelToken,
    ) -> Result<CallTraversal> {
        self.bounded_bfs(start_id, max_depth, EdgeKind::Calls, Direction::Upstream, cancel)
    }

    /// Bounded BFS downstream over ControlDepends edges.
    pub fn get_control_dependencies(
        &self,
        start_id: &str,
        max_depth: u32,
        cancel: &CancelToken,
    ) -> Result<CallTraversal> {
        self.bounded_bfs(
            start_id,
            max_depth,
            EdgeKind::ControlDepends,
            Direction::Downstream,
            cancel,
        )
    }

    fn bounded_bfs(
        &self,
        start_id: &str,
        max_depth: u32,
        kind: EdgeKind,
        direction: Direction,
        cancel: &CancelToken,
    ) -> Result<CallTraversal> {
        let start = self.resolve_start(start_id, "bounded_bfs")?;
        cancel.check()?;
        let cap = max_depth.min(TRAVERSAL_DEPTH_CAP);

        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut order: Vec<NodeIndex> = Vec::new();
        let mut edges: Vec<TraversalEdge> = Vec::new();
        let mut queue: VecDeque<(NodeIndex, u32)> = VecDeque::new();
        let mut reached_depth = 0;
        let mut truncated = false;

        visited.insert(start);
        order.push(start);
        queue.push_back((start, 0));

        while let Some((node, depth)) = queue.pop_front() {
            cancel.check()?;
            let edge_list = match direction {
                Direction::Downstream => self.outgoing_edges(node),
                Direction::Upstream => self.incoming_edges(node),
            };
            for &edge_idx in edge_list {
                cancel.check()?;
                let data = self.edge_data(edge_idx);
                if data.kind != kind {
                    continue;
                }
                let (source, target) = self.edge_endpoints(edge_idx);
                let next = match direction {
                    Direction::Downstream => target,
                    Direction::Upstream => source,
                };
                if visited.contains(&next) {
                    continue;
                }
                if depth >= cap {
                    truncated = true;
                    continue;
                }
                visited.insert(next);
                order.push(next);
                reached_depth = reached_depth.max(depth + 1);
                edges.push(TraversalEdge {
                    from_id: self.symbol_at(node).id.clone(),
                    to_id: self.symbol_at(next).id.clone(),
                    depth: depth + 1,
                    location: data.location.clone(),
                });
                queue.push_back((next, depth + 1));
            }
        }

        Ok(CallTraversal {
            start: self.symbol_at(start).clone(),
            visited: order.iter().map(|&idx| self.symbol_at(idx).clone()).collect(),
            edges,
            depth: reached_depth,
            truncated,
        })
    }

    /// BFS shortest path over Calls edges.
    pub fn find_path(&self, from_id: &str, to_id: &str, cancel: &CancelToken) -> Result<PathResult> {
        let from = self.resolve_start(from_id, "find_path")?;
        cancel.check()?;
        let to = self
            .node_index(to_id)
            .ok_or_else(|| QueryError::NodeNotFound(to_id.to_string()))?;

        if from == to {
            return Ok(PathResult {
                found: true,
                path: vec![self.symbol_at(from).clone()],
                length: 0,
            });
        }

        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(from);
        parent.insert(from, from);

        while let Some(node) = queue.pop_front() {
            cancel.check()?;
            for &edge_idx in self.outgoing_edges(node) {
                cancel.check()?;
                if self.edge_data(edge_idx).kind != EdgeKind::Calls {
                    continue;
                }
                let (_, target) = self.edge_endpoints(edge_idx);
                if parent.contains_key(&target) {
                    continue;
                }
                parent.insert(target, node);
                if target == to {
                    let mut path = Vec::new();
                    let mut current = to;
                    loop {
                        path.push(self.symbol_at(current).clone());
                        if current == from {
                            break;
                        }
                        current = parent[&current];
                    }
                    path.reverse();
                    let length = (path.len() - 1) as u32;
                    return Ok(PathResult {
                        found: true,
                        path,
                        length,
                    });
                }
                queue.push_back(target);
            }
        }

        Ok(PathResult {
            found: false,
            path: Vec::new(),
            length: 0,
        })
    }

    // ========================================================================
    // Name Fallbacks (index-less operation, O(V) scan)
    // ========================================================================

    /// Callers of every node carrying `name`.
    pub fn find_callers_by_name(
        &self,
        name: &str,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<RelatedSymbol>> {
        self.ensure_frozen("find_callers_by_name")?;
        let mut results = Vec::new();
        for target in self.scan_by_name(name, cancel)? {
            let remaining = limit.saturating_sub(results.len());
            if remaining == 0 {
                break;
            }
            results.extend(self.find_callers_by_id(&target.id, remaining, cancel)?);
        }
        Ok(results)
    }

    /// Callees of every node carrying `name`.
    pub fn find_callees_by_name(
        &self,
        name: &str,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<RelatedSymbol>> {
        self.ensure_frozen("find_callees_by_name")?;
        let mut results = Vec::new();
        for source in self.scan_by_name(name, cancel)? {
            let remaining = limit.saturating_sub(results.len());
            if remaining == 0 {
                break;
            }
            results.extend(self.find_callees_by_id(&source.id, remaining, cancel)?);
        }
        Ok(results)
    }

    fn scan_by_name(&self, name: &str, cancel: &CancelToken) -> Result<Vec<Arc<crate::types::Symbol>>> {
        let mut matches = Vec::new();
        for idx in self.node_indices() {
            cancel.check()?;
            let symbol = self.symbol_at(idx);
            if symbol.name == name {
                matches.push(symbol.clone());
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, Symbol, SymbolKind};

    fn sym(id: &str, name: &str) -> Symbol {
        Symbol {
            id: id.to_string(),
            name: name.to_string(),
            kind: SymbolKind::Function,
            file_path: "main.go".to_string(),
            start_line: 1,
            end_line: 5,
            language: "go".to_string(),
            ..Default::default()
        }
    }

    fn diamond() -> CodeGraph {
        // main -> a -> d, main -> b, main -> c
        let mut graph = CodeGraph::new();
        for (id, name) in [
            ("m:1:main", "main"),
            ("m:10:a", "a"),
            ("m:20:b", "b"),
            ("m:30:c", "c"),
            ("m:40:d", "d"),
        ] {
            graph.add_node(sym(id, name)).unwrap();
        }
        for (from, to) in [
            ("m:1:main", "m:10:a"),
            ("m:1:main", "m:20:b"),
            ("m:1:main", "m:30:c"),
            ("m:10:a", "m:40:d"),
        ] {
            graph
                .add_edge(from, to, EdgeKind::Calls, Location::new("main.go", 2, 1))
                .unwrap();
        }
        graph.freeze();
        graph
    }

    #[test]
    fn queries_require_frozen_graph() {
        let mut graph = CodeGraph::new();
        graph.add_node(sym("m:1:main", "main")).unwrap();
        let err = graph
            .find_callees_by_id("m:1:main", 10, &CancelToken::none())
            .unwrap_err();
        assert!(matches!(err, QueryError::NotFrozen(_)));
    }

    #[test]
    fn callees_in_insertion_order() {
        let graph = diamond();
        let callees = graph
            .find_callees_by_id("m:1:main", 10, &CancelToken::none())
            .unwrap();
        let names: Vec<_> = callees.iter().map(|c| c.symbol.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn bfs_visits_breadth_first_and_reports_depth() {
        let graph = diamond();
        let traversal = graph
            .get_call_graph("m:1:main", 5, &CancelToken::none())
            .unwrap();
        let names: Vec<_> = traversal.visited.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["main", "a", "b", "c", "d"]);
        assert_eq!(traversal.depth, 2);
        assert!(!traversal.truncated);

        let depths = traversal.depth_map();
        assert_eq!(depths["m:1:main"], 0);
        assert_eq!(depths["m:20:b"], 1);
        assert_eq!(depths["m:40:d"], 2);
    }

    #[test]
    fn bfs_truncates_at_depth_cap() {
        let graph = diamond();
        let traversal = graph
            .get_call_graph("m:1:main", 1, &CancelToken::none())
            .unwrap();
        assert!(traversal.truncated);
        assert_eq!(traversal.depth, 1);
        assert!(!traversal.visited.iter().any(|s| s.name == "d"));
    }

    #[test]
    fn reverse_bfs_finds_upstream() {
        let graph = diamond();
        let traversal = graph
            .get_reverse_call_graph("m:40:d", 5, &CancelToken::none())
            .unwrap();
        let names: Vec<_> = traversal.visited.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["d", "a", "main"]);
    }

    #[test]
    fn shortest_path_and_absent_path() {
        let graph = diamond();
        let path = graph
            .find_path("m:1:main", "m:40:d", &CancelToken::none())
            .unwrap();
        assert!(path.found);
        assert_eq!(path.length, 2);
        let names: Vec<_> = path.path.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["main", "a", "d"]);

        let none = graph
            .find_path("m:40:d", "m:1:main", &CancelToken::none())
            .unwrap();
        assert!(!none.found);
        assert!(none.path.is_empty());

        let trivial = graph
            .find_path("m:20:b", "m:20:b", &CancelToken::none())
            .unwrap();
        assert!(trivial.found);
        assert_eq!(trivial.length, 0);
    }

    #[test]
    fn implementations_merge_edge_kinds_and_dedup() {
        let mut graph = CodeGraph::new();
        let mut iface = sym("s.go:1:Serializer", "Serializer");
        iface.kind = SymbolKind::Interface;
        graph.add_node(iface).unwrap();
        let mut json = sym("s.go:10:JSONSerializer", "JSONSerializer");
        json.kind = SymbolKind::Struct;
        graph.add_node(json).unwrap();
        graph
            .add_edge(
                "s.go:10:JSONSerializer",
                "s.go:1:Serializer",
                EdgeKind::Implements,
                Location::new("s.go", 10, 1),
            )
            .unwrap();
        graph
            .add_edge(
                "s.go:10:JSONSerializer",
                "s.go:1:Serializer",
                EdgeKind::Embeds,
                Location::new("s.go", 11, 1),
            )
            .unwrap();
        graph.freeze();

        let impls = graph
            .find_implementations_by_id("s.go:1:Serializer", 10, &CancelToken::none())
            .unwrap();
        assert_eq!(impls.len(), 1);
    }

    #[test]
    fn references_dedup_by_site() {
        let mut graph = CodeGraph::new();
        graph.add_node(sym("m:1:target", "target")).unwrap();
        graph.add_node(sym("m:10:user", "user")).unwrap();
        let site = Location::new("main.go", 42, 3);
        graph
            .add_edge("m:10:user", "m:1:target", EdgeKind::Calls, site.clone())
            .unwrap();
        graph
            .add_edge("m:10:user", "m:1:target", EdgeKind::References, site)
            .unwrap();
        graph
            .add_edge(
                "m:10:user",
                "m:1:target",
                EdgeKind::References,
                Location::new("main.go", 50, 3),
            )
            .unwrap();
        graph.freeze();

        let refs = graph
            .find_references_by_id("m:1:target", 10, &CancelToken::none())
            .unwrap();
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn inheritance_callers_partitioned() {
        let mut graph = CodeGraph::new();
        graph.add_node(sym("m:1:Save", "Save")).unwrap();
        graph.add_node(sym("m:10:BaseSave", "Save")).unwrap();
        graph.add_node(sym("m:20:caller1", "caller1")).unwrap();
        graph.add_node(sym("m:30:caller2", "caller2")).unwrap();
        graph
            .add_edge("m:20:caller1", "m:1:Save", EdgeKind::Calls, Location::default())
            .unwrap();
        graph
            .add_edge("m:30:caller2", "m:10:BaseSave", EdgeKind::Calls, Location::default())
            .unwrap();
        graph.freeze();

        let callers = graph
            .find_callers_with_inheritance(
                "m:1:Save",
                &["m:10:BaseSave".to_string()],
                50,
                &CancelToken::none(),
            )
            .unwrap();
        assert_eq!(callers.direct.len(), 1);
        assert_eq!(callers.inherited.len(), 1);
        assert_eq!(callers.total(), 2);
    }

    #[test]
    fn cancellation_propagates() {
        let graph = diamond();
        let token = CancelToken::none();
        token.cancel();
        let err = graph.get_call_graph("m:1:main", 5, &token).unwrap_err();
        assert!(matches!(err, QueryError::Cancelled));
    }

    #[test]
    fn name_fallback_scans_without_index() {
        let graph = diamond();
        let callers = graph
            .find_callers_by_name("a", 10, &CancelToken::none())
            .unwrap();
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].symbol.name, "main");
    }
}
