//! The code graph: symbols, typed edges, and the build/freeze lifecycle.
//!
//! A graph starts mutable (`add_node` / `add_edge`), is frozen exactly once,
//! and is queried concurrently afterwards. `freeze()` builds the derived
//! adjacency structures (per-node outgoing and incoming edge lists in
//! edge-insertion order) and weakly-connected-component labels; after that
//! the graph is immutable and readers need no locks.

mod query;

pub use query::TRAVERSAL_DEPTH_CAP;

use crate::error::{QueryError, Result};
use crate::types::{Edge, EdgeKind, Location, Symbol};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::IntoEdgeReferences;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::sync::Arc;

/// Payload stored on each graph edge.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub kind: EdgeKind,
    pub location: Location,
}

/// Aggregate counts for a frozen graph.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub call_edges: usize,
    pub components: usize,
    pub external_nodes: usize,
}

/// Directed multigraph of code symbols with a one-way freeze lifecycle.
pub struct CodeGraph {
    inner: StableDiGraph<Arc<Symbol>, EdgeData>,
    id_to_node: HashMap<String, NodeIndex>,
    name_to_nodes: HashMap<String, Vec<NodeIndex>>,
    frozen: bool,
    /// Built at freeze: per-node edge lists in edge-insertion order.
    outgoing: Vec<Vec<EdgeIndex>>,
    incoming: Vec<Vec<EdgeIndex>>,
    /// Built at freeze: weakly-connected-component label per node.
    components: Vec<u32>,
    component_count: usize,
}

impl std::fmt::Debug for CodeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeGraph")
            .field("nodes", &self.inner.node_count())
            .field("edges", &self.inner.edge_count())
            .field("frozen", &self.frozen)
            .finish()
    }
}

impl CodeGraph {
    pub fn new() -> Self {
        Self {
            inner: StableDiGraph::new(),
            id_to_node: HashMap::new(),
            name_to_nodes: HashMap::new(),
            frozen: false,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            components: Vec::new(),
            component_count: 0,
        }
    }

    // ========================================================================
    // Build Phase
    // ========================================================================

    /// Add a symbol node. Legal only before freeze; duplicate ids rejected.
    pub fn add_node(&mut self, symbol: Symbol) -> Result<()> {
        if self.frozen {
            return Err(QueryError::NotFrozen("add_node after freeze"));
        }
        if symbol.id.is_empty() {
            return Err(QueryError::InvalidArgument("symbol id is empty".into()));
        }
        if self.id_to_node.contains_key(&symbol.id) {
            return Err(QueryError::InvalidArgument(format!(
                "duplicate symbol id: {}",
                symbol.id
            )));
        }
        if symbol.end_line < symbol.start_line {
            return Err(QueryError::InvalidArgument(format!(
                "symbol {} has end_line < start_line",
                symbol.id
            )));
        }
        if symbol.language.is_empty() {
            return Err(QueryError::InvalidArgument(format!(
                "symbol {} has no language tag",
                symbol.id
            )));
        }
        let id = symbol.id.clone();
        let name = symbol.name.clone();
        let idx = self.inner.add_node(Arc::new(symbol));
        self.id_to_node.insert(id, idx);
        self.name_to_nodes.entry(name).or_default().push(idx);
        Ok(())
    }

    /// Add a typed edge. Legal only before freeze; both endpoints must exist.
    pub fn add_edge(
        &mut self,
        from_id: &str,
        to_id: &str,
        kind: EdgeKind,
        location: Location,
    ) -> Result<()> {
        if self.frozen {
            return Err(QueryError::NotFrozen("add_edge after freeze"));
        }
        let from = *self
            .id_to_node
            .get(from_id)
            .ok_or_else(|| QueryError::NodeNotFound(from_id.to_string()))?;
        let to = *self
            .id_to_node
            .get(to_id)
            .ok_or_else(|| QueryError::NodeNotFound(to_id.to_string()))?;
        self.inner.add_edge(from, to, EdgeData { kind, location });
        Ok(())
    }

    /// Transition to the immutable state. Idempotent: freezing a frozen
    /// graph is a no-op.
    pub fn freeze(&mut self) {
        if self.frozen {
            return;
        }
        let node_count = self.inner.node_count();
        let mut outgoing: Vec<Vec<EdgeIndex>> = vec![Vec::new(); node_count];
        let mut incoming: Vec<Vec<EdgeIndex>> = vec![Vec::new(); node_count];
        let mut union = UnionFind::<usize>::new(node_count);

        // Edge indices are dense and monotonically assigned, so iterating
        // them in order reproduces insertion order.
        for edge_idx in self.inner.edge_indices() {
            if let Some((from, to)) = self.inner.edge_endpoints(edge_idx) {
                outgoing[from.index()].push(edge_idx);
                incoming[to.index()].push(edge_idx);
                union.union(from.index(), to.index());
            }
        }

        let mut labels: HashMap<usize, u32> = HashMap::new();
        let mut components = vec![0u32; node_count];
        for node in 0..node_count {
            let root = union.find(node);
            let next = labels.len() as u32;
            let label = *labels.entry(root).or_insert(next);
            components[node] = label;
        }

        self.outgoing = outgoing;
        self.incoming = incoming;
        self.component_count = labels.len();
        self.components = components;
        self.frozen = true;
        tracing::debug!(
            nodes = node_count,
            edges = self.inner.edge_count(),
            components = self.component_count,
            "graph frozen"
        );
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn ensure_frozen(&self, op: &'static str) -> Result<()> {
        if self.frozen {
            Ok(())
        } else {
            Err(QueryError::NotFrozen(op))
        }
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Get a node's symbol by id.
    pub fn get_node(&self, id: &str) -> Option<Arc<Symbol>> {
        self.id_to_node
            .get(id)
            .and_then(|idx| self.inner.node_weight(*idx))
            .cloned()
    }

    /// All symbols sharing a bare name, in insertion order.
    pub fn get_nodes_by_name(&self, name: &str) -> Vec<Arc<Symbol>> {
        self.name_to_nodes
            .get(name)
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|idx| self.inner.node_weight(*idx))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Component label of a node, defined after freeze.
    pub fn component_of(&self, id: &str) -> Option<u32> {
        if !self.frozen {
            return None;
        }
        self.id_to_node
            .get(id)
            .map(|idx| self.components[idx.index()])
    }

    pub fn component_count(&self) -> usize {
        self.component_count
    }

    /// Iterate all symbols in insertion order.
    pub fn all_symbols(&self) -> impl Iterator<Item = &Arc<Symbol>> {
        self.inner
            .node_indices()
            .filter_map(|idx| self.inner.node_weight(idx))
    }

    /// Iterate all edges as value records.
    pub fn all_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.inner.edge_references().map(|edge| {
            let from = self.inner[edge.source()].id.clone();
            let to = self.inner[edge.target()].id.clone();
            Edge {
                from_id: from,
                to_id: to,
                kind: edge.weight().kind,
                location: edge.weight().location.clone(),
            }
        })
    }

    pub fn stats(&self) -> GraphStats {
        let call_edges = self
            .inner
            .edge_references()
            .filter(|e| e.weight().kind == EdgeKind::Calls)
            .count();
        let external_nodes = self.all_symbols().filter(|s| s.is_external()).count();
        GraphStats {
            nodes: self.inner.node_count(),
            edges: self.inner.edge_count(),
            call_edges,
            components: self.component_count,
            external_nodes,
        }
    }

    // ========================================================================
    // Internal accessors shared with the query and analytics layers
    // ========================================================================

    pub(crate) fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.id_to_node.get(id).copied()
    }

    pub(crate) fn symbol_at(&self, idx: NodeIndex) -> &Arc<Symbol> {
        &self.inner[idx]
    }

    pub(crate) fn edge_data(&self, idx: EdgeIndex) -> &EdgeData {
        &self.inner[idx]
    }

    pub(crate) fn edge_endpoints(&self, idx: EdgeIndex) -> (NodeIndex, NodeIndex) {
        self.inner
            .edge_endpoints(idx)
            .expect("edge index valid in frozen graph")
    }

    /// Outgoing edges of a node in insertion order. Frozen graphs only.
    pub(crate) fn outgoing_edges(&self, idx: NodeIndex) -> &[EdgeIndex] {
        &self.outgoing[idx.index()]
    }

    /// Incoming edges of a node in insertion order. Frozen graphs only.
    pub(crate) fn incoming_edges(&self, idx: NodeIndex) -> &[EdgeIndex] {
        &self.incoming[idx.index()]
    }

    pub(crate) fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.inner.node_indices()
    }
}

impl Default for CodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SymbolKind;

    fn sym(id: &str, name: &str) -> Symbol {
        Symbol {
            id: id.to_string(),
            name: name.to_string(),
            kind: SymbolKind::Function,
            file_path: format!("{name}.go"),
            start_line: 1,
            end_line: 10,
            language: "go".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut graph = CodeGraph::new();
        graph.add_node(sym("f.go:1:a", "a")).unwrap();
        let err = graph.add_node(sym("f.go:1:a", "a")).unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[test]
    fn edges_require_both_endpoints() {
        let mut graph = CodeGraph::new();
        graph.add_node(sym("f.go:1:a", "a")).unwrap();
        let err = graph
            .add_edge("f.go:1:a", "missing", EdgeKind::Calls, Location::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::NodeNotFound(_)));
    }

    #[test]
    fn freeze_is_one_way_and_idempotent() {
        let mut graph = CodeGraph::new();
        graph.add_node(sym("f.go:1:a", "a")).unwrap();
        graph.freeze();
        assert!(graph.is_frozen());
        graph.freeze();
        assert!(graph.is_frozen());

        let err = graph.add_node(sym("f.go:2:b", "b")).unwrap_err();
        assert!(matches!(err, QueryError::NotFrozen(_)));
    }

    #[test]
    fn components_label_weakly_connected_nodes() {
        let mut graph = CodeGraph::new();
        graph.add_node(sym("f.go:1:a", "a")).unwrap();
        graph.add_node(sym("f.go:2:b", "b")).unwrap();
        graph.add_node(sym("f.go:3:c", "c")).unwrap();
        graph
            .add_edge("f.go:1:a", "f.go:2:b", EdgeKind::Calls, Location::default())
            .unwrap();
        graph.freeze();

        assert_eq!(graph.component_count(), 2);
        assert_eq!(
            graph.component_of("f.go:1:a"),
            graph.component_of("f.go:2:b")
        );
        assert_ne!(
            graph.component_of("f.go:1:a"),
            graph.component_of("f.go:3:c")
        );
    }

    #[test]
    fn name_lookup_returns_all_homonyms() {
        let mut graph = CodeGraph::new();
        graph.add_node(sym("a.go:1:run", "run")).unwrap();
        graph.add_node(sym("b.go:1:run", "run")).unwrap();
        graph.freeze();
        assert_eq!(graph.get_nodes_by_name("run").len(), 2);
        assert!(graph.get_nodes_by_name("absent").is_empty());
    }
}
