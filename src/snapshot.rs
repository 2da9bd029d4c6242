//! Snapshot persistence: the interface between the external parser or
//! serializer and the engine.
//!
//! A snapshot is an opaque binary record of all symbols and edges. The
//! engine never re-parses source; it rebuilds a frozen graph and index
//! from a snapshot and serves queries from there.

use crate::error::{QueryError, Result as EngineResult};
use crate::graph::CodeGraph;
use crate::index::SymbolIndex;
use crate::types::{Edge, Symbol};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub snapshot_id: String,
    pub symbols: Vec<Symbol>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Capture a value-level record of a graph.
    pub fn capture(graph: &CodeGraph, snapshot_id: impl Into<String>) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            symbols: graph.all_symbols().map(|s| (**s).clone()).collect(),
            edges: graph.all_edges().collect(),
        }
    }

    /// Rebuild a frozen graph and index from this snapshot.
    ///
    /// Index rejections (externals, malformed records) are logged and
    /// skipped; the graph still carries the node so traversals see it.
    pub fn rebuild(&self) -> EngineResult<(Arc<CodeGraph>, Arc<SymbolIndex>)> {
        let mut graph = CodeGraph::new();
        let index = SymbolIndex::new();

        for symbol in &self.symbols {
            graph.add_node(symbol.clone())?;
        }
        for edge in &self.edges {
            graph.add_edge(&edge.from_id, &edge.to_id, edge.kind, edge.location.clone())?;
        }
        graph.freeze();

        for symbol in graph.all_symbols() {
            if let Err(rejection) = index.add(symbol.clone()) {
                if !symbol.is_external() {
                    tracing::warn!(id = %symbol.id, %rejection, "symbol not indexed");
                }
            }
        }

        Ok((Arc::new(graph), Arc::new(index)))
    }
}

pub fn load_snapshot(path: &Path) -> Result<GraphSnapshot> {
    let data = fs::read(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let snapshot: GraphSnapshot = bincode::deserialize(&data)
        .with_context(|| format!("Failed to decode snapshot: {}", path.display()))?;
    Ok(snapshot)
}

pub fn save_snapshot(path: &Path, snapshot: &GraphSnapshot) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create snapshot dir: {}", parent.display()))?;
    }
    let data = bincode::serialize(snapshot)?;
    fs::write(path, data)
        .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
    Ok(())
}

/// Convenience wrapper for error taxonomy consumers: load + rebuild.
pub fn load_engine_inputs(path: &Path) -> EngineResult<(Arc<CodeGraph>, Arc<SymbolIndex>)> {
    let snapshot =
        load_snapshot(path).map_err(|e| QueryError::Snapshot(format!("{e:#}")))?;
    snapshot.rebuild()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeKind, Location, SymbolKind};

    fn sample_graph() -> CodeGraph {
        let mut graph = CodeGraph::new();
        graph
            .add_node(Symbol {
                id: "main.go:1:main".to_string(),
                name: "main".to_string(),
                kind: SymbolKind::Function,
                file_path: "main.go".to_string(),
                start_line: 1,
                end_line: 9,
                language: "go".to_string(),
                ..Default::default()
            })
            .unwrap();
        graph
            .add_node(Symbol {
                id: "util.go:4:helper".to_string(),
                name: "helper".to_string(),
                kind: SymbolKind::Function,
                file_path: "util.go".to_string(),
                start_line: 4,
                end_line: 12,
                language: "go".to_string(),
                ..Default::default()
            })
            .unwrap();
        graph
            .add_edge(
                "main.go:1:main",
                "util.go:4:helper",
                EdgeKind::Calls,
                Location::new("main.go", 3, 5),
            )
            .unwrap();
        graph.freeze();
        graph
    }

    #[test]
    fn snapshot_round_trip_preserves_graph() {
        let graph = sample_graph();
        let snapshot = GraphSnapshot::capture(&graph, "v1");

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("graph.bin");
        save_snapshot(&path, &snapshot).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.snapshot_id, "v1");
        assert_eq!(loaded.symbols.len(), 2);
        assert_eq!(loaded.edges.len(), 1);

        let (rebuilt, index) = loaded.rebuild().unwrap();
        assert!(rebuilt.is_frozen());
        assert_eq!(rebuilt.node_count(), 2);
        assert_eq!(rebuilt.edge_count(), 1);
        assert_eq!(index.len(), 2);
        assert!(rebuilt.get_node("main.go:1:main").is_some());
    }

    #[test]
    fn externals_stay_out_of_the_index() {
        let mut graph = CodeGraph::new();
        graph
            .add_node(Symbol {
                id: "app.py:1:run".to_string(),
                name: "run".to_string(),
                kind: SymbolKind::Function,
                file_path: "app.py".to_string(),
                start_line: 1,
                end_line: 2,
                language: "python".to_string(),
                ..Default::default()
            })
            .unwrap();
        graph
            .add_node(Symbol {
                id: "ext:flask.route".to_string(),
                name: "route".to_string(),
                kind: SymbolKind::External,
                package: "flask".to_string(),
                language: "python".to_string(),
                ..Default::default()
            })
            .unwrap();
        graph.freeze();

        let snapshot = GraphSnapshot::capture(&graph, "v1");
        let (rebuilt, index) = snapshot.rebuild().unwrap();
        assert_eq!(rebuilt.node_count(), 2);
        assert_eq!(index.len(), 1);
        assert!(index.get_by_id("ext:flask.route").is_none());
    }

    #[test]
    fn missing_snapshot_is_a_snapshot_error() {
        let err = load_engine_inputs(Path::new("/nonexistent/graph.bin")).unwrap_err();
        assert!(matches!(err, QueryError::Snapshot(_)));
    }
}
