//! Diff between two frozen graph snapshots.
//!
//! Ordering in all arrays is lexicographic by node id so the diff is
//! deterministic regardless of build order.

use crate::error::{QueryError, Result};
use crate::graph::CodeGraph;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Why a surviving node counts as modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    SignatureChanged,
    Moved,
    EdgesChanged,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModifiedNode {
    pub node_id: String,
    pub symbol_name: String,
    pub change_type: ChangeType,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffSummary {
    /// Changed nodes over base node count.
    pub change_ratio: f64,
    pub affected_files: usize,
    pub total_changes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDiff {
    pub base_snapshot_id: String,
    pub target_snapshot_id: String,
    pub nodes_added: Vec<String>,
    pub nodes_removed: Vec<String>,
    pub nodes_modified: Vec<ModifiedNode>,
    pub edges_added: usize,
    pub edges_removed: usize,
    pub summary: DiffSummary,
}

/// Multiset of (from, to, kind) edge keys.
fn edge_multiset(graph: &CodeGraph) -> BTreeMap<(String, String, &'static str), usize> {
    let mut edges = BTreeMap::new();
    for edge in graph.all_edges() {
        *edges
            .entry((edge.from_id, edge.to_id, edge.kind.as_str()))
            .or_insert(0) += 1;
    }
    edges
}

/// Per-node edge fingerprint for the edges_changed classification.
fn node_edge_sets(graph: &CodeGraph) -> BTreeMap<String, BTreeSet<(String, String, &'static str)>> {
    let mut by_node: BTreeMap<String, BTreeSet<(String, String, &'static str)>> = BTreeMap::new();
    for edge in graph.all_edges() {
        let key = (edge.from_id.clone(), edge.to_id.clone(), edge.kind.as_str());
        by_node.entry(edge.from_id.clone()).or_default().insert(key.clone());
        by_node.entry(edge.to_id).or_default().insert(key);
    }
    by_node
}

/// Compute the diff between two frozen graphs.
pub fn diff_graphs(
    base: &CodeGraph,
    target: &CodeGraph,
    base_snapshot_id: &str,
    target_snapshot_id: &str,
) -> Result<SnapshotDiff> {
    if !base.is_frozen() || !target.is_frozen() {
        return Err(QueryError::NotFrozen("diff_graphs"));
    }

    let base_ids: BTreeSet<String> = base.all_symbols().map(|s| s.id.clone()).collect();
    let target_ids: BTreeSet<String> = target.all_symbols().map(|s| s.id.clone()).collect();

    let nodes_added: Vec<String> = target_ids.difference(&base_ids).cloned().collect();
    let nodes_removed: Vec<String> = base_ids.difference(&target_ids).cloned().collect();

    let base_edges_by_node = node_edge_sets(base);
    let target_edges_by_node = node_edge_sets(target);
    let empty = BTreeSet::new();

    let mut nodes_modified = Vec::new();
    for id in base_ids.intersection(&target_ids) {
        let before = base.get_node(id).expect("id from base");
        let after = target.get_node(id).expect("id from target");

        let change_type = if before.signature != after.signature {
            Some(ChangeType::SignatureChanged)
        } else if before.file_path != after.file_path || before.start_line != after.start_line {
            Some(ChangeType::Moved)
        } else {
            let edges_before = base_edges_by_node.get(id).unwrap_or(&empty);
            let edges_after = target_edges_by_node.get(id).unwrap_or(&empty);
            if edges_before != edges_after {
                Some(ChangeType::EdgesChanged)
            } else {
                None
            }
        };

        if let Some(change_type) = change_type {
            nodes_modified.push(ModifiedNode {
                node_id: id.clone(),
                symbol_name: after.name.clone(),
                change_type,
            });
        }
    }

    let base_edges = edge_multiset(base);
    let target_edges = edge_multiset(target);
    let mut edges_added = 0usize;
    let mut edges_removed = 0usize;
    for (key, &count) in &target_edges {
        let before = base_edges.get(key).copied().unwrap_or(0);
        edges_added += count.saturating_sub(before);
    }
    for (key, &count) in &base_edges {
        let after = target_edges.get(key).copied().unwrap_or(0);
        edges_removed += count.saturating_sub(after);
    }

    let mut affected_files: HashSet<String> = HashSet::new();
    for id in nodes_added.iter().chain(nodes_removed.iter()) {
        let node = target.get_node(id).or_else(|| base.get_node(id));
        if let Some(node) = node
            && !node.file_path.is_empty()
        {
            affected_files.insert(node.file_path.clone());
        }
    }
    for modified in &nodes_modified {
        if let Some(node) = target.get_node(&modified.node_id)
            && !node.file_path.is_empty()
        {
            affected_files.insert(node.file_path.clone());
        }
    }

    let total_changes = nodes_added.len() + nodes_removed.len() + nodes_modified.len();
    let change_ratio = if base_ids.is_empty() {
        if total_changes == 0 { 0.0 } else { 1.0 }
    } else {
        total_changes as f64 / base_ids.len() as f64
    };

    Ok(SnapshotDiff {
        base_snapshot_id: base_snapshot_id.to_string(),
        target_snapshot_id: target_snapshot_id.to_string(),
        nodes_added,
        nodes_removed,
        nodes_modified,
        edges_added,
        edges_removed,
        summary: DiffSummary {
            change_ratio,
            affected_files: affected_files.len(),
            total_changes,
        },
    })
}
