//! Read-only analytics over a frozen graph.
//!
//! [`Analytics::wrap`] fails unless the graph is frozen; everything after
//! that is lock-free reads plus two memoized computations (PageRank and
//! SCC assignment). Memoization is compute-once under a mutex: concurrent
//! callers either observe the published result or compute it themselves,
//! and a cancelled computation leaves the cache empty rather than
//! partially populated.

mod connectivity;
mod diff;
mod pagerank;
mod scc;
mod structure;

pub use connectivity::{ArticulationReport, Bridge, FragilityLevel};
pub use diff::{ChangeType, DiffSummary, ModifiedNode, SnapshotDiff, diff_graphs};
pub use scc::Cycle;
pub use structure::{
    DeadCodeOptions, DeadSymbol, ExternalNode, Hotspot, HotspotOptions, MergePoint,
};

use crate::cancel::CancelToken;
use crate::error::{QueryError, Result};
use crate::graph::CodeGraph;
use crate::types::{CallTraversal, Symbol};
use parking_lot::Mutex;
use std::sync::Arc;

/// A node with its importance rank. Ranks are contiguous `1..=k` after
/// any filtering.
#[derive(Debug, Clone)]
pub struct RankedNode {
    pub rank: usize,
    pub symbol: Arc<Symbol>,
    pub score: f64,
    /// in-degree + out-degree, a cheap secondary signal.
    pub degree_score: usize,
}

pub(crate) struct PageRankScores {
    /// Indexed by node index; parallel to graph insertion order.
    pub scores: Vec<f64>,
}

/// Analytics facade wrapping a frozen [`CodeGraph`].
pub struct Analytics {
    graph: Arc<CodeGraph>,
    pagerank: Mutex<Option<Arc<PageRankScores>>>,
    sccs: Mutex<Option<Arc<scc::SccResult>>>,
}

impl Analytics {
    /// Wrap a graph. Fails with `NotFrozen` on a mutable graph.
    pub fn wrap(graph: Arc<CodeGraph>) -> Result<Self> {
        if !graph.is_frozen() {
            return Err(QueryError::NotFrozen("Analytics::wrap"));
        }
        Ok(Self {
            graph,
            pagerank: Mutex::new(None),
            sccs: Mutex::new(None),
        })
    }

    pub fn graph(&self) -> &Arc<CodeGraph> {
        &self.graph
    }

    /// Memoized PageRank scores. A cancelled computation publishes nothing.
    pub(crate) fn pagerank_scores(&self, cancel: &CancelToken) -> Result<Arc<PageRankScores>> {
        let mut cache = self.pagerank.lock();
        if let Some(scores) = cache.as_ref() {
            return Ok(scores.clone());
        }
        let scores = Arc::new(PageRankScores {
            scores: pagerank::compute(&self.graph, cancel)?,
        });
        *cache = Some(scores.clone());
        Ok(scores)
    }

    /// Memoized SCC assignment over Calls edges.
    pub(crate) fn scc_result(&self, cancel: &CancelToken) -> Result<Arc<scc::SccResult>> {
        let mut cache = self.sccs.lock();
        if let Some(result) = cache.as_ref() {
            return Ok(result.clone());
        }
        let result = Arc::new(scc::compute(&self.graph, cancel)?);
        *cache = Some(result.clone());
        Ok(result)
    }

    // ========================================================================
    // Importance
    // ========================================================================

    /// Top-n nodes by PageRank.
    pub fn pagerank_top(&self, n: usize, cancel: &CancelToken) -> Result<Vec<RankedNode>> {
        self.pagerank_ranked(n, false, |_| true, cancel)
    }

    /// Bottom-n nodes by PageRank ("least important").
    pub fn pagerank_bottom(&self, n: usize, cancel: &CancelToken) -> Result<Vec<RankedNode>> {
        self.pagerank_ranked(n, true, |_| true, cancel)
    }

    /// Top-n with a node filter. Ranks are re-assigned `1..=k` after the
    /// filter so output stays contiguous.
    pub fn pagerank_top_filtered(
        &self,
        n: usize,
        reverse: bool,
        filter: impl Fn(&Symbol) -> bool,
        cancel: &CancelToken,
    ) -> Result<Vec<RankedNode>> {
        self.pagerank_ranked(n, reverse, filter, cancel)
    }

    fn pagerank_ranked(
        &self,
        n: usize,
        reverse: bool,
        filter: impl Fn(&Symbol) -> bool,
        cancel: &CancelToken,
    ) -> Result<Vec<RankedNode>> {
        let scores = self.pagerank_scores(cancel)?;
        let mut ranked: Vec<RankedNode> = Vec::new();
        for (position, idx) in self.graph.node_indices().enumerate() {
            cancel.check()?;
            let symbol = self.graph.symbol_at(idx);
            if !filter(symbol) {
                continue;
            }
            let degree =
                self.graph.outgoing_edges(idx).len() + self.graph.incoming_edges(idx).len();
            ranked.push(RankedNode {
                rank: 0,
                symbol: symbol.clone(),
                score: scores.scores[position],
                degree_score: degree,
            });
        }
        ranked.sort_by(|a, b| {
            let ordering = b
                .score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.symbol.id.cmp(&b.symbol.id));
            if reverse { ordering.reverse() } else { ordering }
        });
        ranked.truncate(n);
        for (i, node) in ranked.iter_mut().enumerate() {
            node.rank = i + 1;
        }
        Ok(ranked)
    }

    // ========================================================================
    // Structure
    // ========================================================================

    pub fn hotspots(
        &self,
        opts: &HotspotOptions,
        cancel: &CancelToken,
    ) -> Result<Vec<Hotspot>> {
        structure::hotspots(&self.graph, opts, cancel)
    }

    pub fn dead_code(
        &self,
        opts: &DeadCodeOptions,
        cancel: &CancelToken,
    ) -> Result<Vec<DeadSymbol>> {
        structure::dead_code(&self.graph, opts, cancel)
    }

    pub fn merge_points(
        &self,
        min_sources: usize,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<MergePoint>> {
        structure::merge_points(&self.graph, min_sources, limit, cancel)
    }

    pub fn control_dependencies(
        &self,
        target_id: &str,
        max_depth: u32,
        cancel: &CancelToken,
    ) -> Result<CallTraversal> {
        self.graph.get_control_dependencies(target_id, max_depth, cancel)
    }

    /// External-node records for a traversal result.
    pub fn classify_external(&self, traversal: &CallTraversal) -> Vec<ExternalNode> {
        structure::classify_external(traversal)
    }

    // ========================================================================
    // Cycles and Connectivity
    // ========================================================================

    /// SCC-based cycles of at least `min_size` members.
    pub fn cycles(&self, min_size: usize, cancel: &CancelToken) -> Result<Vec<Cycle>> {
        let sccs = self.scc_result(cancel)?;
        scc::cycles(&self.graph, &sccs, min_size, cancel)
    }

    pub fn articulation_points(&self, cancel: &CancelToken) -> Result<ArticulationReport> {
        connectivity::analyze(&self.graph, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeKind, Location, SymbolKind};

    fn sym(id: &str, name: &str) -> Symbol {
        Symbol {
            id: id.to_string(),
            name: name.to_string(),
            kind: SymbolKind::Function,
            file_path: "app.go".to_string(),
            start_line: 1,
            end_line: 3,
            language: "go".to_string(),
            ..Default::default()
        }
    }

    fn chain() -> Arc<CodeGraph> {
        let mut graph = CodeGraph::new();
        for (id, name) in [("g:1:a", "a"), ("g:2:b", "b"), ("g:3:c", "c")] {
            graph.add_node(sym(id, name)).unwrap();
        }
        graph
            .add_edge("g:1:a", "g:2:b", EdgeKind::Calls, Location::default())
            .unwrap();
        graph
            .add_edge("g:2:b", "g:3:c", EdgeKind::Calls, Location::default())
            .unwrap();
        graph.freeze();
        Arc::new(graph)
    }

    #[test]
    fn wrap_requires_frozen() {
        let graph = Arc::new(CodeGraph::new());
        assert!(matches!(
            Analytics::wrap(graph),
            Err(QueryError::NotFrozen(_))
        ));
    }

    #[test]
    fn ranks_are_contiguous() {
        let analytics = Analytics::wrap(chain()).unwrap();
        let top = analytics.pagerank_top(10, &CancelToken::none()).unwrap();
        let ranks: Vec<_> = top.iter().map(|n| n.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn sink_outranks_source() {
        let analytics = Analytics::wrap(chain()).unwrap();
        let top = analytics.pagerank_top(10, &CancelToken::none()).unwrap();
        // c receives transitive importance from a -> b -> c.
        assert_eq!(top[0].symbol.name, "c");
        assert_eq!(top.last().unwrap().symbol.name, "a");
    }

    #[test]
    fn filtered_ranks_stay_contiguous() {
        let analytics = Analytics::wrap(chain()).unwrap();
        let filtered = analytics
            .pagerank_top_filtered(10, false, |s| s.name != "b", &CancelToken::none())
            .unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].rank, 1);
        assert_eq!(filtered[1].rank, 2);
    }

    #[test]
    fn cancelled_compute_leaves_cache_empty() {
        let analytics = Analytics::wrap(chain()).unwrap();
        let token = CancelToken::none();
        token.cancel();
        assert!(analytics.pagerank_top(10, &token).is_err());
        assert!(analytics.pagerank.lock().is_none());

        // A later call with a live token succeeds and populates the cache.
        assert!(analytics.pagerank_top(10, &CancelToken::none()).is_ok());
        assert!(analytics.pagerank.lock().is_some());
    }

    #[test]
    fn reverse_ranking_flips_order() {
        let analytics = Analytics::wrap(chain()).unwrap();
        let bottom = analytics.pagerank_bottom(1, &CancelToken::none()).unwrap();
        assert_eq!(bottom[0].symbol.name, "a");
        assert_eq!(bottom[0].rank, 1);
    }
}
