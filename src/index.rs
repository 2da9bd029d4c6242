//! Symbol index: O(1) lookups by id and name, plus fuzzy search.
//!
//! The index is an auxiliary structure next to the graph; both share the
//! same `Arc<Symbol>`s. Names and ids are interned so the lookup maps key
//! on small copyable handles. Thread-safe for concurrent readers.

use crate::classify;
use crate::types::{Symbol, SymbolKind};
use dashmap::DashMap;
use lasso::{Spur, ThreadedRodeo};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default deadline for fuzzy search.
pub const FUZZY_SEARCH_DEADLINE: Duration = Duration::from_secs(2);

/// Minimum similarity for a fuzzy candidate to be considered at all.
/// Jaro-Winkler scores garbage-vs-short-name pairs surprisingly high, so
/// the floor sits well above 0.5.
const FUZZY_SCORE_FLOOR: f64 = 0.7;

/// How often the fuzzy scan consults the deadline.
const DEADLINE_CHECK_INTERVAL: usize = 256;

/// Why a symbol was not admitted to the index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexRejection {
    /// External symbols (empty `file_path`) live only in the graph.
    #[error("symbol has no file path")]
    EmptyFilePath,
    #[error("symbol has no language tag")]
    EmptyLanguage,
    #[error("symbol end line precedes start line")]
    InvertedLineRange,
}

/// A fuzzy-search hit with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredSymbol {
    pub symbol: Arc<Symbol>,
    pub score: f64,
}

/// Aggregate counts over the indexed symbols.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexStats {
    pub total_symbols: usize,
    pub callable_symbols: usize,
    pub type_symbols: usize,
    pub files: usize,
    pub test_file_symbols: usize,
}

/// Concurrent symbol lookup structure.
#[derive(Debug)]
pub struct SymbolIndex {
    interner: ThreadedRodeo,
    by_id: DashMap<Spur, Arc<Symbol>>,
    by_name: DashMap<Spur, Vec<Arc<Symbol>>>,
    /// Insertion-ordered view for deterministic scans (fuzzy search).
    ordered: RwLock<Vec<Arc<Symbol>>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self {
            interner: ThreadedRodeo::default(),
            by_id: DashMap::new(),
            by_name: DashMap::new(),
            ordered: RwLock::new(Vec::new()),
        }
    }

    /// Add a symbol. Rejects symbols that cannot be addressed: empty file
    /// path (externals), empty language, inverted line range.
    pub fn add(&self, symbol: Arc<Symbol>) -> Result<(), IndexRejection> {
        if symbol.file_path.is_empty() {
            return Err(IndexRejection::EmptyFilePath);
        }
        if symbol.language.is_empty() {
            return Err(IndexRejection::EmptyLanguage);
        }
        if symbol.end_line < symbol.start_line {
            return Err(IndexRejection::InvertedLineRange);
        }

        let id_key = self.interner.get_or_intern(&symbol.id);
        let name_key = self.interner.get_or_intern(&symbol.name);
        self.by_id.insert(id_key, symbol.clone());
        self.by_name
            .entry(name_key)
            .or_default()
            .push(symbol.clone());
        self.ordered.write().push(symbol);
        Ok(())
    }

    /// Exact lookup by id.
    pub fn get_by_id(&self, id: &str) -> Option<Arc<Symbol>> {
        let key = self.interner.get(id)?;
        self.by_id.get(&key).map(|entry| entry.value().clone())
    }

    /// Exact lookup by bare name; all homonyms in insertion order.
    pub fn get_by_name(&self, name: &str) -> Vec<Arc<Symbol>> {
        let Some(key) = self.interner.get(name) else {
            return Vec::new();
        };
        self.by_name
            .get(&key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Fuzzy search over symbol names, ranked by Jaro-Winkler similarity.
    ///
    /// Obeys `deadline` and returns whatever was scored so far on expiry;
    /// partial results are results, not an error. Kind- and
    /// language-agnostic: callers filter after ranking.
    pub fn search(&self, query: &str, limit: usize, deadline: Duration) -> Vec<ScoredSymbol> {
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }
        let started = Instant::now();
        let needle = query.to_lowercase();
        let mut hits: Vec<ScoredSymbol> = Vec::new();

        let ordered = self.ordered.read();
        for (i, symbol) in ordered.iter().enumerate() {
            if i % DEADLINE_CHECK_INTERVAL == 0 && started.elapsed() >= deadline {
                tracing::debug!(scored = i, "fuzzy search deadline hit, returning partial results");
                break;
            }
            let haystack = symbol.name.to_lowercase();
            let mut score = strsim::jaro_winkler(&needle, &haystack);
            // Substring containment is a strong signal the similarity
            // metric underrates for short queries.
            if haystack.contains(&needle) {
                score = score.max(0.8);
            }
            if score >= FUZZY_SCORE_FLOOR {
                hits.push(ScoredSymbol {
                    symbol: symbol.clone(),
                    score,
                });
            }
        }
        drop(ordered);

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.symbol.id.cmp(&b.symbol.id))
        });
        hits.truncate(limit);
        hits
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        let ordered = self.ordered.read();
        let mut files = std::collections::HashSet::new();
        let mut callable = 0;
        let mut type_like = 0;
        let mut in_tests = 0;
        for symbol in ordered.iter() {
            files.insert(symbol.file_path.as_str());
            if symbol.kind.is_callable() {
                callable += 1;
            }
            if symbol.kind.is_type_like() {
                type_like += 1;
            }
            if classify::is_test_file(&symbol.file_path) {
                in_tests += 1;
            }
        }
        IndexStats {
            total_symbols: ordered.len(),
            callable_symbols: callable,
            type_symbols: type_like,
            files: files.len(),
            test_file_symbols: in_tests,
        }
    }

    /// All indexed symbols in insertion order.
    pub fn all(&self) -> Vec<Arc<Symbol>> {
        self.ordered.read().clone()
    }

    /// Locate the container type a method name belongs to, by scanning
    /// `children` of type-like symbols. Used by the resolver's dot-notation
    /// strategy.
    pub fn find_type_with_member(&self, type_name: &str, member: &str) -> Option<Arc<Symbol>> {
        for candidate in self.get_by_name(type_name) {
            if !candidate.kind.is_type_like() {
                continue;
            }
            if candidate
                .children
                .iter()
                .any(|child| child.name == member && child.kind.is_callable())
            {
                return Some(candidate);
            }
        }
        None
    }
}

impl Default for SymbolIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared index handle.
pub type SharedIndex = Arc<SymbolIndex>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(id: &str, name: &str, kind: SymbolKind) -> Arc<Symbol> {
        Arc::new(Symbol {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            file_path: "src/app.go".to_string(),
            start_line: 1,
            end_line: 4,
            language: "go".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn rejects_unaddressable_symbols() {
        let index = SymbolIndex::new();

        let mut external = (*sym("e:1:x", "x", SymbolKind::External)).clone();
        external.file_path = String::new();
        assert_eq!(
            index.add(Arc::new(external)),
            Err(IndexRejection::EmptyFilePath)
        );

        let mut bad_lang = (*sym("f:1:y", "y", SymbolKind::Function)).clone();
        bad_lang.language = String::new();
        assert_eq!(
            index.add(Arc::new(bad_lang)),
            Err(IndexRejection::EmptyLanguage)
        );

        let mut inverted = (*sym("f:9:z", "z", SymbolKind::Function)).clone();
        inverted.start_line = 10;
        inverted.end_line = 5;
        assert_eq!(
            index.add(Arc::new(inverted)),
            Err(IndexRejection::InvertedLineRange)
        );

        assert!(index.is_empty());
    }

    #[test]
    fn id_and_name_lookups() {
        let index = SymbolIndex::new();
        index.add(sym("a.go:1:run", "run", SymbolKind::Function)).unwrap();
        index.add(sym("b.go:7:run", "run", SymbolKind::Method)).unwrap();

        assert_eq!(index.get_by_id("a.go:1:run").unwrap().id, "a.go:1:run");
        assert!(index.get_by_id("missing").is_none());
        assert_eq!(index.get_by_name("run").len(), 2);
        assert!(index.get_by_name("walk").is_empty());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn fuzzy_search_ranks_near_matches() {
        let index = SymbolIndex::new();
        index
            .add(sym("a.go:1:parseConfig", "parseConfig", SymbolKind::Function))
            .unwrap();
        index
            .add(sym("a.go:20:parseHeaders", "parseHeaders", SymbolKind::Function))
            .unwrap();
        index
            .add(sym("a.go:40:render", "render", SymbolKind::Function))
            .unwrap();

        let hits = index.search("parseconfg", 5, FUZZY_SEARCH_DEADLINE);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].symbol.name, "parseConfig");
    }

    #[test]
    fn fuzzy_search_respects_limit_and_floor() {
        let index = SymbolIndex::new();
        for i in 0..10 {
            index
                .add(sym(
                    &format!("a.go:{i}:handler{i}"),
                    &format!("handler{i}"),
                    SymbolKind::Function,
                ))
                .unwrap();
        }
        let hits = index.search("handler", 3, FUZZY_SEARCH_DEADLINE);
        assert_eq!(hits.len(), 3);
        assert!(index.search("zzzzqqq", 5, FUZZY_SEARCH_DEADLINE).is_empty());
    }

    #[test]
    fn children_scan_finds_owner_type() {
        let index = SymbolIndex::new();
        let mut class = (*sym("m.py:1:Repo", "Repo", SymbolKind::Class)).clone();
        class.children = vec![Symbol {
            id: "m.py:5:save".to_string(),
            name: "save".to_string(),
            kind: SymbolKind::Method,
            file_path: "m.py".to_string(),
            start_line: 5,
            end_line: 9,
            language: "python".to_string(),
            receiver: "Repo".to_string(),
            ..Default::default()
        }];
        index.add(Arc::new(class)).unwrap();

        assert!(index.find_type_with_member("Repo", "save").is_some());
        assert!(index.find_type_with_member("Repo", "load").is_none());
    }

    #[test]
    fn stats_counts_kinds_and_files() {
        let index = SymbolIndex::new();
        index.add(sym("a.go:1:run", "run", SymbolKind::Function)).unwrap();
        let mut t = (*sym("b.go:1:Server", "Server", SymbolKind::Struct)).clone();
        t.file_path = "src/server.go".to_string();
        index.add(Arc::new(t)).unwrap();

        let stats = index.stats();
        assert_eq!(stats.total_symbols, 2);
        assert_eq!(stats.callable_symbols, 1);
        assert_eq!(stats.type_symbols, 1);
        assert_eq!(stats.files, 2);
    }
}
