//! Core types for the Atlas code graph.
//!
//! This module defines the data structures shared across all layers:
//! - Graph entities (symbols, edges, locations)
//! - Traversal results produced by the graph layer
//! - Trace records emitted by every tool execution

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Graph Entities
// ============================================================================

/// Kind of symbol in the indexed codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Method,
    Property,
    Class,
    Struct,
    Interface,
    /// Type alias.
    Type,
    Enum,
    Variable,
    Constant,
    /// Referenced by the indexed code but not defined in it.
    External,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Property => "property",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Enum => "enum",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::External => "external",
        }
    }

    /// Callable symbols: functions, methods, and properties (getter-style
    /// members count as callable in several source languages).
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::Property)
    }

    /// Type-like symbols: classes, structs, interfaces, and type aliases.
    pub fn is_type_like(&self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Interface | Self::Type)
    }

    /// Container symbols carry member symbols in `children`.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Interface)
    }
}

impl Default for SymbolKind {
    fn default() -> Self {
        Self::Function
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a relation or declaration in a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

/// Structured metadata attached to a symbol.
///
/// Plain fields only: snapshots go through a non-self-describing binary
/// format, so conditional serialization is off the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    /// For classes: the bare name of the parent class (single inheritance).
    #[serde(default)]
    pub extends: Option<String>,
}

/// A named declaration in the indexed codebase.
///
/// The `id` follows the `file:line:name` convention and is stable for a
/// given build. External symbols have an empty `file_path`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_col: u32,
    /// Module/package/namespace label.
    pub package: String,
    /// Source-language tag; drives resolver conventions.
    pub language: String,
    pub exported: bool,
    #[serde(default)]
    pub signature: Option<String>,
    /// For methods: the owning type's bare name.
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub metadata: SymbolMetadata,
    /// For container symbols: member symbols.
    #[serde(default)]
    pub children: Vec<Symbol>,
}

impl Symbol {
    /// Display location as `file:line`; externals render as `<external>`.
    pub fn display_location(&self) -> String {
        if self.file_path.is_empty() {
            "<external>".to_string()
        } else {
            format!("{}:{}", self.file_path, self.start_line)
        }
    }

    pub fn is_external(&self) -> bool {
        self.kind == SymbolKind::External
    }
}

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Calls,
    Implements,
    /// Class-extends and struct-embedding; a subtype relation either way.
    Embeds,
    References,
    ControlDepends,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::Implements => "implements",
            Self::Embeds => "embeds",
            Self::References => "references",
            Self::ControlDepends => "control_depends",
        }
    }
}

/// A directed, typed relation between two symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from_id: String,
    pub to_id: String,
    pub kind: EdgeKind,
    /// Where in source this relation was observed.
    pub location: Location,
}

// ============================================================================
// Traversal Results
// ============================================================================

/// One step of a BFS traversal tree: the edge that first reached `to_id`.
#[derive(Debug, Clone, Serialize)]
pub struct TraversalEdge {
    pub from_id: String,
    pub to_id: String,
    pub depth: u32,
    pub location: Location,
}

/// Result of a bounded call-graph traversal.
///
/// `visited` is in BFS order with the start node first. `truncated` means
/// the depth or node budget stopped the walk early; it is never an error.
#[derive(Debug, Clone)]
pub struct CallTraversal {
    pub start: Arc<Symbol>,
    pub visited: Vec<Arc<Symbol>>,
    pub edges: Vec<TraversalEdge>,
    pub depth: u32,
    pub truncated: bool,
}

impl CallTraversal {
    /// Reconstruct per-node depth from the traversal tree.
    pub fn depth_map(&self) -> BTreeMap<String, u32> {
        let mut depths = BTreeMap::new();
        depths.insert(self.start.id.clone(), 0);
        for edge in &self.edges {
            depths.insert(edge.to_id.clone(), edge.depth);
        }
        depths
    }
}

/// Result of a shortest-path search over Calls edges.
#[derive(Debug, Clone)]
pub struct PathResult {
    pub found: bool,
    pub path: Vec<Arc<Symbol>>,
    /// Edge count of the path; 0 when not found or from == to.
    pub length: u32,
}

/// A caller or callee with the call-site location that links it.
#[derive(Debug, Clone)]
pub struct RelatedSymbol {
    pub symbol: Arc<Symbol>,
    pub location: Location,
    pub edge_kind: EdgeKind,
}

/// Callers partitioned into direct callers and callers inherited through
/// parent methods of the same name.
#[derive(Debug, Clone, Default)]
pub struct CallersWithInheritance {
    pub direct: Vec<RelatedSymbol>,
    /// parent method id -> callers of that parent method.
    pub inherited: BTreeMap<String, Vec<RelatedSymbol>>,
}

impl CallersWithInheritance {
    pub fn total(&self) -> usize {
        self.direct.len() + self.inherited.values().map(Vec::len).sum::<usize>()
    }
}

// ============================================================================
// Trace Records
// ============================================================================

/// Structured log record emitted by every tool execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceStep {
    pub action: String,
    pub tool: String,
    pub target: String,
    pub duration_ns: u64,
    /// Flat string metadata: counts, cancellation state, fuzzy-match flag.
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    pub timestamp_ns: u64,
}

impl TraceStep {
    pub fn new(action: &str, tool: &str, target: &str) -> Self {
        let timestamp_ns = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self {
            action: action.to_string(),
            tool: tool.to_string(),
            target: target.to_string(),
            timestamp_ns,
            ..Default::default()
        }
    }

    pub fn insert(&mut self, key: &str, value: impl ToString) {
        self.metadata.insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_groups() {
        assert!(SymbolKind::Function.is_callable());
        assert!(SymbolKind::Property.is_callable());
        assert!(!SymbolKind::Class.is_callable());
        assert!(SymbolKind::Type.is_type_like());
        assert!(SymbolKind::Interface.is_container());
        assert!(!SymbolKind::Type.is_container());
    }

    #[test]
    fn external_display_location() {
        let sym = Symbol {
            id: "ext:gin.New".to_string(),
            name: "New".to_string(),
            kind: SymbolKind::External,
            package: "gin".to_string(),
            language: "go".to_string(),
            ..Default::default()
        };
        assert_eq!(sym.display_location(), "<external>");
        assert!(sym.is_external());
    }

    #[test]
    fn traversal_depth_map_includes_start() {
        let start = Arc::new(Symbol {
            id: "a.go:1:main".to_string(),
            name: "main".to_string(),
            language: "go".to_string(),
            ..Default::default()
        });
        let t = CallTraversal {
            start: start.clone(),
            visited: vec![start],
            edges: vec![TraversalEdge {
                from_id: "a.go:1:main".to_string(),
                to_id: "a.go:9:helper".to_string(),
                depth: 1,
                location: Location::default(),
            }],
            depth: 1,
            truncated: false,
        };
        let depths = t.depth_map();
        assert_eq!(depths["a.go:1:main"], 0);
        assert_eq!(depths["a.go:9:helper"], 1);
    }
}
