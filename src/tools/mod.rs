//! Tool layer: the call ABI consumed by the reasoning agent.
//!
//! Each tool has a small fixed contract (name, category, definition,
//! execute) and is dispatched through a registry keyed by tool name. Tools
//! hold shared references to the frozen graph, the index, and the
//! analytics facade; they parse and clamp parameters, resolve names, run
//! the matching graph or analytics operation, and emit a structured output
//! plus the canonical text surface.

mod call_chain;
mod callees;
mod callers;
mod implementations;
mod importance;
mod path;
mod references;
mod symbols;
mod topology;

pub use call_chain::GetCallChainTool;
pub use callees::FindCalleesTool;
pub use callers::FindCallersTool;
pub use implementations::FindImplementationsTool;
pub use importance::{FindDeadCodeTool, FindHotspotsTool, FindImportantTool};
pub use path::FindPathTool;
pub use references::FindReferencesTool;
pub use symbols::FindSymbolTool;
pub use topology::{
    FindArticulationPointsTool, FindControlDependenciesTool, FindCyclesTool, FindMergePointsTool,
};

use crate::analytics::Analytics;
use crate::cancel::CancelToken;
use crate::error::{QueryError, Result};
use crate::graph::CodeGraph;
use crate::index::SymbolIndex;
use crate::resolver::{ResolveOptions, Resolver};
use crate::types::{Symbol, TraceStep};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// Engine
// ============================================================================

/// Shared query state handed to every tool.
pub struct Engine {
    pub graph: Arc<CodeGraph>,
    /// Optional: tools degrade to O(V) name scans without it.
    pub index: Option<Arc<SymbolIndex>>,
    pub analytics: Arc<Analytics>,
}

impl Engine {
    /// Wrap a frozen graph and optional index. Fails if the graph is not
    /// frozen (analytics wrapping enforces the lifecycle).
    pub fn new(graph: Arc<CodeGraph>, index: Option<Arc<SymbolIndex>>) -> Result<Self> {
        let analytics = Arc::new(Analytics::wrap(graph.clone())?);
        Ok(Self {
            graph,
            index,
            analytics,
        })
    }
}

/// A resolution outcome at the tool layer.
pub(crate) struct Resolved {
    pub candidates: Vec<Arc<Symbol>>,
    pub used_fuzzy: bool,
    pub dot_notation_fallback: bool,
}

/// Resolve through the index when available, or fall back to an exact
/// graph name scan.
pub(crate) fn resolve_symbol(
    engine: &Engine,
    name: &str,
    opts: &ResolveOptions,
) -> Option<Resolved> {
    match &engine.index {
        Some(index) => Resolver::new(index).resolve(name, opts).map(|r| Resolved {
            candidates: r.candidates,
            used_fuzzy: r.used_fuzzy,
            dot_notation_fallback: r.dot_notation_fallback,
        }),
        None => {
            let kind = opts.kind.unwrap_or(crate::resolver::KindFilter::All);
            let candidates: Vec<Arc<Symbol>> = engine
                .graph
                .get_nodes_by_name(name)
                .into_iter()
                .filter(|s| kind.matches(s.kind))
                .collect();
            if candidates.is_empty() {
                None
            } else {
                Some(Resolved {
                    candidates,
                    used_fuzzy: false,
                    dot_notation_fallback: false,
                })
            }
        }
    }
}

/// Record the standard resolution signals in trace metadata.
pub(crate) fn record_resolution(trace: &mut TraceStep, resolved: &Resolved) {
    trace.insert("resolved_id", &resolved.candidates[0].id);
    trace.insert("used_fuzzy", resolved.used_fuzzy);
    if resolved.dot_notation_fallback {
        trace.insert("dot_notation_fallback", true);
    }
}

// ============================================================================
// Tool Contract
// ============================================================================

/// Execution context: the caller's cancellation handle.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub cancel: CancelToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Query,
    Traversal,
    Analytics,
}

/// Machine-readable tool description, schema included.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub category: ToolCategory,
    pub params_schema: serde_json::Value,
}

/// Uniform result of every tool execution.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub output: Option<serde_json::Value>,
    pub output_text: String,
    pub tokens_used: u32,
    pub trace: TraceStep,
    pub duration: Duration,
    pub error: Option<String>,
}

pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn category(&self) -> ToolCategory;
    fn definition(&self) -> ToolDefinition;
    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult;
}

// ============================================================================
// Shared Parameter Handling
// ============================================================================

pub(crate) const DEFAULT_LIMIT: u64 = 50;
pub(crate) const DEFAULT_MAX_DEPTH: u64 = 5;

/// Words too generic to name a symbol; rejecting them early saves a
/// pointless fuzzy scan and a misleading answer.
const GENERIC_WORDS: &[&str] = &[
    "the", "a", "an", "it", "this", "that", "function", "method", "class", "struct", "interface",
    "type", "variable", "constant", "symbol", "code", "file", "name",
];

pub(crate) fn clamp_limit(value: Option<u64>) -> usize {
    value.unwrap_or(DEFAULT_LIMIT).clamp(1, 1000) as usize
}

pub(crate) fn clamp_top(value: Option<u64>, default: u64) -> usize {
    value.unwrap_or(default).clamp(1, 100) as usize
}

pub(crate) fn clamp_depth(value: Option<u64>) -> u32 {
    value.unwrap_or(DEFAULT_MAX_DEPTH).clamp(1, 10) as u32
}

pub(crate) fn clamp_min_sources(value: Option<u64>) -> usize {
    value.unwrap_or(2).max(2) as usize
}

/// Reject empty and generic-word symbol names.
pub(crate) fn validate_symbol_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(QueryError::InvalidArgument(
            "symbol name must not be empty".to_string(),
        ));
    }
    if GENERIC_WORDS.contains(&trimmed.to_ascii_lowercase().as_str()) {
        return Err(QueryError::InvalidArgument(format!(
            "'{trimmed}' is too generic; use a concrete symbol name"
        )));
    }
    Ok(())
}

/// Deserialize tool parameters; schema mismatch is an InvalidArgument.
pub(crate) fn parse_params<P: DeserializeOwned>(params: serde_json::Value) -> Result<P> {
    serde_json::from_value(params)
        .map_err(|e| QueryError::InvalidArgument(format!("invalid parameters: {e}")))
}

// ============================================================================
// Result Assembly
// ============================================================================

pub(crate) fn tool_success(
    mut trace: TraceStep,
    started: Instant,
    output: serde_json::Value,
    output_text: String,
) -> ToolResult {
    let duration = started.elapsed();
    trace.duration_ns = duration.as_nanos() as u64;
    trace.metadata.entry("cancelled".to_string()).or_insert_with(|| "false".to_string());
    let tokens_used = (output_text.len() / 4) as u32;
    ToolResult {
        success: true,
        output: Some(output),
        output_text,
        tokens_used,
        trace,
        duration,
        error: None,
    }
}

pub(crate) fn tool_failure(mut trace: TraceStep, started: Instant, error: QueryError) -> ToolResult {
    let duration = started.elapsed();
    trace.duration_ns = duration.as_nanos() as u64;
    trace.error = error.to_string();
    if matches!(error, QueryError::Cancelled) {
        trace.insert("cancelled", true);
    }
    ToolResult {
        success: false,
        output: None,
        // Cancelled and failed executions emit no text surface.
        output_text: String::new(),
        tokens_used: 0,
        trace,
        duration,
        error: Some(error.to_string()),
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Name-keyed tool dispatch.
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    /// Registry with the full tool suite.
    pub fn with_default_tools(engine: Arc<Engine>) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(FindCallersTool::new(engine.clone())));
        registry.register(Box::new(FindCalleesTool::new(engine.clone())));
        registry.register(Box::new(FindImplementationsTool::new(engine.clone())));
        registry.register(Box::new(FindSymbolTool::new(engine.clone())));
        registry.register(Box::new(FindReferencesTool::new(engine.clone())));
        registry.register(Box::new(GetCallChainTool::new(engine.clone())));
        registry.register(Box::new(FindPathTool::new(engine.clone())));
        registry.register(Box::new(FindHotspotsTool::new(engine.clone())));
        registry.register(Box::new(FindDeadCodeTool::new(engine.clone())));
        registry.register(Box::new(FindImportantTool::new(engine.clone())));
        registry.register(Box::new(FindCyclesTool::new(engine.clone())));
        registry.register(Box::new(FindArticulationPointsTool::new(engine.clone())));
        registry.register(Box::new(FindMergePointsTool::new(engine.clone())));
        registry.register(Box::new(FindControlDependenciesTool::new(engine)));
        registry
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(Box::as_ref)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Dispatch by name. Unknown names fail like any other invalid argument.
    pub fn execute(&self, name: &str, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        match self.get(name) {
            Some(tool) => tool.execute(ctx, params),
            None => tool_failure(
                TraceStep::new("dispatch", name, ""),
                started,
                QueryError::InvalidArgument(format!("unknown tool: {name}")),
            ),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_follow_contract() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(5000)), 1000);
        assert_eq!(clamp_top(None, 10), 10);
        assert_eq!(clamp_top(Some(500), 10), 100);
        assert_eq!(clamp_depth(None), 5);
        assert_eq!(clamp_depth(Some(99)), 10);
        assert_eq!(clamp_depth(Some(0)), 1);
        assert_eq!(clamp_min_sources(Some(0)), 2);
        assert_eq!(clamp_min_sources(Some(7)), 7);
    }

    #[test]
    fn generic_words_rejected() {
        assert!(validate_symbol_name("the").is_err());
        assert!(validate_symbol_name("Function").is_err());
        assert!(validate_symbol_name("").is_err());
        assert!(validate_symbol_name("   ").is_err());
        assert!(validate_symbol_name("parseConfig").is_ok());
        assert!(validate_symbol_name("main").is_ok());
    }
}
