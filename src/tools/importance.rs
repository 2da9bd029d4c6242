//! Importance tools: `find_hotspots`, `find_important`, `find_dead_code`.
//! Thin typed wrappers over the analytics facade with the standard
//! parameter clamping and output surface.

use super::{
    Engine, Tool, ToolCategory, ToolContext, ToolDefinition, ToolResult, clamp_limit, clamp_top,
    parse_params, tool_failure, tool_success,
};
use crate::analytics::{DeadCodeOptions, HotspotOptions};
use crate::error::QueryError;
use crate::output;
use crate::resolver::KindFilter;
use crate::types::TraceStep;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

// ============================================================================
// find_hotspots
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindHotspotsParams {
    /// How many hotspots to return (clamped to 1..=100).
    #[serde(default)]
    pub top: Option<u64>,
    /// Exclude symbols defined in test files.
    #[serde(default)]
    pub exclude_tests: Option<bool>,
    /// Restrict to a package scope; an empty scoped result is the answer.
    #[serde(default)]
    pub package: Option<String>,
}

pub struct FindHotspotsTool {
    engine: Arc<Engine>,
}

impl FindHotspotsTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Tool for FindHotspotsTool {
    fn name(&self) -> &'static str {
        "find_hotspots"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Analytics
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Find the most connected symbols by combined in/out degree.",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(FindHotspotsParams))
                .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_hotspots", self.name(), "");

        let params: FindHotspotsParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        let opts = HotspotOptions {
            top: clamp_top(params.top, 10),
            exclude_tests: params.exclude_tests.unwrap_or(true),
            package_scope: params.package.clone().filter(|p| !p.is_empty()),
        };
        if let Some(scope) = &opts.package_scope {
            trace.target = scope.clone();
        }

        let hotspots = match self.engine.analytics.hotspots(&opts, &ctx.cancel) {
            Ok(hotspots) => hotspots,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.insert("total_hotspots", hotspots.len());

        if hotspots.is_empty() {
            let headline = match &opts.package_scope {
                Some(scope) => format!("No hotspots found in package scope '{scope}'."),
                None => "No hotspots found; the graph has no connected symbols.".to_string(),
            };
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "total_hotspots": 0 }),
                output::not_found(&headline),
            );
        }

        let mut text = format!("Found {} hotspots:\n\n", hotspots.len());
        for (i, hotspot) in hotspots.iter().enumerate() {
            text.push_str(&format!(
                "{:>3}. {} score {:.1} (in: {}, out: {})\n",
                i + 1,
                output::entry_line(&hotspot.symbol),
                hotspot.score,
                hotspot.in_degree,
                hotspot.out_degree
            ));
        }
        output::push_footer(&mut text);

        let entries: Vec<serde_json::Value> = hotspots
            .iter()
            .map(|hotspot| {
                serde_json::json!({
                    "id": hotspot.symbol.id,
                    "name": hotspot.symbol.name,
                    "kind": hotspot.symbol.kind.to_string(),
                    "file": hotspot.symbol.file_path,
                    "line": hotspot.symbol.start_line,
                    "score": hotspot.score,
                    "in_degree": hotspot.in_degree,
                    "out_degree": hotspot.out_degree,
                })
            })
            .collect();
        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "total_hotspots": entries.len(),
                "hotspots": entries,
            }),
            text,
        )
    }
}

// ============================================================================
// find_important
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindImportantParams {
    /// How many symbols to return (clamped to 1..=100).
    #[serde(default)]
    pub top: Option<u64>,
    /// Return the least-important symbols instead.
    #[serde(default)]
    pub reverse: Option<bool>,
    /// Kind filter applied after ranking.
    #[serde(default)]
    pub kind: Option<String>,
    /// Package scope applied after ranking.
    #[serde(default)]
    pub package: Option<String>,
}

pub struct FindImportantTool {
    engine: Arc<Engine>,
}

impl FindImportantTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Tool for FindImportantTool {
    fn name(&self) -> &'static str {
        "find_important"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Analytics
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Rank symbols by transitive importance (PageRank).",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(FindImportantParams))
                .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_important", self.name(), "");

        let params: FindImportantParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        let top = clamp_top(params.top, 10);
        let reverse = params.reverse.unwrap_or(false);
        trace.insert("reverse", reverse);

        let kind_filter = match params.kind.as_deref() {
            None | Some("") => None,
            Some(raw) => match KindFilter::parse(raw) {
                Some(filter) => Some(filter),
                None => {
                    return tool_failure(
                        trace,
                        started,
                        QueryError::InvalidArgument(format!("unrecognized kind filter: {raw}")),
                    );
                }
            },
        };
        let package = params.package.clone().filter(|p| !p.is_empty());
        let has_filters = kind_filter.is_some() || package.is_some();
        trace.insert("filtered", has_filters);

        let ranked = self.engine.analytics.pagerank_top_filtered(
            top,
            reverse,
            |symbol| {
                if let Some(filter) = kind_filter
                    && !filter.matches(symbol.kind)
                {
                    return false;
                }
                if let Some(scope) = &package
                    && !(symbol.package.contains(scope.as_str())
                        || symbol.file_path.contains(scope.as_str()))
                {
                    return false;
                }
                true
            },
            &ctx.cancel,
        );
        let ranked = match ranked {
            Ok(ranked) => ranked,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.insert("total_ranked", ranked.len());

        if ranked.is_empty() {
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "total": 0 }),
                output::not_found("No symbols matched the importance query."),
            );
        }

        let direction = if reverse { "least" } else { "most" };
        let mut text = format!(
            "Found {} {} important symbols (PageRank):\n\n",
            ranked.len(),
            direction
        );
        for node in &ranked {
            text.push_str(&format!(
                "{:>3}. {} score {:.6} degree {}\n",
                node.rank,
                output::entry_line(&node.symbol),
                node.score,
                node.degree_score
            ));
        }
        output::push_footer(&mut text);

        let entries: Vec<serde_json::Value> = ranked
            .iter()
            .map(|node| {
                serde_json::json!({
                    "rank": node.rank,
                    "id": node.symbol.id,
                    "name": node.symbol.name,
                    "kind": node.symbol.kind.to_string(),
                    "score": node.score,
                    "degree_score": node.degree_score,
                })
            })
            .collect();
        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "reverse": reverse,
                "total": entries.len(),
                "symbols": entries,
            }),
            text,
        )
    }
}

// ============================================================================
// find_dead_code
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindDeadCodeParams {
    /// Maximum candidates to return (clamped to 1..=1000).
    #[serde(default)]
    pub limit: Option<u64>,
    /// Also report exported symbols with no incoming edges.
    #[serde(default)]
    pub include_exported: Option<bool>,
}

pub struct FindDeadCodeTool {
    engine: Arc<Engine>,
}

impl FindDeadCodeTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Tool for FindDeadCodeTool {
    fn name(&self) -> &'static str {
        "find_dead_code"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Analytics
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Find symbols with no incoming edges that are not entry points.",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(FindDeadCodeParams))
                .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_dead_code", self.name(), "");

        let params: FindDeadCodeParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        let opts = DeadCodeOptions {
            limit: clamp_limit(params.limit),
            include_exported: params.include_exported.unwrap_or(false),
        };
        trace.insert("include_exported", opts.include_exported);

        let dead = match self.engine.analytics.dead_code(&opts, &ctx.cancel) {
            Ok(dead) => dead,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.insert("total_dead", dead.len());

        if dead.is_empty() {
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "total_dead": 0 }),
                output::not_found("No dead code found; every symbol is referenced or is an entry point."),
            );
        }

        let mut text = format!("Found {} dead code candidates:\n\n", dead.len());
        for entry in &dead {
            text.push_str(&format!(
                "  - {} ({})\n",
                output::entry_line(&entry.symbol),
                entry.reason
            ));
        }
        output::push_footer(&mut text);

        let entries: Vec<serde_json::Value> = dead
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "id": entry.symbol.id,
                    "name": entry.symbol.name,
                    "kind": entry.symbol.kind.to_string(),
                    "file": entry.symbol.file_path,
                    "line": entry.symbol.start_line,
                    "exported": entry.symbol.exported,
                    "reason": entry.reason,
                })
            })
            .collect();
        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "total_dead": entries.len(),
                "dead_code": entries,
            }),
            text,
        )
    }
}
