//! Graph-shape tools: `find_cycles`, `find_articulation_points`,
//! `find_merge_points`, and `find_control_dependencies`.

use super::{
    Engine, Tool, ToolCategory, ToolContext, ToolDefinition, ToolResult, clamp_depth, clamp_limit,
    clamp_min_sources, parse_params, record_resolution, resolve_symbol, tool_failure,
    tool_success, validate_symbol_name,
};
use crate::output;
use crate::resolver::ResolveOptions;
use crate::types::TraceStep;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

// ============================================================================
// find_cycles
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindCyclesParams {
    /// Smallest cycle to report; 1 includes self-loops.
    #[serde(default)]
    pub min_size: Option<u64>,
    /// Maximum cycles to return (clamped to 1..=1000).
    #[serde(default)]
    pub limit: Option<u64>,
}

pub struct FindCyclesTool {
    engine: Arc<Engine>,
}

impl FindCyclesTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Tool for FindCyclesTool {
    fn name(&self) -> &'static str {
        "find_cycles"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Analytics
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Find call cycles (strongly connected components and self-loops).",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(FindCyclesParams))
                .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_cycles", self.name(), "");

        let params: FindCyclesParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        let min_size = params.min_size.unwrap_or(2).max(1) as usize;
        let limit = clamp_limit(params.limit);
        trace.insert("min_size", min_size);

        let mut cycles = match self.engine.analytics.cycles(min_size, &ctx.cancel) {
            Ok(cycles) => cycles,
            Err(e) => return tool_failure(trace, started, e),
        };
        cycles.truncate(limit);
        trace.insert("total_cycles", cycles.len());

        if cycles.is_empty() {
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "total_cycles": 0 }),
                output::not_found(&format!(
                    "No call cycles of size >= {min_size} found."
                )),
            );
        }

        let mut text = format!("Found {} call cycles:\n\n", cycles.len());
        for (i, cycle) in cycles.iter().enumerate() {
            let names: Vec<&str> = cycle.members.iter().map(|m| m.name.as_str()).collect();
            text.push_str(&format!(
                "{:>3}. cycle of {}: {}\n",
                i + 1,
                cycle.size(),
                names.join(" -> ")
            ));
            for member in &cycle.members {
                text.push_str(&format!("       {}\n", output::entry_line(member)));
            }
        }
        output::push_footer(&mut text);

        let entries: Vec<serde_json::Value> = cycles
            .iter()
            .map(|cycle| {
                serde_json::json!({
                    "size": cycle.size(),
                    "members": cycle
                        .members
                        .iter()
                        .map(|m| serde_json::json!({
                            "id": m.id,
                            "name": m.name,
                            "file": m.file_path,
                            "line": m.start_line,
                        }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "total_cycles": entries.len(),
                "cycles": entries,
            }),
            text,
        )
    }
}

// ============================================================================
// find_articulation_points
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindArticulationPointsParams {
    /// Maximum points to list (clamped to 1..=1000).
    #[serde(default)]
    pub limit: Option<u64>,
}

pub struct FindArticulationPointsTool {
    engine: Arc<Engine>,
}

impl FindArticulationPointsTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Tool for FindArticulationPointsTool {
    fn name(&self) -> &'static str {
        "find_articulation_points"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Analytics
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Find symbols and edges whose removal would disconnect the graph.",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(
                FindArticulationPointsParams
            ))
            .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_articulation_points", self.name(), "");

        let params: FindArticulationPointsParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        let limit = clamp_limit(params.limit);

        let report = match self.engine.analytics.articulation_points(&ctx.cancel) {
            Ok(report) => report,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.insert("articulation_points", report.articulation_points.len());
        trace.insert("bridges", report.bridges.len());
        trace.insert("fragility_level", report.level.as_str());

        if report.articulation_points.is_empty() && report.bridges.is_empty() {
            return tool_success(
                trace,
                started,
                serde_json::json!({
                    "found": false,
                    "fragility": report.fragility,
                    "fragility_level": report.level.as_str(),
                }),
                output::not_found("No articulation points or bridges found; the graph has no single points of failure."),
            );
        }

        let points: Vec<_> = report.articulation_points.iter().take(limit).collect();
        let mut text = format!(
            "Found {} articulation points (fragility {:.1}%, {}):\n\n",
            report.articulation_points.len(),
            report.fragility * 100.0,
            report.level.as_str()
        );
        for symbol in &points {
            text.push_str(&format!("  - {}\n", output::entry_line(symbol)));
        }
        if !report.bridges.is_empty() {
            text.push_str(&format!("\nBridges ({}):\n", report.bridges.len()));
            for bridge in report.bridges.iter().take(limit) {
                text.push_str(&format!(
                    "  - {} -> {}\n",
                    bridge.from.name, bridge.to.name
                ));
            }
        }
        output::push_footer(&mut text);

        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "fragility": report.fragility,
                "fragility_level": report.level.as_str(),
                "articulation_points": points
                    .iter()
                    .map(|s| serde_json::json!({
                        "id": s.id,
                        "name": s.name,
                        "file": s.file_path,
                        "line": s.start_line,
                    }))
                    .collect::<Vec<_>>(),
                "bridges": report
                    .bridges
                    .iter()
                    .take(limit)
                    .map(|b| serde_json::json!({
                        "from": b.from.name,
                        "to": b.to.name,
                    }))
                    .collect::<Vec<_>>(),
            }),
            text,
        )
    }
}

// ============================================================================
// find_merge_points
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindMergePointsParams {
    /// Minimum converging call paths (at least 2).
    #[serde(default)]
    pub min_sources: Option<u64>,
    /// Maximum merge points to return (clamped to 1..=1000).
    #[serde(default)]
    pub limit: Option<u64>,
}

pub struct FindMergePointsTool {
    engine: Arc<Engine>,
}

impl FindMergePointsTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Tool for FindMergePointsTool {
    fn name(&self) -> &'static str {
        "find_merge_points"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Analytics
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Find symbols where multiple call paths converge.",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(FindMergePointsParams))
                .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_merge_points", self.name(), "");

        let params: FindMergePointsParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        let min_sources = clamp_min_sources(params.min_sources);
        let limit = clamp_limit(params.limit);
        trace.insert("min_sources", min_sources);

        let points = match self
            .engine
            .analytics
            .merge_points(min_sources, limit, &ctx.cancel)
        {
            Ok(points) => points,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.insert("total_merge_points", points.len());

        if points.is_empty() {
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "total_merge_points": 0 }),
                output::not_found(&format!(
                    "No merge points with at least {min_sources} converging call paths found."
                )),
            );
        }

        let mut text = format!("Found {} merge points:\n\n", points.len());
        for point in &points {
            text.push_str(&format!(
                "  - {} ({} converging paths)\n",
                output::entry_line(&point.symbol),
                point.converging_paths
            ));
        }
        output::push_footer(&mut text);

        let entries: Vec<serde_json::Value> = points
            .iter()
            .map(|point| {
                serde_json::json!({
                    "id": point.symbol.id,
                    "name": point.symbol.name,
                    "file": point.symbol.file_path,
                    "line": point.symbol.start_line,
                    "converging_paths": point.converging_paths,
                })
            })
            .collect();
        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "total_merge_points": entries.len(),
                "merge_points": entries,
            }),
            text,
        )
    }
}

// ============================================================================
// find_control_dependencies
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindControlDependenciesParams {
    /// Symbol whose control dependencies to trace.
    pub function_name: String,
    /// Traversal depth (clamped to 1..=10).
    #[serde(default)]
    pub max_depth: Option<u64>,
}

pub struct FindControlDependenciesTool {
    engine: Arc<Engine>,
}

impl FindControlDependenciesTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Tool for FindControlDependenciesTool {
    fn name(&self) -> &'static str {
        "find_control_dependencies"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Analytics
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Trace control-dependency edges from a symbol, depth-bounded.",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(
                FindControlDependenciesParams
            ))
            .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_control_dependencies", self.name(), "");

        let params: FindControlDependenciesParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.target = params.function_name.clone();
        if let Err(e) = validate_symbol_name(&params.function_name) {
            return tool_failure(trace, started, e);
        }
        let max_depth = clamp_depth(params.max_depth);

        let Some(resolved) = resolve_symbol(&self.engine, &params.function_name, &ResolveOptions::default())
        else {
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "function": params.function_name }),
                output::symbol_not_found(&params.function_name),
            );
        };
        record_resolution(&mut trace, &resolved);
        let target = resolved.candidates[0].clone();

        let traversal = match self
            .engine
            .analytics
            .control_dependencies(&target.id, max_depth, &ctx.cancel)
        {
            Ok(traversal) => traversal,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.insert("visited_nodes", traversal.visited.len());

        if traversal.visited.len() <= 1 {
            return tool_success(
                trace,
                started,
                serde_json::json!({
                    "found": true,
                    "function": target.name,
                    "resolved_id": target.id,
                    "total_dependencies": 0,
                }),
                output::not_found(&format!(
                    "No control dependencies of '{}' found.",
                    target.name
                )),
            );
        }

        let depths = traversal.depth_map();
        let mut text = format!(
            "Found {} control dependencies of '{}':\n\n",
            traversal.visited.len() - 1,
            target.name
        );
        for symbol in traversal.visited.iter().skip(1) {
            let depth = depths.get(&symbol.id).copied().unwrap_or(1);
            text.push_str(&format!(
                "  {}- {} (depth {})\n",
                "  ".repeat(depth.saturating_sub(1) as usize),
                output::entry_line(symbol),
                depth
            ));
        }
        output::push_footer(&mut text);

        let entries: Vec<serde_json::Value> = traversal
            .visited
            .iter()
            .skip(1)
            .map(|symbol| {
                serde_json::json!({
                    "id": symbol.id,
                    "name": symbol.name,
                    "depth": depths.get(&symbol.id).copied().unwrap_or(1),
                })
            })
            .collect();
        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "function": target.name,
                "resolved_id": target.id,
                "total_dependencies": entries.len(),
                "dependencies": entries,
                "truncated": traversal.truncated,
            }),
            text,
        )
    }
}
