//! `get_call_chain`: bounded BFS downstream or upstream from a function,
//! rendered as an indented tree with per-node depth.

use super::{
    Engine, Tool, ToolCategory, ToolContext, ToolDefinition, ToolResult, clamp_depth,
    parse_params, record_resolution, resolve_symbol, tool_failure, tool_success,
    validate_symbol_name,
};
use crate::error::QueryError;
use crate::output;
use crate::resolver::{KindFilter, ResolveOptions};
use crate::types::{CallTraversal, TraceStep};
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetCallChainParams {
    /// Function to start from.
    pub function_name: String,
    /// `downstream` (what it calls) or `upstream` (what calls it).
    #[serde(default)]
    pub direction: Option<String>,
    /// Traversal depth (clamped to 1..=10).
    #[serde(default)]
    pub max_depth: Option<u64>,
    /// Stop-target: when present in the traversal, the path back to the
    /// start is included in the output.
    #[serde(default)]
    pub destination_name: Option<String>,
    /// Module or directory hint to narrow ambiguous names.
    #[serde(default)]
    pub package_hint: Option<String>,
}

pub struct GetCallChainTool {
    engine: Arc<Engine>,
}

impl GetCallChainTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

/// Walk the parent map from `destination` back to the traversal root.
fn path_to_destination(traversal: &CallTraversal, destination_id: &str) -> Vec<String> {
    let parents: HashMap<&str, &str> = traversal
        .edges
        .iter()
        .map(|e| (e.to_id.as_str(), e.from_id.as_str()))
        .collect();
    let mut path = vec![destination_id.to_string()];
    let mut current = destination_id;
    while let Some(&parent) = parents.get(current) {
        path.push(parent.to_string());
        current = parent;
        if current == traversal.start.id {
            break;
        }
    }
    path.reverse();
    path
}

impl Tool for GetCallChainTool {
    fn name(&self) -> &'static str {
        "get_call_chain"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Traversal
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Trace the call chain downstream or upstream from a function, depth-bounded.",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(GetCallChainParams))
                .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("get_call_chain", self.name(), "");

        let params: GetCallChainParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.target = params.function_name.clone();
        if let Err(e) = validate_symbol_name(&params.function_name) {
            return tool_failure(trace, started, e);
        }
        let direction = params.direction.as_deref().unwrap_or("downstream");
        if !matches!(direction, "downstream" | "upstream") {
            return tool_failure(
                trace,
                started,
                QueryError::InvalidArgument(format!(
                    "direction must be 'downstream' or 'upstream', got '{direction}'"
                )),
            );
        }
        let max_depth = clamp_depth(params.max_depth);
        trace.insert("direction", direction);
        trace.insert("max_depth", max_depth);

        let opts = ResolveOptions {
            kind: Some(KindFilter::Callable),
            package_hint: params.package_hint.clone(),
            bare_method_fallback: true,
            ..Default::default()
        };
        let Some(resolved) = resolve_symbol(&self.engine, &params.function_name, &opts) else {
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "function": params.function_name }),
                output::symbol_not_found(&params.function_name),
            );
        };
        record_resolution(&mut trace, &resolved);
        let start = resolved.candidates[0].clone();

        let traversal = match direction {
            "upstream" => self
                .engine
                .graph
                .get_reverse_call_graph(&start.id, max_depth, &ctx.cancel),
            _ => self
                .engine
                .graph
                .get_call_graph(&start.id, max_depth, &ctx.cancel),
        };
        let traversal = match traversal {
            Ok(traversal) => traversal,
            Err(e) => return tool_failure(trace, started, e),
        };

        trace.insert("visited_nodes", traversal.visited.len());
        trace.insert("truncated", traversal.truncated);

        if traversal.visited.len() <= 1 {
            let headline = match direction {
                "upstream" => format!("No upstream callers of '{}' found.", start.name),
                _ => format!("No downstream calls from '{}' found.", start.name),
            };
            return tool_success(
                trace,
                started,
                serde_json::json!({
                    "found": true,
                    "function": start.name,
                    "resolved_id": start.id,
                    "visited": 1,
                    "depth": 0,
                }),
                output::not_found(&headline),
            );
        }

        let depths = traversal.depth_map();
        let arrow = if direction == "upstream" { "←" } else { "→" };
        let mut text = format!(
            "Found {} functions in the {} call chain of '{}' (max depth {}):\n\n",
            traversal.visited.len(),
            direction,
            start.name,
            max_depth
        );
        text.push_str(&format!("{}()\n", start.name));
        for symbol in traversal.visited.iter().skip(1) {
            let depth = depths.get(&symbol.id).copied().unwrap_or(1);
            let indent = "  ".repeat(depth as usize);
            if symbol.is_external() {
                let package = if symbol.package.is_empty() {
                    "external".to_string()
                } else {
                    symbol.package.clone()
                };
                text.push_str(&format!("{indent}{arrow} {}() [external: {package}]\n", symbol.name));
            } else {
                text.push_str(&format!("{indent}{arrow} {}()\n", symbol.name));
            }
        }
        if traversal.truncated {
            text.push_str("\n(truncated at the depth limit; deeper calls exist)\n");
        }

        // Optional destination: report the concrete path when the
        // traversal reached it.
        let mut destination_path: Option<Vec<String>> = None;
        if let Some(destination) = params
            .destination_name
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            let hit = traversal
                .visited
                .iter()
                .find(|s| s.name == destination || s.id == destination);
            match hit {
                Some(hit) => {
                    let id_path = path_to_destination(&traversal, &hit.id);
                    let names: Vec<String> = id_path
                        .iter()
                        .map(|id| {
                            self.engine
                                .graph
                                .get_node(id)
                                .map(|s| s.name.clone())
                                .unwrap_or_else(|| id.clone())
                        })
                        .collect();
                    text.push_str(&format!(
                        "\nPath to '{}': {}\n",
                        destination,
                        names.join(" -> ")
                    ));
                    destination_path = Some(id_path);
                }
                None => {
                    text.push_str(&format!(
                        "\n'{destination}' was not reached within depth {max_depth}.\n"
                    ));
                }
            }
        }
        output::push_footer(&mut text);

        let externals = self.engine.analytics.classify_external(&traversal);
        trace.insert("external_nodes", externals.len());

        let nodes: Vec<serde_json::Value> = traversal
            .visited
            .iter()
            .map(|symbol| {
                serde_json::json!({
                    "id": symbol.id,
                    "name": symbol.name,
                    "kind": symbol.kind.to_string(),
                    "depth": depths.get(&symbol.id).copied().unwrap_or(0),
                    "external": symbol.is_external(),
                })
            })
            .collect();
        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "function": start.name,
                "resolved_id": start.id,
                "direction": direction,
                "visited": nodes,
                "depth": traversal.depth,
                "truncated": traversal.truncated,
                "external_nodes": externals,
                "path_to_destination": destination_path,
            }),
            text,
        )
    }
}
