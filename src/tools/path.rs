//! `find_path`: is there a call path from A to B.
//!
//! When resolution produces several candidates for either endpoint, the
//! Cartesian product of pairs is tried until a path is found. The product
//! is capped so pathological resolutions stay cheap; the cap shows up in
//! trace metadata when it bites.

use super::{
    Engine, Tool, ToolCategory, ToolContext, ToolDefinition, ToolResult, parse_params,
    resolve_symbol, tool_failure, tool_success, validate_symbol_name,
};
use crate::output;
use crate::resolver::{KindFilter, ResolveOptions};
use crate::types::TraceStep;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

/// Upper bound on (from, to) candidate pairs tried.
const MAX_CANDIDATE_PAIRS: usize = 16;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindPathParams {
    /// Start function.
    pub from: String,
    /// Destination function.
    pub to: String,
}

pub struct FindPathTool {
    engine: Arc<Engine>,
}

impl FindPathTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Tool for FindPathTool {
    fn name(&self) -> &'static str {
        "find_path"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Traversal
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Find the shortest call path between two functions.",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(FindPathParams))
                .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_path", self.name(), "");

        let params: FindPathParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.target = format!("{} -> {}", params.from, params.to);
        for name in [&params.from, &params.to] {
            if let Err(e) = validate_symbol_name(name) {
                return tool_failure(trace, started, e);
            }
        }

        let opts = ResolveOptions {
            kind: Some(KindFilter::Callable),
            bare_method_fallback: true,
            ..Default::default()
        };
        let Some(from) = resolve_symbol(&self.engine, &params.from, &opts) else {
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "from": params.from, "to": params.to }),
                output::symbol_not_found(&params.from),
            );
        };
        let Some(to) = resolve_symbol(&self.engine, &params.to, &opts) else {
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "from": params.from, "to": params.to }),
                output::symbol_not_found(&params.to),
            );
        };
        trace.insert("from_candidates", from.candidates.len());
        trace.insert("to_candidates", to.candidates.len());
        trace.insert("used_fuzzy", from.used_fuzzy || to.used_fuzzy);

        let total_pairs = from.candidates.len() * to.candidates.len();
        if total_pairs > MAX_CANDIDATE_PAIRS {
            trace.insert("pairs_capped", true);
        }

        let mut pairs_tried = 0usize;
        let mut best = None;
        'outer: for from_candidate in &from.candidates {
            for to_candidate in &to.candidates {
                if pairs_tried >= MAX_CANDIDATE_PAIRS {
                    break 'outer;
                }
                pairs_tried += 1;
                match self
                    .engine
                    .graph
                    .find_path(&from_candidate.id, &to_candidate.id, &ctx.cancel)
                {
                    Ok(result) if result.found => {
                        best = Some(result);
                        break 'outer;
                    }
                    Ok(_) => {}
                    Err(e) => return tool_failure(trace, started, e),
                }
            }
        }
        trace.insert("pairs_tried", pairs_tried);

        let Some(result) = best else {
            let text = output::not_found(&format!(
                "No call path from '{}' to '{}' exists.",
                params.from, params.to
            ));
            return tool_success(
                trace,
                started,
                serde_json::json!({
                    "found": false,
                    "from": params.from,
                    "to": params.to,
                    "pairs_tried": pairs_tried,
                }),
                text,
            );
        };

        trace.insert("path_length", result.length);
        let names: Vec<&str> = result.path.iter().map(|s| s.name.as_str()).collect();
        let mut text = format!(
            "Found a call path from '{}' to '{}' (length {}):\n\n  {}\n",
            names.first().copied().unwrap_or(&params.from),
            names.last().copied().unwrap_or(&params.to),
            result.length,
            names.join(" -> ")
        );
        for symbol in &result.path {
            text.push_str(&format!("  - {}\n", output::entry_line(symbol)));
        }
        output::push_footer(&mut text);

        let path: Vec<serde_json::Value> = result
            .path
            .iter()
            .map(|symbol| {
                serde_json::json!({
                    "id": symbol.id,
                    "name": symbol.name,
                    "file": symbol.file_path,
                    "line": symbol.start_line,
                })
            })
            .collect();
        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "length": result.length,
                "path": path,
            }),
            text,
        )
    }
}
