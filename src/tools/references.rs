//! `find_references`: every incoming edge to a symbol, regardless of kind.
//!
//! Three distinct answers: the symbol does not exist, the symbol exists
//! but nothing points at it, or N de-duplicated reference sites. All three
//! are definitive.

use super::{
    Engine, Tool, ToolCategory, ToolContext, ToolDefinition, ToolResult, clamp_limit,
    parse_params, record_resolution, resolve_symbol, tool_failure, tool_success,
    validate_symbol_name,
};
use crate::classify;
use crate::output;
use crate::resolver::ResolveOptions;
use crate::types::TraceStep;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindReferencesParams {
    /// Symbol name to find references to.
    pub symbol_name: String,
    /// Maximum references to return (clamped to 1..=1000).
    #[serde(default)]
    pub limit: Option<u64>,
    /// Module or directory hint to narrow ambiguous names.
    #[serde(default)]
    pub package_hint: Option<String>,
}

pub struct FindReferencesTool {
    engine: Arc<Engine>,
}

impl FindReferencesTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Tool for FindReferencesTool {
    fn name(&self) -> &'static str {
        "find_references"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Query
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Find every reference to a symbol: calls, implementations, embeddings, and plain references.",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(FindReferencesParams))
                .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_references", self.name(), "");

        let params: FindReferencesParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.target = params.symbol_name.clone();
        if let Err(e) = validate_symbol_name(&params.symbol_name) {
            return tool_failure(trace, started, e);
        }
        let limit = clamp_limit(params.limit);

        let opts = ResolveOptions {
            package_hint: params.package_hint.clone(),
            ..Default::default()
        };
        // Path A: the symbol does not exist.
        let Some(resolved) = resolve_symbol(&self.engine, &params.symbol_name, &opts) else {
            trace.insert("total_references", 0);
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "symbol": params.symbol_name }),
                output::symbol_not_found(&params.symbol_name),
            );
        };
        record_resolution(&mut trace, &resolved);
        let target = resolved.candidates[0].clone();

        // Over-fetch so test-file references cannot crowd out source-file
        // references before the final truncation.
        let fetch = limit.saturating_mul(3);
        let mut references = match self
            .engine
            .graph
            .find_references_by_id(&target.id, fetch, &ctx.cancel)
        {
            Ok(references) => references,
            Err(e) => return tool_failure(trace, started, e),
        };

        // Path B: resolved but nothing points at it.
        if references.is_empty() {
            trace.insert("total_references", 0);
            let mut text = format!(
                "{} Symbol '{}' exists but has no incoming reference edges.\n{}\n",
                output::NOT_FOUND_PREFIX,
                target.name,
                output::entry_line(&target),
            );
            output::push_footer(&mut text);
            return tool_success(
                trace,
                started,
                serde_json::json!({
                    "found": true,
                    "symbol": target.name,
                    "resolved_id": target.id,
                    "total_references": 0,
                }),
                text,
            );
        }

        // Source files sort ahead of test files; the sort is stable so
        // graph order is preserved within each class.
        references.sort_by_key(|r| classify::is_test_file(&r.location.file));
        references.truncate(limit);

        let total = references.len();
        trace.insert("total_references", total);

        // Path C: N references.
        let mut text = format!("Found {} references to '{}':\n\n", total, target.name);
        text.push_str(&format!("{}\n", output::entry_line(&target)));
        for related in &references {
            text.push_str(&format!(
                "  - {} at {}:{} [{}]\n",
                related.symbol.name, related.location.file, related.location.line,
                related.edge_kind.as_str()
            ));
        }
        output::push_footer(&mut text);

        let entries: Vec<serde_json::Value> = references
            .iter()
            .map(|related| {
                serde_json::json!({
                    "from": related.symbol.name,
                    "from_id": related.symbol.id,
                    "file": related.location.file,
                    "line": related.location.line,
                    "edge_kind": related.edge_kind.as_str(),
                })
            })
            .collect();
        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "symbol": target.name,
                "resolved_id": target.id,
                "total_references": total,
                "references": entries,
            }),
            text,
        )
    }
}
