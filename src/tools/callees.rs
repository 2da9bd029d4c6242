//! `find_callees`: what a function calls.
//!
//! Results are classified into in-codebase and external callees, both
//! de-duplicated. A query that resolves to a type alias gets an explicit
//! explanation instead of an empty list.

use super::{
    Engine, Tool, ToolCategory, ToolContext, ToolDefinition, ToolResult, clamp_limit,
    parse_params, record_resolution, resolve_symbol, tool_failure, tool_success,
    validate_symbol_name,
};
use crate::output;
use crate::resolver::{KindFilter, ResolveOptions};
use crate::types::{RelatedSymbol, SymbolKind, TraceStep};
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindCalleesParams {
    /// Function or method name; `Type.Method` dotted form accepted.
    pub function_name: String,
    /// Maximum callees to return (clamped to 1..=1000).
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, serde::Serialize)]
struct CalleeEntry {
    name: String,
    kind: String,
    file: String,
    line: u32,
    package: String,
}

pub struct FindCalleesTool {
    engine: Arc<Engine>,
}

impl FindCalleesTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Tool for FindCalleesTool {
    fn name(&self) -> &'static str {
        "find_callees"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Query
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Find everything a function calls, split into in-codebase and external callees.",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(FindCalleesParams))
                .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_callees", self.name(), "");

        let params: FindCalleesParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.target = params.function_name.clone();
        if let Err(e) = validate_symbol_name(&params.function_name) {
            return tool_failure(trace, started, e);
        }
        let limit = clamp_limit(params.limit);

        // Resolve unfiltered first: an exact hit on a non-callable (for
        // instance a type alias) must explain itself rather than letting a
        // fuzzy callable match shadow it.
        let unfiltered = resolve_symbol(&self.engine, &params.function_name, &ResolveOptions::default());
        let callable_opts = ResolveOptions {
            kind: Some(KindFilter::Callable),
            bare_method_fallback: true,
            ..Default::default()
        };
        let resolved = match unfiltered {
            Some(r) if r.candidates[0].kind == SymbolKind::Type => Some(r),
            Some(r) if r.candidates[0].kind.is_callable() => Some(r),
            other => resolve_symbol(&self.engine, &params.function_name, &callable_opts).or(other),
        };
        let Some(resolved) = resolved else {
            trace.insert("total_callees", 0);
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "function": params.function_name }),
                output::symbol_not_found(&params.function_name),
            );
        };
        record_resolution(&mut trace, &resolved);
        let target = resolved.candidates[0].clone();

        if target.kind == SymbolKind::Type {
            trace.insert("total_callees", 0);
            let text = output::not_found(&format!(
                "'{}' is a type alias and has no callees. Use find_references to see where it is used.",
                target.name
            ));
            return tool_success(
                trace,
                started,
                serde_json::json!({
                    "found": true,
                    "function": target.name,
                    "resolved_id": target.id,
                    "is_type_alias": true,
                    "total_callees": 0,
                }),
                text,
            );
        }

        let callees = match self
            .engine
            .graph
            .find_callees_by_id(&target.id, limit, &ctx.cancel)
        {
            Ok(callees) => callees,
            Err(e) => return tool_failure(trace, started, e),
        };

        // De-duplicate by callee id, preserving first-seen order.
        let mut seen = HashSet::new();
        let mut internal: Vec<&RelatedSymbol> = Vec::new();
        let mut external: Vec<&RelatedSymbol> = Vec::new();
        for related in &callees {
            if !seen.insert(related.symbol.id.clone()) {
                continue;
            }
            if related.symbol.is_external() {
                external.push(related);
            } else {
                internal.push(related);
            }
        }

        let total = internal.len() + external.len();
        trace.insert("total_callees", total);
        trace.insert("external_callees", external.len());

        if total == 0 {
            let mut text = format!(
                "{} No callees of '{}' found.\n{} calls nothing in the indexed codebase.\n",
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
                    "function": target.name,
                    "resolved_id": target.id,
                    "total_callees": 0,
                }),
                text,
            );
        }

        let mut text = format!("Found {} callees of '{}':\n\n", total, target.name);
        text.push_str(&format!("{}\n", output::entry_line(&target)));
        if !internal.is_empty() {
            text.push_str("In codebase:\n");
            for related in &internal {
                text.push_str(&format!(
                    "  - {} [call at {}:{}]\n",
                    output::entry_line(&related.symbol),
                    related.location.file,
                    related.location.line
                ));
            }
        }
        if !external.is_empty() {
            text.push_str("External:\n");
            for related in &external {
                let package = if related.symbol.package.is_empty() {
                    "unknown package".to_string()
                } else {
                    related.symbol.package.clone()
                };
                text.push_str(&format!(
                    "  - {} ({}) [call at {}:{}]\n",
                    related.symbol.name, package, related.location.file, related.location.line
                ));
            }
        }
        output::push_footer(&mut text);

        let entry = |related: &&RelatedSymbol| CalleeEntry {
            name: related.symbol.name.clone(),
            kind: related.symbol.kind.to_string(),
            file: related.symbol.file_path.clone(),
            line: related.symbol.start_line,
            package: related.symbol.package.clone(),
        };
        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "function": target.name,
                "resolved_id": target.id,
                "total_callees": total,
                "in_codebase": internal.iter().map(entry).collect::<Vec<_>>(),
                "external": external.iter().map(entry).collect::<Vec<_>>(),
            }),
            text,
        )
    }
}
