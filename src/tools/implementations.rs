//! `find_implementations`: who implements an interface, extends a class,
//! or embeds a struct.

use super::{
    Engine, Tool, ToolCategory, ToolContext, ToolDefinition, ToolResult, clamp_limit,
    parse_params, record_resolution, resolve_symbol, tool_failure, tool_success,
    validate_symbol_name,
};
use crate::output;
use crate::resolver::{KindFilter, ResolveOptions};
use crate::types::{SymbolKind, TraceStep};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindImplementationsParams {
    /// Interface, class, or struct name.
    pub interface_name: String,
    /// Maximum implementations to return (clamped to 1..=1000).
    #[serde(default)]
    pub limit: Option<u64>,
    /// Module or directory hint to narrow ambiguous names.
    #[serde(default)]
    pub package_hint: Option<String>,
}

fn target_label(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Class => "Base class",
        SymbolKind::Struct => "Struct",
        _ => "Interface",
    }
}

pub struct FindImplementationsTool {
    engine: Arc<Engine>,
}

impl FindImplementationsTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Tool for FindImplementationsTool {
    fn name(&self) -> &'static str {
        "find_implementations"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Query
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Find implementations of an interface, subclasses of a class, or embedders of a struct.",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(FindImplementationsParams))
                .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_implementations", self.name(), "");

        let params: FindImplementationsParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.target = params.interface_name.clone();
        if let Err(e) = validate_symbol_name(&params.interface_name) {
            return tool_failure(trace, started, e);
        }
        let limit = clamp_limit(params.limit);

        let opts = ResolveOptions {
            kind: Some(KindFilter::TypeLike),
            package_hint: params.package_hint.clone(),
            ..Default::default()
        };
        let Some(resolved) = resolve_symbol(&self.engine, &params.interface_name, &opts) else {
            trace.insert("total_implementations", 0);
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "interface": params.interface_name }),
                output::symbol_not_found(&params.interface_name),
            );
        };
        record_resolution(&mut trace, &resolved);
        let target = resolved.candidates[0].clone();
        let label = target_label(target.kind);

        let implementations = match self.engine.graph.find_implementations_by_id(
            &target.id,
            limit,
            &ctx.cancel,
        ) {
            Ok(implementations) => implementations,
            Err(e) => return tool_failure(trace, started, e),
        };
        let total = implementations.len();
        trace.insert("total_implementations", total);

        if total == 0 {
            let mut text = format!(
                "{} No implementations of '{}' found.\n{}: {}\n",
                output::NOT_FOUND_PREFIX,
                target.name,
                label,
                output::entry_line(&target),
            );
            output::push_footer(&mut text);
            return tool_success(
                trace,
                started,
                serde_json::json!({
                    "found": true,
                    "interface": target.name,
                    "resolved_id": target.id,
                    "total_implementations": 0,
                }),
                text,
            );
        }

        let mut text = format!(
            "Found {} implementations of '{}':\n\n{}: {}\n",
            total,
            target.name,
            label,
            output::entry_line(&target)
        );
        for related in &implementations {
            text.push_str(&format!(
                "  - {} [{}]\n",
                output::entry_line(&related.symbol),
                related.edge_kind.as_str()
            ));
        }
        output::push_footer(&mut text);

        let entries: Vec<serde_json::Value> = implementations
            .iter()
            .map(|related| {
                serde_json::json!({
                    "name": related.symbol.name,
                    "kind": related.symbol.kind.to_string(),
                    "file": related.symbol.file_path,
                    "line": related.symbol.start_line,
                    "relation": related.edge_kind.as_str(),
                })
            })
            .collect();
        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "interface": target.name,
                "resolved_id": target.id,
                "target_kind": target.kind.to_string(),
                "total_implementations": total,
                "implementations": entries,
            }),
            text,
        )
    }
}
