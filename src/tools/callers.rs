//! `find_callers`: who calls a function.
//!
//! Inheritance-aware when an index is available: the upstream walk also
//! surfaces callers of same-named methods on ancestor classes, partitioned
//! per parent so the consumer can tell direct from inherited call sites.

use super::{
    Engine, Tool, ToolCategory, ToolContext, ToolDefinition, ToolResult, clamp_limit,
    parse_params, record_resolution, resolve_symbol, tool_failure, tool_success,
    validate_symbol_name,
};
use crate::index::SymbolIndex;
use crate::output;
use crate::resolver::{KindFilter, ResolveOptions};
use crate::types::{RelatedSymbol, Symbol, TraceStep};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindCallersParams {
    /// Function or method name; `Type.Method` dotted form accepted.
    pub function_name: String,
    /// Maximum callers to return (clamped to 1..=1000).
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, serde::Serialize)]
struct CallerEntry {
    name: String,
    kind: String,
    file: String,
    line: u32,
    call_site: String,
}

impl CallerEntry {
    fn from_related(related: &RelatedSymbol) -> Self {
        Self {
            name: related.symbol.name.clone(),
            kind: related.symbol.kind.to_string(),
            file: related.symbol.file_path.clone(),
            line: related.symbol.start_line,
            call_site: format!("{}:{}", related.location.file, related.location.line),
        }
    }
}

/// Ids of same-named methods on ancestor types of the resolved method's
/// receiver, closest ancestor first. Depth-capped like the resolver walk.
fn parent_method_ids(index: &SymbolIndex, symbol: &Symbol) -> Vec<String> {
    let mut ids = Vec::new();
    if symbol.receiver.is_empty() {
        return ids;
    }
    let mut current = symbol.receiver.clone();
    for _ in 0..10 {
        let Some(owner) = index
            .get_by_name(&current)
            .into_iter()
            .find(|s| s.kind.is_type_like())
        else {
            break;
        };
        let Some(parent_name) = owner.metadata.extends.clone() else {
            break;
        };
        let parent_method = index
            .get_by_name(&symbol.name)
            .into_iter()
            .find(|s| s.receiver == parent_name && s.kind.is_callable())
            .or_else(|| {
                index.get_by_name(&parent_name).into_iter().find_map(|t| {
                    t.children
                        .iter()
                        .find(|c| c.name == symbol.name && c.kind.is_callable())
                        .and_then(|c| index.get_by_id(&c.id))
                })
            });
        if let Some(method) = parent_method {
            ids.push(method.id.clone());
        }
        current = parent_name;
    }
    ids
}

pub struct FindCallersTool {
    engine: Arc<Engine>,
}

impl FindCallersTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Tool for FindCallersTool {
    fn name(&self) -> &'static str {
        "find_callers"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Query
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Find all callers of a function, including callers inherited through parent-class methods.",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(FindCallersParams))
                .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_callers", self.name(), "");

        let params: FindCallersParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.target = params.function_name.clone();
        if let Err(e) = validate_symbol_name(&params.function_name) {
            return tool_failure(trace, started, e);
        }
        let limit = clamp_limit(params.limit);

        let opts = ResolveOptions {
            kind: Some(KindFilter::Callable),
            bare_method_fallback: true,
            ..Default::default()
        };
        let Some(resolved) = resolve_symbol(&self.engine, &params.function_name, &opts) else {
            trace.insert("total_callers", 0);
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "function": params.function_name }),
                output::symbol_not_found(&params.function_name),
            );
        };
        record_resolution(&mut trace, &resolved);
        let target = resolved.candidates[0].clone();

        let parents = match &self.engine.index {
            Some(index) => parent_method_ids(index, &target),
            None => Vec::new(),
        };

        let callers = match self.engine.graph.find_callers_with_inheritance(
            &target.id,
            &parents,
            limit,
            &ctx.cancel,
        ) {
            Ok(callers) => callers,
            Err(e) => return tool_failure(trace, started, e),
        };

        let total = callers.total();
        trace.insert("total_callers", total);

        if total == 0 {
            let mut text = format!(
                "{} No callers of '{}' found.\n{} is never called in the indexed codebase.\n",
                output::NOT_FOUND_PREFIX,
                params.function_name,
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
                    "total_callers": 0,
                }),
                text,
            );
        }

        let direct: Vec<CallerEntry> = callers.direct.iter().map(CallerEntry::from_related).collect();
        let mut inherited_json = serde_json::Map::new();
        let mut text = format!("Found {} callers of '{}':\n\n", total, target.name);
        text.push_str(&format!("{}\n", output::entry_line(&target)));

        if !callers.direct.is_empty() {
            text.push_str("Direct callers:\n");
            for related in &callers.direct {
                text.push_str(&format!(
                    "  - {} [call at {}:{}]\n",
                    output::entry_line(&related.symbol),
                    related.location.file,
                    related.location.line
                ));
            }
        }

        for (parent_id, group) in &callers.inherited {
            let label = self
                .engine
                .graph
                .get_node(parent_id)
                .map(|p| {
                    if p.receiver.is_empty() {
                        p.name.clone()
                    } else {
                        format!("{}.{}", p.receiver, p.name)
                    }
                })
                .unwrap_or_else(|| parent_id.clone());
            text.push_str(&format!("\nInherited callers (via {label}):\n"));
            for related in group {
                text.push_str(&format!(
                    "  - {} [call at {}:{}]\n",
                    output::entry_line(&related.symbol),
                    related.location.file,
                    related.location.line
                ));
            }
            inherited_json.insert(
                parent_id.clone(),
                serde_json::to_value(group.iter().map(CallerEntry::from_related).collect::<Vec<_>>())
                    .unwrap_or_default(),
            );
        }
        output::push_footer(&mut text);

        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "function": target.name,
                "resolved_id": target.id,
                "total_callers": total,
                "direct": direct,
                "inherited": inherited_json,
            }),
            text,
        )
    }
}
