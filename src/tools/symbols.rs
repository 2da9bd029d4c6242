//! `find_symbol`: every match for a name, with cross-language kind
//! matching (`class` also surfaces structs, `struct` also surfaces classes
//! and interfaces, and so on).

use super::{
    Engine, Tool, ToolCategory, ToolContext, ToolDefinition, ToolResult, parse_params,
    tool_failure, tool_success, validate_symbol_name,
};
use crate::error::QueryError;
use crate::output;
use crate::resolver::{KindFilter, kind_cross_matches};
use crate::types::{Symbol, TraceStep};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindSymbolParams {
    /// Symbol name to look up.
    pub name: String,
    /// Kind filter: all, function, method, class, struct, interface, type,
    /// property, enum, variable, constant, external.
    #[serde(default)]
    pub kind: Option<String>,
}

pub struct FindSymbolTool {
    engine: Arc<Engine>,
}

impl FindSymbolTool {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    fn matches_by_name(&self, name: &str) -> Vec<Arc<Symbol>> {
        match &self.engine.index {
            Some(index) => index.get_by_name(name),
            None => self.engine.graph.get_nodes_by_name(name),
        }
    }
}

impl Tool for FindSymbolTool {
    fn name(&self) -> &'static str {
        "find_symbol"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Query
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Look up symbol definitions by name with a cross-language kind filter.",
            category: self.category(),
            params_schema: serde_json::to_value(schemars::schema_for!(FindSymbolParams))
                .unwrap_or_default(),
        }
    }

    fn execute(&self, ctx: &ToolContext, params: serde_json::Value) -> ToolResult {
        let started = Instant::now();
        let mut trace = TraceStep::new("find_symbol", self.name(), "");

        let params: FindSymbolParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return tool_failure(trace, started, e),
        };
        trace.target = params.name.clone();
        if let Err(e) = validate_symbol_name(&params.name) {
            return tool_failure(trace, started, e);
        }
        if let Err(e) = ctx.cancel.check() {
            return tool_failure(trace, started, e);
        }

        let kind = params.kind.as_deref().unwrap_or("all");
        // The cross-matching table accepts everything the strict filter
        // does; anything else is out of the enumeration.
        if KindFilter::parse(kind).is_none() {
            return tool_failure(
                trace,
                started,
                QueryError::InvalidArgument(format!("unrecognized kind filter: {kind}")),
            );
        }
        trace.insert("kind_filter", kind);

        let matches: Vec<Arc<Symbol>> = self
            .matches_by_name(params.name.trim())
            .into_iter()
            .filter(|s| kind_cross_matches(kind, s.kind))
            .collect();
        trace.insert("total_matches", matches.len());

        if matches.is_empty() {
            return tool_success(
                trace,
                started,
                serde_json::json!({ "found": false, "name": params.name }),
                output::symbol_not_found(&params.name),
            );
        }

        let mut text = format!("Found {} symbols named '{}':\n\n", matches.len(), params.name);
        for symbol in &matches {
            text.push_str(&format!("  - {}", output::entry_line(symbol)));
            if let Some(signature) = &symbol.signature {
                text.push_str(&format!("  {signature}"));
            }
            if symbol.exported {
                text.push_str("  [exported]");
            }
            text.push('\n');
        }
        output::push_footer(&mut text);

        let entries: Vec<serde_json::Value> = matches
            .iter()
            .map(|symbol| {
                serde_json::json!({
                    "id": symbol.id,
                    "name": symbol.name,
                    "kind": symbol.kind.to_string(),
                    "file": symbol.file_path,
                    "line": symbol.start_line,
                    "package": symbol.package,
                    "exported": symbol.exported,
                    "signature": symbol.signature,
                })
            })
            .collect();
        tool_success(
            trace,
            started,
            serde_json::json!({
                "found": true,
                "name": params.name,
                "total_matches": entries.len(),
                "symbols": entries,
            }),
            text,
        )
    }
}
