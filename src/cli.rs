//! atlas - CLI shell over the code-graph query engine.
//!
//! A thin front door for AI coding assistants: load a pre-built snapshot,
//! dispatch one tool by name with a JSON parameter object, print the
//! result.
//!
//! # Usage
//!
//! ```bash
//! # List tools and their parameter schemas
//! atlas tools
//!
//! # Run a query against a snapshot
//! atlas query find_callers --snapshot .atlas/graph.bin \
//!     --params '{"function_name": "parseConfig"}'
//!
//! # Graph and index statistics
//! atlas stats --snapshot .atlas/graph.bin
//!
//! # Diff two snapshots
//! atlas diff .atlas/v1.bin .atlas/v2.bin
//! ```
//!
//! Designed for automation: `--json` outputs machine-readable JSON,
//! errors go to stderr, exit codes: 0 = success, 1 = error.

use crate::analytics::diff_graphs;
use crate::snapshot::load_snapshot;
use crate::tools::{Engine, ToolContext, ToolRegistry};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_SNAPSHOT: &str = ".atlas/graph.bin";

#[derive(Parser)]
#[command(name = "atlas")]
#[command(version)]
#[command(about = "Atlas Code Graph - structural code queries for AI agents")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered tools and their parameter schemas
    Tools,

    /// Run one tool against a snapshot
    Query {
        /// Tool name (see `atlas tools`)
        tool: String,

        /// JSON object of named parameters
        #[arg(long, default_value = "{}")]
        params: String,

        /// Path to the graph snapshot
        #[arg(long, default_value = DEFAULT_SNAPSHOT)]
        snapshot: PathBuf,
    },

    /// Print graph and index statistics for a snapshot
    Stats {
        /// Path to the graph snapshot
        #[arg(long, default_value = DEFAULT_SNAPSHOT)]
        snapshot: PathBuf,
    },

    /// Diff two snapshots
    Diff {
        /// Base snapshot path
        base: PathBuf,

        /// Target snapshot path
        target: PathBuf,
    },
}

fn build_registry(snapshot_path: &PathBuf) -> Result<ToolRegistry> {
    let snapshot = load_snapshot(snapshot_path)?;
    let (graph, index) = snapshot
        .rebuild()
        .with_context(|| format!("Failed to rebuild graph from {}", snapshot_path.display()))?;
    let engine = Arc::new(Engine::new(graph, Some(index))?);
    Ok(ToolRegistry::with_default_tools(engine))
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Tools => {
            // Registry construction needs an engine; an empty frozen graph
            // is enough to enumerate definitions.
            let mut graph = crate::graph::CodeGraph::new();
            graph.freeze();
            let engine = Arc::new(Engine::new(Arc::new(graph), None)?);
            let registry = ToolRegistry::with_default_tools(engine);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&registry.definitions())?);
            } else {
                for definition in registry.definitions() {
                    println!("{:<28} {}", definition.name, definition.description);
                }
            }
        }
        Commands::Query {
            tool,
            params,
            snapshot,
        } => {
            let registry = build_registry(&snapshot)?;
            let params: serde_json::Value =
                serde_json::from_str(&params).context("Failed to parse --params as JSON")?;
            let result = registry.execute(&tool, &ToolContext::default(), params);
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "success": result.success,
                        "output": result.output,
                        "output_text": result.output_text,
                        "tokens_used": result.tokens_used,
                        "trace": result.trace,
                        "error": result.error,
                    }))?
                );
            } else if result.success {
                print!("{}", result.output_text);
            } else {
                bail!(
                    "{} failed: {}",
                    tool,
                    result.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
            if !result.success && cli.json {
                std::process::exit(1);
            }
        }
        Commands::Stats { snapshot } => {
            let loaded = load_snapshot(&snapshot)?;
            let (graph, index) = loaded.rebuild()?;
            let graph_stats = graph.stats();
            let index_stats = index.stats();
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "snapshot_id": loaded.snapshot_id,
                        "graph": graph_stats,
                        "index": index_stats,
                    }))?
                );
            } else {
                println!("Snapshot: {}", loaded.snapshot_id);
                println!(
                    "Graph: {} nodes, {} edges ({} calls), {} components, {} external",
                    graph_stats.nodes,
                    graph_stats.edges,
                    graph_stats.call_edges,
                    graph_stats.components,
                    graph_stats.external_nodes
                );
                println!(
                    "Index: {} symbols ({} callable, {} types) across {} files",
                    index_stats.total_symbols,
                    index_stats.callable_symbols,
                    index_stats.type_symbols,
                    index_stats.files
                );
            }
        }
        Commands::Diff { base, target } => {
            let base_snapshot = load_snapshot(&base)?;
            let target_snapshot = load_snapshot(&target)?;
            let (base_graph, _) = base_snapshot.rebuild()?;
            let (target_graph, _) = target_snapshot.rebuild()?;
            let diff = diff_graphs(
                &base_graph,
                &target_graph,
                &base_snapshot.snapshot_id,
                &target_snapshot.snapshot_id,
            )?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&diff)?);
            } else {
                println!(
                    "Diff {} -> {}: +{} nodes, -{} nodes, {} modified, +{} edges, -{} edges",
                    diff.base_snapshot_id,
                    diff.target_snapshot_id,
                    diff.nodes_added.len(),
                    diff.nodes_removed.len(),
                    diff.nodes_modified.len(),
                    diff.edges_added,
                    diff.edges_removed
                );
                println!(
                    "Change ratio {:.1}%, {} files affected",
                    diff.summary.change_ratio * 100.0,
                    diff.summary.affected_files
                );
                for modified in &diff.nodes_modified {
                    println!("  ~ {} ({:?})", modified.node_id, modified.change_type);
                }
            }
        }
    }

    Ok(())
}
