//! Atlas entry point.
//!
//! Initializes logging to stderr (results go to stdout) and hands off to
//! the CLI.

use anyhow::Result;
use std::io::IsTerminal;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("atlas_graph=info".parse().expect("static directive")),
        )
        .init();

    atlas_graph::cli::run()
}
