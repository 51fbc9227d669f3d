//! Lens Replay - Main Entry Point
//!
//! Usage: `lens-replay [scenario.json | -]`. Events are written to stdout as
//! JSON lines; diagnostics go to stderr (`RUST_LOG` overrides the `info`
//! default).

use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use lens_replay::Scenario;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let source = std::env::args().nth(1).unwrap_or_else(|| "-".to_string());
    let json = if source == "-" {
        let mut json = String::new();
        io::stdin()
            .read_to_string(&mut json)
            .context("failed to read scenario from stdin")?;
        json
    } else {
        std::fs::read_to_string(&source).with_context(|| format!("failed to read {source}"))?
    };

    let scenario = Scenario::from_json(&json)?;
    tracing::info!(source = %source, steps = scenario.steps.len(), "replaying scenario");

    let events = lens_replay::run(&scenario)?;

    let mut out = io::stdout().lock();
    for event in &events {
        serde_json::to_writer(&mut out, event)?;
        writeln!(out)?;
    }
    tracing::info!(events = events.len(), "replay finished");
    Ok(())
}
