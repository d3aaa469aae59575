//! Runs the reference tools through the governed lane and logs the envelopes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use governed_lane::config::LaneConfig;
use governed_lane::runner::{GovernedRunner, RunnerRequest, TracingEventSink, run_request};
use governed_lane::telemetry::init_tracing;
use governed_lane::tools::reference::{reference_catalog, register_reference_tools};
use governed_lane::tools::registry::ToolRegistry;
use serde_json::json;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Governed execution lane demo")]
struct Args {
    /// Optional JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => LaneConfig::from_path(path)?,
        None => LaneConfig::default(),
    };
    init_tracing(&config)?;

    info!("=== Governed lane: basic example ===");

    // Envelope builder on its own: echoes the input.
    let request = RunnerRequest::new("fetch")
        .with_request_id("r1")
        .with_run_id("g1")
        .with_input(json!({"bucket": "b", "key": "k"}));
    let response = run_request(&request);
    info!("echo envelope: {}", serde_json::to_string_pretty(&response)?);

    // Governed lane with the reference tools registered.
    let tools = Arc::new(ToolRegistry::new());
    register_reference_tools(&tools)?;
    let runner = GovernedRunner::new(tools)
        .with_config(config)
        .with_event_sink(Arc::new(TracingEventSink));

    for entry in reference_catalog()?.tools() {
        let request = RunnerRequest::new(entry.tool_id().as_str())
            .with_request_id(format!("demo-{}", entry.tool_id()))
            .with_run_id("demo-run")
            .with_input(entry.request_example().clone());
        let response = runner.run(&request).await;
        info!("{}: {}", entry.name(), serde_json::to_string_pretty(&response)?);
    }

    // Unknown tools come back as an error envelope, not a failure.
    let response = runner.run(&RunnerRequest::new("delete_bucket")).await;
    info!("unknown tool: {}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
