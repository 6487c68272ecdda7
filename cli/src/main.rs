// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! # Switchyard CLI
//!
//! The `switchyard` binary inspects router configuration, dry-runs routing
//! decisions and drives the autonomous agent against simulated sources.
//!
//! ## Commands
//!
//! - `switchyard config show|validate|generate` - Configuration management
//! - `switchyard sources` - List configured sources
//! - `switchyard route <QUERY_TYPE>` - Score sources for one query without executing it
//! - `switchyard simulate` - Route a stream of queries and report what was learned

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use switchyard_cli::commands::{self, ConfigCommand, RouteCommand, SimulateCommand, SourcesCommand};
use switchyard_core::RouterConfigManifest;

/// Switchyard - Autonomous source router
#[derive(Parser)]
#[command(name = "switchyard")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "SWITCHYARD_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the manifest's
    #[arg(long, global = true, env = "SWITCHYARD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Serve Prometheus metrics on this port
    #[arg(long, global = true, env = "SWITCHYARD_METRICS_PORT")]
    metrics_port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// List configured sources
    #[command(name = "sources")]
    Sources(SourcesCommand),

    /// Dry-run a routing decision
    #[command(name = "route")]
    Route(RouteCommand),

    /// Route queries through simulated sources
    #[command(name = "simulate")]
    Simulate(SimulateCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // A broken manifest must not prevent `config validate` from reporting it
    let observability = RouterConfigManifest::load_or_default(cli.config.clone())
        .map(|manifest| manifest.spec.observability)
        .unwrap_or_default();
    let level = cli.log_level.as_deref().unwrap_or(&observability.log_level);
    init_logging(level, &observability.log_format)?;

    if let Some(port) = cli.metrics_port {
        init_metrics(port)?;
    }

    match cli.command {
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        Some(Commands::Sources(command)) => commands::sources::execute(command, cli.config).await,
        Some(Commands::Route(command)) => commands::route::execute(command, cli.config).await,
        Some(Commands::Simulate(command)) => commands::simulate::execute(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}

fn init_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    metrics::describe_counter!("switchyard_queries_total", "Queries routed, by serving source and outcome");
    metrics::describe_counter!(
        "switchyard_attempt_failures_total",
        "Failed source attempts, by source and error type"
    );
    metrics::describe_histogram!("switchyard_query_latency_ms", "Latency of successful source attempts");

    info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}
