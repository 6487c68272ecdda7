// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! `switchyard simulate` - drive queries through simulated sources

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use switchyard_core::application::RouterContext;
use switchyard_core::domain::StepOutcome;
use switchyard_core::RouterConfigManifest;

use crate::simulation::{register_simulated_sources, run_simulation, SimulationOptions, SimulationReport};

#[derive(Args)]
pub struct SimulateCommand {
    /// Number of queries to route
    #[arg(short = 'n', long, default_value_t = 100)]
    queries: usize,

    /// Multiplier on each source's estimated latency (0 disables delays)
    #[arg(long, default_value_t = 1.0)]
    latency_scale: f64,

    /// Run the learning loop and health monitor while simulating
    #[arg(long)]
    background: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(command: SimulateCommand, config_path: Option<PathBuf>) -> Result<()> {
    let manifest = RouterConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    manifest.validate().context("Configuration validation failed")?;

    let context = RouterContext::from_config(manifest.spec);
    let registered = register_simulated_sources(&context, command.latency_scale);
    if registered == 0 {
        anyhow::bail!("No sources configured. Add entries under spec.sources or run `switchyard config generate --examples`.");
    }

    let tasks = command.background.then(|| context.start_background_tasks());

    let options = SimulationOptions {
        queries: command.queries,
        latency_scale: command.latency_scale,
    };
    let report = run_simulation(&context, &options).await;

    if let Some(tasks) = tasks {
        tasks.shutdown().await;
    }
    let report = report?;

    if command.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("{}", "Simulation".bold());
    println!(
        "  Queries: {}  {}  {}",
        report.queries,
        format!("{} succeeded", report.succeeded).green(),
        if report.failed > 0 {
            format!("{} failed", report.failed).red()
        } else {
            "0 failed".normal()
        }
    );
    for (source, count) in &report.served_by {
        println!("  {:<20} served {}", source, count);
    }
    println!();

    println!("{}", "Decisions".bold());
    println!("  Total: {}", report.stats.total_decisions);
    println!("  Average confidence: {:.0}%", report.stats.average_confidence * 100.0);
    for top in &report.stats.top_sources {
        println!("  {:<20} selected {}", top.source, top.count);
    }
    println!();

    println!("{}", "Source intelligence".bold());
    for intel in &report.intelligence {
        let latency = intel
            .average_latency_ms
            .map(|ms| format!("{ms:.1}ms"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "  {:<20} latency {:>9}  success {:>6.2}%  recent failures {}",
            intel.source_name,
            latency,
            intel.overall_success_rate * 100.0,
            intel.recent_failures
        );
        for (error_type, paths) in &intel.known_recovery_paths {
            for path in paths {
                println!(
                    "    recovers from {} via {} ({:.0}%)",
                    error_type,
                    path.action,
                    path.success_rate * 100.0
                );
            }
        }
    }
    println!("  Health snapshots recorded: {}", report.health_checked);
    println!();

    let learning = &report.learning;
    println!("{}", "Learning cycle".bold());
    for (step, outcome) in [
        ("decision quality", &learning.decision_quality),
        ("pattern identification", &learning.pattern_identification),
        ("prediction refresh", &learning.prediction_refresh),
    ] {
        match outcome {
            StepOutcome::Completed { detail } => println!("  {} {}: {}", "✓".green(), step, detail),
            StepOutcome::Failed { error } => println!("  {} {}: {}", "✗".red(), step, error),
        }
    }
    if !learning.degraded_sources.is_empty() {
        println!(
            "  {} {}",
            "Degraded:".yellow(),
            learning.degraded_sources.join(", ")
        );
    }
    if !learning.confident_widgets.is_empty() {
        println!("  Confident widgets: {}", learning.confident_widgets.join(", "));
    }
}
