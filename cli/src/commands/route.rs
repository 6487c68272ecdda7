// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! `switchyard route` - dry-run a routing decision
//!
//! Scores every capable configured source for one query and prints the
//! ranking, factor breakdown and the decision the agent would make. No
//! source is queried.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde_json::Value;
use std::path::PathBuf;

use switchyard_core::application::RouterContext;
use switchyard_core::domain::{DataQuery, Freshness, Priority};
use switchyard_core::RouterConfigManifest;

use crate::simulation::register_simulated_sources;

#[derive(Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    Low,
    Normal,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::High => Priority::High,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FreshnessArg {
    Realtime,
    Normal,
    Stale,
}

impl From<FreshnessArg> for Freshness {
    fn from(value: FreshnessArg) -> Self {
        match value {
            FreshnessArg::Realtime => Freshness::Realtime,
            FreshnessArg::Normal => Freshness::Normal,
            FreshnessArg::Stale => Freshness::Stale,
        }
    }
}

#[derive(Args)]
pub struct RouteCommand {
    /// Dotted query type, e.g. agents.list
    #[arg(value_name = "QUERY_TYPE")]
    query_type: String,

    #[arg(long, value_enum, default_value = "normal")]
    priority: PriorityArg,

    #[arg(long, value_enum, default_value = "normal")]
    freshness: FreshnessArg,

    /// Query parameters as a JSON object
    #[arg(long, value_name = "JSON")]
    params: Option<String>,
}

pub async fn execute(command: RouteCommand, config_path: Option<PathBuf>) -> Result<()> {
    let manifest = RouterConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    manifest.validate().context("Configuration validation failed")?;

    let params: Value = match &command.params {
        Some(raw) => serde_json::from_str(raw).context("--params must be valid JSON")?,
        None => Value::Null,
    };
    let query = DataQuery::new(command.query_type.as_str())
        .with_params(params)
        .with_priority(command.priority.into())
        .with_freshness(command.freshness.into());

    let context = RouterContext::from_config(manifest.spec);
    if register_simulated_sources(&context, 1.0) == 0 {
        anyhow::bail!("No sources configured. Add entries under spec.sources.");
    }

    let engine = context.agent().engine();
    let intent = engine.analyze_intent(&query);
    let candidates = context.registry().get_capable_sources(&intent);
    if candidates.is_empty() {
        println!(
            "{}",
            format!("No configured source can answer '{}'", intent.query_type).red()
        );
        return Ok(());
    }

    let ranked = engine.score_all_sources(&candidates, &intent).await?;
    let decision = engine.decide_ranked(&ranked)?;

    println!(
        "{} {} (domain {}, operation {})",
        "Query:".bold(),
        intent.query_type,
        intent.domain,
        intent.operation
    );
    println!();
    println!(
        "{:<4} {:<20} {:>6}  {:>5} {:>5} {:>5} {:>5} {:>5}",
        "#".bold(),
        "SOURCE".bold(),
        "SCORE".bold(),
        "PERF".bold(),
        "REL".bold(),
        "COST".bold(),
        "FRESH".bold(),
        "HIST".bold()
    );
    for (rank, candidate) in ranked.iter().enumerate() {
        let b = &candidate.breakdown;
        println!(
            "{:<4} {:<20} {:>6.3}  {:>5.2} {:>5.2} {:>5.2} {:>5.2} {:>5.2}",
            rank + 1,
            candidate.source_name(),
            candidate.score,
            b.performance,
            b.reliability,
            b.cost,
            b.freshness,
            b.history
        );
    }
    println!();

    println!(
        "{} {} (confidence {:.0}%)",
        "Selected:".bold(),
        decision.selected_source.name().green(),
        decision.confidence * 100.0
    );
    println!("  {}", decision.reasoning);
    if !decision.alternatives.is_empty() {
        let alternatives: Vec<String> = decision
            .alternatives
            .iter()
            .map(|alt| format!("{} ({:.3})", alt.source, alt.score))
            .collect();
        println!("  Alternatives: {}", alternatives.join(", "));
    }

    Ok(())
}
