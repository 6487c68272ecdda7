// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! `switchyard sources` - list the sources declared in the manifest

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use switchyard_core::RouterConfigManifest;

#[derive(Args)]
pub struct SourcesCommand {
    /// Print descriptors as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(command: SourcesCommand, config_path: Option<PathBuf>) -> Result<()> {
    let manifest = RouterConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    let sources = &manifest.spec.sources;

    if command.json {
        println!("{}", serde_json::to_string_pretty(sources)?);
        return Ok(());
    }

    if sources.is_empty() {
        println!("{}", "No sources configured. Add entries under spec.sources.".yellow());
        return Ok(());
    }

    println!(
        "{:<20} {:<10} {:>10} {:>8} {:>9}  {}",
        "NAME".bold(),
        "TYPE".bold(),
        "LATENCY".bold(),
        "COST".bold(),
        "FAILURE".bold(),
        "CAPABILITIES".bold()
    );
    for source in sources {
        let descriptor = &source.descriptor;
        let capabilities: Vec<String> = descriptor.capabilities.iter().map(ToString::to_string).collect();
        let name = if source.healthy {
            descriptor.name.normal()
        } else {
            descriptor.name.red()
        };
        println!(
            "{:<20} {:<10} {:>8}ms {:>8.3} {:>8.0}%  {}",
            name,
            descriptor.source_type.as_str(),
            descriptor.estimated_latency_ms,
            descriptor.cost_per_query,
            source.failure_rate * 100.0,
            capabilities.join(", ")
        );
    }

    Ok(())
}
