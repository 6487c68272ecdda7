// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use switchyard_core::domain::router_config::CONFIG_PATH_ENV;
use switchyard_core::RouterConfigManifest;

pub const MINIMAL_TEMPLATE: &str = include_str!("../../templates/config-minimal.yaml");
pub const EXAMPLES_TEMPLATE: &str = include_str!("../../templates/config-with-examples.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective manifest as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./switchyard.yaml")]
        output: PathBuf,

        /// Include simulated sources and every tunable
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let manifest =
        RouterConfigManifest::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./switchyard.yaml");
        println!("  4. ~/.switchyard/config.yaml");
        println!("  5. /etc/switchyard/config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", manifest.to_yaml_string()?);
        return Ok(());
    }

    let spec = &manifest.spec;
    println!("{} {}", "Router:".bold(), manifest.metadata.name);
    if let Some(version) = &manifest.metadata.version {
        println!("  Version: {}", version);
    }
    println!();

    println!("{}", "Decision:".bold());
    println!("  Latency ceiling: {}ms", spec.decision.latency_ceiling_ms);
    println!("  Max cost per query: {}", spec.decision.max_cost_per_query);
    println!("  Recurring penalty: {}", spec.decision.recurring_penalty);
    println!("  Neutral prior: {}", spec.decision.neutral_prior);
    println!();

    println!("{}", "Agent:".bold());
    match spec.agent.attempt_timeout {
        Some(timeout) => println!("  Attempt timeout: {:?}", timeout),
        None => println!("  Attempt timeout: {}", "(none)".dimmed()),
    }
    println!("  Prefetch threshold: {}", spec.agent.prefetch_confidence_threshold);
    println!("  Prediction TTL: {:?}", spec.agent.prediction_ttl);
    println!();

    println!("{}", "Background tasks:".bold());
    println!(
        "  Learning: {} (every {:?}, warm-up {:?})",
        enabled(spec.learning.enabled),
        spec.learning.interval,
        spec.learning.warmup_delay
    );
    println!(
        "  Health monitor: {} (every {:?})",
        enabled(spec.health_monitor.enabled),
        spec.health_monitor.interval
    );
    println!("  Self-healing: {}", enabled(spec.self_healing.enabled));
    println!();

    println!("{} {}", "Sources:".bold(), spec.sources.len());
    for source in &spec.sources {
        println!(
            "  {} ({}) ~{}ms",
            source.descriptor.name.bold(),
            source.descriptor.source_type.as_str(),
            source.descriptor.estimated_latency_ms
        );
    }

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let manifest = RouterConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    manifest.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        EXAMPLES_TEMPLATE
    } else {
        MINIMAL_TEMPLATE
    };

    std::fs::write(&output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}

fn enabled(flag: bool) -> colored::ColoredString {
    if flag {
        "enabled".green()
    } else {
        "disabled".yellow()
    }
}
