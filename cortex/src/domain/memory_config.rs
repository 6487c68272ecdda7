// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Tunables for the cognitive memory. Every window and threshold the
//! memory uses to summarize history lives here so it can be set from the
//! router manifest.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::health::MAX_HEALTH_RECORDS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Window for average latency of successful queries
    #[serde(with = "humantime_serde", default = "default_latency_window")]
    pub latency_window: Duration,

    /// Window for per-(source, query type) success rates
    #[serde(with = "humantime_serde", default = "default_week")]
    pub success_window: Duration,

    /// Window for per-widget usage patterns
    #[serde(with = "humantime_serde", default = "default_week")]
    pub pattern_window: Duration,

    /// Window for failure statistics and the smoothed success estimate
    #[serde(with = "humantime_serde", default = "default_week")]
    pub failure_stats_window: Duration,

    /// A (source, error type) pair is recurring when it occurs at least
    /// `recurring_threshold` times within this window
    #[serde(with = "humantime_serde", default = "default_recurring_window")]
    pub recurring_window: Duration,

    #[serde(default = "default_recurring_threshold")]
    pub recurring_threshold: usize,

    /// How many similar past queries feed the history score
    #[serde(default = "default_similar_query_limit")]
    pub similar_query_limit: usize,

    /// Minimum parameter-shape similarity for a past query to count
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,

    /// Score reported when there is no history to judge from
    #[serde(default = "default_neutral_score")]
    pub neutral_score: f64,

    /// Pseudo-count `k` in the smoothed success estimate `1 - f / (f + k)`
    #[serde(default = "default_success_smoothing")]
    pub success_smoothing: f64,

    /// Cap on the failure history consulted for "recent failures"
    #[serde(default = "default_recent_failure_limit")]
    pub recent_failure_limit: usize,

    /// Per-source health ring buffer capacity
    #[serde(default = "default_max_health_records")]
    pub max_health_records: usize,

    /// In-memory retention cap for query patterns (oldest evicted first)
    #[serde(default = "default_max_patterns")]
    pub max_patterns: usize,

    /// In-memory retention cap for failures (oldest evicted first)
    #[serde(default = "default_max_failures")]
    pub max_failures: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            latency_window: default_latency_window(),
            success_window: default_week(),
            pattern_window: default_week(),
            failure_stats_window: default_week(),
            recurring_window: default_recurring_window(),
            recurring_threshold: default_recurring_threshold(),
            similar_query_limit: default_similar_query_limit(),
            min_similarity: default_min_similarity(),
            neutral_score: default_neutral_score(),
            success_smoothing: default_success_smoothing(),
            recent_failure_limit: default_recent_failure_limit(),
            max_health_records: default_max_health_records(),
            max_patterns: default_max_patterns(),
            max_failures: default_max_failures(),
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.recurring_threshold == 0 {
            anyhow::bail!("memory.recurring_threshold must be at least 1");
        }
        if self.max_health_records == 0 {
            anyhow::bail!("memory.max_health_records must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.min_similarity) {
            anyhow::bail!("memory.min_similarity must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.neutral_score) {
            anyhow::bail!("memory.neutral_score must be within [0, 1]");
        }
        if self.success_smoothing < 0.0 {
            anyhow::bail!("memory.success_smoothing cannot be negative");
        }
        Ok(())
    }
}

fn default_latency_window() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_week() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

fn default_recurring_window() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_recurring_threshold() -> usize {
    3
}

fn default_similar_query_limit() -> usize {
    10
}

fn default_min_similarity() -> f64 {
    0.5
}

fn default_neutral_score() -> f64 {
    0.5
}

fn default_success_smoothing() -> f64 {
    1000.0
}

fn default_recent_failure_limit() -> usize {
    10
}

fn default_max_health_records() -> usize {
    MAX_HEALTH_RECORDS
}

fn default_max_patterns() -> usize {
    50_000
}

fn default_max_failures() -> usize {
    10_000
}
