// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # CognitiveMemory: what has happened, summarized for routing
//!
//! Facade over [`PatternMemory`], [`FailureMemory`] and the per-source
//! health history. It is the single source of truth the decision engine,
//! the agent's learning cycle and the health monitor read from.
//!
//! ## Read paths
//!
//! Reads used while scoring a request are lenient: a repository error is
//! logged with `warn!` and the neutral value is returned, so a broken store
//! degrades routing quality instead of failing requests. The reads the
//! learning cycle depends on (`known_widgets`, `outcome_summary`, ...)
//! return `Result` so each learning step can report its own failure.
//!
//! ## Write paths
//!
//! Every `record_*` returns `anyhow::Result`; the caller decides whether a
//! failed write is worth more than a log line.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{FailureMemory, PatternMemory};
use crate::domain::{
    smoothed_success_rate, Failure, FailureReport, FailureStats, HealthMetrics, LatencyPercentiles,
    MemoryConfig, OutcomeSummary, QueryOutcome, RecoveryPath, SimilarQuery, SourceIntelligence,
    UsagePattern, UserContext,
};
use crate::infrastructure::{
    FailureRepository, HealthRepository, InMemoryFailureRepository, InMemoryHealthRepository,
    InMemoryPatternRepository, PatternRepository,
};

/// Default number of health snapshots returned by [`CognitiveMemory::get_health_history`]
pub const DEFAULT_HEALTH_HISTORY_LIMIT: usize = 100;

/// Records removed by one [`CognitiveMemory::cleanup`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub patterns: usize,
    pub failures: usize,
    pub health_records: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.patterns + self.failures + self.health_records
    }
}

pub struct CognitiveMemory {
    patterns: PatternMemory,
    failures: FailureMemory,
    health: Arc<dyn HealthRepository>,
    config: MemoryConfig,
}

impl CognitiveMemory {
    pub fn new(
        pattern_repo: Arc<dyn PatternRepository>,
        failure_repo: Arc<dyn FailureRepository>,
        health_repo: Arc<dyn HealthRepository>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            patterns: PatternMemory::new(pattern_repo, config.clone()),
            failures: FailureMemory::new(failure_repo, config.clone()),
            health: health_repo,
            config,
        }
    }

    /// Memory backed by the bounded in-memory repositories
    pub fn in_memory(config: MemoryConfig) -> Self {
        Self::new(
            Arc::new(InMemoryPatternRepository::with_capacity(config.max_patterns)),
            Arc::new(InMemoryFailureRepository::with_capacity(config.max_failures)),
            Arc::new(InMemoryHealthRepository::with_capacity(config.max_health_records)),
            config,
        )
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn patterns(&self) -> &PatternMemory {
        &self.patterns
    }

    pub fn failures(&self) -> &FailureMemory {
        &self.failures
    }

    // ========================================================================
    // Query patterns
    // ========================================================================

    pub async fn record_query(&self, outcome: QueryOutcome) -> Result<()> {
        self.patterns.record(outcome).await.map(|_| ())
    }

    pub async fn get_average_latency(&self, source_name: &str) -> Option<f64> {
        lenient(
            self.patterns.average_latency(source_name).await,
            "average latency",
            source_name,
            None,
        )
    }

    pub async fn get_success_rate(&self, source_name: &str, query_type: &str) -> Option<f64> {
        lenient(
            self.patterns.success_rate(source_name, query_type).await,
            "success rate",
            source_name,
            None,
        )
    }

    pub async fn find_similar_queries(&self, query_type: &str, params: &Value, limit: usize) -> Vec<SimilarQuery> {
        lenient(
            self.patterns.find_similar(query_type, params, limit).await,
            "similar queries",
            query_type,
            Vec::new(),
        )
    }

    /// Success ratio among the most similar past queries, or the neutral
    /// score when there is nothing to compare against.
    pub async fn get_similar_query_success(
        &self,
        query_type: &str,
        params: &Value,
        source_name: Option<&str>,
    ) -> f64 {
        lenient(
            self.patterns.similar_query_success(query_type, params, source_name).await,
            "similar query success",
            source_name.unwrap_or(query_type),
            None,
        )
        .unwrap_or(self.config.neutral_score)
    }

    pub async fn get_widget_patterns(&self, widget_id: &str) -> UsagePattern {
        lenient(
            self.patterns.widget_patterns(widget_id).await,
            "widget patterns",
            widget_id,
            UsagePattern::empty(widget_id),
        )
    }

    pub async fn known_widgets(&self) -> Result<Vec<String>> {
        self.patterns.known_widgets().await
    }

    pub async fn known_sources(&self) -> Result<Vec<String>> {
        self.patterns.known_sources().await
    }

    pub async fn outcome_summary(&self, source_name: &str) -> Result<OutcomeSummary> {
        self.patterns.outcome_summary(source_name).await
    }

    /// Latency percentiles of recent successful queries
    pub async fn latency_percentiles(&self, source_name: &str) -> Result<Option<LatencyPercentiles>> {
        let samples = self.patterns.latency_samples(source_name).await?;
        Ok(LatencyPercentiles::from_samples(&samples))
    }

    // ========================================================================
    // Failures
    // ========================================================================

    pub async fn record_failure(&self, report: FailureReport) -> Result<()> {
        self.failures.record(report).await.map(|_| ())
    }

    pub async fn failure_history(&self, source_name: &str, limit: usize) -> Vec<Failure> {
        lenient(
            self.failures.history(source_name, limit).await,
            "failure history",
            source_name,
            Vec::new(),
        )
    }

    pub async fn get_recovery_paths(&self, source_name: &str, error_type: &str) -> Vec<RecoveryPath> {
        lenient(
            self.failures.recovery_paths(source_name, error_type).await,
            "recovery paths",
            source_name,
            Vec::new(),
        )
    }

    pub async fn get_last_successful_recovery(&self, source_name: &str, error_type: &str) -> Option<Failure> {
        lenient(
            self.failures.last_successful_recovery(source_name, error_type).await,
            "last successful recovery",
            source_name,
            None,
        )
    }

    pub async fn is_recurring_failure(&self, source_name: &str, error_type: &str) -> bool {
        lenient(
            self.failures.is_recurring(source_name, error_type).await,
            "recurring failure",
            source_name,
            false,
        )
    }

    pub async fn recurring_error_types(&self, source_name: &str) -> Vec<String> {
        lenient(
            self.failures.recurring_error_types(source_name).await,
            "recurring error types",
            source_name,
            Vec::new(),
        )
    }

    pub async fn failure_stats(&self, source_name: &str) -> Result<FailureStats> {
        self.failures.stats(source_name).await
    }

    // ========================================================================
    // Health
    // ========================================================================

    pub async fn record_health_metrics(&self, metrics: HealthMetrics) -> Result<()> {
        self.health.push(metrics).await
    }

    /// Health snapshots for a source, newest first
    pub async fn get_health_history(&self, source_name: &str, limit: usize) -> Vec<HealthMetrics> {
        lenient(
            self.health.history(source_name, limit).await,
            "health history",
            source_name,
            Vec::new(),
        )
    }

    /// Most recent health snapshot for a source
    pub async fn get_source_health(&self, source_name: &str) -> Option<HealthMetrics> {
        self.get_health_history(source_name, 1).await.into_iter().next()
    }

    // ========================================================================
    // Context and summaries
    // ========================================================================

    pub fn current_user_context(&self) -> UserContext {
        UserContext::now()
    }

    /// Everything memory knows about a source
    pub async fn get_source_intelligence(&self, source_name: &str) -> SourceIntelligence {
        let average_latency_ms = self.get_average_latency(source_name).await;
        let recent = self
            .failure_history(source_name, self.config.recent_failure_limit)
            .await;
        let stats = lenient(
            self.failures.stats(source_name).await,
            "failure stats",
            source_name,
            FailureStats::default(),
        );

        let mut known_recovery_paths = BTreeMap::new();
        for error_type in FailureMemory::error_types(&recent) {
            let paths = self.get_recovery_paths(source_name, &error_type).await;
            if !paths.is_empty() {
                known_recovery_paths.insert(error_type, paths);
            }
        }

        SourceIntelligence {
            source_name: source_name.to_string(),
            average_latency_ms,
            overall_success_rate: smoothed_success_rate(stats.total_failures, self.config.success_smoothing),
            recent_failures: recent.len(),
            last_failure: recent.first().cloned(),
            known_recovery_paths,
        }
    }

    /// Delete every pattern, failure and health record older than
    /// `retention_days`.
    pub async fn cleanup(&self, retention_days: u32) -> Result<CleanupReport> {
        let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
        self.cleanup_before(cutoff).await
    }

    pub async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<CleanupReport> {
        let report = CleanupReport {
            patterns: self.patterns.purge_before(cutoff).await?,
            failures: self.failures.purge_before(cutoff).await?,
            health_records: self.health.purge_before(cutoff).await?,
        };
        info!(
            cutoff = %cutoff,
            patterns = report.patterns,
            failures = report.failures,
            health_records = report.health_records,
            "Cognitive memory cleanup completed"
        );
        Ok(report)
    }
}

fn lenient<T>(result: Result<T>, what: &'static str, subject: &str, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(subject, error = %e, "Memory read for {} failed, using neutral value", what);
            fallback
        }
    }
}
