// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Failure Memory
//!
//! Remembers failures and the recovery actions tried against them, and
//! detects failures that keep coming back.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Aggregations over the [`FailureRepository`]

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::window_start;
use crate::domain::{Failure, FailureReport, FailureStats, MemoryConfig, RecoveryPath};
use crate::infrastructure::FailureRepository;

pub struct FailureMemory {
    repo: Arc<dyn FailureRepository>,
    config: MemoryConfig,
}

#[derive(Default)]
struct RecoveryTally {
    occurrences: u64,
    successes: u64,
    total_time_ms: u64,
    timed: u64,
    last_seen: Option<DateTime<Utc>>,
}

impl FailureMemory {
    pub fn new(repo: Arc<dyn FailureRepository>, config: MemoryConfig) -> Self {
        Self { repo, config }
    }

    pub async fn record(&self, report: FailureReport) -> Result<Failure> {
        self.record_at(report, Utc::now()).await
    }

    pub async fn record_at(&self, report: FailureReport, occurred_at: DateTime<Utc>) -> Result<Failure> {
        let failure = Failure::from_report(report, occurred_at);
        debug!(
            source = %failure.source_name,
            error_type = %failure.error_type,
            recovery_action = failure.recovery_action.as_deref().unwrap_or("none"),
            "Recording source failure: {}",
            failure.message
        );
        self.repo.append(failure.clone()).await?;
        Ok(failure)
    }

    /// Failures of a source inside the stats window, newest first
    pub async fn history(&self, source_name: &str, limit: usize) -> Result<Vec<Failure>> {
        let since = window_start(Utc::now(), self.config.failure_stats_window);
        self.repo.find_by_source(source_name, since, Some(limit)).await
    }

    /// Recovery actions tried for `(source, error_type)`, most successful first
    pub async fn recovery_paths(&self, source_name: &str, error_type: &str) -> Result<Vec<RecoveryPath>> {
        let failures = self
            .repo
            .find_by_source_and_type(source_name, error_type, DateTime::<Utc>::MIN_UTC)
            .await?;

        let mut tallies: BTreeMap<String, RecoveryTally> = BTreeMap::new();
        for failure in &failures {
            let Some(action) = failure.recovery_action.as_ref() else {
                continue;
            };
            let tally = tallies.entry(action.clone()).or_default();
            tally.occurrences += 1;
            if failure.recovered() {
                tally.successes += 1;
            }
            if let Some(ms) = failure.recovery_time_ms {
                tally.total_time_ms += ms;
                tally.timed += 1;
            }
            tally.last_seen = tally.last_seen.max(Some(failure.occurred_at));
        }

        let mut ranked: Vec<(String, RecoveryTally)> = tallies.into_iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.successes
                .cmp(&a.successes)
                .then_with(|| b.occurrences.cmp(&a.occurrences))
        });

        Ok(ranked
            .into_iter()
            .map(|(action, tally)| RecoveryPath {
                source_name: source_name.to_string(),
                error_type: error_type.to_string(),
                action,
                success_rate: tally.successes as f64 / tally.occurrences as f64,
                average_recovery_time_ms: if tally.timed > 0 {
                    tally.total_time_ms as f64 / tally.timed as f64
                } else {
                    0.0
                },
                occurrences: tally.occurrences,
                last_seen: tally.last_seen.unwrap_or_else(Utc::now),
            })
            .collect())
    }

    pub async fn last_successful_recovery(&self, source_name: &str, error_type: &str) -> Result<Option<Failure>> {
        let failures = self
            .repo
            .find_by_source_and_type(source_name, error_type, DateTime::<Utc>::MIN_UTC)
            .await?;
        Ok(failures
            .into_iter()
            .find(|f| f.recovered() && f.recovery_action.is_some()))
    }

    /// True when the pair occurred at least `recurring_threshold` times in
    /// the recurring window.
    pub async fn is_recurring(&self, source_name: &str, error_type: &str) -> Result<bool> {
        let since = window_start(Utc::now(), self.config.recurring_window);
        let recent = self
            .repo
            .find_by_source_and_type(source_name, error_type, since)
            .await?;
        let recurring = recent.len() >= self.config.recurring_threshold;
        if recurring {
            debug!(source = source_name, error_type, count = recent.len(), "Recurring failure detected");
        }
        Ok(recurring)
    }

    /// Error types of a source that are currently recurring
    pub async fn recurring_error_types(&self, source_name: &str) -> Result<Vec<String>> {
        let since = window_start(Utc::now(), self.config.recurring_window);
        let recent = self.repo.find_by_source(source_name, since, None).await?;

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for failure in &recent {
            *counts.entry(failure.error_type.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .filter(|(_, count)| *count >= self.config.recurring_threshold)
            .map(|(error_type, _)| error_type.to_string())
            .collect())
    }

    /// Failure statistics for a source over the stats window
    pub async fn stats(&self, source_name: &str) -> Result<FailureStats> {
        let since = window_start(Utc::now(), self.config.failure_stats_window);
        let failures = self.repo.find_by_source(source_name, since, None).await?;
        if failures.is_empty() {
            return Ok(FailureStats::default());
        }

        let error_types: HashSet<&str> = failures.iter().map(|f| f.error_type.as_str()).collect();
        let recovered: Vec<&Failure> = failures.iter().filter(|f| f.recovered()).collect();
        let recovery_times: Vec<u64> = recovered.iter().filter_map(|f| f.recovery_time_ms).collect();

        Ok(FailureStats {
            total_failures: failures.len() as u64,
            unique_error_types: error_types.len() as u64,
            recovery_success_rate: recovered.len() as f64 / failures.len() as f64,
            average_recovery_time_ms: if recovery_times.is_empty() {
                0.0
            } else {
                recovery_times.iter().sum::<u64>() as f64 / recovery_times.len() as f64
            },
        })
    }

    /// Distinct error types seen in a failure list, in first-seen order
    pub fn error_types(failures: &[Failure]) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        failures
            .iter()
            .filter(|f| seen.insert(f.error_type.as_str()))
            .map(|f| f.error_type.clone())
            .collect()
    }

    pub async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.repo.purge_before(cutoff).await
    }
}
