// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Pattern Memory
//!
//! Remembers every query outcome and answers the latency, success-rate,
//! similarity and usage questions the decision engine asks.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Aggregations over the [`PatternRepository`]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::window_start;
use crate::domain::{
    param_keys, shape_similarity, MemoryConfig, OutcomeSummary, QueryOutcome, QueryPattern,
    QuerySignature, SimilarQuery, TimePattern, UsagePattern,
};
use crate::infrastructure::PatternRepository;

/// Most common sources kept per widget
const TOP_WIDGET_SOURCES: usize = 5;

pub struct PatternMemory {
    repo: Arc<dyn PatternRepository>,
    config: MemoryConfig,
}

impl PatternMemory {
    pub fn new(repo: Arc<dyn PatternRepository>, config: MemoryConfig) -> Self {
        Self { repo, config }
    }

    pub async fn record(&self, outcome: QueryOutcome) -> Result<QueryPattern> {
        self.record_at(outcome, Utc::now()).await
    }

    /// Record an outcome observed at a specific instant
    pub async fn record_at(&self, outcome: QueryOutcome, timestamp: DateTime<Utc>) -> Result<QueryPattern> {
        let pattern = QueryPattern::from_outcome(outcome, timestamp);
        debug!(
            widget_id = %pattern.widget_id,
            source = %pattern.source_used,
            signature = %pattern.signature,
            success = pattern.success,
            "Recording query pattern"
        );
        self.repo.append(pattern.clone()).await?;
        Ok(pattern)
    }

    /// Mean latency of successful queries in the latency window
    pub async fn average_latency(&self, source_name: &str) -> Result<Option<f64>> {
        let samples = self.latency_samples(source_name).await?;
        if samples.is_empty() {
            return Ok(None);
        }
        let total: u64 = samples.iter().sum();
        Ok(Some(total as f64 / samples.len() as f64))
    }

    /// Latencies of successful queries in the latency window, newest first
    pub async fn latency_samples(&self, source_name: &str) -> Result<Vec<u64>> {
        let since = window_start(Utc::now(), self.config.latency_window);
        let patterns = self.repo.find_by_source(source_name, since).await?;
        Ok(patterns
            .into_iter()
            .filter(|p| p.success)
            .map(|p| p.latency_ms)
            .collect())
    }

    pub async fn success_rate(&self, source_name: &str, query_type: &str) -> Result<Option<f64>> {
        let since = window_start(Utc::now(), self.config.success_window);
        let patterns = self.repo.find_by_source(source_name, since).await?;
        let summary = summarize(patterns.iter().filter(|p| p.query_type == query_type));
        Ok(summary.success_rate())
    }

    /// Success and total counts for a source across all query types
    pub async fn outcome_summary(&self, source_name: &str) -> Result<OutcomeSummary> {
        let since = window_start(Utc::now(), self.config.success_window);
        let patterns = self.repo.find_by_source(source_name, since).await?;
        Ok(summarize(patterns.iter()))
    }

    /// Past queries of the same type ranked by parameter-shape similarity.
    ///
    /// An identical signature scores 1.0, anything else the Jaccard index
    /// of the parameter key sets. Ties go to the more recent query.
    pub async fn find_similar(
        &self,
        query_type: &str,
        params: &Value,
        limit: usize,
    ) -> Result<Vec<SimilarQuery>> {
        self.rank_similar(query_type, params, limit, None).await
    }

    /// Success ratio among the most similar past queries, optionally only
    /// those served by `source_name`. `None` when nothing similar exists.
    pub async fn similar_query_success(
        &self,
        query_type: &str,
        params: &Value,
        source_name: Option<&str>,
    ) -> Result<Option<f64>> {
        let similar = self
            .rank_similar(query_type, params, self.config.similar_query_limit, source_name)
            .await?;
        let summary = summarize(similar.iter().map(|s| &s.pattern));
        Ok(summary.success_rate())
    }

    async fn rank_similar(
        &self,
        query_type: &str,
        params: &Value,
        limit: usize,
        source_name: Option<&str>,
    ) -> Result<Vec<SimilarQuery>> {
        let signature = QuerySignature::compute(query_type, params);
        let keys = param_keys(params);
        let candidates = self
            .repo
            .find_by_query_type(query_type, DateTime::<Utc>::MIN_UTC)
            .await?;

        let mut ranked: Vec<SimilarQuery> = candidates
            .into_iter()
            .filter(|p| source_name.map_or(true, |s| p.source_used == s))
            .map(|pattern| {
                let similarity = if pattern.signature == signature {
                    1.0
                } else {
                    shape_similarity(&keys, &pattern.param_keys)
                };
                SimilarQuery { pattern, similarity }
            })
            .filter(|s| s.similarity >= self.config.min_similarity)
            .collect();

        ranked.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.pattern.timestamp.cmp(&a.pattern.timestamp))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Usage aggregate over the widget's successful queries in the pattern window
    pub async fn widget_patterns(&self, widget_id: &str) -> Result<UsagePattern> {
        let since = window_start(Utc::now(), self.config.pattern_window);
        let successful: Vec<QueryPattern> = self
            .repo
            .find_by_widget(widget_id, since)
            .await?
            .into_iter()
            .filter(|p| p.success)
            .collect();

        if successful.is_empty() {
            return Ok(UsagePattern::empty(widget_id));
        }

        let mut by_source: HashMap<&str, u64> = HashMap::new();
        let mut by_hour: HashMap<u32, u64> = HashMap::new();
        let mut total_latency = 0u64;
        for pattern in &successful {
            *by_source.entry(pattern.source_used.as_str()).or_default() += 1;
            *by_hour.entry(pattern.user_context.time_of_day).or_default() += 1;
            total_latency += pattern.latency_ms;
        }

        let mut sources: Vec<(&str, u64)> = by_source.into_iter().collect();
        sources.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let mut time_patterns: Vec<TimePattern> = by_hour
            .into_iter()
            .map(|(hour, frequency)| TimePattern { hour, frequency })
            .collect();
        time_patterns.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.hour.cmp(&b.hour)));

        Ok(UsagePattern {
            widget_id: widget_id.to_string(),
            common_sources: sources
                .into_iter()
                .take(TOP_WIDGET_SOURCES)
                .map(|(name, _)| name.to_string())
                .collect(),
            average_latency_ms: total_latency as f64 / successful.len() as f64,
            time_patterns,
        })
    }

    pub async fn known_widgets(&self) -> Result<Vec<String>> {
        self.repo.distinct_widgets().await
    }

    pub async fn known_sources(&self) -> Result<Vec<String>> {
        self.repo.distinct_sources().await
    }

    pub async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.repo.purge_before(cutoff).await
    }
}

fn summarize<'a>(patterns: impl Iterator<Item = &'a QueryPattern>) -> OutcomeSummary {
    patterns.fold(OutcomeSummary::default(), |mut acc, p| {
        acc.total += 1;
        if p.success {
            acc.successes += 1;
        }
        acc
    })
}
