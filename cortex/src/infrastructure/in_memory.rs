// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! In-memory repository implementations
//!
//! Thread-safe, process-lifetime storage. Each store is capped and evicts
//! its oldest entries first, which is the only way records disappear apart
//! from an explicit `purge_before`.

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use crate::domain::{Failure, HealthMetrics, QueryPattern, MAX_HEALTH_RECORDS};
use crate::infrastructure::repository::{FailureRepository, HealthRepository, PatternRepository};

fn newest_first<T, F>(items: &VecDeque<T>, keep: F, timestamp: fn(&T) -> DateTime<Utc>) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let mut selected: Vec<T> = items.iter().rev().filter(|item| keep(*item)).cloned().collect();
    selected.sort_by(|a, b| timestamp(b).cmp(&timestamp(a)));
    selected
}

#[derive(Clone)]
pub struct InMemoryPatternRepository {
    patterns: Arc<RwLock<VecDeque<QueryPattern>>>,
    capacity: usize,
}

impl InMemoryPatternRepository {
    pub fn new() -> Self {
        Self::with_capacity(50_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            patterns: Arc::new(RwLock::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.read().is_empty()
    }

    fn select<F: Fn(&QueryPattern) -> bool>(&self, keep: F) -> Vec<QueryPattern> {
        newest_first(&*self.patterns.read(), keep, |p| p.timestamp)
    }
}

impl Default for InMemoryPatternRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatternRepository for InMemoryPatternRepository {
    async fn append(&self, pattern: QueryPattern) -> Result<()> {
        let mut patterns = self.patterns.write();
        while patterns.len() >= self.capacity {
            patterns.pop_front();
        }
        patterns.push_back(pattern);
        Ok(())
    }

    async fn find_by_source(&self, source_name: &str, since: DateTime<Utc>) -> Result<Vec<QueryPattern>> {
        Ok(self.select(|p| p.source_used == source_name && p.timestamp >= since))
    }

    async fn find_by_query_type(&self, query_type: &str, since: DateTime<Utc>) -> Result<Vec<QueryPattern>> {
        Ok(self.select(|p| p.query_type == query_type && p.timestamp >= since))
    }

    async fn find_by_widget(&self, widget_id: &str, since: DateTime<Utc>) -> Result<Vec<QueryPattern>> {
        Ok(self.select(|p| p.widget_id == widget_id && p.timestamp >= since))
    }

    async fn distinct_widgets(&self) -> Result<Vec<String>> {
        let patterns = self.patterns.read();
        let widgets: BTreeSet<&String> = patterns.iter().map(|p| &p.widget_id).collect();
        Ok(widgets.into_iter().cloned().collect())
    }

    async fn distinct_sources(&self) -> Result<Vec<String>> {
        let patterns = self.patterns.read();
        let sources: BTreeSet<&String> = patterns.iter().map(|p| &p.source_used).collect();
        Ok(sources.into_iter().cloned().collect())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut patterns = self.patterns.write();
        let before = patterns.len();
        patterns.retain(|p| p.timestamp >= cutoff);
        Ok(before - patterns.len())
    }
}

#[derive(Clone)]
pub struct InMemoryFailureRepository {
    failures: Arc<RwLock<VecDeque<Failure>>>,
    capacity: usize,
}

impl InMemoryFailureRepository {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            failures: Arc::new(RwLock::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.failures.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.read().is_empty()
    }
}

impl Default for InMemoryFailureRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FailureRepository for InMemoryFailureRepository {
    async fn append(&self, failure: Failure) -> Result<()> {
        let mut failures = self.failures.write();
        while failures.len() >= self.capacity {
            failures.pop_front();
        }
        failures.push_back(failure);
        Ok(())
    }

    async fn find_by_source(
        &self,
        source_name: &str,
        since: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<Failure>> {
        let mut found = newest_first(
            &*self.failures.read(),
            |f| f.source_name == source_name && f.occurred_at >= since,
            |f| f.occurred_at,
        );
        if let Some(limit) = limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn find_by_source_and_type(
        &self,
        source_name: &str,
        error_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Failure>> {
        Ok(newest_first(
            &*self.failures.read(),
            |f| f.source_name == source_name && f.error_type == error_type && f.occurred_at >= since,
            |f| f.occurred_at,
        ))
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut failures = self.failures.write();
        let before = failures.len();
        failures.retain(|f| f.occurred_at >= cutoff);
        Ok(before - failures.len())
    }
}

/// Per-source ring buffers of health snapshots.
#[derive(Clone)]
pub struct InMemoryHealthRepository {
    buffers: Arc<RwLock<HashMap<String, VecDeque<HealthMetrics>>>>,
    max_records: usize,
}

impl InMemoryHealthRepository {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HEALTH_RECORDS)
    }

    pub fn with_capacity(max_records: usize) -> Self {
        Self {
            buffers: Arc::new(RwLock::new(HashMap::new())),
            max_records: max_records.max(1),
        }
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Number of snapshots currently buffered for a source
    pub fn buffered(&self, source_name: &str) -> usize {
        self.buffers.read().get(source_name).map_or(0, VecDeque::len)
    }
}

impl Default for InMemoryHealthRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthRepository for InMemoryHealthRepository {
    async fn push(&self, metrics: HealthMetrics) -> Result<()> {
        let mut buffers = self.buffers.write();
        let buffer = buffers.entry(metrics.source_name.clone()).or_default();
        while buffer.len() >= self.max_records {
            buffer.pop_front();
        }
        buffer.push_back(metrics);
        Ok(())
    }

    async fn history(&self, source_name: &str, limit: usize) -> Result<Vec<HealthMetrics>> {
        let buffers = self.buffers.read();
        Ok(buffers
            .get(source_name)
            .map(|buffer| buffer.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut buffers = self.buffers.write();
        let mut removed = 0;
        for buffer in buffers.values_mut() {
            let before = buffer.len();
            buffer.retain(|m| m.timestamp >= cutoff);
            removed += before - buffer.len();
        }
        buffers.retain(|_, buffer| !buffer.is_empty());
        Ok(removed)
    }
}
