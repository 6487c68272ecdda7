// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Repository interfaces for the cortex bounded context
//! Defines the contracts for pattern, failure and health storage.
//!
//! The in-memory implementations live in [`super::in_memory`]. A
//! persistence-backed collaborator implements the same traits.

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::{Failure, HealthMetrics, QueryPattern};

/// Append-only store of query outcomes
#[async_trait]
pub trait PatternRepository: Send + Sync {
    /// Append one query outcome
    async fn append(&self, pattern: QueryPattern) -> Result<()>;

    /// Patterns recorded for a source at or after `since`, newest first
    async fn find_by_source(&self, source_name: &str, since: DateTime<Utc>) -> Result<Vec<QueryPattern>>;

    /// Patterns of one query type at or after `since`, newest first
    async fn find_by_query_type(&self, query_type: &str, since: DateTime<Utc>) -> Result<Vec<QueryPattern>>;

    /// Patterns recorded for a widget at or after `since`, newest first
    async fn find_by_widget(&self, widget_id: &str, since: DateTime<Utc>) -> Result<Vec<QueryPattern>>;

    /// Every widget that has at least one recorded pattern
    async fn distinct_widgets(&self) -> Result<Vec<String>>;

    /// Every source that has at least one recorded pattern
    async fn distinct_sources(&self) -> Result<Vec<String>>;

    /// Delete patterns older than `cutoff`; returns how many were removed
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// Append-only store of failures and recovery attempts
#[async_trait]
pub trait FailureRepository: Send + Sync {
    /// Append one failure
    async fn append(&self, failure: Failure) -> Result<()>;

    /// Failures of a source at or after `since`, newest first, at most `limit`
    async fn find_by_source(
        &self,
        source_name: &str,
        since: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<Failure>>;

    /// Failures of one `(source, error_type)` pair at or after `since`, newest first
    async fn find_by_source_and_type(
        &self,
        source_name: &str,
        error_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Failure>>;

    /// Delete failures older than `cutoff`; returns how many were removed
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// Bounded per-source history of health snapshots
#[async_trait]
pub trait HealthRepository: Send + Sync {
    /// Push a snapshot, evicting the oldest one when the source's buffer is full
    async fn push(&self, metrics: HealthMetrics) -> Result<()>;

    /// Up to `limit` snapshots for a source, newest first
    async fn history(&self, source_name: &str, limit: usize) -> Result<Vec<HealthMetrics>>;

    /// Delete snapshots older than `cutoff`; returns how many were removed
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
