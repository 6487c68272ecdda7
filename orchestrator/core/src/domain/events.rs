// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decision::Alternative;

/// Request-path notifications, published fire-and-forget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoutingEvent {
    QueryRouted {
        query_id: String,
        query_type: String,
        selected_source: String,
        confidence: f64,
        alternatives: Vec<Alternative>,
        reasoning: String,
        latency_ms: u64,
        /// 1 when the top-ranked source answered
        attempt: usize,
        routed_at: DateTime<Utc>,
    },
    AttemptFailed {
        query_id: String,
        source: String,
        error_type: String,
        message: String,
        attempt: usize,
        failed_at: DateTime<Utc>,
    },
    AllSourcesFailed {
        query_id: String,
        query_type: String,
        /// `source: error` in attempt order
        attempts: Vec<String>,
        failed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LearningEvent {
    LearningCycleCompleted {
        degraded_sources: Vec<String>,
        confident_widgets: Vec<String>,
        predictions_refreshed: usize,
        predictions_evicted: usize,
        all_steps_completed: bool,
        completed_at: DateTime<Utc>,
    },
    PredictionCached {
        widget_id: String,
        source: String,
        hour: u32,
        frequency: u64,
        cached_at: DateTime<Utc>,
    },
    MemoryCleaned {
        patterns: usize,
        failures: usize,
        health_records: usize,
        cleaned_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HealthEvent {
    SourceHealthChecked {
        source: String,
        healthy: bool,
        health_score: f64,
        checked_at: DateTime<Utc>,
    },
    CircuitOpened {
        source: String,
        consecutive_failures: u32,
        opened_at: DateTime<Utc>,
    },
    CircuitClosed {
        source: String,
        closed_at: DateTime<Utc>,
    },
}
