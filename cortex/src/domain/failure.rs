// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Failures and the recovery actions that were tried against them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailureId(pub Uuid);

impl FailureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FailureId {
    fn default() -> Self {
        Self::new()
    }
}

/// A failure as reported by the router or a self-healing wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub source_name: String,
    pub error_type: String,
    pub message: String,
    #[serde(default)]
    pub query_context: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_time_ms: Option<u64>,
}

impl FailureReport {
    pub fn new(
        source_name: impl Into<String>,
        error_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            error_type: error_type.into(),
            message: message.into(),
            query_context: Value::Null,
            recovery_action: None,
            recovery_success: None,
            recovery_time_ms: None,
        }
    }

    pub fn with_query_context(mut self, context: Value) -> Self {
        self.query_context = context;
        self
    }

    pub fn with_recovery(
        mut self,
        action: impl Into<String>,
        success: bool,
        recovery_time_ms: Option<u64>,
    ) -> Self {
        self.recovery_action = Some(action.into());
        self.recovery_success = Some(success);
        self.recovery_time_ms = recovery_time_ms;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub id: FailureId,
    pub source_name: String,
    pub error_type: String,
    pub message: String,
    pub query_context: Value,
    pub recovery_action: Option<String>,
    pub recovery_success: Option<bool>,
    pub recovery_time_ms: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

impl Failure {
    pub fn from_report(report: FailureReport, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: FailureId::new(),
            source_name: report.source_name,
            error_type: report.error_type,
            message: report.message,
            query_context: report.query_context,
            recovery_action: report.recovery_action,
            recovery_success: report.recovery_success,
            recovery_time_ms: report.recovery_time_ms,
            occurred_at,
        }
    }

    pub fn recovered(&self) -> bool {
        self.recovery_success == Some(true)
    }
}

/// Aggregate of every attempt of one recovery action for a
/// `(source, error_type)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryPath {
    pub source_name: String,
    pub error_type: String,
    pub action: String,
    pub success_rate: f64,
    pub average_recovery_time_ms: f64,
    pub occurrences: u64,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureStats {
    pub total_failures: u64,
    pub unique_error_types: u64,
    pub recovery_success_rate: f64,
    pub average_recovery_time_ms: f64,
}
