// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Query patterns: one record per observed query outcome, plus the
//! per-widget usage aggregate derived from them.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Parameter keys that change on every call and must not affect the signature.
const VOLATILE_PARAM_KEYS: &[&str] = &["timestamp", "requestId"];

/// Hex characters kept from the SHA-256 digest.
const SIGNATURE_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryPatternId(pub Uuid);

impl QueryPatternId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QueryPatternId {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable fingerprint of a query type and its normalized parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuerySignature(pub String);

impl QuerySignature {
    pub fn compute(query_type: &str, params: &Value) -> Self {
        let mut envelope = BTreeMap::new();
        envelope.insert("params", normalize_params(params));
        envelope.insert("type", Value::String(query_type.to_string()));

        // BTreeMap keys serialize in sorted order, so equal inputs hash equally.
        let normalized = serde_json::to_string(&envelope).unwrap_or_default();
        let digest = Sha256::digest(normalized.as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(SIGNATURE_LEN);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drop volatile keys and sort the rest. `null` normalizes to `{}`.
pub fn normalize_params(params: &Value) -> Value {
    match params {
        Value::Null => Value::Object(Default::default()),
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map
                .iter()
                .filter(|(key, _)| !VOLATILE_PARAM_KEYS.contains(&key.as_str()))
                .collect();
            serde_json::to_value(sorted).unwrap_or(Value::Null)
        }
        other => other.clone(),
    }
}

/// Top-level key set of the normalized parameters ("shape" of the query).
pub fn param_keys(params: &Value) -> BTreeSet<String> {
    match normalize_params(params) {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => BTreeSet::new(),
    }
}

/// Jaccard index of two parameter shapes. Two empty shapes are identical.
pub fn shape_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// When (in UTC) a query happened, used for time-of-day learning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// Hour of day, 0-23
    pub time_of_day: u32,
    /// Day of week, 0 = Sunday
    pub day_of_week: u32,
}

impl UserContext {
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            time_of_day: timestamp.hour(),
            day_of_week: timestamp.weekday().num_days_from_sunday(),
        }
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }
}

/// Outcome of one query as reported by the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub widget_id: String,
    pub query_type: String,
    #[serde(default)]
    pub query_params: Value,
    pub source_used: String,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_size: Option<u64>,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPattern {
    pub id: QueryPatternId,
    pub widget_id: String,
    pub query_type: String,
    pub signature: QuerySignature,
    pub param_keys: BTreeSet<String>,
    pub source_used: String,
    pub latency_ms: u64,
    pub result_size: Option<u64>,
    pub success: bool,
    pub user_context: UserContext,
    pub timestamp: DateTime<Utc>,
}

impl QueryPattern {
    pub fn from_outcome(outcome: QueryOutcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: QueryPatternId::new(),
            signature: QuerySignature::compute(&outcome.query_type, &outcome.query_params),
            param_keys: param_keys(&outcome.query_params),
            widget_id: outcome.widget_id,
            query_type: outcome.query_type,
            source_used: outcome.source_used,
            latency_ms: outcome.latency_ms,
            result_size: outcome.result_size,
            success: outcome.success,
            user_context: UserContext::at(timestamp),
            timestamp,
        }
    }
}

/// A past query ranked by how closely its shape matches a probe.
#[derive(Debug, Clone)]
pub struct SimilarQuery {
    pub pattern: QueryPattern,
    pub similarity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePattern {
    pub hour: u32,
    pub frequency: u64,
}

/// Per-widget usage aggregate over successful queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsagePattern {
    pub widget_id: String,
    /// Most used sources first, at most five
    pub common_sources: Vec<String>,
    pub average_latency_ms: f64,
    /// Sorted by frequency, highest first
    pub time_patterns: Vec<TimePattern>,
}

impl UsagePattern {
    pub fn empty(widget_id: impl Into<String>) -> Self {
        Self {
            widget_id: widget_id.into(),
            common_sources: Vec::new(),
            average_latency_ms: 0.0,
            time_patterns: Vec::new(),
        }
    }

    pub fn frequency_at(&self, hour: u32) -> Option<u64> {
        self.time_patterns
            .iter()
            .find(|p| p.hour == hour)
            .map(|p| p.frequency)
    }
}

/// Success/failure counts for one source over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub total: u64,
    pub successes: u64,
}

impl OutcomeSummary {
    pub fn failures(&self) -> u64 {
        self.total - self.successes
    }

    pub fn success_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.successes as f64 / self.total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signature_ignores_key_order_and_volatile_keys() {
        let a = QuerySignature::compute("agents.list", &json!({"limit": 10, "status": "active"}));
        let b = QuerySignature::compute(
            "agents.list",
            &json!({"status": "active", "timestamp": 123, "limit": 10, "requestId": "abc"}),
        );
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn test_signature_depends_on_type_and_values() {
        let base = QuerySignature::compute("agents.list", &json!({"limit": 10}));
        assert_ne!(base, QuerySignature::compute("agents.get", &json!({"limit": 10})));
        assert_ne!(base, QuerySignature::compute("agents.list", &json!({"limit": 11})));
    }

    #[test]
    fn test_null_params_match_empty_object() {
        assert_eq!(
            QuerySignature::compute("x", &Value::Null),
            QuerySignature::compute("x", &json!({}))
        );
    }

    #[test]
    fn test_shape_similarity() {
        let a = param_keys(&json!({"q": "x", "limit": 5}));
        let b = param_keys(&json!({"q": "y", "limit": 9, "offset": 2}));
        assert!((shape_similarity(&a, &b) - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(shape_similarity(&BTreeSet::new(), &BTreeSet::new()), 1.0);
        assert_eq!(shape_similarity(&a, &BTreeSet::new()), 0.0);
    }

    #[test]
    fn test_usage_pattern_frequency_lookup() {
        let mut usage = UsagePattern::empty("w1");
        usage.time_patterns.push(TimePattern { hour: 9, frequency: 7 });
        assert_eq!(usage.frequency_at(9), Some(7));
        assert_eq!(usage.frequency_at(10), None);
    }
}
