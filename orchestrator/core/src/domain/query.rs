// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Query
//!
//! Inbound data queries, the intent derived from them, and the result
//! returned once a source has answered.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Request/response value types for the router

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query type used when a query does not declare one
pub const UNKNOWN_QUERY_TYPE: &str = "unknown";
/// Domain used when neither the query nor its type names one
pub const DEFAULT_DOMAIN: &str = "general";
/// Operation used when neither the query nor its type names one
pub const DEFAULT_OPERATION: &str = "read";
/// Widget id recorded for queries that do not come from a widget
pub const UNKNOWN_WIDGET: &str = "unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Realtime,
    #[default]
    Normal,
    Stale,
}

/// A request for data, as submitted by a widget or tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Dotted query type, e.g. `agents.list`
    #[serde(rename = "type", default)]
    pub query_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    #[serde(default)]
    pub params: Value,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub freshness: Freshness,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_id: Option<String>,
}

impl DataQuery {
    pub fn new(query_type: impl Into<String>) -> Self {
        Self {
            query_type: query_type.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>, operation: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self.operation = Some(operation.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_freshness(mut self, freshness: Freshness) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn with_widget(mut self, widget_id: impl Into<String>) -> Self {
        self.widget_id = Some(widget_id.into());
        self
    }

    pub fn widget_or_unknown(&self) -> &str {
        self.widget_id.as_deref().unwrap_or(UNKNOWN_WIDGET)
    }
}

/// What a query is asking for, normalized for capability matching and scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
    #[serde(rename = "type")]
    pub query_type: String,
    pub domain: String,
    pub operation: String,
    pub params: Value,
    pub priority: Priority,
    pub freshness: Freshness,
}

impl QueryIntent {
    /// Derive the intent from a query's declared fields. Missing
    /// domain/operation come from splitting the type on its first `.`.
    pub fn from_query(query: &DataQuery) -> Self {
        let query_type = if query.query_type.trim().is_empty() {
            UNKNOWN_QUERY_TYPE.to_string()
        } else {
            query.query_type.trim().to_string()
        };

        let (type_domain, type_operation) = match query_type.split_once('.') {
            Some((domain, operation)) if !domain.is_empty() && !operation.is_empty() => {
                (Some(domain), Some(operation))
            }
            _ => (None, None),
        };

        let domain = query
            .domain
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(type_domain)
            .unwrap_or(DEFAULT_DOMAIN)
            .to_string();
        let operation = query
            .operation
            .as_deref()
            .filter(|o| !o.is_empty())
            .or(type_operation)
            .unwrap_or(DEFAULT_OPERATION)
            .to_string();

        Self {
            query_type,
            domain,
            operation,
            params: query.params.clone(),
            priority: query.priority,
            freshness: query.freshness,
        }
    }

    /// `domain.operation`
    pub fn qualified_operation(&self) -> String {
        format!("{}.{}", self.domain, self.operation)
    }
}

/// A query answered by one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult<T> {
    pub data: T,
    pub source: String,
    pub latency_ms: u64,
    pub cached: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intent_splits_type_on_first_dot() {
        let intent = QueryIntent::from_query(&DataQuery::new("agents.list.active"));
        assert_eq!(intent.domain, "agents");
        assert_eq!(intent.operation, "list.active");
        assert_eq!(intent.qualified_operation(), "agents.list.active");
    }

    #[test]
    fn test_declared_fields_win_over_type() {
        let query = DataQuery::new("agents.list").with_domain("fleet", "scan");
        let intent = QueryIntent::from_query(&query);
        assert_eq!(intent.query_type, "agents.list");
        assert_eq!(intent.domain, "fleet");
        assert_eq!(intent.operation, "scan");
    }

    #[test]
    fn test_defaults_for_bare_and_missing_type() {
        let bare = QueryIntent::from_query(&DataQuery::new("healthcheck"));
        assert_eq!(bare.domain, DEFAULT_DOMAIN);
        assert_eq!(bare.operation, DEFAULT_OPERATION);

        let missing = QueryIntent::from_query(&DataQuery::default());
        assert_eq!(missing.query_type, UNKNOWN_QUERY_TYPE);
    }

    #[test]
    fn test_query_deserializes_camel_case() {
        let query: DataQuery = serde_json::from_value(json!({
            "type": "system.metrics",
            "widgetId": "monitor",
            "priority": "high",
            "freshness": "realtime",
            "params": {"host": "web-1"}
        }))
        .unwrap();
        assert_eq!(query.priority, Priority::High);
        assert_eq!(query.freshness, Freshness::Realtime);
        assert_eq!(query.widget_or_unknown(), "monitor");
        assert_eq!(query.params["host"], "web-1");
    }
}
