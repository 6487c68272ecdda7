// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Data Source Domain Interface
//!
//! A data source is anything that can answer a query: a database, an HTTP
//! API, a cache, a file. The router only reasons about the descriptor
//! (name, type, capabilities, latency and cost estimates) and hands the
//! source to a caller-supplied executor; it never calls `query` itself.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Source abstraction, capability matching, per-source errors

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::query::QueryIntent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Database,
    Api,
    Cache,
    File,
    Stream,
    Other,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Api => "api",
            Self::Cache => "cache",
            Self::File => "file",
            Self::Stream => "stream",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of queries a source can answer.
///
/// Written as strings in descriptors and manifests: `"*"`,
/// `"domain.operation"`, `"domain.*"`, or a bare query type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Capability {
    /// Answers everything
    Any,
    /// One operation in one domain
    Exact { domain: String, operation: String },
    /// Every operation in a domain
    Domain(String),
    /// A query type with no domain structure
    Named(String),
}

impl Capability {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == "*" {
            return Self::Any;
        }
        if let Some(domain) = raw.strip_suffix(".*") {
            if !domain.is_empty() {
                return Self::Domain(domain.to_string());
            }
        }
        match raw.split_once('.') {
            Some((domain, operation)) if !domain.is_empty() && !operation.is_empty() => Self::Exact {
                domain: domain.to_string(),
                operation: operation.to_string(),
            },
            _ => Self::Named(raw.to_string()),
        }
    }

    pub fn matches(&self, intent: &QueryIntent) -> bool {
        match self {
            Self::Any => true,
            Self::Exact { domain, operation } => {
                (domain == &intent.domain && operation == &intent.operation)
                    || intent
                        .query_type
                        .strip_prefix(domain.as_str())
                        .and_then(|rest| rest.strip_prefix('.'))
                        == Some(operation.as_str())
            }
            Self::Domain(domain) => domain == &intent.domain,
            Self::Named(query_type) => query_type == &intent.query_type,
        }
    }
}

impl FromStr for Capability {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for Capability {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for Capability {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<Capability> for String {
    fn from(capability: Capability) -> Self {
        capability.to_string()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact { domain, operation } => write!(f, "{domain}.{operation}"),
            Self::Domain(domain) => write!(f, "{domain}.*"),
            Self::Named(query_type) => f.write_str(query_type),
        }
    }
}

/// Domain interface for data sources
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Unique name; the registry key
    fn name(&self) -> &str;

    fn source_type(&self) -> SourceType;

    fn capabilities(&self) -> &[Capability];

    /// Latency to assume before any has been observed
    fn estimated_latency_ms(&self) -> u64;

    /// Price of one query; 0.0 for free sources
    fn cost_per_query(&self) -> f64 {
        0.0
    }

    async fn is_healthy(&self) -> bool;

    async fn query(&self, operation: &str, params: &Value) -> Result<Value, SourceError>;
}

/// Serializable snapshot of a source's routing metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub capabilities: Vec<Capability>,
    pub estimated_latency_ms: u64,
    #[serde(default)]
    pub cost_per_query: f64,
}

impl SourceDescriptor {
    pub fn of(source: &dyn DataSource) -> Self {
        Self {
            name: source.name().to_string(),
            source_type: source.source_type(),
            capabilities: source.capabilities().to_vec(),
            estimated_latency_ms: source.estimated_latency_ms(),
            cost_per_query: source.cost_per_query(),
        }
    }
}

/// Errors a single source can produce while answering a query
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("Timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// Stable name failure memory groups by
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "Timeout",
            Self::Connection(_) => "Connection",
            Self::RateLimited(_) => "RateLimited",
            Self::Unavailable(_) => "Unavailable",
            Self::InvalidResponse(_) => "InvalidResponse",
            Self::Unsupported(_) => "Unsupported",
            Self::Other(_) => "Other",
        }
    }

    /// Worth retrying against the same source
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connection(_) | Self::RateLimited(_))
    }
}

impl From<anyhow::Error> for SourceError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(format!("{e:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::DataQuery;

    fn intent(query: DataQuery) -> QueryIntent {
        QueryIntent::from_query(&query)
    }

    #[test]
    fn test_capability_parse_roundtrip() {
        for raw in ["*", "agents.list", "agents.*", "healthcheck"] {
            assert_eq!(Capability::parse(raw).to_string(), raw);
        }
        assert_eq!(Capability::parse("agents.*"), Capability::Domain("agents".into()));
        assert_eq!(Capability::parse(".*"), Capability::Named(".*".into()));
    }

    #[test]
    fn test_capability_matching() {
        let list = intent(DataQuery::new("agents.list"));
        assert!(Capability::Any.matches(&list));
        assert!(Capability::parse("agents.list").matches(&list));
        assert!(Capability::parse("agents.*").matches(&list));
        assert!(!Capability::parse("agents.get").matches(&list));
        assert!(!Capability::parse("system.*").matches(&list));

        let bare = intent(DataQuery::new("healthcheck"));
        assert!(Capability::parse("healthcheck").matches(&bare));
        assert!(!Capability::parse("agents.*").matches(&bare));
    }

    #[test]
    fn test_exact_capability_matches_declared_type() {
        // Declared domain/operation differ from the type, the type still matches
        let query = DataQuery::new("agents.list").with_domain("fleet", "scan");
        assert!(Capability::parse("agents.list").matches(&intent(query.clone())));
        assert!(Capability::parse("fleet.scan").matches(&intent(query)));
    }

    #[test]
    fn test_capability_serde_as_string() {
        let caps: Vec<Capability> = serde_json::from_str(r#"["*", "agents.*", "agents.list"]"#).unwrap();
        assert_eq!(caps[0], Capability::Any);
        assert_eq!(serde_json::to_string(&caps).unwrap(), r#"["*","agents.*","agents.list"]"#);
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(SourceError::Timeout { after_ms: 5 }.error_type(), "Timeout");
        assert!(SourceError::RateLimited("429".into()).is_transient());
        assert!(!SourceError::InvalidResponse("bad json".into()).is_transient());
    }
}
