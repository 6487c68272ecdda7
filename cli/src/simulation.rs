// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Simulation harness
//!
//! Builds simulated sources from the manifest's `spec.sources` and drives
//! a stream of queries through the agent so routing, fallback and learning
//! can be observed without real backends.
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Simulated sources and the query driver behind `switchyard simulate`

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use switchyard_core::application::{HealthMonitor, RouterContext};
use switchyard_core::domain::router_config::StaticSourceConfig;
use switchyard_core::domain::{
    AgentStats, Capability, DataQuery, DataSource, LearningReport, SourceDescriptor, SourceError, SourceType,
};
use switchyard_cortex::SourceIntelligence;
use tracing::{debug, info};

/// Query type used when no source declares a concrete capability
pub const FALLBACK_QUERY_TYPE: &str = "general.read";

/// A source that answers after a jittered delay and fails at a fixed rate
pub struct SimulatedSource {
    descriptor: SourceDescriptor,
    failure_rate: f64,
    healthy: bool,
    latency_scale: f64,
    served: AtomicU64,
}

impl SimulatedSource {
    pub fn from_config(config: &StaticSourceConfig, latency_scale: f64) -> Self {
        Self {
            descriptor: config.descriptor.clone(),
            failure_rate: config.failure_rate.clamp(0.0, 1.0),
            healthy: config.healthy,
            latency_scale: latency_scale.max(0.0),
            served: AtomicU64::new(0),
        }
    }

    /// Queries answered successfully so far
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// Draw this call's delay and outcome. The RNG is not `Send`, so
    /// nothing here may cross an await.
    fn draw(&self) -> (Duration, Option<SourceError>) {
        let mut rng = rand::rng();
        let base = self.descriptor.estimated_latency_ms as f64 * self.latency_scale;
        let delay_ms = if base > 0.0 {
            rng.random_range(base * 0.5..=base * 1.5)
        } else {
            0.0
        };

        let error = (rng.random::<f64>() < self.failure_rate).then(|| match rng.random_range(0..3) {
            0 => SourceError::Timeout {
                after_ms: delay_ms.round() as u64,
            },
            1 => SourceError::Connection("simulated connection reset".to_string()),
            _ => SourceError::RateLimited("simulated throttling".to_string()),
        });

        (Duration::from_secs_f64(delay_ms / 1000.0), error)
    }
}

#[async_trait]
impl DataSource for SimulatedSource {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn source_type(&self) -> SourceType {
        self.descriptor.source_type
    }

    fn capabilities(&self) -> &[Capability] {
        &self.descriptor.capabilities
    }

    fn estimated_latency_ms(&self) -> u64 {
        self.descriptor.estimated_latency_ms
    }

    fn cost_per_query(&self) -> f64 {
        self.descriptor.cost_per_query
    }

    async fn is_healthy(&self) -> bool {
        self.healthy
    }

    async fn query(&self, operation: &str, params: &Value) -> Result<Value, SourceError> {
        if !self.healthy {
            return Err(SourceError::Unavailable(format!("{} is down", self.name())));
        }

        let (delay, error) = self.draw();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = error {
            debug!(source = %self.name(), operation, error = %error, "Simulated failure");
            return Err(error);
        }

        self.served.fetch_add(1, Ordering::Relaxed);
        Ok(json!({
            "source": self.name(),
            "operation": operation,
            "params": params,
            "rows": (delay.as_millis() % 50) as u64 + 1,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub queries: usize,
    /// Multiplier applied to every source's estimated latency
    pub latency_scale: f64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            queries: 100,
            latency_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub queries: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successful queries per serving source
    pub served_by: BTreeMap<String, u64>,
    pub stats: AgentStats,
    pub intelligence: Vec<SourceIntelligence>,
    pub health_checked: usize,
    pub learning: LearningReport,
}

/// Register one simulated source per configured entry
pub fn register_simulated_sources(context: &RouterContext, latency_scale: f64) -> usize {
    for config in &context.config().sources {
        context.register_source(Arc::new(SimulatedSource::from_config(config, latency_scale)));
    }
    context.config().sources.len()
}

/// Query types to exercise, one per concrete capability
pub fn query_types(sources: &[StaticSourceConfig]) -> Vec<String> {
    let mut types: Vec<String> = sources
        .iter()
        .flat_map(|source| source.descriptor.capabilities.iter())
        .filter_map(|capability| match capability {
            Capability::Any => None,
            Capability::Exact { domain, operation } => Some(format!("{domain}.{operation}")),
            Capability::Domain(domain) => Some(format!("{domain}.list")),
            Capability::Named(query_type) => Some(query_type.clone()),
        })
        .collect();
    types.sort();
    types.dedup();
    if types.is_empty() {
        types.push(FALLBACK_QUERY_TYPE.to_string());
    }
    types
}

/// Drive `options.queries` queries through the agent, then snapshot
/// health and run one learning cycle
pub async fn run_simulation(context: &RouterContext, options: &SimulationOptions) -> Result<SimulationReport> {
    let agent = context.agent();
    let types = query_types(&context.config().sources);
    info!(queries = options.queries, query_types = types.len(), "Starting simulation");

    let mut succeeded = 0;
    let mut served_by: BTreeMap<String, u64> = BTreeMap::new();
    for i in 0..options.queries {
        let query_type = &types[i % types.len()];
        let query = DataQuery::new(query_type.as_str())
            .with_id(format!("sim-{i}"))
            .with_widget(format!("{query_type}-widget"))
            .with_params(json!({ "page": i % 3 }));
        let params = query.params.clone();
        let operation = query_type.rsplit('.').next().unwrap_or(query_type).to_string();

        let outcome = agent
            .execute_and_learn(&query, |source| {
                let operation = operation.clone();
                let params = params.clone();
                async move { source.query(&operation, &params).await }
            })
            .await;

        match outcome {
            Ok(result) => {
                succeeded += 1;
                *served_by.entry(result.source).or_default() += 1;
            }
            Err(e) => debug!(query_id = %format!("sim-{i}"), error = %e, "Simulated query failed"),
        }
    }

    let monitor = HealthMonitor::new(
        context.registry().clone(),
        context.memory().clone(),
        context.event_bus().clone(),
        context.config().health_monitor.clone(),
    );
    let health_checked = monitor.check_all().await;

    let mut intelligence = Vec::new();
    for source in context.registry().get_all_sources() {
        intelligence.push(context.memory().get_source_intelligence(source.name()).await);
    }

    let learning = agent.learn().await;

    Ok(SimulationReport {
        queries: options.queries,
        succeeded,
        failed: options.queries - succeeded,
        served_by,
        stats: agent.stats(),
        intelligence,
        health_checked,
        learning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::domain::RouterConfig;

    fn source(name: &str, latency: u64, capabilities: &[&str], failure_rate: f64) -> StaticSourceConfig {
        StaticSourceConfig {
            descriptor: SourceDescriptor {
                name: name.to_string(),
                source_type: SourceType::Api,
                capabilities: capabilities.iter().map(|c| Capability::parse(c)).collect(),
                estimated_latency_ms: latency,
                cost_per_query: 0.0,
            },
            failure_rate,
            healthy: true,
        }
    }

    fn context(sources: Vec<StaticSourceConfig>) -> RouterContext {
        let config = RouterConfig {
            sources,
            ..RouterConfig::default()
        };
        let context = RouterContext::from_config(config);
        register_simulated_sources(&context, 0.0);
        context
    }

    #[test]
    fn test_query_types_from_capabilities() {
        let types = query_types(&[
            source("a", 10, &["agents.*", "*"], 0.0),
            source("b", 10, &["agents.list", "metrics"], 0.0),
        ]);
        assert_eq!(types, vec!["agents.list".to_string(), "metrics".to_string()]);

        assert_eq!(query_types(&[source("c", 10, &["*"], 0.0)]), vec![FALLBACK_QUERY_TYPE]);
    }

    #[tokio::test]
    async fn test_simulated_source_failure_rates() {
        let always = SimulatedSource::from_config(&source("always", 10, &["*"], 0.0), 0.0);
        let never = SimulatedSource::from_config(&source("never", 10, &["*"], 1.0), 0.0);

        for _ in 0..20 {
            assert!(always.query("read", &Value::Null).await.is_ok());
            let err = never.query("read", &Value::Null).await.unwrap_err();
            assert!(err.is_transient());
        }
        assert_eq!(always.served(), 20);
        assert_eq!(never.served(), 0);
    }

    #[tokio::test]
    async fn test_unhealthy_source_is_unavailable() {
        let mut config = source("down", 10, &["*"], 0.0);
        config.healthy = false;
        let down = SimulatedSource::from_config(&config, 0.0);

        assert!(!down.is_healthy().await);
        assert!(matches!(
            down.query("read", &Value::Null).await,
            Err(SourceError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_simulation_falls_back_from_broken_source() {
        let context = context(vec![
            source("flaky", 5, &["agents.*"], 1.0),
            source("steady", 80, &["agents.*"], 0.0),
        ]);

        let report = run_simulation(
            &context,
            &SimulationOptions {
                queries: 12,
                latency_scale: 0.0,
            },
        )
        .await
        .unwrap();

        assert_eq!(report.succeeded, 12);
        assert_eq!(report.failed, 0);
        assert_eq!(report.served_by.get("steady"), Some(&12));
        assert!(!report.served_by.contains_key("flaky"));
        assert_eq!(report.stats.total_decisions, 12);
        assert_eq!(report.health_checked, 2);
        assert_eq!(report.intelligence.len(), 2);
        assert!(report.learning.degraded_sources.contains(&"flaky".to_string()));
    }

    #[tokio::test]
    async fn test_simulation_reports_total_failures() {
        let context = context(vec![source("broken", 5, &["agents.list"], 1.0)]);

        let report = run_simulation(
            &context,
            &SimulationOptions {
                queries: 4,
                latency_scale: 0.0,
            },
        )
        .await
        .unwrap();

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 4);
        assert!(report.served_by.is_empty());
    }
}
