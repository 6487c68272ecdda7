// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Health Monitor - Background polling of registered sources
//!
//! Every interval, asks each registered source (concurrently) whether it
//! is healthy and stores a `HealthMetrics` snapshot built from the answer
//! and from what memory has observed recently (latency percentiles, success
//! and error counts). One source failing to produce a snapshot does not stop the
//! cycle.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Periodic source health snapshots

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use switchyard_cortex::{CognitiveMemory, HealthMetrics, LatencyPercentiles};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::events::HealthEvent;
use crate::domain::router_config::HealthMonitorConfig;
use crate::domain::source::DataSource;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::source_registry::SourceRegistry;

/// `interval` panics on a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub struct HealthMonitor {
    registry: Arc<SourceRegistry>,
    memory: Arc<CognitiveMemory>,
    event_bus: EventBus,
    config: HealthMonitorConfig,
    shutdown_token: CancellationToken,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<SourceRegistry>,
        memory: Arc<CognitiveMemory>,
        event_bus: EventBus,
        config: HealthMonitorConfig,
    ) -> Self {
        Self {
            registry,
            memory,
            event_bus,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the monitor background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled {
            info!("Health monitor is disabled");
            return;
        }

        info!(interval = ?self.config.interval, "Starting health monitor background task");

        if self.config.interval < MIN_INTERVAL {
            warn!(interval = ?self.config.interval, "Health check interval too short, clamping to {:?}", MIN_INTERVAL);
        }
        let mut tick = interval(self.config.interval.max(MIN_INTERVAL));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let checked = self.check_all().await;
                    debug!(checked, "Health check cycle completed");
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping health monitor");
                    break;
                }
            }
        }

        info!("Health monitor background task stopped");
    }

    /// Snapshot every registered source concurrently; returns how many
    /// were recorded
    pub async fn check_all(&self) -> usize {
        let sources = self.registry.get_all_sources();
        let results = join_all(sources.iter().map(|source| self.check_source(source.as_ref()))).await;

        let mut recorded = 0;
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(metrics) => {
                    recorded += 1;
                    self.event_bus.publish_health_event(HealthEvent::SourceHealthChecked {
                        source: metrics.source_name,
                        healthy: metrics.health_score > 0.0,
                        health_score: metrics.health_score,
                        checked_at: metrics.timestamp,
                    });
                }
                Err(e) => {
                    warn!(source = %source.name(), error = %e, "Health check failed");
                }
            }
        }
        recorded
    }

    /// Build and store one source's snapshot
    pub async fn check_source(&self, source: &dyn DataSource) -> Result<HealthMetrics> {
        let healthy = source.is_healthy().await;
        let summary = self.memory.outcome_summary(source.name()).await?;
        let latency = self
            .memory
            .latency_percentiles(source.name())
            .await?
            .unwrap_or_else(|| LatencyPercentiles::uniform(source.estimated_latency_ms() as f64));

        let success_rate = summary.success_rate().unwrap_or(1.0);
        let metrics = HealthMetrics {
            source_name: source.name().to_string(),
            health_score: if healthy { success_rate } else { 0.0 },
            latency,
            success_rate,
            request_count: summary.total,
            error_count: summary.failures(),
            timestamp: Utc::now(),
        };

        if !healthy {
            warn!(source = %source.name(), "Source reported unhealthy");
        }
        self.memory.record_health_metrics(metrics.clone()).await?;
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::{Capability, SourceError, SourceType};
    use crate::infrastructure::event_bus::DomainEvent;
    use async_trait::async_trait;
    use serde_json::Value;
    use switchyard_cortex::{MemoryConfig, QueryOutcome};

    struct ProbeSource {
        name: &'static str,
        healthy: bool,
        capabilities: Vec<Capability>,
    }

    #[async_trait]
    impl DataSource for ProbeSource {
        fn name(&self) -> &str {
            self.name
        }

        fn source_type(&self) -> SourceType {
            SourceType::Api
        }

        fn capabilities(&self) -> &[Capability] {
            &self.capabilities
        }

        fn estimated_latency_ms(&self) -> u64 {
            120
        }

        async fn is_healthy(&self) -> bool {
            self.healthy
        }

        async fn query(&self, _operation: &str, _params: &Value) -> Result<Value, SourceError> {
            Ok(Value::Null)
        }
    }

    fn monitor() -> HealthMonitor {
        let registry = Arc::new(SourceRegistry::new());
        for (name, healthy) in [("up", true), ("down", false)] {
            registry.register_source(Arc::new(ProbeSource {
                name,
                healthy,
                capabilities: vec![Capability::Any],
            }));
        }
        HealthMonitor::new(
            registry,
            Arc::new(CognitiveMemory::in_memory(MemoryConfig::default())),
            EventBus::new(16),
            HealthMonitorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_check_all_records_snapshots() {
        let monitor = monitor();
        let mut events = monitor.event_bus.subscribe();

        for (latency_ms, success) in [(10, true), (30, true), (500, false), (20, true)] {
            monitor
                .memory
                .record_query(QueryOutcome {
                    widget_id: "w".into(),
                    query_type: "agents.list".into(),
                    query_params: Value::Null,
                    source_used: "up".into(),
                    latency_ms,
                    result_size: None,
                    success,
                })
                .await
                .unwrap();
        }

        assert_eq!(monitor.check_all().await, 2);

        let up = monitor.memory.get_source_health("up").await.unwrap();
        assert_eq!(up.request_count, 4);
        assert_eq!(up.error_count, 1);
        assert_eq!(up.health_score, 0.75);
        assert_eq!(up.latency.p50, 20.0);

        let down = monitor.memory.get_source_health("down").await.unwrap();
        assert_eq!(down.health_score, 0.0);
        assert_eq!(down.latency, LatencyPercentiles::uniform(120.0));

        let mut checked = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, DomainEvent::Health(HealthEvent::SourceHealthChecked { .. })) {
                checked += 1;
            }
        }
        assert_eq!(checked, 2);
    }

    #[tokio::test]
    async fn test_zero_interval_is_clamped() {
        let mut monitor = monitor();
        monitor.config.interval = std::time::Duration::ZERO;
        let monitor = Arc::new(monitor);
        let token = monitor.shutdown_token();
        let handle = monitor.clone().start();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        token.cancel();
        handle.await.unwrap();

        assert!(!monitor.memory.get_health_history("up", 100).await.is_empty());
    }

    #[tokio::test]
    async fn test_monitor_stops_on_shutdown() {
        let mut monitor = monitor();
        monitor.config.interval = std::time::Duration::from_millis(5);
        let monitor = Arc::new(monitor);
        let token = monitor.shutdown_token();
        let handle = monitor.clone().start();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        token.cancel();
        handle.await.unwrap();

        assert!(!monitor.memory.get_health_history("up", 100).await.is_empty());
    }
}
