// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

// Router Context - Dependency wiring for one router instance
//
// Builds registry, memory, event bus, decision log and agent from a
// RouterConfig. Nothing here is global; tests and the CLI each build
// their own context.

use std::sync::Arc;

use switchyard_cortex::CognitiveMemory;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::agent::AutonomousAgent;
use crate::application::health_monitor::HealthMonitor;
use crate::application::learning_loop::{start_autonomous_learning, LearningLoop};
use crate::domain::decision_log::DecisionLog;
use crate::domain::router_config::RouterConfig;
use crate::domain::source::DataSource;
use crate::infrastructure::decision_log::NoopDecisionLog;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::self_healing::SelfHealingSource;
use crate::infrastructure::source_registry::SourceRegistry;

pub struct RouterContext {
    config: RouterConfig,
    registry: Arc<SourceRegistry>,
    memory: Arc<CognitiveMemory>,
    event_bus: EventBus,
    agent: Arc<AutonomousAgent>,
}

impl RouterContext {
    /// Context with in-memory stores and no decision log
    pub fn from_config(config: RouterConfig) -> Self {
        Self::with_decision_log(config, Arc::new(NoopDecisionLog))
    }

    pub fn with_decision_log(config: RouterConfig, decision_log: Arc<dyn DecisionLog>) -> Self {
        let memory = Arc::new(CognitiveMemory::in_memory(config.memory.clone()));
        let registry = Arc::new(SourceRegistry::new());
        let event_bus = EventBus::new(config.agent.event_bus_capacity);
        let agent = Arc::new(AutonomousAgent::new(
            registry.clone(),
            memory.clone(),
            config.decision.clone(),
            config.agent.clone(),
            event_bus.clone(),
            decision_log,
        ));

        Self {
            config,
            registry,
            memory,
            event_bus,
            agent,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn memory(&self) -> &Arc<CognitiveMemory> {
        &self.memory
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn agent(&self) -> &Arc<AutonomousAgent> {
        &self.agent
    }

    /// Register a source, wrapping it in the self-healing decorator when
    /// self-healing is enabled
    pub fn register_source(&self, source: Arc<dyn DataSource>) {
        let source: Arc<dyn DataSource> = if self.config.self_healing.enabled {
            Arc::new(
                SelfHealingSource::new(source, self.memory.clone(), self.config.self_healing.clone())
                    .with_event_bus(self.event_bus.clone()),
            )
        } else {
            source
        };
        self.registry.register_source(source);
    }

    /// Spawn the learning loop and health monitor as configured
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let learning = self
            .config
            .learning
            .enabled
            .then(|| start_autonomous_learning(self.agent.clone(), self.config.learning.clone()));

        let health = self.config.health_monitor.enabled.then(|| {
            let monitor = Arc::new(HealthMonitor::new(
                self.registry.clone(),
                self.memory.clone(),
                self.event_bus.clone(),
                self.config.health_monitor.clone(),
            ));
            let token = monitor.shutdown_token();
            (token, monitor.start())
        });

        info!(
            learning = learning.is_some(),
            health_monitor = health.is_some(),
            "Background tasks started"
        );
        BackgroundTasks { learning, health }
    }
}

/// Handles to the tasks started by `RouterContext::start_background_tasks`
pub struct BackgroundTasks {
    learning: Option<LearningLoop>,
    health: Option<(CancellationToken, JoinHandle<()>)>,
}

impl BackgroundTasks {
    /// Stop every task and wait for them to finish
    pub async fn shutdown(self) {
        if let Some(learning) = self.learning {
            learning.shutdown().await;
        }
        if let Some((token, handle)) = self.health {
            token.cancel();
            if let Err(e) = handle.await {
                warn!("Health monitor task ended abnormally: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::DataQuery;
    use crate::domain::source::{Capability, SourceError, SourceType};
    use async_trait::async_trait;
    use serde_json::Value;

    struct EchoSource {
        capabilities: Vec<Capability>,
    }

    #[async_trait]
    impl DataSource for EchoSource {
        fn name(&self) -> &str {
            "echo"
        }

        fn source_type(&self) -> SourceType {
            SourceType::Other
        }

        fn capabilities(&self) -> &[Capability] {
            &self.capabilities
        }

        fn estimated_latency_ms(&self) -> u64 {
            1
        }

        async fn is_healthy(&self) -> bool {
            true
        }

        async fn query(&self, operation: &str, _params: &Value) -> Result<Value, SourceError> {
            Ok(Value::from(operation))
        }
    }

    #[tokio::test]
    async fn test_context_wires_agent_to_registry() {
        let mut config = RouterConfig::default();
        config.self_healing.enabled = true;
        let context = RouterContext::from_config(config);
        context.register_source(Arc::new(EchoSource {
            capabilities: vec![Capability::Any],
        }));

        let result = context
            .agent()
            .execute_and_learn(&DataQuery::new("echo.ping"), |source| async move {
                source.query("ping", &Value::Null).await
            })
            .await
            .unwrap();
        assert_eq!(result.source, "echo");
        assert_eq!(result.data, Value::from("ping"));
    }

    #[tokio::test]
    async fn test_background_tasks_shut_down() {
        let context = RouterContext::from_config(RouterConfig::default());
        let tasks = context.start_background_tasks();
        tasks.shutdown().await;
    }
}
