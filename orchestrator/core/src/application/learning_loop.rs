// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Learning Loop - Background scheduler for the agent's learning cycle
//!
//! Runs `learn()` once after a warm-up delay, then on a fixed interval.
//! A cycle is always awaited before the next tick is taken and missed
//! ticks are skipped, so cycles never overlap. After each cycle memory
//! older than the retention period is purged when one is configured.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Periodic learning and memory retention

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::agent::AutonomousAgent;
use crate::domain::events::LearningEvent;
use crate::domain::router_config::LearningConfig;

/// Shortest period the loop will tick at; `interval_at` panics on zero
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a running learning loop
pub struct LearningLoop {
    shutdown_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl LearningLoop {
    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Signal the loop to stop without waiting for it
    pub fn stop(&self) {
        self.shutdown_token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the loop to stop and wait for the current cycle to finish
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();
        if let Err(e) = self.handle.await {
            warn!("Learning loop task ended abnormally: {}", e);
        }
    }
}

/// Spawn the background learning loop for an agent
pub fn start_autonomous_learning(agent: Arc<AutonomousAgent>, config: LearningConfig) -> LearningLoop {
    let shutdown_token = CancellationToken::new();
    let token = shutdown_token.clone();
    let handle = tokio::spawn(async move {
        run(agent, config, token).await;
    });
    LearningLoop { shutdown_token, handle }
}

async fn run(agent: Arc<AutonomousAgent>, config: LearningConfig, shutdown_token: CancellationToken) {
    if !config.enabled {
        info!("Autonomous learning is disabled");
        return;
    }

    info!(
        warmup_delay = ?config.warmup_delay,
        interval = ?config.interval,
        retention_days = ?config.retention_days,
        "Starting autonomous learning loop"
    );

    tokio::select! {
        _ = tokio::time::sleep(config.warmup_delay) => {
            run_cycle(&agent, &config).await;
        }
        _ = shutdown_token.cancelled() => {
            info!("Shutdown signal received before warm-up completed, stopping learning loop");
            return;
        }
    }

    if config.interval < MIN_INTERVAL {
        warn!(interval = ?config.interval, "Learning interval too short, clamping to {:?}", MIN_INTERVAL);
    }
    let period = config.interval.max(MIN_INTERVAL);
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                run_cycle(&agent, &config).await;
            }
            _ = shutdown_token.cancelled() => {
                info!("Shutdown signal received, stopping learning loop");
                break;
            }
        }
    }

    info!("Autonomous learning loop stopped");
}

async fn run_cycle(agent: &AutonomousAgent, config: &LearningConfig) {
    debug!("Running learning cycle");
    let report = agent.learn().await;
    info!(
        degraded_sources = report.degraded_sources.len(),
        confident_widgets = report.confident_widgets.len(),
        predictions_refreshed = report.predictions_refreshed,
        predictions_evicted = report.predictions_evicted,
        all_steps_completed = report.all_completed(),
        duration_ms = report.duration_ms,
        "Learning cycle completed"
    );

    let Some(retention_days) = config.retention_days else {
        return;
    };
    match agent.memory().cleanup(retention_days).await {
        Ok(cleaned) => {
            if cleaned.total() > 0 {
                agent.event_bus().publish_learning_event(LearningEvent::MemoryCleaned {
                    patterns: cleaned.patterns,
                    failures: cleaned.failures,
                    health_records: cleaned.health_records,
                    cleaned_at: Utc::now(),
                });
            }
        }
        Err(e) => {
            warn!("Memory cleanup failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::router_config::{AgentConfig, DecisionConfig};
    use crate::infrastructure::decision_log::NoopDecisionLog;
    use crate::infrastructure::event_bus::{DomainEvent, EventBus};
    use crate::infrastructure::source_registry::SourceRegistry;
    use switchyard_cortex::{CognitiveMemory, MemoryConfig};

    fn agent() -> Arc<AutonomousAgent> {
        Arc::new(AutonomousAgent::new(
            Arc::new(SourceRegistry::new()),
            Arc::new(CognitiveMemory::in_memory(MemoryConfig::default())),
            DecisionConfig::default(),
            AgentConfig::default(),
            EventBus::new(64),
            Arc::new(NoopDecisionLog),
        ))
    }

    fn config(warmup_ms: u64, interval_ms: u64) -> LearningConfig {
        LearningConfig {
            enabled: true,
            interval: Duration::from_millis(interval_ms),
            warmup_delay: Duration::from_millis(warmup_ms),
            retention_days: None,
        }
    }

    fn count_cycles(receiver: &mut crate::infrastructure::event_bus::EventReceiver) -> usize {
        let mut cycles = 0;
        while let Ok(event) = receiver.try_recv() {
            if matches!(event, DomainEvent::Learning(LearningEvent::LearningCycleCompleted { .. })) {
                cycles += 1;
            }
        }
        cycles
    }

    #[tokio::test]
    async fn test_warmup_then_interval_cycles() {
        let agent = agent();
        let mut receiver = agent.event_bus().subscribe();

        let learning = start_autonomous_learning(agent.clone(), config(5, 20));
        tokio::time::sleep(Duration::from_millis(80)).await;
        learning.shutdown().await;

        assert!(count_cycles(&mut receiver) >= 2);
    }

    #[tokio::test]
    async fn test_shutdown_before_warmup_runs_nothing() {
        let agent = agent();
        let mut receiver = agent.event_bus().subscribe();

        let learning = start_autonomous_learning(agent.clone(), config(10_000, 10_000));
        learning.shutdown().await;

        assert_eq!(count_cycles(&mut receiver), 0);
    }

    #[tokio::test]
    async fn test_zero_interval_is_clamped() {
        let agent = agent();
        let mut receiver = agent.event_bus().subscribe();

        let learning = start_autonomous_learning(agent.clone(), config(0, 0));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!learning.is_finished(), "loop must keep running rather than panic");
        learning.shutdown().await;

        assert!(count_cycles(&mut receiver) >= 1);
    }

    #[tokio::test]
    async fn test_disabled_loop_exits_immediately() {
        let mut disabled = config(0, 10);
        disabled.enabled = false;
        let learning = start_autonomous_learning(agent(), disabled);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(learning.is_finished());
    }
}
