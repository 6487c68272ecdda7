// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

// Self-Healing Source - Circuit Breaker and Retry Decorator
//
// Wraps any DataSource:
// - Circuit opens after `failure_threshold` consecutive failed calls and
//   rejects with `Unavailable` until `reset_timeout` has passed
// - Half-open after the timeout; the first success closes the circuit,
//   a failure reopens it
// - Transient errors are retried with exponential backoff capped at
//   `max_backoff`
// - Every retry episode is recorded as a recovery attempt in cognitive
//   memory. Failures that are not retried are left to the caller to record.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use switchyard_cortex::{CognitiveMemory, FailureReport};
use tracing::{debug, info, warn};

use crate::domain::events::HealthEvent;
use crate::domain::router_config::SelfHealingConfig;
use crate::domain::source::{Capability, DataSource, SourceError, SourceType};
use crate::infrastructure::event_bus::EventBus;

pub const RETRY_RECOVERY_ACTION: &str = "retry";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct CircuitBreaker {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open: bool,
}

enum Admission {
    Allowed,
    Rejected { remaining: Duration },
}

impl CircuitBreaker {
    fn new() -> Self {
        Self {
            consecutive_failures: 0,
            opened_at: None,
            half_open: false,
        }
    }

    fn state(&self, reset_timeout: Duration) -> CircuitState {
        match self.opened_at {
            Some(opened_at) if opened_at.elapsed() < reset_timeout => CircuitState::Open,
            Some(_) => CircuitState::HalfOpen,
            None if self.half_open => CircuitState::HalfOpen,
            None => CircuitState::Closed,
        }
    }

    fn admit(&mut self, reset_timeout: Duration) -> Admission {
        match self.opened_at {
            Some(opened_at) => {
                let elapsed = opened_at.elapsed();
                if elapsed < reset_timeout {
                    Admission::Rejected {
                        remaining: reset_timeout - elapsed,
                    }
                } else {
                    self.opened_at = None;
                    self.half_open = true;
                    Admission::Allowed
                }
            }
            None => Admission::Allowed,
        }
    }

    /// Returns true when this success closed a half-open circuit
    fn on_success(&mut self) -> bool {
        let was_half_open = self.half_open;
        self.consecutive_failures = 0;
        self.half_open = false;
        self.opened_at = None;
        was_half_open
    }

    /// Returns true when this failure opened the circuit
    fn on_failure(&mut self, threshold: u32) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.half_open || (self.opened_at.is_none() && self.consecutive_failures >= threshold) {
            self.half_open = false;
            self.opened_at = Some(Instant::now());
            return true;
        }
        false
    }
}

pub struct SelfHealingSource {
    inner: Arc<dyn DataSource>,
    memory: Arc<CognitiveMemory>,
    config: SelfHealingConfig,
    breaker: Mutex<CircuitBreaker>,
    event_bus: Option<EventBus>,
}

impl SelfHealingSource {
    pub fn new(inner: Arc<dyn DataSource>, memory: Arc<CognitiveMemory>, config: SelfHealingConfig) -> Self {
        Self {
            inner,
            memory,
            config,
            breaker: Mutex::new(CircuitBreaker::new()),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.lock().state(self.config.reset_timeout)
    }

    pub fn inner(&self) -> &Arc<dyn DataSource> {
        &self.inner
    }

    /// `base_backoff * 2^attempt`, capped at `max_backoff`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.config
            .base_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.config.max_backoff)
    }

    fn record_success(&self) {
        if self.breaker.lock().on_success() {
            info!(source = %self.inner.name(), "Circuit closed after successful half-open call");
            if let Some(bus) = &self.event_bus {
                bus.publish_health_event(HealthEvent::CircuitClosed {
                    source: self.inner.name().to_string(),
                    closed_at: Utc::now(),
                });
            }
        }
    }

    fn record_breaker_failure(&self) {
        let (opened, consecutive_failures) = {
            let mut breaker = self.breaker.lock();
            let opened = breaker.on_failure(self.config.failure_threshold);
            (opened, breaker.consecutive_failures)
        };
        if opened {
            warn!(
                source = %self.inner.name(),
                consecutive_failures,
                reset_timeout = ?self.config.reset_timeout,
                "Circuit opened"
            );
            if let Some(bus) = &self.event_bus {
                bus.publish_health_event(HealthEvent::CircuitOpened {
                    source: self.inner.name().to_string(),
                    consecutive_failures,
                    opened_at: Utc::now(),
                });
            }
        }
    }

    async fn record_recovery(&self, first_error: &SourceError, operation: &str, success: bool, elapsed: Duration) {
        let report = FailureReport::new(self.inner.name(), first_error.error_type(), first_error.to_string())
            .with_query_context(serde_json::json!({ "operation": operation }))
            .with_recovery(RETRY_RECOVERY_ACTION, success, Some(elapsed.as_millis() as u64));
        if let Err(e) = self.memory.record_failure(report).await {
            warn!(source = %self.inner.name(), error = %e, "Failed to record recovery attempt");
        }
    }
}

#[async_trait]
impl DataSource for SelfHealingSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn source_type(&self) -> SourceType {
        self.inner.source_type()
    }

    fn capabilities(&self) -> &[Capability] {
        self.inner.capabilities()
    }

    fn estimated_latency_ms(&self) -> u64 {
        self.inner.estimated_latency_ms()
    }

    fn cost_per_query(&self) -> f64 {
        self.inner.cost_per_query()
    }

    async fn is_healthy(&self) -> bool {
        if self.circuit_state() == CircuitState::Open {
            return false;
        }
        self.inner.is_healthy().await
    }

    async fn query(&self, operation: &str, params: &Value) -> Result<Value, SourceError> {
        let admission = self.breaker.lock().admit(self.config.reset_timeout);
        if let Admission::Rejected { remaining } = admission {
            debug!(source = %self.inner.name(), ?remaining, "Circuit open, rejecting call");
            return Err(SourceError::Unavailable(format!(
                "circuit open for {}ms",
                remaining.as_millis()
            )));
        }

        let started = Instant::now();
        let mut first_error: Option<SourceError> = None;
        let mut attempt: u32 = 0;

        loop {
            match self.inner.query(operation, params).await {
                Ok(value) => {
                    self.record_success();
                    if let Some(error) = &first_error {
                        info!(
                            source = %self.inner.name(),
                            retries = attempt,
                            "Recovered after retry"
                        );
                        self.record_recovery(error, operation, true, started.elapsed()).await;
                    }
                    return Ok(value);
                }
                Err(e) => {
                    let retryable = e.is_transient() && attempt < self.config.max_retries;
                    if !retryable {
                        self.record_breaker_failure();
                        if let Some(error) = &first_error {
                            warn!(
                                source = %self.inner.name(),
                                retries = attempt,
                                error = %e,
                                "Retries exhausted"
                            );
                            self.record_recovery(error, operation, false, started.elapsed()).await;
                        }
                        return Err(e);
                    }

                    let delay = self.backoff_for(attempt);
                    debug!(
                        source = %self.inner.name(),
                        attempt = attempt + 1,
                        error = %e,
                        ?delay,
                        "Transient failure, retrying"
                    );
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
