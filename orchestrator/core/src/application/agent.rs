// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Autonomous Agent
//!
//! Routes queries to data sources and learns from every outcome:
//! - `route` picks the best capable source without executing anything
//! - `execute_and_learn` runs the caller's executor against ranked
//!   candidates one at a time until one succeeds, recording each attempt
//! - `predict_and_prefetch` caches the expected source for widgets with a
//!   strong time-of-day pattern
//! - `learn` runs one learning cycle; see `learning_loop` for scheduling
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Query routing with fallback and feedback into memory

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::json;
use switchyard_cortex::{CognitiveMemory, FailureReport, QueryOutcome};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::decision_engine::{DecisionEngine, MAX_ALTERNATIVES};
use crate::domain::decision::{
    AgentStats, Alternative, DecisionRecord, DecisionResult, LearningReport, Prediction, ScoredCandidate,
    SourceSelectionCount, StepOutcome,
};
use crate::domain::decision_log::DecisionLog;
use crate::domain::error::{RouterError, SourceAttemptError};
use crate::domain::events::{LearningEvent, RoutingEvent};
use crate::domain::query::{DataQuery, QueryIntent, QueryResult};
use crate::domain::router_config::{AgentConfig, DecisionConfig};
use crate::domain::source::{DataSource, SourceError};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::source_registry::SourceRegistry;

/// Sources reported by `stats()`
pub const TOP_SOURCES_LIMIT: usize = 5;

#[derive(Debug, Default)]
struct DecisionTally {
    total: u64,
    confidence_sum: f64,
    selections: HashMap<String, u64>,
}

pub struct AutonomousAgent {
    registry: Arc<SourceRegistry>,
    memory: Arc<CognitiveMemory>,
    engine: DecisionEngine,
    event_bus: EventBus,
    decision_log: Arc<dyn DecisionLog>,
    config: AgentConfig,
    predictions: RwLock<HashMap<String, Prediction>>,
    tally: Mutex<DecisionTally>,
}

impl AutonomousAgent {
    pub fn new(
        registry: Arc<SourceRegistry>,
        memory: Arc<CognitiveMemory>,
        decision_config: DecisionConfig,
        config: AgentConfig,
        event_bus: EventBus,
        decision_log: Arc<dyn DecisionLog>,
    ) -> Self {
        Self {
            engine: DecisionEngine::new(memory.clone(), decision_config),
            registry,
            memory,
            event_bus,
            decision_log,
            config,
            predictions: RwLock::new(HashMap::new()),
            tally: Mutex::new(DecisionTally::default()),
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn memory(&self) -> &Arc<CognitiveMemory> {
        &self.memory
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Pick the best capable source for a query without executing it
    pub async fn route(&self, query: &DataQuery) -> Result<Arc<dyn DataSource>, RouterError> {
        let query_id = query_id(query);
        let intent = self.engine.analyze_intent(query);
        let candidates = self.capable_sources(&intent)?;

        let decision = self.engine.decide(&candidates, &intent).await?;
        info!(
            query_id = %query_id,
            query_type = %intent.query_type,
            source = %decision.selected_source.name(),
            confidence = decision.confidence,
            "Routed query"
        );
        self.note_decision(&query_id, &intent, &decision, candidates.len());

        Ok(decision.selected_source)
    }

    /// Execute a query against ranked candidates with sequential fallback.
    ///
    /// The executor is called with one source at a time, best first. The
    /// first success is returned; every failure is recorded and the next
    /// candidate tried. When all fail the error lists each attempt in order.
    pub async fn execute_and_learn<T, F, Fut>(
        &self,
        query: &DataQuery,
        executor: F,
    ) -> Result<QueryResult<T>, RouterError>
    where
        T: Serialize,
        F: Fn(Arc<dyn DataSource>) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let query_id = query_id(query);
        let intent = self.engine.analyze_intent(query);
        let candidates = self.capable_sources(&intent)?;

        let ranked = self.engine.score_all_sources(&candidates, &intent).await?;
        let decision = self.engine.decide_ranked(&ranked)?;
        self.note_decision(&query_id, &intent, &decision, ranked.len());

        let widget_id = query.widget_or_unknown();
        let mut attempts: Vec<SourceAttemptError> = Vec::with_capacity(ranked.len());

        for (index, candidate) in ranked.iter().enumerate() {
            let attempt = index + 1;
            let source_name = candidate.source_name().to_string();
            let started = Instant::now();

            let outcome = match self.config.attempt_timeout {
                Some(limit) => match tokio::time::timeout(limit, executor(candidate.source.clone())).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::Timeout {
                        after_ms: limit.as_millis() as u64,
                    }),
                },
                None => executor(candidate.source.clone()).await,
            };
            let latency_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(data) => {
                    let result_size = serde_json::to_vec(&data).ok().map(|bytes| bytes.len() as u64);
                    self.record_outcome(widget_id, &intent, &source_name, latency_ms, result_size, true)
                        .await;

                    counter!(
                        "switchyard_queries_total",
                        "source" => source_name.clone(),
                        "outcome" => "success"
                    )
                    .increment(1);
                    histogram!("switchyard_query_latency_ms", "source" => source_name.clone())
                        .record(latency_ms as f64);

                    info!(
                        query_id = %query_id,
                        query_type = %intent.query_type,
                        source = %source_name,
                        attempt,
                        latency_ms,
                        "Query served"
                    );

                    self.event_bus.publish_routing_event(RoutingEvent::QueryRouted {
                        query_id: query_id.clone(),
                        query_type: intent.query_type.clone(),
                        selected_source: source_name.clone(),
                        confidence: decision.confidence,
                        alternatives: alternatives_excluding(&ranked, &source_name),
                        reasoning: served_reasoning(candidate, attempt),
                        latency_ms,
                        attempt,
                        routed_at: Utc::now(),
                    });

                    return Ok(QueryResult {
                        data,
                        source: source_name,
                        latency_ms,
                        cached: false,
                        timestamp: Utc::now(),
                    });
                }
                Err(source_error) => {
                    warn!(
                        query_id = %query_id,
                        source = %source_name,
                        attempt,
                        error_type = source_error.error_type(),
                        error = %source_error,
                        "Source attempt failed, falling back"
                    );
                    counter!(
                        "switchyard_attempt_failures_total",
                        "source" => source_name.clone(),
                        "error_type" => source_error.error_type()
                    )
                    .increment(1);

                    let report = FailureReport::new(&source_name, source_error.error_type(), source_error.to_string())
                        .with_query_context(json!({
                            "queryId": query_id,
                            "type": intent.query_type,
                            "params": intent.params,
                            "attempt": attempt,
                        }));
                    if let Err(e) = self.memory.record_failure(report).await {
                        warn!(source = %source_name, error = %e, "Failed to record source failure");
                    }
                    self.record_outcome(widget_id, &intent, &source_name, latency_ms, None, false)
                        .await;

                    self.event_bus.publish_routing_event(RoutingEvent::AttemptFailed {
                        query_id: query_id.clone(),
                        source: source_name.clone(),
                        error_type: source_error.error_type().to_string(),
                        message: source_error.to_string(),
                        attempt,
                        failed_at: Utc::now(),
                    });

                    attempts.push(SourceAttemptError {
                        source_name,
                        error: source_error,
                    });
                }
            }
        }

        counter!("switchyard_queries_total", "source" => "none", "outcome" => "failed").increment(1);
        error!(
            query_id = %query_id,
            query_type = %intent.query_type,
            attempts = attempts.len(),
            "All candidate sources failed"
        );
        self.event_bus.publish_routing_event(RoutingEvent::AllSourcesFailed {
            query_id,
            query_type: intent.query_type.clone(),
            attempts: attempts.iter().map(ToString::to_string).collect(),
            failed_at: Utc::now(),
        });

        Err(RouterError::AllSourcesFailed { attempts })
    }

    /// Cache the expected source for a widget if its pattern for the
    /// current hour is strong enough
    pub async fn predict_and_prefetch(&self, widget_id: &str) -> Option<Prediction> {
        self.predict_and_prefetch_at(widget_id, Utc::now()).await
    }

    pub async fn predict_and_prefetch_at(&self, widget_id: &str, now: DateTime<Utc>) -> Option<Prediction> {
        let hour = switchyard_cortex::UserContext::at(now).time_of_day;
        let pattern = self.memory.get_widget_patterns(widget_id).await;

        let frequency = pattern.frequency_at(hour).unwrap_or(0);
        if frequency < self.config.prefetch_confidence_threshold {
            debug!(
                widget_id,
                hour,
                frequency,
                threshold = self.config.prefetch_confidence_threshold,
                "Pattern below prefetch threshold"
            );
            return None;
        }

        let source = pattern.common_sources.first()?.clone();
        let prediction = Prediction {
            widget_id: widget_id.to_string(),
            source: source.clone(),
            hour,
            frequency,
            predicted_at: now,
        };
        self.predictions
            .write()
            .insert(widget_id.to_string(), prediction.clone());

        info!(widget_id, source = %source, hour, frequency, "Prefetch prediction cached");
        self.event_bus.publish_learning_event(LearningEvent::PredictionCached {
            widget_id: widget_id.to_string(),
            source,
            hour,
            frequency,
            cached_at: now,
        });

        Some(prediction)
    }

    /// Cached prediction for a widget, if one exists and has not expired
    pub fn prediction(&self, widget_id: &str) -> Option<Prediction> {
        let prediction = self.predictions.read().get(widget_id).cloned()?;
        (!self.is_expired(&prediction, Utc::now())).then_some(prediction)
    }

    /// Run one learning cycle. Each step handles its own failure so the
    /// others still run.
    pub async fn learn(&self) -> LearningReport {
        let started_at = Utc::now();
        let started = Instant::now();
        debug!("Learning cycle started");

        let (decision_quality, degraded_sources) = match self.analyze_decision_quality().await {
            Ok(degraded) => (
                StepOutcome::Completed {
                    detail: format!("{} degraded source(s)", degraded.len()),
                },
                degraded,
            ),
            Err(e) => {
                error!(error = %e, "Learning step failed: decision quality analysis");
                (StepOutcome::Failed { error: format!("{e:#}") }, Vec::new())
            }
        };

        let (pattern_identification, confident_widgets) = match self.identify_patterns(started_at).await {
            Ok(widgets) => (
                StepOutcome::Completed {
                    detail: format!("{} confident widget(s)", widgets.len()),
                },
                widgets,
            ),
            Err(e) => {
                error!(error = %e, "Learning step failed: pattern identification");
                (StepOutcome::Failed { error: format!("{e:#}") }, Vec::new())
            }
        };

        let (prediction_refresh, predictions_refreshed, predictions_evicted) =
            match self.refresh_predictions(&confident_widgets, started_at).await {
                Ok((refreshed, evicted)) => (
                    StepOutcome::Completed {
                        detail: format!("{refreshed} refreshed, {evicted} evicted"),
                    },
                    refreshed,
                    evicted,
                ),
                Err(e) => {
                    error!(error = %e, "Learning step failed: prediction refresh");
                    (StepOutcome::Failed { error: format!("{e:#}") }, 0, 0)
                }
            };

        let report = LearningReport {
            decision_quality,
            pattern_identification,
            prediction_refresh,
            degraded_sources,
            confident_widgets,
            predictions_refreshed,
            predictions_evicted,
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        self.event_bus.publish_learning_event(LearningEvent::LearningCycleCompleted {
            degraded_sources: report.degraded_sources.clone(),
            confident_widgets: report.confident_widgets.clone(),
            predictions_refreshed: report.predictions_refreshed,
            predictions_evicted: report.predictions_evicted,
            all_steps_completed: report.all_completed(),
            completed_at: Utc::now(),
        });

        report
    }

    /// Total decisions, average confidence and most selected sources
    pub fn stats(&self) -> AgentStats {
        let tally = self.tally.lock();

        let mut top_sources: Vec<SourceSelectionCount> = tally
            .selections
            .iter()
            .map(|(source, count)| SourceSelectionCount {
                source: source.clone(),
                count: *count,
            })
            .collect();
        top_sources.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source.cmp(&b.source)));
        top_sources.truncate(TOP_SOURCES_LIMIT);

        AgentStats {
            total_decisions: tally.total,
            average_confidence: if tally.total > 0 {
                tally.confidence_sum / tally.total as f64
            } else {
                0.0
            },
            top_sources,
        }
    }

    fn capable_sources(&self, intent: &QueryIntent) -> Result<Vec<Arc<dyn DataSource>>, RouterError> {
        let candidates = self.registry.get_capable_sources(intent);
        if candidates.is_empty() {
            warn!(query_type = %intent.query_type, "No sources available for query");
            return Err(RouterError::NoSourcesAvailable {
                intent_type: intent.query_type.clone(),
            });
        }
        Ok(candidates)
    }

    /// Update decision stats and hand the record to the decision log
    /// without waiting for it
    fn note_decision(&self, query_id: &str, intent: &QueryIntent, decision: &DecisionResult, candidate_count: usize) {
        {
            let mut tally = self.tally.lock();
            tally.total += 1;
            tally.confidence_sum += decision.confidence;
            *tally
                .selections
                .entry(decision.selected_source.name().to_string())
                .or_insert(0) += 1;
        }

        let record = DecisionRecord {
            query_id: query_id.to_string(),
            query_type: intent.query_type.clone(),
            domain: intent.domain.clone(),
            priority: intent.priority,
            selected_source: decision.selected_source.name().to_string(),
            score: decision.score,
            confidence: decision.confidence,
            reasoning: decision.reasoning.clone(),
            alternatives: decision.alternatives.clone(),
            candidate_count,
            decided_at: Utc::now(),
        };
        let log = self.decision_log.clone();
        tokio::spawn(async move {
            let query_id = record.query_id.clone();
            if let Err(e) = log.record(record).await {
                warn!(query_id = %query_id, error = %e, "Failed to write decision log");
            }
        });
    }

    async fn record_outcome(
        &self,
        widget_id: &str,
        intent: &QueryIntent,
        source_name: &str,
        latency_ms: u64,
        result_size: Option<u64>,
        success: bool,
    ) {
        let outcome = QueryOutcome {
            widget_id: widget_id.to_string(),
            query_type: intent.query_type.clone(),
            query_params: intent.params.clone(),
            source_used: source_name.to_string(),
            latency_ms,
            result_size,
            success,
        };
        if let Err(e) = self.memory.record_query(outcome).await {
            warn!(source = %source_name, error = %e, "Failed to record query outcome");
        }
    }

    /// Sources whose recent success rate fell below the degraded threshold
    async fn analyze_decision_quality(&self) -> Result<Vec<String>> {
        let mut sources: BTreeSet<String> = self.memory.known_sources().await?.into_iter().collect();
        sources.extend(self.registry.get_all_sources().iter().map(|s| s.name().to_string()));

        let mut degraded = Vec::new();
        for source in sources {
            let summary = self.memory.outcome_summary(&source).await?;
            if let Some(rate) = summary.success_rate() {
                if rate < self.config.degraded_success_rate {
                    warn!(
                        source = %source,
                        success_rate = rate,
                        total = summary.total,
                        "Source performance degraded"
                    );
                    degraded.push(source);
                }
            }
        }
        Ok(degraded)
    }

    /// Widgets with a pattern for the current hour at or above the
    /// prefetch threshold
    async fn identify_patterns(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let hour = switchyard_cortex::UserContext::at(now).time_of_day;
        let mut confident = Vec::new();
        for widget_id in self.memory.known_widgets().await? {
            let pattern = self.memory.patterns().widget_patterns(&widget_id).await?;
            if pattern.frequency_at(hour).unwrap_or(0) >= self.config.prefetch_confidence_threshold {
                debug!(widget_id = %widget_id, hour, "Confident usage pattern identified");
                confident.push(widget_id);
            }
        }
        Ok(confident)
    }

    async fn refresh_predictions(&self, widgets: &[String], now: DateTime<Utc>) -> Result<(usize, usize)> {
        let evicted = {
            let mut predictions = self.predictions.write();
            let before = predictions.len();
            predictions.retain(|_, prediction| !self.is_expired(prediction, now));
            before - predictions.len()
        };

        let mut refreshed = 0;
        for widget_id in widgets {
            if self.predict_and_prefetch_at(widget_id, now).await.is_some() {
                refreshed += 1;
            }
        }
        Ok((refreshed, evicted))
    }

    fn is_expired(&self, prediction: &Prediction, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.config.prediction_ttl) {
            Ok(ttl) => prediction.predicted_at + ttl <= now,
            Err(_) => false,
        }
    }
}

fn query_id(query: &DataQuery) -> String {
    query
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn alternatives_excluding(ranked: &[ScoredCandidate], served: &str) -> Vec<Alternative> {
    ranked
        .iter()
        .filter(|candidate| candidate.source_name() != served)
        .take(MAX_ALTERNATIVES)
        .map(|candidate| Alternative {
            source: candidate.source_name().to_string(),
            score: candidate.score,
        })
        .collect()
}

fn served_reasoning(candidate: &ScoredCandidate, attempt: usize) -> String {
    if attempt == 1 {
        candidate.reasoning.clone()
    } else {
        format!("Fallback after {} failed attempt(s): {}", attempt - 1, candidate.reasoning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::{Capability, SourceType};
    use crate::infrastructure::decision_log::InMemoryDecisionLog;
    use async_trait::async_trait;
    use serde_json::Value;
    use switchyard_cortex::MemoryConfig;

    struct NamedSource {
        name: String,
        capabilities: Vec<Capability>,
        latency: u64,
    }

    fn named(name: &str, latency: u64) -> Arc<dyn DataSource> {
        Arc::new(NamedSource {
            name: name.to_string(),
            capabilities: vec![Capability::parse("agents.*")],
            latency,
        })
    }

    #[async_trait]
    impl DataSource for NamedSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn source_type(&self) -> SourceType {
            SourceType::Database
        }

        fn capabilities(&self) -> &[Capability] {
            &self.capabilities
        }

        fn estimated_latency_ms(&self) -> u64 {
            self.latency
        }

        async fn is_healthy(&self) -> bool {
            true
        }

        async fn query(&self, _operation: &str, _params: &Value) -> Result<Value, SourceError> {
            Ok(Value::Null)
        }
    }

    fn agent_with(config: AgentConfig, log: Arc<dyn DecisionLog>) -> AutonomousAgent {
        let registry = Arc::new(SourceRegistry::new());
        registry.register_source(named("primary", 10));
        registry.register_source(named("secondary", 80));
        AutonomousAgent::new(
            registry,
            Arc::new(CognitiveMemory::in_memory(MemoryConfig::default())),
            DecisionConfig::default(),
            config,
            EventBus::new(64),
            log,
        )
    }

    fn agent() -> AutonomousAgent {
        agent_with(AgentConfig::default(), Arc::new(InMemoryDecisionLog::default()))
    }

    #[tokio::test]
    async fn test_route_picks_best_and_logs_decision() {
        let log = Arc::new(InMemoryDecisionLog::default());
        let agent = agent_with(AgentConfig::default(), log.clone());

        let source = agent
            .route(&DataQuery::new("agents.list").with_id("q-1"))
            .await
            .unwrap();
        assert_eq!(source.name(), "primary");

        // The log write is spawned
        tokio::task::yield_now().await;
        for _ in 0..10 {
            if !log.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].query_id, "q-1");
        assert_eq!(records[0].candidate_count, 2);
    }

    #[tokio::test]
    async fn test_route_without_capable_sources() {
        let Err(err) = agent().route(&DataQuery::new("weather.forecast")).await else {
            panic!("routing with no capable sources must fail");
        };
        assert_eq!(
            err,
            RouterError::NoSourcesAvailable {
                intent_type: "weather.forecast".into()
            }
        );
    }

    #[tokio::test]
    async fn test_execute_records_outcome_and_publishes_event() {
        let agent = agent();
        let mut events = agent.event_bus().subscribe_query("q-7");

        let result = agent
            .execute_and_learn(
                &DataQuery::new("agents.list").with_id("q-7").with_widget("fleet"),
                |source| async move { Ok::<_, SourceError>(vec![source.name().to_string()]) },
            )
            .await
            .unwrap();

        assert_eq!(result.source, "primary");
        assert_eq!(result.data, vec!["primary".to_string()]);
        assert!(!result.cached);
        assert_eq!(agent.memory().get_success_rate("primary", "agents.list").await, Some(1.0));

        match events.recv().await.unwrap() {
            RoutingEvent::QueryRouted { selected_source, attempt, alternatives, .. } => {
                assert_eq!(selected_source, "primary");
                assert_eq!(attempt, 1);
                assert_eq!(alternatives[0].source, "secondary");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stats_track_decisions() {
        let agent = agent();
        assert_eq!(agent.stats(), AgentStats::default());

        for _ in 0..3 {
            agent.route(&DataQuery::new("agents.list")).await.unwrap();
        }
        let stats = agent.stats();
        assert_eq!(stats.total_decisions, 3);
        assert!(stats.average_confidence > 0.0 && stats.average_confidence <= 1.0);
        assert_eq!(stats.top_sources[0].source, "primary");
        assert_eq!(stats.top_sources[0].count, 3);
    }

    #[tokio::test]
    async fn test_prediction_expires_after_ttl() {
        let config = AgentConfig {
            prefetch_confidence_threshold: 1,
            prediction_ttl: std::time::Duration::from_secs(60),
            ..AgentConfig::default()
        };
        let agent = agent_with(config, Arc::new(InMemoryDecisionLog::default()));
        agent
            .execute_and_learn(&DataQuery::new("agents.list").with_widget("fleet"), |_| async {
                Ok::<_, SourceError>(1)
            })
            .await
            .unwrap();

        let long_ago = Utc::now() - chrono::Duration::minutes(5);
        let hour_now = switchyard_cortex::UserContext::now().time_of_day;
        if switchyard_cortex::UserContext::at(long_ago).time_of_day != hour_now {
            // Crossed an hour boundary; the pattern is keyed on the current hour
            return;
        }
        assert!(agent.predict_and_prefetch_at("fleet", long_ago).await.is_some());
        assert!(agent.prediction("fleet").is_none());

        let report = agent.learn().await;
        assert!(report.all_completed());
        assert_eq!(report.predictions_evicted, 1);
        assert_eq!(report.predictions_refreshed, 1);
        assert_eq!(agent.prediction("fleet").unwrap().source, "primary");
    }
}
