// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for query routing and the fallback cascade.
//!
//! These tests drive `AutonomousAgent::execute_and_learn` and `route`
//! against hand-written sources and verify:
//! 1. Candidates are tried in rank order and the first success is returned
//! 2. A total failure reports every attempt in order
//! 3. A hung attempt times out and falls back
//! 4. Learned failures and successes flip the preferred source

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use switchyard_core::application::AutonomousAgent;
use switchyard_core::domain::router_config::{AgentConfig, DecisionConfig};
use switchyard_core::domain::{Capability, DataQuery, DataSource, RouterError, SourceError, SourceType};
use switchyard_core::infrastructure::{EventBus, InMemoryDecisionLog, SourceRegistry};
use switchyard_cortex::{CognitiveMemory, FailureReport, MemoryConfig, QueryOutcome};

struct MockSource {
    name: String,
    source_type: SourceType,
    capabilities: Vec<Capability>,
    latency: u64,
}

impl MockSource {
    fn new(name: &str, latency: u64, capabilities: &[&str]) -> Arc<dyn DataSource> {
        Arc::new(Self {
            name: name.to_string(),
            source_type: SourceType::Database,
            capabilities: capabilities.iter().map(|c| Capability::parse(c)).collect(),
            latency,
        })
    }
}

#[async_trait]
impl DataSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_type(&self) -> SourceType {
        self.source_type
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

fn build_agent(sources: Vec<Arc<dyn DataSource>>, config: AgentConfig) -> AutonomousAgent {
    let registry = Arc::new(SourceRegistry::new());
    for source in sources {
        registry.register_source(source);
    }
    AutonomousAgent::new(
        registry,
        Arc::new(CognitiveMemory::in_memory(MemoryConfig::default())),
        DecisionConfig::default(),
        config,
        EventBus::new(256),
        Arc::new(InMemoryDecisionLog::default()),
    )
}

fn three_sources() -> Vec<Arc<dyn DataSource>> {
    vec![
        MockSource::new("alpha", 10, &["agents.*"]),
        MockSource::new("bravo", 50, &["agents.list"]),
        MockSource::new("charlie", 90, &["*"]),
    ]
}

#[tokio::test]
async fn test_fallback_follows_rank_order() {
    let agent = build_agent(three_sources(), AgentConfig::default());
    let calls = Arc::new(Mutex::new(Vec::new()));

    let result = agent
        .execute_and_learn(&DataQuery::new("agents.list"), |source| {
            let calls = calls.clone();
            async move {
                calls.lock().push(source.name().to_string());
                match source.name() {
                    "alpha" => Err(SourceError::Connection("refused".into())),
                    name => Ok(format!("served by {name}")),
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(result.source, "bravo");
    assert_eq!(result.data, "served by bravo");
    assert_eq!(*calls.lock(), vec!["alpha", "bravo"]);

    let memory = agent.memory();
    assert_eq!(memory.failure_history("alpha", 10).await.len(), 1);
    assert_eq!(memory.get_success_rate("alpha", "agents.list").await, Some(0.0));
    assert_eq!(memory.get_success_rate("bravo", "agents.list").await, Some(1.0));
    assert_eq!(memory.get_success_rate("charlie", "agents.list").await, None);
}

#[tokio::test]
async fn test_all_sources_failed_reports_every_attempt() {
    let agent = build_agent(three_sources(), AgentConfig::default());

    let err = agent
        .execute_and_learn(&DataQuery::new("agents.list"), |source| async move {
            Err::<Value, _>(match source.name() {
                "alpha" => SourceError::Connection("refused".into()),
                "bravo" => SourceError::RateLimited("429".into()),
                _ => SourceError::InvalidResponse("truncated".into()),
            })
        })
        .await
        .unwrap_err();

    let attempts = err.attempts();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[0].source_name, "alpha");
    assert_eq!(attempts[1].error, SourceError::RateLimited("429".into()));
    assert_eq!(attempts[2].error.error_type(), "InvalidResponse");

    let text = err.to_string();
    assert!(text.contains("alpha: Connection error: refused"));
    assert!(text.contains("bravo: Rate limited: 429"));
    assert!(text.contains("charlie: Invalid response: truncated"));
}

#[tokio::test]
async fn test_no_capable_sources_fails_fast() {
    let agent = build_agent(
        vec![MockSource::new("alpha", 10, &["agents.*"])],
        AgentConfig::default(),
    );

    let err = agent
        .execute_and_learn(&DataQuery::new("billing.invoices"), |_| async {
            Ok::<_, SourceError>(Value::Null)
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RouterError::NoSourcesAvailable {
            intent_type: "billing.invoices".into()
        }
    );
}

#[tokio::test]
async fn test_hung_attempt_times_out_and_falls_back() {
    let config = AgentConfig {
        attempt_timeout: Some(Duration::from_millis(30)),
        ..AgentConfig::default()
    };
    let agent = build_agent(three_sources(), config);

    let result = agent
        .execute_and_learn(&DataQuery::new("agents.list"), |source| async move {
            if source.name() == "alpha" {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok::<_, SourceError>(source.name().to_string())
        })
        .await
        .unwrap();

    assert_eq!(result.source, "bravo");
    let failures = agent.memory().failure_history("alpha", 10).await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error_type, "Timeout");
}

#[tokio::test]
async fn test_preference_flips_after_learning() {
    let sources = vec![
        MockSource::new("fast", 10, &["*"]),
        MockSource::new("slow", 500, &["*"]),
    ];
    let agent = build_agent(sources, AgentConfig::default());
    let query = DataQuery::new("agents.list");

    assert_eq!(agent.route(&query).await.unwrap().name(), "fast");

    let memory = agent.memory();
    for _ in 0..10 {
        memory
            .record_query(QueryOutcome {
                widget_id: "fleet".into(),
                query_type: "agents.list".into(),
                query_params: Value::Null,
                source_used: "fast".into(),
                latency_ms: 10,
                result_size: None,
                success: false,
            })
            .await
            .unwrap();
        memory
            .record_failure(FailureReport::new("fast", "Connection", "refused"))
            .await
            .unwrap();
        memory
            .record_query(QueryOutcome {
                widget_id: "fleet".into(),
                query_type: "agents.list".into(),
                query_params: Value::Null,
                source_used: "slow".into(),
                latency_ms: 500,
                result_size: None,
                success: true,
            })
            .await
            .unwrap();
    }

    assert_eq!(agent.route(&query).await.unwrap().name(), "slow");

    let ranked = agent
        .engine()
        .score_all_sources(&agent.registry().get_all_sources(), &agent.engine().analyze_intent(&query))
        .await
        .unwrap();
    assert_eq!(ranked[0].source_name(), "slow");
    assert!(ranked[0].reasoning.contains("100% success rate and 500ms average latency"));
    assert!(ranked[1].breakdown.recurring_failure);
    assert!(ranked[1].reasoning.contains("recurring"));
}

#[tokio::test]
async fn test_executed_failures_steer_later_queries() {
    let sources = vec![
        MockSource::new("fast", 10, &["*"]),
        MockSource::new("slow", 400, &["*"]),
    ];
    let agent = build_agent(sources, AgentConfig::default());
    let first_tried = Arc::new(Mutex::new(Vec::new()));

    for i in 0..6 {
        let first_tried = first_tried.clone();
        let tried_this_query = Arc::new(Mutex::new(false));
        agent
            .execute_and_learn(&DataQuery::new("agents.list").with_id(format!("q-{i}")), |source| {
                let first_tried = first_tried.clone();
                let tried_this_query = tried_this_query.clone();
                async move {
                    {
                        let mut tried = tried_this_query.lock();
                        if !*tried {
                            first_tried.lock().push(source.name().to_string());
                            *tried = true;
                        }
                    }
                    if source.name() == "fast" {
                        Err(SourceError::Timeout { after_ms: 100 })
                    } else {
                        Ok(1)
                    }
                }
            })
            .await
            .unwrap();
    }

    let first_tried = first_tried.lock();
    assert_eq!(first_tried[0], "fast");
    assert_eq!(first_tried.last().map(String::as_str), Some("slow"));
}

#[tokio::test]
async fn test_ranking_is_deterministic() {
    let agent = build_agent(three_sources(), AgentConfig::default());
    let query = DataQuery::new("agents.list");

    let mut picks = Vec::new();
    for _ in 0..5 {
        picks.push(agent.route(&query).await.unwrap().name().to_string());
    }
    assert!(picks.iter().all(|p| p == "alpha"));
}
