// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the cognitive memory facade.
//!
//! Covers the behaviours the router relies on:
//! - Health history is bounded per source and read newest first
//! - Recurring failures are detected within the recurring window only
//! - Recovery paths are ranked by successes, then occurrences
//! - Similar-query success is neutral without history
//! - Cleanup purges every store through the repository seam

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use switchyard_cortex::{
    CognitiveMemory, FailureReport, HealthMetrics, LatencyPercentiles, MemoryConfig, QueryOutcome,
    MAX_HEALTH_RECORDS,
};

fn outcome(source: &str, params: Value, latency_ms: u64, success: bool) -> QueryOutcome {
    QueryOutcome {
        widget_id: "system-monitor".to_string(),
        query_type: "system.metrics".to_string(),
        query_params: params,
        source_used: source.to_string(),
        latency_ms,
        result_size: Some(128),
        success,
    }
}

fn snapshot(source: &str, request_count: u64) -> HealthMetrics {
    HealthMetrics {
        source_name: source.to_string(),
        health_score: 0.9,
        latency: LatencyPercentiles::uniform(25.0),
        success_rate: 0.95,
        request_count,
        error_count: 1,
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_health_history_is_bounded_and_newest_first() {
    let memory = CognitiveMemory::in_memory(MemoryConfig::default());
    let overflow = 25;
    for n in 0..(MAX_HEALTH_RECORDS + overflow) as u64 {
        memory.record_health_metrics(snapshot("postgres", n)).await.unwrap();
    }

    let history = memory
        .get_health_history("postgres", MAX_HEALTH_RECORDS * 2)
        .await;
    assert_eq!(history.len(), MAX_HEALTH_RECORDS);
    assert_eq!(history[0].request_count, (MAX_HEALTH_RECORDS + overflow - 1) as u64);
    assert_eq!(history.last().map(|m| m.request_count), Some(overflow as u64));
    assert!(history.windows(2).all(|w| w[0].request_count > w[1].request_count));

    let latest = memory.get_source_health("postgres").await.unwrap();
    assert_eq!(latest.request_count, history[0].request_count);
    assert!(memory.get_source_health("redis").await.is_none());
}

#[tokio::test]
async fn test_recurring_failure_threshold_is_configurable() {
    let config = MemoryConfig {
        recurring_threshold: 2,
        ..MemoryConfig::default()
    };
    let memory = CognitiveMemory::in_memory(config);

    memory
        .record_failure(FailureReport::new("metrics-api", "Timeout", "deadline exceeded"))
        .await
        .unwrap();
    assert!(!memory.is_recurring_failure("metrics-api", "Timeout").await);

    memory
        .record_failure(FailureReport::new("metrics-api", "Timeout", "deadline exceeded"))
        .await
        .unwrap();
    assert!(memory.is_recurring_failure("metrics-api", "Timeout").await);
    assert_eq!(memory.recurring_error_types("metrics-api").await, vec!["Timeout"]);
}

#[tokio::test]
async fn test_recovery_paths_prefer_successful_actions() {
    let memory = CognitiveMemory::in_memory(MemoryConfig::default());
    let report = || FailureReport::new("postgres", "Connection", "connection reset");

    for _ in 0..4 {
        memory
            .record_failure(report().with_recovery("reconnect", false, Some(10)))
            .await
            .unwrap();
    }
    memory
        .record_failure(report().with_recovery("failover", true, Some(250)))
        .await
        .unwrap();

    let paths = memory.get_recovery_paths("postgres", "Connection").await;
    assert_eq!(paths[0].action, "failover");
    assert_eq!(paths[1].action, "reconnect");
    assert_eq!(paths[1].occurrences, 4);
    assert_eq!(paths[1].success_rate, 0.0);

    let last = memory
        .get_last_successful_recovery("postgres", "Connection")
        .await
        .unwrap();
    assert_eq!(last.recovery_time_ms, Some(250));
}

#[tokio::test]
async fn test_similar_query_success_learns_from_history() {
    let memory = CognitiveMemory::in_memory(MemoryConfig::default());
    let params = json!({"host": "web-1", "window": "5m"});
    assert_eq!(memory.get_similar_query_success("system.metrics", &params, None).await, 0.5);

    memory.record_query(outcome("prometheus", params.clone(), 40, true)).await.unwrap();
    memory.record_query(outcome("prometheus", params.clone(), 40, true)).await.unwrap();
    memory.record_query(outcome("prometheus", params.clone(), 40, true)).await.unwrap();
    memory.record_query(outcome("prometheus", params.clone(), 40, false)).await.unwrap();

    let score = memory.get_similar_query_success("system.metrics", &params, None).await;
    assert!((score - 0.75).abs() < 1e-9);

    // A shape that shares no keys does not count as similar
    let unrelated = json!({"pid": 42});
    assert_eq!(memory.get_similar_query_success("system.metrics", &unrelated, None).await, 0.5);
}

#[tokio::test]
async fn test_cleanup_purges_old_records_everywhere() {
    let memory = CognitiveMemory::in_memory(MemoryConfig::default());
    let old = Utc::now() - Duration::days(45);

    memory
        .patterns()
        .record_at(outcome("prometheus", json!({}), 40, true), old)
        .await
        .unwrap();
    memory.record_query(outcome("prometheus", json!({}), 40, true)).await.unwrap();
    memory
        .failures()
        .record_at(FailureReport::new("prometheus", "Timeout", "old"), old)
        .await
        .unwrap();
    let mut stale = snapshot("prometheus", 1);
    stale.timestamp = old;
    memory.record_health_metrics(stale).await.unwrap();
    memory.record_health_metrics(snapshot("prometheus", 2)).await.unwrap();

    let report = memory.cleanup(30).await.unwrap();
    assert_eq!(report.patterns, 1);
    assert_eq!(report.failures, 1);
    assert_eq!(report.health_records, 1);
    assert_eq!(report.total(), 3);
    assert_eq!(memory.get_health_history("prometheus", 10).await.len(), 1);
    assert_eq!(memory.known_sources().await.unwrap(), vec!["prometheus".to_string()]);
}

#[tokio::test]
async fn test_latency_percentiles_from_recent_successes() {
    let memory = CognitiveMemory::in_memory(MemoryConfig::default());
    assert!(memory.latency_percentiles("prometheus").await.unwrap().is_none());

    for latency in 1..=100 {
        memory
            .record_query(outcome("prometheus", json!({}), latency, true))
            .await
            .unwrap();
    }
    let percentiles = memory.latency_percentiles("prometheus").await.unwrap().unwrap();
    assert!(percentiles.p50 <= percentiles.p95);
    assert!(percentiles.p95 <= percentiles.p99);
    assert_eq!(memory.get_average_latency("prometheus").await, Some(50.5));
}
