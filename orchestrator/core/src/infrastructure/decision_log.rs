// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

// Decision Log Implementations
//
// NoopDecisionLog is the default when no external lifecycle store is
// wired in. InMemoryDecisionLog keeps a bounded tail of records for the
// CLI and tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::decision::DecisionRecord;
use crate::domain::decision_log::DecisionLog;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDecisionLog;

#[async_trait]
impl DecisionLog for NoopDecisionLog {
    async fn record(&self, _record: DecisionRecord) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct InMemoryDecisionLog {
    records: RwLock<VecDeque<DecisionRecord>>,
    capacity: usize,
}

impl InMemoryDecisionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Records in arrival order, oldest first
    pub fn records(&self) -> Vec<DecisionRecord> {
        self.records.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for InMemoryDecisionLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl DecisionLog for InMemoryDecisionLog {
    async fn record(&self, record: DecisionRecord) -> anyhow::Result<()> {
        let mut records = self.records.write();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::Priority;
    use chrono::Utc;

    fn record(query_id: &str) -> DecisionRecord {
        DecisionRecord {
            query_id: query_id.to_string(),
            query_type: "agents.list".to_string(),
            domain: "agents".to_string(),
            priority: Priority::Normal,
            selected_source: "postgres".to_string(),
            score: 0.8,
            confidence: 0.9,
            reasoning: "Excellent reliability (95%)".to_string(),
            alternatives: vec![],
            candidate_count: 1,
            decided_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_in_memory_log_is_bounded() {
        let log = InMemoryDecisionLog::new(2);
        for id in ["a", "b", "c"] {
            log.record(record(id)).await.unwrap();
        }
        let ids: Vec<String> = log.records().into_iter().map(|r| r.query_id).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_noop_log_accepts_everything() {
        assert!(tokio_test::block_on(NoopDecisionLog.record(record("a"))).is_ok());
    }
}
