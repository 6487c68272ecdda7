// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Decision
//!
//! Scores, ranked candidates and the routing decision built from them,
//! plus the records the agent keeps about its own behaviour.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Decision value types

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::query::{Freshness, Priority, QueryIntent};
use super::source::DataSource;

/// Per-factor scores, each in `[0, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub performance: f64,
    pub reliability: f64,
    pub cost: f64,
    pub freshness: f64,
    pub history: f64,
    /// The source has an error type currently recurring
    pub recurring_failure: bool,
}

/// Factor weights; always sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub performance: f64,
    pub reliability: f64,
    pub cost: f64,
    pub freshness: f64,
    pub history: f64,
}

impl ScoringWeights {
    pub const NORMAL: Self = Self {
        performance: 0.30,
        reliability: 0.30,
        cost: 0.20,
        freshness: 0.10,
        history: 0.10,
    };

    pub const HIGH_PRIORITY: Self = Self {
        performance: 0.40,
        reliability: 0.40,
        cost: 0.10,
        freshness: 0.05,
        history: 0.05,
    };

    pub const LOW_PRIORITY: Self = Self {
        performance: 0.15,
        reliability: 0.25,
        cost: 0.40,
        freshness: 0.10,
        history: 0.10,
    };

    pub const REALTIME: Self = Self {
        performance: 0.25,
        reliability: 0.25,
        cost: 0.15,
        freshness: 0.30,
        history: 0.05,
    };

    /// A realtime request overrides any priority-based weighting.
    pub fn for_intent(intent: &QueryIntent) -> Self {
        match (intent.freshness, intent.priority) {
            (Freshness::Realtime, _) => Self::REALTIME,
            (_, Priority::High) => Self::HIGH_PRIORITY,
            (_, Priority::Low) => Self::LOW_PRIORITY,
            (_, Priority::Normal) => Self::NORMAL,
        }
    }

    pub fn total(&self) -> f64 {
        self.performance + self.reliability + self.cost + self.freshness + self.history
    }

    pub fn weighted(&self, b: &ScoreBreakdown) -> f64 {
        self.performance * b.performance
            + self.reliability * b.reliability
            + self.cost * b.cost
            + self.freshness * b.freshness
            + self.history * b.history
    }
}

/// A source with its composite score for one intent
#[derive(Clone)]
pub struct ScoredCandidate {
    pub source: Arc<dyn DataSource>,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub reasoning: String,
}

impl ScoredCandidate {
    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}

impl fmt::Debug for ScoredCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoredCandidate")
            .field("source", &self.source.name())
            .field("score", &self.score)
            .field("breakdown", &self.breakdown)
            .field("reasoning", &self.reasoning)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub source: String,
    pub score: f64,
}

/// The chosen source and why
#[derive(Clone)]
pub struct DecisionResult {
    pub selected_source: Arc<dyn DataSource>,
    pub score: f64,
    pub confidence: f64,
    pub reasoning: String,
    /// Up to three runners-up, best first
    pub alternatives: Vec<Alternative>,
}

impl fmt::Debug for DecisionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionResult")
            .field("selected_source", &self.selected_source.name())
            .field("score", &self.score)
            .field("confidence", &self.confidence)
            .field("reasoning", &self.reasoning)
            .field("alternatives", &self.alternatives)
            .finish()
    }
}

/// What gets handed to the decision log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub query_id: String,
    pub query_type: String,
    pub domain: String,
    pub priority: Priority,
    pub selected_source: String,
    pub score: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub alternatives: Vec<Alternative>,
    pub candidate_count: usize,
    pub decided_at: DateTime<Utc>,
}

/// A widget's expected source for the current hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub widget_id: String,
    pub source: String,
    pub hour: u32,
    pub frequency: u64,
    pub predicted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSelectionCount {
    pub source: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub total_decisions: u64,
    pub average_confidence: f64,
    /// Most selected first
    pub top_sources: Vec<SourceSelectionCount>,
}

/// Outcome of one learning step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed { detail: String },
    Failed { error: String },
}

impl StepOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// What one `learn()` cycle did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningReport {
    pub decision_quality: StepOutcome,
    pub pattern_identification: StepOutcome,
    pub prediction_refresh: StepOutcome,
    /// Sources whose recent success rate fell below the degraded threshold
    pub degraded_sources: Vec<String>,
    /// Widgets with a confident pattern for the current hour
    pub confident_widgets: Vec<String>,
    pub predictions_refreshed: usize,
    pub predictions_evicted: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl LearningReport {
    pub fn all_completed(&self) -> bool {
        self.decision_quality.is_completed()
            && self.pattern_identification.is_completed()
            && self.prediction_refresh.is_completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::DataQuery;

    #[test]
    fn test_weights_sum_to_one() {
        for weights in [
            ScoringWeights::NORMAL,
            ScoringWeights::HIGH_PRIORITY,
            ScoringWeights::LOW_PRIORITY,
            ScoringWeights::REALTIME,
        ] {
            assert!((weights.total() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_weights_for_intent() {
        let realtime = QueryIntent::from_query(&DataQuery::new("a.b").with_freshness(Freshness::Realtime));
        assert_eq!(ScoringWeights::for_intent(&realtime), ScoringWeights::REALTIME);

        let urgent_realtime = QueryIntent::from_query(
            &DataQuery::new("a.b")
                .with_priority(Priority::High)
                .with_freshness(Freshness::Realtime),
        );
        assert_eq!(ScoringWeights::for_intent(&urgent_realtime), ScoringWeights::REALTIME);

        let cheap = QueryIntent::from_query(&DataQuery::new("a.b").with_priority(Priority::Low));
        assert_eq!(ScoringWeights::for_intent(&cheap), ScoringWeights::LOW_PRIORITY);
    }

    #[test]
    fn test_weighted_score_is_bounded() {
        let perfect = ScoreBreakdown {
            performance: 1.0,
            reliability: 1.0,
            cost: 1.0,
            freshness: 1.0,
            history: 1.0,
            recurring_failure: false,
        };
        assert!((ScoringWeights::NORMAL.weighted(&perfect) - 1.0).abs() < 1e-9);
        assert_eq!(ScoringWeights::NORMAL.weighted(&ScoreBreakdown::default()), 0.0);
    }
}
