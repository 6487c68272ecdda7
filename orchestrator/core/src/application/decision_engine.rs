// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Decision Engine
//!
//! Turns a query into an intent and ranks capable sources for it. Every
//! candidate gets five factor scores in `[0, 1]` (performance, reliability,
//! cost, freshness, history) combined with intent-dependent weights. A
//! source with a recurring failure has its total cut by the recurring
//! penalty. Ties break on declared latency, then name, so rankings are
//! deterministic for a given memory state.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Source scoring and selection

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use switchyard_cortex::CognitiveMemory;
use tracing::debug;

use crate::domain::decision::{Alternative, DecisionResult, ScoreBreakdown, ScoredCandidate, ScoringWeights};
use crate::domain::error::RouterError;
use crate::domain::query::{DataQuery, Freshness, Priority, QueryIntent};
use crate::domain::router_config::DecisionConfig;
use crate::domain::source::{DataSource, SourceType};

/// Runners-up reported alongside a decision
pub const MAX_ALTERNATIVES: usize = 3;

pub struct DecisionEngine {
    memory: Arc<CognitiveMemory>,
    config: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(memory: Arc<CognitiveMemory>, config: DecisionConfig) -> Self {
        Self { memory, config }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    pub fn analyze_intent(&self, query: &DataQuery) -> QueryIntent {
        QueryIntent::from_query(query)
    }

    /// Score every candidate, best first. Duplicate names keep their first
    /// occurrence.
    pub async fn score_all_sources(
        &self,
        candidates: &[Arc<dyn DataSource>],
        intent: &QueryIntent,
    ) -> Result<Vec<ScoredCandidate>, RouterError> {
        if candidates.is_empty() {
            return Err(RouterError::NoCandidates);
        }

        let mut seen = HashSet::new();
        let unique: Vec<Arc<dyn DataSource>> = candidates
            .iter()
            .filter(|source| seen.insert(source.name().to_string()))
            .cloned()
            .collect();

        let weights = ScoringWeights::for_intent(intent);

        let mut latencies = Vec::with_capacity(unique.len());
        for source in &unique {
            let observed = self.memory.get_average_latency(source.name()).await;
            latencies.push(match observed {
                Some(ms) => Latency::Observed(ms),
                None => Latency::Estimated(source.estimated_latency_ms() as f64),
            });
        }
        // Spreads below the ceiling are not exaggerated into large score gaps
        let latency_scale = latencies
            .iter()
            .map(Latency::ms)
            .fold(self.config.latency_ceiling_ms, f64::max);

        let mut scored = Vec::with_capacity(unique.len());
        for (source, latency) in unique.into_iter().zip(latencies) {
            let recurring = self.memory.recurring_error_types(source.name()).await;
            let success_rate = self
                .memory
                .get_success_rate(source.name(), &intent.query_type)
                .await;
            let breakdown = ScoreBreakdown {
                performance: self.performance_score(latency.ms(), latency_scale, intent.priority),
                reliability: self.reliability_score(source.as_ref(), success_rate).await,
                cost: self.cost_score(source.cost_per_query(), intent.priority),
                freshness: freshness_score(source.source_type(), intent.freshness),
                history: unit(
                    self.memory
                        .get_similar_query_success(&intent.query_type, &intent.params, Some(source.name()))
                        .await,
                ),
                recurring_failure: !recurring.is_empty(),
            };

            let mut score = weights.weighted(&breakdown);
            if breakdown.recurring_failure {
                score *= 1.0 - self.config.recurring_penalty;
            }
            let score = unit(score);
            let reasoning = explain(&weights, &breakdown, &recurring, success_rate, latency);

            debug!(
                source = %source.name(),
                score,
                performance = breakdown.performance,
                reliability = breakdown.reliability,
                cost = breakdown.cost,
                freshness = breakdown.freshness,
                history = breakdown.history,
                recurring = breakdown.recurring_failure,
                "Scored candidate"
            );

            scored.push(ScoredCandidate {
                source,
                score,
                breakdown,
                reasoning,
            });
        }

        scored.sort_by(rank_order);
        Ok(scored)
    }

    /// Score the candidates and pick the best one
    pub async fn decide(
        &self,
        candidates: &[Arc<dyn DataSource>],
        intent: &QueryIntent,
    ) -> Result<DecisionResult, RouterError> {
        let ranked = self.score_all_sources(candidates, intent).await?;
        self.decide_ranked(&ranked)
    }

    /// Build a decision from an already ranked list
    pub fn decide_ranked(&self, ranked: &[ScoredCandidate]) -> Result<DecisionResult, RouterError> {
        let best = ranked.first().ok_or(RouterError::NoCandidates)?;

        let confidence = match ranked.get(1) {
            None => 1.0,
            Some(second) => unit((best.score - second.score) / self.config.confidence_margin + 0.5),
        };

        Ok(DecisionResult {
            selected_source: best.source.clone(),
            score: best.score,
            confidence,
            reasoning: best.reasoning.clone(),
            alternatives: ranked
                .iter()
                .skip(1)
                .take(MAX_ALTERNATIVES)
                .map(|candidate| Alternative {
                    source: candidate.source_name().to_string(),
                    score: candidate.score,
                })
                .collect(),
        })
    }

    fn performance_score(&self, latency_ms: f64, latency_scale: f64, priority: Priority) -> f64 {
        let mut score = unit(1.0 - latency_ms / latency_scale);
        if priority == Priority::High && latency_ms > self.config.slow_latency_ms {
            score *= 0.5;
        }
        score
    }

    async fn reliability_score(&self, source: &dyn DataSource, success_rate: Option<f64>) -> f64 {
        if !source.is_healthy().await {
            return 0.0;
        }

        let success_rate = success_rate.unwrap_or(self.config.neutral_prior);
        let recent_failures = self
            .memory
            .failure_history(source.name(), self.memory.config().recent_failure_limit)
            .await
            .len();
        let penalty = (self.config.recent_failure_penalty * recent_failures as f64)
            .min(self.config.max_recent_failure_penalty);

        unit(success_rate - penalty)
    }

    fn cost_score(&self, cost_per_query: f64, priority: Priority) -> f64 {
        let mut score = unit(1.0 - cost_per_query / self.config.max_cost_per_query);
        if priority == Priority::Low && cost_per_query > 0.0 {
            score *= 0.5;
        }
        score
    }
}

fn freshness_score(source_type: SourceType, freshness: Freshness) -> f64 {
    match freshness {
        Freshness::Realtime => match source_type {
            SourceType::Database | SourceType::Api => 1.0,
            _ => 0.2,
        },
        Freshness::Stale => 1.0,
        Freshness::Normal => match source_type {
            SourceType::Database => 1.0,
            SourceType::Api => 0.9,
            SourceType::Cache => 0.5,
            SourceType::File => 0.3,
            SourceType::Stream | SourceType::Other => 0.5,
        },
    }
}

/// Clamp to `[0, 1]`; NaN reads as zero
fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.source.estimated_latency_ms().cmp(&b.source.estimated_latency_ms()))
        .then_with(|| a.source_name().cmp(b.source_name()))
}

/// Latency fed into the performance factor
#[derive(Debug, Clone, Copy, PartialEq)]
enum Latency {
    /// Average over recorded outcomes
    Observed(f64),
    /// The source's own estimate; nothing recorded yet
    Estimated(f64),
}

impl Latency {
    fn ms(&self) -> f64 {
        match self {
            Latency::Observed(ms) | Latency::Estimated(ms) => *ms,
        }
    }
}

fn explain(
    weights: &ScoringWeights,
    breakdown: &ScoreBreakdown,
    recurring: &[String],
    success_rate: Option<f64>,
    latency: Latency,
) -> String {
    let factors = [
        ("performance", weights.performance, breakdown.performance),
        ("reliability", weights.reliability, breakdown.reliability),
        ("cost efficiency", weights.cost, breakdown.cost),
        ("freshness", weights.freshness, breakdown.freshness),
        ("historical success", weights.history, breakdown.history),
    ];

    let mut parts = Vec::new();

    let strongest = factors
        .iter()
        .max_by(|a, b| (a.1 * a.2).total_cmp(&(b.1 * b.2)));
    if let Some((name, _, value)) = strongest {
        if *value > 0.8 {
            parts.push(format!("Excellent {name} ({:.0}%)", value * 100.0));
        } else if *value > 0.6 {
            parts.push(format!("Good {name} ({:.0}%)", value * 100.0));
        }
    }

    for (name, weight, value) in &factors {
        if *value < 0.3 && *weight > 0.15 {
            parts.push(format!("Low {name} ({:.0}%)", value * 100.0));
        }
    }

    let mut reasoning = if parts.is_empty() {
        "Balanced scores across all factors".to_string()
    } else {
        parts.join(", ")
    };

    reasoning.push_str(&match (success_rate, latency) {
        (Some(rate), Latency::Observed(ms)) => format!(
            "; {:.0}% success rate and {:.0}ms average latency",
            rate * 100.0,
            ms
        ),
        (Some(rate), Latency::Estimated(ms)) => format!(
            "; {:.0}% success rate and {:.0}ms estimated latency",
            rate * 100.0,
            ms
        ),
        (None, Latency::Observed(ms)) => format!("; no history for this query type, {ms:.0}ms average latency"),
        (None, Latency::Estimated(ms)) => format!("; no history yet, {ms:.0}ms estimated latency"),
    });
    if !recurring.is_empty() {
        reasoning.push_str(&format!("; penalized for recurring {} failures", recurring.join("/")));
    }
    reasoning
}
