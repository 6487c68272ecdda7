// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Queries, data sources, routing decisions and the events and errors
//! that describe them.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Router value types and interfaces

pub mod query;
pub mod source;
pub mod decision;
pub mod decision_log;
pub mod error;
pub mod events;
pub mod router_config;

pub use query::{DataQuery, Freshness, Priority, QueryIntent, QueryResult};
pub use source::{Capability, DataSource, SourceDescriptor, SourceError, SourceType};
pub use decision::{
    AgentStats, Alternative, DecisionRecord, DecisionResult, LearningReport, Prediction, ScoreBreakdown,
    ScoredCandidate, ScoringWeights, SourceSelectionCount, StepOutcome,
};
pub use decision_log::DecisionLog;
pub use error::{RouterError, SourceAttemptError};
pub use events::{HealthEvent, LearningEvent, RoutingEvent};
pub use router_config::{ConfigError, RouterConfig, RouterConfigManifest};
