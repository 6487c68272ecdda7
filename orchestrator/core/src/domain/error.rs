// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

// Router Errors
//
// Request-level failures. Per-source failures are `SourceError`s; they are
// recorded and swallowed inside the fallback cascade and only surface here,
// in attempt order, once every candidate has failed.

use std::fmt;

use super::source::SourceError;

/// One failed attempt in the fallback cascade
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAttemptError {
    pub source_name: String,
    pub error: SourceError,
}

impl fmt::Display for SourceAttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source_name, self.error)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouterError {
    #[error("No sources available for query type: {intent_type}")]
    NoSourcesAvailable { intent_type: String },

    #[error("No candidate sources to score")]
    NoCandidates,

    #[error("All {} sources failed: {}", .attempts.len(), format_attempts(.attempts))]
    AllSourcesFailed { attempts: Vec<SourceAttemptError> },
}

impl RouterError {
    /// Attempts made before giving up; empty unless every source failed
    pub fn attempts(&self) -> &[SourceAttemptError] {
        match self {
            Self::AllSourcesFailed { attempts } => attempts,
            _ => &[],
        }
    }
}

fn format_attempts(attempts: &[SourceAttemptError]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
