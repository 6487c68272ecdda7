// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::failure::{Failure, RecoveryPath};

/// Everything memory knows about one source, summarized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceIntelligence {
    pub source_name: String,
    /// Mean latency of recent successful queries, if any were observed
    pub average_latency_ms: Option<f64>,
    /// Smoothed estimate, see [`smoothed_success_rate`]
    pub overall_success_rate: f64,
    pub recent_failures: usize,
    pub last_failure: Option<Failure>,
    /// Keyed by error type
    pub known_recovery_paths: BTreeMap<String, Vec<RecoveryPath>>,
}

/// Success-rate estimate `1 - f / (f + k)` for `f` failures in the stats window.
///
/// `k` is a Laplace-style pseudo-count of assumed successes. With the default
/// of 1000, a handful of early failures barely moves the estimate, so sources
/// with little history are not written off. Zero failures always yields 1.0.
pub fn smoothed_success_rate(failures: u64, smoothing: f64) -> f64 {
    if failures == 0 {
        return 1.0;
    }
    let f = failures as f64;
    1.0 - f / (f + smoothing.max(0.0))
}
