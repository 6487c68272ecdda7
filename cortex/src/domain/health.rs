// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default per-source capacity of the health snapshot ring buffer.
pub const MAX_HEALTH_RECORDS: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LatencyPercentiles {
    /// Nearest-rank percentiles. Returns `None` for an empty sample.
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let rank = |p: f64| -> f64 {
            let idx = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
            sorted[idx.clamp(1, sorted.len()) - 1] as f64
        };

        Some(Self {
            p50: rank(50.0),
            p95: rank(95.0),
            p99: rank(99.0),
        })
    }

    pub fn uniform(latency_ms: f64) -> Self {
        Self {
            p50: latency_ms,
            p95: latency_ms,
            p99: latency_ms,
        }
    }
}

/// Point-in-time health snapshot of one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub source_name: String,
    /// 0.0 (down) to 1.0 (fully healthy)
    pub health_score: f64,
    pub latency: LatencyPercentiles,
    pub success_rate: f64,
    pub request_count: u64,
    pub error_count: u64,
    pub timestamp: DateTime<Utc>,
}
