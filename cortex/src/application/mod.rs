// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Application layer for the cortex bounded context

pub mod pattern_memory;
pub mod failure_memory;
pub mod cognitive_memory;

pub use pattern_memory::PatternMemory;
pub use failure_memory::FailureMemory;
pub use cognitive_memory::{CleanupReport, CognitiveMemory, DEFAULT_HEALTH_HISTORY_LIMIT};

use chrono::{DateTime, Utc};

/// Start of a look-back window ending at `now`. Windows too large to
/// represent reach back to the beginning of time.
pub(crate) fn window_start(now: DateTime<Utc>, window: std::time::Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
