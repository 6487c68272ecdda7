// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Switchyard Cortex
//!
//! Cognitive memory for the source router: query patterns, failures and
//! recovery paths, and per-source health history.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Memory Layer
//! - **Purpose:** Remember what happened so routing decisions can learn from it

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::*;
pub use infrastructure::*;
