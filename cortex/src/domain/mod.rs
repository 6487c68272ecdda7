// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value types recorded and summarized by the cognitive memory.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Query patterns, failures, health snapshots, memory tunables

pub mod pattern;
pub mod failure;
pub mod health;
pub mod intelligence;
pub mod memory_config;

pub use pattern::*;
pub use failure::*;
pub use health::*;
pub use intelligence::*;
pub use memory_config::*;
