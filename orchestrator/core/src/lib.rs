// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Switchyard Core
//!
//! Routes abstract data queries to the best of several interchangeable
//! data sources, falls back across ranked alternatives, and learns from
//! every outcome through the cortex memory.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, decision engine, agent and runtime wiring

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
