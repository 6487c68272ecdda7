// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Switchyard CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Command handlers and the simulation harness

pub mod commands;
pub mod simulation;
