// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Infrastructure layer for the cortex bounded context

pub mod repository;
pub mod in_memory;

pub use repository::{FailureRepository, HealthRepository, PatternRepository};
pub use in_memory::{InMemoryFailureRepository, InMemoryHealthRepository, InMemoryPatternRepository};
