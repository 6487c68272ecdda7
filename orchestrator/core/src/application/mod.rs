// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod decision_engine;
pub mod agent;
pub mod learning_loop;
pub mod health_monitor;
pub mod context;

pub use decision_engine::DecisionEngine;
pub use agent::AutonomousAgent;
pub use learning_loop::{start_autonomous_learning, LearningLoop};
pub use health_monitor::HealthMonitor;
pub use context::{BackgroundTasks, RouterContext};
