// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod source_registry;
pub mod decision_log;
pub mod self_healing;

pub use event_bus::{DomainEvent, EventBus, EventBusError, EventReceiver};
pub use source_registry::SourceRegistry;
pub use decision_log::{InMemoryDecisionLog, NoopDecisionLog};
pub use self_healing::{CircuitState, SelfHealingSource};
