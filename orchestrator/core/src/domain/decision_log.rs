// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

// Decision Log Interface
//
// Sink for routing decisions, so they can be analyzed later. The agent
// hands records over from a spawned task; a slow or failing log never
// delays or fails the request. Implementations live in infrastructure/.

use async_trait::async_trait;

use super::decision::DecisionRecord;

#[async_trait]
pub trait DecisionLog: Send + Sync {
    async fn record(&self, record: DecisionRecord) -> anyhow::Result<()>;
}
