// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

// Source Registry - Registered Data Sources and Capability Matching
//
// Holds routing metadata only. The registry hands sources to the decision
// engine and the caller's executor; it never queries them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::query::QueryIntent;
use crate::domain::source::{DataSource, SourceDescriptor, SourceType};

/// Registry of data sources keyed by name
#[derive(Default)]
pub struct SourceRegistry {
    sources: RwLock<HashMap<String, Arc<dyn DataSource>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a source, replacing any source registered under the same name
    pub fn register_source(&self, source: Arc<dyn DataSource>) {
        let name = source.name().to_string();
        let replaced = self.sources.write().insert(name.clone(), source).is_some();
        if replaced {
            info!(source = %name, "Replaced data source registration");
        } else {
            info!(source = %name, "Registered data source");
        }
    }

    /// Every source with a capability matching the intent, ordered by name
    pub fn get_capable_sources(&self, intent: &QueryIntent) -> Vec<Arc<dyn DataSource>> {
        let mut capable: Vec<Arc<dyn DataSource>> = self
            .sources
            .read()
            .values()
            .filter(|source| source.capabilities().iter().any(|c| c.matches(intent)))
            .cloned()
            .collect();
        capable.sort_by(|a, b| a.name().cmp(b.name()));

        debug!(
            query_type = %intent.query_type,
            candidates = capable.len(),
            "Resolved capable sources"
        );
        capable
    }

    pub fn get_source(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        self.sources.read().get(name).cloned()
    }

    /// All sources, ordered by name
    pub fn get_all_sources(&self) -> Vec<Arc<dyn DataSource>> {
        let mut all: Vec<_> = self.sources.read().values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    pub fn get_sources_by_type(&self, source_type: SourceType) -> Vec<Arc<dyn DataSource>> {
        self.get_all_sources()
            .into_iter()
            .filter(|source| source.source_type() == source_type)
            .collect()
    }

    /// Returns the removed source, if one was registered under `name`
    pub fn unregister_source(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        let removed = self.sources.write().remove(name);
        if removed.is_some() {
            info!(source = %name, "Unregistered data source");
        }
        removed
    }

    pub fn clear(&self) {
        self.sources.write().clear();
    }

    pub fn len(&self) -> usize {
        self.sources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.read().is_empty()
    }

    /// Serializable snapshot of every registration, ordered by name
    pub fn describe_all(&self) -> Vec<SourceDescriptor> {
        self.get_all_sources()
            .iter()
            .map(|source| SourceDescriptor::of(source.as_ref()))
            .collect()
    }
}
