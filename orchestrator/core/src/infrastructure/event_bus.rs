// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Router Events
//
// In-memory event streaming over a tokio broadcast channel. Publishing
// never blocks and never fails the request path; slow subscribers lag and
// lose the oldest events.

use crate::domain::events::{HealthEvent, LearningEvent, RoutingEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 1000;

/// Unified event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Routing(RoutingEvent),
    Learning(LearningEvent),
    Health(HealthEvent),
}

/// Event bus for publishing and subscribing to router events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity.
    /// Capacity determines how many events are buffered before the oldest
    /// are dropped for lagging receivers.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }

    pub fn publish_routing_event(&self, event: RoutingEvent) {
        self.publish(DomainEvent::Routing(event));
    }

    pub fn publish_learning_event(&self, event: LearningEvent) {
        self.publish(DomainEvent::Learning(event));
    }

    pub fn publish_health_event(&self, event: HealthEvent) {
        self.publish(DomainEvent::Health(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        // send() only fails when nobody is subscribed
        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the routing events of a single query
    pub fn subscribe_query(&self, query_id: impl Into<String>) -> QueryEventReceiver {
        QueryEventReceiver {
            receiver: self.sender.subscribe(),
            query_id: query_id.into(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for one query's routing events (filtered)
pub struct QueryEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    query_id: String,
}

impl QueryEventReceiver {
    /// Receive the next routing event for the subscribed query id,
    /// skipping everything else
    pub async fn recv(&mut self) -> Result<RoutingEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if let DomainEvent::Routing(routing) = event {
                if self.matches_query(&routing) {
                    return Ok(routing);
                }
            }
        }
    }

    fn matches_query(&self, event: &RoutingEvent) -> bool {
        match event {
            RoutingEvent::QueryRouted { query_id, .. } => query_id == &self.query_id,
            RoutingEvent::AttemptFailed { query_id, .. } => query_id == &self.query_id,
            RoutingEvent::AllSourcesFailed { query_id, .. } => query_id == &self.query_id,
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn attempt_failed(query_id: &str) -> RoutingEvent {
        RoutingEvent::AttemptFailed {
            query_id: query_id.to_string(),
            source: "postgres".to_string(),
            error_type: "Timeout".to_string(),
            message: "Timed out after 100ms".to_string(),
            attempt: 1,
            failed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.publish_health_event(HealthEvent::CircuitOpened {
            source: "postgres".to_string(),
            consecutive_failures: 5,
            opened_at: Utc::now(),
        });

        match receiver.recv().await.unwrap() {
            DomainEvent::Health(HealthEvent::CircuitOpened { source, consecutive_failures, .. }) => {
                assert_eq!(source, "postgres");
                assert_eq!(consecutive_failures, 5);
            }
            other => panic!("Wrong event type received: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_query_event_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_query("q-2");

        event_bus.publish_routing_event(attempt_failed("q-1"));
        event_bus.publish_learning_event(LearningEvent::MemoryCleaned {
            patterns: 1,
            failures: 0,
            health_records: 0,
            cleaned_at: Utc::now(),
        });
        event_bus.publish_routing_event(attempt_failed("q-2"));

        match receiver.recv().await.unwrap() {
            RoutingEvent::AttemptFailed { query_id, .. } => assert_eq!(query_id, "q-2"),
            other => panic!("Wrong event type received: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let event_bus = EventBus::default();
        assert_eq!(event_bus.subscriber_count(), 0);
        event_bus.publish_routing_event(attempt_failed("q-1"));

        let mut receiver = event_bus.subscribe();
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }

    #[tokio::test]
    async fn test_lagging_receiver_reports_dropped_events() {
        let event_bus = EventBus::new(2);
        let mut receiver = event_bus.subscribe();
        for i in 0..5 {
            event_bus.publish_routing_event(attempt_failed(&format!("q-{i}")));
        }
        assert!(matches!(receiver.recv().await, Err(EventBusError::Lagged(3))));
        assert!(receiver.recv().await.is_ok());
    }

    #[test]
    fn test_domain_event_serializes_with_type_tag() {
        let event = DomainEvent::Routing(attempt_failed("q-9"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "routing");
    }
}
