//! Event Bus implementation.
//!
//! One bus per controller. Async consumers take a broadcast receiver,
//! synchronous consumers register a filtered handler that runs on the
//! publishing task.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{ControllerEvent, EventCategory};
use crate::constants::DEFAULT_EVENT_CAPACITY;

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Filter to receive only specific event types
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    /// Receive all events.
    #[default]
    All,
    /// Receive events matching any of these categories.
    Categories(Vec<EventCategory>),
}

impl EventFilter {
    /// Check if an event matches this filter
    pub fn matches(&self, event: &ControllerEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
        }
    }
}

type EventHandler = Arc<dyn Fn(&ControllerEvent) + Send + Sync>;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity for broadcast.
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Error types for event bus operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventBusError {
    /// No subscribers are listening
    #[error("No active subscribers")]
    NoSubscribers,
}

/// Event bus for one controller
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ControllerEvent>,
    handlers: Arc<RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>>,
    config: EventBusConfig,
}

impl EventBus {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of broadcast receivers the event was queued for.
    /// Fails only when neither receivers nor handlers exist.
    pub fn publish(&self, event: ControllerEvent) -> Result<usize, EventBusError> {
        // Snapshot the handlers so one may unsubscribe from inside its callback
        let handlers: Vec<EventHandler> = self
            .handlers
            .read()
            .values()
            .filter(|(filter, _)| filter.matches(&event))
            .map(|(_, handler)| handler.clone())
            .collect();
        let handled = !handlers.is_empty();
        for handler in handlers {
            handler(&event);
        }

        match self.sender.send(event) {
            Ok(count) => Ok(count),
            Err(_) if handled || !self.handlers.read().is_empty() => Ok(0),
            Err(_) => Err(EventBusError::NoSubscribers),
        }
    }

    /// Subscribe to events with a synchronous handler
    ///
    /// The handler runs on the controller task, so it must return quickly.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(&ControllerEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.handlers.write().insert(id, (filter, Arc::new(handler)));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Get a receiver for use in an async task
    pub fn receiver(&self) -> broadcast::Receiver<ControllerEvent> {
        self.sender.subscribe()
    }

    /// Unsubscribe a handler. Returns true if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Number of registered handlers
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ConnectionPhase;
    use crate::event_bus::events::{ConfigurationEvent, ConnectionEvent, FaultEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn phase_event() -> ControllerEvent {
        ControllerEvent::Connection(ConnectionEvent::PhaseChanged {
            from: ConnectionPhase::Disconnected,
            to: ConnectionPhase::Connecting,
        })
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();

        let id = bus.subscribe(EventFilter::All, |_| {});
        assert_eq!(bus.subscriber_count(), 1);

        assert!(bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_publish_without_listeners() {
        let bus = EventBus::new();
        assert!(matches!(
            bus.publish(phase_event()),
            Err(EventBusError::NoSubscribers)
        ));
    }

    #[test]
    fn test_event_filtering() {
        let bus = EventBus::new();
        let connection_count = Arc::new(AtomicUsize::new(0));
        let fault_count = Arc::new(AtomicUsize::new(0));

        let cc = connection_count.clone();
        bus.subscribe(
            EventFilter::Categories(vec![EventCategory::Connection]),
            move |_| {
                cc.fetch_add(1, Ordering::SeqCst);
            },
        );

        let fc = fault_count.clone();
        bus.subscribe(
            EventFilter::Categories(vec![EventCategory::Fault]),
            move |_| {
                fc.fetch_add(1, Ordering::SeqCst);
            },
        );

        bus.publish(phase_event()).ok();
        bus.publish(ControllerEvent::Fault(FaultEvent::Cleared)).ok();
        bus.publish(ControllerEvent::Fault(FaultEvent::Cleared)).ok();

        assert_eq!(connection_count.load(Ordering::SeqCst), 1);
        assert_eq!(fault_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_async_receiver() {
        let bus = EventBus::new();
        let mut receiver = bus.receiver();

        assert_eq!(bus.publish(phase_event()).ok(), Some(1));

        match receiver.recv().await {
            Ok(ControllerEvent::Connection(ConnectionEvent::PhaseChanged { to, .. })) => {
                assert_eq!(to, ConnectionPhase::Connecting);
            }
            other => panic!("Wrong event received: {:?}", other),
        }
    }
    #[tokio::test]
    async fn test_slow_receiver_lags_past_capacity() {
        let bus = EventBus::with_config(EventBusConfig {
            channel_capacity: 2,
        });
        let mut receiver = bus.receiver();

        for _ in 0..4 {
            bus.publish(ControllerEvent::Configuration(ConfigurationEvent::Reset))
                .ok();
        }

        assert!(matches!(
            receiver.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert!(matches!(
            receiver.recv().await,
            Ok(ControllerEvent::Configuration(ConfigurationEvent::Reset))
        ));
    }
}
