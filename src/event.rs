//! Event-driven communication system for inter-service messaging.

use anyhow::Result;
use tokio::sync::broadcast;

use crate::slots::OccupancyMap;

/// Application events for inter-service communication.
///
/// Events are published through the EventBus and consumed by interested services.
#[derive(Debug, Clone)]
pub enum Event {
    /// Sensors were read through and the store now holds this snapshot.
    SlotsRefreshed(OccupancyMap),
    /// An external update was applied; carries only the applied slots.
    SlotsUpdated(OccupancyMap),
    SystemShutdown,
}

/// Event bus for publish-subscribe messaging between services.
///
/// # Example
///
/// ```no_run
/// use parkd::event::{Event, EventBus};
/// use parkd::slots::OccupancyMap;
///
/// let event_bus = EventBus::new();
/// let mut subscriber = event_bus.subscribe();
///
/// let _ = event_bus.publish(Event::SlotsRefreshed(OccupancyMap::new()));
///
/// // In async context, receive events:
/// // let event = subscriber.recv().await;
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new EventBus with default capacity.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Creates a new EventBus with custom capacity.
    #[cfg(test)]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns an error if there are no active subscribers.
    pub fn publish(&self, event: Event) -> Result<()> {
        self.sender.send(event)?;
        Ok(())
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each subscriber receives all events published after subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
