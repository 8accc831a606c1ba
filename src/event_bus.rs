//! Event bus connecting the organizer with its chasers.
//!
//! Chasers communicate exclusively through events broadcast on this bus.
//! Delivery to any one subscriber follows publication order, which the
//! organizer relies on: the `Bypass` published during a reorganization is
//! observable before the `Bump` from the same reorganization.

use thiserror::Error;
use tokio::sync::broadcast;

use crate::events::Event;

const DEFAULT_EVENT_LIMIT: usize = 10_000;

/// Receive-side failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecvError {
    /// The subscriber fell behind; the payload counts the missed events.
    #[error("lagged {0} events")]
    Lagged(u64),

    /// All publishers are gone.
    #[error("event bus closed")]
    Closed,
}

/// Broadcast bus for chaser events.
///
/// All subscribers receive all events. Late subscribers do not receive past
/// events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscription. Only events published after this call are
    /// delivered.
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish events in order. Having no subscribers is not an error.
    pub fn emit(&self, events: &[Event]) {
        for event in events {
            let _ = self.sender.send(*event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LIMIT)
    }
}

/// A subscription to the bus.
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<Event>,
}

impl EventStream {
    /// Wait for the next event.
    pub async fn recv(&mut self) -> Result<Event, RecvError> {
        match self.receiver.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(RecvError::Lagged(n)),
            Err(broadcast::error::RecvError::Closed) => Err(RecvError::Closed),
        }
    }

    /// Take the next event without waiting, if one is queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(&[Event::Bump { height: 9 }]);

        assert_eq!(rx.recv().await.unwrap(), Event::Bump { height: 9 });
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(16);
        bus.emit(&[Event::Stop]);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_see_publication_order() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(&[
            Event::Bypass {
                height: 2,
                branch_point: 1,
                old_top: 3,
            },
            Event::Bump { height: 2 },
        ]);

        for rx in [&mut rx1, &mut rx2] {
            assert!(matches!(rx.recv().await.unwrap(), Event::Bypass { .. }));
            assert_eq!(rx.recv().await.unwrap(), Event::Bump { height: 2 });
        }
    }

    #[tokio::test]
    async fn test_try_recv_drains() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(&[Event::Stop]);

        assert_eq!(rx.try_recv(), Some(Event::Stop));
        assert_eq!(rx.try_recv(), None);
    }
}
