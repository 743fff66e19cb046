//! Event system for fetch progress
//!
//! This module provides an in-process event bus that reports what happens
//! during a bulk fetch without blocking it. Page failures never reach the
//! filtered view; this bus is where they surface.
//!
//! # Architecture
//!
//! The event bus uses `tokio::sync::broadcast` for multi-subscriber support.
//! If no subscribers exist, events are dropped immediately. Subscribers can
//! lag without blocking the fetch.
//!
//! # Example
//!
//! ```no_run
//! use libcinesearch::events::{Event, EventBus};
//!
//! # async fn example() {
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus.emit(Event::FetchStarted {
//!     fetch_id: "abc123".to_string(),
//!     pages: 10,
//! });
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {:?}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event receiver type alias
pub type EventReceiver = broadcast::Receiver<Event>;

/// Event bus for distributing fetch events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the specified per-subscriber capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Buffer capacity per subscriber (recommended: 100)
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Never blocks. With no subscribers the event is dropped.
    pub fn emit(&self, event: Event) {
        // send() returns Err if no receivers exist, which is fine
        let _ = self.sender.send(event);
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Events emitted by the result store while fetching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Bulk fetch started
    FetchStarted {
        /// Identifier shared by every event of one fetch
        fetch_id: String,
        /// Number of pages requested
        pages: u32,
    },

    /// One page decoded successfully
    PageLoaded {
        fetch_id: String,
        page: u32,
        /// Number of items on the page
        items: usize,
    },

    /// One page failed and was dropped from the merge
    PageFailed {
        fetch_id: String,
        page: u32,
        error: String,
    },

    /// All pages settled and the merge (if any) was published
    FetchCompleted {
        fetch_id: String,
        loaded_pages: usize,
        failed_pages: usize,
        /// Number of items in the merged collection
        items: usize,
    },

    /// Fetch cancelled before the join completed; nothing was published
    FetchCancelled { fetch_id: String },
}

impl Event {
    /// Fetch this event belongs to
    pub fn fetch_id(&self) -> &str {
        match self {
            Event::FetchStarted { fetch_id, .. }
            | Event::PageLoaded { fetch_id, .. }
            | Event::PageFailed { fetch_id, .. }
            | Event::FetchCompleted { fetch_id, .. }
            | Event::FetchCancelled { fetch_id } => fetch_id,
        }
    }

    /// Whether this is the last event of its fetch
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::FetchCompleted { .. } | Event::FetchCancelled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_emission_and_subscription() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.emit(Event::FetchStarted {
            fetch_id: "test123".to_string(),
            pages: 10,
        });

        match receiver.recv().await.unwrap() {
            Event::FetchStarted { fetch_id, pages } => {
                assert_eq!(fetch_id, "test123");
                assert_eq!(pages, 10);
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        let event = Event::PageFailed {
            fetch_id: "test456".to_string(),
            page: 3,
            error: "timeout".to_string(),
        };
        event_bus.emit(event.clone());

        assert_eq!(receiver1.recv().await.unwrap(), event);
        assert_eq!(receiver2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_no_subscribers() {
        let event_bus = EventBus::new(10);

        // Emit with no subscribers - should not panic or block
        event_bus.emit(Event::FetchCancelled {
            fetch_id: "test789".to_string(),
        });

        assert_eq!(event_bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_count() {
        let event_bus = EventBus::new(10);
        assert_eq!(event_bus.subscriber_count(), 0);

        let _receiver1 = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 1);

        let _receiver2 = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 2);
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::FetchCompleted {
            fetch_id: "serial_test".to_string(),
            loaded_pages: 7,
            failed_pages: 3,
            items: 70,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"fetch_completed\""));
        assert!(json.contains("\"loaded_pages\":7"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_terminal_events() {
        let id = "f".to_string();
        assert!(!Event::FetchStarted {
            fetch_id: id.clone(),
            pages: 1
        }
        .is_terminal());
        assert!(!Event::PageLoaded {
            fetch_id: id.clone(),
            page: 1,
            items: 0
        }
        .is_terminal());
        assert!(Event::FetchCancelled {
            fetch_id: id.clone()
        }
        .is_terminal());
        assert_eq!(
            Event::PageFailed {
                fetch_id: id,
                page: 2,
                error: String::new()
            }
            .fetch_id(),
            "f"
        );
    }
}
