//! Client event broadcast
//!
//! Presentation code observes the core through a broadcast stream
//! instead of polling the session map:
//! - record changes (added / removed), whether user- or remote-driven
//! - session transitions (logged in / logged out)
//! - route changes (which top-level view should be showing)
//!
//! The stream is lossy by design: a slow subscriber misses events and
//! re-reads the session map for truth.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Top-level view the UI should route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Login screen (logged-out state).
    Login,
    /// Primary food list.
    List,
}

/// Events emitted by [`crate::client::GrumbleClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientEvent {
    GrubAdded { fid: String },
    GrubRemoved { fid: String },
    LoggedIn { uid: String },
    LoggedOut,
    RouteChanged { route: Route },
}

impl ClientEvent {
    /// Stable name used for per-type statistics.
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::GrubAdded { .. } => "grub_added",
            ClientEvent::GrubRemoved { .. } => "grub_removed",
            ClientEvent::LoggedIn { .. } => "logged_in",
            ClientEvent::LoggedOut => "logged_out",
            ClientEvent::RouteChanged { .. } => "route_changed",
        }
    }
}

/// Event counters.
#[derive(Debug, Clone, Default)]
pub struct EventStats {
    pub total_events: u64,
    pub events_by_type: HashMap<String, u64>,
    /// UTC millisecond timestamp of the last emitted event.
    pub last_event_time: Option<i64>,
}

/// Broadcast hub for [`ClientEvent`]s.
pub struct EventManager {
    sender: broadcast::Sender<ClientEvent>,
    stats: Arc<tokio::sync::RwLock<EventStats>>,
}

impl EventManager {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            stats: Arc::new(tokio::sync::RwLock::new(EventStats::default())),
        }
    }

    /// Publish an event to all current subscribers.
    pub async fn emit(&self, event: ClientEvent) {
        {
            let mut stats = self.stats.write().await;
            stats.total_events += 1;
            *stats
                .events_by_type
                .entry(event.event_type().to_string())
                .or_insert(0) += 1;
            stats.last_event_time = Some(Utc::now().timestamp_millis());
        }

        // send fails when nobody is subscribed, which is a normal state
        // for a headless client.
        if let Err(e) = self.sender.send(event) {
            debug!("no active event receivers: {}", e);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub async fn get_stats(&self) -> EventStats {
        self.stats.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let events = EventManager::new(16);
        let mut receiver = events.subscribe();

        events
            .emit(ClientEvent::GrubAdded {
                fid: "abc1_12_30_05".to_string(),
            })
            .await;

        match receiver.recv().await.unwrap() {
            ClientEvent::GrubAdded { fid } => assert_eq!(fid, "abc1_12_30_05"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_still_counts() {
        let events = EventManager::new(16);

        events.emit(ClientEvent::LoggedOut).await;
        events
            .emit(ClientEvent::RouteChanged { route: Route::Login })
            .await;

        let stats = events.get_stats().await;
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.events_by_type["logged_out"], 1);
        assert_eq!(stats.events_by_type["route_changed"], 1);
        assert!(stats.last_event_time.is_some());
    }
}
