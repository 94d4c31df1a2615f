//! In-process sync channel
//!
//! Backs the trait with a `RwLock`-guarded map and per-subscription
//! mpsc senders. Used by tests and demos, and as the reference for the
//! subscribe semantics the client relies on: existing children are
//! replayed as `Added` events before any live change is delivered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use crate::error::Result;
use crate::sync::{RemoteSyncChannel, Subscription, SubscriptionId, SyncEvent};

#[derive(Debug, Default)]
struct ChannelState {
    /// uid -> fid -> raw record value.
    data: HashMap<String, HashMap<String, Value>>,
    /// uid -> live subscription senders.
    subscribers: HashMap<String, Vec<(SubscriptionId, mpsc::UnboundedSender<SyncEvent>)>>,
}

/// In-memory [`RemoteSyncChannel`] implementation.
///
/// Cloning shares the underlying store, so one instance can stand in
/// for "the cloud" across several simulated clients.
#[derive(Debug, Clone, Default)]
pub struct MemorySyncChannel {
    state: Arc<RwLock<ChannelState>>,
    next_subscription: Arc<AtomicU64>,
}

impl MemorySyncChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions across all users.
    pub async fn subscriber_count(&self) -> usize {
        let state = self.state.read().await;
        state.subscribers.values().map(Vec::len).sum()
    }

    async fn notify(&self, uid: &str, event: SyncEvent) {
        let mut state = self.state.write().await;
        if let Some(senders) = state.subscribers.get_mut(uid) {
            // Prune subscriptions whose receiver side is gone.
            senders.retain(|(id, sender)| {
                if sender.send(event.clone()).is_err() {
                    debug!("dropping dead subscription {:?} for {}", id, uid);
                    false
                } else {
                    true
                }
            });
        }
    }
}

#[async_trait]
impl RemoteSyncChannel for MemorySyncChannel {
    async fn fetch_all(&self, uid: &str) -> Result<Option<HashMap<String, Value>>> {
        let state = self.state.read().await;
        Ok(Some(state.data.get(uid).cloned().unwrap_or_default()))
    }

    async fn put(&self, uid: &str, fid: &str, value: Value) {
        {
            let mut state = self.state.write().await;
            state
                .data
                .entry(uid.to_string())
                .or_default()
                .insert(fid.to_string(), value.clone());
        }
        self.notify(
            uid,
            SyncEvent::Added {
                fid: fid.to_string(),
                value,
            },
        )
        .await;
    }

    async fn delete(&self, uid: &str, fid: &str) {
        {
            let mut state = self.state.write().await;
            if let Some(items) = state.data.get_mut(uid) {
                items.remove(fid);
            }
        }
        // Removal notifications go out whether or not the fid existed;
        // receivers treat Removed as idempotent.
        self.notify(
            uid,
            SyncEvent::Removed {
                fid: fid.to_string(),
            },
        )
        .await;
    }

    async fn subscribe(&self, uid: &str) -> Result<Subscription> {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut state = self.state.write().await;
        // Replay existing children as Added before any live change.
        if let Some(items) = state.data.get(uid) {
            for (fid, value) in items {
                let _ = sender.send(SyncEvent::Added {
                    fid: fid.clone(),
                    value: value.clone(),
                });
            }
        }
        state
            .subscribers
            .entry(uid.to_string())
            .or_default()
            .push((id, sender));

        info!("subscription {:?} opened for {}", id, uid);
        Ok(Subscription::new(id, uid, receiver))
    }

    async fn unsubscribe(&self, id: SubscriptionId) {
        let mut state = self.state.write().await;
        for senders in state.subscribers.values_mut() {
            senders.retain(|(sub_id, _)| *sub_id != id);
        }
        state.subscribers.retain(|_, senders| !senders.is_empty());
        debug!("subscription {:?} closed", id);
    }
}
