//! Remote sync channel
//!
//! Abstraction over the cloud-hosted per-user item collection:
//! - one-shot full reads (`fetch_all`)
//! - fire-and-forget upserts and removals
//! - incremental change notifications as a typed event stream
//!
//! The stream replaces the original closure-observer pairs: consumers
//! receive `SyncEvent::Added` / `SyncEvent::Removed` values over an
//! mpsc receiver and own the policy of what to do with them. Transport
//! concerns (ordering across clients, at-least-once delivery) belong
//! to the channel implementation, not to this interface.

pub mod memory;

pub use memory::MemorySyncChannel;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Result;

/// Remote path fragments, mirrored by every channel implementation:
/// `users/{uid}` is the per-user root, `users/{uid}/foodList/{fid}`
/// the per-item node.
pub mod paths {
    pub const USERS: &str = "users";
    pub const FOOD_LIST: &str = "foodList";
}

/// Incremental change to a user's remote item collection.
///
/// `Added` doubles as "changed": the remote store delivers the current
/// value of the child, whether it is new or overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncEvent {
    Added { fid: String, value: Value },
    Removed { fid: String },
}

impl SyncEvent {
    pub fn fid(&self) -> &str {
        match self {
            SyncEvent::Added { fid, .. } => fid,
            SyncEvent::Removed { fid } => fid,
        }
    }
}

/// Identifies one live subscription for teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// A live subscription to one user's item collection.
///
/// Existing children are replayed as `Added` events first, then live
/// changes follow. Dropping the subscription without unsubscribing
/// stops delivery but leaves the channel-side registration in place;
/// pair it with [`RemoteSyncChannel::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    uid: String,
    events: mpsc::UnboundedReceiver<SyncEvent>,
}

impl Subscription {
    pub fn new(
        id: SubscriptionId,
        uid: impl Into<String>,
        events: mpsc::UnboundedReceiver<SyncEvent>,
    ) -> Self {
        Self {
            id,
            uid: uid.into(),
            events,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Next event, or `None` once the channel side has torn down.
    pub async fn recv(&mut self) -> Option<SyncEvent> {
        self.events.recv().await
    }
}

/// One user's remote item collection plus its change notifications.
///
/// `put` and `delete` are fire-and-forget: implementations log their
/// own transport failures and callers never await an acknowledgment.
#[async_trait]
pub trait RemoteSyncChannel: Send + Sync {
    /// One-shot read of the full remote mapping for `uid`. `None`
    /// means the channel has no session for that user.
    async fn fetch_all(&self, uid: &str) -> Result<Option<HashMap<String, Value>>>;

    /// Upsert one record under `users/{uid}/foodList/{fid}`.
    async fn put(&self, uid: &str, fid: &str, value: Value);

    /// Remove one record. Removing an absent fid is harmless.
    async fn delete(&self, uid: &str, fid: &str);

    /// Register for child-added / child-removed notifications.
    async fn subscribe(&self, uid: &str) -> Result<Subscription>;

    /// Stop delivery for the given subscription. Idempotent.
    async fn unsubscribe(&self, id: SubscriptionId);
}
