//! Session state
//!
//! One explicit owner for everything the original app scattered across
//! lazily-initialized globals: the login flag, the in-memory
//! fid -> Grub mapping, and the form edit cursor. Constructed once by
//! the client, reset on logout.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::grub::Grub;

/// Snapshot of the session's mutable state.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Whether a user is currently logged in.
    pub logged_in: bool,
    /// The full in-memory mapping for the current user.
    pub food_list: HashMap<String, Grub>,
    /// Record under edit in the add/edit form; `None` means create mode.
    pub current_fid: Option<String>,
}

/// Shared handle to the session state.
///
/// All reads and writes go through async accessors; the map itself
/// never escapes the lock by reference.
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    state: Arc<RwLock<SessionState>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.read().await.logged_in
    }

    pub async fn set_logged_in(&self, logged_in: bool) {
        self.state.write().await.logged_in = logged_in;
    }

    /// Snapshot of the current food list.
    pub async fn food_list(&self) -> HashMap<String, Grub> {
        self.state.read().await.food_list.clone()
    }

    pub async fn get(&self, fid: &str) -> Option<Grub> {
        self.state.read().await.food_list.get(fid).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.food_list.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.food_list.is_empty()
    }

    /// Replace the whole mapping (startup preload, login seed).
    pub async fn set_food_list(&self, food_list: HashMap<String, Grub>) {
        self.state.write().await.food_list = food_list;
    }

    /// Insert or overwrite one record.
    pub async fn append(&self, fid: &str, grub: Grub) {
        self.state
            .write()
            .await
            .food_list
            .insert(fid.to_string(), grub);
    }

    /// Remove one record. Returns whether it was present; removing an
    /// absent fid is a no-op.
    pub async fn remove(&self, fid: &str) -> bool {
        let removed = self.state.write().await.food_list.remove(fid).is_some();
        if !removed {
            debug!("remove of absent fid {} ignored", fid);
        }
        removed
    }

    pub async fn current_fid(&self) -> Option<String> {
        self.state.read().await.current_fid.clone()
    }

    pub async fn set_current_fid(&self, fid: Option<String>) {
        self.state.write().await.current_fid = fid;
    }

    /// Wipe everything: list, edit cursor, login flag.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.food_list.clear();
        state.current_fid = None;
        state.logged_in = false;
    }
}
