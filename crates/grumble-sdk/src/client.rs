//! GrumbleClient - client core entry point
//!
//! Layered design:
//! ```text
//! GrumbleClient (lifecycle + mutation policy)
//!   ├── SessionManager (in-memory food list, login flag, edit cursor)
//!   ├── LocalMirrorStore (on-device persistence)
//!   ├── RemoteSyncChannel (cloud collection + change stream)
//!   ├── AuthProvider (current user, sign-out)
//!   └── EventManager (broadcast to presentation code)
//! ```
//!
//! Mutations are optimistic and unordered: a user add/remove lands in
//! the session map and the mirror immediately, then is pushed to the
//! channel without awaiting an acknowledgment. Incoming channel events
//! are applied by a pump task that runs from login to logout.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::AuthProvider;
use crate::error::{GrumbleSDKError, Result};
use crate::events::{ClientEvent, EventManager, Route};
use crate::grub::{Grub, GrubDraft};
use crate::session::SessionManager;
use crate::storage::LocalMirrorStore;
use crate::sync::{RemoteSyncChannel, SubscriptionId, SyncEvent};

/// How long logout waits for the pump task to drain after the
/// subscription is torn down before abandoning it.
const PUMP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Client configuration.
#[derive(Debug, Clone, Default)]
pub struct GrumbleConfig {
    /// Directory holding the mirror document. Required.
    pub data_dir: PathBuf,
    /// Optional bundled seed document copied into place on first run.
    pub template_path: Option<PathBuf>,
    /// Broadcast buffer size for client events.
    pub event_capacity: usize,
}

pub struct GrumbleConfigBuilder {
    config: GrumbleConfig,
}

impl GrumbleConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GrumbleConfig {
                event_capacity: 256,
                ..Default::default()
            },
        }
    }

    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.data_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn template_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.template_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn build(self) -> GrumbleConfig {
        self.config
    }
}

impl Default for GrumbleConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrumbleConfig {
    pub fn builder() -> GrumbleConfigBuilder {
        GrumbleConfigBuilder::new()
    }
}

/// Live subscription bookkeeping between login and logout.
struct Pump {
    subscription_id: SubscriptionId,
    task: JoinHandle<()>,
}

/// The client core: owns session state, the local mirror, and the
/// login/logout lifecycle around the sync channel.
pub struct GrumbleClient {
    session: SessionManager,
    mirror: LocalMirrorStore,
    channel: Arc<dyn RemoteSyncChannel>,
    auth: Arc<dyn AuthProvider>,
    events: Arc<EventManager>,
    pump: Mutex<Option<Pump>>,
}

impl GrumbleClient {
    /// Build the client and preload the session map from the local
    /// mirror, so the last-known-good list is visible before login.
    pub async fn initialize(
        config: GrumbleConfig,
        channel: Arc<dyn RemoteSyncChannel>,
        auth: Arc<dyn AuthProvider>,
    ) -> Result<Arc<Self>> {
        if config.data_dir.as_os_str().is_empty() {
            return Err(GrumbleSDKError::Config(
                "data_dir must be set".to_string(),
            ));
        }
        let capacity = config.event_capacity.max(1);

        let mirror =
            LocalMirrorStore::new(&config.data_dir, config.template_path.clone()).await?;
        let session = SessionManager::new();
        session.set_food_list(mirror.load().await).await;

        info!(
            "grumble client initialized, {} record(s) preloaded from mirror",
            session.len().await
        );

        Ok(Arc::new(Self {
            session,
            mirror,
            channel,
            auth,
            events: Arc::new(EventManager::new(capacity)),
            pump: Mutex::new(None),
        }))
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    pub fn mirror(&self) -> &LocalMirrorStore {
        &self.mirror
    }

    /// Enter the logged-in state for the authenticated user.
    ///
    /// Seeds session and mirror from an explicit `fetch_all`, then
    /// subscribes and starts the event pump. The channel's replay of
    /// existing children as `Added` events overlaps the seed; both
    /// paths are idempotent upserts, so the overlap is harmless.
    pub async fn login(self: &Arc<Self>) -> Result<()> {
        let uid = self
            .auth
            .current_user()
            .await
            .ok_or(GrumbleSDKError::NotLoggedIn)?;

        let mut pump = self.pump.lock().await;
        if pump.is_some() {
            debug!("login ignored, already logged in");
            return Ok(());
        }

        self.session.set_logged_in(true).await;

        match self.channel.fetch_all(&uid).await {
            Ok(Some(records)) => {
                for (fid, value) in records {
                    self.apply_added(&fid, value).await;
                }
            }
            Ok(None) => warn!("remote has no session for {}, starting from replay", uid),
            Err(e) => warn!("initial fetch failed, relying on subscription replay: {}", e),
        }

        let mut subscription = self.channel.subscribe(&uid).await?;
        let subscription_id = subscription.id();

        let client = Arc::clone(self);
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                match event {
                    SyncEvent::Added { fid, value } => client.apply_added(&fid, value).await,
                    SyncEvent::Removed { fid } => client.apply_removed(&fid).await,
                }
            }
            debug!("sync event pump stopped");
        });
        *pump = Some(Pump {
            subscription_id,
            task,
        });
        drop(pump);

        info!("logged in as {}", uid);
        self.events.emit(ClientEvent::LoggedIn { uid }).await;
        self.events
            .emit(ClientEvent::RouteChanged { route: Route::List })
            .await;
        Ok(())
    }

    /// Leave the logged-in state.
    ///
    /// Tears down the subscription, signs out (failure is logged, not
    /// fatal), and clears the session map, the mirror, and the edit
    /// cursor. Local state ends up empty no matter what fails.
    pub async fn logout(&self) -> Result<()> {
        if let Some(pump) = self.pump.lock().await.take() {
            self.channel.unsubscribe(pump.subscription_id).await;
            // Unsubscribing drops the sender side, so the pump drains
            // and exits on its own; don't wait forever on a channel
            // implementation that keeps the stream open.
            if tokio::time::timeout(PUMP_SHUTDOWN_TIMEOUT, pump.task)
                .await
                .is_err()
            {
                warn!("sync event pump did not stop in time, abandoning it");
            }
        }

        if let Err(e) = self.auth.sign_out().await {
            warn!("sign-out failed, clearing local state anyway: {}", e);
        }

        self.session.clear().await;
        self.mirror.clear().await;

        info!("logged out, local state cleared");
        self.events.emit(ClientEvent::LoggedOut).await;
        self.events
            .emit(ClientEvent::RouteChanged {
                route: Route::Login,
            })
            .await;
        Ok(())
    }

    /// Create a record from a form draft and propagate it everywhere:
    /// session map, local mirror, remote channel.
    pub async fn add_grub(&self, draft: GrubDraft) -> Result<Grub> {
        let grub = Grub::create(draft)?;
        self.store_local(&grub).await;
        self.push_remote(&grub).await;
        self.events
            .emit(ClientEvent::GrubAdded {
                fid: grub.fid.clone(),
            })
            .await;
        Ok(grub)
    }

    /// Mark a record as being edited by the form.
    pub async fn begin_edit(&self, fid: &str) -> Result<()> {
        if self.session.get(fid).await.is_none() {
            return Err(GrumbleSDKError::NotFound(format!("no grub with fid {}", fid)));
        }
        self.session.set_current_fid(Some(fid.to_string())).await;
        Ok(())
    }

    pub async fn cancel_edit(&self) {
        self.session.set_current_fid(None).await;
    }

    /// Rebuild the record under the edit cursor from a new draft. The
    /// fid and creation time survive; the cursor resets afterwards.
    pub async fn edit_grub(&self, draft: GrubDraft) -> Result<Grub> {
        let fid = self
            .session
            .current_fid()
            .await
            .ok_or_else(|| GrumbleSDKError::InvalidInput("no record under edit".to_string()))?;
        let existing = self
            .session
            .get(&fid)
            .await
            .ok_or_else(|| GrumbleSDKError::NotFound(format!("no grub with fid {}", fid)))?;

        let grub = Grub::edit(&existing, draft)?;
        self.store_local(&grub).await;
        self.push_remote(&grub).await;
        self.session.set_current_fid(None).await;
        self.events
            .emit(ClientEvent::GrubAdded {
                fid: grub.fid.clone(),
            })
            .await;
        Ok(grub)
    }

    /// Remove a record everywhere. Removing an absent fid is a no-op.
    pub async fn remove_grub(&self, fid: &str) -> Result<()> {
        self.session.remove(fid).await;
        self.mirror.delete(fid).await;
        if let Some(uid) = self.auth.current_user().await {
            self.channel.delete(&uid, fid).await;
        } else {
            debug!("no authenticated user, remote delete of {} skipped", fid);
        }
        self.events
            .emit(ClientEvent::GrubRemoved {
                fid: fid.to_string(),
            })
            .await;
        Ok(())
    }

    /// Stop the pump without touching state. For process teardown.
    pub async fn shutdown(&self) {
        if let Some(pump) = self.pump.lock().await.take() {
            self.channel.unsubscribe(pump.subscription_id).await;
            pump.task.abort();
            info!("grumble client shut down");
        }
    }

    async fn store_local(&self, grub: &Grub) {
        self.session.append(&grub.fid, grub.clone()).await;
        self.mirror.put(&grub.fid, grub.clone()).await;
    }

    /// Fire-and-forget push of one record to the remote collection.
    /// Without an authenticated user the push is skipped, matching the
    /// channel's "no session" behavior.
    async fn push_remote(&self, grub: &Grub) {
        let Some(uid) = self.auth.current_user().await else {
            debug!("no authenticated user, remote put of {} skipped", grub.fid);
            return;
        };
        match grub.to_value() {
            Ok(value) => self.channel.put(&uid, &grub.fid, value).await,
            Err(e) => warn!("encoding {} for remote push failed: {}", grub.fid, e),
        }
    }

    /// Channel policy for `Added`: decode, drop-and-log on failure,
    /// otherwise upsert into session map and mirror.
    async fn apply_added(&self, fid: &str, value: serde_json::Value) {
        match Grub::from_value(value) {
            Ok(grub) => {
                self.session.append(fid, grub.clone()).await;
                self.mirror.put(fid, grub).await;
                self.events
                    .emit(ClientEvent::GrubAdded {
                        fid: fid.to_string(),
                    })
                    .await;
            }
            Err(e) => warn!("dropping malformed added event for {}: {}", fid, e),
        }
    }

    /// Channel policy for `Removed`: idempotent removal from session
    /// map and mirror.
    async fn apply_removed(&self, fid: &str) {
        self.session.remove(fid).await;
        self.mirror.delete(fid).await;
        self.events
            .emit(ClientEvent::GrubRemoved {
                fid: fid.to_string(),
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticAuthProvider;
    use crate::sync::MemorySyncChannel;
    use serde_json::json;
    use tempfile::TempDir;

    async fn client_with(
        dir: &TempDir,
        channel: MemorySyncChannel,
        auth: StaticAuthProvider,
    ) -> Arc<GrumbleClient> {
        let config = GrumbleConfig::builder().data_dir(dir.path()).build();
        GrumbleClient::initialize(config, Arc::new(channel), Arc::new(auth))
            .await
            .unwrap()
    }

    async fn wait_for<F, Fut>(mut condition: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_add_then_remote_remove_end_to_end() {
        let dir = TempDir::new().unwrap();
        let channel = MemorySyncChannel::new();
        let client = client_with(&dir, channel.clone(), StaticAuthProvider::new("user1")).await;
        client.login().await.unwrap();

        let taco = client
            .add_grub(GrubDraft::new("Taco"))
            .await
            .unwrap();

        assert_eq!(client.session().get(&taco.fid).await.unwrap(), taco);
        let mirrored = client.mirror().load().await;
        assert_eq!(mirrored.len(), 1);
        assert_eq!(mirrored[&taco.fid], taco);

        // Another client removes the record remotely.
        channel.delete("user1", &taco.fid).await;

        let observer = client.clone();
        wait_for(|| {
            let observer = observer.clone();
            async move { observer.session().is_empty().await }
        })
        .await;
        assert!(client.mirror().load().await.is_empty());
    }

    #[tokio::test]
    async fn test_login_seeds_from_existing_remote_data() {
        let dir = TempDir::new().unwrap();
        let channel = MemorySyncChannel::new();
        let seeded = Grub::create(GrubDraft::new("Pho")).unwrap();
        channel
            .put("user1", &seeded.fid, seeded.to_value().unwrap())
            .await;

        let client = client_with(&dir, channel, StaticAuthProvider::new("user1")).await;
        client.login().await.unwrap();

        assert_eq!(client.session().get(&seeded.fid).await.unwrap(), seeded);
        assert_eq!(client.mirror().load().await.len(), 1);
        assert!(client.session().is_logged_in().await);
    }

    #[tokio::test]
    async fn test_logout_clears_everything_and_unsubscribes() {
        let dir = TempDir::new().unwrap();
        let channel = MemorySyncChannel::new();
        let client = client_with(&dir, channel.clone(), StaticAuthProvider::new("user1")).await;
        client.login().await.unwrap();
        client.add_grub(GrubDraft::new("Taco")).await.unwrap();
        client.add_grub(GrubDraft::new("Pho")).await.unwrap();

        client.logout().await.unwrap();

        assert!(client.session().is_empty().await);
        assert!(!client.session().is_logged_in().await);
        assert!(client.mirror().load().await.is_empty());
        assert_eq!(channel.subscriber_count().await, 0);

        // Remote mutations after logout must not resurrect anything.
        channel.put("user1", "late", json!({ "food": "Late" })).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(client.session().is_empty().await);
        assert!(client.mirror().load().await.is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_failure_still_clears_local_state() {
        let dir = TempDir::new().unwrap();
        let auth = StaticAuthProvider::new("user1").with_sign_out_failure();
        let client = client_with(&dir, MemorySyncChannel::new(), auth).await;
        client.login().await.unwrap();
        client.add_grub(GrubDraft::new("Taco")).await.unwrap();

        client.logout().await.unwrap();

        assert!(client.session().is_empty().await);
        assert!(!client.session().is_logged_in().await);
        assert!(client.mirror().load().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_remote_added_is_dropped() {
        let dir = TempDir::new().unwrap();
        let channel = MemorySyncChannel::new();
        let client = client_with(&dir, channel.clone(), StaticAuthProvider::new("user1")).await;
        client.login().await.unwrap();

        channel.put("user1", "bad", json!({ "oops": true })).await;
        let good = Grub::create(GrubDraft::new("Ramen")).unwrap();
        channel
            .put("user1", &good.fid, good.to_value().unwrap())
            .await;

        let observer = client.clone();
        let fid = good.fid.clone();
        wait_for(|| {
            let observer = observer.clone();
            let fid = fid.clone();
            async move { observer.session().get(&fid).await.is_some() }
        })
        .await;

        // The malformed event never landed; the later one did.
        assert_eq!(client.session().len().await, 1);
        assert!(client.session().get("bad").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_remote_removed_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let channel = MemorySyncChannel::new();
        let client = client_with(&dir, channel.clone(), StaticAuthProvider::new("user1")).await;
        client.login().await.unwrap();
        let taco = client.add_grub(GrubDraft::new("Taco")).await.unwrap();
        let pho = client.add_grub(GrubDraft::new("Pho")).await.unwrap();

        channel.delete("user1", &taco.fid).await;
        channel.delete("user1", &taco.fid).await;

        let observer = client.clone();
        let fid = taco.fid.clone();
        wait_for(|| {
            let observer = observer.clone();
            let fid = fid.clone();
            async move { observer.session().get(&fid).await.is_none() }
        })
        .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(client.session().len().await, 1);
        assert!(client.session().get(&pho.fid).await.is_some());
    }

    #[tokio::test]
    async fn test_edit_preserves_fid_and_date_everywhere() {
        let dir = TempDir::new().unwrap();
        let channel = MemorySyncChannel::new();
        let client = client_with(&dir, channel.clone(), StaticAuthProvider::new("user1")).await;
        client.login().await.unwrap();
        let original = client
            .add_grub(GrubDraft::new("Burger").with_price(8.5))
            .await
            .unwrap();

        client.begin_edit(&original.fid).await.unwrap();
        assert_eq!(
            client.session().current_fid().await.as_deref(),
            Some(original.fid.as_str())
        );
        let edited = client
            .edit_grub(GrubDraft::new("Cheeseburger").with_price(9.5))
            .await
            .unwrap();

        assert_eq!(edited.fid, original.fid);
        assert_eq!(edited.date, original.date);
        assert!(client.session().current_fid().await.is_none());
        assert_eq!(client.mirror().load().await[&original.fid], edited);

        let remote = channel.fetch_all("user1").await.unwrap().unwrap();
        assert_eq!(remote[&original.fid], edited.to_value().unwrap());
    }

    #[tokio::test]
    async fn test_login_without_authenticated_user_fails() {
        let dir = TempDir::new().unwrap();
        let client = client_with(
            &dir,
            MemorySyncChannel::new(),
            StaticAuthProvider::logged_out(),
        )
        .await;

        let err = client.login().await.unwrap_err();
        assert!(matches!(err, GrumbleSDKError::NotLoggedIn));
        assert!(!client.session().is_logged_in().await);
    }

    #[tokio::test]
    async fn test_mutations_while_logged_out_stay_local() {
        let dir = TempDir::new().unwrap();
        let channel = MemorySyncChannel::new();
        let client = client_with(
            &dir,
            channel.clone(),
            StaticAuthProvider::logged_out(),
        )
        .await;

        let taco = client.add_grub(GrubDraft::new("Taco")).await.unwrap();

        assert!(client.session().get(&taco.fid).await.is_some());
        assert_eq!(client.mirror().load().await.len(), 1);
        let remote = channel.fetch_all("user1").await.unwrap().unwrap();
        assert!(remote.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_preloads_mirror_into_session() {
        let dir = TempDir::new().unwrap();
        let channel = MemorySyncChannel::new();
        {
            let client =
                client_with(&dir, channel.clone(), StaticAuthProvider::new("user1")).await;
            client.add_grub(GrubDraft::new("Taco")).await.unwrap();
            client.shutdown().await;
        }

        // A fresh client over the same data dir sees the mirrored list
        // before any login happens.
        let client = client_with(&dir, channel, StaticAuthProvider::new("user1")).await;
        assert_eq!(client.session().len().await, 1);
        assert!(!client.session().is_logged_in().await);
    }

    #[tokio::test]
    async fn test_route_events_follow_login_and_logout() {
        let dir = TempDir::new().unwrap();
        let client = client_with(
            &dir,
            MemorySyncChannel::new(),
            StaticAuthProvider::new("user1"),
        )
        .await;
        let mut receiver = client.events().subscribe();

        client.login().await.unwrap();
        client.logout().await.unwrap();

        let mut routes = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if let ClientEvent::RouteChanged { route } = event {
                routes.push(route);
            }
        }
        assert_eq!(routes, vec![Route::List, Route::Login]);
    }
}
