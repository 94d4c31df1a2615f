//! Grumble SDK - headless client core for the Grumble food log
//!
//! The crate keeps one user's food/restaurant entries ("Grubs") in
//! three places and keeps them agreeing:
//! - an in-memory session map read by presentation code
//! - a file-backed local mirror that survives restarts and offline use
//! - a remote per-user collection behind the [`sync::RemoteSyncChannel`]
//!   trait, with change notifications as a typed event stream
//!
//! Policy is simple by design: mutations are optimistic and unordered,
//! the local mirror follows the cloud, last writer wins, and every
//! failure degrades to "treat as empty / skip and continue" instead of
//! surfacing as fatal.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use grumble_sdk::{
//!     GrumbleClient, GrumbleConfig, GrubDraft,
//!     auth::StaticAuthProvider, sync::MemorySyncChannel,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GrumbleConfig::builder()
//!         .data_dir("/path/to/data")
//!         .build();
//!
//!     let client = GrumbleClient::initialize(
//!         config,
//!         Arc::new(MemorySyncChannel::new()),
//!         Arc::new(StaticAuthProvider::new("user1")),
//!     )
//!     .await?;
//!
//!     client.login().await?;
//!
//!     let draft = GrubDraft::new("Taco")
//!         .with_price(3.5)
//!         .with_tag("mexican", 2.0);
//!     let taco = client.add_grub(draft).await?;
//!     println!("logged {} as {}", taco.food, taco.fid);
//!
//!     client.logout().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod events;
pub mod grub;
pub mod session;
pub mod storage;
pub mod sync;

pub use auth::{AuthProvider, StaticAuthProvider};
pub use client::{GrumbleClient, GrumbleConfig, GrumbleConfigBuilder};
pub use error::{GrumbleSDKError, Result};
pub use events::{ClientEvent, EventManager, EventStats, Route};
pub use grub::{Grub, GrubDraft, DEFAULT_TAG};
pub use session::{SessionManager, SessionState};
pub use storage::LocalMirrorStore;
pub use sync::{MemorySyncChannel, RemoteSyncChannel, Subscription, SubscriptionId, SyncEvent};
