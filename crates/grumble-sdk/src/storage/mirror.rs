//! Local mirror store
//!
//! Durable on-device copy of the last-known-good food list, kept as a
//! single JSON document. Every mutation is a full read-modify-write of
//! the document followed by an atomic replace (temp file + rename), so
//! a crash mid-write never leaves a half-written mirror behind.
//!
//! Failures degrade, they never propagate: an unreadable or corrupt
//! mirror loads as empty, a failed write is logged and the previous
//! document stays in place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{GrumbleSDKError, Result};
use crate::grub::Grub;

/// File name of the mirror document inside the data directory.
const MIRROR_FILE: &str = "data.json";

/// On-disk document. The field name matches the remote store's
/// `foodList` node so records carry identical shapes everywhere.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MirrorDocument {
    #[serde(rename = "foodList", default)]
    food_list: HashMap<String, Grub>,
}

/// File-backed mirror of the logged-in user's food list.
#[derive(Debug, Clone)]
pub struct LocalMirrorStore {
    path: PathBuf,
    template: Option<PathBuf>,
    /// Serializes read-modify-write cycles; concurrent mutations must
    /// not interleave and silently drop one another's update.
    write_lock: Arc<Mutex<()>>,
}

impl LocalMirrorStore {
    /// Open (or prepare) the mirror under `data_dir`.
    ///
    /// `template` names an optional bundled seed document copied into
    /// place on first run, before anything else touches the mirror.
    pub async fn new(data_dir: &Path, template: Option<PathBuf>) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|e| GrumbleSDKError::Storage(format!("creating data dir failed: {}", e)))?;

        Ok(Self {
            path: data_dir.join(MIRROR_FILE),
            template,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Path of the mirror document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full mapping. Never fails: a missing file is seeded
    /// from the template (or starts empty), a corrupt file is logged
    /// and treated as empty.
    pub async fn load(&self) -> HashMap<String, Grub> {
        let _guard = self.write_lock.lock().await;
        self.read_document().await.food_list
    }

    /// Insert or overwrite one record and persist.
    pub async fn put(&self, fid: &str, grub: Grub) {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await;
        document.food_list.insert(fid.to_string(), grub);
        self.persist(&document).await;
    }

    /// Remove one record if present and persist. No-op for absent fids.
    pub async fn delete(&self, fid: &str) {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await;
        if document.food_list.remove(fid).is_none() {
            debug!("mirror delete of absent fid {} ignored", fid);
            return;
        }
        self.persist(&document).await;
    }

    /// Empty the stored mapping and persist the empty document.
    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        self.persist(&MirrorDocument::default()).await;
        info!("local mirror cleared");
    }

    async fn read_document(&self) -> MirrorDocument {
        if let Err(e) = self.seed_if_missing().await {
            warn!("seeding mirror file failed, starting empty: {}", e);
            return MirrorDocument::default();
        }

        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("reading mirror file failed, treating as empty: {}", e);
                return MirrorDocument::default();
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(document) => document,
            Err(e) => {
                warn!("mirror file is corrupt, treating as empty: {}", e);
                MirrorDocument::default()
            }
        }
    }

    async fn seed_if_missing(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }

        match &self.template {
            Some(template) => {
                tokio::fs::copy(template, &self.path).await.map_err(|e| {
                    GrumbleSDKError::Storage(format!(
                        "copying template {} failed: {}",
                        template.display(),
                        e
                    ))
                })?;
                info!("mirror seeded from template {}", template.display());
            }
            None => {
                self.write_atomic(&MirrorDocument::default()).await?;
                debug!("mirror initialized empty at {}", self.path.display());
            }
        }
        Ok(())
    }

    /// Persist with the degrade-on-failure policy: callers are
    /// fire-and-forget, so a failed write only logs and leaves the
    /// previous document on disk.
    async fn persist(&self, document: &MirrorDocument) {
        if let Err(e) = self.write_atomic(document).await {
            warn!("persisting mirror file failed, keeping previous state: {}", e);
        }
    }

    async fn write_atomic(&self, document: &MirrorDocument) -> Result<()> {
        let encoded = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, &encoded)
            .await
            .map_err(|e| GrumbleSDKError::Storage(format!("writing mirror temp failed: {}", e)))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| GrumbleSDKError::Storage(format!("replacing mirror file failed: {}", e)))?;

        Ok(())
    }
}
