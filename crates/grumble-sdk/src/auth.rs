//! Authentication boundary
//!
//! The core never authenticates anyone; it only needs "current user
//! id, or none" and a sign-out call. Platform layers provide the real
//! implementation; [`StaticAuthProvider`] covers tests and demos.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{GrumbleSDKError, Result};

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The authenticated user's id, or `None` when nobody is signed in.
    async fn current_user(&self) -> Option<String>;

    /// Sign out of the provider. Callers treat failure as non-fatal:
    /// local session state is cleared regardless.
    async fn sign_out(&self) -> Result<()>;
}

/// Fixed-user provider for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthProvider {
    uid: Arc<RwLock<Option<String>>>,
    fail_sign_out: bool,
}

impl StaticAuthProvider {
    /// Provider already signed in as `uid`.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: Arc::new(RwLock::new(Some(uid.into()))),
            fail_sign_out: false,
        }
    }

    /// Provider with nobody signed in.
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// Make `sign_out` fail while still clearing the provider's user,
    /// for exercising the degraded logout path.
    pub fn with_sign_out_failure(mut self) -> Self {
        self.fail_sign_out = true;
        self
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn current_user(&self) -> Option<String> {
        self.uid.read().await.clone()
    }

    async fn sign_out(&self) -> Result<()> {
        self.uid.write().await.take();
        if self.fail_sign_out {
            return Err(GrumbleSDKError::Auth(
                "simulated sign-out failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_out_clears_user() {
        let auth = StaticAuthProvider::new("user1");
        assert_eq!(auth.current_user().await.as_deref(), Some("user1"));

        auth.sign_out().await.unwrap();
        assert!(auth.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_failing_sign_out_still_clears_user() {
        let auth = StaticAuthProvider::new("user1").with_sign_out_failure();

        assert!(auth.sign_out().await.is_err());
        assert!(auth.current_user().await.is_none());
    }
}
