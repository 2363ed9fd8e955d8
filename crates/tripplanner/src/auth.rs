//! Session-based identity provider.
//!
//! The interactive provider step is replaced by an identity taken from
//! configuration. A successful sign-in records the session in local storage
//! so it survives restarts, and every change is pushed to auth-state
//! subscribers.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::persistence::{AuthCallback, AuthProvider, SubscriberList, Subscription, User};
use crate::storage::LocalStorage;

/// Local-storage key holding the signed-in user.
pub const SESSION_KEY: &str = "tripplanner_session";

/// Identity provider backed by a configured identity and a stored session.
#[derive(Debug)]
pub struct SessionAuthProvider {
    storage: Arc<LocalStorage>,
    identity: Option<User>,
    subscribers: SubscriberList<(), AuthCallback>,
}

impl SessionAuthProvider {
    /// Create a provider that signs in as `identity`.
    ///
    /// With no identity every sign-in fails, as if the user dismissed the
    /// provider's prompt.
    #[must_use]
    pub fn new(storage: Arc<LocalStorage>, identity: Option<User>) -> Self {
        Self {
            storage,
            identity,
            subscribers: SubscriberList::new(),
        }
    }

    /// The identity sign-in would produce.
    #[must_use]
    pub fn identity(&self) -> Option<&User> {
        self.identity.as_ref()
    }

    fn read_session(&self) -> Result<Option<User>> {
        match self.storage.get_item(SESSION_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn broadcast(&self, user: Option<&User>) -> Result<()> {
        for callback in self.subscribers.all()? {
            callback(user.cloned());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuthProvider for SessionAuthProvider {
    async fn sign_in(&self) -> Result<User> {
        let user = self
            .identity
            .clone()
            .ok_or_else(|| Error::sign_in("no identity configured (set auth.uid)"))?;

        let json = serde_json::to_string(&user)?;
        self.storage.set_item(SESSION_KEY, &json)?;
        info!("Signed in as {}", user.uid);

        self.broadcast(Some(&user))?;
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        self.storage
            .remove_item(SESSION_KEY)
            .map_err(|e| Error::SignOut(e.to_string()))?;
        info!("Signed out");
        self.broadcast(None)
    }

    fn current_user(&self) -> Option<User> {
        match self.read_session() {
            Ok(user) => user,
            Err(e) => {
                warn!("Ignoring unreadable session: {}", e);
                None
            }
        }
    }

    fn subscribe_auth_state(&self, callback: AuthCallback) -> Result<Subscription> {
        let subscription = self.subscribers.add((), Arc::clone(&callback))?;
        callback(self.current_user());
        Ok(subscription)
    }
}
