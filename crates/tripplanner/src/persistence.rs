//! Persistence capabilities used by the trip store.
//!
//! The store never talks to a concrete backend. It sees three capabilities:
//! an identity provider ([`AuthProvider`]), a per-user remote document
//! collection ([`RemoteStore`]) and a local mirror of the whole state
//! ([`LocalStore`]). Live feeds are registered with a callback and return a
//! [`Subscription`] that deregisters the callback once cancelled.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{AppState, Trip};

/// A signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable identifier; keys the user's remote collection.
    pub uid: String,
    /// Email address, if the provider shares it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl User {
    /// A user with only a uid.
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            photo_url: None,
            display_name: None,
        }
    }
}

/// Callback receiving the current identity, or `None` when signed out.
pub type AuthCallback = Arc<dyn Fn(Option<User>) + Send + Sync>;

/// Callback receiving the full list of a user's trip documents.
pub type TripsCallback = Arc<dyn Fn(Vec<Trip>) + Send + Sync>;

/// External identity provider.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Run the interactive sign-in.
    ///
    /// # Errors
    ///
    /// Returns an error if sign-in is cancelled or fails.
    async fn sign_in(&self) -> Result<User>;

    /// End the current session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be cleared.
    async fn sign_out(&self) -> Result<()>;

    /// The identity of the current session, if any.
    fn current_user(&self) -> Option<User>;

    /// Watch the session.
    ///
    /// `callback` runs once immediately with the current state and again
    /// after every sign-in or sign-out.
    ///
    /// # Errors
    ///
    /// Returns an error if the callback cannot be registered.
    fn subscribe_auth_state(&self, callback: AuthCallback) -> Result<Subscription>;
}

/// Remote per-user document collection of trips.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Watch a user's trips.
    ///
    /// `callback` runs once immediately with the current documents and again
    /// after every change to the collection, including this process's own
    /// writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the callback cannot be registered or the initial
    /// documents cannot be read.
    fn subscribe_user_trips(&self, uid: &str, callback: TripsCallback) -> Result<Subscription>;

    /// Create or wholly replace a trip document.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn upsert_trip(&self, uid: &str, trip: &Trip) -> Result<()>;

    /// Delete a trip document. Deleting a missing document is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    async fn delete_trip(&self, uid: &str, trip_id: &str) -> Result<()>;
}

/// Local mirror of the whole application state.
pub trait LocalStore: Send + Sync {
    /// Read the mirrored state, if one was ever written.
    ///
    /// # Errors
    ///
    /// Returns an error if the mirror cannot be read or decoded.
    fn read_local(&self) -> Result<Option<AppState>>;

    /// Overwrite the mirror with `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mirror cannot be written.
    fn write_local(&self, state: &AppState) -> Result<()>;
}

/// Handle to a registered callback.
///
/// Cancelling stops further deliveries. Clones share the same registration;
/// wrap one in a [`SubscriptionGuard`] to cancel it on drop.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
}

impl Subscription {
    fn new(id: u64) -> Self {
        Self {
            id,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Registration id, unique within the list that issued it.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop further deliveries.
    pub fn unsubscribe(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Whether deliveries are still enabled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Owns a subscription and cancels it on drop.
#[derive(Debug)]
pub struct SubscriptionGuard(Subscription);

impl SubscriptionGuard {
    /// Take ownership of `subscription`.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        Self(subscription)
    }

    /// The guarded subscription.
    #[must_use]
    pub fn subscription(&self) -> &Subscription {
        &self.0
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.unsubscribe();
    }
}

struct Entry<K, C> {
    key: K,
    active: Arc<AtomicBool>,
    callback: C,
}

/// Registry of callbacks used by backends to fan out deliveries.
///
/// Each entry carries a key (e.g. the uid it watches). Cancelled entries are
/// pruned on the next delivery. Callbacks run outside the registry lock, in
/// registration order.
pub struct SubscriberList<K, C> {
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry<K, C>>>,
}

impl<K, C> std::fmt::Debug for SubscriberList<K, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberList")
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<K, C> Default for SubscriberList<K, C> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<K: PartialEq + Clone, C: Clone> SubscriberList<K, C> {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn add(&self, key: K, callback: C) -> Result<Subscription> {
        let subscription = Subscription::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut entries = self.lock()?;
        entries.push(Entry {
            key,
            active: Arc::clone(&subscription.active),
            callback,
        });
        Ok(subscription)
    }

    /// Active callbacks registered under `key`, pruning cancelled entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn matching(&self, key: &K) -> Result<Vec<C>> {
        let mut entries = self.lock()?;
        entries.retain(|entry| entry.active.load(Ordering::SeqCst));
        Ok(entries
            .iter()
            .filter(|entry| entry.key == *key)
            .map(|entry| entry.callback.clone())
            .collect())
    }

    /// Active callbacks regardless of key.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn all(&self) -> Result<Vec<C>> {
        let mut entries = self.lock()?;
        entries.retain(|entry| entry.active.load(Ordering::SeqCst));
        Ok(entries.iter().map(|entry| entry.callback.clone()).collect())
    }

    /// Number of registrations that have not been cancelled.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.entries.lock().map_or(0, |entries| {
            entries
                .iter()
                .filter(|entry| entry.active.load(Ordering::SeqCst))
                .count()
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Entry<K, C>>>> {
        self.entries
            .lock()
            .map_err(|_| Error::internal("subscriber list lock poisoned"))
    }
}
