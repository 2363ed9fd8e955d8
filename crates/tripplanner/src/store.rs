//! The trip store.
//!
//! `TripStore` owns the in-memory [`AppState`] and the current identity, and
//! is the only place that state changes. Every mutation computes a new trip
//! value and persists the whole trip:
//!
//! - **Local** mode (no user): the trip is replaced in memory and the full
//!   state is written to the local mirror.
//! - **Synced** mode (user signed in): the trip is upserted remotely and
//!   memory follows the remote subscription, which is the single source of
//!   truth while signed in.
//!
//! Subscription callbacks never touch the store directly. They enqueue
//! [`StoreEvent`]s which [`TripStore::process_events`] applies in delivery
//! order, so the last delivered snapshot always wins.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::itinerary;
use crate::model::{
    self, Activity, ActivityDetails, AppState, Budget, ChecklistItem, NewTrip, Stay, StayDetails,
    TransportDetail, TransportDetails, Trip, TripPatch, TripStatus, DEFAULT_BANNER_POSITION,
    DEFAULT_BUDGET_TOTAL,
};
use crate::persistence::{AuthProvider, LocalStore, RemoteStore, SubscriptionGuard, User};

/// Which backend mutations are persisted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistenceMode {
    /// No user; state lives in the local mirror.
    Local,
    /// A user is signed in; state lives in their remote collection.
    Synced,
}

impl std::fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Synced => write!(f, "synced"),
        }
    }
}

/// Store behaviour that comes from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// Budget total of a new trip.
    pub default_budget: f64,
    /// Cover image used when none is given; `{title}` is replaced.
    pub cover_image_template: String,
    /// Show the preview trip when there are no trips.
    pub seed: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            default_budget: DEFAULT_BUDGET_TOTAL,
            cover_image_template: "https://picsum.photos/seed/{title}/800/400".to_string(),
            seed: true,
        }
    }
}

impl StoreSettings {
    /// Placeholder cover image for a trip titled `title`.
    #[must_use]
    pub fn cover_image_for(&self, title: &str) -> String {
        self.cover_image_template
            .replace(crate::config::TITLE_PLACEHOLDER, title)
    }

    /// State shown when there is nothing else to show.
    #[must_use]
    pub fn fallback_state(&self) -> AppState {
        if self.seed {
            AppState::seed()
        } else {
            AppState::default()
        }
    }
}

/// The persistence capabilities a store is built from.
#[derive(Clone)]
pub struct Backends {
    /// Identity provider.
    pub auth: Arc<dyn AuthProvider>,
    /// Remote document store.
    pub remote: Arc<dyn RemoteStore>,
    /// Local mirror.
    pub local: Arc<dyn LocalStore>,
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}

/// A delivery from one of the store's subscriptions.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The session changed.
    AuthChanged(Option<User>),
    /// The full trip collection of `uid`.
    TripsSnapshot {
        /// User the snapshot belongs to.
        uid: String,
        /// All of the user's trips.
        trips: Vec<Trip>,
    },
}

/// Sub-entities addressed by id inside a trip.
trait Identified {
    const KIND: &'static str;
    fn id(&self) -> &str;
}

impl Identified for Activity {
    const KIND: &'static str = "activity";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Stay {
    const KIND: &'static str = "stay";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for TransportDetail {
    const KIND: &'static str = "transport";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for ChecklistItem {
    const KIND: &'static str = "checklist item";
    fn id(&self) -> &str {
        &self.id
    }
}

fn position_of<T: Identified>(items: &[T], id: &str) -> Result<usize> {
    items
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| Error::entity_not_found(T::KIND, id))
}

fn replace_by_id<T: Identified>(items: &mut [T], item: T) -> Result<()> {
    let index = position_of(items, item.id())?;
    items[index] = item;
    Ok(())
}

fn remove_by_id<T: Identified>(items: &mut Vec<T>, id: &str) -> Result<T> {
    let index = position_of(items, id)?;
    Ok(items.remove(index))
}

fn day_activities(trip: &mut Trip, index: usize) -> Result<&mut Vec<Activity>> {
    let days = trip.daily_itinerary.len();
    trip.daily_itinerary
        .get_mut(index)
        .map(|day| &mut day.activities)
        .ok_or(Error::DayOutOfRange { index, days })
}

fn check_budget(budget: Budget) -> Result<()> {
    if budget.total.is_finite() && budget.total >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidValue {
            field: "budget.total",
            message: format!("must be a non-negative number, got {}", budget.total),
        })
    }
}

/// Client-side trip state and its persistence.
pub struct TripStore {
    state: AppState,
    user: Option<User>,
    backends: Backends,
    settings: StoreSettings,
    events_tx: mpsc::UnboundedSender<StoreEvent>,
    events_rx: mpsc::UnboundedReceiver<StoreEvent>,
    auth_subscription: Option<SubscriptionGuard>,
    trips_subscription: Option<SubscriptionGuard>,
    initialized: bool,
}

impl std::fmt::Debug for TripStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripStore")
            .field("mode", &self.mode())
            .field("trips", &self.state.trips.len())
            .field("active_trip_id", &self.state.active_trip_id)
            .finish_non_exhaustive()
    }
}

impl TripStore {
    /// Create a store showing the fallback state. Call [`TripStore::start`]
    /// to load persisted data.
    #[must_use]
    pub fn new(backends: Backends, settings: StoreSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: settings.fallback_state(),
            user: None,
            backends,
            settings,
            events_tx,
            events_rx,
            auth_subscription: None,
            trips_subscription: None,
            initialized: false,
        }
    }

    /// Subscribe to the session and load the state for it.
    ///
    /// Signed out, the local mirror is loaded if one exists. Signed in, the
    /// user's remote trips are subscribed to. Calling this twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if a subscription cannot be registered.
    pub fn start(&mut self) -> Result<()> {
        if self.auth_subscription.is_some() {
            return Ok(());
        }
        let tx = self.events_tx.clone();
        let subscription = self
            .backends
            .auth
            .subscribe_auth_state(Arc::new(move |user| {
                let _ = tx.send(StoreEvent::AuthChanged(user));
            }))?;
        self.auth_subscription = Some(SubscriptionGuard::new(subscription));
        self.process_events()
    }

    /// Apply every queued subscription delivery, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if applying an event fails; later events stay queued.
    pub fn process_events(&mut self) -> Result<()> {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event)?;
        }
        Ok(())
    }

    /// Apply a single delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if entering synced mode cannot subscribe to the
    /// user's trips.
    pub fn apply_event(&mut self, event: StoreEvent) -> Result<()> {
        match event {
            StoreEvent::AuthChanged(user) => self.handle_auth_change(user),
            StoreEvent::TripsSnapshot { uid, trips } => {
                if self.user.as_ref().is_some_and(|user| user.uid == uid) {
                    self.apply_snapshot(trips);
                } else {
                    debug!("Discarding trips snapshot for {} (no longer signed in)", uid);
                }
                Ok(())
            }
        }
    }

    /// Current application state.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Where mutations are currently persisted.
    #[must_use]
    pub fn mode(&self) -> PersistenceMode {
        if self.user.is_some() {
            PersistenceMode::Synced
        } else {
            PersistenceMode::Local
        }
    }

    /// Store settings.
    #[must_use]
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Look up a trip.
    #[must_use]
    pub fn trip(&self, id: &str) -> Option<&Trip> {
        self.state.trip(id)
    }

    /// The selected trip.
    #[must_use]
    pub fn active_trip(&self) -> Option<&Trip> {
        self.state.active_trip()
    }

    /// Array position of the day of `trip_id` falling on `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip does not exist or `date` is outside it.
    pub fn day_index_for_date(&self, trip_id: &str, date: NaiveDate) -> Result<usize> {
        let trip = self.find_trip(trip_id)?;
        itinerary::index_of_date(&trip.daily_itinerary, date).ok_or_else(|| Error::InvalidValue {
            field: "date",
            message: format!(
                "{date} is outside {} to {}",
                trip.start_date, trip.end_date
            ),
        })
    }

    // === Session ===

    /// Sign in through the identity provider.
    ///
    /// On success the store switches to synced mode and loads the user's
    /// trips. On failure the state is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the provider's error, e.g. when the sign-in is cancelled.
    pub async fn sign_in(&mut self) -> Result<User> {
        let user = match self.backends.auth.sign_in().await {
            Ok(user) => user,
            Err(e) => {
                warn!("Sign-in failed: {}", e);
                return Err(e);
            }
        };
        self.process_events()?;
        if self.user.as_ref().map(|u| u.uid.as_str()) != Some(user.uid.as_str()) {
            self.handle_auth_change(Some(user.clone()))?;
        }
        Ok(user)
    }

    /// Sign out and reset to the fallback state.
    ///
    /// Trips that only existed remotely are not carried into local mode.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the session cannot be cleared.
    pub async fn sign_out(&mut self) -> Result<()> {
        let was_signed_in = self.user.is_some();
        if let Err(e) = self.backends.auth.sign_out().await {
            warn!("Sign-out failed: {}", e);
            return Err(e);
        }
        self.process_events()?;
        if self.user.is_some() {
            self.handle_auth_change(None)?;
        } else if !was_signed_in {
            self.reset_to_fallback();
        }
        Ok(())
    }

    // === Trips ===

    /// Create a trip.
    ///
    /// The trip starts in [`TripStatus::Planning`] with the default budget,
    /// empty collections and one itinerary day per date in the range.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a required field is missing or the
    /// range is reversed, or the persistence error if the write fails.
    pub async fn add_trip(&mut self, input: NewTrip) -> Result<Trip> {
        let (title, start, end) = input.validate()?;
        let days = itinerary::day_count(start, end)?;
        let cover_image = input
            .cover_image
            .filter(|cover| !cover.trim().is_empty())
            .unwrap_or_else(|| self.settings.cover_image_for(&title));

        let trip = Trip {
            id: model::new_id(),
            title,
            start_date: start,
            end_date: end,
            status: TripStatus::Planning,
            cover_image,
            banner_position: DEFAULT_BANNER_POSITION,
            budget: Budget {
                total: self.settings.default_budget,
            },
            notes: String::new(),
            checklist: Vec::new(),
            stays: Vec::new(),
            transports: Vec::new(),
            daily_itinerary: itinerary::build(start, days),
        };

        debug!("Adding trip {} ({} days)", trip.id, days);
        self.commit(trip.clone()).await?;
        Ok(trip)
    }

    /// Merge `patch` into a trip.
    ///
    /// Moving either end of the date range rebuilds the itinerary: days whose
    /// date is still in range keep their activities, new days start empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip does not exist, the patch is invalid, or
    /// the write fails.
    pub async fn update_trip(&mut self, trip_id: &str, patch: &TripPatch) -> Result<Trip> {
        if patch.title.as_ref().is_some_and(|title| title.trim().is_empty()) {
            return Err(Error::MissingField { field: "title" });
        }
        if let Some(budget) = patch.budget {
            check_budget(budget)?;
        }

        let old = self.find_trip(trip_id)?;
        let mut trip = old.clone();
        patch.apply_to(&mut trip);

        if patch.touches_dates() {
            let days = itinerary::day_count(trip.start_date, trip.end_date)?;
            trip.daily_itinerary =
                itinerary::regenerate(&old.daily_itinerary, trip.start_date, days);
            debug!("Rebuilt itinerary of {} ({} days)", trip.id, days);
        }

        self.commit(trip.clone()).await?;
        Ok(trip)
    }

    /// Delete a trip, clearing the selection if it was active.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip does not exist or the delete fails.
    pub async fn delete_trip(&mut self, trip_id: &str) -> Result<()> {
        self.find_trip(trip_id)?;

        match self.user.clone() {
            Some(user) => {
                if let Err(e) = self.backends.remote.delete_trip(&user.uid, trip_id).await {
                    warn!("Failed to delete trip {} remotely: {}", trip_id, e);
                    return Err(e);
                }
                self.clear_active_if(trip_id);
                self.process_events()?;
            }
            None => {
                self.state.trips.retain(|trip| trip.id != trip_id);
                self.clear_active_if(trip_id);
                self.persist_local();
            }
        }
        info!("Deleted trip {}", trip_id);
        Ok(())
    }

    /// Select the trip being viewed, or clear the selection.
    ///
    /// The selection is never written remotely.
    ///
    /// # Errors
    ///
    /// Returns an error if `trip_id` names a trip that does not exist.
    pub fn set_active_trip(&mut self, trip_id: Option<&str>) -> Result<()> {
        if let Some(id) = trip_id {
            self.find_trip(id)?;
        }
        self.state.active_trip_id = trip_id.map(str::to_string);
        if self.mode() == PersistenceMode::Local {
            self.persist_local();
        }
        Ok(())
    }

    // === Activities ===

    /// Append an activity to the day at position `day_index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip does not exist, `day_index` is out of
    /// range, or the write fails.
    pub async fn add_activity(
        &mut self,
        trip_id: &str,
        day_index: usize,
        details: ActivityDetails,
    ) -> Result<Activity> {
        let mut trip = self.find_trip(trip_id)?.clone();
        let activity = Activity::new(details);
        day_activities(&mut trip, day_index)?.push(activity.clone());
        self.commit(trip).await?;
        Ok(activity)
    }

    /// Replace the activity with the same id on the day at `day_index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip, day or activity does not exist, or the
    /// write fails.
    pub async fn update_activity(
        &mut self,
        trip_id: &str,
        day_index: usize,
        activity: Activity,
    ) -> Result<()> {
        let mut trip = self.find_trip(trip_id)?.clone();
        replace_by_id(day_activities(&mut trip, day_index)?, activity)?;
        self.commit(trip).await
    }

    /// Remove an activity from the day at `day_index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip, day or activity does not exist, or the
    /// write fails.
    pub async fn delete_activity(
        &mut self,
        trip_id: &str,
        day_index: usize,
        activity_id: &str,
    ) -> Result<()> {
        let mut trip = self.find_trip(trip_id)?.clone();
        remove_by_id(day_activities(&mut trip, day_index)?, activity_id)?;
        self.commit(trip).await
    }

    // === Stays ===

    /// Add a stay.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip does not exist or the write fails.
    pub async fn add_stay(&mut self, trip_id: &str, details: StayDetails) -> Result<Stay> {
        let mut trip = self.find_trip(trip_id)?.clone();
        let stay = Stay::new(details);
        trip.stays.push(stay.clone());
        self.commit(trip).await?;
        Ok(stay)
    }

    /// Replace the stay with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip or stay does not exist, or the write fails.
    pub async fn update_stay(&mut self, trip_id: &str, stay: Stay) -> Result<()> {
        let mut trip = self.find_trip(trip_id)?.clone();
        replace_by_id(&mut trip.stays, stay)?;
        self.commit(trip).await
    }

    /// Remove a stay.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip or stay does not exist, or the write fails.
    pub async fn delete_stay(&mut self, trip_id: &str, stay_id: &str) -> Result<()> {
        let mut trip = self.find_trip(trip_id)?.clone();
        remove_by_id(&mut trip.stays, stay_id)?;
        self.commit(trip).await
    }

    // === Transports ===

    /// Add a transport leg.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip does not exist or the write fails.
    pub async fn add_transport(
        &mut self,
        trip_id: &str,
        details: TransportDetails,
    ) -> Result<TransportDetail> {
        let mut trip = self.find_trip(trip_id)?.clone();
        let transport = TransportDetail::new(details);
        trip.transports.push(transport.clone());
        self.commit(trip).await?;
        Ok(transport)
    }

    /// Replace the transport leg with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip or leg does not exist, or the write fails.
    pub async fn update_transport(
        &mut self,
        trip_id: &str,
        transport: TransportDetail,
    ) -> Result<()> {
        let mut trip = self.find_trip(trip_id)?.clone();
        replace_by_id(&mut trip.transports, transport)?;
        self.commit(trip).await
    }

    /// Remove a transport leg.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip or leg does not exist, or the write fails.
    pub async fn delete_transport(&mut self, trip_id: &str, transport_id: &str) -> Result<()> {
        let mut trip = self.find_trip(trip_id)?.clone();
        remove_by_id(&mut trip.transports, transport_id)?;
        self.commit(trip).await
    }

    // === Notes and checklist ===

    /// Replace the trip's notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip does not exist or the write fails.
    pub async fn update_notes(&mut self, trip_id: &str, notes: impl Into<String>) -> Result<()> {
        let mut trip = self.find_trip(trip_id)?.clone();
        trip.notes = notes.into();
        self.commit(trip).await
    }

    /// Set the completed flag of a checklist item.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip or item does not exist, or the write fails.
    pub async fn update_checklist(
        &mut self,
        trip_id: &str,
        item_id: &str,
        completed: bool,
    ) -> Result<()> {
        let mut trip = self.find_trip(trip_id)?.clone();
        let index = position_of(&trip.checklist, item_id)?;
        trip.checklist[index].completed = completed;
        self.commit(trip).await
    }

    /// Append an uncompleted checklist item.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is blank, the trip does not exist, or the
    /// write fails.
    pub async fn add_checklist_item(
        &mut self,
        trip_id: &str,
        text: impl Into<String>,
    ) -> Result<ChecklistItem> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::MissingField { field: "item" });
        }
        let mut trip = self.find_trip(trip_id)?.clone();
        let item = ChecklistItem::new(text);
        trip.checklist.push(item.clone());
        self.commit(trip).await?;
        Ok(item)
    }

    // === Internals ===

    fn find_trip(&self, trip_id: &str) -> Result<&Trip> {
        self.state.trip(trip_id).ok_or_else(|| {
            debug!("No trip {}", trip_id);
            Error::trip_not_found(trip_id)
        })
    }

    /// Persist a whole trip to the backend of the current mode.
    async fn commit(&mut self, trip: Trip) -> Result<()> {
        match self.user.clone() {
            Some(user) => {
                if let Err(e) = self.backends.remote.upsert_trip(&user.uid, &trip).await {
                    warn!("Failed to sync trip {}: {}", trip.id, e);
                    return Err(e);
                }
                self.process_events()
            }
            None => {
                match self.state.trips.iter().position(|t| t.id == trip.id) {
                    Some(index) => self.state.trips[index] = trip,
                    None => self.state.trips.push(trip),
                }
                self.persist_local();
                Ok(())
            }
        }
    }

    fn persist_local(&self) {
        if let Err(e) = self.backends.local.write_local(&self.state) {
            warn!("Failed to write local state: {}", e);
        }
    }

    fn clear_active_if(&mut self, trip_id: &str) {
        if self.state.active_trip_id.as_deref() == Some(trip_id) {
            self.state.active_trip_id = None;
        }
    }

    fn clear_dangling_active(&mut self) {
        if let Some(id) = self.state.active_trip_id.clone() {
            if self.state.trip(&id).is_none() {
                debug!("Clearing selection of missing trip {}", id);
                self.state.active_trip_id = None;
            }
        }
    }

    fn handle_auth_change(&mut self, user: Option<User>) -> Result<()> {
        let first = !self.initialized;
        self.initialized = true;

        match (self.user.take(), user) {
            (Some(previous), Some(next)) if previous.uid == next.uid => {
                self.user = Some(next);
                Ok(())
            }
            (_, Some(next)) => self.enter_synced(next),
            (Some(previous), None) => {
                info!("Signed out {}; switching to local mode", previous.uid);
                self.trips_subscription = None;
                self.reset_to_fallback();
                Ok(())
            }
            (None, None) => {
                if first {
                    self.load_local();
                }
                Ok(())
            }
        }
    }

    fn enter_synced(&mut self, user: User) -> Result<()> {
        info!("Switching to synced mode as {}", user.uid);
        self.trips_subscription = None;

        let tx = self.events_tx.clone();
        let uid = user.uid.clone();
        let subscription = self.backends.remote.subscribe_user_trips(
            &user.uid,
            Arc::new(move |trips| {
                let _ = tx.send(StoreEvent::TripsSnapshot {
                    uid: uid.clone(),
                    trips,
                });
            }),
        )?;
        self.trips_subscription = Some(SubscriptionGuard::new(subscription));
        self.user = Some(user);
        Ok(())
    }

    fn apply_snapshot(&mut self, trips: Vec<Trip>) {
        debug!("Applying snapshot of {} trips", trips.len());
        self.state.trips = if trips.is_empty() {
            self.settings.fallback_state().trips
        } else {
            trips
        };
        self.clear_dangling_active();
    }

    fn load_local(&mut self) {
        match self.backends.local.read_local() {
            Ok(Some(state)) => {
                info!("Loaded {} trips from local storage", state.trips.len());
                self.state = state;
                self.clear_dangling_active();
            }
            Ok(None) => debug!("No local state; using defaults"),
            Err(e) => warn!("Ignoring unreadable local state: {}", e),
        }
    }

    fn reset_to_fallback(&mut self) {
        self.state = self.settings.fallback_state();
        self.persist_local();
    }
}
