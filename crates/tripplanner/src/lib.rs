//! `tripplanner` - trip planning state with local and synced persistence
//!
//! This library holds the trip model (trips, daily itineraries, stays,
//! transport, budget, checklist), the [`TripStore`] that mutates it, and the
//! persistence backends it writes through: a local key/value mirror used
//! while signed out and a per-user document store used while signed in.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod itinerary;
pub mod logging;
pub mod model;
pub mod persistence;
pub mod storage;
pub mod store;

pub use auth::SessionAuthProvider;
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{AppState, NewTrip, Trip, TripPatch};
pub use persistence::{AuthProvider, LocalStore, RemoteStore, Subscription, User};
pub use storage::{DocumentStore, LocalStorage};
pub use store::{Backends, PersistenceMode, StoreSettings, TripStore};
