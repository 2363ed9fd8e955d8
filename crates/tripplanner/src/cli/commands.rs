//! CLI command definitions.
//!
//! Argument structs also know how to turn themselves into model values, so
//! the binary only wires them to the store.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::error::{Error, Result};
use crate::model::{
    ActivityDetails, Budget, StayDetails, TransportDetails, TransportMode, TripPatch, TripStatus,
};
use crate::store::TripStore;

/// Session commands.
#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in with the configured identity and switch to synced mode
    Login,

    /// Sign out and return to local mode
    Logout,

    /// Show the current session and persistence mode
    Status {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Trip commands.
#[derive(Debug, Subcommand)]
pub enum TripCommand {
    /// List all trips
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one trip in full
    Show {
        /// Trip id
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Create a trip
    Add {
        /// Trip title
        #[arg(long)]
        title: String,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Cover image URL
        #[arg(long)]
        cover: Option<String>,
    },

    /// Change trip fields
    Update(TripUpdateArgs),

    /// Delete a trip
    Delete {
        /// Trip id
        id: String,
    },

    /// Select the active trip, or clear the selection when no id is given
    Select {
        /// Trip id
        id: Option<String>,
    },
}

/// Fields accepted by `trip update`.
#[derive(Debug, Args)]
pub struct TripUpdateArgs {
    /// Trip id
    pub id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New first day (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// New last day (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// New status
    #[arg(long, value_enum)]
    pub status: Option<TripStatusArg>,

    /// New cover image URL
    #[arg(long)]
    pub cover: Option<String>,

    /// Vertical banner crop position (0-100)
    #[arg(long)]
    pub banner: Option<f64>,

    /// New budget total
    #[arg(long)]
    pub budget: Option<f64>,

    /// Replace the notes
    #[arg(long)]
    pub notes: Option<String>,
}

impl TripUpdateArgs {
    /// The partial update these arguments describe.
    #[must_use]
    pub fn to_patch(&self) -> TripPatch {
        TripPatch {
            title: self.title.clone(),
            start_date: self.start,
            end_date: self.end,
            status: self.status.map(Into::into),
            cover_image: self.cover.clone(),
            banner_position: self.banner,
            budget: self.budget.map(|total| Budget { total }),
            notes: self.notes.clone(),
        }
    }
}

/// Selects one day of a trip's itinerary.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct DaySelector {
    /// Day number as shown in the itinerary (first day is 1)
    #[arg(long)]
    pub day: Option<usize>,

    /// Calendar date of the day (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

impl DaySelector {
    /// Resolve to an array position in the trip's itinerary.
    ///
    /// # Errors
    ///
    /// Returns an error if the day number is zero, or the date is outside
    /// the trip.
    pub fn index(&self, store: &TripStore, trip_id: &str) -> Result<usize> {
        match (self.day, self.date) {
            (_, Some(date)) => store.day_index_for_date(trip_id, date),
            (Some(day), None) => day.checked_sub(1).ok_or_else(|| Error::InvalidValue {
                field: "day",
                message: "days are numbered from 1".to_string(),
            }),
            (None, None) => Err(Error::MissingField { field: "day" }),
        }
    }
}

/// Activity commands.
#[derive(Debug, Subcommand)]
pub enum ActivityCommand {
    /// Add an activity to a day
    Add {
        /// Trip id
        trip: String,

        #[command(flatten)]
        day: DaySelector,

        #[command(flatten)]
        fields: ActivityFields,
    },

    /// Change an activity
    Update {
        /// Trip id
        trip: String,

        /// Activity id
        id: String,

        #[command(flatten)]
        day: DaySelector,

        #[command(flatten)]
        fields: ActivityFields,
    },

    /// Remove an activity
    Delete {
        /// Trip id
        trip: String,

        /// Activity id
        id: String,

        #[command(flatten)]
        day: DaySelector,
    },
}

/// Descriptive activity fields.
#[derive(Debug, Clone, Default, Args)]
pub struct ActivityFields {
    /// Activity name
    #[arg(long)]
    pub name: Option<String>,

    /// Time of day, free-form (e.g. 09:30)
    #[arg(long)]
    pub time: Option<String>,

    /// Where it happens
    #[arg(long)]
    pub location: Option<String>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Expected cost
    #[arg(long)]
    pub cost: Option<f64>,
}

impl ActivityFields {
    /// Details of a new activity.
    ///
    /// # Errors
    ///
    /// Returns an error if no name was given.
    pub fn to_details(&self) -> Result<ActivityDetails> {
        let mut details = ActivityDetails {
            name: required(self.name.as_deref(), "name")?,
            ..ActivityDetails::default()
        };
        self.apply_to(&mut details);
        Ok(details)
    }

    /// Overwrite the fields that were given.
    pub fn apply_to(&self, details: &mut ActivityDetails) {
        if let Some(name) = &self.name {
            details.name.clone_from(name);
        }
        set_if_some(&mut details.time, &self.time);
        set_if_some(&mut details.location, &self.location);
        set_if_some(&mut details.notes, &self.notes);
        if self.cost.is_some() {
            details.cost = self.cost;
        }
    }
}

/// Lodging commands.
#[derive(Debug, Subcommand)]
pub enum StayCommand {
    /// Add a stay
    Add {
        /// Trip id
        trip: String,

        #[command(flatten)]
        fields: StayFields,
    },

    /// Change a stay
    Update {
        /// Trip id
        trip: String,

        /// Stay id
        id: String,

        #[command(flatten)]
        fields: StayFields,
    },

    /// Remove a stay
    Delete {
        /// Trip id
        trip: String,

        /// Stay id
        id: String,
    },
}

/// Descriptive stay fields.
#[derive(Debug, Clone, Default, Args)]
pub struct StayFields {
    /// Property name
    #[arg(long)]
    pub name: Option<String>,

    /// Street address
    #[arg(long)]
    pub address: Option<String>,

    /// Check-in date (YYYY-MM-DD)
    #[arg(long)]
    pub check_in: Option<NaiveDate>,

    /// Check-out date (YYYY-MM-DD)
    #[arg(long)]
    pub check_out: Option<NaiveDate>,

    /// Booking confirmation code
    #[arg(long)]
    pub confirmation: Option<String>,

    /// Total cost
    #[arg(long)]
    pub cost: Option<f64>,
}

impl StayFields {
    /// Details of a new stay.
    ///
    /// # Errors
    ///
    /// Returns an error if no name was given.
    pub fn to_details(&self) -> Result<StayDetails> {
        let mut details = StayDetails {
            name: required(self.name.as_deref(), "name")?,
            ..StayDetails::default()
        };
        self.apply_to(&mut details);
        Ok(details)
    }

    /// Overwrite the fields that were given.
    pub fn apply_to(&self, details: &mut StayDetails) {
        if let Some(name) = &self.name {
            details.name.clone_from(name);
        }
        set_if_some(&mut details.address, &self.address);
        if self.check_in.is_some() {
            details.check_in = self.check_in;
        }
        if self.check_out.is_some() {
            details.check_out = self.check_out;
        }
        set_if_some(&mut details.confirmation, &self.confirmation);
        if self.cost.is_some() {
            details.cost = self.cost;
        }
    }
}

/// Transport commands.
#[derive(Debug, Subcommand)]
pub enum TransportCommand {
    /// Add a transport leg
    Add {
        /// Trip id
        trip: String,

        #[command(flatten)]
        fields: TransportFields,
    },

    /// Change a transport leg
    Update {
        /// Trip id
        trip: String,

        /// Transport id
        id: String,

        #[command(flatten)]
        fields: TransportFields,
    },

    /// Remove a transport leg
    Delete {
        /// Trip id
        trip: String,

        /// Transport id
        id: String,
    },
}

/// Descriptive transport fields.
#[derive(Debug, Clone, Default, Args)]
pub struct TransportFields {
    /// How the leg is travelled
    #[arg(long, value_enum)]
    pub mode: Option<TransportModeArg>,

    /// Origin
    #[arg(long)]
    pub from: Option<String>,

    /// Destination
    #[arg(long)]
    pub to: Option<String>,

    /// Departure time, free-form
    #[arg(long)]
    pub departure: Option<String>,

    /// Arrival time, free-form
    #[arg(long)]
    pub arrival: Option<String>,

    /// Booking or flight number
    #[arg(long)]
    pub reference: Option<String>,

    /// Ticket cost
    #[arg(long)]
    pub cost: Option<f64>,
}

impl TransportFields {
    /// Details of a new transport leg; the mode defaults to `other`.
    #[must_use]
    pub fn to_details(&self) -> TransportDetails {
        let mut details = TransportDetails::default();
        self.apply_to(&mut details);
        details
    }

    /// Overwrite the fields that were given.
    pub fn apply_to(&self, details: &mut TransportDetails) {
        if let Some(mode) = self.mode {
            details.mode = mode.into();
        }
        set_if_some(&mut details.from, &self.from);
        set_if_some(&mut details.to, &self.to);
        set_if_some(&mut details.departure, &self.departure);
        set_if_some(&mut details.arrival, &self.arrival);
        set_if_some(&mut details.reference, &self.reference);
        if self.cost.is_some() {
            details.cost = self.cost;
        }
    }
}

/// Notes command arguments.
#[derive(Debug, Args)]
pub struct NotesCommand {
    /// Trip id
    pub trip: String,

    /// New notes text (replaces the old notes)
    pub text: String,
}

/// Packing checklist commands.
#[derive(Debug, Subcommand)]
pub enum ChecklistCommand {
    /// Add an item
    Add {
        /// Trip id
        trip: String,

        /// Item text
        text: String,
    },

    /// Mark an item as done
    Check {
        /// Trip id
        trip: String,

        /// Item id
        item: String,

        /// Mark as not done instead
        #[arg(long)]
        undo: bool,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Trip status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TripStatusArg {
    /// Still being put together
    Planning,
    /// Travel and lodging are booked
    Booked,
    /// Currently travelling
    Ongoing,
    /// The trip is over
    Completed,
    /// The trip will not happen
    Cancelled,
}

impl From<TripStatusArg> for TripStatus {
    fn from(arg: TripStatusArg) -> Self {
        match arg {
            TripStatusArg::Planning => Self::Planning,
            TripStatusArg::Booked => Self::Booked,
            TripStatusArg::Ongoing => Self::Ongoing,
            TripStatusArg::Completed => Self::Completed,
            TripStatusArg::Cancelled => Self::Cancelled,
        }
    }
}

/// Transport mode argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportModeArg {
    /// Air travel
    Flight,
    /// Rail
    Train,
    /// Coach or bus
    Bus,
    /// Car
    Car,
    /// Boat
    Ferry,
    /// Anything else
    Other,
}

impl From<TransportModeArg> for TransportMode {
    fn from(arg: TransportModeArg) -> Self {
        match arg {
            TransportModeArg::Flight => Self::Flight,
            TransportModeArg::Train => Self::Train,
            TransportModeArg::Bus => Self::Bus,
            TransportModeArg::Car => Self::Car,
            TransportModeArg::Ferry => Self::Ferry,
            TransportModeArg::Other => Self::Other,
        }
    }
}

fn required(value: Option<&str>, field: &'static str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
        _ => Err(Error::MissingField { field }),
    }
}

fn set_if_some(target: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::auth::SessionAuthProvider;
    use crate::model::NewTrip;
    use crate::persistence::{LocalStore, RemoteStore};
    use crate::storage::local::DEFAULT_STATE_KEY;
    use crate::storage::{DocumentStore, LocalStorage};
    use crate::store::{Backends, StoreSettings};

    fn store() -> TripStore {
        let local = Arc::new(LocalStorage::open_in_memory(DEFAULT_STATE_KEY).unwrap());
        let backends = Backends {
            auth: Arc::new(SessionAuthProvider::new(Arc::clone(&local), None)),
            remote: Arc::new(DocumentStore::open_in_memory().unwrap()) as Arc<dyn RemoteStore>,
            local: local as Arc<dyn LocalStore>,
        };
        let mut store = TripStore::new(backends, StoreSettings::default());
        store.start().unwrap();
        store
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_status_arg_conversion() {
        assert_eq!(TripStatus::from(TripStatusArg::Booked), TripStatus::Booked);
        assert_eq!(
            TripStatus::from(TripStatusArg::Cancelled),
            TripStatus::Cancelled
        );
    }

    #[test]
    fn test_transport_mode_arg_conversion() {
        assert_eq!(
            TransportMode::from(TransportModeArg::Ferry),
            TransportMode::Ferry
        );
        assert_eq!(
            TransportMode::from(TransportModeArg::Other),
            TransportMode::Other
        );
    }

    #[test]
    fn test_trip_update_args_to_patch() {
        let args = TripUpdateArgs {
            id: "t1".to_string(),
            title: None,
            start: None,
            end: Some(date(2026, 6, 1)),
            status: Some(TripStatusArg::Ongoing),
            cover: None,
            banner: None,
            budget: Some(1200.0),
            notes: None,
        };
        let patch = args.to_patch();
        assert!(patch.touches_dates());
        assert_eq!(patch.status, Some(TripStatus::Ongoing));
        assert_eq!(patch.budget, Some(Budget { total: 1200.0 }));
        assert!(patch.title.is_none());
    }

    #[test]
    fn test_empty_update_args_give_empty_patch() {
        let args = TripUpdateArgs {
            id: "t1".to_string(),
            title: None,
            start: None,
            end: None,
            status: None,
            cover: None,
            banner: None,
            budget: None,
            notes: None,
        };
        assert!(args.to_patch().is_empty());
    }

    #[tokio::test]
    async fn test_day_selector_index() {
        let mut store = store();
        let trip = store
            .add_trip(NewTrip::new("Lisbon", date(2026, 3, 1), date(2026, 3, 4)))
            .await
            .unwrap();

        let by_number = DaySelector {
            day: Some(2),
            date: None,
        };
        assert_eq!(by_number.index(&store, &trip.id).unwrap(), 1);

        let by_date = DaySelector {
            day: None,
            date: Some(date(2026, 3, 4)),
        };
        assert_eq!(by_date.index(&store, &trip.id).unwrap(), 3);

        let zero = DaySelector {
            day: Some(0),
            date: None,
        };
        assert!(zero.index(&store, &trip.id).unwrap_err().is_validation());
    }

    #[test]
    fn test_activity_fields_require_name() {
        let err = ActivityFields::default().to_details().unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "name" }));
    }

    #[test]
    fn test_activity_fields_apply_only_given() {
        let mut details = ActivityDetails {
            name: "Museum".to_string(),
            time: Some("10:00".to_string()),
            ..ActivityDetails::default()
        };
        let fields = ActivityFields {
            location: Some("Downtown".to_string()),
            ..ActivityFields::default()
        };
        fields.apply_to(&mut details);

        assert_eq!(details.name, "Museum");
        assert_eq!(details.time.as_deref(), Some("10:00"));
        assert_eq!(details.location.as_deref(), Some("Downtown"));
    }

    #[test]
    fn test_stay_fields_to_details() {
        let fields = StayFields {
            name: Some("Harbor Inn".to_string()),
            check_in: Some(date(2026, 3, 1)),
            cost: Some(420.0),
            ..StayFields::default()
        };
        let details = fields.to_details().unwrap();
        assert_eq!(details.name, "Harbor Inn");
        assert_eq!(details.check_in, Some(date(2026, 3, 1)));
        assert!(details.check_out.is_none());
    }

    #[test]
    fn test_transport_fields_default_mode() {
        let fields = TransportFields {
            from: Some("LIS".to_string()),
            ..TransportFields::default()
        };
        let details = fields.to_details();
        assert_eq!(details.mode, TransportMode::Other);
        assert_eq!(details.from.as_deref(), Some("LIS"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        assert!(format!("{cmd:?}").contains("Show"));
    }
}
