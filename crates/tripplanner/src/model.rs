//! Core entity types for tripplanner.
//!
//! These are plain data declarations. The JSON shape (camelCase field names,
//! ISO calendar dates) is the document body written to both the local mirror
//! and the remote store, so changing a field name here is a format change.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::itinerary;

/// Budget total assigned to newly created trips.
pub const DEFAULT_BUDGET_TOTAL: f64 = 2000.0;

/// Banner offset used when a trip does not carry one.
pub const DEFAULT_BANNER_POSITION: f64 = 50.0;

/// Id of the trip shown when there is nothing else to show.
pub const SEED_TRIP_ID: &str = "preview-trip";

/// Generate a fresh identifier for a trip or sub-entity.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lifecycle state of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    /// Still being put together.
    #[default]
    Planning,
    /// Travel and lodging are booked.
    Booked,
    /// Currently travelling.
    Ongoing,
    /// The trip is over.
    Completed,
    /// The trip will not happen.
    Cancelled,
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Booked => write!(f, "booked"),
            Self::Ongoing => write!(f, "ongoing"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Trip budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Total amount available for the trip.
    pub total: f64,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            total: DEFAULT_BUDGET_TOTAL,
        }
    }
}

/// Descriptive part of an activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDetails {
    /// What is planned.
    pub name: String,
    /// Free-form time of day, e.g. `"09:30"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Where it happens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Extra notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Expected cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// A scheduled activity within one itinerary day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique within its day.
    pub id: String,
    /// Descriptive fields.
    #[serde(flatten)]
    pub details: ActivityDetails,
}

impl Activity {
    /// Create an activity with a fresh id.
    #[must_use]
    pub fn new(details: ActivityDetails) -> Self {
        Self {
            id: new_id(),
            details,
        }
    }
}

/// Descriptive part of a stay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayDetails {
    /// Name of the hotel, rental, etc.
    pub name: String,
    /// Street address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Check-in date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<NaiveDate>,
    /// Check-out date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<NaiveDate>,
    /// Booking confirmation code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<String>,
    /// Total cost of the stay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// Lodging booked for the trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stay {
    /// Unique within the trip's stays.
    pub id: String,
    /// Descriptive fields.
    #[serde(flatten)]
    pub details: StayDetails,
}

impl Stay {
    /// Create a stay with a fresh id.
    #[must_use]
    pub fn new(details: StayDetails) -> Self {
        Self {
            id: new_id(),
            details,
        }
    }
}

/// How a leg of the journey is travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Air travel.
    Flight,
    /// Rail.
    Train,
    /// Coach or bus.
    Bus,
    /// Rental or own car.
    Car,
    /// Boat.
    Ferry,
    /// Anything else.
    #[default]
    Other,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flight => write!(f, "flight"),
            Self::Train => write!(f, "train"),
            Self::Bus => write!(f, "bus"),
            Self::Car => write!(f, "car"),
            Self::Ferry => write!(f, "ferry"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Descriptive part of a transport leg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportDetails {
    /// Mode of travel.
    #[serde(default)]
    pub mode: TransportMode,
    /// Departure place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Arrival place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Departure time, free-form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<String>,
    /// Arrival time, free-form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<String>,
    /// Flight number, booking reference, etc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Ticket cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// A transport leg of the trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportDetail {
    /// Unique within the trip's transports.
    pub id: String,
    /// Descriptive fields.
    #[serde(flatten)]
    pub details: TransportDetails,
}

impl TransportDetail {
    /// Create a transport leg with a fresh id.
    #[must_use]
    pub fn new(details: TransportDetails) -> Self {
        Self {
            id: new_id(),
            details,
        }
    }
}

/// One entry of the packing/to-do checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Unique within the trip.
    pub id: String,
    /// Item text.
    pub item: String,
    /// Whether the item is done.
    pub completed: bool,
}

impl ChecklistItem {
    /// Create an uncompleted item with a fresh id.
    #[must_use]
    pub fn new(item: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            item: item.into(),
            completed: false,
        }
    }
}

/// One calendar day of a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyItinerary {
    /// 1-based position within the trip.
    pub day: u32,
    /// Always `start_date + day - 1`.
    pub date: NaiveDate,
    /// Activities in display order.
    #[serde(default)]
    pub activities: Vec<Activity>,
}

fn default_banner_position() -> f64 {
    DEFAULT_BANNER_POSITION
}

/// A trip and everything planned for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// Unique across the application state.
    pub id: String,
    /// Display title.
    pub title: String,
    /// First day (inclusive).
    pub start_date: NaiveDate,
    /// Last day (inclusive).
    pub end_date: NaiveDate,
    /// Lifecycle state.
    #[serde(default)]
    pub status: TripStatus,
    /// Cover image URL.
    #[serde(default)]
    pub cover_image: String,
    /// Vertical offset of the cover image in the banner.
    #[serde(default = "default_banner_position")]
    pub banner_position: f64,
    /// Trip budget.
    #[serde(default)]
    pub budget: Budget,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// Checklist in display order.
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    /// Lodging.
    #[serde(default)]
    pub stays: Vec<Stay>,
    /// Transport legs.
    #[serde(default)]
    pub transports: Vec<TransportDetail>,
    /// One entry per day of `[start_date, end_date]`.
    #[serde(default)]
    pub daily_itinerary: Vec<DailyItinerary>,
}

impl Trip {
    /// Signed number of days from `today` until the trip starts.
    ///
    /// Zero or negative once the trip has started.
    #[must_use]
    pub fn days_until_start(&self, today: NaiveDate) -> i64 {
        (self.start_date - today).num_days()
    }

    /// Total number of activities across all days.
    #[must_use]
    pub fn activity_count(&self) -> usize {
        self.daily_itinerary
            .iter()
            .map(|day| day.activities.len())
            .sum()
    }

    /// Number of completed checklist items.
    #[must_use]
    pub fn completed_checklist_count(&self) -> usize {
        self.checklist.iter().filter(|item| item.completed).count()
    }
}

/// The whole application state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// All trips; ids are unique.
    pub trips: Vec<Trip>,
    /// The trip currently being viewed, if any.
    #[serde(default)]
    pub active_trip_id: Option<String>,
}

impl AppState {
    /// The default state: the single preview trip and no selection.
    #[must_use]
    pub fn seed() -> Self {
        Self {
            trips: vec![seed_trip()],
            active_trip_id: None,
        }
    }

    /// Find a trip by id.
    #[must_use]
    pub fn trip(&self, id: &str) -> Option<&Trip> {
        self.trips.iter().find(|trip| trip.id == id)
    }

    /// The active trip, if one is selected and still exists.
    #[must_use]
    pub fn active_trip(&self) -> Option<&Trip> {
        self.active_trip_id.as_deref().and_then(|id| self.trip(id))
    }
}

/// The preview trip used to populate an empty state.
#[must_use]
pub fn seed_trip() -> Trip {
    let start = NaiveDate::from_ymd_opt(2026, 5, 19).unwrap_or_default();
    let end = NaiveDate::from_ymd_opt(2026, 5, 26).unwrap_or_default();
    Trip {
        id: SEED_TRIP_ID.to_string(),
        title: "US Trip 2026".to_string(),
        start_date: start,
        end_date: end,
        status: TripStatus::Planning,
        cover_image: "https://images.unsplash.com/photo-1508433957232-31d15fe4a3ba?auto=format&fit=crop&w=1200&q=80".to_string(),
        banner_position: DEFAULT_BANNER_POSITION,
        budget: Budget { total: 5000.0 },
        notes: "Exciting US road trip!".to_string(),
        checklist: Vec::new(),
        stays: Vec::new(),
        transports: Vec::new(),
        daily_itinerary: itinerary::build(start, 8),
    }
}

/// Input for creating a trip.
///
/// Dates are optional so that a half-filled form can be represented; both
/// are required by [`NewTrip::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTrip {
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// First day.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Cover image URL; a placeholder is derived from the title when absent.
    #[serde(default)]
    pub cover_image: Option<String>,
}

impl NewTrip {
    /// Input with all required fields set.
    #[must_use]
    pub fn new(title: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            start_date: Some(start_date),
            end_date: Some(end_date),
            cover_image: None,
        }
    }

    /// Set the cover image.
    #[must_use]
    pub fn with_cover_image(mut self, cover_image: impl Into<String>) -> Self {
        self.cover_image = Some(cover_image.into());
        self
    }

    /// Check that title and both dates are present.
    ///
    /// Returns the trimmed title and the date range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] naming the first missing field.
    pub fn validate(&self) -> Result<(String, NaiveDate, NaiveDate)> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::MissingField { field: "title" });
        }
        let start = self
            .start_date
            .ok_or(Error::MissingField { field: "startDate" })?;
        let end = self
            .end_date
            .ok_or(Error::MissingField { field: "endDate" })?;
        Ok((title.to_string(), start, end))
    }
}

/// Partial update of a trip's own fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TripPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New first day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// New last day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// New lifecycle state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TripStatus>,
    /// New cover image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// New banner offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_position: Option<f64>,
    /// New budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    /// New notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TripPatch {
    /// Whether the patch moves either end of the date range.
    #[must_use]
    pub fn touches_dates(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the set fields into `trip`. The itinerary is left alone.
    pub fn apply_to(&self, trip: &mut Trip) {
        if let Some(title) = &self.title {
            trip.title.clone_from(title);
        }
        if let Some(start) = self.start_date {
            trip.start_date = start;
        }
        if let Some(end) = self.end_date {
            trip.end_date = end;
        }
        if let Some(status) = self.status {
            trip.status = status;
        }
        if let Some(cover) = &self.cover_image {
            trip.cover_image.clone_from(cover);
        }
        if let Some(position) = self.banner_position {
            trip.banner_position = position;
        }
        if let Some(budget) = self.budget {
            trip.budget = budget;
        }
        if let Some(notes) = &self.notes {
            trip.notes.clone_from(notes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trip_status_display() {
        assert_eq!(TripStatus::Planning.to_string(), "planning");
        assert_eq!(TripStatus::Cancelled.to_string(), "cancelled");
        assert_eq!(TripStatus::default(), TripStatus::Planning);
    }

    #[test]
    fn test_transport_mode_display_matches_json() {
        for mode in [TransportMode::Flight, TransportMode::Ferry, TransportMode::Other] {
            let json = serde_json::to_value(mode).unwrap();
            assert_eq!(json, mode.to_string());
        }
    }

    #[test]
    fn test_budget_default() {
        assert!((Budget::default().total - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_new_ids_are_unique() {
        let a = ChecklistItem::new("Passport");
        let b = ChecklistItem::new("Passport");
        assert_ne!(a.id, b.id);
        assert!(!a.completed);
    }

    #[test]
    fn test_seed_state() {
        let state = AppState::seed();
        assert_eq!(state.trips.len(), 1);
        assert!(state.active_trip_id.is_none());

        let trip = &state.trips[0];
        assert_eq!(trip.id, SEED_TRIP_ID);
        assert_eq!(trip.daily_itinerary.len(), 8);
        assert_eq!(trip.daily_itinerary[0].date, date(2026, 5, 19));
        assert_eq!(trip.daily_itinerary[7].date, date(2026, 5, 26));
        assert!((trip.budget.total - 5000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_trip_json_uses_camel_case() {
        let json = serde_json::to_value(seed_trip()).unwrap();
        assert_eq!(json["startDate"], "2026-05-19");
        assert_eq!(json["endDate"], "2026-05-26");
        assert_eq!(json["status"], "planning");
        assert!(json["dailyItinerary"].is_array());
        assert!(json.get("start_date").is_none());
    }

    #[test]
    fn test_activity_details_are_flattened() {
        let activity = Activity {
            id: "a1".to_string(),
            details: ActivityDetails {
                name: "Museum".to_string(),
                time: Some("10:00".to_string()),
                ..ActivityDetails::default()
            },
        };
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["id"], "a1");
        assert_eq!(json["name"], "Museum");
        assert_eq!(json["time"], "10:00");
        assert!(json.get("location").is_none());
    }

    #[test]
    fn test_trip_deserializes_with_missing_collections() {
        let json = r#"{
            "id": "t1",
            "title": "Weekend",
            "startDate": "2026-06-01",
            "endDate": "2026-06-02"
        }"#;
        let trip: Trip = serde_json::from_str(json).unwrap();
        assert!(trip.checklist.is_empty());
        assert!((trip.banner_position - DEFAULT_BANNER_POSITION).abs() < f64::EPSILON);
        assert_eq!(trip.status, TripStatus::Planning);
    }

    #[test]
    fn test_trip_rejects_invalid_date() {
        let json = r#"{"id": "t1", "title": "x", "startDate": "2026-13-40", "endDate": "2026-06-02"}"#;
        assert!(serde_json::from_str::<Trip>(json).is_err());
    }

    #[test]
    fn test_new_trip_rejects_unknown_fields() {
        let json = r#"{"title": "x", "startDate": "2026-06-01", "endDate": "2026-06-02", "color": "red"}"#;
        assert!(serde_json::from_str::<NewTrip>(json).is_err());
    }

    #[test]
    fn test_new_trip_validate() {
        let input = NewTrip::new("  Japan  ", date(2026, 4, 1), date(2026, 4, 10));
        let (title, start, end) = input.validate().unwrap();
        assert_eq!(title, "Japan");
        assert_eq!(start, date(2026, 4, 1));
        assert_eq!(end, date(2026, 4, 10));
    }

    #[test]
    fn test_new_trip_validate_missing_fields() {
        let err = NewTrip::default().validate().unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "title" }));

        let input = NewTrip {
            title: "Japan".to_string(),
            start_date: Some(date(2026, 4, 1)),
            ..NewTrip::default()
        };
        let err = input.validate().unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "endDate" }));
    }

    #[test]
    fn test_patch_apply_leaves_itinerary() {
        let mut trip = seed_trip();
        let before = trip.daily_itinerary.clone();
        let patch = TripPatch {
            title: Some("Renamed".to_string()),
            status: Some(TripStatus::Booked),
            ..TripPatch::default()
        };
        assert!(!patch.touches_dates());
        patch.apply_to(&mut trip);
        assert_eq!(trip.title, "Renamed");
        assert_eq!(trip.status, TripStatus::Booked);
        assert_eq!(trip.daily_itinerary, before);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(TripPatch::default().is_empty());
        let patch = TripPatch {
            notes: Some(String::new()),
            ..TripPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_days_until_start() {
        let trip = seed_trip();
        assert_eq!(trip.days_until_start(date(2026, 5, 9)), 10);
        assert_eq!(trip.days_until_start(date(2026, 5, 19)), 0);
        assert_eq!(trip.days_until_start(date(2026, 5, 20)), -1);
    }

    #[test]
    fn test_active_trip_lookup() {
        let mut state = AppState::seed();
        assert!(state.active_trip().is_none());
        state.active_trip_id = Some(SEED_TRIP_ID.to_string());
        assert_eq!(state.active_trip().map(|t| t.id.as_str()), Some(SEED_TRIP_ID));
        state.active_trip_id = Some("gone".to_string());
        assert!(state.active_trip().is_none());
    }
}
