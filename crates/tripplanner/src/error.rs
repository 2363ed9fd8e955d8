//! Error types for tripplanner.
//!
//! This module defines all error types used throughout the tripplanner crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// The main error type for tripplanner operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create a database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Validation Errors ===
    /// A required input field was empty.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The trip ends before it starts.
    #[error("invalid date range: end date {end} is before start date {start}")]
    InvalidDateRange {
        /// Requested start date.
        start: NaiveDate,
        /// Requested end date.
        end: NaiveDate,
    },

    /// An input field holds a value the model does not allow.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    // === Lookup Errors ===
    /// No trip with the given id exists.
    #[error("trip not found: {id}")]
    TripNotFound {
        /// The requested trip id.
        id: String,
    },

    /// No sub-entity (activity, stay, transport, checklist item) with the given id exists.
    #[error("{kind} not found: {id}")]
    EntityNotFound {
        /// Kind of entity that was looked up.
        kind: &'static str,
        /// The requested id.
        id: String,
    },

    /// A day index outside the trip's itinerary.
    #[error("day index {index} is out of range (itinerary has {days} days)")]
    DayOutOfRange {
        /// The requested position.
        index: usize,
        /// Number of days in the itinerary.
        days: usize,
    },

    // === Identity Errors ===
    /// Sign-in did not produce a user.
    #[error("sign-in failed: {0}")]
    SignIn(String),

    /// Sign-out failed.
    #[error("sign-out failed: {0}")]
    SignOut(String),

    // === Remote Errors ===
    /// A write to the remote document store failed.
    #[error("remote store error: {0}")]
    Remote(String),

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for tripplanner operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new remote store error.
    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    /// Create a new sign-in error.
    #[must_use]
    pub fn sign_in(message: impl Into<String>) -> Self {
        Self::SignIn(message.into())
    }

    /// Create a trip lookup error.
    #[must_use]
    pub fn trip_not_found(id: impl Into<String>) -> Self {
        Self::TripNotFound { id: id.into() }
    }

    /// Create a sub-entity lookup error.
    #[must_use]
    pub fn entity_not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::EntityNotFound {
            kind,
            id: id.into(),
        }
    }

    /// Check if this error is a failed lookup.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TripNotFound { .. } | Self::EntityNotFound { .. } | Self::DayOutOfRange { .. }
        )
    }

    /// Check if this error was caused by invalid input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. } | Self::InvalidDateRange { .. } | Self::InvalidValue { .. }
        )
    }

    /// Check if retrying the same operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SignIn(_) | Self::SignOut(_) | Self::Remote(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::trip_not_found("abc");
        assert_eq!(err.to_string(), "trip not found: abc");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_entity_not_found_display() {
        let err = Error::entity_not_found("activity", "a-1");
        assert_eq!(err.to_string(), "activity not found: a-1");
    }

    #[test]
    fn test_invalid_date_range_display() {
        let err = Error::InvalidDateRange {
            start: NaiveDate::from_ymd_opt(2026, 5, 26).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 5, 19).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2026-05-19"));
        assert!(msg.contains("2026-05-26"));
    }

    #[test]
    fn test_day_out_of_range_display() {
        let err = Error::DayOutOfRange { index: 9, days: 8 };
        let msg = err.to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains("8 days"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::trip_not_found("x").is_not_found());
        assert!(Error::entity_not_found("stay", "x").is_not_found());
        assert!(Error::DayOutOfRange { index: 1, days: 1 }.is_not_found());
        assert!(!Error::internal("x").is_not_found());
    }

    #[test]
    fn test_is_validation() {
        assert!(Error::MissingField { field: "title" }.is_validation());
        assert!(!Error::trip_not_found("x").is_validation());
    }

    #[test]
    fn test_invalid_value_display() {
        let err = Error::InvalidValue {
            field: "budget.total",
            message: "must not be negative".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for budget.total: must not be negative"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::remote("network down").is_retryable());
        assert!(Error::sign_in("popup closed").is_retryable());
        assert!(!Error::MissingField { field: "title" }.is_retryable());
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "empty state key".to_string(),
        };
        assert!(err.to_string().contains("empty state key"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
