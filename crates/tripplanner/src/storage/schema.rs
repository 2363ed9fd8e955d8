//! `SQLite` schema definitions for tripplanner.
//!
//! The same schema backs both the local key/value mirror and the document
//! store; each backend only touches its own table.

/// SQL statement to create the key/value table behind [`super::LocalStorage`].
pub const CREATE_LOCAL_STORAGE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS local_storage (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the trip document table behind [`super::DocumentStore`].
pub const CREATE_TRIP_DOCUMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS trip_documents (
    uid TEXT NOT NULL,
    trip_id TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (uid, trip_id)
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_LOCAL_STORAGE_TABLE,
    CREATE_TRIP_DOCUMENTS_TABLE,
    CREATE_METADATA_TABLE,
];
