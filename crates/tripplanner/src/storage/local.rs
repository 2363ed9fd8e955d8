//! Local key/value storage.
//!
//! The desktop analogue of browser local storage: string values under string
//! keys. The application state is mirrored as one JSON document under a
//! namespaced key.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::Result;
use crate::model::AppState;
use crate::persistence::LocalStore;

/// Key the application state is mirrored under unless configured otherwise.
pub const DEFAULT_STATE_KEY: &str = "us_travel_planner_v7";

/// `SQLite`-backed key/value store.
#[derive(Debug)]
pub struct LocalStorage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
    /// Key holding the mirrored application state.
    state_key: String,
}

impl LocalStorage {
    /// Open or create local storage at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>, state_key: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = super::open_database(&path)?;
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            state_key: state_key.into(),
        })
    }

    /// Create an in-memory instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(state_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            path: super::in_memory_path(),
            conn: Mutex::new(super::open_in_memory_database()?),
            state_key: state_key.into(),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key the application state is stored under.
    #[must_use]
    pub fn state_key(&self) -> &str {
        &self.state_key
    }

    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = super::lock(&self.conn)?;
        let value = conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = super::lock(&self.conn)?;
        conn.execute(
            r"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove `key`.
    ///
    /// Returns `true` if a value was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove_item(&self, key: &str) -> Result<bool> {
        let conn = super::lock(&self.conn)?;
        let affected = conn.execute("DELETE FROM local_storage WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }

    /// All stored keys, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = super::lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT key FROM local_storage ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

impl LocalStore for LocalStorage {
    fn read_local(&self) -> Result<Option<AppState>> {
        match self.get_item(&self.state_key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn write_local(&self, state: &AppState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        debug!(
            "Writing local state ({} trips, {} bytes) under {}",
            state.trips.len(),
            json.len(),
            self.state_key
        );
        self.set_item(&self.state_key, &json)
    }
}
