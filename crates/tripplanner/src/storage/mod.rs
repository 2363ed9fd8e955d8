//! Storage layer for tripplanner.
//!
//! This module provides the `SQLite`-backed persistence backends: the local
//! key/value mirror ([`LocalStorage`]) and the per-user document store
//! ([`DocumentStore`]). Both share one schema and migration runner.

pub mod documents;
pub mod local;
pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use documents::DocumentStore;
pub use local::LocalStorage;

/// Marker path used for in-memory databases.
const IN_MEMORY: &str = ":memory:";

/// Open or create a database at the given path.
///
/// Creates the parent directories and database file if they don't exist,
/// and brings the schema up to date.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or schema initialization fails.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    debug!("Opening database at {}", path.display());
    let conn = Connection::open(path).map_err(|source| Error::DatabaseOpen {
        path: path.to_path_buf(),
        source,
    })?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
    migrations::initialize_schema(&conn)?;

    info!("Database opened successfully at {}", path.display());
    Ok(conn)
}

/// Create an in-memory database for testing.
///
/// # Errors
///
/// Returns an error if the in-memory database cannot be created.
pub fn open_in_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
        path: PathBuf::from(IN_MEMORY),
        source,
    })?;
    migrations::initialize_schema(&conn)?;
    Ok(conn)
}

/// Path reported by backends opened in memory.
#[must_use]
pub fn in_memory_path() -> PathBuf {
    PathBuf::from(IN_MEMORY)
}

/// Lock a shared connection.
pub(crate) fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| Error::internal("database connection lock poisoned"))
}
