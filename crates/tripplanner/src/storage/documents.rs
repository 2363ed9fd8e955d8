//! Per-user trip document store.
//!
//! Stores one JSON document per `(uid, trip_id)` and pushes the full list of
//! a user's documents to every live subscriber of that user after each
//! write. Documents are listed in the order they were first created.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::Trip;
use crate::persistence::{RemoteStore, SubscriberList, Subscription, TripsCallback};

/// `SQLite`-backed document store with live per-user subscriptions.
#[derive(Debug)]
pub struct DocumentStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
    /// Live subscriptions keyed by uid.
    subscribers: SubscriberList<String, TripsCallback>,
}

impl DocumentStore {
    /// Open or create a document store at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = super::open_database(&path)?;
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            subscribers: SubscriberList::new(),
        })
    }

    /// Create an in-memory instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            path: super::in_memory_path(),
            conn: Mutex::new(super::open_in_memory_database()?),
            subscribers: SubscriberList::new(),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All of a user's trips, in creation order.
    ///
    /// Documents that no longer decode as a [`Trip`] are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_trips(&self, uid: &str) -> Result<Vec<Trip>> {
        let conn = super::lock(&self.conn)?;
        let mut stmt = conn.prepare(
            r"
            SELECT trip_id, body FROM trip_documents
            WHERE uid = ?1 ORDER BY rowid ASC
            ",
        )?;

        let rows = stmt
            .query_map([uid], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(trip_id, body)| match serde_json::from_str(&body) {
                Ok(trip) => Some(trip),
                Err(e) => {
                    warn!("Skipping undecodable trip document {}/{}: {}", uid, trip_id, e);
                    None
                }
            })
            .collect())
    }

    /// A single trip document.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the document does not decode.
    pub fn get_trip(&self, uid: &str, trip_id: &str) -> Result<Option<Trip>> {
        let conn = super::lock(&self.conn)?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM trip_documents WHERE uid = ?1 AND trip_id = ?2",
                params![uid, trip_id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|json| serde_json::from_str(&json).map_err(Into::into))
            .transpose()
    }

    /// Number of documents stored for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self, uid: &str) -> Result<i64> {
        let conn = super::lock(&self.conn)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM trip_documents WHERE uid = ?1",
            [uid],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of live subscriptions across all users.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.active_count()
    }

    fn write_document(&self, uid: &str, trip: &Trip) -> Result<()> {
        let body = serde_json::to_string(trip)?;
        let conn = super::lock(&self.conn)?;
        conn.execute(
            r"
            INSERT INTO trip_documents (uid, trip_id, body, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(uid, trip_id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            ",
            params![uid, trip.id, body],
        )?;
        Ok(())
    }

    fn remove_document(&self, uid: &str, trip_id: &str) -> Result<bool> {
        let conn = super::lock(&self.conn)?;
        let affected = conn.execute(
            "DELETE FROM trip_documents WHERE uid = ?1 AND trip_id = ?2",
            params![uid, trip_id],
        )?;
        Ok(affected > 0)
    }

    /// Push the user's current documents to their subscribers.
    fn notify(&self, uid: &str) -> Result<()> {
        let callbacks = self.subscribers.matching(&uid.to_string())?;
        if callbacks.is_empty() {
            return Ok(());
        }
        let trips = self.list_trips(uid)?;
        debug!(
            "Delivering {} trips to {} subscribers of {}",
            trips.len(),
            callbacks.len(),
            uid
        );
        for callback in callbacks {
            callback(trips.clone());
        }
        Ok(())
    }
}

/// Backend failures surface to callers as retryable remote errors.
fn remote_error(e: Error) -> Error {
    Error::remote(e.to_string())
}

#[async_trait::async_trait]
impl RemoteStore for DocumentStore {
    fn subscribe_user_trips(&self, uid: &str, callback: TripsCallback) -> Result<Subscription> {
        let subscription = self.subscribers.add(uid.to_string(), Arc::clone(&callback))?;
        match self.list_trips(uid) {
            Ok(trips) => {
                callback(trips);
                Ok(subscription)
            }
            Err(e) => {
                subscription.unsubscribe();
                Err(remote_error(e))
            }
        }
    }

    async fn upsert_trip(&self, uid: &str, trip: &Trip) -> Result<()> {
        self.write_document(uid, trip).map_err(remote_error)?;
        debug!("Upserted trip {} for {}", trip.id, uid);
        // The write is committed; delivery failures do not fail it.
        if let Err(e) = self.notify(uid) {
            warn!("Failed to notify subscribers of {}: {}", uid, e);
        }
        Ok(())
    }

    async fn delete_trip(&self, uid: &str, trip_id: &str) -> Result<()> {
        if self.remove_document(uid, trip_id).map_err(remote_error)? {
            debug!("Deleted trip {} for {}", trip_id, uid);
        }
        if let Err(e) = self.notify(uid) {
            warn!("Failed to notify subscribers of {}: {}", uid, e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::seed_trip;

    fn create_test_store() -> DocumentStore {
        DocumentStore::open_in_memory().expect("failed to create test store")
    }

    fn trip(id: &str, title: &str) -> Trip {
        Trip {
            id: id.to_string(),
            title: title.to_string(),
            ..seed_trip()
        }
    }

    fn recording_callback() -> (TripsCallback, Arc<Mutex<Vec<Vec<Trip>>>>) {
        let deliveries = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&deliveries);
        let callback: TripsCallback = Arc::new(move |trips| sink.lock().unwrap().push(trips));
        (callback, deliveries)
    }

    #[tokio::test]
    async fn test_upsert_and_list() {
        let store = create_test_store();
        store.upsert_trip("u1", &trip("a", "Alpha")).await.unwrap();
        store.upsert_trip("u1", &trip("b", "Beta")).await.unwrap();
        store.upsert_trip("u2", &trip("c", "Gamma")).await.unwrap();

        let trips = store.list_trips("u1").unwrap();
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].id, "a");
        assert_eq!(trips[1].id, "b");
        assert_eq!(store.count("u2").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_keeps_order() {
        let store = create_test_store();
        store.upsert_trip("u1", &trip("a", "Alpha")).await.unwrap();
        store.upsert_trip("u1", &trip("b", "Beta")).await.unwrap();
        store.upsert_trip("u1", &trip("a", "Alpha v2")).await.unwrap();

        let trips = store.list_trips("u1").unwrap();
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].title, "Alpha v2");
        assert_eq!(
            store.get_trip("u1", "a").unwrap().map(|t| t.title),
            Some("Alpha v2".to_string())
        );
    }

    #[tokio::test]
    async fn test_delete_trip() {
        let store = create_test_store();
        store.upsert_trip("u1", &trip("a", "Alpha")).await.unwrap();
        store.delete_trip("u1", "a").await.unwrap();
        assert!(store.get_trip("u1", "a").unwrap().is_none());

        // Deleting again is fine.
        store.delete_trip("u1", "a").await.unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_then_changes() {
        let store = create_test_store();
        store.upsert_trip("u1", &trip("a", "Alpha")).await.unwrap();

        let (callback, deliveries) = recording_callback();
        let _subscription = store.subscribe_user_trips("u1", callback).unwrap();
        assert_eq!(deliveries.lock().unwrap().len(), 1);
        assert_eq!(deliveries.lock().unwrap()[0].len(), 1);

        store.upsert_trip("u1", &trip("b", "Beta")).await.unwrap();
        store.delete_trip("u1", "a").await.unwrap();

        let deliveries = deliveries.lock().unwrap();
        assert_eq!(deliveries.len(), 3);
        assert_eq!(deliveries[1].len(), 2);
        assert_eq!(deliveries[2].len(), 1);
        assert_eq!(deliveries[2][0].id, "b");
    }

    #[tokio::test]
    async fn test_subscription_is_per_user() {
        let store = create_test_store();
        let (callback, deliveries) = recording_callback();
        let _subscription = store.subscribe_user_trips("u1", callback).unwrap();

        store.upsert_trip("u2", &trip("x", "Other")).await.unwrap();
        assert_eq!(deliveries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let store = create_test_store();
        let (callback, deliveries) = recording_callback();
        let subscription = store.subscribe_user_trips("u1", callback).unwrap();
        assert_eq!(store.subscriber_count(), 1);

        subscription.unsubscribe();
        store.upsert_trip("u1", &trip("a", "Alpha")).await.unwrap();
        assert_eq!(deliveries.lock().unwrap().len(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    fn temp_store() -> (DocumentStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("tripplanner-test-{}", crate::model::new_id()));
        let store = DocumentStore::open(dir.join("remote.db")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_backend_failure_is_retryable() {
        let (store, dir) = temp_store();
        store.upsert_trip("u1", &trip("a", "Alpha")).await.unwrap();

        let other = Connection::open(store.path()).unwrap();
        other.execute("DROP TABLE trip_documents", []).unwrap();
        drop(other);

        let err = store.upsert_trip("u1", &trip("b", "Beta")).await.unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
        assert!(err.is_retryable());

        let err = store.delete_trip("u1", "a").await.unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
        assert!(err.is_retryable());

        let (callback, _deliveries) = recording_callback();
        let err = store.subscribe_user_trips("u1", callback).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.subscriber_count(), 0);

        drop(store);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_committed_write_survives_failed_delivery() {
        let store = create_test_store();
        let (callback, deliveries) = recording_callback();
        let _subscription = store.subscribe_user_trips("u1", callback).unwrap();

        // Rewrite every new body as a blob so listing fails after the insert commits.
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                r"
                CREATE TRIGGER blob_body AFTER INSERT ON trip_documents
                BEGIN
                    UPDATE trip_documents SET body = x'7b7d' WHERE rowid = NEW.rowid;
                END
                ",
                [],
            )
            .unwrap();
        }

        store.upsert_trip("u1", &trip("a", "Alpha")).await.unwrap();
        assert_eq!(store.count("u1").unwrap(), 1);
        assert!(store.list_trips("u1").is_err());
        assert_eq!(deliveries.lock().unwrap().len(), 1);

        store.delete_trip("u1", "a").await.unwrap();
        assert_eq!(store.count("u1").unwrap(), 0);
    }

    #[test]
    fn test_list_skips_corrupt_documents() {
        let store = create_test_store();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO trip_documents (uid, trip_id, body) VALUES ('u1', 'bad', '{oops')",
                [],
            )
            .unwrap();
        }
        assert!(store.list_trips("u1").unwrap().is_empty());
        assert_eq!(store.count("u1").unwrap(), 1);
    }
}
