//! `SQLite` storage for location records.
//!
//! One table holds both the device's own locations and the peer locations
//! received from the remote API, keyed by the owning user id.

// SQLite operations need to hold the lock for the duration of the operation.
#![allow(clippy::significant_drop_tightening)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::error::{StoreError, StoreResult};
use super::LocationStore;
use crate::location::UserLocation;

/// Where the database lives.
#[derive(Debug, Clone)]
enum Target {
    File(PathBuf),
    Memory,
}

/// `SQLite`-based location storage.
///
/// Thread-safe wrapper around an optional `SQLite` connection. The
/// connection is opened by [`connect`](LocationStore::connect) and dropped by
/// [`disconnect`](LocationStore::disconnect).
pub struct SqliteLocationStore {
    target: Target,
    conn: Mutex<Option<Connection>>,
}

impl SqliteLocationStore {
    /// Opens (creating if needed) a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or initialized.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let store = Self {
            target: Target::File(path.to_path_buf()),
            conn: Mutex::new(None),
        };
        store.connect()?;
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// Data is lost on [`disconnect`](LocationStore::disconnect).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> StoreResult<Self> {
        let store = Self {
            target: Target::Memory,
            conn: Mutex::new(None),
        };
        store.connect()?;
        Ok(store)
    }

    /// Returns whether a connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    fn initialize_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS locations (
                row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                lat REAL NOT NULL,
                lon REAL NOT NULL,
                time INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_locations_user_id ON locations(user_id);
            CREATE INDEX IF NOT EXISTS idx_locations_time ON locations(time);
            ",
        )?;
        Ok(())
    }

    /// Runs `f` against the open connection.
    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> StoreResult<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(format!("Failed to acquire database lock: {e}")))?;
        let conn = guard.as_ref().ok_or(StoreError::NotConnected)?;
        Ok(f(conn)?)
    }
}

impl LocationStore for SqliteLocationStore {
    fn connect(&self) -> StoreResult<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(format!("Failed to acquire database lock: {e}")))?;

        if guard.is_some() {
            return Ok(());
        }

        let conn = match &self.target {
            Target::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::Storage(format!("Failed to create data directory: {e}"))
                    })?;
                }
                Connection::open(path)?
            }
            Target::Memory => Connection::open_in_memory()?,
        };
        Self::initialize_schema(&conn)?;
        *guard = Some(conn);

        log::debug!("Location store connected");
        Ok(())
    }

    fn disconnect(&self) {
        if let Ok(mut guard) = self.conn.lock() {
            if guard.take().is_some() {
                log::debug!("Location store disconnected");
            }
        }
    }

    fn save(&self, location: &UserLocation) -> StoreResult<i64> {
        if location.id.is_empty() {
            return Err(StoreError::InvalidData("empty user id".to_string()));
        }

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO locations (user_id, lat, lon, time) VALUES (?1, ?2, ?3, ?4)",
                params![
                    &location.id,
                    location.latitude,
                    location.longitude,
                    location.time
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn get(&self, user_id: &str) -> StoreResult<Option<UserLocation>> {
        self.with_conn(|conn| {
            conn.query_row(
                r"
                SELECT user_id, lat, lon, time
                FROM locations
                WHERE user_id = ?1
                ORDER BY time DESC, row_id DESC
                LIMIT 1
                ",
                params![user_id],
                |row| {
                    Ok(UserLocation {
                        id: row.get(0)?,
                        latitude: row.get(1)?,
                        longitude: row.get(2)?,
                        time: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    fn get_all(&self) -> StoreResult<Vec<UserLocation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT user_id, lat, lon, time
                FROM locations
                ORDER BY row_id ASC
                ",
            )?;

            let locations = stmt
                .query_map([], |row| {
                    Ok(UserLocation {
                        id: row.get(0)?,
                        latitude: row.get(1)?,
                        longitude: row.get(2)?,
                        time: row.get(3)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(locations)
        })
    }

    fn clear(&self) -> StoreResult<usize> {
        self.with_conn(|conn| conn.execute("DELETE FROM locations", []))
    }

    fn forget_before(&self, cutoff_millis: i64) -> StoreResult<usize> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM locations WHERE time < ?1",
                params![cutoff_millis],
            )
        })
    }
}
