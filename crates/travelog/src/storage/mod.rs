//! Storage layer for travelog.
//!
//! The record store keeps the whole entry collection under one key and only
//! ever replaces it wholesale. Appends and deletes are expressed by callers
//! as load, transform in memory, save. Each stored collection carries a
//! revision so a caller can ask for its save to be rejected if somebody else
//! wrote in between.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::entry::{EntryCollection, TravelEntry};
use crate::error::{Error, Result};

/// Storage key used when none is configured.
pub const DEFAULT_COLLECTION_KEY: &str = "travelEntries";

/// A collection as read by one load, with the revision it was read at.
///
/// Revision 0 means the collection has never been written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// The entries, oldest first.
    pub entries: EntryCollection,
    /// Revision of the stored collection when it was read.
    pub revision: i64,
}

/// The record store contract.
///
/// `save_all` is the unconditional write primitive. `save_snapshot` is the
/// same write guarded by a revision check.
pub trait RecordStore: Send + Sync {
    /// Load the current collection and its revision.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read. A missing
    /// collection is not an error; it loads as empty at revision 0.
    fn load_snapshot(&self) -> Result<Snapshot>;

    /// Replace the collection if it is still at `expected_revision`.
    ///
    /// Returns the new revision.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleWrite`] if the stored revision moved, or a
    /// storage error if the write fails. The stored collection is unchanged
    /// in both cases.
    fn save_snapshot(&self, entries: &[TravelEntry], expected_revision: i64) -> Result<i64>;

    /// Replace the collection unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the stored collection is then
    /// unchanged.
    fn save_all(&self, entries: &[TravelEntry]) -> Result<()>;

    /// Load the current collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn load_all(&self) -> Result<EntryCollection> {
        Ok(self.load_snapshot()?.entries)
    }
}

/// `SQLite`-backed record store.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Key the collection is stored under.
    collection_key: String,
    /// Database connection.
    conn: Mutex<Connection>,
}

/// Summary numbers for the `status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of stored entries.
    pub entry_count: usize,
    /// Current revision of the collection.
    pub revision: i64,
    /// When the collection was last written.
    pub updated_at: Option<DateTime<Utc>>,
    /// Size of the database file in bytes (0 for in-memory databases).
    pub db_size_bytes: u64,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            collection_key: DEFAULT_COLLECTION_KEY.to_string(),
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            collection_key: DEFAULT_COLLECTION_KEY.to_string(),
            conn: Mutex::new(conn),
        })
    }

    /// Store the collection under a different key.
    #[must_use]
    pub fn with_collection_key(mut self, key: impl Into<String>) -> Self {
        self.collection_key = key.into();
        self
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the key the collection is stored under.
    #[must_use]
    pub fn collection_key(&self) -> &str {
        &self.collection_key
    }

    /// Get store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let row = self.read_row()?;
        let (entry_count, revision, updated_at) = match row {
            Some(row) => {
                let entries = self.decode(&row.value)?;
                (entries.len(), row.revision, parse_timestamp(&row.updated_at))
            }
            None => (0, 0, None),
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            entry_count,
            revision,
            updated_at,
            db_size_bytes,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::storage_unavailable("database connection lock poisoned"))
    }

    fn read_row(&self) -> Result<Option<StoredRow>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(schema::SELECT_COLLECTION, [&self.collection_key], |row| {
                Ok(StoredRow {
                    value: row.get(0)?,
                    revision: row.get(1)?,
                    updated_at: row.get(2)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    fn decode(&self, value: &str) -> Result<EntryCollection> {
        serde_json::from_str(value).map_err(|source| {
            warn!("Stored collection '{}' failed to decode", self.collection_key);
            Error::CorruptCollection {
                key: self.collection_key.clone(),
                source,
            }
        })
    }

    /// The stored JSON text, exactly as written.
    #[cfg(test)]
    fn raw_value(&self) -> Option<String> {
        self.read_row().unwrap().map(|row| row.value)
    }
}

impl RecordStore for Storage {
    fn load_snapshot(&self) -> Result<Snapshot> {
        let Some(row) = self.read_row()? else {
            debug!("No collection stored under '{}'", self.collection_key);
            return Ok(Snapshot::default());
        };

        let entries = self.decode(&row.value)?;
        debug!(
            "Loaded {} entries at revision {}",
            entries.len(),
            row.revision
        );
        Ok(Snapshot {
            entries,
            revision: row.revision,
        })
    }

    fn save_snapshot(&self, entries: &[TravelEntry], expected_revision: i64) -> Result<i64> {
        let value = serde_json::to_string(entries)?;
        let now = Utc::now().to_rfc3339();

        let mut conn = self.lock()?;
        // IMMEDIATE takes the write lock before the revision is read, so a
        // second process cannot slip in between check and write.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let found: i64 = tx
            .query_row(schema::SELECT_REVISION, [&self.collection_key], |row| {
                row.get(0)
            })
            .optional()?
            .unwrap_or(0);

        if found != expected_revision {
            warn!(
                "Rejected write to '{}': expected revision {}, found {}",
                self.collection_key, expected_revision, found
            );
            return Err(Error::StaleWrite {
                expected: expected_revision,
                found,
            });
        }

        let next = found + 1;
        tx.execute(
            schema::WRITE_COLLECTION_AT_REVISION,
            params![self.collection_key, value, next, now],
        )?;
        tx.commit()?;

        debug!("Saved {} entries at revision {}", entries.len(), next);
        Ok(next)
    }

    fn save_all(&self, entries: &[TravelEntry]) -> Result<()> {
        let value = serde_json::to_string(entries)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.lock()?;
        conn.execute(
            schema::UPSERT_COLLECTION,
            params![self.collection_key, value, now],
        )?;

        debug!("Saved {} entries", entries.len());
        Ok(())
    }
}

/// One row of the collections table.
struct StoredRow {
    value: String,
    revision: i64,
    updated_at: String,
}

/// Parse `updated_at`, which is RFC 3339 when we wrote it and `SQLite`'s
/// `datetime('now')` format for rows created by the table default.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
