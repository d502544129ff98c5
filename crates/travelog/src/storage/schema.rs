//! `SQLite` schema definitions for travelog.
//!
//! The store is a key-value table: each row holds one whole collection,
//! serialized as JSON, plus a revision counter bumped on every write.

/// SQL statement to create the collections table.
pub const CREATE_COLLECTIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS collections (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
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
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_COLLECTIONS_TABLE, CREATE_METADATA_TABLE];

/// Reads one collection and its revision.
pub const SELECT_COLLECTION: &str = r"
SELECT value, revision, updated_at FROM collections WHERE key = ?1
";

/// Reads only the revision of one collection.
pub const SELECT_REVISION: &str = r"
SELECT revision FROM collections WHERE key = ?1
";

/// Unconditional replace; bumps the revision.
pub const UPSERT_COLLECTION: &str = r"
INSERT INTO collections (key, value, revision, updated_at)
VALUES (?1, ?2, 1, ?3)
ON CONFLICT(key) DO UPDATE SET
    value = excluded.value,
    revision = collections.revision + 1,
    updated_at = excluded.updated_at
";

/// Replace with an explicit revision, used after the revision was checked.
pub const WRITE_COLLECTION_AT_REVISION: &str = r"
INSERT INTO collections (key, value, revision, updated_at)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(key) DO UPDATE SET
    value = excluded.value,
    revision = excluded.revision,
    updated_at = excluded.updated_at
";
