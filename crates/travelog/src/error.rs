//! Error types for travelog.
//!
//! This module defines all error types used throughout the travelog crate.
//! Every variant maps onto a coarse [`ErrorKind`], which is what the capture
//! pipeline records in its `Error` state and what callers usually match on.

use std::path::PathBuf;
use thiserror::Error;

use crate::device::Capability;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required capability was not granted by the permission broker.
    PermissionDenied,
    /// The camera failed for a reason other than cancellation.
    CaptureFailed,
    /// The user dismissed the camera without taking a photo.
    CaptureCancelled,
    /// The captured image could not be turned into its stored encoding.
    EncodingFailed,
    /// The location provider did not produce coordinates.
    LocationFailed,
    /// Reverse geocoding did not produce a place.
    GeocodeFailed,
    /// The record store could not be read or written.
    StorageUnavailable,
    /// A deletion position does not exist in the loaded collection.
    IndexOutOfRange,
    /// The draft has already been committed.
    AlreadyCommitted,
    /// The stored collection changed between load and save.
    StaleWrite,
    /// The operation is not valid in the pipeline's current state.
    InvalidState,
    /// Configuration could not be loaded or is invalid.
    Configuration,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PermissionDenied => "permission_denied",
            Self::CaptureFailed => "capture_failed",
            Self::CaptureCancelled => "capture_cancelled",
            Self::EncodingFailed => "encoding_failed",
            Self::LocationFailed => "location_failed",
            Self::GeocodeFailed => "geocode_failed",
            Self::StorageUnavailable => "storage_unavailable",
            Self::IndexOutOfRange => "index_out_of_range",
            Self::AlreadyCommitted => "already_committed",
            Self::StaleWrite => "stale_write",
            Self::InvalidState => "invalid_state",
            Self::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// The main error type for travelog operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
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

    /// The stored collection could not be decoded.
    #[error("stored collection '{key}' is corrupt: {source}")]
    CorruptCollection {
        /// Storage key of the collection.
        key: String,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The store is unusable for a reason not covered above.
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        /// Description of what went wrong.
        message: String,
    },

    /// The collection was rewritten by someone else since it was loaded.
    #[error("stale write: expected revision {expected}, found {found}")]
    StaleWrite {
        /// Revision the writer loaded.
        expected: i64,
        /// Revision currently stored.
        found: i64,
    },

    /// Deletion position outside the loaded collection.
    #[error("index {index} out of range for collection of {len} entries")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Length of the collection that was loaded.
        len: usize,
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

    // === Pipeline Errors ===
    /// A capability was refused by the permission broker.
    #[error("{capability} permission denied")]
    PermissionDenied {
        /// The refused capability.
        capability: Capability,
    },

    /// The user cancelled the camera.
    #[error("capture cancelled")]
    CaptureCancelled,

    /// The camera failed.
    #[error("capture failed: {message}")]
    CaptureFailed {
        /// Description of what went wrong.
        message: String,
    },

    /// The image could not be encoded.
    #[error("image encoding failed: {message}")]
    EncodingFailed {
        /// Description of what went wrong.
        message: String,
    },

    /// No coordinates could be obtained.
    #[error("location failed: {message}")]
    LocationFailed {
        /// Description of what went wrong.
        message: String,
    },

    /// Reverse geocoding failed.
    #[error("reverse geocoding failed: {message}")]
    GeocodeFailed {
        /// Description of what went wrong.
        message: String,
    },

    /// The draft was already committed.
    #[error("draft already committed")]
    AlreadyCommitted,

    /// The requested operation does not apply in the current state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The state the pipeline was in.
        state: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

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
}

/// A specialized Result type for travelog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a capture failure.
    #[must_use]
    pub fn capture_failed(message: impl Into<String>) -> Self {
        Self::CaptureFailed {
            message: message.into(),
        }
    }

    /// Create an encoding failure.
    #[must_use]
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a location failure.
    #[must_use]
    pub fn location_failed(message: impl Into<String>) -> Self {
        Self::LocationFailed {
            message: message.into(),
        }
    }

    /// Create a geocoding failure.
    #[must_use]
    pub fn geocode_failed(message: impl Into<String>) -> Self {
        Self::GeocodeFailed {
            message: message.into(),
        }
    }

    /// Create a generic storage failure.
    #[must_use]
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseOpen { .. }
            | Self::DatabaseQuery(_)
            | Self::DatabaseMigration { .. }
            | Self::CorruptCollection { .. }
            | Self::StorageUnavailable { .. }
            | Self::Io(_)
            | Self::DirectoryCreate { .. }
            | Self::Json(_) => ErrorKind::StorageUnavailable,
            Self::StaleWrite { .. } => ErrorKind::StaleWrite,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } => ErrorKind::Configuration,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::CaptureCancelled => ErrorKind::CaptureCancelled,
            Self::CaptureFailed { .. } => ErrorKind::CaptureFailed,
            Self::EncodingFailed { .. } => ErrorKind::EncodingFailed,
            Self::LocationFailed { .. } => ErrorKind::LocationFailed,
            Self::GeocodeFailed { .. } => ErrorKind::GeocodeFailed,
            Self::AlreadyCommitted => ErrorKind::AlreadyCommitted,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
        }
    }

    /// Check if this error means the store could not be read or written.
    #[must_use]
    pub fn is_storage_unavailable(&self) -> bool {
        self.kind() == ErrorKind::StorageUnavailable
    }
}
