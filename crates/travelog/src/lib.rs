//! `travelog` - A log of places, one photo at a time
//!
//! This library captures a photo, resolves where it was taken to a postal
//! address, and keeps the resulting travel entries in a local store that
//! can be listed and pruned by position.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod deletion;
pub mod device;
pub mod entry;
pub mod error;
pub mod geocode;
pub mod local;
pub mod logging;
pub mod pipeline;
pub mod storage;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use deletion::delete_at;
pub use device::{Capability, Devices};
pub use entry::{Coordinates, DraftEntry, EntryCollection, TravelEntry};
pub use error::{Error, ErrorKind, Result};
pub use geocode::{format_address, Place};
pub use logging::init_logging;
pub use pipeline::{CapturePipeline, CommitReceipt, PipelineOptions, PipelineState, Stage};
pub use storage::{RecordStore, Snapshot, Storage, StorageStats};
