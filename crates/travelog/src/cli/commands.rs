//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands and the rows
//! the `list` command prints.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::entry::{Coordinates, TravelEntry};

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Image file to store. Without one the capture counts as cancelled.
    pub image: Option<PathBuf>,

    /// Latitude of the photo (defaults to the configured position)
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the photo (defaults to the configured position)
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

impl AddCommand {
    /// The position given on the command line, if both halves were.
    #[must_use]
    pub fn position(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Show entries in the order they were added
    #[arg(long)]
    pub oldest_first: bool,
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Position of the entry, as shown by `list`
    pub index: usize,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// One line of `list` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRow {
    /// Position in the stored collection; what `delete` takes.
    pub index: usize,
    /// The stored address.
    pub address: String,
    /// Decoded image size, or `None` if the stored image is not valid base64.
    pub image_bytes: Option<usize>,
    /// Short content digest of the encoded image.
    pub digest: String,
}

/// Build `list` rows, newest first unless `oldest_first`.
///
/// Positions always refer to the stored order, whichever way the rows run.
#[must_use]
pub fn list_rows(entries: &[TravelEntry], oldest_first: bool) -> Vec<ListRow> {
    let mut rows: Vec<ListRow> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| ListRow {
            index,
            address: entry.address.clone(),
            image_bytes: entry.image_bytes().ok().map(|bytes| bytes.len()),
            digest: entry.image_digest().chars().take(12).collect(),
        })
        .collect();
    if !oldest_first {
        rows.reverse();
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::encode_image;

    fn entry(image: &[u8], address: &str) -> TravelEntry {
        TravelEntry::new(encode_image(image), address.to_string())
    }

    #[test]
    fn test_add_command_position() {
        let cmd = AddCommand {
            image: None,
            lat: Some(48.85),
            lon: Some(2.35),
        };
        assert_eq!(cmd.position(), Some(Coordinates::new(48.85, 2.35)));

        let cmd = AddCommand {
            image: None,
            lat: None,
            lon: None,
        };
        assert_eq!(cmd.position(), None);
    }

    #[test]
    fn test_list_rows_newest_first() {
        let entries = vec![entry(b"one", "A"), entry(b"three", "B")];
        let rows = list_rows(&entries, false);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[0].address, "B");
        assert_eq!(rows[0].image_bytes, Some(5));
        assert_eq!(rows[1].index, 0);
        assert_eq!(rows[1].address, "A");
    }

    #[test]
    fn test_list_rows_oldest_first() {
        let entries = vec![entry(b"one", "A"), entry(b"three", "B")];
        let rows = list_rows(&entries, true);
        let indices: Vec<_> = rows.iter().map(|row| row.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_list_rows_undecodable_image() {
        let entries = vec![TravelEntry::new("not base64!".to_string(), "A".to_string())];
        let rows = list_rows(&entries, false);
        assert_eq!(rows[0].image_bytes, None);
        assert_eq!(rows[0].digest.len(), 12);
    }

    #[test]
    fn test_list_rows_empty() {
        assert!(list_rows(&[], false).is_empty());
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
