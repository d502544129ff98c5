//! Command-line interface for travelog.
//!
//! This module provides the CLI structure for the `travelog` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    list_rows, AddCommand, ConfigCommand, DeleteCommand, ListCommand, ListRow, StatusCommand,
};

/// travelog - Keep a log of places you have photographed
///
/// Stores each photo together with the address it was taken at.
#[derive(Debug, Parser)]
#[command(name = "travelog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Capture a photo, resolve its address and save it
    Add(AddCommand),

    /// List saved entries
    List(ListCommand),

    /// Delete an entry by position
    Delete(DeleteCommand),

    /// Show storage status
    Status(StatusCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "travelog");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["travelog", "-q", "list"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["travelog", "list"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["travelog", "-v", "list"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["travelog", "-vv", "list"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_add() {
        let cli = parse(&["travelog", "add", "photo.jpg", "--lat", "48.86", "--lon", "-2.33"]);
        let Command::Add(add) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(add.image, Some(PathBuf::from("photo.jpg")));
        assert_eq!(add.lat, Some(48.86));
        assert_eq!(add.lon, Some(-2.33));
    }

    #[test]
    fn test_parse_add_without_image() {
        let cli = parse(&["travelog", "add"]);
        assert!(matches!(cli.command, Command::Add(AddCommand { image: None, .. })));
    }

    #[test]
    fn test_parse_add_requires_both_coordinates() {
        assert!(Cli::try_parse_from(["travelog", "add", "photo.jpg", "--lat", "1.0"]).is_err());
    }

    #[test]
    fn test_parse_list() {
        let cli = parse(&["travelog", "list", "--json", "--oldest-first"]);
        assert!(matches!(
            cli.command,
            Command::List(ListCommand {
                json: true,
                oldest_first: true
            })
        ));
    }

    #[test]
    fn test_parse_delete() {
        let cli = parse(&["travelog", "delete", "3"]);
        assert!(matches!(cli.command, Command::Delete(DeleteCommand { index: 3 })));
    }

    #[test]
    fn test_parse_delete_rejects_negative() {
        assert!(Cli::try_parse_from(["travelog", "delete", "-1"]).is_err());
    }

    #[test]
    fn test_parse_status() {
        let cli = parse(&["travelog", "status"]);
        assert!(matches!(cli.command, Command::Status(_)));
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = parse(&["travelog", "config", "validate", "--file", "/tmp/c.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["travelog", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
