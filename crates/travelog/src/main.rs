//! `travelog` - CLI for the travel entry log
//!
//! This binary runs the capture pipeline against local files and manages the
//! stored entries.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use clap::Parser;

use travelog::cli::{
    list_rows, AddCommand, Cli, Command, ConfigCommand, DeleteCommand, ListCommand,
};
use travelog::local::local_devices;
use travelog::{
    delete_at, init_logging, CapturePipeline, Config, PipelineState, RecordStore, Storage,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Add(add_cmd) => handle_add(&config, add_cmd).await,
        Command::List(list_cmd) => handle_list(&config, &list_cmd),
        Command::Delete(delete_cmd) => handle_delete(&config, &delete_cmd),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn open_storage(config: &Config) -> Result<Storage, Box<dyn std::error::Error>> {
    Ok(Storage::open(config.database_path())?.with_collection_key(&config.storage.collection_key))
}

async fn handle_add(config: &Config, cmd: AddCommand) -> Result<(), Box<dyn std::error::Error>> {
    let position = cmd.position();
    if let Some(position) = position {
        if !position.is_valid() {
            return Err(format!("position ({position}) is out of range").into());
        }
    }

    let devices = local_devices(config, cmd.image, position)?;
    let store = Arc::new(open_storage(config)?);
    let mut pipeline = CapturePipeline::new(devices, store, config.into());

    match pipeline.start_capture().await {
        PipelineState::Ready => {}
        PipelineState::Idle => {
            println!("Nothing captured.");
            return Ok(());
        }
        PipelineState::Error { message, .. } => return Err(message.into()),
        other => return Err(format!("capture stopped while {other}").into()),
    }

    let receipt = pipeline.commit().await?;
    println!(
        "Saved entry at position {} ({} total): {}",
        receipt.position, receipt.total, receipt.entry.address
    );

    if let Some(notification) = receipt.notification {
        if !notification.await.unwrap_or(false) {
            eprintln!("Notification could not be delivered.");
        }
    }
    Ok(())
}

fn handle_list(config: &Config, cmd: &ListCommand) -> Result<(), Box<dyn std::error::Error>> {
    let entries = open_storage(config)?.load_all()?;
    let rows = list_rows(&entries, cmd.oldest_first);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No entries yet.");
        return Ok(());
    }
    for row in rows {
        let size = row
            .image_bytes
            .map_or_else(|| "invalid image".to_string(), |bytes| format!("{bytes} bytes"));
        println!("{:>4}  {}  ({}, {})", row.index, row.address, size, row.digest);
    }
    Ok(())
}

fn handle_delete(config: &Config, cmd: &DeleteCommand) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(config)?;
    let remaining = delete_at(&storage, cmd.index)?;
    println!("Deleted entry {}, {} remaining.", cmd.index, remaining.len());
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "collection_key": storage.collection_key(),
            "entry_count": stats.entry_count,
            "revision": stats.revision,
            "updated_at": stats.updated_at.map(|at| at.to_rfc3339()),
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("travelog status");
        println!("---------------");
        println!("Database:      {}", storage.path().display());
        println!("Collection:    {}", storage.collection_key());
        println!("Entries:       {}", stats.entry_count);
        println!("Revision:      {}", stats.revision);
        match stats.updated_at {
            Some(at) => println!("Last write:    {}", at.to_rfc3339()),
            None => println!("Last write:    never"),
        }
        println!("Size:          {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                print_config(config);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_config(config: &Config) {
    let show_ms = |ms: u64| {
        if ms == 0 {
            "unbounded".to_string()
        } else {
            format!("{ms} ms")
        }
    };

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Storage]");
    println!("  Database path:      {}", config.database_path().display());
    println!("  Collection key:     {}", config.storage.collection_key);
    println!();
    println!("[Pipeline]");
    println!("  Capture timeout:    {}", show_ms(config.pipeline.capture_timeout_ms));
    println!("  Location timeout:   {}", show_ms(config.pipeline.location_timeout_ms));
    println!("  Geocode timeout:    {}", show_ms(config.pipeline.geocode_timeout_ms));
    println!("  Commit attempts:    {}", config.pipeline.commit_attempts);
    println!();
    println!("[Permissions]");
    println!("  Camera:             {}", config.permissions.camera);
    println!("  Location:           {}", config.permissions.location);
    println!("  Notifications:      {}", config.permissions.notifications);
    println!();
    println!("[Location]");
    match config.default_position() {
        Some(position) => println!("  Default position:   {position}"),
        None => println!("  Default position:   none"),
    }
    println!();
    println!("[Geocoder]");
    println!("  Gazetteer:          {}", config.gazetteer_path().display());
    println!("  Max distance:       {} km", config.geocoder.max_distance_km);
    println!();
    println!("[Notifications]");
    println!("  Enabled:            {}", config.notifications.enabled);
    println!("  Title:              {}", config.notifications.title);
}
