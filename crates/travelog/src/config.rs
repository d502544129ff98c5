//! Configuration management for travelog.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::entry::Coordinates;
use crate::error::{Error, Result};
use crate::storage::DEFAULT_COLLECTION_KEY;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "travelog";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "entries.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TRAVELOG_`)
/// 2. TOML config file at `~/.config/travelog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Capture pipeline configuration.
    pub pipeline: PipelineConfig,
    /// Which capabilities the local permission broker grants.
    pub permissions: PermissionsConfig,
    /// Fallback position for the local location provider.
    pub location: LocationConfig,
    /// Offline reverse geocoder configuration.
    pub geocoder: GeocoderConfig,
    /// Notification configuration.
    pub notifications: NotificationsConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/travelog/entries.db`
    pub database_path: Option<PathBuf>,
    /// Key the entry collection is stored under.
    pub collection_key: String,
}

/// Capture pipeline configuration.
///
/// Timeouts are in milliseconds; 0 disables the bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bound on waiting for the camera.
    pub capture_timeout_ms: u64,
    /// Bound on waiting for a position fix.
    pub location_timeout_ms: u64,
    /// Bound on waiting for the reverse geocoder.
    pub geocode_timeout_ms: u64,
    /// How many times a commit reloads and re-appends after losing a race.
    pub commit_attempts: u32,
}

/// Local permission grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Allow camera access.
    pub camera: bool,
    /// Allow location access.
    pub location: bool,
    /// Allow notifications.
    pub notifications: bool,
}

/// Default position used when none is given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Default latitude.
    pub default_latitude: Option<f64>,
    /// Default longitude.
    pub default_longitude: Option<f64>,
}

/// Offline reverse geocoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// JSON file listing known places.
    /// Defaults to `~/.local/share/travelog/gazetteer.json`
    pub gazetteer_path: Option<PathBuf>,
    /// Places further away than this are not considered a match.
    pub max_distance_km: f64,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Send a notification after each saved entry.
    pub enabled: bool,
    /// Notification headline.
    pub title: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            collection_key: DEFAULT_COLLECTION_KEY.to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capture_timeout_ms: 30_000,
            location_timeout_ms: 15_000,
            geocode_timeout_ms: 10_000,
            commit_attempts: 3,
        }
    }
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            camera: true,
            location: true,
            notifications: true,
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            gazetteer_path: None,
            max_distance_km: 25.0,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "Travel entry saved".to_string(),
        }
    }
}

impl PipelineConfig {
    fn bound(ms: u64) -> Option<Duration> {
        (ms > 0).then(|| Duration::from_millis(ms))
    }

    /// Camera timeout, if bounded.
    #[must_use]
    pub fn capture_timeout(&self) -> Option<Duration> {
        Self::bound(self.capture_timeout_ms)
    }

    /// Location timeout, if bounded.
    #[must_use]
    pub fn location_timeout(&self) -> Option<Duration> {
        Self::bound(self.location_timeout_ms)
    }

    /// Geocoder timeout, if bounded.
    #[must_use]
    pub fn geocode_timeout(&self) -> Option<Duration> {
        Self::bound(self.geocode_timeout_ms)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// Sources are merged in this order (later sources override earlier):
    /// defaults, the TOML file (if it exists), `TRAVELOG_` environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("TRAVELOG_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.collection_key.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "collection_key must not be empty".to_string(),
            });
        }

        if self.pipeline.commit_attempts == 0 {
            return Err(Error::ConfigValidation {
                message: "commit_attempts must be greater than 0".to_string(),
            });
        }

        if !(self.geocoder.max_distance_km > 0.0) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "max_distance_km must be positive, got {}",
                    self.geocoder.max_distance_km
                ),
            });
        }

        match (
            self.location.default_latitude,
            self.location.default_longitude,
        ) {
            (Some(latitude), Some(longitude)) => {
                if !Coordinates::new(latitude, longitude).is_valid() {
                    return Err(Error::ConfigValidation {
                        message: format!(
                            "default position ({latitude}, {longitude}) is out of range"
                        ),
                    });
                }
            }
            (None, None) => {}
            _ => {
                return Err(Error::ConfigValidation {
                    message: "default_latitude and default_longitude must be set together"
                        .to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the gazetteer path, resolving defaults if not set.
    #[must_use]
    pub fn gazetteer_path(&self) -> PathBuf {
        self.geocoder
            .gazetteer_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("gazetteer.json"))
    }

    /// Get the configured default position, if any.
    #[must_use]
    pub fn default_position(&self) -> Option<Coordinates> {
        match (
            self.location.default_latitude,
            self.location.default_longitude,
        ) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }
}
