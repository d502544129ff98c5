//! Local collaborators backed by files and configuration.
//!
//! These stand in for device services when travelog runs from the command
//! line: the "camera" hands over an existing image file, the position comes
//! from arguments or configuration, and reverse geocoding is a nearest-place
//! lookup in an offline gazetteer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Config, PermissionsConfig};
use crate::device::{
    Camera, Capability, CaptureOutcome, Devices, LocationProvider, Notification, Notifier,
    PermissionBroker, ReverseGeocoder,
};
use crate::entry::{Coordinates, ImageHandle};
use crate::error::{Error, Result};
use crate::geocode::Place;

/// Grants exactly what the configuration allows.
#[derive(Debug, Clone)]
pub struct ConfiguredPermissions {
    grants: PermissionsConfig,
}

impl ConfiguredPermissions {
    /// Create a broker from permission settings.
    #[must_use]
    pub fn new(grants: PermissionsConfig) -> Self {
        Self { grants }
    }
}

#[async_trait::async_trait]
impl PermissionBroker for ConfiguredPermissions {
    async fn request(&self, capability: Capability) -> bool {
        let granted = match capability {
            Capability::Camera => self.grants.camera,
            Capability::Location => self.grants.location,
            Capability::Notifications => self.grants.notifications,
        };
        if !granted {
            debug!("{} permission refused by configuration", capability);
        }
        granted
    }
}

/// A camera that "captures" an existing image file.
///
/// With no file the capture counts as cancelled.
#[derive(Debug, Clone)]
pub struct FileCamera {
    path: Option<PathBuf>,
}

impl FileCamera {
    /// Create a camera for the given image file.
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl Camera for FileCamera {
    async fn capture(&self) -> Result<CaptureOutcome> {
        let Some(path) = &self.path else {
            return Ok(CaptureOutcome::Cancelled);
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|err| Error::capture_failed(format!("{}: {err}", path.display())))?;
        if !metadata.is_file() {
            return Err(Error::capture_failed(format!(
                "{} is not a file",
                path.display()
            )));
        }

        debug!("Captured {}", path.display());
        Ok(CaptureOutcome::Captured(ImageHandle::File(path.clone())))
    }
}

/// Reports a position known up front.
#[derive(Debug, Clone)]
pub struct FixedLocation {
    position: Option<Coordinates>,
}

impl FixedLocation {
    /// Create a provider that always reports `position`, or fails if `None`.
    #[must_use]
    pub fn new(position: Option<Coordinates>) -> Self {
        Self { position }
    }
}

#[async_trait::async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates> {
        self.position.ok_or_else(|| {
            Error::location_failed("no position given and no default position configured")
        })
    }
}

/// One known place in the offline gazetteer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazetteerPlace {
    /// Where the place is.
    #[serde(flatten)]
    pub coordinates: Coordinates,
    /// How it is described.
    #[serde(flatten)]
    pub place: Place,
}

/// Nearest-place reverse geocoder over a fixed list of places.
#[derive(Debug, Clone)]
pub struct GazetteerGeocoder {
    places: Vec<GazetteerPlace>,
    max_distance_km: f64,
}

impl GazetteerGeocoder {
    /// Create a geocoder over `places`.
    #[must_use]
    pub fn new(places: Vec<GazetteerPlace>, max_distance_km: f64) -> Self {
        Self {
            places,
            max_distance_km,
        }
    }

    /// Load the gazetteer from a JSON file.
    ///
    /// A missing file yields an empty gazetteer, so every lookup finds
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GeocodeFailed`] naming the file if it exists but
    /// cannot be read or parsed.
    pub fn load(path: &Path, max_distance_km: f64) -> Result<Self> {
        if !path.exists() {
            warn!("No gazetteer at {}, reverse geocoding will find nothing", path.display());
            return Ok(Self::new(Vec::new(), max_distance_km));
        }

        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::geocode_failed(format!("cannot read gazetteer {}: {err}", path.display()))
        })?;
        let places: Vec<GazetteerPlace> = serde_json::from_str(&text).map_err(|err| {
            Error::geocode_failed(format!("invalid gazetteer {}: {err}", path.display()))
        })?;
        debug!("Loaded {} gazetteer places from {}", places.len(), path.display());
        Ok(Self::new(places, max_distance_km))
    }

    /// Number of known places.
    #[must_use]
    pub fn len(&self) -> usize {
        self.places.len()
    }

    /// Whether the gazetteer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

#[async_trait::async_trait]
impl ReverseGeocoder for GazetteerGeocoder {
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<Vec<Place>> {
        let mut nearby: Vec<(f64, &GazetteerPlace)> = self
            .places
            .iter()
            .map(|entry| (coordinates.distance_km(&entry.coordinates), entry))
            .filter(|(distance, _)| *distance <= self.max_distance_km)
            .collect();
        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(nearby
            .into_iter()
            .map(|(_, entry)| entry.place.clone())
            .collect())
    }
}

/// Delivers notifications as log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            title = %notification.title,
            at = %notification.created_at.to_rfc3339(),
            "{}",
            notification.body
        );
        Ok(())
    }
}

/// Assemble local collaborators for one `add` invocation.
///
/// `position` overrides the configured default position.
///
/// # Errors
///
/// Returns [`Error::GeocodeFailed`] if the gazetteer file exists but cannot
/// be loaded.
pub fn local_devices(
    config: &Config,
    image: Option<PathBuf>,
    position: Option<Coordinates>,
) -> Result<Devices> {
    let geocoder =
        GazetteerGeocoder::load(&config.gazetteer_path(), config.geocoder.max_distance_km)?;

    Ok(Devices {
        permissions: Arc::new(ConfiguredPermissions::new(config.permissions.clone())),
        camera: Arc::new(FileCamera::new(image)),
        location: Arc::new(FixedLocation::new(position.or(config.default_position()))),
        geocoder: Arc::new(geocoder),
        notifier: Arc::new(LogNotifier),
    })
}
