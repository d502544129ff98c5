//! Core travel entry types.
//!
//! This module defines the persisted [`TravelEntry`] record, the in-memory
//! [`DraftEntry`] the capture pipeline fills in, and the small value types
//! they are built from.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// The ordered collection held by the record store. Newest entries are last.
pub type EntryCollection = Vec<TravelEntry>;

/// A persisted travel entry: a photo and the address it was taken at.
///
/// Serialized as `{"image": "<base64>", "address": "<display string>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelEntry {
    /// The photo, base64 encoded.
    pub image: String,

    /// Display address resolved from the photo's location.
    pub address: String,
}

impl TravelEntry {
    /// Create a new entry from an already encoded image and an address.
    #[must_use]
    pub fn new(image: String, address: String) -> Self {
        Self { image, address }
    }

    /// Decode the image payload back to raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored payload is not valid base64.
    pub fn image_bytes(&self) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.image)
    }

    /// A `data:` URI suitable for embedding the photo in a view.
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.image)
    }

    /// BLAKE3 digest of the encoded image, hex encoded.
    #[must_use]
    pub fn image_digest(&self) -> String {
        blake3::hash(self.image.as_bytes()).to_hex().to_string()
    }

    /// Both fields must be non-empty for an entry to be stored.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.image.is_empty() && !self.address.is_empty()
    }
}

/// Encode raw image bytes the way entries store them.
#[must_use]
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, -90 to 90.
    pub latitude: f64,
    /// Longitude, -180 to 180.
    pub longitude: f64,
}

impl Coordinates {
    /// Mean Earth radius used for distance calculations.
    const EARTH_RADIUS_KM: f64 = 6371.0;

    /// Create a new coordinate pair.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance to `other` in kilometres (haversine).
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * Self::EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// A just-captured image, as handed over by the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageHandle {
    /// The image was written to a file.
    File(PathBuf),
    /// The image is held in memory.
    Bytes(Vec<u8>),
}

/// An in-progress travel entry owned by the capture pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftEntry {
    /// The captured image resource.
    pub image_handle: ImageHandle,
    /// Base64 payload, once encoding has completed.
    pub encoded_image: Option<String>,
    /// Where the photo was taken, once located.
    pub coordinates: Option<Coordinates>,
    /// Display address, once geocoded.
    pub address: Option<String>,
    /// Set after a successful commit; guards against appending twice.
    pub committed: bool,
}

impl DraftEntry {
    /// Start a draft from a freshly captured image.
    #[must_use]
    pub fn new(image_handle: ImageHandle) -> Self {
        Self {
            image_handle,
            encoded_image: None,
            coordinates: None,
            address: None,
            committed: false,
        }
    }

    /// Whether the draft holds everything a [`TravelEntry`] needs.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(&self.encoded_image, Some(image) if !image.is_empty())
            && matches!(&self.address, Some(address) if !address.is_empty())
    }

    /// Build the entry this draft would persist, if complete.
    #[must_use]
    pub fn to_entry(&self) -> Option<TravelEntry> {
        if !self.is_complete() {
            return None;
        }
        Some(TravelEntry::new(
            self.encoded_image.clone()?,
            self.address.clone()?,
        ))
    }
}
