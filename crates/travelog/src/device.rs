//! Device collaborator interfaces.
//!
//! The capture pipeline never talks to hardware directly. Everything it
//! needs from the outside world (permissions, the camera, a position fix,
//! reverse geocoding, user notifications) comes through the traits defined
//! here. [`crate::local`] provides implementations backed by files and
//! configuration; tests provide scripted fakes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{Coordinates, ImageHandle};
use crate::error::Result;
use crate::geocode::Place;

/// A capability the permission broker can grant or refuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Access to the camera.
    Camera,
    /// Access to the device position.
    Location,
    /// Permission to post user notifications.
    Notifications,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::Location => write!(f, "location"),
            Self::Notifications => write!(f, "notifications"),
        }
    }
}

/// Grants or refuses capabilities.
#[async_trait::async_trait]
pub trait PermissionBroker: Send + Sync {
    /// Ask for a capability. Returns `true` if granted.
    async fn request(&self, capability: Capability) -> bool;
}

/// What the camera handed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A photo was taken.
    Captured(ImageHandle),
    /// The user backed out without taking a photo.
    Cancelled,
}

/// A camera that can take one photo on request.
#[async_trait::async_trait]
pub trait Camera: Send + Sync {
    /// Take a photo.
    ///
    /// # Errors
    ///
    /// Returns an error if the camera fails. Cancellation is not an error;
    /// it is reported as [`CaptureOutcome::Cancelled`].
    async fn capture(&self) -> Result<CaptureOutcome>;
}

/// Source of the device's current position.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    /// Request a fresh position fix.
    ///
    /// # Errors
    ///
    /// Returns an error if no position can be determined.
    async fn current_position(&self) -> Result<Coordinates>;
}

/// Resolves coordinates to place descriptions.
#[async_trait::async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Look up places at `coordinates`, best match first.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails. An empty result is not
    /// an error at this level.
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<Vec<Place>>;
}

/// A local user notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Short headline.
    pub title: String,
    /// Body text.
    pub body: String,
    /// When the notification was raised.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create a notification stamped with the current time.
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }
}

/// Fire-and-forget notification delivery.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification. Delivery is at most once.
    ///
    /// # Errors
    ///
    /// Returns an error if the dispatcher rejected the notification.
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// The full set of collaborators a capture pipeline drives.
#[derive(Clone)]
pub struct Devices {
    /// Permission broker.
    pub permissions: Arc<dyn PermissionBroker>,
    /// Camera.
    pub camera: Arc<dyn Camera>,
    /// Position source.
    pub location: Arc<dyn LocationProvider>,
    /// Reverse geocoder.
    pub geocoder: Arc<dyn ReverseGeocoder>,
    /// Notification dispatcher.
    pub notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for Devices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Devices").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_display() {
        assert_eq!(Capability::Camera.to_string(), "camera");
        assert_eq!(Capability::Location.to_string(), "location");
        assert_eq!(Capability::Notifications.to_string(), "notifications");
    }

    #[test]
    fn test_capability_serialization() {
        let json = serde_json::to_string(&Capability::Notifications).unwrap();
        assert_eq!(json, "\"notifications\"");
    }

    #[test]
    fn test_notification_new() {
        let before = Utc::now();
        let n = Notification::new("Saved", "Entry added");
        assert_eq!(n.title, "Saved");
        assert_eq!(n.body, "Entry added");
        assert!(n.created_at >= before);
    }
}
