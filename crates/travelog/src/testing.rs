//! Scripted collaborators and store wrappers for unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::device::{
    Camera, Capability, CaptureOutcome, Devices, LocationProvider, Notification, Notifier,
    PermissionBroker, ReverseGeocoder,
};
use crate::entry::{Coordinates, ImageHandle, TravelEntry};
use crate::error::{Error, Result};
use crate::geocode::Place;
use crate::storage::{RecordStore, Snapshot};

/// Shared, ordered record of collaborator calls.
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

fn log(calls: &CallLog, call: &'static str) {
    calls.lock().unwrap().push(call);
}

/// The bytes every scripted capture returns unless told otherwise.
pub const PHOTO: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg";

#[derive(Debug)]
pub struct ScriptedPermissions {
    denied: Mutex<HashSet<Capability>>,
    calls: CallLog,
}

impl ScriptedPermissions {
    pub fn deny(&self, capability: Capability) {
        self.denied.lock().unwrap().insert(capability);
    }

    pub fn grant(&self, capability: Capability) {
        self.denied.lock().unwrap().remove(&capability);
    }
}

#[async_trait::async_trait]
impl PermissionBroker for ScriptedPermissions {
    async fn request(&self, capability: Capability) -> bool {
        log(&self.calls, "permission");
        !self.denied.lock().unwrap().contains(&capability)
    }
}

#[derive(Debug)]
pub struct ScriptedCamera {
    script: Mutex<VecDeque<Result<CaptureOutcome>>>,
    calls: CallLog,
}

impl ScriptedCamera {
    pub fn push(&self, outcome: Result<CaptureOutcome>) {
        self.script.lock().unwrap().push_back(outcome);
    }
}

#[async_trait::async_trait]
impl Camera for ScriptedCamera {
    async fn capture(&self) -> Result<CaptureOutcome> {
        log(&self.calls, "capture");
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CaptureOutcome::Captured(ImageHandle::Bytes(PHOTO.to_vec()))))
    }
}

#[derive(Debug)]
pub struct ScriptedLocation {
    script: Mutex<VecDeque<Result<Coordinates>>>,
    delay: Mutex<Option<Duration>>,
    calls: CallLog,
}

impl ScriptedLocation {
    pub const DEFAULT: Coordinates = Coordinates {
        latitude: 48.8606,
        longitude: 2.3376,
    };

    pub fn push(&self, result: Result<Coordinates>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn stall_for(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait::async_trait]
impl LocationProvider for ScriptedLocation {
    async fn current_position(&self) -> Result<Coordinates> {
        log(&self.calls, "locate");
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Self::DEFAULT))
    }
}

#[derive(Debug)]
pub struct ScriptedGeocoder {
    script: Mutex<VecDeque<Result<Vec<Place>>>>,
    requested: Mutex<Vec<Coordinates>>,
    calls: CallLog,
}

impl ScriptedGeocoder {
    pub fn default_place() -> Place {
        Place {
            name: Some("Louvre Museum".to_string()),
            city: Some("Paris".to_string()),
            region: Some("IDF".to_string()),
            postal_code: Some("75001".to_string()),
        }
    }

    pub fn push(&self, result: Result<Vec<Place>>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn requested(&self) -> Vec<Coordinates> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ReverseGeocoder for ScriptedGeocoder {
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<Vec<Place>> {
        log(&self.calls, "geocode");
        self.requested.lock().unwrap().push(coordinates);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![Self::default_place()]))
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: Mutex<bool>,
    calls: CallLog,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_deliveries(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        log(&self.calls, "notify");
        if *self.fail.lock().unwrap() {
            return Err(Error::Io(std::io::Error::other("dispatcher offline")));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// A full set of scripted collaborators sharing one call log.
#[derive(Debug)]
pub struct FakeDevices {
    pub calls: CallLog,
    pub permissions: Arc<ScriptedPermissions>,
    pub camera: Arc<ScriptedCamera>,
    pub location: Arc<ScriptedLocation>,
    pub geocoder: Arc<ScriptedGeocoder>,
    pub notifier: Arc<RecordingNotifier>,
}

impl FakeDevices {
    pub fn new() -> Self {
        let calls: CallLog = Arc::default();
        Self {
            permissions: Arc::new(ScriptedPermissions {
                denied: Mutex::default(),
                calls: calls.clone(),
            }),
            camera: Arc::new(ScriptedCamera {
                script: Mutex::default(),
                calls: calls.clone(),
            }),
            location: Arc::new(ScriptedLocation {
                script: Mutex::default(),
                delay: Mutex::default(),
                calls: calls.clone(),
            }),
            geocoder: Arc::new(ScriptedGeocoder {
                script: Mutex::default(),
                requested: Mutex::default(),
                calls: calls.clone(),
            }),
            notifier: Arc::new(RecordingNotifier {
                sent: Mutex::default(),
                fail: Mutex::default(),
                calls: calls.clone(),
            }),
            calls,
        }
    }

    pub fn devices(&self) -> Devices {
        Devices {
            permissions: self.permissions.clone(),
            camera: self.camera.clone(),
            location: self.location.clone(),
            geocoder: self.geocoder.clone(),
            notifier: self.notifier.clone(),
        }
    }

    /// Collaborator calls so far, permission checks excluded.
    pub fn device_calls(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|call| *call != "permission")
            .collect()
    }
}

/// Wraps a store and injects failures or competing writes into saves.
#[derive(Debug)]
pub struct FlakyStore<S> {
    inner: S,
    failing_saves: Mutex<usize>,
    interleaved: Mutex<Option<Vec<TravelEntry>>>,
    saves: Mutex<usize>,
}

impl<S: RecordStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_saves: Mutex::new(0),
            interleaved: Mutex::new(None),
            saves: Mutex::new(0),
        }
    }

    /// Make the next `count` saves fail as if the disk were gone.
    pub fn fail_next_saves(&self, count: usize) {
        *self.failing_saves.lock().unwrap() = count;
    }

    /// Before the next save, write `entries` as a competing writer would.
    pub fn interleave_before_next_save(&self, entries: Vec<TravelEntry>) {
        *self.interleaved.lock().unwrap() = Some(entries);
    }

    /// Number of successful saves that reached the inner store.
    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }

    fn before_save(&self) -> Result<()> {
        if let Some(entries) = self.interleaved.lock().unwrap().take() {
            self.inner.save_all(&entries)?;
        }
        let mut failing = self.failing_saves.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(Error::storage_unavailable("disk unavailable"));
        }
        Ok(())
    }
}

impl<S: RecordStore> RecordStore for FlakyStore<S> {
    fn load_snapshot(&self) -> Result<Snapshot> {
        self.inner.load_snapshot()
    }

    fn save_snapshot(&self, entries: &[TravelEntry], expected_revision: i64) -> Result<i64> {
        self.before_save()?;
        let revision = self.inner.save_snapshot(entries, expected_revision)?;
        *self.saves.lock().unwrap() += 1;
        Ok(revision)
    }

    fn save_all(&self, entries: &[TravelEntry]) -> Result<()> {
        self.before_save()?;
        self.inner.save_all(entries)?;
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}
