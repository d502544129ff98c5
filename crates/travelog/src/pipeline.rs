//! The capture-to-persistence pipeline.
//!
//! [`CapturePipeline`] sequences one travel entry from camera to store:
//!
//! ```text
//! Idle -> Capturing -> Encoding -> Locating -> Geocoding -> Ready -> Saving -> Saved
//! ```
//!
//! Collaborator failures do not escape as errors; they park the pipeline in
//! [`PipelineState::Error`] with the failing [`Stage`]. Failures before the
//! photo is encoded drop the draft and need a fresh [`start_capture`];
//! failures while locating or geocoding keep the draft so only the location
//! work is repeated.
//!
//! [`start_capture`]: CapturePipeline::start_capture

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::device::{Capability, CaptureOutcome, Devices, Notification};
use crate::entry::{encode_image, DraftEntry, ImageHandle, TravelEntry};
use crate::error::{Error, ErrorKind, Result};
use crate::storage::RecordStore;

/// The pipeline step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Taking the photo.
    Capture,
    /// Encoding the photo.
    Encode,
    /// Getting a position fix.
    Locate,
    /// Resolving the position to an address.
    Geocode,
}

impl Stage {
    /// Whether the draft survives a failure in this stage.
    #[must_use]
    pub fn preserves_draft(self) -> bool {
        matches!(self, Self::Locate | Self::Geocode)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capture => write!(f, "capture"),
            Self::Encode => write!(f, "encode"),
            Self::Locate => write!(f, "locate"),
            Self::Geocode => write!(f, "geocode"),
        }
    }
}

/// Where the pipeline currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// No draft.
    Idle,
    /// Waiting for the camera.
    Capturing,
    /// Encoding the captured image.
    Encoding,
    /// Waiting for a position fix.
    Locating,
    /// Waiting for the reverse geocoder.
    Geocoding,
    /// The draft is complete and may be committed.
    Ready,
    /// The draft is being written to the store.
    Saving,
    /// The draft was committed.
    Saved,
    /// A stage failed.
    Error {
        /// What kind of failure.
        kind: ErrorKind,
        /// Which stage failed.
        stage: Stage,
        /// Human-readable detail.
        message: String,
    },
}

impl PipelineState {
    /// Whether a location retry is meaningful from this state.
    #[must_use]
    pub fn allows_location_retry(&self) -> bool {
        matches!(self, Self::Error { stage, .. } if stage.preserves_draft())
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Capturing => write!(f, "capturing"),
            Self::Encoding => write!(f, "encoding"),
            Self::Locating => write!(f, "locating"),
            Self::Geocoding => write!(f, "geocoding"),
            Self::Ready => write!(f, "ready"),
            Self::Saving => write!(f, "saving"),
            Self::Saved => write!(f, "saved"),
            Self::Error { kind, stage, .. } => write!(f, "failed ({kind} during {stage})"),
        }
    }
}

/// Tunables for a [`CapturePipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Bound on waiting for the camera.
    pub capture_timeout: Option<Duration>,
    /// Bound on waiting for a position fix.
    pub location_timeout: Option<Duration>,
    /// Bound on waiting for the reverse geocoder.
    pub geocode_timeout: Option<Duration>,
    /// Attempts at the load-append-save cycle when another writer wins.
    pub commit_attempts: u32,
    /// Whether to notify after a commit.
    pub notify_on_commit: bool,
    /// Headline of the commit notification.
    pub notification_title: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            capture_timeout: config.pipeline.capture_timeout(),
            location_timeout: config.pipeline.location_timeout(),
            geocode_timeout: config.pipeline.geocode_timeout(),
            commit_attempts: config.pipeline.commit_attempts.max(1),
            notify_on_commit: config.notifications.enabled,
            notification_title: config.notifications.title.clone(),
        }
    }
}

/// The result of a successful commit.
#[derive(Debug)]
pub struct CommitReceipt {
    /// The entry that was appended.
    pub entry: TravelEntry,
    /// Its position in the collection.
    pub position: usize,
    /// Length of the collection after the append.
    pub total: usize,
    /// When the commit completed.
    pub saved_at: DateTime<Utc>,
    /// The in-flight notification, if one was sent. Resolves to whether it
    /// was delivered. Dropping the handle does not cancel delivery.
    pub notification: Option<JoinHandle<bool>>,
}

/// Drives one draft at a time from camera to store.
pub struct CapturePipeline {
    devices: Devices,
    store: Arc<dyn RecordStore>,
    options: PipelineOptions,
    state: PipelineState,
    draft: Option<DraftEntry>,
    state_tx: watch::Sender<PipelineState>,
}

impl std::fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("state", &self.state)
            .field("draft", &self.draft)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CapturePipeline {
    /// Create an idle pipeline.
    #[must_use]
    pub fn new(devices: Devices, store: Arc<dyn RecordStore>, options: PipelineOptions) -> Self {
        let (state_tx, _) = watch::channel(PipelineState::Idle);
        Self {
            devices,
            store,
            options,
            state: PipelineState::Idle,
            draft: None,
            state_tx,
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// The draft under construction, if any.
    #[must_use]
    pub fn draft(&self) -> Option<&DraftEntry> {
        self.draft.as_ref()
    }

    /// Watch state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    /// Capture a new photo and run it through to `Ready`.
    ///
    /// Always starts over: any existing draft is discarded first. Returns
    /// the state the pipeline settled in.
    pub async fn start_capture(&mut self) -> PipelineState {
        if self.draft.take().is_some() {
            debug!("Discarding superseded draft");
        }
        self.transition(PipelineState::Capturing);

        if !self.devices.permissions.request(Capability::Camera).await {
            return self.fail(
                Stage::Capture,
                Error::PermissionDenied {
                    capability: Capability::Camera,
                },
            );
        }

        let camera = Arc::clone(&self.devices.camera);
        let outcome = bounded(self.options.capture_timeout, camera.capture(), |limit| {
            Error::capture_failed(format!("camera timed out after {} ms", limit.as_millis()))
        })
        .await;

        let handle = match outcome {
            Ok(CaptureOutcome::Captured(handle)) => handle,
            Ok(CaptureOutcome::Cancelled) | Err(Error::CaptureCancelled) => {
                info!("Capture cancelled");
                self.transition(PipelineState::Idle);
                return self.state.clone();
            }
            Err(err) => return self.fail(Stage::Capture, err),
        };

        self.transition(PipelineState::Encoding);
        let encoded = match encode_handle(&handle).await {
            Ok(encoded) => encoded,
            Err(err) => return self.fail(Stage::Encode, err),
        };

        let mut draft = DraftEntry::new(handle);
        draft.encoded_image = Some(encoded);
        self.draft = Some(draft);

        self.locate_and_geocode().await
    }

    /// Re-run locating and geocoding for the preserved draft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the pipeline is parked after a
    /// location or geocoding failure.
    pub async fn retry_location(&mut self) -> Result<PipelineState> {
        self.ensure_retryable("retry location")?;
        Ok(self.locate_and_geocode().await)
    }

    /// Re-run only geocoding, reusing the coordinates already in the draft.
    ///
    /// Falls back to a full location retry when the draft has none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the pipeline is parked after a
    /// location or geocoding failure.
    pub async fn retry_geocode(&mut self) -> Result<PipelineState> {
        self.ensure_retryable("retry geocode")?;
        let has_coordinates = self
            .draft
            .as_ref()
            .is_some_and(|draft| draft.coordinates.is_some());
        if has_coordinates {
            Ok(self.geocode().await)
        } else {
            Ok(self.locate_and_geocode().await)
        }
    }

    /// Append the ready draft to the store.
    ///
    /// On success the pipeline is `Saved` and the draft is marked committed;
    /// a notification goes out in the background. On a storage failure the
    /// pipeline returns to `Ready` so the commit alone can be retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyCommitted`] if this draft was already saved,
    /// [`Error::InvalidState`] if there is no complete draft, and any store
    /// error from the append.
    pub async fn commit(&mut self) -> Result<CommitReceipt> {
        match &self.state {
            PipelineState::Ready => {}
            PipelineState::Saved => return Err(Error::AlreadyCommitted),
            other => {
                return Err(Error::InvalidState {
                    operation: "commit",
                    state: other.to_string(),
                })
            }
        }

        let entry = match &self.draft {
            Some(draft) if draft.committed => return Err(Error::AlreadyCommitted),
            Some(draft) => draft.to_entry(),
            None => None,
        };
        let Some(entry) = entry else {
            return Err(Error::InvalidState {
                operation: "commit",
                state: "holding an incomplete draft".to_string(),
            });
        };

        self.transition(PipelineState::Saving);
        let (position, total) = match self.append(&entry).await {
            Ok(placement) => placement,
            Err(err) => {
                warn!("Commit failed, draft kept: {}", err);
                self.transition(PipelineState::Ready);
                return Err(err);
            }
        };

        if let Some(draft) = self.draft.as_mut() {
            draft.committed = true;
        }
        self.transition(PipelineState::Saved);
        info!(
            "Saved entry {} of {} at {} (image {})",
            position + 1,
            total,
            entry.address,
            &entry.image_digest()[..16]
        );

        let notification = self.dispatch_notification(&entry);
        Ok(CommitReceipt {
            entry,
            position,
            total,
            saved_at: Utc::now(),
            notification,
        })
    }

    /// Drop any draft and return to `Idle`.
    pub fn discard(&mut self) {
        if self.draft.take().is_some() {
            debug!("Draft discarded");
        }
        self.transition(PipelineState::Idle);
    }

    async fn locate_and_geocode(&mut self) -> PipelineState {
        self.transition(PipelineState::Locating);

        if !self.devices.permissions.request(Capability::Location).await {
            return self.fail(
                Stage::Locate,
                Error::PermissionDenied {
                    capability: Capability::Location,
                },
            );
        }

        let location = Arc::clone(&self.devices.location);
        let fix = bounded(
            self.options.location_timeout,
            location.current_position(),
            |limit| {
                Error::location_failed(format!("no fix within {} ms", limit.as_millis()))
            },
        )
        .await;

        let coordinates = match fix {
            Ok(coordinates) if coordinates.is_valid() => coordinates,
            Ok(coordinates) => {
                return self.fail(
                    Stage::Locate,
                    Error::location_failed(format!("invalid coordinates {coordinates}")),
                )
            }
            Err(err) => return self.fail(Stage::Locate, err),
        };

        debug!("Located at {}", coordinates);
        if let Some(draft) = self.draft.as_mut() {
            draft.coordinates = Some(coordinates);
            draft.address = None;
        }

        self.geocode().await
    }

    async fn geocode(&mut self) -> PipelineState {
        let Some(coordinates) = self.draft.as_ref().and_then(|draft| draft.coordinates) else {
            return self.fail(
                Stage::Locate,
                Error::location_failed("no coordinates to geocode"),
            );
        };

        self.transition(PipelineState::Geocoding);
        let geocoder = Arc::clone(&self.devices.geocoder);
        let lookup = bounded(
            self.options.geocode_timeout,
            geocoder.reverse_geocode(coordinates),
            |limit| {
                Error::geocode_failed(format!("no answer within {} ms", limit.as_millis()))
            },
        )
        .await;

        let place = match lookup {
            Ok(places) => places.into_iter().next(),
            Err(err) => return self.fail(Stage::Geocode, err),
        };
        let Some(place) = place else {
            return self.fail(
                Stage::Geocode,
                Error::geocode_failed(format!("no place found near {coordinates}")),
            );
        };

        let address = place.to_address();
        let complete = match self.draft.as_mut() {
            Some(draft) => {
                draft.address = Some(address);
                draft.is_complete()
            }
            None => false,
        };
        if !complete {
            return self.fail(
                Stage::Geocode,
                Error::geocode_failed("draft incomplete after geocoding"),
            );
        }

        self.transition(PipelineState::Ready);
        self.state.clone()
    }

    /// Run the load-append-save cycle on the blocking pool.
    async fn append(&self, entry: &TravelEntry) -> Result<(usize, usize)> {
        let store = Arc::clone(&self.store);
        let entry = entry.clone();
        let attempts = self.options.commit_attempts;

        tokio::task::spawn_blocking(move || append_with_retry(store.as_ref(), &entry, attempts))
            .await
            .unwrap_or_else(|err| {
                Err(Error::storage_unavailable(format!("commit task failed: {err}")))
            })
    }

    fn dispatch_notification(&self, entry: &TravelEntry) -> Option<JoinHandle<bool>> {
        if !self.options.notify_on_commit {
            return None;
        }

        let permissions = Arc::clone(&self.devices.permissions);
        let notifier = Arc::clone(&self.devices.notifier);
        let notification =
            Notification::new(self.options.notification_title.clone(), entry.address.clone());

        Some(tokio::spawn(async move {
            if !permissions.request(Capability::Notifications).await {
                debug!("Notification permission denied, skipping");
                return false;
            }
            match notifier.notify(&notification).await {
                Ok(()) => true,
                Err(err) => {
                    warn!("Notification not delivered: {}", err);
                    false
                }
            }
        }))
    }

    fn ensure_retryable(&self, operation: &'static str) -> Result<()> {
        if self.state.allows_location_retry() && self.draft.is_some() {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    fn fail(&mut self, stage: Stage, err: Error) -> PipelineState {
        warn!("Pipeline {} stage failed: {}", stage, err);
        if !stage.preserves_draft() {
            self.draft = None;
        }
        self.transition(PipelineState::Error {
            kind: err.kind(),
            stage,
            message: err.to_string(),
        });
        self.state.clone()
    }

    fn transition(&mut self, next: PipelineState) {
        debug!("Pipeline {} -> {}", self.state, next);
        self.state = next.clone();
        self.state_tx.send_replace(next);
    }
}

fn append_with_retry(
    store: &dyn RecordStore,
    entry: &TravelEntry,
    attempts: u32,
) -> Result<(usize, usize)> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let snapshot = store.load_snapshot()?;
        let mut entries = snapshot.entries;
        entries.push(entry.clone());

        match store.save_snapshot(&entries, snapshot.revision) {
            Ok(_) => return Ok((entries.len() - 1, entries.len())),
            Err(Error::StaleWrite { .. }) if attempt < attempts => {
                debug!("Collection changed during commit, reloading (attempt {attempt})");
            }
            Err(err) => return Err(err),
        }
    }
}

/// Await `fut`, giving up after `limit` if one is set.
async fn bounded<T, F>(
    limit: Option<Duration>,
    fut: F,
    on_timeout: impl FnOnce(Duration) -> Error,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or_else(|_| Err(on_timeout(limit))),
        None => fut.await,
    }
}

async fn encode_handle(handle: &ImageHandle) -> Result<String> {
    match handle {
        ImageHandle::File(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|err| {
                Error::encoding_failed(format!("cannot read {}: {err}", path.display()))
            })?;
            encode_bytes(&bytes)
        }
        ImageHandle::Bytes(bytes) => encode_bytes(bytes),
    }
}

fn encode_bytes(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(Error::encoding_failed("image is empty"));
    }
    Ok(encode_image(bytes))
}
