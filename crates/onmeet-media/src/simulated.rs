//! In-process media host with scripted devices and failures.
//!
//! Used by the demo binary and by tests. Every acquisition and track stop
//! is recorded in an ordered event log so callers can check release
//! ordering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use onmeet_shared::error::{DeviceEnumerationError, MediaAcquisitionError};
use onmeet_shared::types::{DeviceKind, MediaDeviceDescriptor};

use crate::host::{LocalStream, MediaHost, MediaTrack, TrackState, VideoConstraints};

/// Something that happened to a simulated track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Acquired { track_id: String, device_id: String },
    Stopped { track_id: String, device_id: String },
}

#[derive(Default)]
struct SimState {
    devices: Vec<MediaDeviceDescriptor>,
    enumeration_failure: Option<DeviceEnumerationError>,
    acquisition_failures: HashMap<String, MediaAcquisitionError>,
    latency: Option<Duration>,
}

pub struct SimulatedHost {
    state: Mutex<SimState>,
    events: Arc<Mutex<Vec<HostEvent>>>,
    tracks: Mutex<Vec<Arc<AtomicBool>>>,
    next_track: AtomicU64,
    /// `true` while acquisitions may complete.
    gate: watch::Sender<bool>,
}

impl SimulatedHost {
    pub fn new(devices: Vec<MediaDeviceDescriptor>) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            state: Mutex::new(SimState {
                devices,
                ..SimState::default()
            }),
            events: Arc::new(Mutex::new(Vec::new())),
            tracks: Mutex::new(Vec::new()),
            next_track: AtomicU64::new(1),
            gate,
        }
    }

    /// A host with one device of each kind and empty labels, as a browser
    /// reports before permission is granted.
    pub fn with_default_devices() -> Self {
        Self::new(vec![
            MediaDeviceDescriptor::new("cam1", DeviceKind::VideoInput, ""),
            MediaDeviceDescriptor::new("mic1", DeviceKind::AudioInput, ""),
            MediaDeviceDescriptor::new("spk1", DeviceKind::AudioOutput, ""),
        ])
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_devices(&self, devices: Vec<MediaDeviceDescriptor>) {
        self.state().devices = devices;
    }

    pub fn fail_enumeration(&self, error: Option<DeviceEnumerationError>) {
        self.state().enumeration_failure = error;
    }

    /// Make acquisitions of `device_id` fail with `error`.
    pub fn fail_acquisition(&self, device_id: impl Into<String>, error: MediaAcquisitionError) {
        self.state()
            .acquisition_failures
            .insert(device_id.into(), error);
    }

    pub fn clear_acquisition_failures(&self) {
        self.state().acquisition_failures.clear();
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    /// Hold every acquisition until [`resume_acquisitions`](Self::resume_acquisitions).
    pub fn pause_acquisitions(&self) {
        self.gate.send_replace(false);
    }

    pub fn resume_acquisitions(&self) {
        self.gate.send_replace(true);
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of tracks handed out that have not been stopped.
    pub fn live_track_count(&self) -> usize {
        self.tracks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|live| live.load(Ordering::SeqCst))
            .count()
    }

    fn select_camera(&self, requested: Option<&str>) -> Result<String, MediaAcquisitionError> {
        let state = self.state();
        let camera = match requested {
            Some(id) => state
                .devices
                .iter()
                .find(|d| d.kind == DeviceKind::VideoInput && d.device_id == id)
                .ok_or_else(|| MediaAcquisitionError::DeviceNotFound(id.to_string()))?,
            None => state
                .devices
                .iter()
                .find(|d| d.kind == DeviceKind::VideoInput)
                .ok_or(MediaAcquisitionError::NoDevice)?,
        };

        if let Some(err) = state.acquisition_failures.get(&camera.device_id) {
            return Err(err.clone());
        }
        Ok(camera.device_id.clone())
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::with_default_devices()
    }
}

#[async_trait]
impl MediaHost for SimulatedHost {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceDescriptor>, DeviceEnumerationError> {
        let state = self.state();
        match &state.enumeration_failure {
            Some(err) => Err(err.clone()),
            None => Ok(state.devices.clone()),
        }
    }

    async fn acquire_video(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<LocalStream, MediaAcquisitionError> {
        let latency = self.state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut gate = self.gate.subscribe();
        gate.wait_for(|open| *open)
            .await
            .map_err(|_| MediaAcquisitionError::Capture("host shut down".into()))?;

        let device_id = self.select_camera(constraints.device_id.as_deref())?;
        let track_id = format!(
            "video-{}",
            self.next_track.fetch_add(1, Ordering::SeqCst)
        );
        let live = Arc::new(AtomicBool::new(true));

        self.tracks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(live.clone());
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(HostEvent::Acquired {
                track_id: track_id.clone(),
                device_id: device_id.clone(),
            });
        debug!(track = %track_id, device = %device_id, "Simulated camera track started");

        let track = SimulatedTrack {
            id: track_id,
            device_id: device_id.clone(),
            live,
            events: self.events.clone(),
        };
        Ok(LocalStream::new(device_id, vec![Box::new(track)]))
    }
}

#[derive(Debug)]
struct SimulatedTrack {
    id: String,
    device_id: String,
    live: Arc<AtomicBool>,
    events: Arc<Mutex<Vec<HostEvent>>>,
}

impl MediaTrack for SimulatedTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> TrackState {
        if self.live.load(Ordering::SeqCst) {
            TrackState::Live
        } else {
            TrackState::Ended
        }
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(HostEvent::Stopped {
                    track_id: self.id.clone(),
                    device_id: self.device_id.clone(),
                });
        }
    }
}
