//! Host media binding.
//!
//! [`MediaHost`] is the boundary to whatever provides devices and capture
//! (a browser bridge, a native capture stack, or the simulated host).
//! Captured media comes back as a [`LocalStream`], which stops its tracks
//! when dropped.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use onmeet_shared::constants::{DEFAULT_PREVIEW_FPS, DEFAULT_PREVIEW_HEIGHT, DEFAULT_PREVIEW_WIDTH};
use onmeet_shared::error::{DeviceEnumerationError, MediaAcquisitionError};
use onmeet_shared::types::MediaDeviceDescriptor;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct StreamId(pub Uuid);

impl StreamId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Constraints for a camera preview request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConstraints {
    /// Exact device to open; `None` lets the host pick any camera.
    pub device_id: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            device_id: None,
            width: DEFAULT_PREVIEW_WIDTH,
            height: DEFAULT_PREVIEW_HEIGHT,
            fps: DEFAULT_PREVIEW_FPS,
        }
    }
}

impl VideoConstraints {
    pub fn for_device(&self, device_id: Option<&str>) -> Self {
        Self {
            device_id: device_id.map(str::to_owned),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    Live,
    Ended,
}

/// A single captured track. `stop` must be idempotent.
pub trait MediaTrack: Send + Sync + std::fmt::Debug {
    fn id(&self) -> &str;
    fn state(&self) -> TrackState;
    fn stop(&self);
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// One-time read of the host's devices, in host order.
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceDescriptor>, DeviceEnumerationError>;

    /// Open a camera stream. May prompt the user for permission.
    async fn acquire_video(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<LocalStream, MediaAcquisitionError>;
}

/// A live local capture stream bound to one device.
///
/// Every track is stopped when the stream is dropped.
#[derive(Debug)]
pub struct LocalStream {
    id: StreamId,
    device_id: String,
    tracks: Vec<Box<dyn MediaTrack>>,
}

impl LocalStream {
    pub fn new(device_id: impl Into<String>, tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        Self {
            id: StreamId::new(),
            device_id: device_id.into(),
            tracks,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn tracks(&self) -> &[Box<dyn MediaTrack>] {
        &self.tracks
    }

    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(|t| t.state() == TrackState::Live)
    }

    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl Drop for LocalStream {
    fn drop(&mut self) {
        if self.is_live() {
            debug!(stream = %self.id, device = %self.device_id, "Releasing local stream");
        }
        self.stop();
    }
}
