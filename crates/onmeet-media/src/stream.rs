//! Camera preview stream lifecycle.
//!
//! ```text
//!  Off ──enable──▶ Requesting ──ok──▶ Active
//!   ▲                  │                │
//!   └──────err─────────┘                │
//!   └──────disable / device change / shutdown
//! ```
//!
//! A controller holds at most one stream and runs at most one host
//! acquisition at a time. Each request takes a new generation; a pending
//! acquisition under an older generation is dropped and reported as
//! superseded.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use onmeet_shared::error::MediaAcquisitionError;

use crate::host::{LocalStream, MediaHost, StreamId, VideoConstraints};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum StreamState {
    Off,
    Requesting {
        device_id: Option<String>,
    },
    Active {
        stream_id: StreamId,
        device_id: String,
    },
}

impl StreamState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// Device bound to the current or pending stream.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::Off => None,
            Self::Requesting { device_id } => device_id.as_deref(),
            Self::Active { device_id, .. } => Some(device_id),
        }
    }
}

pub struct LocalStreamController {
    host: Arc<dyn MediaHost>,
    constraints: VideoConstraints,
    stream: Mutex<Option<LocalStream>>,
    /// Bumped with `stream` locked; pending acquisitions watch it to learn
    /// they were superseded.
    generation: watch::Sender<u64>,
    /// Held across the host call so acquisitions never overlap.
    acquiring: Mutex<()>,
    state_tx: watch::Sender<StreamState>,
}

impl LocalStreamController {
    pub fn new(host: Arc<dyn MediaHost>) -> Self {
        Self::with_constraints(host, VideoConstraints::default())
    }

    /// `constraints.device_id` is ignored; the device comes with each request.
    pub fn with_constraints(host: Arc<dyn MediaHost>, constraints: VideoConstraints) -> Self {
        let (state_tx, _) = watch::channel(StreamState::Off);
        let (generation, _) = watch::channel(0);
        Self {
            host,
            constraints,
            stream: Mutex::new(None),
            generation,
            acquiring: Mutex::new(()),
            state_tx,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state_tx.borrow().clone()
    }

    /// Preview sinks watch this to bind and unbind the active stream.
    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.state_tx.subscribe()
    }

    /// Turn the camera preview on or off.
    ///
    /// Enabling while already active on the requested device (or with no
    /// device requested) keeps the current stream. Any other enable
    /// releases the held stream, cancels a pending acquisition and waits
    /// for it to be dropped before asking the host for the new one.
    ///
    /// Dropping the returned future before it completes leaves the
    /// controller `Off` unless a newer request has taken over.
    pub async fn set_video_enabled(
        &self,
        enabled: bool,
        device_id: Option<&str>,
    ) -> Result<StreamState, MediaAcquisitionError> {
        if !enabled {
            self.release().await;
            return Ok(StreamState::Off);
        }

        let generation = {
            let mut stream = self.stream.lock().await;

            if let Some(held) = stream.as_ref() {
                if device_id.map_or(true, |id| id == held.device_id()) {
                    return Ok(self.state());
                }
            }

            let generation = self.bump_generation();
            if let Some(old) = stream.take() {
                debug!(stream = %old.id(), device = %old.device_id(), "Releasing stream before device switch");
                drop(old);
            }
            self.state_tx.send_replace(StreamState::Requesting {
                device_id: device_id.map(str::to_owned),
            });
            generation
        };
        let mut pending = PendingRequest {
            generation: &self.generation,
            state_tx: &self.state_tx,
            current: generation,
            settled: false,
        };

        let _turn = self.acquiring.lock().await;
        if *self.generation.borrow() != generation {
            return Err(MediaAcquisitionError::Superseded);
        }

        debug!(generation, device = ?device_id, "Requesting camera stream");
        let constraints = self.constraints.for_device(device_id);
        let mut superseded = self.generation.subscribe();
        let result = tokio::select! {
            result = self.host.acquire_video(&constraints) => Some(result),
            _ = async { superseded.wait_for(|g| *g != generation).await.is_ok() } => None,
        };
        let Some(result) = result else {
            debug!(generation, "Camera acquisition cancelled by a newer request");
            return Err(MediaAcquisitionError::Superseded);
        };

        let mut stream = self.stream.lock().await;
        if *self.generation.borrow() != generation {
            if let Ok(late) = result {
                debug!(stream = %late.id(), generation, "Releasing superseded stream");
                drop(late);
            }
            return Err(MediaAcquisitionError::Superseded);
        }

        pending.settled = true;
        match result {
            Ok(acquired) => {
                let state = StreamState::Active {
                    stream_id: acquired.id(),
                    device_id: acquired.device_id().to_string(),
                };
                info!(stream = %acquired.id(), device = %acquired.device_id(), "Camera preview active");
                *stream = Some(acquired);
                self.state_tx.send_replace(state.clone());
                Ok(state)
            }
            Err(e) => {
                warn!(error = %e, device = ?device_id, "Camera acquisition failed, video stays off");
                self.state_tx.send_replace(StreamState::Off);
                Err(e)
            }
        }
    }

    /// Stop the held stream and cancel any acquisition in flight.
    pub async fn release(&self) {
        let mut stream = self.stream.lock().await;
        self.bump_generation();
        if let Some(held) = stream.take() {
            info!(stream = %held.id(), "Camera preview stopped");
            drop(held);
        }
        self.state_tx.send_replace(StreamState::Off);
    }

    /// Teardown. Equivalent to disabling video.
    pub async fn shutdown(&self) {
        self.release().await;
        debug!("Stream controller shut down");
    }

    /// Scoped read access to the active stream.
    pub async fn with_active_stream<R>(&self, f: impl FnOnce(&LocalStream) -> R) -> Option<R> {
        let stream = self.stream.lock().await;
        stream.as_ref().map(f)
    }

    /// Callers hold `stream`.
    fn bump_generation(&self) -> u64 {
        let mut next = 0;
        self.generation.send_modify(|g| {
            *g += 1;
            next = *g;
        });
        next
    }
}

/// Resets `Requesting` to `Off` when a request is abandoned mid-flight.
struct PendingRequest<'a> {
    generation: &'a watch::Sender<u64>,
    state_tx: &'a watch::Sender<StreamState>,
    current: u64,
    settled: bool,
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // Checked under the generation lock so a newer request's
        // `Requesting` is never overwritten.
        let (current, state_tx) = (self.current, self.state_tx);
        self.generation.send_if_modified(|g| {
            if *g == current {
                debug!(generation = current, "Camera request abandoned");
                state_tx.send_replace(StreamState::Off);
            }
            false
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::host::TrackState;
    use crate::simulated::{HostEvent, SimulatedHost};
    use onmeet_shared::error::DeviceEnumerationError;
    use onmeet_shared::types::{DeviceKind, MediaDeviceDescriptor};

    /// Delays one camera and records how many acquisitions run at once.
    struct SlowCameraHost {
        inner: SimulatedHost,
        slow_device: &'static str,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MediaHost for SlowCameraHost {
        async fn enumerate_devices(
            &self,
        ) -> Result<Vec<MediaDeviceDescriptor>, DeviceEnumerationError> {
            self.inner.enumerate_devices().await
        }

        async fn acquire_video(
            &self,
            constraints: &VideoConstraints,
        ) -> Result<LocalStream, MediaAcquisitionError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let _in_flight = InFlight(&self.in_flight);

            if constraints.device_id.as_deref() == Some(self.slow_device) {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.acquire_video(constraints).await
        }
    }

    fn two_camera_host() -> Arc<SimulatedHost> {
        Arc::new(SimulatedHost::new(vec![
            MediaDeviceDescriptor::new("camA", DeviceKind::VideoInput, "Front"),
            MediaDeviceDescriptor::new("camB", DeviceKind::VideoInput, "Back"),
        ]))
    }

    #[tokio::test]
    async fn test_enable_then_disable_releases_tracks() {
        let host = two_camera_host();
        let ctl = LocalStreamController::new(host.clone());
        assert_eq!(ctl.state(), StreamState::Off);

        let state = ctl.set_video_enabled(true, Some("camA")).await.unwrap();
        assert!(state.is_active());
        assert_eq!(state.device_id(), Some("camA"));
        assert_eq!(host.live_track_count(), 1);

        let state = ctl.set_video_enabled(false, None).await.unwrap();
        assert_eq!(state, StreamState::Off);
        assert_eq!(host.live_track_count(), 0);
        assert!(ctl.with_active_stream(|_| ()).await.is_none());
    }

    #[tokio::test]
    async fn test_device_switch_releases_old_stream_first() {
        let host = two_camera_host();
        let ctl = LocalStreamController::new(host.clone());

        ctl.set_video_enabled(true, Some("camA")).await.unwrap();
        ctl.set_video_enabled(true, Some("camB")).await.unwrap();

        let events = host.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], HostEvent::Acquired { device_id, .. } if device_id == "camA"));
        assert!(matches!(&events[1], HostEvent::Stopped { device_id, .. } if device_id == "camA"));
        assert!(matches!(&events[2], HostEvent::Acquired { device_id, .. } if device_id == "camB"));
        assert_eq!(host.live_track_count(), 1);
        assert_eq!(ctl.state().device_id(), Some("camB"));
    }

    #[tokio::test]
    async fn test_enable_same_device_keeps_stream() {
        let host = two_camera_host();
        let ctl = LocalStreamController::new(host.clone());

        let first = ctl.set_video_enabled(true, Some("camA")).await.unwrap();
        let again = ctl.set_video_enabled(true, Some("camA")).await.unwrap();
        let any = ctl.set_video_enabled(true, None).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(first, any);
        assert_eq!(host.events().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_leaves_controller_off() {
        let host = two_camera_host();
        host.fail_acquisition("camA", MediaAcquisitionError::DeviceBusy("camA".into()));
        let ctl = LocalStreamController::new(host.clone());

        let err = ctl.set_video_enabled(true, Some("camA")).await.unwrap_err();
        assert_eq!(err, MediaAcquisitionError::DeviceBusy("camA".into()));
        assert_eq!(ctl.state(), StreamState::Off);
        assert_eq!(host.live_track_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_switch_does_not_keep_old_stream() {
        let host = two_camera_host();
        host.fail_acquisition("camB", MediaAcquisitionError::PermissionDenied);
        let ctl = LocalStreamController::new(host.clone());

        ctl.set_video_enabled(true, Some("camA")).await.unwrap();
        assert!(ctl.set_video_enabled(true, Some("camB")).await.is_err());
        assert_eq!(ctl.state(), StreamState::Off);
        assert_eq!(host.live_track_count(), 0);
    }

    #[tokio::test]
    async fn test_disable_during_acquisition_cancels_it() {
        let host = two_camera_host();
        host.pause_acquisitions();
        let ctl = Arc::new(LocalStreamController::new(host.clone()));

        let mut states = ctl.subscribe();
        let pending = tokio::spawn({
            let ctl = ctl.clone();
            async move { ctl.set_video_enabled(true, Some("camA")).await }
        });
        states
            .wait_for(|s| matches!(s, StreamState::Requesting { .. }))
            .await
            .unwrap();

        ctl.set_video_enabled(false, None).await.unwrap();
        let result = pending.await.unwrap();
        assert_eq!(result, Err(MediaAcquisitionError::Superseded));
        host.resume_acquisitions();

        assert_eq!(ctl.state(), StreamState::Off);
        assert_eq!(host.live_track_count(), 0);
        // The pending host call was dropped before it opened the camera.
        assert!(host.events().is_empty());
    }

    #[tokio::test]
    async fn test_newer_request_supersedes_pending_one() {
        let host = two_camera_host();
        host.pause_acquisitions();
        let ctl = Arc::new(LocalStreamController::new(host.clone()));

        let mut states = ctl.subscribe();
        let first = tokio::spawn({
            let ctl = ctl.clone();
            async move { ctl.set_video_enabled(true, Some("camA")).await }
        });
        states
            .wait_for(|s| matches!(s, StreamState::Requesting { .. }))
            .await
            .unwrap();

        let second = tokio::spawn({
            let ctl = ctl.clone();
            async move { ctl.set_video_enabled(true, Some("camB")).await }
        });
        states
            .wait_for(|s| s.device_id() == Some("camB"))
            .await
            .unwrap();
        host.resume_acquisitions();

        assert_eq!(first.await.unwrap(), Err(MediaAcquisitionError::Superseded));
        let state = second.await.unwrap().unwrap();
        assert_eq!(state.device_id(), Some("camB"));
        assert_eq!(host.live_track_count(), 1);
        assert_eq!(
            ctl.with_active_stream(|s| s.device_id().to_string()).await,
            Some("camB".to_string())
        );
    }

    #[tokio::test]
    async fn test_switch_during_slow_acquisition_never_overlaps() {
        let host = Arc::new(SlowCameraHost {
            inner: SimulatedHost::new(vec![
                MediaDeviceDescriptor::new("camA", DeviceKind::VideoInput, "Front"),
                MediaDeviceDescriptor::new("camB", DeviceKind::VideoInput, "Back"),
            ]),
            slow_device: "camA",
            delay: Duration::from_millis(200),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let ctl = Arc::new(LocalStreamController::new(host.clone()));

        let first = tokio::spawn({
            let ctl = ctl.clone();
            async move { ctl.set_video_enabled(true, Some("camA")).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let state = ctl.set_video_enabled(true, Some("camB")).await.unwrap();
        assert_eq!(state.device_id(), Some("camB"));
        assert_eq!(first.await.unwrap(), Err(MediaAcquisitionError::Superseded));

        assert_eq!(host.max_in_flight.load(Ordering::SeqCst), 1);
        let events = host.inner.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], HostEvent::Acquired { device_id, .. } if device_id == "camB"));
        assert_eq!(host.inner.live_track_count(), 1);
        assert_eq!(ctl.state(), state);
    }

    #[tokio::test]
    async fn test_abandoned_request_turns_off() {
        let host = two_camera_host();
        host.pause_acquisitions();
        let ctl = LocalStreamController::new(host.clone());

        let timed_out = tokio::time::timeout(
            Duration::from_millis(50),
            ctl.set_video_enabled(true, Some("camA")),
        )
        .await;
        assert!(timed_out.is_err());
        assert_eq!(ctl.state(), StreamState::Off);

        host.resume_acquisitions();
        let state = ctl.set_video_enabled(true, Some("camA")).await.unwrap();
        assert!(state.is_active());
        assert_eq!(host.live_track_count(), 1);
    }

    #[tokio::test]
    async fn test_dropping_controller_releases_stream() {
        let host = two_camera_host();
        let ctl = LocalStreamController::new(host.clone());
        ctl.set_video_enabled(true, None).await.unwrap();
        let tracks_live = ctl
            .with_active_stream(|s| s.tracks().iter().all(|t| t.state() == TrackState::Live))
            .await;
        assert_eq!(tracks_live, Some(true));

        drop(ctl);
        assert_eq!(host.live_track_count(), 0);
    }

    #[tokio::test]
    async fn test_state_serializes_for_preview_sink() {
        let host = two_camera_host();
        let ctl = LocalStreamController::new(host);
        let state = ctl.set_video_enabled(true, Some("camA")).await.unwrap();

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "active");
        assert_eq!(json["device_id"], "camA");
        assert_eq!(serde_json::to_value(StreamState::Off).unwrap()["state"], "off");
    }

    #[tokio::test]
    async fn test_shutdown_turns_off() {
        let host = two_camera_host();
        let ctl = LocalStreamController::new(host.clone());
        ctl.set_video_enabled(true, Some("camB")).await.unwrap();
        ctl.shutdown().await;
        assert_eq!(ctl.state(), StreamState::Off);
        assert_eq!(host.live_track_count(), 0);
    }
}
