//! Platform media host: cpal for audio devices, nokhwa for cameras.
//!
//! cpal exposes no stable device ids, so audio devices use their name as
//! id. Cameras use the nokhwa index and are driven from a
//! [`CaptureThread`] because the nokhwa handle must stay on the thread
//! that opened it.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;
use tracing::{info, warn};

use onmeet_shared::error::{DeviceEnumerationError, MediaAcquisitionError};
use onmeet_shared::types::{DeviceKind, MediaDeviceDescriptor};

use crate::capture::CaptureThread;
use crate::host::{LocalStream, MediaHost, MediaTrack, TrackState, VideoConstraints};

#[derive(Debug, Default)]
pub struct NativeHost;

impl NativeHost {
    pub fn new() -> Self {
        Self
    }
}

fn list_cameras() -> Result<Vec<MediaDeviceDescriptor>, DeviceEnumerationError> {
    let cameras = nokhwa::query(ApiBackend::Auto)
        .map_err(|e| DeviceEnumerationError::Host(e.to_string()))?;
    Ok(cameras
        .into_iter()
        .map(|info| {
            MediaDeviceDescriptor::new(
                info.index().to_string(),
                DeviceKind::VideoInput,
                info.human_name(),
            )
        })
        .collect())
}

fn list_audio_devices() -> Result<Vec<MediaDeviceDescriptor>, DeviceEnumerationError> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let inputs = host
        .input_devices()
        .map_err(|e| DeviceEnumerationError::Host(e.to_string()))?;
    for device in inputs {
        if let Ok(name) = device.name() {
            devices.push(MediaDeviceDescriptor::new(
                name.clone(),
                DeviceKind::AudioInput,
                name,
            ));
        }
    }

    let outputs = host
        .output_devices()
        .map_err(|e| DeviceEnumerationError::Host(e.to_string()))?;
    for device in outputs {
        if let Ok(name) = device.name() {
            devices.push(MediaDeviceDescriptor::new(
                name.clone(),
                DeviceKind::AudioOutput,
                name,
            ));
        }
    }

    Ok(devices)
}

fn camera_index(device_id: Option<&str>) -> CameraIndex {
    match device_id {
        Some(id) => match id.parse::<u32>() {
            Ok(i) => CameraIndex::Index(i),
            Err(_) => CameraIndex::String(id.to_string()),
        },
        None => CameraIndex::Index(0),
    }
}

#[async_trait]
impl MediaHost for NativeHost {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceDescriptor>, DeviceEnumerationError> {
        tokio::task::spawn_blocking(|| -> Result<Vec<MediaDeviceDescriptor>, DeviceEnumerationError> {
            // A machine without cameras still has usable audio devices.
            let mut devices = match list_cameras() {
                Ok(cameras) => cameras,
                Err(e) => {
                    warn!(error = %e, "Camera query failed");
                    Vec::new()
                }
            };
            devices.extend(list_audio_devices()?);
            Ok(devices)
        })
        .await
        .map_err(|e| DeviceEnumerationError::Host(e.to_string()))?
    }

    async fn acquire_video(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<LocalStream, MediaAcquisitionError> {
        let index = camera_index(constraints.device_id.as_deref());
        let device_id = index.to_string();
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(constraints.width, constraints.height),
                FrameFormat::MJPEG,
                constraints.fps,
            ),
        ));

        let open = move || -> Result<Camera, MediaAcquisitionError> {
            let mut camera = Camera::new(index, requested)
                .map_err(|e| MediaAcquisitionError::Capture(e.to_string()))?;
            camera
                .open_stream()
                .map_err(|e| MediaAcquisitionError::DeviceBusy(e.to_string()))?;
            info!(camera = %camera.info().human_name(), "Camera stream opened");
            Ok(camera)
        };
        // Frames are pulled to keep the device streaming; the preview sink
        // reads them through its own binding.
        let pull = |camera: &mut Camera| camera.frame().map(drop).map_err(|e| e.to_string());
        let close = |mut camera: Camera| {
            if let Err(e) = camera.stop_stream() {
                warn!(error = %e, "Failed to stop camera stream");
            }
        };

        let capture = CaptureThread::start(device_id.clone(), open, pull, close).await?;
        let track = NativeCameraTrack {
            id: format!("camera-{device_id}"),
            capture,
        };
        Ok(LocalStream::new(device_id, vec![Box::new(track)]))
    }
}

#[derive(Debug)]
struct NativeCameraTrack {
    id: String,
    capture: CaptureThread,
}

impl MediaTrack for NativeCameraTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> TrackState {
        if self.capture.is_running() {
            TrackState::Live
        } else {
            TrackState::Ended
        }
    }

    /// Returns once the camera is closed, so the device can be reopened
    /// right away.
    fn stop(&self) {
        self.capture.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_index_parsing() {
        assert_eq!(camera_index(Some("2")), CameraIndex::Index(2));
        assert_eq!(
            camera_index(Some("/dev/video1")),
            CameraIndex::String("/dev/video1".into())
        );
        assert_eq!(camera_index(None), CameraIndex::Index(0));
    }
}
