//! Camera, microphone and speaker inventory.
//!
//! The inventory is read once when the meeting room opens and again on
//! every explicit [`DeviceInventory::refresh`]; there is no hotplug
//! subscription.

use std::sync::Arc;

use tracing::{debug, warn};

use onmeet_shared::constants::{CAMERA_LABEL_PREFIX, MICROPHONE_LABEL_PREFIX, SPEAKER_LABEL_PREFIX};
use onmeet_shared::error::DeviceEnumerationError;
use onmeet_shared::types::{DeviceKind, DeviceList, MediaDeviceDescriptor};

use crate::host::MediaHost;

pub struct DeviceInventory {
    host: Arc<dyn MediaHost>,
    devices: DeviceList,
    last_error: Option<DeviceEnumerationError>,
}

impl DeviceInventory {
    /// Create an empty inventory. Nothing is read until the first refresh.
    pub fn new(host: Arc<dyn MediaHost>) -> Self {
        Self {
            host,
            devices: DeviceList::default(),
            last_error: None,
        }
    }

    /// Read the host's devices without touching the cached list.
    pub async fn list_devices(&self) -> Result<DeviceList, DeviceEnumerationError> {
        let raw = self.host.enumerate_devices().await?;
        Ok(partition_devices(raw))
    }

    /// Re-read the host, caching the result. On failure the cache is
    /// cleared and the error returned.
    pub async fn try_refresh(&mut self) -> Result<&DeviceList, DeviceEnumerationError> {
        match self.list_devices().await {
            Ok(devices) => {
                debug!(
                    cameras = devices.cameras.len(),
                    microphones = devices.microphones.len(),
                    speakers = devices.speakers.len(),
                    "Device inventory refreshed"
                );
                self.devices = devices;
                self.last_error = None;
                Ok(&self.devices)
            }
            Err(e) => {
                self.devices = DeviceList::default();
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Re-read the host, degrading to empty lists when enumeration fails.
    pub async fn refresh(&mut self) -> &DeviceList {
        if let Err(e) = self.try_refresh().await {
            warn!(error = %e, "Device enumeration failed, continuing without devices");
        }
        &self.devices
    }

    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    /// Error of the most recent refresh, if it failed.
    pub fn last_error(&self) -> Option<&DeviceEnumerationError> {
        self.last_error.as_ref()
    }

    pub fn default_camera(&self) -> Option<&MediaDeviceDescriptor> {
        self.devices.cameras.first()
    }

    pub fn default_microphone(&self) -> Option<&MediaDeviceDescriptor> {
        self.devices.microphones.first()
    }

    pub fn default_speaker(&self) -> Option<&MediaDeviceDescriptor> {
        self.devices.speakers.first()
    }

    pub fn find(&self, device_id: &str) -> Option<&MediaDeviceDescriptor> {
        self.devices.find(device_id)
    }
}

/// Split a host listing by kind, keeping host order and filling blank
/// labels with "Camera N" style positional names.
pub fn partition_devices(raw: Vec<MediaDeviceDescriptor>) -> DeviceList {
    let mut list = DeviceList::default();

    for mut device in raw {
        let (bucket, prefix) = match device.kind {
            DeviceKind::VideoInput => (&mut list.cameras, CAMERA_LABEL_PREFIX),
            DeviceKind::AudioInput => (&mut list.microphones, MICROPHONE_LABEL_PREFIX),
            DeviceKind::AudioOutput => (&mut list.speakers, SPEAKER_LABEL_PREFIX),
        };
        if device.label.trim().is_empty() {
            device.label = format!("{} {}", prefix, bucket.len() + 1);
        }
        bucket.push(device);
    }

    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedHost;

    fn inventory(host: SimulatedHost) -> DeviceInventory {
        DeviceInventory::new(Arc::new(host))
    }

    #[tokio::test]
    async fn test_single_camera_host() {
        let host = SimulatedHost::new(vec![MediaDeviceDescriptor::new(
            "cam1",
            DeviceKind::VideoInput,
            "",
        )]);
        let inv = inventory(host);

        let devices = inv.list_devices().await.unwrap();
        assert_eq!(devices.cameras.len(), 1);
        assert_eq!(devices.cameras[0].device_id, "cam1");
        assert!(devices.microphones.is_empty());
        assert!(devices.speakers.is_empty());
    }

    #[test]
    fn test_positional_labels_fill_blanks_only() {
        let list = partition_devices(vec![
            MediaDeviceDescriptor::new("a", DeviceKind::AudioInput, ""),
            MediaDeviceDescriptor::new("b", DeviceKind::VideoInput, "Built-in"),
            MediaDeviceDescriptor::new("c", DeviceKind::AudioInput, "USB Mic"),
            MediaDeviceDescriptor::new("d", DeviceKind::VideoInput, " "),
            MediaDeviceDescriptor::new("e", DeviceKind::AudioOutput, ""),
        ]);

        assert_eq!(list.microphones[0].label, "Microphone 1");
        assert_eq!(list.microphones[1].label, "USB Mic");
        assert_eq!(list.cameras[0].label, "Built-in");
        assert_eq!(list.cameras[1].label, "Camera 2");
        assert_eq!(list.speakers[0].label, "Speaker 1");
    }

    #[tokio::test]
    async fn test_refresh_degrades_to_empty_on_failure() {
        let host = Arc::new(SimulatedHost::with_default_devices());
        let mut inv = DeviceInventory::new(host.clone());

        assert_eq!(inv.refresh().await.cameras.len(), 1);
        assert_eq!(inv.default_camera().map(|d| d.device_id.as_str()), Some("cam1"));

        host.fail_enumeration(Some(DeviceEnumerationError::PermissionDenied));
        assert!(inv.refresh().await.is_empty());
        assert_eq!(inv.last_error(), Some(&DeviceEnumerationError::PermissionDenied));
        assert!(inv.default_camera().is_none());

        host.fail_enumeration(None);
        assert!(!inv.refresh().await.is_empty());
        assert!(inv.last_error().is_none());
    }

    #[tokio::test]
    async fn test_try_refresh_reports_error() {
        let host = SimulatedHost::with_default_devices();
        host.fail_enumeration(Some(DeviceEnumerationError::Unavailable));
        let mut inv = inventory(host);
        assert_eq!(
            inv.try_refresh().await.unwrap_err(),
            DeviceEnumerationError::Unavailable
        );
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_devices() {
        let host = Arc::new(SimulatedHost::new(vec![]));
        let mut inv = DeviceInventory::new(host.clone());
        assert!(inv.refresh().await.is_empty());

        host.set_devices(vec![MediaDeviceDescriptor::new(
            "mic7",
            DeviceKind::AudioInput,
            "Headset",
        )]);
        inv.refresh().await;
        assert_eq!(inv.find("mic7").map(|d| d.label.as_str()), Some("Headset"));
        assert_eq!(inv.default_microphone().map(|d| d.device_id.as_str()), Some("mic7"));
        assert!(inv.default_speaker().is_none());
    }
}
