//! The in-meeting view's state: session plus local devices.
//!
//! [`MeetingRoom`] wires the device inventory and the camera preview
//! controller to the session so that the local participant's
//! `is_video_on` / `is_muted` flags follow the controls. Device and
//! stream failures never close the room; they leave video off and are
//! logged.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use onmeet_media::{DeviceInventory, LocalStreamController, MediaHost, StreamState};
use onmeet_shared::chat::ChatEntry;
use onmeet_shared::error::MediaAcquisitionError;
use onmeet_shared::types::{DeviceKind, DeviceList, Participant, ParticipantId};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::session::MeetingSession;

pub struct MeetingRoom {
    session: MeetingSession,
    inventory: DeviceInventory,
    camera: LocalStreamController,
    selected_camera: Option<String>,
    selected_microphone: Option<String>,
    selected_speaker: Option<String>,
    last_video_error: Option<MediaAcquisitionError>,
}

impl MeetingRoom {
    /// Enter a room with the local participant plus `others`.
    ///
    /// Reads the device inventory once and, if configured, starts the
    /// camera preview on the first camera.
    pub async fn open(
        config: SessionConfig,
        host: Arc<dyn MediaHost>,
        others: Vec<Participant>,
    ) -> Self {
        let start_with_video = config.start_with_video;

        let mut inventory = DeviceInventory::new(host.clone());
        inventory.refresh().await;

        let mut roster = vec![config.local_participant()];
        roster.extend(others);
        let session = MeetingSession::with_roster(config, roster);

        let mut room = Self {
            selected_camera: inventory.default_camera().map(|d| d.device_id.clone()),
            selected_microphone: inventory.default_microphone().map(|d| d.device_id.clone()),
            selected_speaker: inventory.default_speaker().map(|d| d.device_id.clone()),
            session,
            inventory,
            camera: LocalStreamController::new(host),
            last_video_error: None,
        };

        if start_with_video {
            // Recorded in `last_video_error`; the room opens anyway.
            if let Err(e) = room.set_video_enabled(true).await {
                debug!(error = %e, "Room opened with video off");
            }
        }

        info!(
            participants = room.session.participants().len(),
            video = room.video_state().is_active(),
            "Meeting room opened"
        );
        room
    }

    pub fn session(&self) -> &MeetingSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MeetingSession {
        &mut self.session
    }

    pub fn participants(&self) -> &[Participant] {
        self.session.participants()
    }

    pub fn chat(&self) -> &[ChatEntry] {
        self.session.chat().all()
    }

    pub fn local_participant(&self) -> Option<&Participant> {
        self.session.roster().get(self.session.local_id())
    }

    pub fn devices(&self) -> &DeviceList {
        self.inventory.devices()
    }

    pub fn selected_camera(&self) -> Option<&str> {
        self.selected_camera.as_deref()
    }

    pub fn selected_microphone(&self) -> Option<&str> {
        self.selected_microphone.as_deref()
    }

    pub fn selected_speaker(&self) -> Option<&str> {
        self.selected_speaker.as_deref()
    }

    pub fn video_state(&self) -> StreamState {
        self.camera.state()
    }

    /// Preview sink subscription.
    pub fn watch_video(&self) -> watch::Receiver<StreamState> {
        self.camera.subscribe()
    }

    /// Error of the most recent failed camera start, cleared on success.
    pub fn last_video_error(&self) -> Option<&MediaAcquisitionError> {
        self.last_video_error.as_ref()
    }

    pub async fn set_video_enabled(&mut self, enabled: bool) -> Result<StreamState> {
        let result = self
            .camera
            .set_video_enabled(enabled, self.selected_camera.as_deref())
            .await;

        match result {
            Ok(state) => {
                self.last_video_error = None;
                self.sync_local_flags(|me| me.is_video_on = state.is_active());
                Ok(state)
            }
            Err(e) => {
                self.sync_local_flags(|me| me.is_video_on = false);
                self.last_video_error = Some(e.clone());
                Err(e.into())
            }
        }
    }

    pub async fn toggle_video(&mut self) -> Result<StreamState> {
        let on = self.camera.state() != StreamState::Off;
        self.set_video_enabled(!on).await
    }

    /// Choose the preview camera. A running preview moves to the new
    /// device, releasing the old one first.
    pub async fn select_camera(&mut self, device_id: &str) -> Result<StreamState> {
        self.check_device(DeviceKind::VideoInput, device_id)?;
        self.selected_camera = Some(device_id.to_string());
        debug!(device = device_id, "Camera selected");

        if self.camera.state().is_active() {
            self.set_video_enabled(true).await
        } else {
            Ok(self.camera.state())
        }
    }

    pub fn select_microphone(&mut self, device_id: &str) -> Result<()> {
        self.check_device(DeviceKind::AudioInput, device_id)?;
        self.selected_microphone = Some(device_id.to_string());
        debug!(device = device_id, "Microphone selected");
        Ok(())
    }

    pub fn select_speaker(&mut self, device_id: &str) -> Result<()> {
        self.check_device(DeviceKind::AudioOutput, device_id)?;
        self.selected_speaker = Some(device_id.to_string());
        debug!(device = device_id, "Speaker selected");
        Ok(())
    }

    /// Re-read the host's devices. Selections that disappeared fall back
    /// to the first device of their kind.
    pub async fn refresh_devices(&mut self) -> &DeviceList {
        self.inventory.refresh().await;

        reconcile(&mut self.selected_camera, &self.inventory, DeviceKind::VideoInput);
        reconcile(&mut self.selected_microphone, &self.inventory, DeviceKind::AudioInput);
        reconcile(&mut self.selected_speaker, &self.inventory, DeviceKind::AudioOutput);

        self.inventory.devices()
    }

    /// Flip the local microphone mute flag and return the new value.
    pub fn toggle_mute(&mut self) -> Result<bool> {
        let local_id = self.session.local_id().clone();
        let mut muted = false;
        self.session.update_participant(&local_id, |me| {
            me.is_muted = !me.is_muted;
            muted = me.is_muted;
        })?;
        info!(muted, "Mute toggled");
        Ok(muted)
    }

    pub fn invite(&mut self, participant: Participant) {
        self.session.add_participant(participant);
    }

    pub fn leave(&mut self, id: &ParticipantId) -> Result<Participant> {
        self.session.remove_participant(id)
    }

    pub fn send_message(&mut self, text: &str) -> Result<Option<usize>> {
        self.session.send_message(text)
    }

    /// Leave the room: the preview stream is released.
    pub async fn close(&mut self) {
        self.camera.shutdown().await;
        self.sync_local_flags(|me| me.is_video_on = false);
        info!("Meeting room closed");
    }

    fn check_device(&self, kind: DeviceKind, device_id: &str) -> Result<()> {
        if self
            .inventory
            .devices()
            .of_kind(kind)
            .iter()
            .any(|d| d.device_id == device_id)
        {
            Ok(())
        } else {
            Err(SessionError::UnknownDevice(device_id.to_string()))
        }
    }

    fn sync_local_flags(&mut self, f: impl FnOnce(&mut Participant)) {
        let local_id = self.session.local_id().clone();
        if let Err(e) = self.session.update_participant(&local_id, f) {
            debug!(error = %e, "Local participant not in roster");
        }
    }
}

fn reconcile(selected: &mut Option<String>, inventory: &DeviceInventory, kind: DeviceKind) {
    let devices = inventory.devices().of_kind(kind);
    let still_present = selected
        .as_deref()
        .is_some_and(|id| devices.iter().any(|d| d.device_id == id));
    if !still_present {
        let fallback = devices.first().map(|d| d.device_id.clone());
        if selected.is_some() {
            warn!(kind = %kind, previous = ?selected, fallback = ?fallback, "Selected device disappeared");
        }
        *selected = fallback;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onmeet_media::simulated::HostEvent;
    use onmeet_media::SimulatedHost;
    use onmeet_shared::error::DeviceEnumerationError;
    use onmeet_shared::types::MediaDeviceDescriptor;

    fn host() -> Arc<SimulatedHost> {
        Arc::new(SimulatedHost::new(vec![
            MediaDeviceDescriptor::new("cam1", DeviceKind::VideoInput, ""),
            MediaDeviceDescriptor::new("cam2", DeviceKind::VideoInput, "USB"),
            MediaDeviceDescriptor::new("mic1", DeviceKind::AudioInput, ""),
            MediaDeviceDescriptor::new("spk1", DeviceKind::AudioOutput, ""),
        ]))
    }

    async fn open(host: Arc<SimulatedHost>) -> MeetingRoom {
        MeetingRoom::open(
            SessionConfig::default(),
            host,
            vec![Participant::new("1", "Alice").as_host()],
        )
        .await
    }

    #[tokio::test]
    async fn test_open_starts_video_quietly() {
        let host = host();
        let room = open(host.clone()).await;

        assert!(room.chat().is_empty());
        assert_eq!(room.participants().len(), 2);
        assert_eq!(room.selected_camera(), Some("cam1"));
        assert_eq!(room.devices().cameras[0].label, "Camera 1");
        assert!(room.video_state().is_active());
        assert!(room.local_participant().unwrap().is_video_on);
        assert_eq!(host.live_track_count(), 1);
    }

    #[tokio::test]
    async fn test_open_without_devices() {
        let host = host();
        host.fail_enumeration(Some(DeviceEnumerationError::PermissionDenied));
        let room = open(host.clone()).await;

        assert!(room.devices().is_empty());
        assert!(room.selected_camera().is_none());
        // The host still hands out its first camera when asked for any.
        assert!(room.video_state().is_active());
    }

    #[tokio::test]
    async fn test_acquisition_failure_leaves_video_off() {
        let host = host();
        host.fail_acquisition("cam1", MediaAcquisitionError::PermissionDenied);
        let room = open(host.clone()).await;

        assert_eq!(room.video_state(), StreamState::Off);
        assert_eq!(
            room.last_video_error(),
            Some(&MediaAcquisitionError::PermissionDenied)
        );
        assert!(!room.local_participant().unwrap().is_video_on);
        assert!(room.chat().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_video() {
        let host = host();
        let mut room = open(host.clone()).await;

        assert_eq!(room.toggle_video().await.unwrap(), StreamState::Off);
        assert_eq!(host.live_track_count(), 0);
        assert!(!room.local_participant().unwrap().is_video_on);

        assert!(room.toggle_video().await.unwrap().is_active());
        assert_eq!(host.live_track_count(), 1);
    }

    #[tokio::test]
    async fn test_toggle_after_abandoned_enable_turns_video_on() {
        let host = host();
        let config = SessionConfig {
            start_with_video: false,
            ..SessionConfig::default()
        };
        let mut room = MeetingRoom::open(config, host.clone(), Vec::new()).await;

        host.pause_acquisitions();
        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            room.toggle_video(),
        )
        .await;
        assert!(timed_out.is_err());
        assert_eq!(room.video_state(), StreamState::Off);

        host.resume_acquisitions();
        assert!(room.toggle_video().await.unwrap().is_active());
        assert!(room.local_participant().unwrap().is_video_on);
        assert_eq!(host.live_track_count(), 1);
    }

    #[tokio::test]
    async fn test_select_camera_switches_running_preview() {
        let host = host();
        let mut room = open(host.clone()).await;

        let state = room.select_camera("cam2").await.unwrap();
        assert_eq!(state.device_id(), Some("cam2"));
        assert_eq!(host.live_track_count(), 1);

        let events = host.events();
        assert!(matches!(&events[1], HostEvent::Stopped { device_id, .. } if device_id == "cam1"));
        assert!(matches!(&events[2], HostEvent::Acquired { device_id, .. } if device_id == "cam2"));
    }

    #[tokio::test]
    async fn test_select_camera_while_off_only_records_choice() {
        let host = host();
        let config = SessionConfig {
            start_with_video: false,
            ..SessionConfig::default()
        };
        let mut room = MeetingRoom::open(config, host.clone(), vec![]).await;

        assert_eq!(room.select_camera("cam2").await.unwrap(), StreamState::Off);
        assert!(host.events().is_empty());
        assert_eq!(room.set_video_enabled(true).await.unwrap().device_id(), Some("cam2"));
    }

    #[tokio::test]
    async fn test_unknown_devices_rejected() {
        let mut room = open(host()).await;
        assert_eq!(
            room.select_camera("mic1").await.unwrap_err(),
            SessionError::UnknownDevice("mic1".into())
        );
        assert!(room.select_microphone("cam1").is_err());
        assert!(room.select_speaker("spk1").is_ok());
        assert_eq!(room.selected_speaker(), Some("spk1"));
    }

    #[tokio::test]
    async fn test_refresh_devices_reconciles_selection() {
        let host = host();
        let mut room = open(host.clone()).await;
        room.select_camera("cam2").await.unwrap();

        host.set_devices(vec![MediaDeviceDescriptor::new("cam1", DeviceKind::VideoInput, "")]);
        room.refresh_devices().await;

        assert_eq!(room.selected_camera(), Some("cam1"));
        assert!(room.selected_microphone().is_none());
    }

    #[tokio::test]
    async fn test_mute_and_roster_actions() {
        let mut room = open(host()).await;

        assert!(room.toggle_mute().unwrap());
        assert!(room.local_participant().unwrap().is_muted);
        assert!(room.chat().is_empty());

        room.invite(Participant::new("2", "Bob"));
        room.leave(&"1".into()).unwrap();
        let texts: Vec<_> = room.chat().iter().map(|e| e.text()).collect();
        assert_eq!(texts, ["Bob님이 입장하셨습니다", "Alice님이 퇴장하셨습니다"]);
    }

    #[tokio::test]
    async fn test_close_releases_stream() {
        let host = host();
        let mut room = open(host.clone()).await;
        room.send_message("bye").unwrap();
        room.close().await;

        assert_eq!(host.live_track_count(), 0);
        assert_eq!(room.video_state(), StreamState::Off);
        assert_eq!(room.chat().len(), 1);
    }
}
