use serde::{Deserialize, Serialize};

/// Identifier of a participant, stable for the lifetime of their session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A member of a meeting roster.
///
/// `is_muted` and `is_video_on` reflect the last known device state only;
/// nothing synchronises them with a remote transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Image URL, decorative only.
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub is_host: bool,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub is_video_on: bool,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: String::new(),
            is_host: false,
            is_muted: false,
            is_video_on: false,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = avatar.into();
        self
    }

    pub fn as_host(mut self) -> Self {
        self.is_host = true;
        self
    }
}

/// Kind of a host media device, named after the browser `MediaDeviceInfo.kind` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    #[serde(rename = "videoinput")]
    VideoInput,
    #[serde(rename = "audioinput")]
    AudioInput,
    #[serde(rename = "audiooutput")]
    AudioOutput,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VideoInput => "videoinput",
            Self::AudioInput => "audioinput",
            Self::AudioOutput => "audiooutput",
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata identifying a camera, microphone, or speaker available to the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaDeviceDescriptor {
    pub device_id: String,
    pub kind: DeviceKind,
    /// Empty when the host has not granted label access.
    #[serde(default)]
    pub label: String,
}

impl MediaDeviceDescriptor {
    pub fn new(device_id: impl Into<String>, kind: DeviceKind, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            kind,
            label: label.into(),
        }
    }
}

/// Devices available to the host, partitioned by kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceList {
    pub cameras: Vec<MediaDeviceDescriptor>,
    pub microphones: Vec<MediaDeviceDescriptor>,
    pub speakers: Vec<MediaDeviceDescriptor>,
}

impl DeviceList {
    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty() && self.microphones.is_empty() && self.speakers.is_empty()
    }

    pub fn of_kind(&self, kind: DeviceKind) -> &[MediaDeviceDescriptor] {
        match kind {
            DeviceKind::VideoInput => &self.cameras,
            DeviceKind::AudioInput => &self.microphones,
            DeviceKind::AudioOutput => &self.speakers,
        }
    }

    /// Look up a device of any kind by id.
    pub fn find(&self, device_id: &str) -> Option<&MediaDeviceDescriptor> {
        self.cameras
            .iter()
            .chain(&self.microphones)
            .chain(&self.speakers)
            .find(|d| d.device_id == device_id)
    }
}
