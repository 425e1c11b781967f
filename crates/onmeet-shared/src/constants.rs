/// Application name
pub const APP_NAME: &str = "ONMEET";

/// Suffix appended to a participant's name in a join notice
pub const JOIN_NOTICE_SUFFIX: &str = "님이 입장하셨습니다";

/// Suffix appended to a participant's name in a leave notice
pub const LEAVE_NOTICE_SUFFIX: &str = "님이 퇴장하셨습니다";

/// Positional label prefixes used when the host withholds device labels
pub const CAMERA_LABEL_PREFIX: &str = "Camera";
pub const MICROPHONE_LABEL_PREFIX: &str = "Microphone";
pub const SPEAKER_LABEL_PREFIX: &str = "Speaker";

/// Maximum chat message length in characters
pub const MAX_CHAT_MESSAGE_CHARS: usize = 2000;

/// Capacity of the session event broadcast channel
pub const SESSION_EVENT_CAPACITY: usize = 256;

/// Default camera preview constraints
pub const DEFAULT_PREVIEW_WIDTH: u32 = 1280;
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 720;
pub const DEFAULT_PREVIEW_FPS: u32 = 30;
