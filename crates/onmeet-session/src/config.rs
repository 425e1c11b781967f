//! Session configuration loaded from environment variables.
//!
//! Every setting has a default so a session can start with no
//! configuration at all.

use onmeet_shared::constants::{MAX_CHAT_MESSAGE_CHARS, SESSION_EVENT_CAPACITY};
use onmeet_shared::types::{Participant, ParticipantId};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Id of the local participant.
    /// Env: `ONMEET_LOCAL_ID`
    /// Default: `"me"`
    pub local_id: ParticipantId,

    /// Display name of the local participant.
    /// Env: `ONMEET_LOCAL_NAME`
    /// Default: `"나"`
    pub local_name: String,

    /// Avatar URL of the local participant.
    /// Env: `ONMEET_LOCAL_AVATAR`
    pub local_avatar: String,

    /// Whether the first roster observation announces everyone already
    /// present. Off by default so joining a full room is quiet.
    /// Env: `ONMEET_JOIN_NOTICES_ON_INITIAL_SNAPSHOT` (true/false)
    pub emit_join_notices_on_initial_snapshot: bool,

    /// Longest accepted chat message, in characters.
    /// Env: `ONMEET_MAX_MESSAGE_CHARS`
    pub max_message_chars: usize,

    /// Capacity of the session event broadcast channel.
    pub event_capacity: usize,

    /// Whether the camera preview starts on when the room opens.
    /// Env: `ONMEET_START_WITH_VIDEO` (true/false)
    /// Default: `true`
    pub start_with_video: bool,

    /// Whether the microphone starts muted.
    /// Env: `ONMEET_START_MUTED` (true/false)
    /// Default: `false`
    pub start_muted: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_id: ParticipantId::from("me"),
            local_name: "나".to_string(),
            local_avatar: String::new(),
            emit_join_notices_on_initial_snapshot: false,
            max_message_chars: MAX_CHAT_MESSAGE_CHARS,
            event_capacity: SESSION_EVENT_CAPACITY,
            start_with_video: true,
            start_muted: false,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(id) = lookup("ONMEET_LOCAL_ID") {
            if id.trim().is_empty() {
                tracing::warn!("Empty ONMEET_LOCAL_ID, using default");
            } else {
                config.local_id = ParticipantId::new(id);
            }
        }

        if let Some(name) = lookup("ONMEET_LOCAL_NAME") {
            config.local_name = name;
        }

        if let Some(avatar) = lookup("ONMEET_LOCAL_AVATAR") {
            config.local_avatar = avatar;
        }

        if let Some(val) = lookup("ONMEET_JOIN_NOTICES_ON_INITIAL_SNAPSHOT") {
            config.emit_join_notices_on_initial_snapshot = parse_flag(&val);
        }

        if let Some(val) = lookup("ONMEET_MAX_MESSAGE_CHARS") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_message_chars = n,
                _ => tracing::warn!(value = %val, "Invalid ONMEET_MAX_MESSAGE_CHARS, using default"),
            }
        }

        if let Some(val) = lookup("ONMEET_START_WITH_VIDEO") {
            config.start_with_video = parse_flag(&val);
        }

        if let Some(val) = lookup("ONMEET_START_MUTED") {
            config.start_muted = parse_flag(&val);
        }

        config
    }

    /// Roster entry for the local participant.
    pub fn local_participant(&self) -> Participant {
        let mut me = Participant::new(self.local_id.clone(), self.local_name.clone())
            .with_avatar(self.local_avatar.clone());
        me.is_muted = self.start_muted;
        me
    }
}

fn parse_flag(val: &str) -> bool {
    val != "false" && val != "0"
}
