use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{JOIN_NOTICE_SUFFIX, LEAVE_NOTICE_SUFFIX};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message typed by a meeting participant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage {
    pub id: MessageId,
    pub sender: String,
    pub avatar: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Whether the local participant sent it
    pub is_own: bool,
}

/// A notice synthesized by the system, e.g. a join or leave announcement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SystemNotice {
    pub id: MessageId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl SystemNotice {
    pub fn new(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            timestamp,
        }
    }

    pub fn joined(name: &str, timestamp: DateTime<Utc>) -> Self {
        Self::new(join_notice_text(name), timestamp)
    }

    pub fn left(name: &str, timestamp: DateTime<Utc>) -> Self {
        Self::new(leave_notice_text(name), timestamp)
    }
}

/// One entry of the chat log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChatEntry {
    User(UserMessage),
    System(SystemNotice),
}

impl ChatEntry {
    pub fn id(&self) -> MessageId {
        match self {
            Self::User(m) => m.id,
            Self::System(n) => n.id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::User(m) => m.timestamp,
            Self::System(n) => n.timestamp,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }

    /// Text shown for the entry: the message body or the notice.
    pub fn text(&self) -> &str {
        match self {
            Self::User(m) => &m.message,
            Self::System(n) => &n.text,
        }
    }
}

impl From<UserMessage> for ChatEntry {
    fn from(m: UserMessage) -> Self {
        Self::User(m)
    }
}

impl From<SystemNotice> for ChatEntry {
    fn from(n: SystemNotice) -> Self {
        Self::System(n)
    }
}

pub fn join_notice_text(name: &str) -> String {
    format!("{name}{JOIN_NOTICE_SUFFIX}")
}

pub fn leave_notice_text(name: &str) -> String {
    format!("{name}{LEAVE_NOTICE_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_texts() {
        assert_eq!(join_notice_text("Bob"), "Bob님이 입장하셨습니다");
        assert_eq!(leave_notice_text("Bob"), "Bob님이 퇴장하셨습니다");
    }

    #[test]
    fn test_system_entry_is_tagged() {
        let entry: ChatEntry = SystemNotice::joined("Alice", Utc::now()).into();
        assert!(entry.is_system());
        assert_eq!(entry.text(), "Alice님이 입장하셨습니다");

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "system");
        assert_eq!(json["text"], "Alice님이 입장하셨습니다");
    }

    #[test]
    fn test_message_ids_are_unique() {
        let now = Utc::now();
        let a = SystemNotice::left("A", now);
        let b = SystemNotice::left("A", now);
        assert_ne!(a.id, b.id);
    }
}
