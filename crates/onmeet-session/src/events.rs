use serde::Serialize;
use tokio::sync::broadcast;

use onmeet_shared::chat::ChatEntry;

pub const EVENT_CHAT_APPENDED: &str = "chat-appended";
pub const EVENT_ROSTER_CHANGED: &str = "roster-changed";

/// Events published to the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum SessionEvent {
    /// An entry was appended; views scroll to `index`.
    ChatAppended { index: usize, entry: ChatEntry },
    RosterChanged { revision: u64, participant_count: usize },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChatAppended { .. } => EVENT_CHAT_APPENDED,
            Self::RosterChanged { .. } => EVENT_ROSTER_CHANGED,
        }
    }
}

pub type EventSender = broadcast::Sender<SessionEvent>;
pub type EventReceiver = broadcast::Receiver<SessionEvent>;

pub fn create_event_bus(capacity: usize) -> (EventSender, EventReceiver) {
    broadcast::channel(capacity.max(1))
}

/// Publish an event. Having no subscribers is normal.
pub fn emit_event(tx: &EventSender, event: SessionEvent) {
    let name = event.name();
    if tx.send(event).is_err() {
        tracing::trace!(event = name, "No session event subscribers");
    }
}
