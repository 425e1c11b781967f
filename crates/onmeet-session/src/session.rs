//! Roster, diff engine and chat log of one meeting.
//!
//! Every roster mutation made through [`MeetingSession`] is followed by a
//! single "roster changed" step: the diff engine observes the new roster
//! once and its notices are appended to the chat log. Batched mutations
//! are observed once per batch.

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info};

use onmeet_shared::chat::{ChatEntry, MessageId, UserMessage};
use onmeet_shared::types::{Participant, ParticipantId};

use crate::chat::ChatLog;
use crate::config::SessionConfig;
use crate::diff::{DiffPolicy, RosterDiffEngine};
use crate::error::{Result, SessionError};
use crate::events::{create_event_bus, emit_event, EventReceiver, EventSender, SessionEvent};
use crate::roster::{RosterBatch, RosterSnapshot, RosterStore};

pub struct MeetingSession {
    config: SessionConfig,
    roster: RosterStore,
    diff: RosterDiffEngine,
    chat: ChatLog,
    events: EventSender,
}

impl MeetingSession {
    pub fn new(config: SessionConfig) -> Self {
        let (events, _) = create_event_bus(config.event_capacity);
        let diff = RosterDiffEngine::new(DiffPolicy {
            emit_join_notices_on_initial_snapshot: config.emit_join_notices_on_initial_snapshot,
        });
        Self {
            config,
            roster: RosterStore::new(),
            diff,
            chat: ChatLog::new(),
            events,
        }
    }

    /// Start a session whose first observed roster is `initial`.
    pub fn with_roster(config: SessionConfig, initial: Vec<Participant>) -> Self {
        let mut session = Self::new(config);
        session.replace_roster(initial);
        session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.config.local_id
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn watch_roster(&self) -> watch::Receiver<RosterSnapshot> {
        self.roster.subscribe()
    }

    pub fn roster(&self) -> &RosterStore {
        &self.roster
    }

    pub fn participants(&self) -> &[Participant] {
        self.roster.current()
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn add_participant(&mut self, participant: Participant) {
        self.roster.add(participant);
        self.on_roster_changed();
    }

    pub fn remove_participant(&mut self, id: &ParticipantId) -> Result<Participant> {
        let removed = self
            .roster
            .remove(id)
            .ok_or_else(|| SessionError::ParticipantNotFound(id.clone()))?;
        self.on_roster_changed();
        Ok(removed)
    }

    pub fn update_participant(
        &mut self,
        id: &ParticipantId,
        f: impl FnOnce(&mut Participant),
    ) -> Result<()> {
        if !self.roster.update(id, f) {
            return Err(SessionError::ParticipantNotFound(id.clone()));
        }
        self.on_roster_changed();
        Ok(())
    }

    /// Apply several roster mutations as one observed change.
    pub fn apply_roster_changes(&mut self, f: impl FnOnce(&mut RosterBatch<'_>)) -> bool {
        let changed = self.roster.batch(f);
        if changed {
            self.on_roster_changed();
        }
        changed
    }

    /// Swap in a complete roster from an external source.
    pub fn replace_roster(&mut self, participants: Vec<Participant>) {
        let changed = self.roster.batch(|b| {
            b.clear();
            for p in participants {
                b.add(p);
            }
        });
        // An empty first roster still sets the diff baseline.
        if changed || !self.diff.has_baseline() {
            self.on_roster_changed();
        }
    }

    /// Send a message as the local participant.
    ///
    /// Blank input is ignored and returns `Ok(None)`; otherwise returns the
    /// chat index of the new entry.
    pub fn send_message(&mut self, text: &str) -> Result<Option<usize>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        self.check_length(text)?;

        let message = UserMessage {
            id: MessageId::new(),
            sender: self.config.local_name.clone(),
            avatar: self.config.local_avatar.clone(),
            message: text.to_string(),
            timestamp: Utc::now(),
            is_own: true,
        };
        Ok(Some(self.push_entry(message.into())))
    }

    /// Record a message from a roster member.
    ///
    /// Input is trimmed and blank messages are ignored, as for
    /// [`send_message`](Self::send_message).
    pub fn receive_message(&mut self, sender: &ParticipantId, text: &str) -> Result<Option<usize>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        self.check_length(text)?;
        let author = self
            .roster
            .get(sender)
            .ok_or_else(|| SessionError::ParticipantNotFound(sender.clone()))?;

        let message = UserMessage {
            id: MessageId::new(),
            sender: author.name.clone(),
            avatar: author.avatar.clone(),
            message: text.to_string(),
            timestamp: Utc::now(),
            is_own: sender == &self.config.local_id,
        };
        Ok(Some(self.push_entry(message.into())))
    }

    fn check_length(&self, text: &str) -> Result<()> {
        let len = text.chars().count();
        if len > self.config.max_message_chars {
            return Err(SessionError::MessageTooLong {
                len,
                max: self.config.max_message_chars,
            });
        }
        Ok(())
    }

    fn on_roster_changed(&mut self) {
        let notices = self.diff.observe(self.roster.current(), Utc::now());
        if !notices.is_empty() {
            info!(count = notices.len(), "Roster notices synthesized");
        }
        for notice in notices {
            self.push_entry(notice.into());
        }

        emit_event(
            &self.events,
            SessionEvent::RosterChanged {
                revision: self.roster.revision(),
                participant_count: self.roster.len(),
            },
        );
    }

    fn push_entry(&mut self, entry: ChatEntry) -> usize {
        let index = self.chat.append(entry.clone());
        debug!(index, id = %entry.id(), system = entry.is_system(), "Chat entry appended");
        emit_event(&self.events, SessionEvent::ChatAppended { index, entry });
        index
    }
}
