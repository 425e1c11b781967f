//! Participant roster.
//!
//! Holds the current participants in insertion order and publishes a
//! [`RosterSnapshot`] on a `watch` channel after every successful
//! mutation. Watchers only ever see the latest snapshot, so a burst of
//! mutations between two reads coalesces into one observed change.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use onmeet_shared::types::{Participant, ParticipantId};

/// Immutable view of the roster at one revision.
#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    pub revision: u64,
    pub participants: Arc<[Participant]>,
}

impl Default for RosterSnapshot {
    fn default() -> Self {
        Self {
            revision: 0,
            participants: Arc::from(Vec::new()),
        }
    }
}

impl RosterSnapshot {
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

pub struct RosterStore {
    participants: Vec<Participant>,
    revision: u64,
    tx: watch::Sender<RosterSnapshot>,
}

impl RosterStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RosterSnapshot::default());
        Self {
            participants: Vec::new(),
            revision: 0,
            tx,
        }
    }

    /// Append a participant. Ids are not deduplicated.
    pub fn add(&mut self, participant: Participant) {
        debug!(id = %participant.id, name = %participant.name, "Roster add");
        self.participants.push(participant);
        self.publish();
    }

    /// Remove every participant with this id. Returns the first one removed.
    pub fn remove(&mut self, id: &ParticipantId) -> Option<Participant> {
        let removed = remove_all(&mut self.participants, id);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    /// Apply a field-level change to a participant.
    ///
    /// Returns `false` when the id is unknown.
    pub fn update(&mut self, id: &ParticipantId, f: impl FnOnce(&mut Participant)) -> bool {
        match self.participants.iter_mut().find(|p| &p.id == id) {
            Some(p) => {
                f(p);
                self.publish();
                true
            }
            None => false,
        }
    }

    /// Apply several mutations and publish a single snapshot.
    ///
    /// Returns whether anything changed.
    pub fn batch(&mut self, f: impl FnOnce(&mut RosterBatch<'_>)) -> bool {
        let mut batch = RosterBatch {
            participants: &mut self.participants,
            changed: false,
        };
        f(&mut batch);
        let changed = batch.changed;
        if changed {
            self.publish();
        }
        changed
    }

    pub fn current(&self) -> &[Participant] {
        &self.participants
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Incremented on every published change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RosterSnapshot> {
        self.tx.subscribe()
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.tx.send_replace(RosterSnapshot {
            revision: self.revision,
            participants: Arc::from(self.participants.as_slice()),
        });
    }
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutation handle passed to [`RosterStore::batch`].
pub struct RosterBatch<'a> {
    participants: &'a mut Vec<Participant>,
    changed: bool,
}

impl RosterBatch<'_> {
    pub fn add(&mut self, participant: Participant) {
        self.participants.push(participant);
        self.changed = true;
    }

    pub fn remove(&mut self, id: &ParticipantId) -> Option<Participant> {
        let removed = remove_all(self.participants, id);
        self.changed |= removed.is_some();
        removed
    }

    pub fn clear(&mut self) {
        self.changed |= !self.participants.is_empty();
        self.participants.clear();
    }

    pub fn update(&mut self, id: &ParticipantId, f: impl FnOnce(&mut Participant)) -> bool {
        match self.participants.iter_mut().find(|p| &p.id == id) {
            Some(p) => {
                f(p);
                self.changed = true;
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> &[Participant] {
        self.participants.as_slice()
    }
}

fn remove_all(participants: &mut Vec<Participant>, id: &ParticipantId) -> Option<Participant> {
    let pos = participants.iter().position(|p| &p.id == id)?;
    let first = participants.remove(pos);
    participants.retain(|p| &p.id != id);
    Some(first)
}
