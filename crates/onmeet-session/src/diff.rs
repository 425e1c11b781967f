//! Join/leave notices from roster membership changes.
//!
//! The engine keeps a private copy of the last roster it observed and
//! compares each new observation against it by participant id. Field
//! changes on a participant present in both (mute, video) produce
//! nothing.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use onmeet_shared::chat::SystemNotice;
use onmeet_shared::error::RosterConsistencyWarning;
use onmeet_shared::types::{Participant, ParticipantId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffPolicy {
    /// Announce everyone in the first observed roster as joined instead of
    /// taking it as a silent baseline.
    pub emit_join_notices_on_initial_snapshot: bool,
}

/// Membership delta between two rosters.
#[derive(Debug, Default)]
pub struct RosterDiff<'a> {
    /// In `current` order.
    pub joined: Vec<&'a Participant>,
    /// In `previous` order.
    pub left: Vec<&'a Participant>,
    pub warnings: Vec<RosterConsistencyWarning>,
}

impl RosterDiff<'_> {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }

    /// Join notices followed by leave notices, all stamped `at`.
    pub fn notices(&self, at: DateTime<Utc>) -> Vec<SystemNotice> {
        self.joined
            .iter()
            .map(|p| SystemNotice::joined(&p.name, at))
            .chain(self.left.iter().map(|p| SystemNotice::left(&p.name, at)))
            .collect()
    }
}

/// Compute who joined and who left by id membership.
///
/// Duplicate or empty ids in `current` are reported as warnings; they do
/// not change the result.
pub fn diff<'a>(previous: &'a [Participant], current: &'a [Participant]) -> RosterDiff<'a> {
    let previous_ids: HashSet<&ParticipantId> = previous.iter().map(|p| &p.id).collect();
    let current_ids: HashSet<&ParticipantId> = current.iter().map(|p| &p.id).collect();

    let joined = current
        .iter()
        .filter(|p| !previous_ids.contains(&p.id))
        .collect();
    let left = previous
        .iter()
        .filter(|p| !current_ids.contains(&p.id))
        .collect();

    RosterDiff {
        joined,
        left,
        warnings: consistency_warnings(current),
    }
}

fn consistency_warnings(roster: &[Participant]) -> Vec<RosterConsistencyWarning> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut warnings = Vec::new();

    for p in roster {
        if p.id.is_empty() {
            warnings.push(RosterConsistencyWarning::MissingId {
                name: p.name.clone(),
            });
        } else if !seen.insert(&p.id) && reported.insert(&p.id) {
            warnings.push(RosterConsistencyWarning::DuplicateId(p.id.clone()));
        }
    }
    warnings
}

pub struct RosterDiffEngine {
    policy: DiffPolicy,
    /// `None` until the first observation.
    previous: Option<Vec<Participant>>,
}

impl RosterDiffEngine {
    pub fn new(policy: DiffPolicy) -> Self {
        Self {
            policy,
            previous: None,
        }
    }

    pub fn policy(&self) -> DiffPolicy {
        self.policy
    }

    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }

    /// Process one observed roster state and return the notices it
    /// produces. The observed roster becomes the new baseline.
    pub fn observe(&mut self, current: &[Participant], at: DateTime<Utc>) -> Vec<SystemNotice> {
        let notices = match &self.previous {
            None if !self.policy.emit_join_notices_on_initial_snapshot => {
                debug!(participants = current.len(), "Roster baseline set");
                log_warnings(&consistency_warnings(current));
                Vec::new()
            }
            previous => {
                let previous = previous.as_deref().unwrap_or_default();
                let delta = diff(previous, current);
                log_warnings(&delta.warnings);
                if !delta.is_empty() {
                    debug!(
                        joined = delta.joined.len(),
                        left = delta.left.len(),
                        "Roster membership changed"
                    );
                }
                delta.notices(at)
            }
        };

        self.previous = Some(current.to_vec());
        notices
    }

    /// Forget the baseline; the next observation counts as the first.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

impl Default for RosterDiffEngine {
    fn default() -> Self {
        Self::new(DiffPolicy::default())
    }
}

fn log_warnings(warnings: &[RosterConsistencyWarning]) {
    for w in warnings {
        warn!(warning = %w, "Roster consistency warning");
    }
}
