use thiserror::Error;

use onmeet_shared::error::MediaAcquisitionError;
use onmeet_shared::types::ParticipantId;

/// Errors produced by session operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Message exceeds the configured length limit.
    #[error("Message too long: {len} characters (max {max})")]
    MessageTooLong { len: usize, max: usize },

    /// No participant with this id is in the roster.
    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// Device id not present in the inventory.
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// Camera could not be started.
    #[error("Media error: {0}")]
    Media(#[from] MediaAcquisitionError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SessionError>;
