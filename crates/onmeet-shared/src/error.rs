use thiserror::Error;

use crate::types::ParticipantId;

/// Host device listing failed.
///
/// Callers recover by falling back to empty device lists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceEnumerationError {
    #[error("No media subsystem available")]
    Unavailable,

    #[error("Permission to list media devices was denied")]
    PermissionDenied,

    #[error("Device enumeration failed: {0}")]
    Host(String),
}

/// Acquiring a local capture stream failed.
///
/// Never fatal: the stream controller stays `Off`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaAcquisitionError {
    #[error("Permission to use the camera was denied")]
    PermissionDenied,

    #[error("No video device available")]
    NoDevice,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device is busy: {0}")]
    DeviceBusy(String),

    #[error("Device removed during acquisition: {0}")]
    DeviceRemoved(String),

    #[error("Acquisition superseded by a newer request")]
    Superseded,

    #[error("Media capture error: {0}")]
    Capture(String),
}

/// Inconsistent roster contents observed while diffing.
///
/// Logged, never raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterConsistencyWarning {
    #[error("Participant id {0} appears more than once in the roster")]
    DuplicateId(ParticipantId),

    #[error("Participant {name:?} has an empty id")]
    MissingId { name: String },
}
