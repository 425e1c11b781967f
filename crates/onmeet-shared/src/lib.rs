//! # onmeet-shared
//!
//! Domain types shared by the ONMEET media and session crates: meeting
//! participants, chat entries, media device descriptors, and the error
//! taxonomy of the meeting-room core.

pub mod chat;
pub mod constants;
pub mod error;
pub mod types;
