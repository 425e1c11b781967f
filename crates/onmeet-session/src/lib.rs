//! # onmeet-session
//!
//! In-meeting client state: who is in the room, what was said, and the
//! join/leave notices synthesized from roster changes.
//!
//! [`MeetingSession`] owns the roster, the diff engine and the chat log,
//! and runs the diff once per observed roster change. [`MeetingRoom`]
//! adds the local device inventory and camera preview on top.

pub mod chat;
pub mod config;
pub mod diff;
pub mod events;
pub mod roster;
pub mod room;
pub mod session;

mod error;

pub use chat::ChatLog;
pub use config::SessionConfig;
pub use diff::{DiffPolicy, RosterDiff, RosterDiffEngine};
pub use error::SessionError;
pub use events::SessionEvent;
pub use roster::{RosterSnapshot, RosterStore};
pub use room::MeetingRoom;
pub use session::MeetingSession;
