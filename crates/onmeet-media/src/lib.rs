//! # onmeet-media
//!
//! Local media for the meeting room: enumerating the host's cameras,
//! microphones and speakers, and owning the single camera preview stream.
//!
//! The host is reached through the [`MediaHost`] trait so that the
//! inventory and the stream controller can run against
//! [`SimulatedHost`] in tests and demos, or against the platform's
//! devices with the `native` feature.

pub mod capture;
pub mod devices;
pub mod host;
#[cfg(feature = "native")]
pub mod native;
pub mod simulated;
pub mod stream;

pub use devices::DeviceInventory;
pub use host::{LocalStream, MediaHost, MediaTrack, StreamId, TrackState, VideoConstraints};
pub use simulated::SimulatedHost;
pub use stream::{LocalStreamController, StreamState};
