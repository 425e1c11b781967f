//! # onmeet-demo
//!
//! Runs a scripted meeting through the ONMEET room core and prints the
//! resulting chat feed:
//! - the room opens with a seeded roster and the camera preview on
//! - participants are invited and leave, producing join/leave notices
//! - the local participant chats, mutes, switches camera and leaves

mod config;

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use onmeet_media::{MediaHost, SimulatedHost};
use onmeet_session::{MeetingRoom, SessionConfig, SessionEvent};
use onmeet_shared::chat::ChatEntry;
use onmeet_shared::constants::APP_NAME;
use onmeet_shared::error::MediaAcquisitionError;
use onmeet_shared::types::{DeviceKind, MediaDeviceDescriptor, Participant};

use crate::config::{DemoConfig, HostKind};

/// Participants already in the room when the demo joins.
fn seed_roster() -> Vec<Participant> {
    vec![
        Participant::new("1", "김민수")
            .with_avatar("/avatars/1.png")
            .as_host(),
        Participant::new("2", "이지은").with_avatar("/avatars/2.png"),
        Participant::new("3", "박서준").with_avatar("/avatars/3.png"),
    ]
}

fn simulated_host(config: &DemoConfig) -> SimulatedHost {
    let host = SimulatedHost::new(vec![
        MediaDeviceDescriptor::new("cam-front", DeviceKind::VideoInput, "FaceTime HD Camera"),
        MediaDeviceDescriptor::new("cam-usb", DeviceKind::VideoInput, ""),
        MediaDeviceDescriptor::new("mic-builtin", DeviceKind::AudioInput, ""),
        MediaDeviceDescriptor::new("spk-builtin", DeviceKind::AudioOutput, "Speakers"),
    ]);
    host.set_latency(config.latency);
    if let Some(camera) = &config.fail_camera {
        host.fail_acquisition(camera.clone(), MediaAcquisitionError::PermissionDenied);
    }
    host
}

fn build_host(config: &DemoConfig) -> Arc<dyn MediaHost> {
    match config.host {
        HostKind::Simulated => Arc::new(simulated_host(config)),
        #[cfg(feature = "native")]
        HostKind::Native => Arc::new(onmeet_media::native::NativeHost::new()),
    }
}

#[derive(Serialize)]
struct FeedLine<'a> {
    index: usize,
    #[serde(flatten)]
    entry: &'a ChatEntry,
}

fn print_feed(room: &MeetingRoom, json: bool) -> anyhow::Result<()> {
    for (index, entry) in room.chat().iter().enumerate() {
        if json {
            let line = serde_json::to_string(&FeedLine { index, entry })
                .context("Failed to serialize chat entry")?;
            println!("{line}");
        } else {
            match entry {
                ChatEntry::User(m) => println!("[{}] {}: {}", m.timestamp.format("%H:%M:%S"), m.sender, m.message),
                ChatEntry::System(n) => println!("[{}] * {}", n.timestamp.format("%H:%M:%S"), n.text),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,onmeet_session=debug,onmeet_media=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting {} demo v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let demo_config = DemoConfig::from_env();
    let session_config = SessionConfig::from_env();
    info!(?demo_config, "Loaded demo configuration");

    // -----------------------------------------------------------------------
    // 3. Open the room
    // -----------------------------------------------------------------------
    let host = build_host(&demo_config);
    let mut room = MeetingRoom::open(session_config, host, seed_roster()).await;

    let mut events = room.session().subscribe();
    let scroll = tokio::spawn(async move {
        let mut appended = 0usize;
        while let Ok(event) = events.recv().await {
            if let SessionEvent::ChatAppended { index, .. } = event {
                tracing::trace!(index, "Scroll to newest entry");
                appended += 1;
            }
        }
        appended
    });

    info!(
        cameras = room.devices().cameras.len(),
        microphones = room.devices().microphones.len(),
        speakers = room.devices().speakers.len(),
        video = ?room.video_state(),
        "Room ready"
    );

    // -----------------------------------------------------------------------
    // 4. Scripted meeting
    // -----------------------------------------------------------------------
    room.send_message("안녕하세요, 오늘 회의 시작하겠습니다.")?;
    room.invite(Participant::new("4", "최유나").with_avatar("/avatars/4.png"));
    room.session_mut()
        .receive_message(&"4".into(), "늦어서 죄송합니다!")?;

    room.toggle_mute()?;
    if let Some(camera) = room.devices().cameras.get(1).map(|d| d.device_id.clone()) {
        if let Err(e) = room.select_camera(&camera).await {
            tracing::warn!(error = %e, "Camera switch failed");
        }
    }

    room.leave(&"3".into())?;
    room.session_mut().apply_roster_changes(|batch| {
        batch.add(Participant::new("5", "정하늘"));
        batch.remove(&"2".into());
    });
    room.send_message("다음 주에 다시 뵙겠습니다.")?;

    room.close().await;

    // -----------------------------------------------------------------------
    // 5. Output
    // -----------------------------------------------------------------------
    print_feed(&room, demo_config.json)?;

    drop(room);
    let appended = scroll.await.context("Event listener task failed")?;
    info!(appended, "Demo finished");

    Ok(())
}
