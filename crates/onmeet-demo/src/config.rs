//! Demo configuration loaded from environment variables.

use std::time::Duration;

/// Which media host drives the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Simulated,
    #[cfg(feature = "native")]
    Native,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Env: `ONMEET_DEMO_HOST` (`simulated` or, with the `native`
    /// feature, `native`)
    /// Default: `simulated`
    pub host: HostKind,

    /// Artificial delay of simulated camera acquisitions.
    /// Env: `ONMEET_DEMO_LATENCY_MS`
    pub latency: Option<Duration>,

    /// Simulated camera that refuses to open, to exercise the failure path.
    /// Env: `ONMEET_DEMO_FAIL_CAMERA`
    pub fail_camera: Option<String>,

    /// Print the chat feed as JSON lines instead of text.
    /// Env: `ONMEET_DEMO_JSON` (true/false)
    /// Default: `false`
    pub json: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            host: HostKind::Simulated,
            latency: None,
            fail_camera: None,
            json: false,
        }
    }
}

impl DemoConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ONMEET_DEMO_HOST") {
            match parse_host(&val) {
                Some(host) => config.host = host,
                None => tracing::warn!(value = %val, "Unknown ONMEET_DEMO_HOST, using simulated host"),
            }
        }

        if let Ok(val) = std::env::var("ONMEET_DEMO_LATENCY_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.latency = Some(Duration::from_millis(ms)),
                Err(_) => tracing::warn!(value = %val, "Invalid ONMEET_DEMO_LATENCY_MS, ignoring"),
            }
        }

        if let Ok(val) = std::env::var("ONMEET_DEMO_FAIL_CAMERA") {
            if !val.is_empty() {
                config.fail_camera = Some(val);
            }
        }

        if let Ok(val) = std::env::var("ONMEET_DEMO_JSON") {
            config.json = val != "false" && val != "0";
        }

        config
    }
}

fn parse_host(val: &str) -> Option<HostKind> {
    match val.trim().to_ascii_lowercase().as_str() {
        "simulated" | "sim" => Some(HostKind::Simulated),
        #[cfg(feature = "native")]
        "native" => Some(HostKind::Native),
        _ => None,
    }
}
