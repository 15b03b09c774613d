//! Command-line configuration and normalization.

mod defaults;
mod validation;

use clap::Parser;
use std::time::Duration;

pub use defaults::{
    DEFAULT_AGGREGATION_MS, DEFAULT_DEBOUNCE_MS, DEFAULT_DEVICE_CACHE_MS,
    DEFAULT_DISCOVERY_TIMEOUT_MS, DEFAULT_EXPONENTIAL_FACTOR, DEFAULT_LOCAL_POLL_MS,
    DEFAULT_MAX_FLUSH_STEP, DEFAULT_PINNED_VOLUME, DEFAULT_REMOTE_POLL_MS, DEFAULT_SPEAKER_NAME,
    DEFAULT_VOLUME_STEP,
};

use crate::curve::StepCurve;

/// CLI options for the relay. `validate` clamps out-of-range values instead of
/// rejecting them so a typo never keeps the volume keys from working.
#[derive(Debug, Parser, Clone)]
#[command(
    about = "Volume Relay: route hardware volume keys to a network speaker",
    author,
    version
)]
pub struct AppConfig {
    /// Local output volume the relay keeps re-applying (percent)
    #[arg(long = "pinned-volume", default_value_t = DEFAULT_PINNED_VOLUME as i64)]
    pub pinned_volume: i64,

    /// Base step per key press (percentage points)
    #[arg(long = "volume-step", default_value_t = DEFAULT_VOLUME_STEP)]
    pub volume_step: f64,

    /// Use a fixed step instead of scaling it with the current speaker volume
    #[arg(long = "linear", default_value_t = false)]
    pub linear: bool,

    /// Step multiplier reached at full speaker volume (exponential mode)
    #[arg(long = "exponential-factor", default_value_t = DEFAULT_EXPONENTIAL_FACTOR)]
    pub exponential_factor: f64,

    /// Largest change sent to the speaker per aggregated burst (percentage points)
    #[arg(long = "max-flush-step", default_value_t = DEFAULT_MAX_FLUSH_STEP)]
    pub max_flush_step: f64,

    /// Minimum spacing between accepted key presses (milliseconds)
    #[arg(long = "debounce-ms", default_value_t = DEFAULT_DEBOUNCE_MS)]
    pub debounce_ms: u64,

    /// Quiet period that closes a key burst (milliseconds)
    #[arg(long = "aggregation-ms", default_value_t = DEFAULT_AGGREGATION_MS)]
    pub aggregation_ms: u64,

    /// Local volume poll interval (milliseconds)
    #[arg(long = "local-poll-ms", default_value_t = DEFAULT_LOCAL_POLL_MS)]
    pub local_poll_ms: u64,

    /// Speaker playback state poll interval (milliseconds)
    #[arg(long = "remote-poll-ms", default_value_t = DEFAULT_REMOTE_POLL_MS)]
    pub remote_poll_ms: u64,

    /// How long the default output device name is cached (milliseconds)
    #[arg(long = "device-cache-ms", default_value_t = DEFAULT_DEVICE_CACHE_MS)]
    pub device_cache_ms: u64,

    /// How long speaker discovery listens for replies (milliseconds)
    #[arg(long = "discovery-timeout-ms", default_value_t = DEFAULT_DISCOVERY_TIMEOUT_MS)]
    pub discovery_timeout_ms: u64,

    /// Fixed speaker address; skips discovery when set
    #[arg(long = "speaker-ip", env = "VOLUME_RELAY_SPEAKER_IP", default_value = "")]
    pub speaker_ip: String,

    /// Speaker room name used for discovery
    #[arg(
        long = "speaker-name",
        env = "VOLUME_RELAY_SPEAKER_NAME",
        default_value = DEFAULT_SPEAKER_NAME
    )]
    pub speaker_name: String,

    /// Local output device name to act on (defaults to the speaker name)
    #[arg(long = "output-device")]
    pub output_device: Option<String>,

    /// Print speakers found by discovery and exit
    #[arg(long = "list-speakers", default_value_t = false)]
    pub list_speakers: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "VOLUME_RELAY_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs)
    #[arg(long = "no-logs", env = "VOLUME_RELAY_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Log every poll cycle and flush with timings
    #[arg(long)]
    pub log_timings: bool,
}

/// Typed runtime settings consumed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub pinned_volume: u8,
    pub curve: StepCurve,
    pub max_flush_step: f64,
    pub debounce: Duration,
    pub aggregation_delay: Duration,
    pub local_poll_interval: Duration,
    pub remote_poll_interval: Duration,
    pub device_cache_ttl: Duration,
    pub discovery_timeout: Duration,
    pub speaker: SpeakerTarget,
    pub output_device: String,
    pub log_timings: bool,
}

/// How the remote speaker is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakerTarget {
    Address(String),
    Name(String),
}

impl SpeakerTarget {
    pub fn describe(&self) -> String {
        match self {
            SpeakerTarget::Address(addr) => format!("address {addr}"),
            SpeakerTarget::Name(name) => format!("name '{name}'"),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pinned_volume: DEFAULT_PINNED_VOLUME,
            curve: StepCurve::default(),
            max_flush_step: DEFAULT_MAX_FLUSH_STEP,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            aggregation_delay: Duration::from_millis(DEFAULT_AGGREGATION_MS),
            local_poll_interval: Duration::from_millis(DEFAULT_LOCAL_POLL_MS),
            remote_poll_interval: Duration::from_millis(DEFAULT_REMOTE_POLL_MS),
            device_cache_ttl: Duration::from_millis(DEFAULT_DEVICE_CACHE_MS),
            discovery_timeout: Duration::from_millis(DEFAULT_DISCOVERY_TIMEOUT_MS),
            speaker: SpeakerTarget::Name(DEFAULT_SPEAKER_NAME.to_string()),
            output_device: DEFAULT_SPEAKER_NAME.to_string(),
            log_timings: false,
        }
    }
}
