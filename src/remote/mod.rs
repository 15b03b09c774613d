//! Remote speaker access.
//!
//! `SpeakerDirectory` finds speakers and opens control connections;
//! `SpeakerControl` is one connected speaker. `RemoteSpeakerHandle` caches the
//! resolved connection and drops it on the first failure so the next call
//! starts over from discovery.

mod discovery;
mod handle;
mod sonos;
#[cfg(test)]
mod tests;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

pub use discovery::SsdpDirectory;
pub use handle::{RemoteSnapshot, RemoteSpeakerHandle};
pub use sonos::SonosSpeaker;

/// Transport state reported while the speaker renders audio.
pub const PLAYING_STATE: &str = "PLAYING";
/// Source reported when the speaker plays its analog line input.
pub const LINE_IN_SOURCE: &str = "Line-In";

/// Controls of one reachable speaker. Volumes are integer percent.
pub trait SpeakerControl: Send + Sync {
    fn address(&self) -> &str;
    fn volume(&self) -> Result<u8>;
    fn set_volume(&self, percent: u8) -> Result<()>;
    fn transport_state(&self) -> Result<String>;
    fn current_source(&self) -> Result<String>;
}

/// A speaker seen during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSpeaker {
    pub name: String,
    pub address: String,
    pub is_coordinator: bool,
    /// Address of the coordinator of this speaker's group, when known.
    pub group_coordinator: Option<String>,
}

pub trait SpeakerDirectory: Send + Sync {
    fn discover(&self, timeout: Duration) -> Result<Vec<DiscoveredSpeaker>>;
    fn connect(&self, address: &str) -> Result<Arc<dyn SpeakerControl>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// What the speaker is doing, reduced to what local muting depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_line_input: bool,
}

impl PlaybackState {
    pub fn from_reported(transport_state: &str, source: &str) -> Self {
        Self {
            is_playing: transport_state == PLAYING_STATE,
            is_line_input: source == LINE_IN_SOURCE,
        }
    }

    /// The local output is silenced while the speaker renders our stream, but
    /// stays audible when the speaker plays its line input.
    pub fn wants_local_mute(self) -> bool {
        self.is_playing && !self.is_line_input
    }
}
