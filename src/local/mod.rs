//! Local output device access.
//!
//! The relay keeps the local master volume pinned at a fixed level and reads
//! any deviation as a change made by someone else. `LocalAudioEndpoint` is the
//! platform seam; `LocalOutputGuard` adds the pinned level and the cached
//! device identity on top of it.

mod guard;
mod wpctl;

use anyhow::Result;

pub use guard::LocalOutputGuard;
pub use wpctl::WpctlEndpoint;

/// Master output controls of the local default playback device.
///
/// Every call may fail transiently (device switching, audio server restart);
/// callers treat failures as "try again next tick".
pub trait LocalAudioEndpoint: Send + Sync {
    fn volume_percent(&self) -> Result<u8>;
    fn set_volume_percent(&self, percent: u8) -> Result<()>;
    fn muted(&self) -> Result<bool>;
    fn set_muted(&self, muted: bool) -> Result<()>;
    fn default_output_name(&self) -> Result<String>;
}
