//! Hardware volume key handling.
//!
//! Key presses are sized, summed, and flushed to the speaker as one command
//! per burst. The key path itself never waits on the network: it only touches
//! the accumulator, re-arms the flush timer, and re-pins the local volume.

mod aggregator;
mod timer;

pub use aggregator::KeyEventAggregator;

use crate::remote::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKey {
    VolumeUp,
    VolumeDown,
}

impl VolumeKey {
    pub fn direction(self) -> Direction {
        match self {
            VolumeKey::VolumeUp => Direction::Up,
            VolumeKey::VolumeDown => Direction::Down,
        }
    }
}

/// One transition of a volume key as delivered by the platform key source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: VolumeKey,
    pub down: bool,
}

impl KeyEvent {
    pub fn press(key: VolumeKey) -> Self {
        Self { key, down: true }
    }

    pub fn release(key: VolumeKey) -> Self {
        Self { key, down: false }
    }
}
