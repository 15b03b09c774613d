use crate::local::LocalOutputGuard;
use crate::remote::PlaybackState;
use anyhow::Result;

/// Mute state last applied by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MuteState {
    /// Nothing applied yet, or released after leaving the target device.
    #[default]
    Unknown,
    Muted,
    Unmuted,
}

impl MuteState {
    fn from_muted(muted: bool) -> Self {
        if muted {
            MuteState::Muted
        } else {
            MuteState::Unmuted
        }
    }
}

/// Applies local mute only when the desired value changes.
#[derive(Debug, Default)]
pub struct MuteSynchronizer {
    state: MuteState,
}

impl MuteSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MuteState {
        self.state
    }

    /// Bring the local mute in line with `playback`. Returns the mute value
    /// written, or `None` when nothing needed to change.
    pub fn apply(&mut self, local: &LocalOutputGuard, playback: PlaybackState) -> Result<Option<bool>> {
        let desired = playback.wants_local_mute();
        if self.state == MuteState::from_muted(desired) {
            return Ok(None);
        }
        local.set_muted(desired)?;
        self.state = MuteState::from_muted(desired);
        tracing::info!(muted = desired, "local output mute changed");
        Ok(Some(desired))
    }

    /// Undo a mute this relay applied and forget the state. Returns `true` if
    /// the output was unmuted.
    pub fn release(&mut self, local: &LocalOutputGuard) -> Result<bool> {
        match self.state {
            MuteState::Muted => {
                local.set_muted(false)?;
                self.state = MuteState::Unknown;
                tracing::info!(muted = false, "local output mute released");
                Ok(true)
            }
            MuteState::Unmuted => {
                self.state = MuteState::Unknown;
                Ok(false)
            }
            MuteState::Unknown => Ok(false),
        }
    }
}
