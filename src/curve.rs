//! Key-press step sizing.
//!
//! Steps grow with the current speaker volume so a press near the top of the
//! range moves the speaker further than one near silence, and never fall below
//! the configured base step.

use crate::config::{DEFAULT_EXPONENTIAL_FACTOR, DEFAULT_VOLUME_STEP};

/// Step sizing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepCurve {
    /// Step in percentage points at zero volume (and always, in linear mode).
    pub base_step: f64,
    pub exponential: bool,
    /// Multiplier applied to `base_step` at full volume.
    pub exponential_factor: f64,
}

impl Default for StepCurve {
    fn default() -> Self {
        Self {
            base_step: DEFAULT_VOLUME_STEP,
            exponential: true,
            exponential_factor: DEFAULT_EXPONENTIAL_FACTOR,
        }
    }
}

impl StepCurve {
    /// Step size in percentage points for a speaker currently at `volume` (0.0-1.0).
    pub fn step(&self, volume: f64) -> f64 {
        step_size(
            volume,
            self.base_step,
            self.exponential,
            self.exponential_factor,
        )
    }
}

/// Pure step function: `base_step` in linear mode, otherwise
/// `max(base_step, base_step * (1 + volume * (factor - 1)))`.
pub fn step_size(volume: f64, base_step: f64, exponential: bool, exponential_factor: f64) -> f64 {
    if !exponential {
        return base_step;
    }
    let volume = if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    };
    let multiplier = 1.0 + volume * (exponential_factor - 1.0);
    base_step.max(base_step * multiplier)
}
