use super::timer::FlushTimer;
use super::KeyEvent;
use crate::curve::StepCurve;
use crate::local::LocalOutputGuard;
use crate::lock_or_recover;
use crate::log_debug;
use crate::remote::{Direction, RemoteSpeakerHandle};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Signed step percentage collected since the last flush, plus the time of
/// the last accepted press for debouncing.
#[derive(Debug, Default)]
pub(crate) struct StepAccumulator {
    pending: f64,
    last_accepted: Option<Instant>,
}

impl StepAccumulator {
    /// Record a press at `now` unless it falls inside the debounce window.
    fn accept(&mut self, now: Instant, debounce: Duration) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < debounce {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }

    fn add(&mut self, step: f64) {
        self.pending += step;
    }

    fn take(&mut self) -> f64 {
        std::mem::take(&mut self.pending)
    }
}

/// Turns volume key presses into one clamped speaker step per burst.
pub struct KeyEventAggregator {
    local: Arc<LocalOutputGuard>,
    remote: Arc<RemoteSpeakerHandle>,
    curve: StepCurve,
    debounce: Duration,
    aggregation_delay: Duration,
    steps: Arc<Mutex<StepAccumulator>>,
    timer: FlushTimer,
}

impl KeyEventAggregator {
    pub fn new(
        local: Arc<LocalOutputGuard>,
        remote: Arc<RemoteSpeakerHandle>,
        curve: StepCurve,
        debounce: Duration,
        aggregation_delay: Duration,
        max_flush_step: f64,
    ) -> Self {
        let steps = Arc::new(Mutex::new(StepAccumulator::default()));
        let timer = {
            let steps = Arc::clone(&steps);
            let remote = Arc::clone(&remote);
            FlushTimer::spawn(move || {
                flush_steps(&steps, &remote, max_flush_step);
            })
        };
        Self {
            local,
            remote,
            curve,
            debounce,
            aggregation_delay,
            steps,
            timer,
        }
    }

    /// Handle one key event. Returns `false` when the event is not ours and the
    /// platform should process it natively.
    pub fn handle_key(&self, event: KeyEvent) -> bool {
        if !event.down {
            return false;
        }
        if !self.local.is_target_active() {
            log_debug("volume key while target output inactive; passing through");
            return false;
        }

        let direction = event.key.direction();
        let now = Instant::now();
        let accepted = {
            let mut steps = lock_or_recover(&self.steps, "step accumulator");
            let accepted = steps.accept(now, self.debounce);
            if accepted {
                let step = self.curve.step(self.remote.cached_volume());
                steps.add(direction.sign() * step);
                self.timer.arm(self.aggregation_delay);
            }
            accepted
        };
        if !accepted {
            log_debug("volume key debounced");
        }

        if let Err(err) = self.local.repin() {
            log_debug(&format!("re-pin after key press failed: {err:#}"));
        }
        true
    }

    /// Stop the flush thread, sending any pending burst first.
    pub fn shutdown(&self) {
        self.timer.stop();
    }
}

/// Drain the accumulator and forward the net step, clamped to `max_step`.
/// Returns the percent written, if anything was sent and it succeeded.
pub(crate) fn flush_steps(
    steps: &Mutex<StepAccumulator>,
    remote: &RemoteSpeakerHandle,
    max_step: f64,
) -> Option<u8> {
    let net = lock_or_recover(steps, "step accumulator").take();
    if net.abs() < f64::EPSILON {
        return None;
    }
    let direction = if net > 0.0 {
        Direction::Up
    } else {
        Direction::Down
    };
    let magnitude = net.abs().min(max_step);
    log_debug(&format!(
        "flushing key burst: {}{magnitude:.2}%",
        if net > 0.0 { "+" } else { "-" }
    ));
    match remote.apply_step(direction, magnitude) {
        Ok(percent) => Some(percent),
        Err(err) => {
            log_debug(&format!("key burst not applied: {err:#}"));
            None
        }
    }
}
