//! Background poll loop that forwards local volume drift to the speaker and
//! keeps the local mute in step with speaker playback.
//!
//! Local volume is expected to sit at the pinned level. Anything else was done
//! by another actor (OS volume UI, another app, a hardware knob), so the
//! difference is applied to the speaker and the local level is restored.

mod mute;

pub use mute::{MuteState, MuteSynchronizer};

use crate::local::LocalOutputGuard;
use crate::log_debug;
use crate::remote::RemoteSpeakerHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// What one poll cycle observed and did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub target_active: bool,
    /// Observed local volume minus the pinned level, when nonzero.
    pub drift: Option<i16>,
    /// Speaker percent written for the drift, if the write succeeded.
    pub forwarded: Option<u8>,
    pub remote_polled: bool,
    /// Mute value written this cycle.
    pub mute_change: Option<bool>,
}

pub struct ExternalChangeWatcher {
    local: Arc<LocalOutputGuard>,
    remote: Arc<RemoteSpeakerHandle>,
    mute: MuteSynchronizer,
    local_interval: Duration,
    remote_interval: Duration,
    last_remote_poll: Option<Instant>,
    log_timings: bool,
}

impl ExternalChangeWatcher {
    pub fn new(
        local: Arc<LocalOutputGuard>,
        remote: Arc<RemoteSpeakerHandle>,
        local_interval: Duration,
        remote_interval: Duration,
    ) -> Self {
        Self {
            local,
            remote,
            mute: MuteSynchronizer::new(),
            local_interval,
            remote_interval,
            last_remote_poll: None,
            log_timings: false,
        }
    }

    pub fn with_timing_logs(mut self, enabled: bool) -> Self {
        self.log_timings = enabled;
        self
    }

    pub fn mute_state(&self) -> MuteState {
        self.mute.state()
    }

    /// Run the loop on its own thread until `shutdown` is set.
    pub fn spawn(self, shutdown: Arc<AtomicBool>) -> thread::JoinHandle<()> {
        thread::spawn(move || self.run(&shutdown))
    }

    pub fn run(mut self, shutdown: &AtomicBool) {
        log_debug("volume watcher started");
        while !shutdown.load(Ordering::Relaxed) {
            let started = Instant::now();
            let report = self.poll_once(started);
            if self.log_timings {
                log_debug(&format!(
                    "watch cycle {report:?} took {}ms",
                    started.elapsed().as_millis()
                ));
            }
            thread::sleep(self.local_interval);
        }
        log_debug("volume watcher stopped");
    }

    /// One poll cycle. Errors are logged here and never escape the loop.
    pub fn poll_once(&mut self, now: Instant) -> CycleReport {
        let mut report = CycleReport::default();

        if !self.local.is_target_active() {
            match self.mute.release(&self.local) {
                Ok(true) => report.mute_change = Some(false),
                Ok(false) => {}
                Err(err) => log_debug(&format!("unmute after device switch failed: {err:#}")),
            }
            return report;
        }
        report.target_active = true;

        let observed = match self.local.volume_percent() {
            Ok(percent) => percent,
            Err(err) => {
                log_debug(&format!("local volume unreadable: {err:#}"));
                return report;
            }
        };
        let pinned = self.local.pinned_level();
        if observed != pinned {
            let drift = i16::from(observed) - i16::from(pinned);
            report.drift = Some(drift);
            report.forwarded = self.forward_drift(drift);
        }

        if self.remote_poll_due(now) {
            self.last_remote_poll = Some(now);
            report.remote_polled = true;
            match self.remote.snapshot() {
                Ok(snapshot) => match self.mute.apply(&self.local, snapshot.playback) {
                    Ok(change) => report.mute_change = change,
                    Err(err) => log_debug(&format!("mute sync failed: {err:#}")),
                },
                Err(err) => log_debug(&format!("speaker poll failed: {err:#}")),
            }
        }
        report
    }

    /// Cached speaker volume, read from the speaker when nothing has been
    /// cached yet. An unreachable speaker leaves the placeholder in place.
    fn drift_base(&self) -> f64 {
        if let Some(volume) = self.remote.known_volume() {
            return volume;
        }
        match self.remote.volume() {
            Ok(volume) => volume,
            Err(err) => {
                log_debug(&format!("speaker volume unknown before drift: {err:#}"));
                self.remote.cached_volume()
            }
        }
    }

    fn remote_poll_due(&self, now: Instant) -> bool {
        self.last_remote_poll
            .map_or(true, |last| now.saturating_duration_since(last) >= self.remote_interval)
    }

    /// Apply `drift` percentage points to the speaker volume, then restore the
    /// pinned level whether or not the speaker accepted it.
    fn forward_drift(&self, drift: i16) -> Option<u8> {
        let base = self.drift_base();
        let target = (base + f64::from(drift) / 100.0).clamp(0.0, 1.0);
        let percent = (target * 100.0).round() as u8;
        log_debug(&format!(
            "external volume change {drift:+}% -> speaker {percent}%"
        ));
        let result = self.remote.set_volume_percent(percent);

        if let Err(err) = self.local.repin() {
            log_debug(&format!("re-pin after external change failed: {err:#}"));
        }

        match result {
            Ok(percent) => Some(percent),
            Err(err) => {
                log_debug(&format!("external change not forwarded: {err:#}"));
                None
            }
        }
    }
}
