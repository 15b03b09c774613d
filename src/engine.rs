//! Wires the key path, the watcher, and the shared speaker handle together.

use crate::config::EngineConfig;
use crate::keys::{KeyEvent, KeyEventAggregator};
use crate::local::{LocalAudioEndpoint, LocalOutputGuard};
use crate::log_debug;
use crate::remote::{RemoteSpeakerHandle, SpeakerDirectory};
use crate::watch::ExternalChangeWatcher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Running relay. Dropping it without `shutdown` leaves the watcher thread
/// running until the process exits.
pub struct Engine {
    local: Arc<LocalOutputGuard>,
    remote: Arc<RemoteSpeakerHandle>,
    aggregator: KeyEventAggregator,
    shutdown: Arc<AtomicBool>,
    watcher: Option<thread::JoinHandle<()>>,
}

impl Engine {
    pub fn start(
        config: &EngineConfig,
        endpoint: Arc<dyn LocalAudioEndpoint>,
        directory: Arc<dyn SpeakerDirectory>,
    ) -> Self {
        let local = Arc::new(LocalOutputGuard::new(
            endpoint,
            config.pinned_volume,
            config.output_device.clone(),
            config.device_cache_ttl,
        ));
        let remote = Arc::new(RemoteSpeakerHandle::new(
            config.speaker.clone(),
            directory,
            config.discovery_timeout,
        ));
        let aggregator = KeyEventAggregator::new(
            Arc::clone(&local),
            Arc::clone(&remote),
            config.curve,
            config.debounce,
            config.aggregation_delay,
            config.max_flush_step,
        );

        // Pin before the watcher starts so a stale local level is not taken
        // for an external change.
        if local.is_target_active() {
            if let Err(err) = local.repin() {
                log_debug(&format!("initial re-pin failed: {err:#}"));
            }
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let watcher = ExternalChangeWatcher::new(
            Arc::clone(&local),
            Arc::clone(&remote),
            config.local_poll_interval,
            config.remote_poll_interval,
        )
        .with_timing_logs(config.log_timings)
        .spawn(Arc::clone(&shutdown));

        log_debug(&format!(
            "relay started: speaker {}, output '{}', pinned {}%",
            config.speaker.describe(),
            config.output_device,
            config.pinned_volume
        ));
        Self {
            local,
            remote,
            aggregator,
            shutdown,
            watcher: Some(watcher),
        }
    }

    /// Feed one key event; `false` means the platform should handle it.
    pub fn handle_key(&self, event: KeyEvent) -> bool {
        if self.is_shutting_down() {
            return false;
        }
        self.aggregator.handle_key(event)
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn local(&self) -> &LocalOutputGuard {
        &self.local
    }

    pub fn remote(&self) -> &RemoteSpeakerHandle {
        &self.remote
    }

    /// Stop cooperatively: flush any pending key burst, then wait for the
    /// watcher to finish its current cycle.
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.aggregator.shutdown();
        if let Some(handle) = self.watcher.take() {
            if handle.join().is_err() {
                log_debug("volume watcher panicked");
            }
        }
        log_debug("relay stopped");
    }
}
