use super::LocalAudioEndpoint;
use crate::lock_or_recover;
use crate::log_debug;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
struct DeviceNameCache {
    name: String,
    checked_at: Option<Instant>,
}

/// Local endpoint plus the pinned reference level and a short-lived cache of
/// the default device name.
pub struct LocalOutputGuard {
    endpoint: Arc<dyn LocalAudioEndpoint>,
    pinned: u8,
    target_device: String,
    cache_ttl: Duration,
    device_cache: Mutex<DeviceNameCache>,
}

impl LocalOutputGuard {
    pub fn new(
        endpoint: Arc<dyn LocalAudioEndpoint>,
        pinned: u8,
        target_device: impl Into<String>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            endpoint,
            pinned: pinned.min(100),
            target_device: target_device.into(),
            cache_ttl,
            device_cache: Mutex::new(DeviceNameCache::default()),
        }
    }

    pub fn pinned_level(&self) -> u8 {
        self.pinned
    }

    pub fn volume_percent(&self) -> Result<u8> {
        self.endpoint
            .volume_percent()
            .map(|percent| percent.min(100))
            .context("read local volume")
    }

    pub fn set_volume_percent(&self, percent: u8) -> Result<()> {
        self.endpoint
            .set_volume_percent(percent.min(100))
            .with_context(|| format!("set local volume to {percent}%"))
    }

    /// Restore the local volume to the pinned level.
    pub fn repin(&self) -> Result<()> {
        self.set_volume_percent(self.pinned)
    }

    pub fn muted(&self) -> Result<bool> {
        self.endpoint.muted().context("read local mute")
    }

    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.endpoint
            .set_muted(muted)
            .with_context(|| format!("set local mute to {muted}"))
    }

    /// Default output device name, refreshed at most once per cache TTL.
    ///
    /// A failed lookup returns the last known name (empty if none yet).
    pub fn active_device_name(&self) -> String {
        let mut cache = lock_or_recover(&self.device_cache, "device name cache");
        if let Some(checked_at) = cache.checked_at {
            if !cache.name.is_empty() && checked_at.elapsed() < self.cache_ttl {
                return cache.name.clone();
            }
        }
        match self.endpoint.default_output_name() {
            Ok(name) if !name.is_empty() => {
                cache.name = name;
                cache.checked_at = Some(Instant::now());
            }
            Ok(_) => log_debug("default output device reported an empty name"),
            Err(err) => log_debug(&format!("default output device lookup failed: {err:#}")),
        }
        cache.name.clone()
    }

    /// Whether the default output is the device the relay is configured for
    /// (case-insensitive substring match).
    pub fn is_target_active(&self) -> bool {
        let name = self.active_device_name();
        if name.is_empty() {
            return false;
        }
        name.to_lowercase()
            .contains(&self.target_device.to_lowercase())
    }
}
