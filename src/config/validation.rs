use super::defaults::{
    AGGREGATION_BOUNDS_MS, DISCOVERY_TIMEOUT_BOUNDS_MS, EXPONENTIAL_FACTOR_BOUNDS,
    LOCAL_POLL_BOUNDS_MS, MAX_DEBOUNCE_MS, MAX_DEVICE_CACHE_MS, MAX_REMOTE_POLL_MS, STEP_BOUNDS,
};
use super::{AppConfig, EngineConfig, SpeakerTarget};
use crate::curve::StepCurve;
use anyhow::{bail, Result};
use clap::Parser;
use std::time::Duration;

impl AppConfig {
    /// Parse CLI arguments and normalize them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Clamp numeric settings into their working ranges and trim names.
    ///
    /// Only a missing speaker target is an error, since nothing could be resolved.
    pub fn validate(&mut self) -> Result<()> {
        self.pinned_volume = self.pinned_volume.clamp(0, 100);
        self.volume_step = clamp_f64(self.volume_step, STEP_BOUNDS, super::DEFAULT_VOLUME_STEP);
        self.exponential_factor = clamp_f64(
            self.exponential_factor,
            EXPONENTIAL_FACTOR_BOUNDS,
            super::DEFAULT_EXPONENTIAL_FACTOR,
        );
        self.max_flush_step =
            clamp_f64(self.max_flush_step, STEP_BOUNDS, super::DEFAULT_MAX_FLUSH_STEP);
        self.debounce_ms = self.debounce_ms.min(MAX_DEBOUNCE_MS);
        self.aggregation_ms = self
            .aggregation_ms
            .clamp(AGGREGATION_BOUNDS_MS.0, AGGREGATION_BOUNDS_MS.1);
        self.local_poll_ms = self
            .local_poll_ms
            .clamp(LOCAL_POLL_BOUNDS_MS.0, LOCAL_POLL_BOUNDS_MS.1);
        self.remote_poll_ms = self
            .remote_poll_ms
            .clamp(self.local_poll_ms, MAX_REMOTE_POLL_MS);
        self.device_cache_ms = self.device_cache_ms.min(MAX_DEVICE_CACHE_MS);
        self.discovery_timeout_ms = self
            .discovery_timeout_ms
            .clamp(DISCOVERY_TIMEOUT_BOUNDS_MS.0, DISCOVERY_TIMEOUT_BOUNDS_MS.1);

        self.speaker_ip = self.speaker_ip.trim().to_string();
        self.speaker_name = self.speaker_name.trim().to_string();
        self.output_device = self
            .output_device
            .take()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        if self.speaker_ip.is_empty() && self.speaker_name.is_empty() {
            bail!("either --speaker-ip or --speaker-name must be set");
        }
        if self.output_device.is_none() && self.speaker_name.is_empty() {
            bail!("--output-device is required when --speaker-name is empty");
        }
        Ok(())
    }

    pub fn logging_enabled(&self) -> bool {
        (self.logs || self.log_timings) && !self.no_logs
    }

    /// Build the engine settings; call after `validate`.
    pub fn engine_config(&self) -> EngineConfig {
        let speaker = if self.speaker_ip.is_empty() {
            SpeakerTarget::Name(self.speaker_name.clone())
        } else {
            SpeakerTarget::Address(self.speaker_ip.clone())
        };
        let output_device = self
            .output_device
            .clone()
            .unwrap_or_else(|| self.speaker_name.clone());

        EngineConfig {
            pinned_volume: self.pinned_volume as u8,
            curve: StepCurve {
                base_step: self.volume_step,
                exponential: !self.linear,
                exponential_factor: self.exponential_factor,
            },
            max_flush_step: self.max_flush_step,
            debounce: Duration::from_millis(self.debounce_ms),
            aggregation_delay: Duration::from_millis(self.aggregation_ms),
            local_poll_interval: Duration::from_millis(self.local_poll_ms),
            remote_poll_interval: Duration::from_millis(self.remote_poll_ms),
            device_cache_ttl: Duration::from_millis(self.device_cache_ms),
            discovery_timeout: Duration::from_millis(self.discovery_timeout_ms),
            speaker,
            output_device,
            log_timings: self.log_timings,
        }
    }
}

fn clamp_f64(value: f64, (min, max): (f64, f64), fallback: f64) -> f64 {
    if value.is_nan() {
        return fallback;
    }
    value.clamp(min, max)
}
