pub const DEFAULT_PINNED_VOLUME: u8 = 33;
pub const DEFAULT_VOLUME_STEP: f64 = 1.0;
pub const DEFAULT_EXPONENTIAL_FACTOR: f64 = 10.0;
pub const DEFAULT_MAX_FLUSH_STEP: f64 = 10.0;
pub const DEFAULT_DEBOUNCE_MS: u64 = 0;
pub const DEFAULT_AGGREGATION_MS: u64 = 50;
pub const DEFAULT_LOCAL_POLL_MS: u64 = 100;
pub const DEFAULT_REMOTE_POLL_MS: u64 = 500;
pub const DEFAULT_DEVICE_CACHE_MS: u64 = 200;
pub const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_SPEAKER_NAME: &str = "Sonos Five";

pub(super) const STEP_BOUNDS: (f64, f64) = (0.1, 100.0);
pub(super) const EXPONENTIAL_FACTOR_BOUNDS: (f64, f64) = (1.0, 100.0);
pub(super) const MAX_DEBOUNCE_MS: u64 = 1_000;
pub(super) const AGGREGATION_BOUNDS_MS: (u64, u64) = (1, 1_000);
pub(super) const LOCAL_POLL_BOUNDS_MS: (u64, u64) = (10, 10_000);
pub(super) const MAX_REMOTE_POLL_MS: u64 = 60_000;
pub(super) const MAX_DEVICE_CACHE_MS: u64 = 10_000;
pub(super) const DISCOVERY_TIMEOUT_BOUNDS_MS: (u64, u64) = (100, 30_000);
