//! Route hardware volume keys to a network speaker while the local output
//! stays pinned at a fixed level.

mod app;
pub mod config;
pub mod curve;
pub mod engine;
pub mod keys;
pub mod local;
mod lock;
pub mod remote;
mod telemetry;
#[cfg(test)]
mod test_support;
pub mod watch;

pub(crate) use lock::lock_or_recover;
pub use app::logging::{
    crash_log_path, init_logging, install_panic_hook, log_debug, log_file_path, log_panic,
};
pub use engine::Engine;
pub use keys::{KeyEvent, VolumeKey};
pub use telemetry::init_tracing;
