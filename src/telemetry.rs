//! Structured speaker events.
//!
//! Volume writes, steps, failed speaker calls and mute transitions are emitted
//! as `tracing` events. When file logging is on they land, one JSON object per
//! line, in a trace file next to the debug log so a session can be replayed
//! against the speaker's own history.

use crate::config::AppConfig;
use crate::log_debug;
use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::fmt::time::UtcTime;

static TRACE_SINK: OnceLock<PathBuf> = OnceLock::new();

/// Where speaker events go: `VOLUME_RELAY_TRACE_LOG`, else the temp dir.
pub(crate) fn trace_file_path() -> PathBuf {
    env::var_os("VOLUME_RELAY_TRACE_LOG")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("volume_relay_trace.jsonl"))
}

fn open_trace_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Route speaker events to the trace file. Only the first call with logging
/// enabled has any effect.
pub fn init_tracing(config: &AppConfig) {
    if !config.logging_enabled() {
        return;
    }
    TRACE_SINK.get_or_init(|| {
        let path = trace_file_path();
        match open_trace_file(&path) {
            Ok(file) => {
                let subscriber = tracing_subscriber::fmt()
                    .json()
                    .with_max_level(Level::INFO)
                    .with_timer(UtcTime::rfc_3339())
                    .with_target(false)
                    .with_writer(file)
                    .with_current_span(false)
                    .with_span_list(false)
                    .finish();
                if tracing::subscriber::set_global_default(subscriber).is_err() {
                    log_debug("speaker event sink already installed elsewhere");
                }
            }
            Err(err) => log_debug(&format!("speaker event log {path:?} unavailable: {err}")),
        }
        path
    });
}
