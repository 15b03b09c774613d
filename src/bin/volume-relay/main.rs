//! Volume Relay entrypoint: reads volume key presses and drives the engine
//! until the input closes or a quit is requested.
//!
//! # Threads
//!
//! - Input thread: turns stdin lines into key presses
//! - SIGINT/SIGTERM: request the same cooperative shutdown as `q`
//! - Watcher: polls local drift, remote volume and playback (inside the engine)
//! - Flush timer: sends aggregated key steps to the speaker (inside the engine)

mod cli_utils;
mod input;
mod signals;

use anyhow::Result;
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use volume_relay::config::AppConfig;
use volume_relay::local::WpctlEndpoint;
use volume_relay::remote::SsdpDirectory;
use volume_relay::{
    init_logging, init_tracing, install_panic_hook, log_debug, log_file_path, Engine,
};

use crate::cli_utils::list_speakers;
use crate::input::{spawn_input_thread, InputEvent};
use crate::signals::{install_stop_handlers, stop_requested};

const INPUT_POLL: Duration = Duration::from_millis(200);

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    if config.list_speakers {
        list_speakers(&config)?;
        return Ok(());
    }

    init_logging(&config);
    init_tracing(&config);
    install_panic_hook();
    log_debug("=== Volume Relay Started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    install_stop_handlers()?;
    let engine_config = config.engine_config();
    log_debug(&format!(
        "speaker {} / output device '{}' pinned at {}%",
        engine_config.speaker.describe(),
        engine_config.output_device,
        engine_config.pinned_volume
    ));
    let engine = Engine::start(
        &engine_config,
        Arc::new(WpctlEndpoint::default()),
        Arc::new(SsdpDirectory::default()),
    );

    let shutdown = engine.shutdown_flag();
    let (tx, rx) = bounded::<InputEvent>(16);
    let _input_handle = spawn_input_thread(tx);

    while !engine.is_shutting_down() {
        if stop_requested() {
            log_debug("stop signal received");
            shutdown.store(true, Ordering::Relaxed);
            break;
        }
        match rx.recv_timeout(INPUT_POLL) {
            Ok(InputEvent::Key(event)) => {
                if !engine.handle_key(event) {
                    log_debug(&format!("{:?} passed through to the local output", event.key));
                }
            }
            Ok(InputEvent::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    engine.shutdown();
    log_debug("=== Volume Relay Exiting ===");
    Ok(())
}
