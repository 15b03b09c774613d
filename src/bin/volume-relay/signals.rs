use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use volume_relay::log_debug;

/// Set by the SIGINT/SIGTERM handler; the main loop turns it into a shutdown.
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Only touches an atomic, so it is async-signal-safe.
extern "C" fn handle_stop(_: libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

pub(crate) fn install_stop_handlers() -> Result<()> {
    for (signal, name) in [(libc::SIGINT, "SIGINT"), (libc::SIGTERM, "SIGTERM")] {
        unsafe {
            // SAFETY: handle_stop only stores to a static atomic.
            let handler = handle_stop as *const () as libc::sighandler_t;
            if libc::signal(signal, handler) == libc::SIG_ERR {
                log_debug(&format!("failed to install {name} handler"));
                return Err(anyhow!("failed to install {name} handler"));
            }
        }
    }
    Ok(())
}

pub(crate) fn stop_requested() -> bool {
    STOP_REQUESTED.load(Ordering::SeqCst)
}
