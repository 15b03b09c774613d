use std::sync::{Mutex, MutexGuard};

/// Take `lock` even if a worker panicked while holding it; the guarded state
/// is always plain data that stays meaningful after a panic.
pub(crate) fn lock_or_recover<'a, T>(lock: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        crate::log_debug(&format!("{context}: lock poisoned, recovering state"));
        poisoned.into_inner()
    })
}
