//! Single-slot flush timer: arming it again replaces the pending deadline, so
//! at most one flush is ever outstanding.

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crate::lock_or_recover;

enum TimerCommand {
    Arm(Instant),
    Stop,
}

pub(crate) struct FlushTimer {
    tx: Sender<TimerCommand>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl FlushTimer {
    /// Start the timer thread. `on_fire` runs on that thread.
    pub(crate) fn spawn<F>(on_fire: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, rx) = unbounded();
        let handle = thread::spawn(move || run_timer(rx, on_fire));
        Self {
            tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Fire `delay` from now, cancelling any earlier pending deadline.
    pub(crate) fn arm(&self, delay: Duration) {
        let _ = self.tx.send(TimerCommand::Arm(Instant::now() + delay));
    }

    /// Stop the thread. A pending deadline fires once before exit.
    pub(crate) fn stop(&self) {
        let _ = self.tx.send(TimerCommand::Stop);
        if let Some(handle) = lock_or_recover(&self.handle, "flush timer").take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_timer<F: FnMut()>(rx: crossbeam_channel::Receiver<TimerCommand>, mut on_fire: F) {
    let mut deadline: Option<Instant> = None;
    loop {
        let command = match deadline {
            Some(at) => match rx.recv_deadline(at) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return,
            },
            None => match rx.recv() {
                Ok(command) => Some(command),
                Err(_) => return,
            },
        };
        match command {
            Some(TimerCommand::Arm(at)) => deadline = Some(at),
            Some(TimerCommand::Stop) => {
                if deadline.is_some() {
                    on_fire();
                }
                return;
            }
            None => {
                deadline = None;
                on_fire();
            }
        }
    }
}
