//! Line-oriented key source: each stdin line is one volume key press.

use crossbeam_channel::Sender;
use std::io::{self, BufRead};
use std::thread;
use volume_relay::{log_debug, KeyEvent, VolumeKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputEvent {
    Key(KeyEvent),
    Quit,
}

pub(crate) fn parse_line(line: &str) -> Option<InputEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "+" | "u" | "up" => Some(InputEvent::Key(KeyEvent::press(VolumeKey::VolumeUp))),
        "-" | "d" | "down" => Some(InputEvent::Key(KeyEvent::press(VolumeKey::VolumeDown))),
        "q" | "quit" | "exit" => Some(InputEvent::Quit),
        _ => None,
    }
}

pub(crate) fn spawn_input_thread(tx: Sender<InputEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log_debug(&format!("stdin read error: {err}"));
                    break;
                }
            };
            match parse_line(&line) {
                Some(event) => {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                None if line.trim().is_empty() => {}
                None => log_debug(&format!("ignoring unknown key input '{}'", line.trim())),
            }
        }
        let _ = tx.send(InputEvent::Quit);
    })
}
