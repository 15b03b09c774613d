//! PipeWire default sink control through the `wpctl` command.

use super::LocalAudioEndpoint;
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use std::process::Command;
use std::sync::OnceLock;

const DEFAULT_SINK: &str = "@DEFAULT_AUDIO_SINK@";

/// `LocalAudioEndpoint` backed by WirePlumber's `wpctl`.
#[derive(Debug, Clone)]
pub struct WpctlEndpoint {
    program: String,
    sink: String,
}

impl Default for WpctlEndpoint {
    fn default() -> Self {
        Self::new("wpctl")
    }
}

impl WpctlEndpoint {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            sink: DEFAULT_SINK.to_string(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute {}", self.program))?;
        if !output.status.success() {
            bail!(
                "{} {} failed with status {}",
                self.program,
                args.join(" "),
                output.status
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn read_volume(&self) -> Result<SinkVolume> {
        let stdout = self.run(&["get-volume", &self.sink])?;
        parse_volume_output(&stdout)
            .ok_or_else(|| anyhow!("unexpected wpctl get-volume output: {}", stdout.trim()))
    }
}

impl LocalAudioEndpoint for WpctlEndpoint {
    fn volume_percent(&self) -> Result<u8> {
        Ok(self.read_volume()?.percent)
    }

    fn set_volume_percent(&self, percent: u8) -> Result<()> {
        let level = format!("{:.2}", f64::from(percent.min(100)) / 100.0);
        self.run(&["set-volume", &self.sink, &level]).map(|_| ())
    }

    fn muted(&self) -> Result<bool> {
        Ok(self.read_volume()?.muted)
    }

    fn set_muted(&self, muted: bool) -> Result<()> {
        let flag = if muted { "1" } else { "0" };
        self.run(&["set-mute", &self.sink, flag]).map(|_| ())
    }

    fn default_output_name(&self) -> Result<String> {
        let stdout = self.run(&["inspect", &self.sink])?;
        parse_device_name(&stdout).ok_or_else(|| anyhow!("default sink has no name property"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct SinkVolume {
    pub(super) percent: u8,
    pub(super) muted: bool,
}

/// Parse `Volume: 0.45` or `Volume: 0.45 [MUTED]`.
pub(super) fn parse_volume_output(output: &str) -> Option<SinkVolume> {
    let mut parts = output.split_whitespace();
    if parts.next()? != "Volume:" {
        return None;
    }
    let level: f64 = parts.next()?.parse().ok()?;
    let muted = parts.any(|part| part == "[MUTED]");
    let percent = (level * 100.0).round().clamp(0.0, 100.0) as u8;
    Some(SinkVolume { percent, muted })
}

fn property_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*\*?\s*(node\.description|node\.nick|node\.name)\s*=\s*"([^"]*)""#)
            .expect("sink property regex should compile")
    })
}

/// Pick the friendliest name `wpctl inspect` reports for the sink.
pub(super) fn parse_device_name(output: &str) -> Option<String> {
    let mut nick = None;
    let mut node_name = None;
    for caps in property_regex().captures_iter(output) {
        let value = caps[2].trim().to_string();
        if value.is_empty() {
            continue;
        }
        match &caps[1] {
            "node.description" => return Some(value),
            "node.nick" => nick = nick.or(Some(value)),
            _ => node_name = node_name.or(Some(value)),
        }
    }
    nick.or(node_name)
}
