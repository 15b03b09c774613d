use super::{
    Direction, DiscoveredSpeaker, PlaybackState, SpeakerControl, SpeakerDirectory,
};
use crate::config::SpeakerTarget;
use crate::lock_or_recover;
use crate::log_debug;
use anyhow::{anyhow, bail, Context, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Step-sizing stand-in until the speaker has been read once.
const INITIAL_VOLUME: f64 = 0.1;
/// Smallest change `apply_step` will send.
const MIN_STEP_PERCENT: f64 = 0.1;

/// Lock-free last known speaker volume (0.0-1.0) so the key path can size
/// steps without touching the network.
#[derive(Debug)]
struct VolumeCell {
    bits: AtomicU64,
    /// Set once a real reading or write has landed.
    known: AtomicBool,
}

impl VolumeCell {
    fn new(volume: f64) -> Self {
        Self {
            bits: AtomicU64::new(volume.to_bits()),
            known: AtomicBool::new(false),
        }
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    fn known(&self) -> Option<f64> {
        if self.known.load(Ordering::Acquire) {
            Some(self.get())
        } else {
            None
        }
    }

    fn set_percent(&self, percent: u8) {
        let fraction = f64::from(percent.min(100)) / 100.0;
        self.bits.store(fraction.to_bits(), Ordering::Relaxed);
        self.known.store(true, Ordering::Release);
    }
}

/// Volume and playback state read in one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteSnapshot {
    pub volume: f64,
    pub playback: PlaybackState,
}

/// Lazily resolved, self-invalidating connection to the target speaker.
///
/// All speaker I/O runs under the connection lock, which serializes this
/// process's read-modify-write volume updates.
pub struct RemoteSpeakerHandle {
    target: SpeakerTarget,
    directory: Arc<dyn SpeakerDirectory>,
    discovery_timeout: Duration,
    connection: Mutex<Option<Arc<dyn SpeakerControl>>>,
    last_volume: VolumeCell,
}

impl RemoteSpeakerHandle {
    pub fn new(
        target: SpeakerTarget,
        directory: Arc<dyn SpeakerDirectory>,
        discovery_timeout: Duration,
    ) -> Self {
        Self {
            target,
            directory,
            discovery_timeout,
            connection: Mutex::new(None),
            last_volume: VolumeCell::new(INITIAL_VOLUME),
        }
    }

    /// Address of the cached connection, if one is resolved.
    pub fn connected_address(&self) -> Option<String> {
        lock_or_recover(&self.connection, "speaker connection")
            .as_ref()
            .map(|speaker| speaker.address().to_string())
    }

    /// Resolve the speaker now unless a connection is already cached.
    pub fn resolve(&self) -> Result<()> {
        self.with_speaker("resolve", |_| Ok(()))
    }

    /// Drop the cached connection; the next call resolves from scratch.
    pub fn invalidate(&self) {
        lock_or_recover(&self.connection, "speaker connection").take();
    }

    /// Last known volume fraction. Never blocks on the network.
    pub fn cached_volume(&self) -> f64 {
        self.last_volume.get()
    }

    /// Cached volume fraction, or `None` if the speaker has never been read.
    pub fn known_volume(&self) -> Option<f64> {
        self.last_volume.known()
    }

    /// Read the current volume fraction from the speaker.
    pub fn volume(&self) -> Result<f64> {
        let percent = self.with_speaker("get volume", |speaker| speaker.volume())?;
        self.last_volume.set_percent(percent);
        Ok(f64::from(percent.min(100)) / 100.0)
    }

    pub fn set_volume_percent(&self, percent: u8) -> Result<u8> {
        let percent = percent.min(100);
        self.with_speaker("set volume", |speaker| {
            speaker.set_volume(percent)?;
            tracing::info!(address = speaker.address(), percent, "speaker volume set");
            Ok(())
        })?;
        self.last_volume.set_percent(percent);
        Ok(percent)
    }

    /// Move the speaker volume by `magnitude` percentage points and return the
    /// percent written.
    pub fn apply_step(&self, direction: Direction, magnitude: f64) -> Result<u8> {
        let step = magnitude.abs().max(MIN_STEP_PERCENT);
        let percent = self.with_speaker("apply step", |speaker| {
            let current = f64::from(speaker.volume()?);
            let next = (current + direction.sign() * step).clamp(0.0, 100.0);
            let percent = next.round() as u8;
            speaker.set_volume(percent)?;
            tracing::info!(
                address = speaker.address(),
                direction = direction.label(),
                step,
                from = current,
                percent,
                "speaker volume stepped"
            );
            Ok(percent)
        })?;
        self.last_volume.set_percent(percent);
        Ok(percent)
    }

    pub fn playback_state(&self) -> Result<PlaybackState> {
        self.with_speaker("read playback state", read_playback)
    }

    /// Read volume and playback state under one connection lock.
    pub fn snapshot(&self) -> Result<RemoteSnapshot> {
        let (percent, playback) = self.with_speaker("poll speaker", |speaker| {
            Ok((speaker.volume()?, read_playback(speaker)?))
        })?;
        self.last_volume.set_percent(percent);
        Ok(RemoteSnapshot {
            volume: f64::from(percent.min(100)) / 100.0,
            playback,
        })
    }

    /// Run `op` against the cached speaker, resolving it first if needed. Any
    /// failure drops the connection.
    fn with_speaker<T>(
        &self,
        what: &str,
        op: impl FnOnce(&dyn SpeakerControl) -> Result<T>,
    ) -> Result<T> {
        let mut connection = lock_or_recover(&self.connection, "speaker connection");
        let speaker = match connection.as_ref() {
            Some(speaker) => Arc::clone(speaker),
            None => {
                let speaker = self.resolve_target()?;
                *connection = Some(Arc::clone(&speaker));
                speaker
            }
        };
        match op(speaker.as_ref()) {
            Ok(value) => Ok(value),
            Err(err) => {
                connection.take();
                log_debug(&format!(
                    "speaker {} failed to {what}: {err:#}; dropping connection",
                    speaker.address()
                ));
                tracing::warn!(address = speaker.address(), operation = what, error = %err, "speaker call failed");
                Err(err.context(format!("speaker failed to {what}")))
            }
        }
    }

    fn resolve_target(&self) -> Result<Arc<dyn SpeakerControl>> {
        match &self.target {
            SpeakerTarget::Address(address) => {
                let speaker = self
                    .directory
                    .connect(address)
                    .with_context(|| format!("connect to speaker at {address}"))?;
                let percent = speaker
                    .volume()
                    .with_context(|| format!("speaker at {address} did not answer"))?;
                self.last_volume.set_percent(percent);
                log_debug(&format!("connected to speaker at {address}"));
                Ok(speaker)
            }
            SpeakerTarget::Name(name) => self.resolve_by_name(name),
        }
    }

    fn resolve_by_name(&self, name: &str) -> Result<Arc<dyn SpeakerControl>> {
        log_debug(&format!("discovering speakers (looking for '{name}')"));
        let found = self
            .directory
            .discover(self.discovery_timeout)
            .context("speaker discovery failed")?;
        if found.is_empty() {
            bail!("discovery returned no speakers");
        }
        let choice = choose_speaker(&found, name).ok_or_else(|| {
            let names: Vec<&str> = found.iter().map(|s| s.name.as_str()).collect();
            anyhow!("no speaker named '{name}' (found: {names:?})")
        })?;

        if choice.is_coordinator {
            log_debug(&format!(
                "using coordinator '{}' at {}",
                choice.name, choice.address
            ));
            return self.directory.connect(&choice.address);
        }

        log_debug(&format!(
            "'{}' at {} is not a coordinator; resolving its group coordinator",
            choice.name, choice.address
        ));
        let coordinator = match &choice.group_coordinator {
            Some(address) => self.directory.connect(address),
            None => Err(anyhow!("group coordinator unknown")),
        };
        match coordinator {
            Ok(speaker) => {
                log_debug(&format!("using group coordinator at {}", speaker.address()));
                Ok(speaker)
            }
            Err(err) => {
                log_debug(&format!(
                    "group coordinator resolution failed ({err:#}); using '{}' directly",
                    choice.name
                ));
                self.directory.connect(&choice.address)
            }
        }
    }
}

fn read_playback(speaker: &dyn SpeakerControl) -> Result<PlaybackState> {
    let transport = speaker.transport_state()?;
    let source = speaker.current_source()?;
    Ok(PlaybackState::from_reported(&transport, &source))
}

/// Case-insensitive exact name match; a matching coordinator wins, otherwise
/// the first match.
pub(super) fn choose_speaker<'a>(
    found: &'a [DiscoveredSpeaker],
    name: &str,
) -> Option<&'a DiscoveredSpeaker> {
    let wanted = name.to_lowercase();
    let mut matches = found.iter().filter(|s| s.name.to_lowercase() == wanted);
    let first = matches.next()?;
    if first.is_coordinator {
        return Some(first);
    }
    Some(matches.find(|s| s.is_coordinator).unwrap_or(first))
}
