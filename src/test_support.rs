//! In-memory collaborators shared by the unit tests.

use crate::local::LocalAudioEndpoint;
use crate::remote::{DiscoveredSpeaker, SpeakerControl, SpeakerDirectory};
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct EndpointState {
    pub(crate) volume: u8,
    pub(crate) muted: bool,
    pub(crate) device_name: String,
    pub(crate) fail_reads: bool,
    pub(crate) fail_writes: bool,
    pub(crate) volume_writes: Vec<u8>,
    pub(crate) mute_writes: Vec<bool>,
    pub(crate) name_queries: usize,
}

#[derive(Debug, Default)]
pub(crate) struct FakeEndpoint {
    pub(crate) state: Mutex<EndpointState>,
}

impl FakeEndpoint {
    pub(crate) fn new(device_name: &str, volume: u8) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(EndpointState {
                volume,
                device_name: device_name.to_string(),
                ..EndpointState::default()
            }),
        })
    }

    pub(crate) fn with<T>(&self, f: impl FnOnce(&mut EndpointState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }
}

impl LocalAudioEndpoint for FakeEndpoint {
    fn volume_percent(&self) -> Result<u8> {
        self.with(|s| {
            if s.fail_reads {
                bail!("endpoint unavailable");
            }
            Ok(s.volume)
        })
    }

    fn set_volume_percent(&self, percent: u8) -> Result<()> {
        self.with(|s| {
            if s.fail_writes {
                bail!("endpoint busy");
            }
            s.volume = percent;
            s.volume_writes.push(percent);
            Ok(())
        })
    }

    fn muted(&self) -> Result<bool> {
        self.with(|s| {
            if s.fail_reads {
                bail!("endpoint unavailable");
            }
            Ok(s.muted)
        })
    }

    fn set_muted(&self, muted: bool) -> Result<()> {
        self.with(|s| {
            if s.fail_writes {
                bail!("endpoint busy");
            }
            s.muted = muted;
            s.mute_writes.push(muted);
            Ok(())
        })
    }

    fn default_output_name(&self) -> Result<String> {
        self.with(|s| {
            s.name_queries += 1;
            if s.fail_reads {
                bail!("endpoint unavailable");
            }
            Ok(s.device_name.clone())
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct SpeakerState {
    pub(crate) volume: u8,
    pub(crate) transport: String,
    pub(crate) source: String,
    pub(crate) unreachable: bool,
    pub(crate) volume_writes: Vec<u8>,
    pub(crate) volume_reads: usize,
}

#[derive(Debug)]
pub(crate) struct FakeSpeaker {
    address: String,
    pub(crate) state: Mutex<SpeakerState>,
}

impl FakeSpeaker {
    pub(crate) fn new(address: &str, volume: u8) -> Arc<Self> {
        Arc::new(Self {
            address: address.to_string(),
            state: Mutex::new(SpeakerState {
                volume,
                transport: "STOPPED".to_string(),
                ..SpeakerState::default()
            }),
        })
    }

    pub(crate) fn with<T>(&self, f: impl FnOnce(&mut SpeakerState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub(crate) fn writes(&self) -> Vec<u8> {
        self.with(|s| s.volume_writes.clone())
    }
}

impl SpeakerControl for FakeSpeaker {
    fn address(&self) -> &str {
        &self.address
    }

    fn volume(&self) -> Result<u8> {
        self.with(|s| {
            if s.unreachable {
                bail!("connection refused");
            }
            s.volume_reads += 1;
            Ok(s.volume)
        })
    }

    fn set_volume(&self, percent: u8) -> Result<()> {
        self.with(|s| {
            if s.unreachable {
                bail!("connection refused");
            }
            s.volume = percent;
            s.volume_writes.push(percent);
            Ok(())
        })
    }

    fn transport_state(&self) -> Result<String> {
        self.with(|s| {
            if s.unreachable {
                bail!("connection refused");
            }
            Ok(s.transport.clone())
        })
    }

    fn current_source(&self) -> Result<String> {
        self.with(|s| {
            if s.unreachable {
                bail!("connection refused");
            }
            Ok(s.source.clone())
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeDirectory {
    pub(crate) listing: Mutex<Vec<DiscoveredSpeaker>>,
    speakers: Mutex<HashMap<String, Arc<FakeSpeaker>>>,
    pub(crate) discover_calls: AtomicUsize,
    pub(crate) connect_calls: AtomicUsize,
}

impl FakeDirectory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `speaker` connectable without listing it in discovery results.
    pub(crate) fn add_reachable(&self, speaker: &Arc<FakeSpeaker>) {
        self.speakers
            .lock()
            .unwrap()
            .insert(speaker.address().to_string(), Arc::clone(speaker));
    }

    /// Make `speaker` connectable and list it in discovery results.
    pub(crate) fn add_listed(
        &self,
        name: &str,
        speaker: &Arc<FakeSpeaker>,
        is_coordinator: bool,
        group_coordinator: Option<&str>,
    ) {
        self.add_reachable(speaker);
        self.listing.lock().unwrap().push(DiscoveredSpeaker {
            name: name.to_string(),
            address: speaker.address().to_string(),
            is_coordinator,
            group_coordinator: group_coordinator.map(str::to_string),
        });
    }

    pub(crate) fn discover_count(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }
}

impl SpeakerDirectory for FakeDirectory {
    fn discover(&self, _timeout: Duration) -> Result<Vec<DiscoveredSpeaker>> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.listing.lock().unwrap().clone())
    }

    fn connect(&self, address: &str) -> Result<Arc<dyn SpeakerControl>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let speakers = self.speakers.lock().unwrap();
        let speaker = speakers
            .get(address)
            .ok_or_else(|| anyhow!("no route to {address}"))?;
        Ok(Arc::clone(speaker) as Arc<dyn SpeakerControl>)
    }
}
