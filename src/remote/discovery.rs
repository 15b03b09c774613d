//! Sonos discovery via SSDP multicast search.

use super::sonos::SonosSpeaker;
use super::{DiscoveredSpeaker, SpeakerControl, SpeakerDirectory};
use crate::log_debug;
use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SSDP_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
const SSDP_PORT: u16 = 1900;
const ZONE_PLAYER_ST: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";
const SEARCH_REPEATS: usize = 2;

/// `SpeakerDirectory` for Sonos players on the local network.
#[derive(Debug, Clone)]
pub struct SsdpDirectory {
    request_timeout: Duration,
}

impl Default for SsdpDirectory {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl SsdpDirectory {
    /// `request_timeout` bounds each HTTP call made to a player.
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    fn search(&self, timeout: Duration) -> Result<BTreeSet<String>> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
            .context("failed to bind SSDP socket")?;
        let request = search_request();
        let target = SocketAddrV4::new(SSDP_ADDR, SSDP_PORT);
        for _ in 0..SEARCH_REPEATS {
            socket
                .send_to(request.as_bytes(), target)
                .context("failed to send SSDP search")?;
        }

        let deadline = Instant::now() + timeout;
        let mut hosts = BTreeSet::new();
        let mut buf = [0u8; 2048];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            socket
                .set_read_timeout(Some(remaining))
                .context("failed to set SSDP read timeout")?;
            match socket.recv_from(&mut buf) {
                Ok((n, _)) => {
                    let reply = String::from_utf8_lossy(&buf[..n]);
                    if let Some(host) = parse_search_reply(&reply) {
                        hosts.insert(host);
                    }
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    break
                }
                Err(err) => return Err(err).context("SSDP receive failed"),
            }
        }
        Ok(hosts)
    }
}

impl SpeakerDirectory for SsdpDirectory {
    fn discover(&self, timeout: Duration) -> Result<Vec<DiscoveredSpeaker>> {
        let hosts = self.search(timeout)?;
        let mut players = Vec::new();
        for host in hosts {
            let speaker = SonosSpeaker::connect(&host, self.request_timeout)?;
            let described = speaker
                .describe()
                .and_then(|(room, uuid)| Ok((room, uuid, speaker.zone_group_id()?)));
            match described {
                Ok((room, uuid, group_id)) => players.push(ZonePlayer {
                    address: host,
                    room,
                    uuid,
                    group_id,
                }),
                Err(err) => log_debug(&format!("skipping player at {host}: {err:#}")),
            }
        }
        Ok(assemble_speakers(players))
    }

    fn connect(&self, address: &str) -> Result<Arc<dyn SpeakerControl>> {
        let speaker = SonosSpeaker::connect(address, self.request_timeout)?;
        Ok(Arc::new(speaker))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ZonePlayer {
    pub(super) address: String,
    pub(super) room: String,
    pub(super) uuid: String,
    pub(super) group_id: String,
}

/// Link each player to its group coordinator. The coordinator's UUID prefixes
/// the group id.
pub(super) fn assemble_speakers(players: Vec<ZonePlayer>) -> Vec<DiscoveredSpeaker> {
    let by_uuid: HashMap<&str, &str> = players
        .iter()
        .map(|p| (p.uuid.as_str(), p.address.as_str()))
        .collect();
    players
        .iter()
        .map(|player| {
            let coordinator_uuid = player.group_id.split(':').next().unwrap_or_default();
            DiscoveredSpeaker {
                name: player.room.clone(),
                address: player.address.clone(),
                is_coordinator: !coordinator_uuid.is_empty() && coordinator_uuid == player.uuid,
                group_coordinator: by_uuid.get(coordinator_uuid).map(|addr| addr.to_string()),
            }
        })
        .collect()
}

pub(super) fn search_request() -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\nHOST: {SSDP_ADDR}:{SSDP_PORT}\r\nMAN: \"ssdp:discover\"\r\nMX: 1\r\nST: {ZONE_PLAYER_ST}\r\n\r\n"
    )
}

/// Host of the `LOCATION` header in a search reply from a zone player.
pub(super) fn parse_search_reply(reply: &str) -> Option<String> {
    let mut location = None;
    let mut is_zone_player = false;
    for line in reply.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "location" => location = Some(value.to_string()),
            "st" if value == ZONE_PLAYER_ST => is_zone_player = true,
            "server" if value.contains("Sonos") => is_zone_player = true,
            _ => {}
        }
    }
    if !is_zone_player {
        return None;
    }
    let location = location?;
    let rest = location.strip_prefix("http://")?;
    let authority = rest.split('/').next()?;
    let host = authority.split(':').next()?;
    (!host.is_empty()).then(|| host.to_string())
}
