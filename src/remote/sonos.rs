//! Sonos speaker control over UPnP SOAP (HTTP port 1400).

use super::{SpeakerControl, LINE_IN_SOURCE};
use crate::lock_or_recover;
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use reqwest::blocking::Client;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

pub(super) const SONOS_PORT: u16 = 1400;
const LINE_IN_URI_PREFIX: &str = "x-rincon-stream:";

#[derive(Debug, Clone, Copy)]
pub(super) enum Service {
    RenderingControl,
    AvTransport,
    ZoneGroupTopology,
}

impl Service {
    fn control_path(self) -> &'static str {
        match self {
            Service::RenderingControl => "/MediaRenderer/RenderingControl/Control",
            Service::AvTransport => "/MediaRenderer/AVTransport/Control",
            Service::ZoneGroupTopology => "/ZoneGroupTopology/Control",
        }
    }

    fn urn(self) -> &'static str {
        match self {
            Service::RenderingControl => "urn:schemas-upnp-org:service:RenderingControl:1",
            Service::AvTransport => "urn:schemas-upnp-org:service:AVTransport:1",
            Service::ZoneGroupTopology => "urn:schemas-upnp-org:service:ZoneGroupTopology:1",
        }
    }
}

/// One Sonos player addressed by IP.
#[derive(Debug, Clone)]
pub struct SonosSpeaker {
    address: String,
    client: Client,
}

impl SonosSpeaker {
    pub fn connect(address: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            address: address.to_string(),
            client,
        })
    }

    fn base_url(&self) -> String {
        format!("http://{}:{SONOS_PORT}", self.address)
    }

    fn call(&self, service: Service, action: &str, args: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{}", self.base_url(), service.control_path());
        let body = soap_envelope(service, action, args);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .header("SOAPACTION", format!("\"{}#{action}\"", service.urn()))
            .body(body)
            .send()
            .with_context(|| format!("{action} request to {} failed", self.address))?;
        let status = response.status();
        let text = response
            .text()
            .with_context(|| format!("{action} response from {} unreadable", self.address))?;
        if !status.is_success() {
            bail!("{action} on {} returned HTTP {status}", self.address);
        }
        Ok(text)
    }

    fn call_for(&self, service: Service, action: &str, args: &[(&str, String)], tag: &str) -> Result<String> {
        let text = self.call(service, action, args)?;
        extract_tag(&text, tag)
            .ok_or_else(|| anyhow!("{action} response from {} lacks <{tag}>", self.address))
    }

    /// Room name and UDN (without the `uuid:` prefix) from the device description.
    pub(super) fn describe(&self) -> Result<(String, String)> {
        let url = format!("{}/xml/device_description.xml", self.base_url());
        let text = self
            .client
            .get(&url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .with_context(|| format!("device description from {} unavailable", self.address))?;
        let room = extract_tag(&text, "roomName")
            .ok_or_else(|| anyhow!("device description from {} lacks roomName", self.address))?;
        let udn = extract_tag(&text, "UDN")
            .ok_or_else(|| anyhow!("device description from {} lacks UDN", self.address))?;
        Ok((room, udn.trim_start_matches("uuid:").to_string()))
    }

    /// Group id of the zone this player belongs to (`<coordinator uuid>:<n>`).
    pub(super) fn zone_group_id(&self) -> Result<String> {
        self.call_for(
            Service::ZoneGroupTopology,
            "GetZoneGroupAttributes",
            &[],
            "CurrentZoneGroupID",
        )
    }
}

impl SpeakerControl for SonosSpeaker {
    fn address(&self) -> &str {
        &self.address
    }

    fn volume(&self) -> Result<u8> {
        let raw = self.call_for(
            Service::RenderingControl,
            "GetVolume",
            &[("InstanceID", "0".into()), ("Channel", "Master".into())],
            "CurrentVolume",
        )?;
        let volume: u16 = raw
            .trim()
            .parse()
            .with_context(|| format!("invalid volume '{raw}' from {}", self.address))?;
        Ok(volume.min(100) as u8)
    }

    fn set_volume(&self, percent: u8) -> Result<()> {
        self.call(
            Service::RenderingControl,
            "SetVolume",
            &[
                ("InstanceID", "0".into()),
                ("Channel", "Master".into()),
                ("DesiredVolume", percent.min(100).to_string()),
            ],
        )
        .map(|_| ())
    }

    fn transport_state(&self) -> Result<String> {
        self.call_for(
            Service::AvTransport,
            "GetTransportInfo",
            &[("InstanceID", "0".into())],
            "CurrentTransportState",
        )
    }

    fn current_source(&self) -> Result<String> {
        let uri = self.call_for(
            Service::AvTransport,
            "GetMediaInfo",
            &[("InstanceID", "0".into())],
            "CurrentURI",
        )?;
        Ok(source_from_uri(&uri))
    }
}

pub(super) fn soap_envelope(service: Service, action: &str, args: &[(&str, String)]) -> String {
    let mut arguments = String::new();
    for (name, value) in args {
        arguments.push_str(&format!("<{name}>{}</{name}>", xml_escape(value)));
    }
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" "#,
            r#"s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">"#,
            r#"<s:Body><u:{action} xmlns:u="{urn}">{arguments}</u:{action}></s:Body></s:Envelope>"#
        ),
        action = action,
        urn = service.urn(),
        arguments = arguments
    )
}

/// Map a media URI to the source label the mute logic understands.
pub(super) fn source_from_uri(uri: &str) -> String {
    if uri.starts_with(LINE_IN_URI_PREFIX) {
        LINE_IN_SOURCE.to_string()
    } else {
        uri.to_string()
    }
}

/// Text of the first `<tag>` element, unescaped. Empty elements yield `""`.
pub(super) fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let caps = tag_regex(tag).captures(xml)?;
    Some(
        caps.get(1)
            .map(|m| xml_unescape(m.as_str()))
            .unwrap_or_default(),
    )
}

/// Compiled element patterns, one per tag name seen.
fn tag_regex(tag: &str) -> Regex {
    static PATTERNS: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();
    let mut patterns = lock_or_recover(
        PATTERNS.get_or_init(|| Mutex::new(HashMap::new())),
        "soap tag patterns",
    );
    patterns
        .entry(tag.to_string())
        .or_insert_with(|| {
            let pattern = format!(
                r"<{0}(?:\s[^>]*)?>([^<]*)</{0}>|<{0}(?:\s[^>]*)?/>",
                regex::escape(tag)
            );
            Regex::new(&pattern).expect("escaped tag pattern should compile")
        })
        .clone()
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub(super) fn xml_unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
