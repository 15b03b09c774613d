use super::discovery::{assemble_speakers, parse_search_reply, search_request, ZonePlayer};
use super::handle::choose_speaker;
use super::sonos::{extract_tag, soap_envelope, source_from_uri, xml_unescape, Service};
use super::*;
use crate::config::SpeakerTarget;
use crate::test_support::{FakeDirectory, FakeSpeaker};
use std::sync::atomic::Ordering;
use std::time::Duration;

fn handle_for(target: SpeakerTarget, directory: &Arc<FakeDirectory>) -> RemoteSpeakerHandle {
    RemoteSpeakerHandle::new(
        target,
        Arc::clone(directory) as Arc<dyn SpeakerDirectory>,
        Duration::from_millis(10),
    )
}

fn listed(name: &str, address: &str, is_coordinator: bool) -> DiscoveredSpeaker {
    DiscoveredSpeaker {
        name: name.to_string(),
        address: address.to_string(),
        is_coordinator,
        group_coordinator: None,
    }
}

#[test]
fn playback_state_mute_rules() {
    assert!(PlaybackState::from_reported("PLAYING", "x-sonos-spotify:abc").wants_local_mute());
    assert!(!PlaybackState::from_reported("PLAYING", LINE_IN_SOURCE).wants_local_mute());
    assert!(!PlaybackState::from_reported("PAUSED_PLAYBACK", "").wants_local_mute());
    assert!(!PlaybackState::from_reported("playing", "").wants_local_mute());
}

#[test]
fn fixed_address_connects_and_probes_once() {
    let directory = FakeDirectory::new();
    let speaker = FakeSpeaker::new("10.0.0.5", 42);
    directory.add_reachable(&speaker);
    let handle = handle_for(SpeakerTarget::Address("10.0.0.5".into()), &directory);

    handle.resolve().expect("resolve");
    assert_eq!(handle.connected_address().as_deref(), Some("10.0.0.5"));
    assert_eq!(speaker.with(|s| s.volume_reads), 1);
    assert!((handle.cached_volume() - 0.42).abs() < 1e-9);
    assert_eq!(directory.discover_count(), 0);
}

#[test]
fn known_volume_waits_for_first_reading() {
    let directory = FakeDirectory::new();
    let speaker = FakeSpeaker::new("10.0.0.5", 64);
    directory.add_reachable(&speaker);
    let handle = handle_for(SpeakerTarget::Address("10.0.0.5".into()), &directory);

    assert_eq!(handle.known_volume(), None);
    assert!((handle.cached_volume() - 0.1).abs() < 1e-9);
    handle.volume().expect("read volume");
    assert_eq!(handle.known_volume(), Some(0.64));
}

#[test]
fn fixed_address_failure_reports_unreachable() {
    let directory = FakeDirectory::new();
    let speaker = FakeSpeaker::new("10.0.0.5", 42);
    speaker.with(|s| s.unreachable = true);
    directory.add_reachable(&speaker);
    let handle = handle_for(SpeakerTarget::Address("10.0.0.5".into()), &directory);

    assert!(handle.resolve().is_err());
    assert!(handle.connected_address().is_none());
    assert_eq!(directory.connect_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn name_match_is_case_insensitive_and_exact() {
    let found = vec![
        listed("Kitchen Five", "10.0.0.1", true),
        listed("kitchen", "10.0.0.2", false),
    ];
    assert_eq!(choose_speaker(&found, "KITCHEN").unwrap().address, "10.0.0.2");
    assert!(choose_speaker(&found, "Kit").is_none());
}

#[test]
fn matching_coordinator_is_preferred() {
    let found = vec![
        listed("Living Room", "10.0.0.1", false),
        listed("Living Room", "10.0.0.2", true),
    ];
    assert_eq!(
        choose_speaker(&found, "living room").unwrap().address,
        "10.0.0.2"
    );
}

#[test]
fn non_coordinator_match_resolves_to_group_coordinator() {
    let directory = FakeDirectory::new();
    let member = FakeSpeaker::new("10.0.0.7", 20);
    let coordinator = FakeSpeaker::new("10.0.0.8", 35);
    directory.add_listed("Bedroom", &member, false, Some("10.0.0.8"));
    directory.add_listed("Office", &coordinator, true, Some("10.0.0.8"));
    let handle = handle_for(SpeakerTarget::Name("bedroom".into()), &directory);

    assert_eq!(handle.set_volume_percent(30).expect("set"), 30);
    assert_eq!(coordinator.writes(), vec![30]);
    assert!(member.writes().is_empty());
}

#[test]
fn unreachable_group_coordinator_falls_back_to_match() {
    let directory = FakeDirectory::new();
    let member = FakeSpeaker::new("10.0.0.7", 20);
    directory.add_listed("Bedroom", &member, false, Some("10.0.0.99"));
    let handle = handle_for(SpeakerTarget::Name("Bedroom".into()), &directory);

    handle.resolve().expect("resolve");
    assert_eq!(handle.connected_address().as_deref(), Some("10.0.0.7"));
}

#[test]
fn missing_name_is_reported_not_raised() {
    let directory = FakeDirectory::new();
    let other = FakeSpeaker::new("10.0.0.3", 10);
    directory.add_listed("Patio", &other, true, None);
    let handle = handle_for(SpeakerTarget::Name("Den".into()), &directory);

    let err = handle.resolve().unwrap_err();
    assert!(format!("{err:#}").contains("Den"));
    assert!(handle.connected_address().is_none());
}

#[test]
fn failure_invalidates_and_next_call_rediscovers() {
    let directory = FakeDirectory::new();
    let speaker = FakeSpeaker::new("10.0.0.4", 50);
    directory.add_listed("Den", &speaker, true, None);
    let handle = handle_for(SpeakerTarget::Name("Den".into()), &directory);

    handle.volume().expect("first read");
    handle.volume().expect("cached read");
    assert_eq!(directory.discover_count(), 1);

    speaker.with(|s| s.unreachable = true);
    assert!(handle.volume().is_err());
    assert!(handle.connected_address().is_none());

    speaker.with(|s| s.unreachable = false);
    handle.volume().expect("read after recovery");
    assert_eq!(directory.discover_count(), 2);
}

#[test]
fn apply_step_rounds_and_clamps() {
    let directory = FakeDirectory::new();
    let speaker = FakeSpeaker::new("10.0.0.4", 20);
    directory.add_listed("Den", &speaker, true, None);
    let handle = handle_for(SpeakerTarget::Name("Den".into()), &directory);

    assert_eq!(handle.apply_step(Direction::Up, 2.8).unwrap(), 23);
    assert!((handle.cached_volume() - 0.23).abs() < 1e-9);

    speaker.with(|s| s.volume = 98);
    assert_eq!(handle.apply_step(Direction::Up, 10.0).unwrap(), 100);
    speaker.with(|s| s.volume = 3);
    assert_eq!(handle.apply_step(Direction::Down, 10.0).unwrap(), 0);
}

#[test]
fn apply_step_round_trip_restores_volume() {
    let directory = FakeDirectory::new();
    let speaker = FakeSpeaker::new("10.0.0.4", 47);
    directory.add_listed("Den", &speaker, true, None);
    let handle = handle_for(SpeakerTarget::Name("Den".into()), &directory);

    for step in [1.0, 4.0, 10.0] {
        handle.apply_step(Direction::Up, step).unwrap();
        assert_eq!(handle.apply_step(Direction::Down, step).unwrap(), 47);
    }
}

#[test]
fn apply_step_floors_tiny_magnitudes() {
    let directory = FakeDirectory::new();
    let speaker = FakeSpeaker::new("10.0.0.4", 50);
    directory.add_listed("Den", &speaker, true, None);
    let handle = handle_for(SpeakerTarget::Name("Den".into()), &directory);

    assert_eq!(handle.apply_step(Direction::Up, 0.0).unwrap(), 50);
    assert_eq!(speaker.writes(), vec![50]);
}

#[test]
fn snapshot_reads_volume_and_playback() {
    let directory = FakeDirectory::new();
    let speaker = FakeSpeaker::new("10.0.0.4", 64);
    speaker.with(|s| {
        s.transport = "PLAYING".into();
        s.source = LINE_IN_SOURCE.into();
    });
    directory.add_listed("Den", &speaker, true, None);
    let handle = handle_for(SpeakerTarget::Name("Den".into()), &directory);

    let snapshot = handle.snapshot().expect("snapshot");
    assert!((snapshot.volume - 0.64).abs() < 1e-9);
    assert!(snapshot.playback.is_playing);
    assert!(snapshot.playback.is_line_input);
    assert_eq!(handle.playback_state().unwrap(), snapshot.playback);
}

#[test]
fn ssdp_reply_yields_host_for_zone_players_only() {
    let reply = "HTTP/1.1 200 OK\r\nCACHE-CONTROL: max-age = 1800\r\nLOCATION: http://192.168.1.31:1400/xml/device_description.xml\r\nSERVER: Linux UPnP/1.0 Sonos/70.3-35220 (ZPS14)\r\nST: urn:schemas-upnp-org:device:ZonePlayer:1\r\n\r\n";
    assert_eq!(parse_search_reply(reply).as_deref(), Some("192.168.1.31"));

    let router = "HTTP/1.1 200 OK\r\nLOCATION: http://192.168.1.1:5000/rootDesc.xml\r\nST: upnp:rootdevice\r\nSERVER: miniupnpd\r\n\r\n";
    assert!(parse_search_reply(router).is_none());
}

#[test]
fn search_request_targets_zone_players() {
    let request = search_request();
    assert!(request.starts_with("M-SEARCH * HTTP/1.1\r\n"));
    assert!(request.contains("HOST: 239.255.255.250:1900"));
    assert!(request.contains("ST: urn:schemas-upnp-org:device:ZonePlayer:1"));
    assert!(request.ends_with("\r\n\r\n"));
}

#[test]
fn assemble_links_members_to_coordinator() {
    let players = vec![
        ZonePlayer {
            address: "10.0.0.1".into(),
            room: "Office".into(),
            uuid: "RINCON_A1400".into(),
            group_id: "RINCON_A1400:12".into(),
        },
        ZonePlayer {
            address: "10.0.0.2".into(),
            room: "Bedroom".into(),
            uuid: "RINCON_B1400".into(),
            group_id: "RINCON_A1400:12".into(),
        },
        ZonePlayer {
            address: "10.0.0.3".into(),
            room: "Patio".into(),
            uuid: "RINCON_C1400".into(),
            group_id: "RINCON_Z1400:3".into(),
        },
    ];
    let speakers = assemble_speakers(players);
    assert!(speakers[0].is_coordinator);
    assert!(!speakers[1].is_coordinator);
    assert_eq!(speakers[1].group_coordinator.as_deref(), Some("10.0.0.1"));
    assert!(!speakers[2].is_coordinator);
    assert!(speakers[2].group_coordinator.is_none());
}

#[test]
fn extracts_and_unescapes_soap_values() {
    let body = "<s:Envelope><s:Body><u:GetMediaInfoResponse><NrTracks>1</NrTracks><CurrentURI>x-rincon-stream:RINCON_A1400</CurrentURI><CurrentURIMetaData>&lt;DIDL-Lite&gt;</CurrentURIMetaData><NextURI></NextURI></u:GetMediaInfoResponse></s:Body></s:Envelope>";
    assert_eq!(
        extract_tag(body, "CurrentURI").as_deref(),
        Some("x-rincon-stream:RINCON_A1400")
    );
    assert_eq!(
        extract_tag(body, "CurrentURIMetaData").as_deref(),
        Some("<DIDL-Lite>")
    );
    assert_eq!(extract_tag(body, "NextURI").as_deref(), Some(""));
    assert!(extract_tag(body, "TrackURI").is_none());
    assert_eq!(xml_unescape("a &amp;lt; b"), "a &lt; b");
}

#[test]
fn cached_tag_patterns_apply_to_later_responses() {
    let first = "<CurrentVolume>12</CurrentVolume><CurrentTransportState>PLAYING</CurrentTransportState>";
    let second = "<CurrentVolume>88</CurrentVolume><CurrentTransportState>STOPPED</CurrentTransportState>";
    assert_eq!(extract_tag(first, "CurrentVolume").as_deref(), Some("12"));
    assert_eq!(extract_tag(second, "CurrentVolume").as_deref(), Some("88"));
    assert_eq!(
        extract_tag(second, "CurrentTransportState").as_deref(),
        Some("STOPPED")
    );
    assert!(extract_tag(second, "Current.*").is_none());
}

#[test]
fn line_in_uri_maps_to_line_in_source() {
    assert_eq!(source_from_uri("x-rincon-stream:RINCON_A1400"), LINE_IN_SOURCE);
    assert_eq!(source_from_uri("x-sonos-spotify:track"), "x-sonos-spotify:track");
}

#[test]
fn soap_envelope_carries_action_and_arguments() {
    let body = soap_envelope(
        Service::RenderingControl,
        "SetVolume",
        &[("InstanceID", "0".into()), ("DesiredVolume", "23".into())],
    );
    assert!(body.contains(
        r#"<u:SetVolume xmlns:u="urn:schemas-upnp-org:service:RenderingControl:1">"#
    ));
    assert!(body.contains("<InstanceID>0</InstanceID><DesiredVolume>23</DesiredVolume>"));
    assert!(body.ends_with("</u:SetVolume></s:Body></s:Envelope>"));
}
