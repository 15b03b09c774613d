use anyhow::Result;
use std::time::Duration;
use volume_relay::config::AppConfig;
use volume_relay::remote::{DiscoveredSpeaker, SpeakerDirectory, SsdpDirectory};

pub(crate) fn list_speakers(config: &AppConfig) -> Result<()> {
    // VOLUME_RELAY_TEST_SPEAKERS="name@address,..." skips the network for tests.
    let speakers = if let Ok(raw) = std::env::var("VOLUME_RELAY_TEST_SPEAKERS") {
        parse_test_speakers(&raw)
    } else {
        let directory = SsdpDirectory::default();
        directory
            .discover(Duration::from_millis(config.discovery_timeout_ms))
            .unwrap_or_else(|err| {
                eprintln!("Speaker discovery failed: {err:#}");
                Vec::new()
            })
    };

    if speakers.is_empty() {
        println!("No speakers found.");
        return Ok(());
    }
    println!("Speakers found:");
    for speaker in speakers {
        let role = if speaker.is_coordinator {
            "coordinator".to_string()
        } else {
            match &speaker.group_coordinator {
                Some(address) => format!("member of {address}"),
                None => "member".to_string(),
            }
        };
        println!("  - {} @ {} ({role})", speaker.name, speaker.address);
    }
    Ok(())
}

fn parse_test_speakers(raw: &str) -> Vec<DiscoveredSpeaker> {
    raw.split(',')
        .filter_map(|item| {
            let (name, address) = item.trim().split_once('@')?;
            Some(DiscoveredSpeaker {
                name: name.trim().to_string(),
                address: address.trim().to_string(),
                is_coordinator: true,
                group_coordinator: None,
            })
        })
        .collect()
}
