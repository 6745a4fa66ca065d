//! Integration tests for parsing compute API data.
//!
//! These tests validate that the compute-api models can deserialize the
//! response bodies of the listing endpoints, including ids given as integers
//! on some deployments and as strings on others.

use compute_api::models::{Flavor, Image, Limits, Server};
use compute_api::{FlavorId, ImageId, ServerId};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Load a fixture and unwrap its top-level envelope.
fn load_fixture<T: DeserializeOwned>(name: &str, key: &str) -> T {
    let fixture_path = fixtures_dir().join(name);
    let json_data = fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture at {}: {}",
            fixture_path.display(),
            e
        )
    });

    let mut envelope: Value = serde_json::from_str(&json_data)
        .unwrap_or_else(|e| panic!("Fixture {name} is not valid JSON: {e}"));
    serde_json::from_value(envelope[key].take())
        .unwrap_or_else(|e| panic!("Failed to deserialize `{key}` from {name}: {e}"))
}

#[test]
fn test_deserialize_servers_detail() {
    let servers: Vec<Server> = load_fixture("servers_detail.json", "servers");
    assert_eq!(servers.len(), 2, "Expected 2 servers in test data");

    let building = &servers[0];
    assert_eq!(building.id, ServerId::from(1234));
    assert_eq!(building.status.as_deref(), Some("BUILD"));
    assert_eq!(building.progress, Some(60));
    assert_eq!(building.image.as_ref().map(|image| &image.id), Some(&ImageId::from(2)));
    assert_eq!(building.flavor.as_ref().map(|flavor| &flavor.id), Some(&FlavorId::from(1)));
    assert_eq!(building.metadata.get("Server Label").map(String::as_str), Some("Web Head 1"));
    assert!(building.created.is_some());

    // Empty accessIPv4 falls back to the public address
    assert_eq!(building.access_ipv4(), Some("67.23.10.132"));
    assert_eq!(building.access_ipv6(), Some("::babe:67.23.10.132"));
}

#[test]
fn test_server_with_uuid_ids() {
    let servers: Vec<Server> = load_fixture("servers_detail.json", "servers");
    let active = &servers[1];

    assert_eq!(active.id.as_str(), "52415800-8b69-11e0-9b19-734f565bc83b");
    assert_eq!(active.status.as_deref(), Some("ACTIVE"));
    assert_eq!(active.access_ipv4(), Some("67.23.10.133"));
    assert_eq!(active.access_ipv6(), None);
    assert!(active.links.is_empty());
    assert!(active.created.is_none());
}

#[test]
fn test_deserialize_images_detail() {
    let images: Vec<Image> = load_fixture("images_detail.json", "images");
    assert_eq!(images.len(), 2);

    let gold = &images[0];
    assert_eq!(gold.name, "CentOS 5.2");
    assert_eq!(gold.min_disk, Some(10));
    assert_eq!(gold.metadata.get("ImageType").map(String::as_str), Some("Gold"));

    let backup = &images[1];
    assert_eq!(backup.id, ImageId::from(743));
    assert_eq!(backup.progress, Some(80));
    assert_eq!(backup.server.as_ref().map(|server| server.id.as_str()), Some("12"));
}

#[test]
fn test_deserialize_flavors_detail() {
    let flavors: Vec<Flavor> = load_fixture("flavors_detail.json", "flavors");
    assert_eq!(flavors.len(), 3);
    assert_eq!(flavors[0].ram, 256);
    assert_eq!(flavors[2].id, FlavorId::from(3));
    assert_eq!(flavors[2].vcpus, Some(1));
    assert!(flavors[0].vcpus.is_none());
}

#[test]
fn test_deserialize_limits() {
    let limits: Limits = load_fixture("limits.json", "limits");
    assert_eq!(limits.rate.len(), 2);

    let servers = limits
        .rate
        .iter()
        .find(|group| group.regex == "^/servers")
        .expect("Should have a /servers rate group");
    assert_eq!(servers.limit[0].unit, "DAY");
    assert_eq!(servers.limit[0].remaining, 49);

    assert_eq!(limits.absolute.get("maxPersonality"), Some(&5));
    assert_eq!(limits.absolute.get("maxPersonalitySize"), Some(&10240));
}
