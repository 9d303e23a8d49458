use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use super::*;
use crate::zone::{Auth, GroupMapping, ZoneConfig};

fn example_zone() -> ZoneConfig {
    ZoneConfig {
        enabled: true,
        domain_name: "example.com".to_string(),
        zone_id: "zone-1".to_string(),
        authentication: Auth::ApiToken("token".to_string()),
        ttl: RecordTTL::Auto,
        groups: vec![GroupMapping::new("Lobby", "@")],
    }
}

#[test]
fn test_address_descriptor() {
    let zone = example_zone();
    let host = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
    let record = RecordDescriptor::address(&zone, "wrapper-1", host);

    assert_eq!(record.name(), "wrapper-1.example.com");
    assert_eq!(record.record_type(), "A");

    let v6 = RecordDescriptor::address(&zone, "wrapper-1", IpAddr::V6(Ipv6Addr::LOCALHOST));
    assert_eq!(v6.record_type(), "AAAA");
}

#[test]
fn test_service_descriptor_apex() {
    let zone = example_zone();
    let record = RecordDescriptor::service(&zone, &zone.groups[0], "wrapper-1", 25577);

    let RecordDescriptor::Service(srv) = record else {
        panic!("expected a service record");
    };
    assert_eq!(srv.name, "_minecraft._tcp.example.com");
    assert_eq!(srv.target_subdomain, "example.com");
    assert_eq!(srv.target, "wrapper-1.example.com");
    assert_eq!(srv.port, 25577);
    assert_eq!(srv.priority, 1);
    assert_eq!(srv.weight, 1);
    assert_eq!(srv.content(), "1 1 25577 wrapper-1.example.com");
}

#[test]
fn test_service_descriptor_subdomain() {
    let zone = example_zone();
    let mapping = GroupMapping::new("Lobby", "lobby");
    let record = RecordDescriptor::service(&zone, &mapping, "wrapper-2", 25565);

    let RecordDescriptor::Service(srv) = record else {
        panic!("expected a service record");
    };
    assert_eq!(srv.target_subdomain, "lobby.example.com");
    assert_eq!(srv.name, "_minecraft._tcp.lobby.example.com");
    assert_eq!(srv.target, "wrapper-2.example.com");
}

#[test]
fn test_handle_persisted_shape() {
    let zone = Arc::new(example_zone());
    let record = RecordDescriptor::address(&zone, "w", IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)));
    let handle = RecordHandle::new(zone, record, "abc".to_string());

    let json = serde_json::to_value(&handle).unwrap();
    assert_eq!(json["id"], "abc");
    assert_eq!(json["descriptor"]["kind"], "address");
    assert_eq!(json["descriptor"]["content"], "1.2.3.4");
    assert_eq!(json["zone"]["zone_id"], "zone-1");

    let back: RecordHandle = serde_json::from_value(json).unwrap();
    assert_eq!(back, handle);
}

#[test]
fn test_record_key_display() {
    assert_eq!(RecordKey::wrapper("w1", "z").to_string(), "wrapper:w1@z");
    assert_eq!(RecordKey::proxy("Proxy-1", "z").to_string(), "proxy:Proxy-1@z");
    assert_ne!(RecordKey::wrapper("x", "z"), RecordKey::proxy("x", "z"));
}

#[test]
fn test_retired_key() {
    let zone = Arc::new(example_zone());
    let record = RecordDescriptor::address(&zone, "w1", IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)));
    let handle = RecordHandle::new(zone, record, "abc".to_string());

    let key = RecordKey::retired(&handle);
    assert!(key.is_retired());
    assert!(!RecordKey::wrapper("w1", "zone-1").is_retired());
    assert_eq!(key.to_string(), "retired:abc@zone-1");
    assert_ne!(key, RecordKey::wrapper("w1", "zone-1"));
}
