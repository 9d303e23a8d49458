use serde::{Serialize, ser::SerializeStruct};

use crate::record::{AddressRecord, RecordDescriptor, RecordTTL, ServiceRecord};

/// Request body of `POST /zones/{id}/dns_records`.
pub(super) struct CfRecordBody<'a> {
    record: &'a RecordDescriptor,
    ttl: RecordTTL,
}

impl<'a> CfRecordBody<'a> {
    pub fn new(record: &'a RecordDescriptor, ttl: RecordTTL) -> Self {
        Self { record, ttl }
    }
}

#[derive(Serialize)]
struct SrvData<'a> {
    service: &'a str,
    proto: &'a str,
    name: &'a str,
    priority: u16,
    weight: u16,
    port: u16,
    target: &'a str,
}

impl<'a> From<&'a ServiceRecord> for SrvData<'a> {
    fn from(srv: &'a ServiceRecord) -> Self {
        Self {
            service: &srv.service,
            proto: &srv.proto,
            name: &srv.target_subdomain,
            priority: srv.priority,
            weight: srv.weight,
            port: srv.port,
            target: &srv.target,
        }
    }
}

fn serialize_address<S>(a: &AddressRecord, ttl: u32, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let mut state = serializer.serialize_struct("RecordAddress", 4)?;
    state.serialize_field("type", a.record_type())?;
    state.serialize_field("name", &a.name)?;
    state.serialize_field("content", &a.content.to_string())?;
    state.serialize_field("ttl", &ttl)?;
    state.end()
}

fn serialize_service<S>(srv: &ServiceRecord, ttl: u32, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let mut state = serializer.serialize_struct("RecordSRV", 5)?;
    state.serialize_field("type", "SRV")?;
    state.serialize_field("name", &srv.name)?;
    state.serialize_field("content", &srv.content())?;
    state.serialize_field("ttl", &ttl)?;
    state.serialize_field("data", &SrvData::from(srv))?;
    state.end()
}

impl Serialize for CfRecordBody<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let ttl = self.ttl.as_provider_value();
        match self.record {
            RecordDescriptor::Address(a) => serialize_address(a, ttl, serializer),
            RecordDescriptor::Service(srv) => serialize_service(srv, ttl, serializer),
        }
    }
}

#[cfg(test)]
mod test {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::zone::{Auth, GroupMapping, ZoneConfig};

    fn zone() -> ZoneConfig {
        ZoneConfig {
            enabled: true,
            domain_name: "example.com".to_string(),
            zone_id: "z".to_string(),
            authentication: Auth::ApiToken("t".to_string()),
            ttl: RecordTTL::Auto,
            groups: vec![GroupMapping::new("Lobby", "@")],
        }
    }

    #[test]
    fn test_serialize_address() {
        let z = zone();
        let host = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
        let record = RecordDescriptor::address(&z, "wrapper-1", host);
        let json = serde_json::to_value(CfRecordBody::new(&record, RecordTTL::Value(300))).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "type": "A",
                "name": "wrapper-1.example.com",
                "content": "192.168.1.1",
                "ttl": 300
            })
        );
    }

    #[test]
    fn test_serialize_service() {
        let z = zone();
        let record = RecordDescriptor::service(&z, &z.groups[0], "wrapper-1", 25577);
        let json = serde_json::to_value(CfRecordBody::new(&record, RecordTTL::Auto)).unwrap();

        assert_eq!(json["type"], "SRV");
        assert_eq!(json["name"], "_minecraft._tcp.example.com");
        assert_eq!(json["ttl"], 1);
        assert_eq!(
            json["data"],
            serde_json::json!({
                "service": "_minecraft",
                "proto": "_tcp",
                "name": "example.com",
                "priority": 1,
                "weight": 1,
                "port": 25577,
                "target": "wrapper-1.example.com"
            })
        );
    }
}
