use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::zone::{GroupMapping, ZoneConfig};

pub const SRV_SERVICE: &str = "_minecraft";
pub const SRV_PROTO: &str = "_tcp";

/// An A or AAAA record pointing a wrapper's name at its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub name: String,
    pub content: IpAddr,
}

impl AddressRecord {
    pub fn record_type(&self) -> &'static str {
        match self.content {
            IpAddr::V4(_) => "A",
            IpAddr::V6(_) => "AAAA",
        }
    }
}

/// An SRV record advertising a proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub service: String,
    pub proto: String,
    pub target_subdomain: String,
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

impl ServiceRecord {
    /// Zone-file style content: `priority weight port target`.
    pub fn content(&self) -> String {
        format!(
            "{} {} {} {}",
            self.priority, self.weight, self.port, self.target
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordDescriptor {
    Address(AddressRecord),
    Service(ServiceRecord),
}

impl RecordDescriptor {
    /// `{wrapper}.{domain} -> host`
    pub fn address(zone: &ZoneConfig, wrapper_id: &str, host: IpAddr) -> Self {
        Self::Address(AddressRecord {
            name: zone.qualify(wrapper_id),
            content: host,
        })
    }

    /// `_minecraft._tcp.{target subdomain}` pointing at `{wrapper}.{domain}:{port}`.
    pub fn service(zone: &ZoneConfig, mapping: &GroupMapping, wrapper_id: &str, port: u16) -> Self {
        let target_subdomain = mapping.target_subdomain(&zone.domain_name);
        Self::Service(ServiceRecord {
            name: format!("{}.{}.{}", SRV_SERVICE, SRV_PROTO, target_subdomain),
            service: SRV_SERVICE.to_string(),
            proto: SRV_PROTO.to_string(),
            target_subdomain,
            priority: mapping.priority,
            weight: mapping.weight,
            port,
            target: zone.qualify(wrapper_id),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Address(record) => &record.name,
            Self::Service(record) => &record.name,
        }
    }

    pub fn record_type(&self) -> &'static str {
        match self {
            Self::Address(record) => record.record_type(),
            Self::Service(_) => "SRV",
        }
    }
}

impl std::fmt::Display for RecordDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name(), self.record_type())
    }
}
