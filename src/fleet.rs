//! Boundary types for the proxy fleet membership source.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::record::{MemberKind, RecordKey};

/// A managed host that runs proxy processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperMember {
    pub id: String,
    pub host: IpAddr,
    /// Fleet groups whose proxies may be placed on this wrapper.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// A running proxy process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyMember {
    pub server_id: String,
    pub wrapper_id: String,
    pub group: String,
    pub port: u16,
}

/// Live fleet membership at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    #[serde(default)]
    pub wrappers: Vec<WrapperMember>,
    #[serde(default)]
    pub proxies: Vec<ProxyMember>,
}

impl FleetSnapshot {
    pub fn wrapper(&self, id: &str) -> Option<&WrapperMember> {
        self.wrappers.iter().find(|w| w.id == id)
    }

    pub fn proxy(&self, server_id: &str) -> Option<&ProxyMember> {
        self.proxies.iter().find(|p| p.server_id == server_id)
    }

    pub fn group_members<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a WrapperMember> {
        self.wrappers
            .iter()
            .filter(move |w| w.groups.iter().any(|g| g == group))
    }

    /// Whether the member owning `key` is still part of the fleet.
    pub fn is_live(&self, key: &RecordKey) -> bool {
        match key.kind {
            MemberKind::Wrapper => self.wrapper(&key.member).is_some(),
            MemberKind::Proxy => self.proxy(&key.member).is_some(),
            MemberKind::Retired => false,
        }
    }
}

/// Join and leave notifications, one JSON object per line on the wire:
///
/// ```json
/// {"wrapper_joined": {"id": "Wrapper-1", "host": "10.0.0.2", "groups": ["Lobby"]}}
/// {"proxy_left": "Proxy-1"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetEvent {
    WrapperJoined(WrapperMember),
    WrapperLeft(String),
    ProxyJoined(ProxyMember),
    ProxyLeft(String),
}
