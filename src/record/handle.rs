use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::descriptor::RecordDescriptor;
use crate::zone::ZoneConfig;

/// Which fleet namespace a record key belongs to.
///
/// A wrapper owns one address record per zone, a proxy owns one service
/// record per zone. Several proxies may run on one wrapper, so the two
/// namespaces are kept apart. A record whose delete failed moves to the
/// `Retired` namespace, keyed by its provider id, until a sweep removes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Wrapper,
    Proxy,
    Retired,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub kind: MemberKind,
    /// Wrapper id, proxy server id, or provider record id when retired.
    pub member: String,
    pub zone_id: String,
}

impl RecordKey {
    pub fn wrapper(member: &str, zone_id: &str) -> Self {
        Self {
            kind: MemberKind::Wrapper,
            member: member.to_string(),
            zone_id: zone_id.to_string(),
        }
    }

    pub fn proxy(member: &str, zone_id: &str) -> Self {
        Self {
            kind: MemberKind::Proxy,
            member: member.to_string(),
            zone_id: zone_id.to_string(),
        }
    }
}

impl RecordKey {
    /// Key of a record that is waiting to be deleted. A later create for
    /// the same member never lands on it.
    pub fn retired(handle: &RecordHandle) -> Self {
        Self {
            kind: MemberKind::Retired,
            member: handle.id.clone(),
            zone_id: handle.zone.zone_id.clone(),
        }
    }

    pub fn is_retired(&self) -> bool {
        self.kind == MemberKind::Retired
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            MemberKind::Wrapper => "wrapper",
            MemberKind::Proxy => "proxy",
            MemberKind::Retired => "retired",
        };
        write!(f, "{}:{}@{}", kind, self.member, self.zone_id)
    }
}

/// A record the provider has acknowledged. Only produced by a successful
/// create call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordHandle {
    pub zone: Arc<ZoneConfig>,
    pub descriptor: RecordDescriptor,
    pub id: String,
}

impl RecordHandle {
    pub fn new(zone: Arc<ZoneConfig>, descriptor: RecordDescriptor, id: String) -> Self {
        Self {
            zone,
            descriptor,
            id,
        }
    }
}
