mod descriptor;
mod handle;
mod ttl;

pub use descriptor::{AddressRecord, RecordDescriptor, ServiceRecord, SRV_PROTO, SRV_SERVICE};
pub use handle::{MemberKind, RecordHandle, RecordKey};
pub use ttl::RecordTTL;

#[cfg(test)]
mod unit_test;
