use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::record::{RecordDescriptor, RecordHandle};
use crate::zone::ZoneConfig;

/// A remote DNS provider. One call is one request, with no retry.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Creates `record` in `zone`. Fails with `Error::CreateFailed` unless the
    /// provider acknowledged the record and returned its id.
    async fn create(
        &self,
        zone: &Arc<ZoneConfig>,
        record: &RecordDescriptor,
    ) -> Result<RecordHandle>;

    /// Deletes the record behind `handle`. A record that is already gone
    /// counts as deleted; other failures are `Error::DeleteFailed`.
    async fn delete(&self, handle: &RecordHandle) -> Result<()>;
}
