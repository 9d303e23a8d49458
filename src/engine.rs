//! Keeps provider records in step with fleet membership.
//!
//! Join events create records, leave events delete them, and the startup
//! and shutdown sweeps repair whatever drifted while the process was not
//! watching. Provider failures are logged and never escalate: a record that
//! failed to be created stays untracked, a record that failed to be deleted
//! stays in the store, and the next sweep picks either up again.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::fleet::{FleetEvent, FleetSnapshot, ProxyMember, WrapperMember};
use crate::provider::Provider;
use crate::record::{MemberKind, RecordDescriptor, RecordHandle, RecordKey};
use crate::store::RecordStore;
use crate::tracker::RecordTracker;
use crate::zone::ZoneConfig;

/// Fixed delays between provider calls during bulk sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub startup: Duration,
    pub shutdown: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            startup: Duration::from_millis(400),
            shutdown: Duration::from_millis(450),
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            startup: Duration::ZERO,
            shutdown: Duration::ZERO,
        }
    }
}

/// How the startup sweep treats records left over from a previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// Delete only records whose member is gone or whose content is stale,
    /// and keep tracking the rest.
    #[default]
    Orphans,
    /// Delete every stored record, then recreate from live membership.
    Purge,
}

/// Outcome counters of a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub created: usize,
    pub deleted: usize,
    pub adopted: usize,
    pub failed: usize,
}

/// What a single join-driven create came to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreateOutcome {
    Created,
    /// Already tracked, or another caller holds the claim.
    Skipped,
    Failed,
}

pub struct Engine {
    zones: Vec<Arc<ZoneConfig>>,
    provider: Arc<dyn Provider>,
    store: Arc<dyn RecordStore>,
    tracker: RecordTracker,
    pacing: Pacing,
    sweep: SweepMode,
}

impl Engine {
    pub fn new(
        zones: Vec<ZoneConfig>,
        provider: Arc<dyn Provider>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            zones: zones.into_iter().map(Arc::new).collect(),
            provider,
            store,
            tracker: RecordTracker::new(),
            pacing: Pacing::default(),
            sweep: SweepMode::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_sweep(mut self, sweep: SweepMode) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn tracker(&self) -> &RecordTracker {
        &self.tracker
    }

    fn enabled_zones(&self) -> impl Iterator<Item = &Arc<ZoneConfig>> {
        self.zones.iter().filter(|z| z.enabled)
    }

    fn zone(&self, zone_id: &str) -> Option<&Arc<ZoneConfig>> {
        self.enabled_zones().find(|z| z.zone_id == zone_id)
    }

    ////////////////////////////////////////////////////////////
    // Join / leave
    ////////////////////////////////////////////////////////////

    /// Creates the wrapper's address record in every zone mapping one of
    /// its groups. Returns the number of records created.
    pub async fn wrapper_joined(&self, wrapper: &WrapperMember) -> usize {
        let mut created = 0;
        for zone in self.enabled_zones() {
            if !zone.serves_any(&wrapper.groups) {
                continue;
            }
            if self.ensure_address(zone, wrapper).await == CreateOutcome::Created {
                created += 1;
            }
        }
        created
    }

    /// Creates the proxy's service record in every zone mapping its group.
    pub async fn proxy_joined(&self, proxy: &ProxyMember) -> usize {
        let mut created = 0;
        for zone in self.enabled_zones() {
            if self.ensure_service(zone, proxy).await == CreateOutcome::Created {
                created += 1;
            }
        }
        created
    }

    pub async fn wrapper_left(&self, wrapper_id: &str) -> usize {
        self.member_left(MemberKind::Wrapper, wrapper_id).await
    }

    pub async fn proxy_left(&self, server_id: &str) -> usize {
        self.member_left(MemberKind::Proxy, server_id).await
    }

    pub async fn handle(&self, event: FleetEvent) {
        match event {
            FleetEvent::WrapperJoined(wrapper) => {
                self.wrapper_joined(&wrapper).await;
            }
            FleetEvent::WrapperLeft(id) => {
                self.wrapper_left(&id).await;
            }
            FleetEvent::ProxyJoined(proxy) => {
                self.proxy_joined(&proxy).await;
            }
            FleetEvent::ProxyLeft(id) => {
                self.proxy_left(&id).await;
            }
        }
    }

    async fn ensure_address(
        &self,
        zone: &Arc<ZoneConfig>,
        wrapper: &WrapperMember,
    ) -> CreateOutcome {
        let key = RecordKey::wrapper(&wrapper.id, &zone.zone_id);
        let Some(_claim) = self.tracker.claim(&key) else {
            debug!("{} is already tracked, skip", key);
            return CreateOutcome::Skipped;
        };

        let record = RecordDescriptor::address(zone, &wrapper.id, wrapper.host);
        self.create_tracked(zone, key, record).await
    }

    async fn ensure_service(&self, zone: &Arc<ZoneConfig>, proxy: &ProxyMember) -> CreateOutcome {
        let Some(mapping) = zone.mapping(&proxy.group) else {
            return CreateOutcome::Skipped;
        };

        let key = RecordKey::proxy(&proxy.server_id, &zone.zone_id);
        let Some(_claim) = self.tracker.claim(&key) else {
            debug!("{} is already tracked, skip", key);
            return CreateOutcome::Skipped;
        };

        let record = RecordDescriptor::service(zone, mapping, &proxy.wrapper_id, proxy.port);
        self.create_tracked(zone, key, record).await
    }

    /// The caller must hold the claim for `key`.
    async fn create_tracked(
        &self,
        zone: &Arc<ZoneConfig>,
        key: RecordKey,
        record: RecordDescriptor,
    ) -> CreateOutcome {
        let handle = match self.provider.create(zone, &record).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("failed to create DNS record [{}] for {}: {}", record, key, e);
                return CreateOutcome::Failed;
            }
        };

        self.tracker.put(key.clone(), handle.clone());

        // an untracked leftover under the same key must not be overwritten
        match self.store.get(&key).await {
            Ok(Some(old)) if old.id != handle.id => {
                info!("{} still holds [{}] ({}), retiring it", key, old.descriptor, old.id);
                self.retire(&key, &old).await;
            }
            Ok(_) => {}
            Err(e) => warn!("failed to read {}: {}", key, e),
        }
        if let Err(e) = self.store.put(&key, &handle).await {
            warn!("failed to persist {}: {}", key, e);
        }
        CreateOutcome::Created
    }

    async fn member_left(&self, kind: MemberKind, member: &str) -> usize {
        let removed = self.tracker.remove_member(kind, member);
        if removed.is_empty() {
            debug!("no tracked record for {:?} {}", kind, member);
            return 0;
        }

        let mut deleted = 0;
        for (key, handle) in removed {
            if let Err(e) = self.store.remove(&key).await {
                warn!("failed to unpersist {}: {}", key, e);
            }
            if self.delete_logged(&key, &handle).await {
                deleted += 1;
            } else {
                self.retire(&key, &handle).await;
            }
        }
        deleted
    }

    async fn delete_logged(&self, key: &RecordKey, handle: &RecordHandle) -> bool {
        match self.provider.delete(handle).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "failed to delete DNS record [{}] ({}) for {}: {}",
                    handle.descriptor, handle.id, key, e
                );
                false
            }
        }
    }

    async fn delete_counted(
        &self,
        key: &RecordKey,
        handle: &RecordHandle,
        report: &mut SweepReport,
    ) -> bool {
        let deleted = self.delete_logged(key, handle).await;
        if deleted {
            report.deleted += 1;
        } else {
            report.failed += 1;
        }
        deleted
    }

    /// Parks a record the provider refused to delete under its retired key,
    /// where the next sweep retries it, and drops the member key still
    /// pointing at it.
    async fn retire(&self, key: &RecordKey, handle: &RecordHandle) {
        let retired = RecordKey::retired(handle);
        if let Err(e) = self.store.put(&retired, handle).await {
            warn!("failed to keep {} for retry: {}", retired, e);
            return;
        }
        if key.is_retired() {
            return;
        }

        match self.store.get(key).await {
            Ok(Some(stored)) if stored.id == handle.id => {
                if let Err(e) = self.store.remove(key).await {
                    warn!("failed to unpersist {}: {}", key, e);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("failed to read {}: {}", key, e),
        }
    }

    ////////////////////////////////////////////////////////////
    // Sweeps
    ////////////////////////////////////////////////////////////

    /// The record `key` should currently have, or `None` if its member is
    /// gone or no enabled zone wants it.
    fn desired(&self, key: &RecordKey, fleet: &FleetSnapshot) -> Option<RecordDescriptor> {
        let zone = self.zone(&key.zone_id)?;
        match key.kind {
            MemberKind::Wrapper => {
                let wrapper = fleet.wrapper(&key.member)?;
                zone.serves_any(&wrapper.groups)
                    .then(|| RecordDescriptor::address(zone, &wrapper.id, wrapper.host))
            }
            MemberKind::Proxy => {
                let proxy = fleet.proxy(&key.member)?;
                let mapping = zone.mapping(&proxy.group)?;
                Some(RecordDescriptor::service(zone, mapping, &proxy.wrapper_id, proxy.port))
            }
            MemberKind::Retired => None,
        }
    }

    /// Repairs drift between the store and `fleet`, then creates the records
    /// live members are missing.
    ///
    /// A store entry is only removed after its record was deleted, so
    /// dropping the future mid-batch leaves nothing untracked.
    pub async fn startup(&self, fleet: &FleetSnapshot) -> SweepReport {
        let mut report = SweepReport::default();

        self.sweep_stored(fleet, &mut report).await;
        self.create_missing(fleet, &mut report).await;

        info!(
            "startup sweep done: {} created, {} deleted, {} kept, {} failed",
            report.created, report.deleted, report.adopted, report.failed
        );
        report
    }

    async fn sweep_stored(&self, fleet: &FleetSnapshot, report: &mut SweepReport) {
        let keys = match self.store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("failed to list stored records: {}", e);
                return;
            }
        };

        for key in keys {
            let handle = match self.store.get(&key).await {
                Ok(Some(handle)) => handle,
                Ok(None) => continue,
                Err(e) => {
                    warn!("failed to read {}: {}", key, e);
                    continue;
                }
            };

            if self.sweep == SweepMode::Orphans
                && self.desired(&key, fleet).as_ref() == Some(&handle.descriptor)
            {
                debug!("keeping {} ({})", key, handle.id);
                self.tracker.put(key, handle);
                report.adopted += 1;
                continue;
            }

            if key.is_retired() {
                info!("retrying delete of {}", key);
            } else {
                match (self.sweep, fleet.is_live(&key)) {
                    (SweepMode::Purge, _) => info!("purging {}", key),
                    (_, true) => info!("{} no longer matches its member", key),
                    (_, false) => info!("{} belongs to a member that is gone", key),
                }
            }

            if self.delete_counted(&key, &handle, report).await {
                if let Err(e) = self.store.remove(&key).await {
                    warn!("failed to unpersist {}: {}", key, e);
                }
            } else {
                self.retire(&key, &handle).await;
            }
            self.pause(self.pacing.startup).await;
        }
    }

    async fn create_missing(&self, fleet: &FleetSnapshot, report: &mut SweepReport) {
        for zone in self.enabled_zones() {
            let mut seen = HashSet::new();
            for mapping in &zone.groups {
                for wrapper in fleet.group_members(&mapping.fleet_group) {
                    let key = RecordKey::wrapper(&wrapper.id, &zone.zone_id);
                    if !seen.insert(wrapper.id.as_str()) || self.tracker.contains(&key) {
                        continue;
                    }
                    self.count_create(self.ensure_address(zone, wrapper).await, report);
                    self.pause(self.pacing.startup).await;
                }
            }

            for proxy in &fleet.proxies {
                let key = RecordKey::proxy(&proxy.server_id, &zone.zone_id);
                if zone.mapping(&proxy.group).is_none() || self.tracker.contains(&key) {
                    continue;
                }
                self.count_create(self.ensure_service(zone, proxy).await, report);
                self.pause(self.pacing.startup).await;
            }
        }
    }

    fn count_create(&self, outcome: CreateOutcome, report: &mut SweepReport) {
        match outcome {
            CreateOutcome::Created => report.created += 1,
            CreateOutcome::Skipped => {}
            CreateOutcome::Failed => report.failed += 1,
        }
    }

    /// Deletes every tracked record, then everything left in the store.
    /// Records the provider refused to delete stay in the store, retired.
    pub async fn shutdown(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let mut retained = Vec::new();

        for (key, handle) in self.tracker.drain() {
            if self.delete_counted(&key, &handle, &mut report).await {
                if let Err(e) = self.store.remove(&key).await {
                    warn!("failed to unpersist {}: {}", key, e);
                }
            } else {
                retained.push((key, handle));
            }
            self.pause(self.pacing.shutdown).await;
        }

        match self.store.take_all().await {
            Ok(stored) => {
                for (key, handle) in stored {
                    if retained.iter().any(|(k, _)| *k == key) {
                        continue;
                    }
                    if !self.delete_counted(&key, &handle, &mut report).await {
                        retained.push((key, handle));
                    }
                    self.pause(self.pacing.shutdown).await;
                }
            }
            Err(e) => warn!("failed to read stored records: {}", e),
        }
        for (key, handle) in &retained {
            self.retire(key, handle).await;
        }

        info!(
            "shutdown sweep done: {} deleted, {} failed",
            report.deleted, report.failed
        );
        report
    }

    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod test;
