use dashmap::DashMap;

use crate::record::{MemberKind, RecordHandle, RecordKey};

/// In-memory view of the records believed to exist at the provider.
///
/// Address records of wrappers and service records of proxies live in
/// separate maps. Every operation is a single map call, so no lock is held
/// while the caller talks to the provider.
#[derive(Debug, Default)]
pub struct RecordTracker {
    wrappers: DashMap<RecordKey, RecordHandle>,
    proxies: DashMap<RecordKey, RecordHandle>,
    pending: DashMap<RecordKey, ()>,
}

/// Exclusive right to create the record for one key. Released on drop.
pub struct CreateClaim<'a> {
    tracker: &'a RecordTracker,
    key: RecordKey,
}

impl Drop for CreateClaim<'_> {
    fn drop(&mut self) {
        self.tracker.pending.remove(&self.key);
    }
}

impl RecordTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retired records wait in the store only, never in the tracker.
    fn map(&self, kind: MemberKind) -> Option<&DashMap<RecordKey, RecordHandle>> {
        match kind {
            MemberKind::Wrapper => Some(&self.wrappers),
            MemberKind::Proxy => Some(&self.proxies),
            MemberKind::Retired => None,
        }
    }

    /// Inserts or replaces, last write wins. Retired keys are ignored.
    pub fn put(&self, key: RecordKey, handle: RecordHandle) -> Option<RecordHandle> {
        self.map(key.kind)?.insert(key, handle)
    }

    pub fn get(&self, key: &RecordKey) -> Option<RecordHandle> {
        self.map(key.kind)?.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.map(key.kind).is_some_and(|map| map.contains_key(key))
    }

    /// Atomic remove-and-fetch.
    pub fn remove(&self, key: &RecordKey) -> Option<RecordHandle> {
        self.map(key.kind)?.remove(key).map(|(_, handle)| handle)
    }

    /// Removes every record owned by `member`, across all zones.
    pub fn remove_member(&self, kind: MemberKind, member: &str) -> Vec<(RecordKey, RecordHandle)> {
        let Some(map) = self.map(kind) else {
            return Vec::new();
        };
        let keys: Vec<RecordKey> = map
            .iter()
            .filter(|entry| entry.key().member == member)
            .map(|entry| entry.key().clone())
            .collect();

        keys.into_iter().filter_map(|key| map.remove(&key)).collect()
    }

    /// Takes the right to create `key`.
    ///
    /// Returns `None` when the key is already tracked or another caller is
    /// creating it right now. The pending mark is taken before the tracked
    /// check, and a creator tracks its handle before dropping the claim, so
    /// two racing joins never both reach the provider.
    pub fn claim(&self, key: &RecordKey) -> Option<CreateClaim<'_>> {
        if self.pending.insert(key.clone(), ()).is_some() {
            return None;
        }

        let claim = CreateClaim {
            tracker: self,
            key: key.clone(),
        };

        if self.contains(key) {
            return None;
        }

        Some(claim)
    }

    /// Empties the tracker, proxies first.
    pub fn drain(&self) -> Vec<(RecordKey, RecordHandle)> {
        let mut drained = Vec::with_capacity(self.len());
        for map in [&self.proxies, &self.wrappers] {
            let keys: Vec<RecordKey> = map.iter().map(|entry| entry.key().clone()).collect();
            drained.extend(keys.into_iter().filter_map(|key| map.remove(&key)));
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.wrappers.len() + self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
