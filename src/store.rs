//! Durable copy of the tracked records, used to find leftovers after a
//! restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::record::{RecordHandle, RecordKey};

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn keys(&self) -> Result<Vec<RecordKey>>;

    /// Removes and returns every stored record.
    async fn take_all(&self) -> Result<Vec<(RecordKey, RecordHandle)>>;

    async fn put(&self, key: &RecordKey, handle: &RecordHandle) -> Result<()>;

    async fn remove(&self, key: &RecordKey) -> Result<Option<RecordHandle>>;

    async fn contains(&self, key: &RecordKey) -> Result<bool>;

    async fn get(&self, key: &RecordKey) -> Result<Option<RecordHandle>>;
}

////////////////////////////////////////////////////////////
// Memory store
////////////////////////////////////////////////////////////
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<RecordKey, RecordHandle>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn keys(&self) -> Result<Vec<RecordKey>> {
        Ok(self.records.iter().map(|e| e.key().clone()).collect())
    }

    async fn take_all(&self) -> Result<Vec<(RecordKey, RecordHandle)>> {
        let keys = self.keys().await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| self.records.remove(&key))
            .collect())
    }

    async fn put(&self, key: &RecordKey, handle: &RecordHandle) -> Result<()> {
        self.records.insert(key.clone(), handle.clone());
        Ok(())
    }

    async fn remove(&self, key: &RecordKey) -> Result<Option<RecordHandle>> {
        Ok(self.records.remove(key).map(|(_, handle)| handle))
    }

    async fn contains(&self, key: &RecordKey) -> Result<bool> {
        Ok(self.records.contains_key(key))
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<RecordHandle>> {
        Ok(self.records.get(key).map(|e| e.value().clone()))
    }
}

////////////////////////////////////////////////////////////
// JSON file store
////////////////////////////////////////////////////////////
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    records: Vec<StoreEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreEntry {
    key: RecordKey,
    handle: RecordHandle,
}

const STORE_VERSION: u32 = 1;

/// Keeps all records in one JSON file, rewritten after every mutation.
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<HashMap<RecordKey, RecordHandle>>,
}

impl JsonFileStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file: StoreFile = serde_json::from_slice(&bytes)?;
                file.records.into_iter().map(|e| (e.key, e.handle)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        log::debug!("loaded {} records from {}", records.len(), path.display());

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    async fn flush(&self, records: &HashMap<RecordKey, RecordHandle>) -> Result<()> {
        let file = StoreFile {
            version: STORE_VERSION,
            records: records
                .iter()
                .map(|(key, handle)| StoreEntry {
                    key: key.clone(),
                    handle: handle.clone(),
                })
                .collect(),
        };
        let body = serde_json::to_vec_pretty(&file)?;

        // handles carry zone credentials
        let tmp = self.path.with_extension("tmp");
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut f = options.open(&tmp).await?;
        f.write_all(&body).await?;
        f.sync_all().await?;
        drop(f);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn keys(&self) -> Result<Vec<RecordKey>> {
        let records = self.records.lock().await;
        Ok(records.keys().cloned().collect())
    }

    // Mutations stage a copy and only swap it in once it is on disk.

    async fn take_all(&self) -> Result<Vec<(RecordKey, RecordHandle)>> {
        let mut records = self.records.lock().await;
        self.flush(&HashMap::new()).await?;
        Ok(records.drain().collect())
    }

    async fn put(&self, key: &RecordKey, handle: &RecordHandle) -> Result<()> {
        let mut records = self.records.lock().await;
        let mut staged = records.clone();
        staged.insert(key.clone(), handle.clone());
        self.flush(&staged).await?;
        *records = staged;
        Ok(())
    }

    async fn remove(&self, key: &RecordKey) -> Result<Option<RecordHandle>> {
        let mut records = self.records.lock().await;
        if !records.contains_key(key) {
            return Ok(None);
        }

        let mut staged = records.clone();
        let removed = staged.remove(key);
        self.flush(&staged).await?;
        *records = staged;
        Ok(removed)
    }

    async fn contains(&self, key: &RecordKey) -> Result<bool> {
        Ok(self.records.lock().await.contains_key(key))
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<RecordHandle>> {
        Ok(self.records.lock().await.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use super::*;
    use crate::record::{RecordDescriptor, RecordTTL};
    use crate::zone::{Auth, ZoneConfig};

    fn handle(id: &str) -> RecordHandle {
        let zone = Arc::new(ZoneConfig {
            enabled: true,
            domain_name: "example.com".to_string(),
            zone_id: "z".to_string(),
            authentication: Auth::ApiKey {
                email: "a@example.com".to_string(),
                key: "k".to_string(),
            },
            ttl: RecordTTL::Auto,
            groups: vec![],
        });
        let record = RecordDescriptor::address(&zone, "w", IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)));
        RecordHandle::new(zone, record, id.to_string())
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "proxy-dns-syncer-{}-{}.json",
            name,
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        let key = RecordKey::wrapper("w", "z");

        store.put(&key, &handle("1")).await.unwrap();
        assert!(store.contains(&key).await.unwrap());
        assert_eq!(store.get(&key).await.unwrap().unwrap().id, "1");

        let taken = store.take_all().await.unwrap();
        assert_eq!(taken.len(), 1);
        assert!(store.is_empty());
        assert!(store.remove(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_store_survives_reopen() {
        let path = temp_path("reopen");
        let _ = std::fs::remove_file(&path);

        let key_a = RecordKey::wrapper("w", "z");
        let key_b = RecordKey::proxy("p", "z");
        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.put(&key_a, &handle("a")).await.unwrap();
            store.put(&key_b, &handle("b")).await.unwrap();
            store.remove(&key_b).await.unwrap();
        }

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec![key_a.clone()]);
        assert_eq!(store.get(&key_a).await.unwrap().unwrap().id, "a");
        assert!(!store.contains(&key_b).await.unwrap());

        let taken = store.take_all().await.unwrap();
        assert_eq!(taken.len(), 1);
        drop(store);

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_json_store_failed_flush_keeps_records() {
        let path = temp_path("flush");
        let tmp = path.with_extension("tmp");
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&tmp);

        let key_a = RecordKey::wrapper("a", "z");
        let key_b = RecordKey::wrapper("b", "z");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.put(&key_a, &handle("a")).await.unwrap();

        // the temp file cannot be written while a directory sits there
        std::fs::create_dir(&tmp).unwrap();
        assert!(store.take_all().await.is_err());
        assert!(store.put(&key_b, &handle("b")).await.is_err());
        assert!(store.remove(&key_a).await.is_err());
        assert_eq!(store.keys().await.unwrap(), vec![key_a.clone()]);
        std::fs::remove_dir(&tmp).unwrap();

        store.put(&key_b, &handle("b")).await.unwrap();
        drop(store);

        let store = JsonFileStore::open(&path).await.unwrap();
        let mut keys = store.keys().await.unwrap();
        keys.sort_by(|x, y| x.member.cmp(&y.member));
        assert_eq!(keys, vec![key_a, key_b]);

        let _ = std::fs::remove_file(&path);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_json_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_path("mode");
        let _ = std::fs::remove_file(&path);

        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .put(&RecordKey::wrapper("a", "z"), &handle("a"))
            .await
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_json_store_missing_file_is_empty() {
        let path = temp_path("missing");
        let _ = std::fs::remove_file(&path);

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
        assert!(!path.exists());
    }
}
