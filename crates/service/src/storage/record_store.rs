use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use common::metrics::{RECORDS_WRITTEN_TOTAL, RECORD_LOOKUPS_MISSED_TOTAL};
use dashmap::DashMap;
use models::user_record::{self, UserRecord};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::storage::UserRecordRepository;

/// File-backed user record store.
///
/// Each record lives in `<dir>/user_<id>.json`. Writes go through a hidden
/// temp file and an atomic rename, serialized per id, so readers never see a
/// half-written record and concurrent writers resolve to last-write-wins.
pub struct RecordStore {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RecordStore {
    /// Open the store rooted at `dir`, creating the directory if missing.
    pub async fn new<P: Into<PathBuf>>(dir: P) -> Result<Arc<Self>, ServiceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServiceError::Storage(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Arc::new(Self { dir, locks: DashMap::new() }))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks.entry(id.to_string()).or_default().clone()
    }

    /// Drop the lock entry once no writer holds or waits on it.
    fn release_lock(&self, id: &str) {
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Write `record`, replacing any existing file for the same id.
    pub async fn add(&self, record: &UserRecord) -> Result<String, ServiceError> {
        let file_name = record.file_name()?;
        let data = serde_json::to_vec_pretty(record)
            .map_err(|e| ServiceError::Storage(format!("Error saving user data: {e}")))?;

        let lock = self.lock_for(&record.id);
        let guard = lock.lock().await;

        let target = self.dir.join(&file_name);
        let tmp = self.dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));
        let written = write_then_rename(&tmp, &target, &data).await;
        drop(guard);
        drop(lock);
        self.release_lock(&record.id);

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            warn!(id = %record.id, error = %e, "record write failed");
            return Err(ServiceError::Storage(format!("Error saving user data: {e}")));
        }

        RECORDS_WRITTEN_TOTAL.inc();
        info!(id = %record.id, file = %file_name, "user record saved");
        Ok(file_name)
    }

    /// Ids of all stored records, in directory iteration order.
    pub async fn list(&self) -> Result<Vec<String>, ServiceError> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| {
                warn!(dir = %self.dir.display(), error = %e, "data directory scan failed");
                ServiceError::Storage(format!("cannot scan data directory: {e}"))
            })?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?
        {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(user_record::id_from_file_name) {
                ids.push(id.to_string());
            }
        }
        debug!(count = ids.len(), "listed user records");
        Ok(ids)
    }

    pub async fn get(&self, id: &str) -> Result<UserRecord, ServiceError> {
        let file_name = user_record::file_name(id)?;
        let path = self.dir.join(&file_name);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                RECORD_LOOKUPS_MISSED_TOTAL.inc();
                return Err(ServiceError::not_found("User"));
            }
            Err(e) => return Err(ServiceError::Storage(format!("Error reading user data: {e}"))),
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(path = %path.display(), error = %e, "unparsable record file");
            ServiceError::Storage(format!("corrupt record {file_name}: {e}"))
        })
    }
}

async fn write_then_rename(tmp: &Path, target: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(tmp).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(tmp, target).await
}

#[async_trait]
impl UserRecordRepository for RecordStore {
    async fn add(&self, record: &UserRecord) -> Result<String, ServiceError> { self.add(record).await }
    async fn list(&self) -> Result<Vec<String>, ServiceError> { self.list().await }
    async fn get(&self, id: &str) -> Result<UserRecord, ServiceError> { self.get(id).await }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn temp_store() -> Result<Arc<RecordStore>, ServiceError> {
        let dir = std::env::temp_dir().join(format!("record_store_{}", Uuid::new_v4()));
        RecordStore::new(dir).await
    }

    fn ann() -> UserRecord {
        UserRecord { id: "42".into(), name: "Ann".into(), age: 30 }
    }

    #[tokio::test]
    async fn add_then_get_round_trips() -> Result<(), anyhow::Error> {
        let store = temp_store().await?;
        let file = store.add(&ann()).await?;
        assert_eq!(file, "user_42.json");
        assert!(store.dir().join("user_42.json").is_file());
        assert_eq!(store.get("42").await?, ann());

        let _ = fs::remove_dir_all(store.dir()).await;
        Ok(())
    }

    #[tokio::test]
    async fn add_is_idempotent_and_last_write_wins() -> Result<(), anyhow::Error> {
        let store = temp_store().await?;
        store.add(&ann()).await?;
        let first = fs::read(store.dir().join("user_42.json")).await?;
        store.add(&ann()).await?;
        let second = fs::read(store.dir().join("user_42.json")).await?;
        assert_eq!(first, second);

        // lock table does not grow with the number of ids written
        assert!(store.locks.is_empty());

        let updated = UserRecord { age: 31, ..ann() };
        store.add(&updated).await?;
        assert_eq!(store.get("42").await?.age, 31);
        assert_eq!(store.list().await?, vec!["42".to_string()]);

        let _ = fs::remove_dir_all(store.dir()).await;
        Ok(())
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() -> Result<(), anyhow::Error> {
        let store = temp_store().await?;
        assert!(matches!(store.get("999").await, Err(ServiceError::NotFound(_))));
        let _ = fs::remove_dir_all(store.dir()).await;
        Ok(())
    }

    #[tokio::test]
    async fn list_returns_exactly_the_added_ids() -> Result<(), anyhow::Error> {
        let store = temp_store().await?;
        for id in ["a", "b", "c"] {
            store.add(&UserRecord { id: id.into(), name: id.to_uppercase(), age: 1 }).await?;
        }
        // foreign files, leftovers of interrupted writes and directories are skipped
        fs::write(store.dir().join("notes.txt"), b"x").await?;
        fs::write(store.dir().join(".user_d.json.0000.tmp"), b"{").await?;
        fs::create_dir(store.dir().join("user_e.json")).await?;

        let ids: HashSet<String> = store.list().await?.into_iter().collect();
        let expected: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ids, expected);

        let _ = fs::remove_dir_all(store.dir()).await;
        Ok(())
    }

    #[tokio::test]
    async fn hostile_ids_never_touch_the_filesystem() -> Result<(), anyhow::Error> {
        let store = temp_store().await?;
        let escape = UserRecord { id: "../escape".into(), name: "x".into(), age: 0 };
        assert!(matches!(store.add(&escape).await, Err(ServiceError::Model(_))));
        assert!(matches!(store.get("../escape").await, Err(ServiceError::Model(_))));
        assert!(store.list().await?.is_empty());

        let _ = fs::remove_dir_all(store.dir()).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() -> Result<(), anyhow::Error> {
        let store = temp_store().await?;
        fs::write(store.dir().join("user_7.json"), b"not json").await?;
        match store.get("7").await {
            Err(ServiceError::Storage(msg)) => {
                assert!(msg.starts_with("corrupt record user_7.json:"), "{msg}");
                assert!(!msg.contains(&*store.dir().to_string_lossy()));
            }
            other => panic!("expected storage error, got {other:?}"),
        }
        let _ = fs::remove_dir_all(store.dir()).await;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_writers_leave_a_complete_record() -> Result<(), anyhow::Error> {
        let store = temp_store().await?;
        let mut handles = Vec::new();
        for age in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.add(&UserRecord { id: "race".into(), name: "R".into(), age }).await
            }));
        }
        for h in handles {
            h.await??;
        }
        let rec = store.get("race").await?;
        assert!((0..16).contains(&rec.age));
        assert_eq!(store.list().await?, vec!["race".to_string()]);
        assert!(store.locks.is_empty());

        let _ = fs::remove_dir_all(store.dir()).await;
        Ok(())
    }
}
