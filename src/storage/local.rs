//! On-disk backend backed by redb.
//!
//! One table per collection, keyed by the record key with JSON bytes as the
//! value, plus a `meta` table carrying the schema version:
//!   songs:    trackUri   → Song
//!   history:  entry id   → HistoryEntry
//!   settings: "settings" → Settings
//!   meta:     "schema_version" → u64

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition, WriteTransaction};

use super::{Collection, RawRecord, StorageBackend};
use crate::error::{Error, Result};

const SONGS: TableDefinition<&str, &[u8]> = TableDefinition::new("songs");
const HISTORY: TableDefinition<&str, &[u8]> = TableDefinition::new("history");
const SETTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const SCHEMA_VERSION_KEY: &str = "schema_version";
/// v1: songs. v2: history and settings.
pub const SCHEMA_VERSION: u64 = 2;

fn table(collection: Collection) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match collection {
        Collection::Songs => SONGS,
        Collection::History => HISTORY,
        Collection::Settings => SETTINGS,
    }
}

pub struct LocalStore {
    db: Database,
}

impl LocalStore {
    /// Open or create the database at `path` and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(|e| {
            Error::StorageUnavailable(format!("failed to open {}: {e}", path.display()))
        })?;
        let store = Self { db };
        store.migrate()?;
        Ok(store)
    }

    /// Default location: `<data dir>/encore/encore.redb`
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .context("Failed to get data directory")?
            .join("encore");
        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        Ok(data_dir.join("encore.redb"))
    }

    /// Idempotent: opening a table in a write transaction creates it if
    /// missing and leaves existing rows alone.
    fn migrate(&self) -> Result<()> {
        let unavailable = |e: &dyn std::fmt::Display| {
            Error::StorageUnavailable(format!("schema upgrade failed: {e}"))
        };

        let txn = self.db.begin_write().map_err(|e| unavailable(&e))?;
        {
            let mut meta = txn.open_table(META).map_err(|e| unavailable(&e))?;
            let version = meta
                .get(SCHEMA_VERSION_KEY)
                .map_err(|e| unavailable(&e))?
                .map(|v| v.value())
                .unwrap_or(0);

            if version < 1 {
                txn.open_table(SONGS).map_err(|e| unavailable(&e))?;
            }
            if version < 2 {
                txn.open_table(HISTORY).map_err(|e| unavailable(&e))?;
                txn.open_table(SETTINGS).map_err(|e| unavailable(&e))?;
            }
            if version < SCHEMA_VERSION {
                tracing::info!("upgrading store schema v{} -> v{}", version, SCHEMA_VERSION);
                meta.insert(SCHEMA_VERSION_KEY, SCHEMA_VERSION)
                    .map_err(|e| unavailable(&e))?;
            }
        }
        txn.commit().map_err(|e| unavailable(&e))?;
        Ok(())
    }

    pub fn schema_version(&self) -> Result<u64> {
        let read_err = |e: &dyn std::fmt::Display| Error::StorageUnavailable(e.to_string());
        let txn = self.db.begin_read().map_err(|e| read_err(&e))?;
        let meta = txn.open_table(META).map_err(|e| read_err(&e))?;
        let version = meta
            .get(SCHEMA_VERSION_KEY)
            .map_err(|e| read_err(&e))?
            .map(|v| v.value())
            .unwrap_or(0);
        Ok(version)
    }

    /// Run `f` in one write transaction; commit on success, abort otherwise.
    fn write<F>(&self, collection: Collection, f: F) -> Result<()>
    where
        F: FnOnce(&WriteTransaction) -> Result<()>,
    {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| Error::write(collection, None, e))?;
        match f(&txn) {
            Ok(()) => txn.commit().map_err(|e| Error::write(collection, None, e)),
            Err(err) => {
                if let Err(e) = txn.abort() {
                    tracing::warn!("abort after failed {} write also failed: {}", collection, e);
                }
                Err(err)
            }
        }
    }
}

fn clear_table(txn: &WriteTransaction, collection: Collection) -> Result<()> {
    let w = |e: &dyn std::fmt::Display| Error::write(collection, None, e);
    let mut t = txn.open_table(table(collection)).map_err(|e| w(&e))?;
    let keys: Vec<String> = t
        .iter()
        .map_err(|e| w(&e))?
        .map(|r| r.map(|(k, _)| k.value().to_string()))
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| w(&e))?;
    for key in keys {
        t.remove(key.as_str()).map_err(|e| w(&e))?;
    }
    Ok(())
}

#[async_trait]
impl StorageBackend for LocalStore {
    fn backend_name(&self) -> &str {
        "local"
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<RawRecord>> {
        let r = |e: &dyn std::fmt::Display| Error::read(collection, e);
        let txn = self.db.begin_read().map_err(|e| r(&e))?;
        let t = txn.open_table(table(collection)).map_err(|e| r(&e))?;
        let mut records = Vec::new();
        for item in t.iter().map_err(|e| r(&e))? {
            let (key, value) = item.map_err(|e| r(&e))?;
            records.push((key.value().to_string(), value.value().to_vec()));
        }
        Ok(records)
    }

    async fn count(&self, collection: Collection) -> Result<u64> {
        let r = |e: &dyn std::fmt::Display| Error::read(collection, e);
        let txn = self.db.begin_read().map_err(|e| r(&e))?;
        let t = txn.open_table(table(collection)).map_err(|e| r(&e))?;
        t.len().map_err(|e| r(&e))
    }

    async fn put_all(&self, collection: Collection, records: Vec<RawRecord>) -> Result<()> {
        self.write(collection, |txn| {
            clear_table(txn, collection)?;
            let mut t = txn
                .open_table(table(collection))
                .map_err(|e| Error::write(collection, None, e))?;
            for (key, value) in &records {
                let key = key.as_str();
                let exists = t
                    .get(key)
                    .map_err(|e| Error::write(collection, Some(key), e))?
                    .is_some();
                if exists {
                    return Err(Error::write(collection, Some(key), "duplicate key"));
                }
                t.insert(key, value.as_slice())
                    .map_err(|e| Error::write(collection, Some(key), e))?;
            }
            Ok(())
        })
    }

    async fn put_one(&self, collection: Collection, key: &str, value: &[u8]) -> Result<()> {
        self.write(collection, |txn| {
            let mut t = txn
                .open_table(table(collection))
                .map_err(|e| Error::write(collection, Some(key), e))?;
            t.insert(key, value)
                .map_err(|e| Error::write(collection, Some(key), e))?;
            Ok(())
        })
    }

    async fn delete_one(&self, collection: Collection, key: &str) -> Result<()> {
        self.write(collection, |txn| {
            let mut t = txn
                .open_table(table(collection))
                .map_err(|e| Error::write(collection, Some(key), e))?;
            t.remove(key)
                .map_err(|e| Error::write(collection, Some(key), e))?;
            Ok(())
        })
    }

    async fn clear(&self, collection: Collection) -> Result<()> {
        self.write(collection, |txn| clear_table(txn, collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(key: &str, value: &str) -> RawRecord {
        (key.to_string(), value.as_bytes().to_vec())
    }

    fn temp_store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(&dir.path().join("test.redb")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_fresh_store_is_empty_and_current() {
        let (_dir, store) = temp_store();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        assert!(store.get_all(Collection::Songs).await.unwrap().is_empty());
        assert_eq!(store.count(Collection::History).await.unwrap(), 0);
        assert!(store.get_settings().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.redb");
        {
            let store = LocalStore::open(&path).unwrap();
            store
                .put_all(Collection::Songs, vec![rec("a", "1"), rec("b", "2")])
                .await
                .unwrap();
            store.put_one(Collection::History, "h1", b"x").await.unwrap();
        }

        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.count(Collection::Songs).await.unwrap(), 2);
        assert_eq!(store.count(Collection::History).await.unwrap(), 1);
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_upgrade_from_v1_keeps_songs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v1.redb");
        {
            // A v1 store only ever had the songs table
            let db = Database::create(&path).unwrap();
            let txn = db.begin_write().unwrap();
            {
                let mut songs = txn.open_table(SONGS).unwrap();
                songs.insert("a", b"old".as_slice()).unwrap();
                let mut meta = txn.open_table(META).unwrap();
                meta.insert(SCHEMA_VERSION_KEY, 1u64).unwrap();
            }
            txn.commit().unwrap();
        }

        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), 2);
        assert_eq!(
            store.get_all(Collection::Songs).await.unwrap(),
            vec![rec("a", "old")]
        );
        assert_eq!(store.count(Collection::History).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_all_duplicate_rolls_back() {
        let (_dir, store) = temp_store();
        store.put_all(Collection::Songs, vec![rec("keep", "1")]).await.unwrap();

        let err = store
            .put_all(
                Collection::Songs,
                vec![rec("a", "1"), rec("b", "2"), rec("a", "3")],
            )
            .await
            .unwrap_err();

        match err {
            Error::StorageWrite { key, .. } => assert_eq!(key.as_deref(), Some("a")),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(
            store.get_all(Collection::Songs).await.unwrap(),
            vec![rec("keep", "1")]
        );
    }

    #[tokio::test]
    async fn test_put_delete_clear() {
        let (_dir, store) = temp_store();
        store.put_one(Collection::History, "h1", b"1").await.unwrap();
        store.put_one(Collection::History, "h2", b"2").await.unwrap();
        store.put_one(Collection::History, "h1", b"1b").await.unwrap();

        assert_eq!(
            store.get_all(Collection::History).await.unwrap(),
            vec![rec("h1", "1b"), rec("h2", "2")]
        );

        store.delete_one(Collection::History, "h1").await.unwrap();
        store.delete_one(Collection::History, "missing").await.unwrap();
        assert_eq!(store.count(Collection::History).await.unwrap(), 1);

        store.clear(Collection::History).await.unwrap();
        assert_eq!(store.count(Collection::History).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let (_dir, store) = temp_store();
        store.put_settings(br#"{"displayCount":3}"#).await.unwrap();
        assert_eq!(
            store.get_settings().await.unwrap(),
            Some(br#"{"displayCount":3}"#.to_vec())
        );
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = LocalStore::open(&dir.path().join("no").join("such").join("dir.redb"));
        assert!(matches!(result, Err(Error::StorageUnavailable(_))));
    }
}
