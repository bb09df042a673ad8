//! In-process backend. Nothing survives the process; used as the fallback
//! when the on-disk store can't be opened, and by tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
#[cfg(test)]
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;

use super::{Collection, RawRecord, StorageBackend};
use crate::error::{Error, Result};

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Collection, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_table<T>(
        &self,
        collection: Collection,
        f: impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> Result<T>,
    ) -> Result<T> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|e| Error::StorageUnavailable(format!("lock poisoned: {e}")))?;
        f(tables.entry(collection).or_default())
    }
}

#[async_trait]
impl StorageBackend for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<RawRecord>> {
        self.with_table(collection, |table| {
            Ok(table.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        })
    }

    async fn count(&self, collection: Collection) -> Result<u64> {
        self.with_table(collection, |table| Ok(table.len() as u64))
    }

    async fn put_all(&self, collection: Collection, records: Vec<RawRecord>) -> Result<()> {
        self.with_table(collection, |table| {
            let mut fresh = BTreeMap::new();
            for (key, value) in records {
                if fresh.contains_key(&key) {
                    return Err(Error::write(collection, Some(&key), "duplicate key"));
                }
                fresh.insert(key, value);
            }
            *table = fresh;
            Ok(())
        })
    }

    async fn put_one(&self, collection: Collection, key: &str, value: &[u8]) -> Result<()> {
        self.with_table(collection, |table| {
            table.insert(key.to_string(), value.to_vec());
            Ok(())
        })
    }

    async fn delete_one(&self, collection: Collection, key: &str) -> Result<()> {
        self.with_table(collection, |table| {
            table.remove(key);
            Ok(())
        })
    }

    async fn clear(&self, collection: Collection) -> Result<()> {
        self.with_table(collection, |table| {
            table.clear();
            Ok(())
        })
    }
}

/// Memory backend whose reads or writes can be made to fail per collection.
#[cfg(test)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    failing_reads: Arc<AtomicBool>,
    reads_fail_after_write: Arc<AtomicBool>,
    failing_writes: Vec<Collection>,
}

#[cfg(test)]
impl FlakyStore {
    pub(crate) fn healthy() -> Self {
        Self {
            inner: MemoryStore::new(),
            failing_reads: Default::default(),
            reads_fail_after_write: Default::default(),
            failing_writes: Vec::new(),
        }
    }

    pub(crate) fn failing_reads() -> Self {
        let store = Self::healthy();
        store.read_switch().store(true, Ordering::SeqCst);
        store
    }

    pub(crate) fn failing_writes(collections: &[Collection]) -> Self {
        Self {
            failing_writes: collections.to_vec(),
            ..Self::healthy()
        }
    }

    /// Set to `true` to make every read fail from then on.
    pub(crate) fn read_switch(&self) -> Arc<AtomicBool> {
        self.failing_reads.clone()
    }

    /// Set to `true` to make reads start failing once the next write lands.
    pub(crate) fn read_after_write_switch(&self) -> Arc<AtomicBool> {
        self.reads_fail_after_write.clone()
    }

    fn check_write(&self, collection: Collection, key: Option<&str>) -> Result<()> {
        if self.failing_writes.contains(&collection) {
            return Err(Error::write(collection, key, "simulated write failure"));
        }
        Ok(())
    }

    fn wrote(&self) {
        if self.reads_fail_after_write.load(Ordering::SeqCst) {
            self.failing_reads.store(true, Ordering::SeqCst);
        }
    }

    fn check_read(&self, collection: Collection) -> Result<()> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(Error::read(collection, "simulated read failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[async_trait]
impl StorageBackend for FlakyStore {
    fn backend_name(&self) -> &str {
        "flaky"
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<RawRecord>> {
        self.check_read(collection)?;
        self.inner.get_all(collection).await
    }

    async fn count(&self, collection: Collection) -> Result<u64> {
        self.check_read(collection)?;
        self.inner.count(collection).await
    }

    async fn put_all(&self, collection: Collection, records: Vec<RawRecord>) -> Result<()> {
        self.check_write(collection, records.first().map(|(k, _)| k.as_str()))?;
        self.inner.put_all(collection, records).await?;
        self.wrote();
        Ok(())
    }

    async fn put_one(&self, collection: Collection, key: &str, value: &[u8]) -> Result<()> {
        self.check_write(collection, Some(key))?;
        self.inner.put_one(collection, key, value).await
    }

    async fn delete_one(&self, collection: Collection, key: &str) -> Result<()> {
        self.check_write(collection, Some(key))?;
        self.inner.delete_one(collection, key).await
    }

    async fn clear(&self, collection: Collection) -> Result<()> {
        self.check_write(collection, None)?;
        self.inner.clear(collection).await
    }
}
