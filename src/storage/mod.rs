//! Storage abstraction for encore.
//!
//! - [`LocalStore`]: redb file under the user data dir (default)
//! - [`MemoryStore`]: process-local maps, used when the file store cannot be
//!   opened and in tests
//!
//! Backends deal in raw JSON bytes per collection. [`Store`] sits on top and
//! speaks in songs, history entries and settings.

pub mod local;
pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::history::HistoryEntry;
use crate::settings::Settings;
use crate::song::Song;

pub use local::LocalStore;
pub use memory::MemoryStore;

/// Key under which the settings singleton is stored.
pub const SETTINGS_KEY: &str = "settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Songs,
    History,
    /// Holds a single record under [`SETTINGS_KEY`]
    Settings,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collection::Songs => write!(f, "songs"),
            Collection::History => write!(f, "history"),
            Collection::Settings => write!(f, "settings"),
        }
    }
}

/// A key and its JSON-encoded value.
pub type RawRecord = (String, Vec<u8>);

/// Byte-level persistence. Every call is its own transaction: it either
/// lands completely or leaves the previous state in place.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Human-readable backend name (e.g., "local", "memory").
    fn backend_name(&self) -> &str;

    /// All records in key order.
    async fn get_all(&self, collection: Collection) -> Result<Vec<RawRecord>>;

    async fn count(&self, collection: Collection) -> Result<u64>;

    /// Swap the whole collection for `records`. Duplicate keys in `records`
    /// fail the call and name the key; nothing is changed in that case.
    async fn put_all(&self, collection: Collection, records: Vec<RawRecord>) -> Result<()>;

    /// Insert or overwrite one record.
    async fn put_one(&self, collection: Collection, key: &str, value: &[u8]) -> Result<()>;

    /// Absent keys are not an error.
    async fn delete_one(&self, collection: Collection, key: &str) -> Result<()>;

    async fn clear(&self, collection: Collection) -> Result<()>;

    async fn get_settings(&self) -> Result<Option<Vec<u8>>> {
        Ok(self
            .get_all(Collection::Settings)
            .await?
            .into_iter()
            .find(|(key, _)| key == SETTINGS_KEY)
            .map(|(_, value)| value))
    }

    async fn put_settings(&self, value: &[u8]) -> Result<()> {
        self.put_one(Collection::Settings, SETTINGS_KEY, value).await
    }
}

/// Something that lives in one of the keyed collections.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn key(&self) -> &str;
}

impl Record for Song {
    const COLLECTION: Collection = Collection::Songs;

    fn key(&self) -> &str {
        &self.track_uri
    }
}

impl Record for HistoryEntry {
    const COLLECTION: Collection = Collection::History;

    fn key(&self) -> &str {
        &self.id
    }
}

/// Typed access to a backend.
///
/// Reads never fail the caller: a broken read is logged and comes back
/// empty. Writes return errors and the caller decides whether they matter.
pub struct Store {
    backend: Box<dyn StorageBackend>,
}

impl Store {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }

    pub async fn get_all<R: Record>(&self) -> Vec<R> {
        self.try_get_all().await.unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            Vec::new()
        })
    }

    /// Like [`Store::get_all`], but a failed read is returned instead of
    /// being treated as an empty collection. Corrupt records are still
    /// skipped.
    pub async fn try_get_all<R: Record>(&self) -> Result<Vec<R>> {
        let raw = self.backend.get_all(R::COLLECTION).await?;

        Ok(raw
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_slice::<R>(&value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("skipping corrupt {} record {}: {}", R::COLLECTION, key, e);
                    None
                }
            })
            .collect())
    }

    pub async fn count(&self, collection: Collection) -> u64 {
        self.try_count(collection).await.unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            0
        })
    }

    pub async fn try_count(&self, collection: Collection) -> Result<u64> {
        self.backend.count(collection).await
    }

    pub async fn put_all<R: Record>(&self, records: &[R]) -> Result<()> {
        let raw = records
            .iter()
            .map(|record| Ok((record.key().to_string(), encode(record)?)))
            .collect::<Result<Vec<_>>>()?;
        self.backend.put_all(R::COLLECTION, raw).await
    }

    pub async fn put_one<R: Record>(&self, record: &R) -> Result<()> {
        let value = encode(record)?;
        self.backend.put_one(R::COLLECTION, record.key(), &value).await
    }

    pub async fn delete_one(&self, collection: Collection, key: &str) -> Result<()> {
        self.backend.delete_one(collection, key).await
    }

    pub async fn clear(&self, collection: Collection) -> Result<()> {
        self.backend.clear(collection).await
    }

    /// `None` when nothing was saved yet or the saved record is unreadable.
    pub async fn load_settings(&self) -> Option<Settings> {
        match self.backend.get_settings().await {
            Ok(Some(raw)) => match serde_json::from_slice(&raw) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    tracing::warn!("settings record corrupt, using defaults: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        let raw = serde_json::to_vec(settings)
            .map_err(|e| Error::write(Collection::Settings, Some(SETTINGS_KEY), e))?;
        self.backend.put_settings(&raw).await
    }
}

fn encode<R: Record>(record: &R) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| Error::write(R::COLLECTION, Some(record.key()), e))
}
