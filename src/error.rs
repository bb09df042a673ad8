use thiserror::Error;

use crate::storage::Collection;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Import payload rejected before any state was touched.
    #[error("invalid import: {0}")]
    Validation(String),

    #[error("failed to read {collection}: {message}")]
    StorageRead {
        collection: Collection,
        message: String,
    },

    /// `key` names the record that could not be written, when one is known.
    #[error("failed to write {collection}{}: {message}", key_suffix(key))]
    StorageWrite {
        collection: Collection,
        key: Option<String>,
        message: String,
    },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_deref().map(|k| format!(" (key {k})")).unwrap_or_default()
}

impl Error {
    pub fn write(collection: Collection, key: Option<&str>, err: impl std::fmt::Display) -> Self {
        Error::StorageWrite {
            collection,
            key: key.map(str::to_string),
            message: err.to_string(),
        }
    }

    pub fn read(collection: Collection, err: impl std::fmt::Display) -> Self {
        Error::StorageRead {
            collection,
            message: err.to_string(),
        }
    }
}
