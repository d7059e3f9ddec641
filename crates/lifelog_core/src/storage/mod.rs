//! Persistent key-value store contract and implementations.
//!
//! # Responsibility
//! - Define the byte-level `get`/`set` contract the achievement store persists through.
//! - Provide an in-memory store for tests and a SQLite-backed store for devices.
//!
//! # Invariants
//! - `set` replaces the whole value for a key; there are no partial writes.
//! - No transactional guarantees exist across separate calls.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

pub type StorageResult<T> = Result<T, StorageError>;

/// Failure reported by a key-value store implementation.
#[derive(Debug)]
pub enum StorageError {
    Sqlite(rusqlite::Error),
    /// The SQLite file was written by a newer build with a different table layout.
    UnsupportedSchemaVersion { found: u32, supported: u32 },
    /// The store's internal lock was poisoned by a panicking writer.
    Poisoned,
    /// Key is empty after trimming.
    InvalidKey,
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::UnsupportedSchemaVersion { found, supported } => write!(
                f,
                "key-value store schema version {found} is newer than supported {supported}"
            ),
            Self::Poisoned => write!(f, "key-value store lock poisoned"),
            Self::InvalidKey => write!(f, "key-value store key cannot be empty"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::Poisoned | Self::InvalidKey => None,
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Opaque byte store keyed by string.
///
/// Implementations must be shareable with the background persist writer.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` when the key was never written.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;
    /// Replaces the value stored under `key`.
    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()>;
}

pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey);
    }
    Ok(())
}
