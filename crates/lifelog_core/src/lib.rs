//! Core domain logic for LifeLog.
//! This crate is the single source of truth for achievement record invariants.

pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod storage;

pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::achievement::{Achievement, AchievementId, AchievementValidationError};
pub use repo::achievement_repo::{
    decode_collection, encode_collection, CodecError, LoadOutcome, LoadReport, STORAGE_KEY,
};
pub use search::view::{AchievementView, DerivedView};
pub use service::achievement_store::{
    AchievementStore, ChangeEvent, StoreError, StoreOptions, StoreResult, SubscriptionId,
};
pub use service::persist_queue::{PersistError, PersistFailure, PersistFailureHook};
pub use service::removal::{RemovalError, RemovalState};
pub use storage::{KeyValueStore, MemoryKvStore, SqliteKvStore, StorageError, StorageResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
