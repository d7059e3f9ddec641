//! Achievement record store.
//!
//! # Responsibility
//! - Own the canonical in-memory achievement collection.
//! - Load it once from the key-value store and persist every mutation.
//! - Expose add, two-phase remove and search over the collection.
//!
//! # Invariants
//! - Record ids are unique within the collection.
//! - Mutations commit in memory before their snapshot is queued for persistence.
//! - Rejected input never changes the collection or queues a write.
//! - Mutations are rejected until `load` has run exactly once.

use crate::model::achievement::{Achievement, AchievementId, AchievementValidationError};
use crate::repo::achievement_repo::{encode_collection, load_collection, LoadOutcome, STORAGE_KEY};
use crate::search::view::{AchievementView, DerivedView};
use crate::service::persist_queue::{PersistFailureHook, PersistQueue};
use crate::service::removal::{RemovalError, RemovalFlow, RemovalState};
use crate::storage::KeyValueStore;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Record store error.
#[derive(Debug)]
pub enum StoreError {
    /// Input rejected before any state change.
    Validation(AchievementValidationError),
    Removal(RemovalError),
    /// An operation ran before `load`.
    NotLoaded,
    /// `load` was called a second time.
    AlreadyLoaded,
    /// Background persist writer could not be started.
    PersistWorker(std::io::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Removal(err) => write!(f, "{err}"),
            Self::NotLoaded => write!(f, "achievement store has not been loaded"),
            Self::AlreadyLoaded => write!(f, "achievement store is already loaded"),
            Self::PersistWorker(err) => write!(f, "failed to start persist worker: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Removal(err) => Some(err),
            Self::PersistWorker(err) => Some(err),
            Self::NotLoaded | Self::AlreadyLoaded => None,
        }
    }
}

impl From<AchievementValidationError> for StoreError {
    fn from(value: AchievementValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RemovalError> for StoreError {
    fn from(value: RemovalError) -> Self {
        Self::Removal(value)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Store configuration.
#[derive(Clone)]
pub struct StoreOptions {
    /// Key the collection document is stored under.
    pub storage_key: String,
    /// Called on the writer thread whenever a snapshot write fails.
    pub failure_hook: Option<PersistFailureHook>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            failure_hook: None,
        }
    }
}

/// Notification emitted after each state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Loaded { count: usize },
    Added { id: AchievementId },
    Removed { id: AchievementId },
    RemovalRequested { id: AchievementId },
    RemovalCancelled { id: AchievementId },
}

/// Handle returned by [`AchievementStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type ChangeListener = Box<dyn Fn(&ChangeEvent) + Send>;

/// Owner of the achievement collection.
pub struct AchievementStore {
    store: Arc<dyn KeyValueStore>,
    storage_key: String,
    records: Vec<Achievement>,
    loaded: bool,
    revision: u64,
    removal: RemovalFlow,
    persist: PersistQueue,
    listeners: Vec<(SubscriptionId, ChangeListener)>,
    next_subscription: u64,
}

impl AchievementStore {
    /// Creates an unloaded store over `store`.
    ///
    /// # Errors
    /// - `PersistWorker` when the background writer cannot be started.
    pub fn new(store: Arc<dyn KeyValueStore>, options: StoreOptions) -> StoreResult<Self> {
        let persist = PersistQueue::spawn(
            Arc::clone(&store),
            options.storage_key.clone(),
            options.failure_hook,
        )
        .map_err(StoreError::PersistWorker)?;

        Ok(Self {
            store,
            storage_key: options.storage_key,
            records: Vec::new(),
            loaded: false,
            revision: 0,
            removal: RemovalFlow::new(),
            persist,
            listeners: Vec::new(),
            next_subscription: 0,
        })
    }

    /// Creates a store and loads it in one step.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        options: StoreOptions,
    ) -> StoreResult<(Self, LoadOutcome)> {
        let mut this = Self::new(store, options)?;
        let outcome = this.load()?;
        Ok((this, outcome))
    }

    /// Loads the collection from the key-value store.
    ///
    /// Absent, unreadable or corrupt documents all yield an empty collection;
    /// the returned outcome tells them apart.
    pub fn load(&mut self) -> StoreResult<LoadOutcome> {
        if self.loaded {
            return Err(StoreError::AlreadyLoaded);
        }

        let report = load_collection(self.store.as_ref(), &self.storage_key);
        self.records = report.records;
        self.loaded = true;
        self.revision += 1;

        let count = self.records.len();
        info!("event=store_load module=store status=ok count={count}");
        self.notify(&ChangeEvent::Loaded { count });
        Ok(report.outcome)
    }

    /// Validates input, prepends a new record and queues a persist.
    ///
    /// `description` is dropped when blank; `date = None` means today.
    pub fn add(
        &mut self,
        title: &str,
        description: Option<&str>,
        date: Option<&str>,
    ) -> StoreResult<AchievementId> {
        self.ensure_loaded()?;

        let mut record = match Achievement::new(title, description, date) {
            Ok(record) => record,
            Err(err) => {
                info!("event=achievement_add module=store status=rejected reason={err}");
                return Err(err.into());
            }
        };
        while self.contains(&record.id) {
            record.id = AchievementId::generate();
        }

        let id = record.id.clone();
        self.records.insert(0, record);
        self.revision += 1;
        info!(
            "event=achievement_add module=store status=ok count={}",
            self.records.len()
        );
        self.persist_snapshot();
        self.notify(&ChangeEvent::Added { id: id.clone() });
        Ok(id)
    }

    /// First removal phase: asks for confirmation to delete `id`.
    pub fn request_remove(&mut self, id: &AchievementId) -> StoreResult<()> {
        self.ensure_loaded()?;
        if let Some(previous) = self.removal.request(id.clone()) {
            self.notify(&ChangeEvent::RemovalCancelled { id: previous });
        }
        self.notify(&ChangeEvent::RemovalRequested { id: id.clone() });
        Ok(())
    }

    /// Second removal phase: deletes the pending record and queues a persist.
    ///
    /// Returns whether a record was actually removed; an unknown id is a no-op
    /// on the collection but is still persisted.
    pub fn confirm_remove(&mut self) -> StoreResult<bool> {
        self.ensure_loaded()?;
        let id = self.removal.confirm()?;

        let before = self.records.len();
        self.records.retain(|record| record.id != id);
        let removed = self.records.len() != before;
        if removed {
            self.revision += 1;
        }

        info!("event=achievement_remove module=store status=ok removed={removed}");
        self.persist_snapshot();
        if removed {
            self.notify(&ChangeEvent::Removed { id });
        }
        Ok(removed)
    }

    /// Abandons the pending removal.
    pub fn cancel_remove(&mut self) -> StoreResult<AchievementId> {
        let id = self.removal.cancel()?;
        self.notify(&ChangeEvent::RemovalCancelled { id: id.clone() });
        Ok(id)
    }

    /// Request and confirm in one call, for callers that confirmed elsewhere.
    pub fn remove_confirmed(&mut self, id: &AchievementId) -> StoreResult<bool> {
        self.request_remove(id)?;
        self.confirm_remove()
    }

    /// Sorted, filtered view for `search_text`.
    pub fn query(&self, search_text: &str) -> AchievementView<'_> {
        AchievementView::build(&self.records, search_text)
    }

    /// Memoized variant of [`AchievementStore::query`].
    pub fn view<'a>(&'a self, derived: &mut DerivedView) -> AchievementView<'a> {
        derived.view(&self.records, self.revision)
    }

    /// Records in collection order (newest insert first).
    pub fn records(&self) -> &[Achievement] {
        &self.records
    }

    pub fn get(&self, id: &AchievementId) -> Option<&Achievement> {
        self.records.iter().find(|record| &record.id == id)
    }

    pub fn contains(&self, id: &AchievementId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Monotonic counter bumped on every collection change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn removal_state(&self) -> &RemovalState {
        self.removal.state()
    }

    /// Id awaiting removal confirmation, if any.
    pub fn pending_removal(&self) -> Option<&AchievementId> {
        self.removal.pending()
    }

    /// Registers a change listener.
    pub fn subscribe(&mut self, listener: impl Fn(&ChangeEvent) + Send + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener; returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Blocks until every queued snapshot has been attempted.
    pub fn flush(&self) -> bool {
        self.persist.flush()
    }

    /// Number of snapshots queued since creation.
    pub fn persists_issued(&self) -> u64 {
        self.persist.submitted()
    }

    /// Number of snapshot writes that failed.
    pub fn persists_failed(&self) -> u64 {
        self.persist.failed()
    }

    /// Drains pending writes and stops the writer. Also runs on drop.
    pub fn shutdown(&mut self) {
        self.persist.shutdown();
    }

    fn ensure_loaded(&self) -> StoreResult<()> {
        if self.loaded {
            Ok(())
        } else {
            warn!("event=store_guard module=store status=rejected reason=not_loaded");
            Err(StoreError::NotLoaded)
        }
    }

    fn persist_snapshot(&mut self) {
        match encode_collection(&self.records) {
            Ok(bytes) => {
                self.persist.submit(bytes);
            }
            Err(err) => {
                error!("event=persist_encode module=store status=error error={err}");
            }
        }
    }

    fn notify(&self, event: &ChangeEvent) {
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }
}
