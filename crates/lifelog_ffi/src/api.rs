//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose achievement add/remove/search to Dart via FRB.
//! - Own the process-wide `AchievementStore` behind a lock.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - The store is opened and loaded lazily, once per process.
//! - Removal always goes through request + confirm.

use lifelog_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Achievement, AchievementId, AchievementStore, SqliteKvStore, StoreError, StoreOptions,
};
use log::{error, info};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

const DB_FILE_NAME: &str = "lifelog_achievements.sqlite3";
const DB_PATH_ENV: &str = "LIFELOG_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static STORE: OnceLock<Mutex<Option<AchievementStore>>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// One achievement as shown by the list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// `YYYY-MM-DD`.
    pub date: String,
}

/// Search response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementListResponse {
    /// Matching records, newest date first.
    pub items: Vec<AchievementItem>,
    /// Size of the whole collection, regardless of the filter.
    pub total: u32,
    /// Human-readable response message for diagnostics.
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementActionResponse {
    pub ok: bool,
    /// Affected achievement ID, when there is one.
    pub achievement_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl AchievementActionResponse {
    fn success(message: impl Into<String>, achievement_id: Option<String>) -> Self {
        Self {
            ok: true,
            achievement_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            achievement_id: None,
            message: message.into(),
        }
    }
}

/// Records a new achievement.
///
/// # FFI contract
/// - Empty title returns `ok=false` with a validation message; nothing is stored.
/// - `date=None` or blank means today's local date.
/// - Persistence is asynchronous; the response does not wait for the write.
#[flutter_rust_bridge::frb(sync)]
pub fn achievement_add(
    title: String,
    description: Option<String>,
    date: Option<String>,
) -> AchievementActionResponse {
    let result = with_store(|store| {
        store.add(title.as_str(), description.as_deref(), date.as_deref())
    });
    match result {
        Ok(id) => AchievementActionResponse::success("Achievement saved.", Some(id.to_string())),
        Err(err) => AchievementActionResponse::failure(format!("achievement_add failed: {err}")),
    }
}

/// Asks for removal of one achievement; the UI must confirm or cancel next.
#[flutter_rust_bridge::frb(sync)]
pub fn achievement_request_remove(id: String) -> AchievementActionResponse {
    let target = AchievementId::from_raw(id.trim());
    match with_store(|store| store.request_remove(&target)) {
        Ok(()) => AchievementActionResponse::success(
            "Removal awaiting confirmation.",
            Some(target.to_string()),
        ),
        Err(err) => AchievementActionResponse::failure(format!(
            "achievement_request_remove failed: {err}"
        )),
    }
}

/// Confirms the pending removal.
#[flutter_rust_bridge::frb(sync)]
pub fn achievement_confirm_remove() -> AchievementActionResponse {
    let result = with_store(|store| {
        let pending = store.pending_removal().map(ToString::to_string);
        store.confirm_remove().map(|removed| (pending, removed))
    });
    match result {
        Ok((pending, true)) => AchievementActionResponse::success("Achievement removed.", pending),
        Ok((pending, false)) => {
            AchievementActionResponse::success("Achievement was already gone.", pending)
        }
        Err(err) => AchievementActionResponse::failure(format!(
            "achievement_confirm_remove failed: {err}"
        )),
    }
}

/// Cancels the pending removal.
#[flutter_rust_bridge::frb(sync)]
pub fn achievement_cancel_remove() -> AchievementActionResponse {
    match with_store(|store| store.cancel_remove()) {
        Ok(id) => AchievementActionResponse::success("Removal cancelled.", Some(id.to_string())),
        Err(err) => AchievementActionResponse::failure(format!(
            "achievement_cancel_remove failed: {err}"
        )),
    }
}

/// Lists achievements sorted by date, filtered by free text.
///
/// # FFI contract
/// - Blank `text` returns the full collection.
/// - Never panics; failures return an empty list with a message.
#[flutter_rust_bridge::frb(sync)]
pub fn achievement_query(text: String) -> AchievementListResponse {
    let result = with_store(|store| {
        let items = store
            .query(text.as_str())
            .iter()
            .map(to_achievement_item)
            .collect::<Vec<_>>();
        Ok((items, store.len()))
    });

    match result {
        Ok((items, total)) => {
            let message = if items.is_empty() {
                "No achievements.".to_string()
            } else {
                format!("Found {} achievement(s).", items.len())
            };
            AchievementListResponse {
                items,
                total: u32::try_from(total).unwrap_or(u32::MAX),
                message,
            }
        }
        Err(err) => AchievementListResponse {
            items: Vec::new(),
            total: 0,
            message: format!("achievement_query failed: {err}"),
        },
    }
}

/// Waits for queued writes; call when the app moves to background.
///
/// Returns `true` when every queued write has been attempted.
#[flutter_rust_bridge::frb(sync)]
pub fn achievement_flush() -> bool {
    with_store(|store| Ok(store.flush())).unwrap_or(false)
}

fn to_achievement_item(record: &Achievement) -> AchievementItem {
    AchievementItem {
        id: record.id.to_string(),
        title: record.title.clone(),
        description: record.description.clone(),
        date: record.date.clone(),
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn open_store() -> Result<AchievementStore, String> {
    let db_path = resolve_db_path();
    let kv = SqliteKvStore::open(&db_path).map_err(|err| format!("store open failed: {err}"))?;
    let (store, outcome) = AchievementStore::open(Arc::new(kv), StoreOptions::default())
        .map_err(|err| format!("store load failed: {err}"))?;
    info!(
        "event=ffi_store_open module=ffi status=ok count={} recovered={}",
        store.len(),
        outcome.is_recovered()
    );
    Ok(store)
}

fn with_store<T>(
    f: impl FnOnce(&mut AchievementStore) -> Result<T, StoreError>,
) -> Result<T, String> {
    let slot = STORE.get_or_init(|| Mutex::new(None));
    let mut guard = slot.lock().map_err(|_| {
        error!("event=ffi_store_lock module=ffi status=error reason=poisoned");
        "achievement store lock poisoned".to_string()
    })?;

    if guard.is_none() {
        *guard = Some(open_store()?);
    }
    match guard.as_mut() {
        Some(store) => f(store).map_err(|err| err.to_string()),
        None => Err("achievement store unavailable".to_string()),
    }
}
