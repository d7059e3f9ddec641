//! Achievement domain model.
//!
//! # Responsibility
//! - Define the single record shape persisted by the achievement store.
//! - Normalize and validate user input before a record is created.
//!
//! # Invariants
//! - `id` is generated once and never reused for another record.
//! - `title` is non-empty and trimmed.
//! - `description` is `None` rather than an empty string.
//! - `date` is stored as typed; only `YYYY-MM-DD` text orders correctly, so
//!   other shapes are accepted but logged.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const ID_SUFFIX_LEN: usize = 6;
const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static DATE_SHAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid date regex"));

/// Opaque record identifier.
///
/// Textual form is `<epoch-millis>_<base36 suffix>`. Only equality matters to
/// callers; the layout is an implementation detail of [`AchievementId::generate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(String);

impl AchievementId {
    /// Generates a fresh id from the current wall clock and a random suffix.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        Self::from_parts(millis, Uuid::new_v4().as_u128())
    }

    fn from_parts(millis: u128, entropy: u128) -> Self {
        let mut remaining = entropy;
        let mut suffix = String::with_capacity(ID_SUFFIX_LEN);
        for _ in 0..ID_SUFFIX_LEN {
            suffix.push(char::from(BASE36_ALPHABET[(remaining % 36) as usize]));
            remaining /= 36;
        }
        Self(format!("{millis}_{suffix}"))
    }

    /// Wraps an existing id, e.g. one received back from the UI layer.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AchievementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validation failures for achievement input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AchievementValidationError {
    /// Title is empty or whitespace only.
    EmptyTitle,
}

impl Display for AchievementValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "achievement title cannot be empty"),
        }
    }
}

impl Error for AchievementValidationError {}

/// One user-authored milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub title: String,
    /// Omitted from the stored document when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Expected `YYYY-MM-DD`; compared as a string for ordering.
    pub date: String,
}

impl Achievement {
    /// Builds a record from raw form input with a freshly generated id.
    ///
    /// `date = None` (or a blank value) falls back to today's local date.
    pub fn new(
        title: &str,
        description: Option<&str>,
        date: Option<&str>,
    ) -> Result<Self, AchievementValidationError> {
        Self::with_id(AchievementId::generate(), title, description, date)
    }

    /// Same as [`Achievement::new`] with a caller-provided id.
    pub fn with_id(
        id: AchievementId,
        title: &str,
        description: Option<&str>,
        date: Option<&str>,
    ) -> Result<Self, AchievementValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AchievementValidationError::EmptyTitle);
        }

        let date = match date.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => value.to_string(),
            None => today_local(),
        };
        if !is_iso_date_shape(&date) {
            warn!("event=achievement_date module=model status=nonstandard len={}", date.len());
        }

        Ok(Self {
            id,
            title: title.to_string(),
            description: normalize_description(description),
            date,
        })
    }

    /// Text searched by the derived view, joined by single spaces.
    pub fn search_haystack(&self) -> String {
        let mut haystack = self.title.clone();
        if let Some(description) = self.description.as_deref() {
            haystack.push(' ');
            haystack.push_str(description);
        }
        haystack.push(' ');
        haystack.push_str(&self.date);
        haystack
    }
}

/// Trims an optional description and maps blank input to `None`.
pub fn normalize_description(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Whether `value` has `YYYY-MM-DD` shape. Calendar validity is not checked.
pub fn is_iso_date_shape(value: &str) -> bool {
    DATE_SHAPE_RE.is_match(value)
}

/// Current local calendar date as `YYYY-MM-DD`.
pub fn today_local() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
