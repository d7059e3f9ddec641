//! Achievement collection codec and load policy.
//!
//! # Invariants
//! - The document is a JSON array in collection order (newest insert first).
//! - Decoded records are normalized: blank descriptions become `None` and
//!   duplicate ids keep their first occurrence.
//! - `load_collection` maps absent and undecodable documents to empty.

use crate::model::achievement::{normalize_description, Achievement};
use crate::storage::{KeyValueStore, StorageError};
use log::{error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fixed, versioned key holding the serialized collection.
pub const STORAGE_KEY: &str = "life_achievements_v1";

const CORRUPT_KEY_SUFFIX: &str = ".corrupt";

/// Collection (de)serialization failure.
#[derive(Debug)]
pub struct CodecError(serde_json::Error);

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid achievement document: {}", self.0)
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(value: serde_json::Error) -> Self {
        Self(value)
    }
}

/// How a load resolved.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Nothing was stored under the key (first run).
    Absent,
    /// Document decoded successfully.
    Loaded { count: usize },
    /// Document was present but undecodable; the collection falls back to empty.
    Recovered {
        error: CodecError,
        /// Raw stored bytes kept for diagnostics.
        raw: Vec<u8>,
        /// Whether the raw bytes were copied to the `.corrupt` key.
        quarantined: bool,
    },
    /// The store itself failed to read; treated like an absent document.
    Unreadable(StorageError),
}

impl LoadOutcome {
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }
}

/// Collection to start from plus how it was obtained.
#[derive(Debug)]
pub struct LoadReport {
    pub records: Vec<Achievement>,
    pub outcome: LoadOutcome,
}

impl LoadReport {
    fn empty(outcome: LoadOutcome) -> Self {
        Self {
            records: Vec::new(),
            outcome,
        }
    }
}

/// Serializes the full collection as a JSON array.
pub fn encode_collection(records: &[Achievement]) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(records)?)
}

/// Decodes a stored document and normalizes its records.
pub fn decode_collection(bytes: &[u8]) -> Result<Vec<Achievement>, CodecError> {
    let decoded: Vec<Achievement> = serde_json::from_slice(bytes)?;
    Ok(normalize_loaded(decoded))
}

/// Key under which an undecodable document is preserved.
pub fn corrupt_key(key: &str) -> String {
    format!("{key}{CORRUPT_KEY_SUFFIX}")
}

/// Reads and decodes the collection stored under `key`.
///
/// # Side effects
/// - On decode failure, copies the raw bytes to [`corrupt_key`] (best effort).
/// - Emits `collection_load` logging events; record content is never logged.
pub fn load_collection(store: &dyn KeyValueStore, key: &str) -> LoadReport {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            info!("event=collection_load module=repo status=ok outcome=absent");
            return LoadReport::empty(LoadOutcome::Absent);
        }
        Err(err) => {
            error!("event=collection_load module=repo status=error outcome=unreadable error={err}");
            return LoadReport::empty(LoadOutcome::Unreadable(err));
        }
    };

    match decode_collection(&raw) {
        Ok(records) => {
            info!(
                "event=collection_load module=repo status=ok outcome=loaded count={} bytes={}",
                records.len(),
                raw.len()
            );
            LoadReport {
                outcome: LoadOutcome::Loaded {
                    count: records.len(),
                },
                records,
            }
        }
        Err(error) => {
            let quarantined = match store.set(&corrupt_key(key), &raw) {
                Ok(()) => true,
                Err(err) => {
                    error!(
                        "event=collection_quarantine module=repo status=error error={err}"
                    );
                    false
                }
            };
            warn!(
                "event=collection_load module=repo status=recovered outcome=corrupt bytes={} quarantined={} error={}",
                raw.len(),
                quarantined,
                error
            );
            LoadReport::empty(LoadOutcome::Recovered {
                error,
                raw,
                quarantined,
            })
        }
    }
}

fn normalize_loaded(records: Vec<Achievement>) -> Vec<Achievement> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut normalized = Vec::with_capacity(records.len());
    let mut dropped = 0_usize;

    for mut record in records {
        if !seen.insert(record.id.clone()) {
            dropped += 1;
            continue;
        }
        record.description = normalize_description(record.description.as_deref());
        normalized.push(record);
    }

    if dropped > 0 {
        warn!("event=collection_normalize module=repo status=ok dropped_duplicates={dropped}");
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::{decode_collection, encode_collection};
    use crate::model::achievement::{Achievement, AchievementId};

    fn record(id: &str, description: Option<&str>) -> Achievement {
        Achievement {
            id: AchievementId::from_raw(id),
            title: "t".to_string(),
            description: description.map(ToString::to_string),
            date: "2024-01-01".to_string(),
        }
    }

    #[test]
    fn absent_description_is_omitted_from_document() {
        let bytes = encode_collection(&[record("a", None)]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("description"), "{text}");
    }

    #[test]
    fn decode_drops_duplicate_ids_keeping_first() {
        let bytes = br#"[
            {"id":"a","title":"first","date":"2024-01-01"},
            {"id":"a","title":"second","date":"2024-01-02"}
        ]"#;
        let records = decode_collection(bytes).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "first");
    }

    #[test]
    fn decode_maps_blank_description_to_none() {
        let bytes = br#"[{"id":"a","title":"t","description":"  ","date":"2024-01-01"}]"#;
        let records = decode_collection(bytes).unwrap();
        assert_eq!(records[0].description, None);
    }

    #[test]
    fn decode_rejects_non_array_documents() {
        assert!(decode_collection(br#"{"id":"a"}"#).is_err());
        assert!(decode_collection(b"not json").is_err());
    }
}
