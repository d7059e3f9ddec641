//! Domain model for achievement records.
//!
//! # Responsibility
//! - Define the canonical record persisted by the achievement store.
//! - Keep input normalization (trim, blank description, default date) in one place.
//!
//! # Invariants
//! - Every record is identified by an `AchievementId` unique within its collection.
//! - Records are never edited in place; they are created and removed only.

pub mod achievement;
