//! Collection document codec over the key-value store.
//!
//! # Responsibility
//! - Serialize the whole achievement collection into one JSON document.
//! - Load the document back with a lossy empty-collection fallback.
//!
//! # Invariants
//! - Exactly one key holds the collection; every write replaces it entirely.
//! - A corrupt document never surfaces as a load error.

pub mod achievement_repo;
