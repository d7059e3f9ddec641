//! Core use-case services.
//!
//! # Responsibility
//! - Own the achievement collection and its mutation/query operations.
//! - Keep persistence fire-and-forget and destructive actions confirmed.

pub mod achievement_store;
pub mod persist_queue;
pub mod removal;
