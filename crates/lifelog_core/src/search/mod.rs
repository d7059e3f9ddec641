//! Derived, read-only projections of the achievement collection.
//!
//! # Responsibility
//! - Sort records by date (newest first) and filter them by free text.
//! - Memoize the projection until the collection or the query changes.

pub mod view;
