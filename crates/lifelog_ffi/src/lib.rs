//! Flutter-facing bindings for LifeLog core.

pub mod api;
