//! HTTP handlers, grouped by resource.

pub mod access;
pub mod blacklist;
pub mod sessions;
pub mod settings;
pub mod subscriptions;
pub mod whitelist;
