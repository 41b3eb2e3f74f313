//! Entity structs and DTOs for the IP restriction tables.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts where the write path needs one

pub mod active_session;
pub mod blacklist;
pub mod failed_attempt;
pub mod geo_cache;
pub mod ip_history;
pub mod subscription_ip;
pub mod temporary_block;
pub mod user;
pub mod whitelist;
