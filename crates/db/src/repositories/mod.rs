//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod active_session_repo;
pub mod blacklist_repo;
pub mod failed_attempt_repo;
pub mod geo_cache_repo;
pub mod ip_history_repo;
pub mod subscription_ip_repo;
pub mod temporary_block_repo;
pub mod user_repo;
pub mod whitelist_repo;

pub use active_session_repo::ActiveSessionRepo;
pub use blacklist_repo::BlacklistRepo;
pub use failed_attempt_repo::FailedAttemptRepo;
pub use geo_cache_repo::GeoCacheRepo;
pub use ip_history_repo::IpHistoryRepo;
pub use subscription_ip_repo::SubscriptionIpRepo;
pub use temporary_block_repo::TemporaryBlockRepo;
pub use user_repo::UserRepo;
pub use whitelist_repo::WhitelistRepo;
