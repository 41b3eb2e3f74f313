//! Domain logic for the IP restriction subsystem.
//!
//! Pure, I/O-free building blocks: CIDR matching, the access-decision
//! vocabulary, geo rule evaluation, fixed-window abuse counting,
//! suspicious-pattern detection, and the runtime settings object.
//! Everything that touches a database or the network lives in the
//! `ipguard-db` and `ipguard-api` crates.

pub mod abuse;
pub mod cidr;
pub mod decision;
pub mod error;
pub mod geo;
pub mod settings;
pub mod suspicious;
pub mod types;

pub use error::CoreError;
