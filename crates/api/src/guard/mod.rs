//! The access-control decision engine.
//!
//! Components, in the order the decision path consults them:
//!
//! - [`Validator`] — whitelist/blacklist CIDR matching.
//! - [`GeoResolver`] — cache-first geolocation with a pluggable provider.
//! - [`AccessGuard`] — orchestrates the full `check_access` precedence:
//!   whitelist bypass, blacklist, temporary blocks, geo rules, subscription
//!   IP accounting, then concurrency admission.
//! - [`AbuseEscalator`] — fixed-window failure counting with automatic
//!   blacklist escalation.
//! - [`KickCoordinator`] — forced session removal plus a temporary block.

pub mod abuse;
pub mod access;
pub mod geo;
pub mod kick;
pub mod validator;

pub use abuse::AbuseEscalator;
pub use access::{AccessGuard, AccessRequest};
pub use geo::{GeoLookupError, GeoProvider, GeoResolver, HttpGeoProvider, NoopGeoProvider};
pub use kick::KickCoordinator;
pub use validator::Validator;
