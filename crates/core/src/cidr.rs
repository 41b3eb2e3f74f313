//! CIDR rule parsing and matching for whitelist/blacklist entries.
//!
//! Entries are stored as free-text rules: either a CIDR range
//! (`"192.168.1.0/24"`, `"2001:db8::/32"`) or a bare address, which is
//! treated as an implicit host route (`/32` for IPv4, `/128` for IPv6).
//! Parsing and containment checks are delegated to the `ipnetwork` crate.
//!
//! IPv4-mapped IPv6 addresses (`::ffff:192.0.2.1`) are normalized to their
//! IPv4 form before matching, so a proxy that reports mapped addresses still
//! hits IPv4 rules.

use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a whitelist/blacklist rule into an [`IpNetwork`].
///
/// Accepts both CIDR notation and bare addresses. Bare addresses become host
/// networks (`/32` / `/128`). Returns [`CoreError::InvalidCidr`] on malformed
/// input, including out-of-range prefixes like `/33` on IPv4.
pub fn parse_rule(rule: &str) -> Result<IpNetwork, CoreError> {
    let trimmed = rule.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidCidr("empty rule".into()));
    }
    IpNetwork::from_str(trimmed).map_err(|e| CoreError::InvalidCidr(format!("{trimmed}: {e}")))
}

/// Parse an IP address string, rejecting malformed input.
pub fn parse_ip(ip: &str) -> Result<IpAddr, CoreError> {
    ip.trim()
        .parse::<IpAddr>()
        .map_err(|_| CoreError::Validation(format!("malformed IP address: {ip}")))
}

/// Validate rule syntax without keeping the parsed network.
///
/// Used at the admin write boundary so malformed rules never reach the
/// decision path.
pub fn validate_rule(rule: &str) -> Result<(), CoreError> {
    parse_rule(rule).map(|_| ())
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Collapse an IPv4-mapped IPv6 address to its IPv4 form.
///
/// All other addresses are returned unchanged.
pub fn normalize(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => ip,
        },
        IpAddr::V4(_) => ip,
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Check whether `ip` falls inside `network`.
///
/// The address is normalized first; a mismatched address family after
/// normalization never matches (an IPv6 rule does not capture IPv4 traffic
/// or vice versa).
pub fn ip_in_network(ip: IpAddr, network: &IpNetwork) -> bool {
    network.contains(normalize(ip))
}

/// String-level convenience: does `ip` match `rule`?
///
/// Both sides are parsed; errors propagate so callers at the write boundary
/// can surface them, while read-path callers pre-validate rules on insert.
pub fn matches_cidr(ip: &str, rule: &str) -> Result<bool, CoreError> {
    let addr = parse_ip(ip)?;
    let network = parse_rule(rule)?;
    Ok(ip_in_network(addr, &network))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
