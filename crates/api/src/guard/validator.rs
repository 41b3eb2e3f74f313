//! Whitelist/blacklist rule matching.
//!
//! Rules are stored as validated CIDR text and matched in process: the store
//! narrows candidates to the user's scope (global entries plus entries for
//! that user, unexpired for the blacklist) and the containment check runs
//! over the parsed networks. A malformed rule that somehow reached the table
//! is skipped with a warning instead of poisoning the decision.

use std::net::IpAddr;
use std::sync::Arc;

use ipguard_core::cidr;
use ipguard_core::types::DbId;
use ipguard_db::models::blacklist::BlacklistEntry;
use ipguard_db::store::{AccessStore, StoreError};

/// Matches incoming IPs against the stored whitelist and blacklist.
pub struct Validator {
    store: Arc<dyn AccessStore>,
}

impl Validator {
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self { store }
    }

    /// Does any whitelist entry (global or scoped to `user_id`) cover `ip`?
    pub async fn is_whitelisted(&self, user_id: DbId, ip: IpAddr) -> Result<bool, StoreError> {
        let candidates = self.store.whitelist_candidates(user_id).await?;
        Ok(candidates
            .iter()
            .any(|entry| rule_covers(&entry.rule, ip)))
    }

    /// The first unexpired blacklist entry (global or scoped to `user_id`)
    /// covering `ip`, if any.
    pub async fn find_blacklist_match(
        &self,
        user_id: DbId,
        ip: IpAddr,
    ) -> Result<Option<BlacklistEntry>, StoreError> {
        let candidates = self.store.blacklist_candidates(user_id).await?;
        Ok(candidates
            .into_iter()
            .find(|entry| rule_covers(&entry.rule, ip)))
    }
}

/// Containment check tolerant of malformed stored rules.
fn rule_covers(rule: &str, ip: IpAddr) -> bool {
    match cidr::parse_rule(rule) {
        Ok(network) => cidr::ip_in_network(ip, &network),
        Err(e) => {
            tracing::warn!(rule, error = %e, "Skipping malformed list rule");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipguard_db::models::blacklist::CreateBlacklistEntry;
    use ipguard_db::models::whitelist::CreateWhitelistEntry;
    use ipguard_db::store::MemoryAccessStore;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    async fn store_with_whitelist(rule: &str, user_id: Option<DbId>) -> Arc<MemoryAccessStore> {
        let store = Arc::new(MemoryAccessStore::new());
        store
            .insert_whitelist(&CreateWhitelistEntry {
                rule: rule.into(),
                user_id,
                description: String::new(),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn global_whitelist_covers_every_user() {
        let store = store_with_whitelist("10.0.0.0/8", None).await;
        let validator = Validator::new(store);

        assert!(validator.is_whitelisted(1, ip("10.1.2.3")).await.unwrap());
        assert!(validator.is_whitelisted(99, ip("10.1.2.3")).await.unwrap());
        assert!(!validator.is_whitelisted(1, ip("11.1.2.3")).await.unwrap());
    }

    #[tokio::test]
    async fn scoped_whitelist_only_covers_its_user() {
        let store = store_with_whitelist("192.168.0.0/16", Some(7)).await;
        let validator = Validator::new(store);

        assert!(validator.is_whitelisted(7, ip("192.168.1.1")).await.unwrap());
        assert!(!validator.is_whitelisted(8, ip("192.168.1.1")).await.unwrap());
    }

    #[tokio::test]
    async fn blacklist_match_returns_the_entry() {
        let store = Arc::new(MemoryAccessStore::new());
        store
            .insert_blacklist(&CreateBlacklistEntry {
                rule: "203.0.113.0/24".into(),
                user_id: None,
                reason: "scanner range".into(),
                expires_at: None,
                is_automatic: false,
            })
            .await
            .unwrap();
        let validator = Validator::new(store);

        let hit = validator
            .find_blacklist_match(1, ip("203.0.113.9"))
            .await
            .unwrap();
        assert_eq!(hit.unwrap().reason, "scanner range");

        let miss = validator
            .find_blacklist_match(1, ip("198.51.100.9"))
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn mapped_ipv6_hits_ipv4_rules() {
        let store = store_with_whitelist("192.0.2.0/24", None).await;
        let validator = Validator::new(store);

        assert!(validator
            .is_whitelisted(1, ip("::ffff:192.0.2.9"))
            .await
            .unwrap());
    }
}
