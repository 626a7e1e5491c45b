//! Membership-tier pseudo-group backend.
//!
//! Presents a closed, compile-time-known set of groups derived from the
//! remote user's membership tier. No remote group listing involved, only
//! per-user lookups and filtered user queries.

use crate::group::GroupDetails;
use crate::user::UserDirectory;
use membridge_api::{ApiClient, ListQuery};
use membridge_cache::{Cache, MEMBERSHIP_TTL};
use membridge_core::{MembershipTier, SyncConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

const NS: &str = "MemberGroupDirectory";

/// The fixed pseudo-group set: (gid, display name).
const TIER_GROUPS: [(&str, &str); 4] = [
    ("members", "Members"),
    ("honorary", "Honorary Members"),
    ("extraordinary", "Extraordinary Members"),
    ("regular", "Ordinary Members"),
];

/// Directory backend exposing membership tiers as groups.
pub struct MemberGroupDirectory {
    client: Arc<ApiClient>,
    cache: Cache,
    config: Arc<SyncConfig>,
    users: UserDirectory,
    membership_ttl: Duration,
}

impl MemberGroupDirectory {
    #[must_use]
    pub fn new(client: Arc<ApiClient>, cache: Cache, config: Arc<SyncConfig>) -> Self {
        let users = UserDirectory::new(client.clone(), cache.clone(), config.clone());
        Self {
            client,
            cache,
            config,
            users,
            membership_ttl: MEMBERSHIP_TTL,
        }
    }

    /// Override the membership cache TTL (shorter values are useful in tests).
    #[must_use]
    pub fn with_membership_ttl(mut self, membership_ttl: Duration) -> Self {
        self.membership_ttl = membership_ttl;
        self
    }

    fn token(&self) -> Option<&str> {
        Some(self.config.api_token.as_str())
    }

    /// The `where` filter selecting the users of a pseudo-group.
    fn membership_filter(gid: &str) -> Option<Value> {
        match gid {
            "members" => Some(json!({ "membership": { "$ne": "none" } })),
            "honorary" | "extraordinary" | "regular" => Some(json!({ "membership": gid })),
            _ => None,
        }
    }

    /// List pseudo-group ids matching the search string.
    pub fn list_groups(&self, search: &str) -> Vec<String> {
        let needle = search.to_lowercase();
        TIER_GROUPS
            .iter()
            .filter(|(gid, name)| {
                needle.is_empty()
                    || gid.to_lowercase().contains(&needle)
                    || name.to_lowercase().contains(&needle)
            })
            .map(|(gid, _)| (*gid).to_string())
            .collect()
    }

    /// Whether the pseudo-group exists.
    pub fn group_exists(&self, gid: &str) -> bool {
        TIER_GROUPS.iter().any(|(g, _)| *g == gid)
    }

    /// Display details for a pseudo-group.
    pub fn group_details(&self, gid: &str) -> Option<GroupDetails> {
        TIER_GROUPS
            .iter()
            .find(|(g, _)| *g == gid)
            .map(|(_, name)| GroupDetails {
                display_name: (*name).to_string(),
            })
    }

    /// Pseudo-groups the user belongs to, derived from their tier.
    pub async fn user_groups(&self, uid: &str) -> Vec<String> {
        match self.users.get_user(uid).await.map(|user| user.tier) {
            None | Some(MembershipTier::None) => Vec::new(),
            Some(tier) => vec!["members".to_string(), tier.as_str().to_string()],
        }
    }

    /// Whether the user is in the pseudo-group.
    pub async fn in_group(&self, uid: &str, gid: &str) -> bool {
        self.user_groups(uid).await.iter().any(|g| g == gid)
    }

    /// List the user ids in a pseudo-group.
    pub async fn users_in_group(
        &self,
        gid: &str,
        search: &str,
        limit: Option<u32>,
        offset: u32,
    ) -> Vec<String> {
        let Some(filter) = Self::membership_filter(gid) else {
            return Vec::new();
        };

        let key = format!("{NS}.group_users:{gid}:{search}:{limit:?}:{offset}");
        if let Some(uids) = self.cache.get(&key, false).await {
            return uids;
        }

        let query = ListQuery::new().filter(Self::with_search(filter, search));
        let result = if limit.is_none() {
            self.client
                .users_pages(query, self.token())
                .collect_all()
                .await
        } else {
            self.client
                .list_users(&query.window(limit, offset), self.token())
                .await
                .map(|list| list.items)
        };

        match result {
            Ok(users) => {
                let uids: Vec<String> = users.into_iter().map(|u| u.id).collect();
                self.cache.set_with_ttl(&key, &uids, self.membership_ttl).await;
                uids
            }
            Err(e) => {
                error!(gid, search, ?limit, offset, error = %e, "users_in_group failed");
                self.cache.get(&key, true).await.unwrap_or_default()
            }
        }
    }

    /// Count the users in a pseudo-group.
    pub async fn count_users_in_group(&self, gid: &str, search: &str) -> u64 {
        let Some(filter) = Self::membership_filter(gid) else {
            return 0;
        };

        let key = format!("{NS}.group_users_count:{gid}:{search}");
        if let Some(count) = self.cache.get(&key, false).await {
            return count;
        }

        let query = ListQuery::new()
            .filter(Self::with_search(filter, search))
            .max_results(1);
        match self.client.list_users(&query, self.token()).await {
            Ok(list) => {
                let count = list.meta.total;
                self.cache.set_with_ttl(&key, &count, self.membership_ttl).await;
                count
            }
            Err(e) => {
                error!(gid, search, error = %e, "count_users_in_group failed");
                self.cache.get(&key, true).await.unwrap_or(0)
            }
        }
    }

    /// Combine a tier filter with an optional user search filter.
    fn with_search(tier_filter: Value, search: &str) -> Value {
        match crate::search::user_search_filter(search) {
            Some(search_filter) => json!({ "$and": [tier_filter, search_filter] }),
            None => tier_filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_group_set_is_searchable() {
        let config = Arc::new(SyncConfig::new("https://api.example.org", "k"));
        let client = Arc::new(ApiClient::new(&config).unwrap());
        let directory = MemberGroupDirectory::new(client, Cache::in_memory(), config);

        assert_eq!(directory.list_groups("").len(), 4);
        assert_eq!(directory.list_groups("honor"), vec!["honorary"]);
        // Matches the display name "Ordinary Members".
        assert!(directory.list_groups("ordinary").contains(&"regular".to_string()));
        assert!(directory.list_groups("zzz").is_empty());
    }

    #[test]
    fn group_existence_and_details() {
        let config = Arc::new(SyncConfig::new("https://api.example.org", "k"));
        let client = Arc::new(ApiClient::new(&config).unwrap());
        let directory = MemberGroupDirectory::new(client, Cache::in_memory(), config);

        assert!(directory.group_exists("members"));
        assert!(!directory.group_exists("board"));
        assert_eq!(
            directory.group_details("honorary").unwrap().display_name,
            "Honorary Members"
        );
        assert!(directory.group_details("board").is_none());
    }

    #[test]
    fn members_filter_excludes_none_tier() {
        let filter = MemberGroupDirectory::membership_filter("members").unwrap();
        assert_eq!(filter["membership"]["$ne"], "none");

        let filter = MemberGroupDirectory::membership_filter("regular").unwrap();
        assert_eq!(filter["membership"], "regular");

        assert!(MemberGroupDirectory::membership_filter("board").is_none());
    }
}
