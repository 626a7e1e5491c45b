//! Remote-group directory backend.
//!
//! Serves group queries to the host identity subsystem: cache first, then
//! the API, then stale cache, then a neutral default. These reads must never
//! fail upward; the host's directory contract has no error channel.

use crate::search::group_name_filter;
use membridge_api::{ApiClient, ListQuery};
use membridge_cache::{Cache, DEFAULT_TTL, MEMBERSHIP_TTL};
use membridge_core::{RemoteGroup, SyncConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

const NS: &str = "GroupDirectory";

/// Display information for a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDetails {
    pub display_name: String,
}

/// Directory backend for groups sourced from the remote `groups` resource.
pub struct GroupDirectory {
    client: Arc<ApiClient>,
    cache: Cache,
    config: Arc<SyncConfig>,
    default_ttl: Duration,
    membership_ttl: Duration,
}

impl GroupDirectory {
    #[must_use]
    pub fn new(client: Arc<ApiClient>, cache: Cache, config: Arc<SyncConfig>) -> Self {
        Self {
            client,
            cache,
            config,
            default_ttl: DEFAULT_TTL,
            membership_ttl: MEMBERSHIP_TTL,
        }
    }

    /// Override the cache TTLs (shorter values are useful in tests).
    #[must_use]
    pub fn with_ttls(mut self, default_ttl: Duration, membership_ttl: Duration) -> Self {
        self.default_ttl = default_ttl;
        self.membership_ttl = membership_ttl;
        self
    }

    fn token(&self) -> Option<&str> {
        Some(self.config.api_token.as_str())
    }

    /// List group ids matching the search string.
    pub async fn list_groups(&self, search: &str, limit: Option<u32>, offset: u32) -> Vec<String> {
        let key = format!("{NS}.groups:{search}:{limit:?}:{offset}");
        if let Some(gids) = self.cache.get(&key, false).await {
            return gids;
        }

        let mut query = ListQuery::new();
        if let Some(filter) = group_name_filter(search) {
            query = query.filter(filter);
        }

        let result = if limit.is_none() {
            self.client
                .groups_pages(query, self.token())
                .collect_all()
                .await
        } else {
            self.client
                .list_groups(&query.window(limit, offset), self.token())
                .await
                .map(|list| list.items)
        };

        match result {
            Ok(api_groups) => {
                let groups: Vec<RemoteGroup> =
                    api_groups.into_iter().map(RemoteGroup::from).collect();
                for group in &groups {
                    self.cache_group(&group.gid, &Some(group.clone())).await;
                }
                let gids: Vec<String> = groups.into_iter().map(|g| g.gid).collect();
                self.cache.set_with_ttl(&key, &gids, self.default_ttl).await;
                gids
            }
            Err(e) => {
                error!(search, ?limit, offset, error = %e, "list_groups failed");
                self.cache.get(&key, true).await.unwrap_or_default()
            }
        }
    }

    /// List the user ids in a group.
    pub async fn users_in_group(
        &self,
        gid: &str,
        search: &str,
        limit: Option<u32>,
        offset: u32,
    ) -> Vec<String> {
        // The membership resource has no user-name fields to search on; the
        // search argument only participates in the cache key.
        let key = format!("{NS}.group_users:{gid}:{search}:{limit:?}:{offset}");
        if let Some(uids) = self.cache.get(&key, false).await {
            return uids;
        }

        let query = ListQuery::new().filter(json!({ "group": gid }));
        let result = if limit.is_none() {
            self.client
                .group_memberships_pages(query, self.token())
                .collect_all()
                .await
        } else {
            self.client
                .list_group_memberships(&query.window(limit, offset), self.token())
                .await
                .map(|list| list.items)
        };

        match result {
            Ok(memberships) => {
                let uids: Vec<String> = memberships.into_iter().map(|m| m.user).collect();
                self.cache
                    .set_with_ttl(&key, &uids, self.membership_ttl)
                    .await;
                uids
            }
            Err(e) => {
                error!(gid, search, ?limit, offset, error = %e, "users_in_group failed");
                self.cache.get(&key, true).await.unwrap_or_default()
            }
        }
    }

    /// Count the users in a group.
    pub async fn count_users_in_group(&self, gid: &str, search: &str) -> u64 {
        let key = format!("{NS}.group_users_count:{gid}:{search}");
        if let Some(count) = self.cache.get(&key, false).await {
            return count;
        }

        let query = ListQuery::new()
            .filter(json!({ "group": gid }))
            .max_results(1);
        match self.client.list_group_memberships(&query, self.token()).await {
            Ok(list) => {
                let count = list.meta.total;
                self.cache
                    .set_with_ttl(&key, &count, self.membership_ttl)
                    .await;
                count
            }
            Err(e) => {
                error!(gid, search, error = %e, "count_users_in_group failed");
                self.cache.get(&key, true).await.unwrap_or(0)
            }
        }
    }

    /// List the group ids a user belongs to.
    pub async fn user_groups(&self, uid: &str) -> Vec<String> {
        let key = format!("{NS}.user_groups:{uid}");
        if let Some(gids) = self.cache.get(&key, false).await {
            return gids;
        }

        let query = ListQuery::new()
            .filter(json!({ "user": uid }))
            .max_results(100);
        match self
            .client
            .group_memberships_pages(query, self.token())
            .collect_all()
            .await
        {
            Ok(memberships) => {
                let gids: Vec<String> = memberships
                    .into_iter()
                    .map(|m| m.group.id().to_string())
                    .collect();
                self.cache
                    .set_with_ttl(&key, &gids, self.membership_ttl)
                    .await;
                gids
            }
            Err(e) => {
                error!(uid, error = %e, "user_groups failed");
                self.cache.get(&key, true).await.unwrap_or_default()
            }
        }
    }

    /// Whether the user is currently a member of the group.
    pub async fn in_group(&self, uid: &str, gid: &str) -> bool {
        let key = format!("{NS}.user_group:{uid}:{gid}");
        if let Some(in_group) = self.cache.get(&key, false).await {
            return in_group;
        }

        let query = ListQuery::new()
            .filter(json!({ "user": uid, "group": gid }))
            .max_results(1);
        match self.client.list_group_memberships(&query, self.token()).await {
            Ok(list) => {
                let in_group = list.meta.total > 0 || !list.items.is_empty();
                self.cache
                    .set_with_ttl(&key, &in_group, self.membership_ttl)
                    .await;
                in_group
            }
            Err(e) => {
                error!(uid, gid, error = %e, "in_group failed");
                self.cache.get(&key, true).await.unwrap_or(false)
            }
        }
    }

    /// Whether a group with this id exists remotely.
    pub async fn group_exists(&self, gid: &str) -> bool {
        self.get_group(gid).await.is_some()
    }

    /// Display details for a group, if it exists.
    pub async fn group_details(&self, gid: &str) -> Option<GroupDetails> {
        self.get_group(gid).await.map(|group| GroupDetails {
            display_name: group.name,
        })
    }

    /// Whether the user is an admin: member of any configured admin group.
    ///
    /// Each group membership is checked through its own cache entry, so a
    /// partial cache still short-circuits remote calls.
    pub async fn is_admin(&self, uid: &str) -> bool {
        let key = format!("{NS}.admin:{uid}");
        if let Some(admin) = self.cache.get(&key, false).await {
            return admin;
        }

        let mut admin = false;
        for gid in self.admin_group_ids().await {
            if self.in_group(uid, &gid).await {
                admin = true;
                break;
            }
        }

        self.cache.set_with_ttl(&key, &admin, self.membership_ttl).await;
        admin
    }

    /// Resolve the configured admin group *names* to remote group ids.
    async fn admin_group_ids(&self) -> Vec<String> {
        if self.config.admin_groups.is_empty() {
            return Vec::new();
        }

        let key = format!("{NS}.admin_group_ids");
        if let Some(gids) = self.cache.get(&key, false).await {
            return gids;
        }

        let query =
            ListQuery::new().filter(json!({ "name": { "$in": self.config.admin_groups } }));
        match self
            .client
            .groups_pages(query, self.token())
            .collect_all()
            .await
        {
            Ok(groups) => {
                let gids: Vec<String> = groups.into_iter().map(|g| g.id).collect();
                self.cache.set_with_ttl(&key, &gids, self.default_ttl).await;
                gids
            }
            Err(e) => {
                error!(error = %e, "admin group id resolution failed");
                self.cache.get(&key, true).await.unwrap_or_default()
            }
        }
    }

    /// Fetch a group with a three-way cached outcome: found, known-absent
    /// (remote 404, cached as a negative entry), or failure (stale value if
    /// one exists).
    pub async fn get_group(&self, gid: &str) -> Option<RemoteGroup> {
        let key = format!("{NS}.group:{gid}");
        if let Some(cached) = self.cache.get::<Option<RemoteGroup>>(&key, false).await {
            return cached;
        }

        match self.client.find_group(gid, self.token()).await {
            Ok(found) => {
                let group = found.map(RemoteGroup::from);
                self.cache.set_with_ttl(&key, &group, self.default_ttl).await;
                group
            }
            Err(e) => {
                error!(gid, error = %e, "get_group failed");
                self.cache
                    .get::<Option<RemoteGroup>>(&key, true)
                    .await
                    .flatten()
            }
        }
    }

    async fn cache_group(&self, gid: &str, group: &Option<RemoteGroup>) {
        let key = format!("{NS}.group:{gid}");
        self.cache.set_with_ttl(&key, group, self.default_ttl).await;
    }
}
