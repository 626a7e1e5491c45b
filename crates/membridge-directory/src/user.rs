//! Remote-user directory backend.
//!
//! Same read policy as the group backend: cache, API, stale cache, neutral
//! default. Also carries the password check, which authenticates by opening
//! (and immediately closing) a probe session on the remote API.

use crate::search::user_search_filter;
use membridge_api::{ApiClient, ApiError, ListQuery};
use membridge_cache::{Cache, DEFAULT_TTL};
use membridge_core::{RemoteUser, SyncConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const NS: &str = "UserDirectory";

/// Directory backend for users sourced from the remote `users` resource.
pub struct UserDirectory {
    client: Arc<ApiClient>,
    cache: Cache,
    config: Arc<SyncConfig>,
    default_ttl: Duration,
}

impl UserDirectory {
    #[must_use]
    pub fn new(client: Arc<ApiClient>, cache: Cache, config: Arc<SyncConfig>) -> Self {
        Self {
            client,
            cache,
            config,
            default_ttl: DEFAULT_TTL,
        }
    }

    /// Override the cache TTL (shorter values are useful in tests).
    #[must_use]
    pub fn with_ttl(mut self, default_ttl: Duration) -> Self {
        self.default_ttl = default_ttl;
        self
    }

    fn token(&self) -> Option<&str> {
        Some(self.config.api_token.as_str())
    }

    /// List user ids matching the search string.
    pub async fn list_users(&self, search: &str, limit: Option<u32>, offset: u32) -> Vec<String> {
        let key = format!("{NS}.users:{search}:{limit:?}:{offset}");
        if let Some(uids) = self.cache.get(&key, false).await {
            return uids;
        }

        let mut query = ListQuery::new();
        if let Some(filter) = user_search_filter(search) {
            query = query.filter(filter);
        }

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
            Ok(api_users) => {
                let users: Vec<RemoteUser> = api_users.into_iter().map(RemoteUser::from).collect();
                for user in &users {
                    self.cache_user(user).await;
                }
                let uids: Vec<String> = users.into_iter().map(|u| u.uid).collect();
                self.cache.set_with_ttl(&key, &uids, self.default_ttl).await;
                uids
            }
            Err(e) => {
                error!(search, ?limit, offset, error = %e, "list_users failed");
                self.cache.get(&key, true).await.unwrap_or_default()
            }
        }
    }

    /// Total number of remote users.
    pub async fn count_users(&self) -> u64 {
        let key = format!("{NS}.users_count");
        if let Some(count) = self.cache.get(&key, false).await {
            return count;
        }

        let query = ListQuery::new().max_results(1);
        match self.client.list_users(&query, self.token()).await {
            Ok(list) => {
                let count = list.meta.total;
                self.cache.set_with_ttl(&key, &count, self.default_ttl).await;
                count
            }
            Err(e) => {
                error!(error = %e, "count_users failed");
                self.cache.get(&key, true).await.unwrap_or(0)
            }
        }
    }

    /// Whether a user with this id exists remotely.
    pub async fn user_exists(&self, uid: &str) -> bool {
        self.get_user(uid).await.is_some()
    }

    /// Display name for a user, empty when unknown.
    pub async fn display_name(&self, uid: &str) -> String {
        self.get_user(uid)
            .await
            .map(|user| user.display_name)
            .unwrap_or_default()
    }

    /// Validate credentials against the remote API.
    ///
    /// Opens a session with the supplied credentials, caches the embedded
    /// user document, closes the probe session again, and returns the user
    /// id. Any failure (wrong password, API down) yields `None`; whether
    /// an unreachable API still admits verified local administrators is the
    /// host's fail-open decision, not this backend's.
    pub async fn check_password(&self, login_name: &str, password: &str) -> Option<String> {
        // Basic input sanitation.
        let login_name = login_name.replace('\0', "");
        let password = password.replace('\0', "");

        match self.client.create_session(&login_name, &password).await {
            Ok(session) => {
                let uid = match session.user.expanded() {
                    Some(api_user) => {
                        let user = RemoteUser::from(api_user.clone());
                        let uid = user.uid.clone();
                        self.cache_user(&user).await;
                        uid
                    }
                    None => session.user.id().to_string(),
                };

                // The probe session served its purpose; close it. Best
                // effort: the token expires server-side anyway.
                if let Err(e) = self
                    .client
                    .delete_session(&session.id, &session.etag, &session.token)
                    .await
                {
                    debug!(uid, error = %e, "failed to close probe session");
                }

                info!(uid, "successful authentication");
                Some(uid)
            }
            Err(ApiError::Unauthorized { .. }) => {
                info!(login_name, "invalid password attempt");
                None
            }
            Err(e) => {
                error!(login_name, error = %e, "check_password failed");
                None
            }
        }
    }

    /// Fetch a user with a three-way cached outcome: found, known-local
    /// (remote 404, cached as a negative entry), or failure (stale value if
    /// one exists).
    pub async fn get_user(&self, uid: &str) -> Option<RemoteUser> {
        let key = format!("{NS}.user:{uid}");
        if let Some(cached) = self.cache.get::<Option<RemoteUser>>(&key, false).await {
            return cached;
        }

        match self.client.find_user(uid, self.token()).await {
            Ok(found) => {
                let user = found.map(RemoteUser::from);
                self.cache.set_with_ttl(&key, &user, self.default_ttl).await;
                user
            }
            Err(e) => {
                error!(uid, error = %e, "get_user failed");
                self.cache
                    .get::<Option<RemoteUser>>(&key, true)
                    .await
                    .flatten()
            }
        }
    }

    async fn cache_user(&self, user: &RemoteUser) {
        let key = format!("{NS}.user:{}", user.uid);
        self.cache
            .set_with_ttl(&key, &Some(user.clone()), self.default_ttl)
            .await;
    }
}
