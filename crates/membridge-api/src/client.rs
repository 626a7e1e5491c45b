//! HTTP client for the remote membership API (reqwest-based).
//!
//! Thin, typed wrapper over the API's `users`, `groups`, `groupmemberships`,
//! and `sessions` resources. Timeouts are bounded so callers never block
//! indefinitely on a partial outage, and TLS certificate validation is
//! always on; there is deliberately no escape hatch.

use crate::dto::{ApiGroup, ApiGroupMembership, ApiSession, ApiUser, ListResponse};
use crate::error::{ApiError, ApiResult};
use crate::page::Pages;
use crate::query::ListQuery;
use membridge_core::SyncConfig;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

/// Typed client for the remote membership API.
///
/// Authentication tokens are passed per call: directory reads and background
/// sync use the configured API key, login-time calls use the session token
/// just obtained for the user.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
}

impl ApiClient {
    /// Build a client from the bridge configuration.
    pub fn new(config: &SyncConfig) -> ApiResult<Self> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| ApiError::InvalidConfig {
            message: format!("invalid api_base_url {}: {e}", config.api_base_url),
        })?;

        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(concat!("membridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::InvalidConfig {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { base_url, http })
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    pub fn with_http_client(base_url: &str, http: Client) -> ApiResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidConfig {
            message: format!("invalid base url {base_url}: {e}"),
        })?;
        Ok(Self { base_url, http })
    }

    // ── Users ─────────────────────────────────────────────────────────

    /// Look up a user by id. `Ok(None)` means the id is unknown remotely,
    /// an expected outcome, not an error.
    pub async fn find_user(&self, uid: &str, token: Option<&str>) -> ApiResult<Option<ApiUser>> {
        self.find(&format!("users/{uid}"), token).await
    }

    /// Fetch one page of users.
    pub async fn list_users(
        &self,
        query: &ListQuery,
        token: Option<&str>,
    ) -> ApiResult<ListResponse<ApiUser>> {
        self.get_list("users", query, token).await
    }

    /// Lazy page cursor over users.
    pub fn users_pages<'a>(&'a self, query: ListQuery, token: Option<&'a str>) -> Pages<'a, ApiUser> {
        Pages::new(self, "users", query, token)
    }

    // ── Groups ────────────────────────────────────────────────────────

    /// Look up a group by id; `Ok(None)` on remote 404.
    pub async fn find_group(&self, gid: &str, token: Option<&str>) -> ApiResult<Option<ApiGroup>> {
        self.find(&format!("groups/{gid}"), token).await
    }

    /// Fetch one page of groups.
    pub async fn list_groups(
        &self,
        query: &ListQuery,
        token: Option<&str>,
    ) -> ApiResult<ListResponse<ApiGroup>> {
        self.get_list("groups", query, token).await
    }

    /// Lazy page cursor over groups.
    pub fn groups_pages<'a>(
        &'a self,
        query: ListQuery,
        token: Option<&'a str>,
    ) -> Pages<'a, ApiGroup> {
        Pages::new(self, "groups", query, token)
    }

    // ── Group memberships ─────────────────────────────────────────────

    /// Fetch one page of group memberships.
    pub async fn list_group_memberships(
        &self,
        query: &ListQuery,
        token: Option<&str>,
    ) -> ApiResult<ListResponse<ApiGroupMembership>> {
        self.get_list("groupmemberships", query, token).await
    }

    /// Lazy page cursor over group memberships.
    pub fn group_memberships_pages<'a>(
        &'a self,
        query: ListQuery,
        token: Option<&'a str>,
    ) -> Pages<'a, ApiGroupMembership> {
        Pages::new(self, "groupmemberships", query, token)
    }

    // ── Sessions ──────────────────────────────────────────────────────

    /// Authenticate against the remote API, returning the created session
    /// with the user document embedded.
    ///
    /// A non-201 response (wrong credentials, API down) surfaces as an
    /// error; the caller decides whether to fail the login open or closed.
    pub async fn create_session(&self, username: &str, password: &str) -> ApiResult<ApiSession> {
        let url = self.resolve("sessions")?;
        debug!(username, "POST sessions");
        let response = self
            .http
            .post(url)
            .query(&[("embedded", json!({"user": 1}).to_string())])
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CREATED {
            Self::decode(response).await
        } else {
            Err(Self::error_for(status, "sessions", response).await)
        }
    }

    /// Find a session by its token, authenticating with that same token.
    pub async fn find_session_by_token(&self, token: &str) -> ApiResult<Option<ApiSession>> {
        let query = ListQuery::new().filter(json!({"token": token}));
        let list: ListResponse<ApiSession> = self.get_list("sessions", &query, Some(token)).await?;
        Ok(list.items.into_iter().next())
    }

    /// Delete a session by id, with the mandatory `If-Match` etag.
    pub async fn delete_session(&self, id: &str, etag: &str, token: &str) -> ApiResult<()> {
        let path = format!("sessions/{id}");
        let url = self.resolve(&path)?;
        debug!(session = id, "DELETE sessions");
        let response = self
            .http
            .delete(url)
            .header("If-Match", etag)
            .header("Authorization", token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::error_for(status, &path, response).await)
        }
    }

    // ── Internals ─────────────────────────────────────────────────────

    /// GET one page of a collection.
    pub(crate) async fn get_list<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &ListQuery,
        token: Option<&str>,
    ) -> ApiResult<ListResponse<T>> {
        let url = self.resolve(resource)?;
        debug!(resource, "GET collection");
        let mut request = self.http.get(url);
        let params = query.to_params();
        if !params.is_empty() {
            request = request.query(&params);
        }
        if let Some(token) = token {
            request = request.header("Authorization", token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            Self::decode(response).await
        } else {
            Err(Self::error_for(status, resource, response).await)
        }
    }

    /// GET a page by the raw `next` href returned in a list envelope.
    pub(crate) async fn get_href<T: DeserializeOwned>(
        &self,
        href: &str,
        token: Option<&str>,
    ) -> ApiResult<ListResponse<T>> {
        let url = self.resolve(href)?;
        debug!(href, "GET next page");
        let mut request = self.http.get(url);
        if let Some(token) = token {
            request = request.header("Authorization", token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            Self::decode(response).await
        } else {
            Err(Self::error_for(status, href, response).await)
        }
    }

    /// GET a single document, mapping remote 404 to `Ok(None)`.
    async fn find<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> ApiResult<Option<T>> {
        let url = self.resolve(path)?;
        debug!(path, "GET document");
        let mut request = self.http.get(url);
        if let Some(token) = token {
            request = request.header("Authorization", token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(Some(Self::decode(response).await?))
        } else if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            Err(Self::error_for(status, path, response).await)
        }
    }

    /// Resolve a path or relative href against the base URL. Absolute hrefs
    /// (as some deployments return in `_links.next`) pass through.
    fn resolve(&self, path_or_href: &str) -> ApiResult<Url> {
        self.base_url
            .join(path_or_href)
            .map_err(|e| ApiError::InvalidConfig {
                message: format!("invalid request path {path_or_href}: {e}"),
            })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            message: format!("response did not match schema: {e}"),
        })
    }

    /// Map a non-2xx response to an error, keeping the parsed error payload
    /// (when present) so callers can log the remote's diagnosis.
    async fn error_for(status: StatusCode, path: &str, response: Response) -> ApiError {
        let detail = response
            .text()
            .await
            .ok()
            .filter(|body| !body.is_empty())
            .unwrap_or_else(|| format!("HTTP {status}"));

        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound {
                path: path.to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized {
                status: status.as_u16(),
                detail,
            },
            _ => ApiError::Status {
                status: status.as_u16(),
                detail,
            },
        }
    }
}
