//! Bridge configuration.
//!
//! All configuration is carried in an explicit struct handed to each
//! component's constructor; there is no ambient lookup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_file_owner() -> String {
    "admin".to_string()
}

fn default_local_admin_group() -> String {
    "admin".to_string()
}

fn default_internal_group() -> String {
    "member".to_string()
}

fn default_retention_secs() -> u64 {
    // 30 days
    30 * 24 * 3600
}

fn default_connect_timeout_secs() -> u64 {
    2
}

fn default_request_timeout_secs() -> u64 {
    5
}

/// Configuration for the membership bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the remote membership API.
    pub api_base_url: String,

    /// API key used for directory reads and background synchronization.
    pub api_token: String,

    /// Local account owning all shared group folders.
    #[serde(default = "default_file_owner")]
    pub file_owner_account: String,

    /// Remote group *names* whose members get local admin rights.
    #[serde(default)]
    pub admin_groups: Vec<String>,

    /// Local group granting administrative rights.
    #[serde(default = "default_local_admin_group")]
    pub local_admin_group: String,

    /// Local group every remote member (tier != none) belongs to.
    #[serde(default = "default_internal_group")]
    pub internal_group: String,

    /// How long a soft-deleted share mapping is kept before its folder is
    /// removed for good.
    #[serde(default = "default_retention_secs")]
    pub share_retention_secs: u64,

    /// TCP connect timeout for API requests.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Total per-request timeout for API requests.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl SyncConfig {
    /// Create a configuration with defaults for everything but the API
    /// endpoint and credentials.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            api_base_url: normalize_base_url(api_base_url.into()),
            api_token: api_token.into(),
            file_owner_account: default_file_owner(),
            admin_groups: Vec::new(),
            local_admin_group: default_local_admin_group(),
            internal_group: default_internal_group(),
            share_retention_secs: default_retention_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Validate the configuration, returning a message describing the first
    /// problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_base_url.is_empty() {
            return Err("api_base_url must not be empty".to_string());
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(format!("api_base_url has no http(s) scheme: {}", self.api_base_url));
        }
        if self.file_owner_account.is_empty() {
            return Err("file_owner_account must not be empty".to_string());
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err("timeouts must be non-zero".to_string());
        }
        Ok(())
    }

    /// Whether a remote group name is on the admin allowlist.
    #[must_use]
    pub fn is_admin_group(&self, group_name: &str) -> bool {
        self.admin_groups.iter().any(|g| g == group_name)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn share_retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.share_retention_secs as i64)
    }
}

/// Ensure the base URL ends with exactly one trailing slash so request paths
/// can be joined naively.
fn normalize_base_url(url: String) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.is_empty() {
        url
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_single_trailing_slash() {
        let config = SyncConfig::new("https://api.example.org", "key");
        assert_eq!(config.api_base_url, "https://api.example.org/");

        let config = SyncConfig::new("https://api.example.org///", "key");
        assert_eq!(config.api_base_url, "https://api.example.org/");
    }

    #[test]
    fn validate_rejects_bad_input() {
        let mut config = SyncConfig::new("https://api.example.org", "key");
        assert!(config.validate().is_ok());

        config.file_owner_account.clear();
        assert!(config.validate().is_err());

        let config = SyncConfig::new("ftp://api.example.org", "key");
        assert!(config.validate().is_err());
    }

    #[test]
    fn admin_group_allowlist() {
        let mut config = SyncConfig::new("https://api.example.org", "key");
        config.admin_groups = vec!["IT Board".to_string()];
        assert!(config.is_admin_group("IT Board"));
        assert!(!config.is_admin_group("Choir"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: SyncConfig = serde_json::from_str(
            r#"{"api_base_url": "https://api.example.org/", "api_token": "k"}"#,
        )
        .unwrap();
        assert_eq!(config.file_owner_account, "admin");
        assert_eq!(config.internal_group, "member");
        assert_eq!(config.connect_timeout_secs, 2);
        assert_eq!(config.request_timeout_secs, 5);
    }
}
