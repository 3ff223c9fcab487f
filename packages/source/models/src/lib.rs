#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Connection settings for the GitHub REST API.

use serde::{Deserialize, Serialize};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default value of the `X-GitHub-Api-Version` header.
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Connection settings for the GitHub API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API root, e.g. `https://api.github.com` or a GHES `/api/v3` root.
    pub base_url: String,
    /// Bearer token.
    pub token: String,
    /// REST API version header value.
    pub api_version: String,
    /// Optional safety cap on pages followed per fetch. `None` follows
    /// next links until the server stops sending them.
    pub max_pages: Option<u32>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            max_pages: None,
        }
    }
}

impl GitHubConfig {
    /// Returns a copy with the token replaced, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            token: if self.token.is_empty() {
                String::new()
            } else {
                "********".to_string()
            },
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.redacted().token)
            .field("api_version", &self.api_version)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: GitHubConfig = toml::from_str("token = \"abc\"").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.token, "abc");
        assert!(config.max_pages.is_none());
    }

    #[test]
    fn debug_output_hides_token() {
        let config = GitHubConfig {
            token: "ghp_secret".to_string(),
            ..GitHubConfig::default()
        };
        assert!(!format!("{config:?}").contains("ghp_secret"));
        assert_eq!(config.redacted().token, "********");
    }
}
