//! Authenticated GitHub REST API client.

use std::time::Duration;

use copilot_metrics_source_models::GitHubConfig;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

use crate::FetchError;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sent as `User-Agent` on every request.
const USER_AGENT_VALUE: &str = "copilot-metrics-ingest";

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// A GitHub API client bound to one API root and token.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    api_version: String,
    max_pages: Option<u32>,
}

impl GitHubClient {
    /// Builds a client from connection settings.
    ///
    /// A trailing `/` on the base URL is dropped; an empty base URL falls
    /// back to the public API.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &GitHubConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let base_url = if config.base_url.trim().is_empty() {
            copilot_metrics_source_models::DEFAULT_BASE_URL
        } else {
            config.base_url.trim()
        };

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            api_version: config.api_version.clone(),
            max_pages: config.max_pages,
        })
    }

    /// Returns the normalized API root (no trailing `/`).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the configured page cap, if any.
    #[must_use]
    pub const fn max_pages(&self) -> Option<u32> {
        self.max_pages
    }

    /// Resolves a relative API path or absolute URL to a full URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the result does not parse.
    pub fn url_for(&self, path: &str) -> Result<reqwest::Url, FetchError> {
        let full = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        };

        reqwest::Url::parse(&full).map_err(|e| {
            log::error!("Invalid URL {full}: {e}");
            FetchError::InvalidUrl {
                url: full,
                message: e.to_string(),
            }
        })
    }

    /// Issues an authenticated `GET`.
    ///
    /// The response is returned whatever its status; callers decide which
    /// statuses are errors.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the URL is invalid or the request fails at
    /// the transport level.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response, FetchError> {
        let url = self.url_for(path)?;
        log::debug!("GET {url}");

        let response = self
            .http
            .get(url)
            .headers(self.headers())
            .send()
            .await?;

        Ok(response)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        match HeaderValue::from_str(&format!("Bearer {}", self.token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(e) => log::warn!("GitHub token is not a valid header value, sending none: {e}"),
        }

        match HeaderValue::from_str(&self.api_version) {
            Ok(value) => {
                headers.insert("X-GitHub-Api-Version", value);
            }
            Err(e) => log::warn!("Invalid API version {:?}: {e}", self.api_version),
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(base_url: &str) -> GitHubClient {
        GitHubClient::new(&GitHubConfig {
            base_url: base_url.to_string(),
            token: "t0k3n".to_string(),
            ..GitHubConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn trims_trailing_slash() {
        assert_eq!(
            client("https://ghe.example.com/api/v3/").base_url(),
            "https://ghe.example.com/api/v3"
        );
    }

    #[test]
    fn empty_base_url_uses_public_api() {
        assert_eq!(client("").base_url(), "https://api.github.com");
    }

    #[test]
    fn resolves_relative_and_absolute_paths() {
        let client = client("https://api.github.com/");
        assert_eq!(
            client.url_for("orgs/acme/copilot/metrics").unwrap().as_str(),
            "https://api.github.com/orgs/acme/copilot/metrics"
        );
        assert_eq!(
            client.url_for("/orgs/acme").unwrap().as_str(),
            "https://api.github.com/orgs/acme"
        );
        assert_eq!(
            client
                .url_for("https://other.example.com/x?page=2")
                .unwrap()
                .as_str(),
            "https://other.example.com/x?page=2"
        );
    }

    #[test]
    fn rejects_unparsable_url() {
        let client = client("not a url");
        assert!(matches!(
            client.url_for("/orgs/acme"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn sends_github_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/copilot/usage"))
            .and(header("authorization", "Bearer t0k3n"))
            .and(header("accept", GITHUB_ACCEPT))
            .and(header("x-github-api-version", "2022-11-28"))
            .and(header("user-agent", USER_AGENT_VALUE))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server.uri())
            .get("/orgs/acme/copilot/usage")
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }
}
