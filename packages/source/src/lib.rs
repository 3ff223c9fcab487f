#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Copilot data sources.
//!
//! Each source implements the [`CopilotSource`] trait to fetch metrics,
//! seat assignments, and usage for one [`Scope`]. [`ApiSource`] talks to
//! the GitHub REST API through the [`pagination`] fetcher;
//! [`FixtureSource`] serves canned payloads for offline runs. Both attach
//! the same scope metadata so everything downstream is identical.

pub mod api;
pub mod fixture;
pub mod github;
pub mod pagination;

use async_trait::async_trait;
use copilot_metrics_models::{MetricsRecord, Scope, SeatAssignment, UsageSummary};

pub use api::ApiSource;
pub use fixture::FixtureSource;
pub use github::GitHubClient;

/// Errors that can occur while fetching from a Copilot data source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP transport failure (connection, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A request URL could not be built.
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl {
        /// The URL that failed to parse.
        url: String,
        /// Parser message.
        message: String,
    },

    /// The server answered with an unexpected status code.
    #[error("Unexpected status code {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A canned payload is missing from the embedded fixtures.
    #[error("Fixture not found: {name}")]
    Fixture {
        /// File name that was looked up.
        name: String,
    },
}

/// A provider of Copilot metrics, seats, and usage for one scope.
#[async_trait]
pub trait CopilotSource: Send + Sync {
    /// Returns a short label for log messages (e.g. `"api"`).
    fn name(&self) -> &str;

    /// Returns the scope this source fetches for.
    fn scope(&self) -> &Scope;

    /// Fetches daily metrics documents for the scope, or for one team
    /// within it.
    ///
    /// Scope fields and `last_update` are set on every returned document.
    /// A team that does not exist yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport, status, or decode failure.
    async fn fetch_metrics(&self, team: Option<&str>) -> Result<Vec<MetricsRecord>, FetchError>;

    /// Fetches a snapshot of all assigned seats, following every page.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport, status, or decode failure.
    async fn fetch_seats(&self) -> Result<SeatAssignment, FetchError>;

    /// Fetches daily usage summaries from the usage endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport, status, or decode failure.
    async fn fetch_usage(&self) -> Result<Vec<UsageSummary>, FetchError>;
}

/// Attaches request metadata to freshly decoded metrics documents.
pub(crate) fn stamp_metrics(
    records: &mut [MetricsRecord],
    organization: Option<&str>,
    enterprise: Option<&str>,
    team: Option<&str>,
) {
    let now = chrono::Utc::now();
    for record in records {
        record.organization = organization.map(str::to_string);
        record.enterprise = enterprise.map(str::to_string);
        record.team = team.map(str::to_string);
        record.last_update = Some(now);
    }
}

/// Attaches the scope to freshly decoded usage summaries and fills in
/// breakdown rows the endpoint leaves undated.
pub(crate) fn stamp_usage(summaries: &mut [UsageSummary], scope: &Scope) {
    for summary in summaries {
        summary.organization = scope.organization().map(str::to_string);
        summary.enterprise = scope.enterprise().map(str::to_string);

        for row in &mut summary.breakdown {
            if row.day.is_empty() {
                row.day.clone_from(&summary.day);
            }
            row.organization.clone_from(&summary.organization);
            row.enterprise.clone_from(&summary.enterprise);
            row.team.clone_from(&summary.team);
        }
    }
}
