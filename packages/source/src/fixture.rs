//! Offline source backed by canned payloads embedded at build time.

use async_trait::async_trait;
use copilot_metrics_models::{
    MetricsRecord, Scope, ScopeKind, SeatAssignment, SeatsPage, UsageSummary,
};
use include_dir::{Dir, include_dir};
use serde::de::DeserializeOwned;

use crate::{CopilotSource, FetchError, stamp_metrics, stamp_usage};

static FIXTURES_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/fixtures");

/// Organization attached to fixture metrics.
pub const FIXTURE_METRICS_ORGANIZATION: &str = "test";

/// Organization attached to fixture seats in organization mode.
pub const FIXTURE_SEATS_ORGANIZATION: &str = "test-organization";

/// Enterprise attached to fixture seats in enterprise mode.
pub const FIXTURE_SEATS_ENTERPRISE: &str = "test-enterprise";

/// Serves `metrics.json`, `seats.json`, and `usage.json` from the
/// embedded fixtures directory instead of calling the API.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    scope: Scope,
}

impl FixtureSource {
    /// Creates a fixture source standing in for `scope`.
    #[must_use]
    pub const fn new(scope: Scope) -> Self {
        Self { scope }
    }

    fn load<T: DeserializeOwned>(name: &str) -> Result<T, FetchError> {
        let file = FIXTURES_DIR.get_file(name).ok_or_else(|| FetchError::Fixture {
            name: name.to_string(),
        })?;
        Ok(serde_json::from_slice(file.contents())?)
    }
}

#[async_trait]
impl CopilotSource for FixtureSource {
    fn name(&self) -> &str {
        "fixture"
    }

    fn scope(&self) -> &Scope {
        &self.scope
    }

    async fn fetch_metrics(&self, team: Option<&str>) -> Result<Vec<MetricsRecord>, FetchError> {
        let team = team.filter(|t| !t.is_empty());
        log::info!("Loading fixture metrics (team: {})", team.unwrap_or("-"));

        let mut records: Vec<MetricsRecord> = Self::load("metrics.json")?;
        stamp_metrics(&mut records, Some(FIXTURE_METRICS_ORGANIZATION), None, team);
        Ok(records)
    }

    async fn fetch_seats(&self) -> Result<SeatAssignment, FetchError> {
        log::info!("Loading fixture seats");

        let page: SeatsPage = Self::load("seats.json")?;
        let mut snapshot = SeatAssignment::snapshot(page.seats, chrono::Utc::now());
        match self.scope.kind() {
            ScopeKind::Enterprise => {
                snapshot.enterprise = Some(FIXTURE_SEATS_ENTERPRISE.to_string());
            }
            ScopeKind::Organization => {
                snapshot.organization = Some(FIXTURE_SEATS_ORGANIZATION.to_string());
            }
        }
        Ok(snapshot)
    }

    async fn fetch_usage(&self) -> Result<Vec<UsageSummary>, FetchError> {
        log::info!("Loading fixture usage");

        let mut summaries: Vec<UsageSummary> = Self::load("usage.json")?;
        stamp_usage(&mut summaries, &self.scope);
        Ok(summaries)
    }
}
