//! Live GitHub Copilot API source.

use async_trait::async_trait;
use copilot_metrics_models::{MetricsRecord, Scope, SeatAssignment, SeatsPage, UsageSummary};

use crate::github::GitHubClient;
use crate::pagination::{self, NotFound};
use crate::{CopilotSource, FetchError, stamp_metrics, stamp_usage};

/// Returns the API path prefix for a scope (`/orgs/{org}` or
/// `/enterprises/{ent}`).
#[must_use]
pub fn scope_path(scope: &Scope) -> String {
    match scope {
        Scope::Organization(name) => format!("/orgs/{name}"),
        Scope::Enterprise(name) => format!("/enterprises/{name}"),
    }
}

/// Returns the metrics path for a scope, optionally narrowed to a team.
#[must_use]
pub fn metrics_path(scope: &Scope, team: Option<&str>) -> String {
    match team {
        Some(team) => format!("{}/team/{team}/copilot/metrics", scope_path(scope)),
        None => format!("{}/copilot/metrics", scope_path(scope)),
    }
}

/// Returns the seat listing path for a scope.
#[must_use]
pub fn seats_path(scope: &Scope) -> String {
    format!("{}/copilot/billing/seats", scope_path(scope))
}

/// Returns the usage path for a scope.
#[must_use]
pub fn usage_path(scope: &Scope) -> String {
    format!("{}/copilot/usage", scope_path(scope))
}

/// Fetches from the GitHub REST API.
#[derive(Debug, Clone)]
pub struct ApiSource {
    client: GitHubClient,
    scope: Scope,
}

impl ApiSource {
    /// Creates a source for `scope` using `client`.
    #[must_use]
    pub const fn new(client: GitHubClient, scope: Scope) -> Self {
        Self { client, scope }
    }
}

#[async_trait]
impl CopilotSource for ApiSource {
    fn name(&self) -> &str {
        "api"
    }

    fn scope(&self) -> &Scope {
        &self.scope
    }

    async fn fetch_metrics(&self, team: Option<&str>) -> Result<Vec<MetricsRecord>, FetchError> {
        let team = team.filter(|t| !t.is_empty());
        log::info!(
            "Fetching Copilot metrics for {}{}",
            self.scope,
            team.map_or_else(String::new, |t| format!(" team {t}"))
        );

        let not_found = if team.is_some() {
            NotFound::Empty
        } else {
            NotFound::Error
        };
        let mut records = pagination::fetch_all::<Vec<MetricsRecord>>(
            &self.client,
            &metrics_path(&self.scope, team),
            not_found,
        )
        .await?;

        stamp_metrics(
            &mut records,
            self.scope.organization(),
            self.scope.enterprise(),
            team,
        );

        Ok(records)
    }

    async fn fetch_seats(&self) -> Result<SeatAssignment, FetchError> {
        log::info!("Fetching Copilot seats for {}", self.scope);

        let seats = pagination::fetch_all::<SeatsPage>(
            &self.client,
            &seats_path(&self.scope),
            NotFound::Error,
        )
        .await?;

        let mut snapshot = SeatAssignment::snapshot(seats, chrono::Utc::now());
        snapshot.organization = self.scope.organization().map(str::to_string);
        snapshot.enterprise = self.scope.enterprise().map(str::to_string);

        Ok(snapshot)
    }

    async fn fetch_usage(&self) -> Result<Vec<UsageSummary>, FetchError> {
        log::info!("Fetching Copilot usage for {}", self.scope);

        let mut summaries = pagination::fetch_all::<Vec<UsageSummary>>(
            &self.client,
            &usage_path(&self.scope),
            NotFound::Error,
        )
        .await?;

        stamp_usage(&mut summaries, &self.scope);

        Ok(summaries)
    }
}
