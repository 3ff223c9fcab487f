#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion of GitHub Copilot metrics, seats, and usage into storage.
//!
//! An [`Ingestor`] pairs one [`CopilotSource`] with an optional
//! [`Repository`] and exposes one run per entity type. Runs are
//! independent: a failure in one never affects another. The
//! [`scheduler`] repeats them on fixed intervals.

pub mod config;
pub mod scheduler;

use std::sync::Arc;
use std::time::Instant;

use copilot_metrics_database::{BatchOutcome, Repository, RepositoryError};
use copilot_metrics_database_models::StorageConfig;
use copilot_metrics_ingest_models::{IngestConfig, RunKind, RunReport};
use copilot_metrics_models::Identified;
use copilot_metrics_source::{ApiSource, CopilotSource, FetchError, FixtureSource, GitHubClient};

/// Errors that can occur during an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Fetching from the source failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The store as a whole failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML.
    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration is unusable.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is wrong.
        message: String,
    },
}

/// Runs the metrics, seats, and usage ingestions for one scope.
pub struct Ingestor {
    source: Arc<dyn CopilotSource>,
    repository: Option<Arc<dyn Repository>>,
    teams: Vec<String>,
    enable_seats: bool,
}

impl Ingestor {
    /// Creates an ingestor. Empty team names are dropped.
    #[must_use]
    pub fn new(
        source: Arc<dyn CopilotSource>,
        repository: Option<Arc<dyn Repository>>,
        teams: Vec<String>,
        enable_seats: bool,
    ) -> Self {
        Self {
            source,
            repository,
            teams: teams.into_iter().filter(|t| !t.is_empty()).collect(),
            enable_seats,
        }
    }

    /// Builds the configured source (fixtures or the live API) and wraps it
    /// with `repository`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the scope has no name or the HTTP client
    /// cannot be built.
    pub fn from_config(
        config: &IngestConfig,
        repository: Option<Arc<dyn Repository>>,
    ) -> Result<Self, IngestError> {
        let scope = config::scope(config)?;

        let source: Arc<dyn CopilotSource> = if config.use_test_data {
            log::info!("Running in test mode with fixture data for {scope}");
            Arc::new(FixtureSource::new(scope))
        } else {
            let client = GitHubClient::new(&config.github)?;
            Arc::new(ApiSource::new(client, scope))
        };

        Ok(Self::new(
            source,
            repository,
            config.teams.clone(),
            config.enable_seats,
        ))
    }

    /// Like [`Self::from_config`], but closes `repository` when the
    /// ingestor cannot be built.
    ///
    /// # Errors
    ///
    /// See [`Self::from_config`].
    pub async fn connect(
        config: &IngestConfig,
        repository: Option<Arc<dyn Repository>>,
    ) -> Result<Self, IngestError> {
        match Self::from_config(config, repository.clone()) {
            Ok(ingestor) => Ok(ingestor),
            Err(e) => {
                close_repository(repository.as_ref()).await;
                Err(e)
            }
        }
    }

    /// Closes the wrapped store, if any. Failures are logged.
    pub async fn close(&self) {
        close_repository(self.repository.as_ref()).await;
    }

    /// Runs the ingestion for `kind`.
    ///
    /// # Errors
    ///
    /// See [`Self::run_metrics`], [`Self::run_seats`], [`Self::run_usage`].
    pub async fn run(&self, kind: RunKind) -> Result<RunReport, IngestError> {
        match kind {
            RunKind::Metrics => self.run_metrics().await,
            RunKind::Seats => self.run_seats().await,
            RunKind::Usage => self.run_usage().await,
        }
    }

    /// Fetches metrics for the scope and each configured team, persists
    /// them, then aggregates them into usage summaries and persists those.
    ///
    /// A team whose fetch fails is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the top-level fetch fails or the store as
    /// a whole fails.
    pub async fn run_metrics(&self) -> Result<RunReport, IngestError> {
        let start = Instant::now();
        let mut report = RunReport::new(RunKind::Metrics);
        log::info!(
            "Starting metrics ingestion for {} ({} teams)",
            self.source.scope(),
            self.teams.len()
        );

        let mut documents = self.source.fetch_metrics(None).await?;

        for team in &self.teams {
            match self.source.fetch_metrics(Some(team.as_str())).await {
                Ok(team_documents) => {
                    log::info!("Team {team}: {} metrics documents", team_documents.len());
                    documents.extend(team_documents);
                }
                Err(e) => {
                    log::warn!("Skipping team {team}: {e}");
                    report.skipped_teams.push(team.clone());
                }
            }
        }

        for document in &mut documents {
            document.assign_id();
        }
        report.fetched = documents.len();

        let summaries = copilot_metrics_aggregate::aggregate(&documents);
        log::info!(
            "Aggregated {} metrics documents into {} usage summaries",
            documents.len(),
            summaries.len()
        );

        if let Some(repository) = &self.repository {
            let mut outcome = repository.save_metrics(&documents).await?;
            outcome.merge(repository.save_usage(&summaries).await?);
            apply_outcome(&mut report, outcome);
        } else {
            log::info!("No store configured, skipping save");
        }

        Ok(finish(report, start))
    }

    /// Fetches and persists a snapshot of seat assignments. A logged no-op
    /// when seats ingestion is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the fetch fails or the store as a whole
    /// fails.
    pub async fn run_seats(&self) -> Result<RunReport, IngestError> {
        let start = Instant::now();
        let mut report = RunReport::new(RunKind::Seats);

        if !self.enable_seats {
            log::info!("Seats ingestion is disabled, skipping");
            report.persisted = self.repository.is_some();
            return Ok(finish(report, start));
        }

        log::info!("Starting seats ingestion for {}", self.source.scope());

        let mut snapshot = self.source.fetch_seats().await?;
        snapshot.assign_id();
        report.fetched = 1;
        log::info!(
            "Fetched {} seats for {}",
            snapshot.total_seats,
            snapshot.id
        );

        if let Some(repository) = &self.repository {
            let outcome = repository.save_seats(&snapshot).await?;
            apply_outcome(&mut report, outcome);
        } else {
            log::info!("No store configured, skipping save");
        }

        Ok(finish(report, start))
    }

    /// Fetches and persists usage summaries from the usage endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the fetch fails or the store as a whole
    /// fails.
    pub async fn run_usage(&self) -> Result<RunReport, IngestError> {
        let start = Instant::now();
        let mut report = RunReport::new(RunKind::Usage);
        log::info!("Starting usage ingestion for {}", self.source.scope());

        let mut summaries = self.source.fetch_usage().await?;
        for summary in &mut summaries {
            summary.assign_id();
        }
        report.fetched = summaries.len();

        if let Some(repository) = &self.repository {
            let outcome = repository.save_usage(&summaries).await?;
            apply_outcome(&mut report, outcome);
        } else {
            log::info!("No store configured, skipping save");
        }

        Ok(finish(report, start))
    }
}

/// Builds and initializes the configured store. Any failure is logged and
/// `None` is returned so ingestion continues without persistence. A store
/// that fails to initialize is closed before returning.
pub async fn open_repository(storage: &StorageConfig) -> Option<Arc<dyn Repository>> {
    let repository = match copilot_metrics_database::from_config(storage).await {
        Ok(repository) => repository?,
        Err(e) => {
            log::error!("Failed to create {} storage: {e}", storage.kind);
            log::warn!("Data will be collected but not persisted");
            return None;
        }
    };

    if let Err(e) = repository.initialize().await {
        log::error!(
            "Failed to initialize {} storage, data will not be persisted: {e}",
            repository.name()
        );
        close_repository(Some(&repository)).await;
        return None;
    }

    Some(repository)
}

/// Initializes `repository` and closes it whether or not that succeeded.
///
/// # Errors
///
/// Returns the initialization error, or the close error if initialization
/// succeeded.
pub async fn initialize_storage(repository: &dyn Repository) -> Result<(), RepositoryError> {
    let initialized = repository.initialize().await;
    let closed = repository.close().await;
    initialized?;
    closed
}

/// Closes `repository` if present. Failures are logged.
pub async fn close_repository(repository: Option<&Arc<dyn Repository>>) {
    if let Some(repository) = repository
        && let Err(e) = repository.close().await
    {
        log::warn!("Failed to close {} storage: {e}", repository.name());
    }
}

fn apply_outcome(report: &mut RunReport, outcome: BatchOutcome) {
    report.persisted = true;
    report.saved = outcome.saved;
    report.failed = outcome.failed;
    if let Some(e) = outcome.first_error {
        log::error!(
            "{}: {} records failed to save, first error: {e}",
            report.kind,
            outcome.failed
        );
    }
}

fn finish(mut report: RunReport, start: Instant) -> RunReport {
    report.elapsed = start.elapsed();
    log::info!("Ingestion complete: {report}");
    report
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use copilot_metrics_database::DuckDbRepository;
    use copilot_metrics_models::{MetricsRecord, Scope, SeatAssignment, UsageSummary};
    use copilot_metrics_source_models::GitHubConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn metrics_day(date: &str, engaged: u64) -> serde_json::Value {
        json!({
            "date": date,
            "total_active_users": engaged,
            "total_engaged_users": engaged,
        })
    }

    async fn duckdb() -> Arc<DuckDbRepository> {
        let repository = DuckDbRepository::in_memory().unwrap();
        repository.initialize().await.unwrap();
        Arc::new(repository)
    }

    fn shared(repository: &Arc<DuckDbRepository>) -> Option<Arc<dyn Repository>> {
        let repository: Arc<dyn Repository> = repository.clone();
        Some(repository)
    }

    fn api_ingestor(
        server: &MockServer,
        repository: Option<Arc<dyn Repository>>,
        teams: &[&str],
    ) -> Ingestor {
        let client = GitHubClient::new(&GitHubConfig {
            base_url: server.uri(),
            token: "test-token".to_string(),
            ..GitHubConfig::default()
        })
        .unwrap();
        let source = ApiSource::new(client, Scope::Organization("acme".to_string()));
        Ingestor::new(
            Arc::new(source),
            repository,
            teams.iter().map(|t| (*t).to_string()).collect(),
            true,
        )
    }

    #[tokio::test]
    async fn metrics_run_persists_documents_and_derived_usage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/copilot/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                metrics_day("2024-01-01", 10),
                metrics_day("2024-01-02", 12),
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/team/platform/copilot/metrics"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([metrics_day("2024-01-01", 4)])),
            )
            .mount(&server)
            .await;

        let repository = duckdb().await;
        let ingestor = api_ingestor(&server, shared(&repository), &["platform"]);

        let report = ingestor.run_metrics().await.unwrap();

        assert_eq!(report.fetched, 3);
        assert_eq!(report.saved, 5);
        assert_eq!(report.failed, 0);
        assert!(report.persisted);
        assert!(report.skipped_teams.is_empty());

        assert_eq!(repository.count::<MetricsRecord>().await.unwrap(), 3);
        let team_doc: MetricsRecord = repository
            .get("2024-01-01-ORG-acme-platform")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(team_doc.team.as_deref(), Some("platform"));

        assert_eq!(repository.count::<UsageSummary>().await.unwrap(), 2);
        let usage: UsageSummary = repository
            .get("2024-01-01-ORG-acme")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(usage.total_active_users, 10);
    }

    #[tokio::test]
    async fn missing_team_is_skipped_and_run_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/copilot/metrics"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([metrics_day("2024-01-01", 10)])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/team/ghost/copilot/metrics"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/team/broken/copilot/metrics"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let repository = duckdb().await;
        let ingestor = api_ingestor(&server, shared(&repository), &["ghost", "broken"]);

        let report = ingestor.run_metrics().await.unwrap();

        assert_eq!(report.fetched, 1);
        assert_eq!(report.skipped_teams, vec!["broken"]);
        assert_eq!(repository.count::<MetricsRecord>().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn top_level_failure_fails_the_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/copilot/metrics"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let repository = duckdb().await;
        let ingestor = api_ingestor(&server, shared(&repository), &[]);

        let result = ingestor.run_metrics().await;

        assert!(matches!(
            result,
            Err(IngestError::Fetch(FetchError::Status { status: 403, .. }))
        ));
        assert_eq!(repository.count::<MetricsRecord>().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn runs_without_a_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/copilot/usage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "day": "2024-01-01",
                "total_suggestions_count": 5,
                "breakdown": [],
            }])))
            .mount(&server)
            .await;

        let ingestor = api_ingestor(&server, None, &[]);
        let report = ingestor.run_usage().await.unwrap();

        assert_eq!(report.fetched, 1);
        assert_eq!(report.saved, 0);
        assert!(!report.persisted);
    }

    #[tokio::test]
    async fn seats_run_follows_pages() {
        let server = MockServer::start().await;
        let seat = |login: &str| {
            json!({
                "created_at": "2024-01-01T00:00:00Z",
                "assignee": { "id": 1, "login": login },
            })
        };
        Mock::given(method("GET"))
            .and(path("/orgs/acme/copilot/billing/seats"))
            .and(wiremock::matchers::query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "total_seats": 2, "seats": [seat("b")] })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/copilot/billing/seats"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "Link",
                        "</orgs/acme/copilot/billing/seats?page=2>; rel=\"next\"",
                    )
                    .set_body_json(json!({ "total_seats": 2, "seats": [seat("a")] })),
            )
            .mount(&server)
            .await;

        let repository = duckdb().await;
        let ingestor = api_ingestor(&server, shared(&repository), &[]);
        let report = ingestor.run_seats().await.unwrap();

        assert_eq!(report.fetched, 1);
        assert_eq!(report.saved, 1);
        assert_eq!(repository.count::<SeatAssignment>().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn disabled_seats_is_a_no_op() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let mut ingestor = api_ingestor(&server, None, &[]);
        ingestor.enable_seats = false;

        let report = ingestor.run_seats().await.unwrap();
        assert_eq!(report.fetched, 0);
    }

    #[tokio::test]
    async fn fixture_mode_runs_every_ingestion() {
        let config = IngestConfig {
            use_test_data: true,
            teams: vec!["platform".to_string()],
            ..IngestConfig::default()
        };
        let repository = duckdb().await;
        let ingestor = Ingestor::from_config(&config, shared(&repository)).unwrap();

        let metrics = ingestor.run(RunKind::Metrics).await.unwrap();
        let seats = ingestor.run(RunKind::Seats).await.unwrap();
        let usage = ingestor.run(RunKind::Usage).await.unwrap();

        assert!(metrics.fetched > 0);
        assert_eq!(metrics.failed, 0);
        assert_eq!(seats.saved, 1);
        assert!(usage.fetched > 0);
        assert_eq!(usage.failed, 0);

        assert_eq!(
            repository.count::<MetricsRecord>().await.unwrap(),
            u64::try_from(metrics.fetched).unwrap()
        );
        assert_eq!(repository.count::<SeatAssignment>().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn closed_store_fails_the_run() {
        let config = IngestConfig {
            use_test_data: true,
            ..IngestConfig::default()
        };
        let repository = duckdb().await;
        repository.close().await.unwrap();
        let ingestor = Ingestor::from_config(&config, shared(&repository)).unwrap();

        let result = ingestor.run_usage().await;
        assert!(matches!(
            result,
            Err(IngestError::Repository(RepositoryError::Closed))
        ));
    }

    /// Counts `close` calls. Initialization fails on request.
    struct RecordingRepository {
        fail_initialize: bool,
        closes: AtomicUsize,
    }

    impl RecordingRepository {
        fn new(fail_initialize: bool) -> Arc<Self> {
            Arc::new(Self {
                fail_initialize,
                closes: AtomicUsize::new(0),
            })
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Repository for RecordingRepository {
        fn name(&self) -> &str {
            "recording"
        }

        async fn initialize(&self) -> Result<(), RepositoryError> {
            if self.fail_initialize {
                return Err(RepositoryError::Closed);
            }
            Ok(())
        }

        async fn save_metrics(
            &self,
            records: &[MetricsRecord],
        ) -> Result<BatchOutcome, RepositoryError> {
            Ok(BatchOutcome {
                saved: records.len(),
                ..BatchOutcome::default()
            })
        }

        async fn save_seats(
            &self,
            _snapshot: &SeatAssignment,
        ) -> Result<BatchOutcome, RepositoryError> {
            Ok(BatchOutcome {
                saved: 1,
                ..BatchOutcome::default()
            })
        }

        async fn save_usage(
            &self,
            summaries: &[UsageSummary],
        ) -> Result<BatchOutcome, RepositoryError> {
            Ok(BatchOutcome {
                saved: summaries.len(),
                ..BatchOutcome::default()
            })
        }

        async fn close(&self) -> Result<(), RepositoryError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_connect_closes_the_store() {
        let repository = RecordingRepository::new(false);
        let store: Arc<dyn Repository> = repository.clone();

        let result = Ingestor::connect(&IngestConfig::default(), Some(store)).await;

        assert!(matches!(result, Err(IngestError::Config { .. })));
        assert_eq!(repository.closes(), 1);
    }

    #[tokio::test]
    async fn connected_ingestor_closes_once() {
        let config = IngestConfig {
            use_test_data: true,
            ..IngestConfig::default()
        };
        let repository = RecordingRepository::new(false);
        let store: Arc<dyn Repository> = repository.clone();

        let ingestor = Ingestor::connect(&config, Some(store)).await.unwrap();
        assert_eq!(repository.closes(), 0);

        ingestor.close().await;
        assert_eq!(repository.closes(), 1);
    }

    #[tokio::test]
    async fn failed_initialization_still_closes() {
        let repository = RecordingRepository::new(true);

        let result = initialize_storage(repository.as_ref()).await;

        assert!(matches!(result, Err(RepositoryError::Closed)));
        assert_eq!(repository.closes(), 1);
    }

    #[tokio::test]
    async fn successful_initialization_closes() {
        let repository = RecordingRepository::new(false);

        initialize_storage(repository.as_ref()).await.unwrap();

        assert_eq!(repository.closes(), 1);
    }
}
