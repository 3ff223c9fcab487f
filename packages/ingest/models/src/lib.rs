#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion configuration, schedule, and run report types.

use std::time::Duration;

use copilot_metrics_database_models::StorageConfig;
use copilot_metrics_models::ScopeKind;
use copilot_metrics_source_models::GitHubConfig;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default interval between runs of each ingestion, in seconds.
pub const DEFAULT_INTERVAL_SECONDS: u64 = 3600;

/// Complete, immutable ingestion configuration.
///
/// Built once at startup and passed to everything that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// GitHub API connection.
    pub github: GitHubConfig,
    /// Whether to fetch for an organization or an enterprise.
    pub scope: ScopeKind,
    /// Enterprise slug, used when `scope` is enterprise.
    pub enterprise: Option<String>,
    /// Organization login, used when `scope` is organization.
    pub organization: Option<String>,
    /// Team slugs to fetch metrics for in addition to the top-level scope.
    pub teams: Vec<String>,
    /// Serve canned payloads instead of calling the API.
    pub use_test_data: bool,
    /// Whether the seats run does anything.
    pub enable_seats: bool,
    /// Where to persist records.
    pub storage: StorageConfig,
    /// How often each run repeats.
    pub schedule: Schedule,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            github: GitHubConfig::default(),
            scope: ScopeKind::default(),
            enterprise: None,
            organization: None,
            teams: Vec::new(),
            use_test_data: false,
            enable_seats: true,
            storage: StorageConfig::default(),
            schedule: Schedule::default(),
        }
    }
}

impl IngestConfig {
    /// Returns the configured name for the selected scope kind, if set and
    /// non-empty.
    #[must_use]
    pub fn scope_name(&self) -> Option<&str> {
        match self.scope {
            ScopeKind::Organization => self.organization.as_deref(),
            ScopeKind::Enterprise => self.enterprise.as_deref(),
        }
        .filter(|name| !name.is_empty())
    }

    /// Returns a copy with secrets replaced, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            github: self.github.redacted(),
            storage: self.storage.redacted(),
            ..self.clone()
        }
    }
}

/// Per-run cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    /// Seconds between metrics runs.
    pub metrics_seconds: u64,
    /// Seconds between seats runs.
    pub seats_seconds: u64,
    /// Seconds between usage runs.
    pub usage_seconds: u64,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            metrics_seconds: DEFAULT_INTERVAL_SECONDS,
            seats_seconds: DEFAULT_INTERVAL_SECONDS,
            usage_seconds: DEFAULT_INTERVAL_SECONDS,
        }
    }
}

impl Schedule {
    /// Returns the interval for `kind`. Zero is treated as the default.
    #[must_use]
    pub const fn interval(&self, kind: RunKind) -> Duration {
        let seconds = match kind {
            RunKind::Metrics => self.metrics_seconds,
            RunKind::Seats => self.seats_seconds,
            RunKind::Usage => self.usage_seconds,
        };
        Duration::from_secs(if seconds == 0 {
            DEFAULT_INTERVAL_SECONDS
        } else {
            seconds
        })
    }
}

/// Which ingestion a run performed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunKind {
    /// Daily metrics (and the usage derived from them).
    Metrics,
    /// Seat assignment snapshot.
    Seats,
    /// Usage endpoint.
    Usage,
}

/// Result of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Which ingestion ran.
    pub kind: RunKind,
    /// Records fetched (documents, snapshots, or summaries).
    pub fetched: usize,
    /// Records written to storage. For metrics runs this includes the
    /// derived usage summaries.
    pub saved: usize,
    /// Records the store rejected.
    pub failed: usize,
    /// Teams whose fetch failed and were skipped.
    pub skipped_teams: Vec<String>,
    /// Whether a store was configured for this run.
    pub persisted: bool,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

impl RunReport {
    /// Creates an empty report for `kind`.
    #[must_use]
    pub const fn new(kind: RunKind) -> Self {
        Self {
            kind,
            fetched: 0,
            saved: 0,
            failed: 0,
            skipped_teams: Vec::new(),
            persisted: false,
            elapsed: Duration::ZERO,
        }
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} fetched, {} saved, {} failed",
            self.kind, self.fetched, self.saved, self.failed
        )?;
        if !self.skipped_teams.is_empty() {
            write!(f, ", skipped teams [{}]", self.skipped_teams.join(", "))?;
        }
        if !self.persisted {
            write!(f, " (not persisted)")?;
        }
        write!(f, " in {:.1}s", self.elapsed.as_secs_f64())
    }
}
