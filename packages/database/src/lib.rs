#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Idempotent persistence for Copilot records.
//!
//! Every backend implements [`Repository`]. Saves are upserts keyed by the
//! record's natural-key identifier: saving a record whose identifier already
//! exists replaces it. Batch saves are best-effort; each record is an
//! independent upsert and a failure on one does not stop the rest. See
//! [`BatchOutcome`].
//!
//! Backends:
//!
//! * [`duckdb_store::DuckDbRepository`] - embedded single-file database
//! * [`object_store::ObjectStoreRepository`] - S3-compatible bucket, one JSON
//!   object per record

pub mod duckdb_store;
pub mod object_store;
pub mod paths;

use std::sync::Arc;

use async_trait::async_trait;
use copilot_metrics_database_models::{StorageConfig, StorageKind};
use copilot_metrics_models::{MetricsRecord, SeatAssignment, UsageSummary};

pub use duckdb_store::DuckDbRepository;
pub use object_store::ObjectStoreRepository;

/// Errors that can occur during persistence.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// A record could not be serialized to JSON.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// I/O error (creating the data directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An object store request failed.
    #[error("Object store {op} failed for {key}: {source}")]
    ObjectStore {
        /// Operation name (`PutObject`, `HeadBucket`, ...).
        op: &'static str,
        /// Object key or bucket name.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A record reached the store without an identifier.
    #[error("{kind} record has no identifier")]
    MissingId {
        /// Collection the record was headed for.
        kind: &'static str,
    },

    /// The repository was used after [`Repository::close`].
    #[error("Repository is closed")]
    Closed,

    /// Invalid backend configuration.
    #[error("Storage configuration error: {message}")]
    Config {
        /// Description of what is wrong.
        message: String,
    },
}

/// Result of a best-effort batch save.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Records written.
    pub saved: usize,
    /// Records that failed.
    pub failed: usize,
    /// The first per-record error, kept for the caller to report.
    pub first_error: Option<RepositoryError>,
}

impl BatchOutcome {
    /// Records the result of one upsert.
    pub fn record(&mut self, id: &str, result: Result<(), RepositoryError>) {
        match result {
            Ok(()) => self.saved += 1,
            Err(e) => {
                log::warn!("Failed to save record {id:?}: {e}");
                self.failed += 1;
                if self.first_error.is_none() {
                    self.first_error = Some(e);
                }
            }
        }
    }

    /// Adds another outcome's counts to this one, keeping the earlier
    /// first error.
    pub fn merge(&mut self, other: Self) {
        self.saved += other.saved;
        self.failed += other.failed;
        if self.first_error.is_none() {
            self.first_error = other.first_error;
        }
    }

    /// Returns `true` if every record was saved.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Uniform persistence contract implemented by every storage backend.
///
/// Implementations must be safe to share across tasks; concurrent upserts
/// of different identifiers must not interfere, and concurrent upserts of
/// the same identifier resolve last-write-wins.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Returns a short backend label for log messages.
    fn name(&self) -> &str;

    /// Creates tables, buckets, or containers as needed. Safe to call on
    /// every startup.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the store cannot be reached or set up.
    async fn initialize(&self) -> Result<(), RepositoryError>;

    /// Upserts each metrics document by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] only if the store as a whole is unusable
    /// (e.g. closed); per-record failures are reported in the outcome.
    async fn save_metrics(
        &self,
        records: &[MetricsRecord],
    ) -> Result<BatchOutcome, RepositoryError>;

    /// Upserts a seat snapshot by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] only if the store as a whole is unusable.
    async fn save_seats(&self, snapshot: &SeatAssignment) -> Result<BatchOutcome, RepositoryError>;

    /// Upserts each usage summary by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] only if the store as a whole is unusable.
    async fn save_usage(&self, summaries: &[UsageSummary]) -> Result<BatchOutcome, RepositoryError>;

    /// Releases held connections. Later calls fail with
    /// [`RepositoryError::Closed`] where the backend holds a connection.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if releasing fails.
    async fn close(&self) -> Result<(), RepositoryError>;
}

/// Builds the configured backend, or `None` when storage is disabled.
///
/// # Errors
///
/// Returns [`RepositoryError`] if the backend cannot be constructed (bad
/// path, missing bucket name).
pub async fn from_config(
    config: &StorageConfig,
) -> Result<Option<Arc<dyn Repository>>, RepositoryError> {
    match config.kind {
        StorageKind::None => {
            log::info!("No storage configured; records will not be persisted");
            Ok(None)
        }
        StorageKind::DuckDb => {
            let path = config
                .duckdb_path
                .clone()
                .unwrap_or_else(paths::default_duckdb_path);
            log::info!("Using DuckDB storage at {}", path.display());
            Ok(Some(Arc::new(DuckDbRepository::open(&path)?)))
        }
        StorageKind::ObjectStore => {
            let repository = ObjectStoreRepository::from_config(&config.object_store).await?;
            log::info!(
                "Using object store storage at s3://{}/{}",
                config.object_store.bucket,
                config.object_store.prefix
            );
            Ok(Some(Arc::new(repository)))
        }
    }
}
