//! Embedded `DuckDB` backend.
//!
//! One table per collection, each row holding the full record as JSON:
//!
//! ```sql
//! CREATE TABLE metrics_history (
//!     id TEXT PRIMARY KEY,
//!     date TEXT NOT NULL,
//!     data TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use std::path::Path;

use async_trait::async_trait;
use copilot_metrics_models::{Identified, MetricsRecord, SeatAssignment, UsageSummary};
use duckdb::{Connection, OptionalExt as _, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::{BatchOutcome, Repository, RepositoryError};

const COLLECTIONS: &[&str] = &[
    MetricsRecord::COLLECTION,
    SeatAssignment::COLLECTION,
    UsageSummary::COLLECTION,
];

/// `DuckDB`-backed [`Repository`].
pub struct DuckDbRepository {
    conn: Mutex<Option<Connection>>,
}

impl DuckDbRepository {
    /// Opens (or creates) the database file at `path`, creating parent
    /// directories as needed. The schema is created by
    /// [`Repository::initialize`].
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the directory or connection cannot be
    /// created.
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }

        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the connection cannot be created.
    pub fn in_memory() -> Result<Self, RepositoryError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    /// Loads a stored record by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on query or decode failure.
    pub async fn get<T: Identified + DeserializeOwned>(
        &self,
        id: &str,
    ) -> Result<Option<T>, RepositoryError> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(RepositoryError::Closed)?;

        let data: Option<String> = conn
            .query_row(
                &format!("SELECT data FROM {} WHERE id = ?", T::COLLECTION),
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(data.map(|data| serde_json::from_str(&data)).transpose()?)
    }

    /// Returns the number of rows stored for `T`'s collection.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on query failure.
    pub async fn count<T: Identified>(&self) -> Result<u64, RepositoryError> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(RepositoryError::Closed)?;

        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", T::COLLECTION),
            [],
            |row| row.get(0),
        )?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn save_all<T: Identified + Serialize + Sync>(
        &self,
        records: &[T],
    ) -> Result<BatchOutcome, RepositoryError> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(RepositoryError::Closed)?;

        let mut outcome = BatchOutcome::default();
        for record in records {
            outcome.record(record.id(), upsert(conn, record));
        }

        log::debug!(
            "Saved {}/{} records to {}",
            outcome.saved,
            records.len(),
            T::COLLECTION
        );

        Ok(outcome)
    }
}

fn create_schema(conn: &Connection) -> Result<(), RepositoryError> {
    for collection in COLLECTIONS {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {collection} (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT current_timestamp,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT current_timestamp
            );"
        ))?;
    }
    Ok(())
}

/// Inserts or fully replaces one record. A single statement, so atomic per
/// record.
fn upsert<T: Identified + Serialize>(conn: &Connection, record: &T) -> Result<(), RepositoryError> {
    if record.id().is_empty() {
        return Err(RepositoryError::MissingId {
            kind: T::COLLECTION,
        });
    }

    let data = serde_json::to_string(record)?;

    conn.execute(
        &format!(
            "INSERT INTO {} (id, date, data, created_at, updated_at)
             VALUES (?, ?, ?, current_timestamp, current_timestamp)
             ON CONFLICT (id) DO UPDATE SET
                date = EXCLUDED.date,
                data = EXCLUDED.data,
                updated_at = EXCLUDED.updated_at",
            T::COLLECTION
        ),
        params![record.id(), record.date(), data],
    )?;

    Ok(())
}

#[async_trait]
impl Repository for DuckDbRepository {
    fn name(&self) -> &str {
        "duckdb"
    }

    async fn initialize(&self) -> Result<(), RepositoryError> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(RepositoryError::Closed)?;
        create_schema(conn)?;
        log::info!("DuckDB schema ready");
        Ok(())
    }

    async fn save_metrics(
        &self,
        records: &[MetricsRecord],
    ) -> Result<BatchOutcome, RepositoryError> {
        self.save_all(records).await
    }

    async fn save_seats(&self, snapshot: &SeatAssignment) -> Result<BatchOutcome, RepositoryError> {
        self.save_all(std::slice::from_ref(snapshot)).await
    }

    async fn save_usage(
        &self,
        summaries: &[UsageSummary],
    ) -> Result<BatchOutcome, RepositoryError> {
        self.save_all(summaries).await
    }

    async fn close(&self) -> Result<(), RepositoryError> {
        if self.conn.lock().await.take().is_some() {
            log::debug!("DuckDB connection closed");
        }
        Ok(())
    }
}
