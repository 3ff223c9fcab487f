#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Storage backend selection and connection settings.
//!
//! These values are plain data; the backends themselves live in
//! `copilot_metrics_database`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default key prefix for the object store backend.
pub const DEFAULT_OBJECT_STORE_PREFIX: &str = "copilot-metrics";

/// Default region for the object store backend.
pub const DEFAULT_OBJECT_STORE_REGION: &str = "auto";

/// Which storage backend to persist to.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum StorageKind {
    /// Collect but do not persist.
    #[default]
    #[serde(rename = "none")]
    #[strum(to_string = "none")]
    None,
    /// Embedded single-file database.
    #[serde(rename = "duckdb", alias = "sqlite")]
    #[strum(to_string = "duckdb", serialize = "sqlite")]
    DuckDb,
    /// S3-compatible object store, one JSON document per record.
    #[serde(rename = "object_store", alias = "s3", alias = "cosmos")]
    #[strum(to_string = "object_store", serialize = "s3", serialize = "cosmos")]
    ObjectStore,
}

/// Storage settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Selected backend.
    pub kind: StorageKind,
    /// Embedded database file. `None` uses the default under the home
    /// directory.
    pub duckdb_path: Option<PathBuf>,
    /// Object store settings, used when `kind` is
    /// [`StorageKind::ObjectStore`].
    pub object_store: ObjectStoreConfig,
}

impl StorageConfig {
    /// Returns a copy with credentials replaced, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            object_store: self.object_store.redacted(),
            ..self.clone()
        }
    }
}

/// Connection settings for an S3-compatible object store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// Bucket name.
    pub bucket: String,
    /// Key prefix under which collections are written.
    pub prefix: String,
    /// Custom endpoint (R2, `MinIO`, ...). `None` uses AWS.
    pub endpoint: Option<String>,
    /// Signing region.
    pub region: String,
    /// Static access key ID. `None` uses the default credential chain.
    pub access_key_id: Option<String>,
    /// Static secret access key.
    pub secret_access_key: Option<String>,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: DEFAULT_OBJECT_STORE_PREFIX.to_string(),
            endpoint: None,
            region: DEFAULT_OBJECT_STORE_REGION.to_string(),
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl ObjectStoreConfig {
    /// Returns a copy with the secret key replaced, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            secret_access_key: self
                .secret_access_key
                .as_ref()
                .map(|_| "********".to_string()),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for ObjectStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = self.redacted();
        f.debug_struct("ObjectStoreConfig")
            .field("bucket", &redacted.bucket)
            .field("prefix", &redacted.prefix)
            .field("endpoint", &redacted.endpoint)
            .field("region", &redacted.region)
            .field("access_key_id", &redacted.access_key_id)
            .field("secret_access_key", &redacted.secret_access_key)
            .finish()
    }
}
