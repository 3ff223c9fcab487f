//! Configuration loading.
//!
//! Sources in increasing precedence: defaults, an optional TOML file, then
//! environment variables. Problems with individual values are logged and
//! the default is kept; loading itself only fails when the file cannot be
//! read or parsed.

use std::path::{Path, PathBuf};

use copilot_metrics_database_models::StorageKind;
use copilot_metrics_ingest_models::{DEFAULT_INTERVAL_SECONDS, IngestConfig};
use copilot_metrics_models::{Scope, ScopeKind};
use copilot_metrics_source::fixture::{FIXTURE_SEATS_ENTERPRISE, FIXTURE_SEATS_ORGANIZATION};

use crate::IngestError;

/// Loads the effective configuration from `path` (if any) and the process
/// environment.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or is not valid TOML.
pub fn load(path: Option<&Path>) -> Result<IngestConfig, IngestError> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load`] with a custom variable lookup.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or is not valid TOML.
pub fn load_with(
    path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<IngestConfig, IngestError> {
    let mut config = match path {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            let text = std::fs::read_to_string(path)?;
            toml::from_str(&text)?
        }
        None => IngestConfig::default(),
    };

    apply_env(&mut config, lookup);
    validate(&config);

    Ok(config)
}

/// Overlays environment variables onto `config`. Empty values are ignored.
#[allow(clippy::too_many_lines)]
pub fn apply_env(config: &mut IngestConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = var("GITHUB_TOKEN") {
        config.github.token = token;
    }
    if let Some(base_url) = var("GITHUB_API_BASEURL") {
        config.github.base_url = base_url;
    }
    if let Some(version) = var("GITHUB_API_VERSION") {
        config.github.api_version = version;
    }
    if let Some(max_pages) = var("GITHUB_MAX_PAGES") {
        match max_pages.trim().parse::<u32>() {
            Ok(n) if n > 0 => config.github.max_pages = Some(n),
            _ => log::warn!("Invalid GITHUB_MAX_PAGES {max_pages:?}, pagination stays unbounded"),
        }
    }

    if let Some(scope) = var("GITHUB_API_SCOPE") {
        match scope.trim().parse::<ScopeKind>() {
            Ok(kind) => config.scope = kind,
            Err(_) => log::warn!(
                "Invalid GITHUB_API_SCOPE {scope:?}, using {}",
                config.scope
            ),
        }
    }
    if let Some(enterprise) = var("GITHUB_ENTERPRISE") {
        config.enterprise = Some(enterprise.trim().to_string());
    }
    if let Some(organization) = var("GITHUB_ORGANIZATION") {
        config.organization = Some(organization.trim().to_string());
    }
    if let Some(teams) = var("GITHUB_METRICS_TEAMS") {
        config.teams = parse_teams(&teams);
    }

    if let Some(test_data) = var("GITHUB_METRICS_USE_TESTDATA") {
        config.use_test_data = test_data.trim().eq_ignore_ascii_case("true");
    }
    if let Some(enable) = var("ENABLE_SEATS_INGESTION") {
        config.enable_seats = parse_bool(&enable).unwrap_or_else(|| {
            log::warn!("Invalid ENABLE_SEATS_INGESTION {enable:?}, seats ingestion stays enabled");
            true
        });
    }

    if let Some(kind) = var("STORAGE_TYPE") {
        match kind.trim().parse::<StorageKind>() {
            Ok(kind) => config.storage.kind = kind,
            Err(_) => log::warn!(
                "Unknown STORAGE_TYPE {kind:?}, using {}",
                config.storage.kind
            ),
        }
    }
    if let Some(path) = var("DUCKDB_PATH").or_else(|| var("SQLITE_DB_PATH")) {
        config.storage.duckdb_path = Some(PathBuf::from(path));
    }

    let store = &mut config.storage.object_store;
    if let Some(bucket) = var("OBJECT_STORE_BUCKET") {
        store.bucket = bucket;
    }
    if let Some(prefix) = var("OBJECT_STORE_PREFIX") {
        store.prefix = prefix;
    }
    if let Some(endpoint) = var("OBJECT_STORE_ENDPOINT") {
        store.endpoint = Some(endpoint);
    }
    if let Some(region) = var("OBJECT_STORE_REGION") {
        store.region = region;
    }
    if let Some(key) = var("OBJECT_STORE_ACCESS_KEY_ID") {
        store.access_key_id = Some(key);
    }
    if let Some(secret) = var("OBJECT_STORE_SECRET_ACCESS_KEY") {
        store.secret_access_key = Some(secret);
    }

    let schedule = &mut config.schedule;
    for (key, slot) in [
        ("METRICS_SCHEDULE_SECONDS", &mut schedule.metrics_seconds),
        ("SEATS_SCHEDULE_SECONDS", &mut schedule.seats_seconds),
        ("USAGE_SCHEDULE_SECONDS", &mut schedule.usage_seconds),
    ] {
        if let Some(value) = var(key) {
            *slot = parse_interval(key, &value);
        }
    }
}

/// Splits a comma-separated team list, trimming entries and dropping
/// empty ones.
#[must_use]
pub fn parse_teams(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|team| !team.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_interval(key: &str, value: &str) -> u64 {
    match value.trim().parse::<i64>() {
        Ok(seconds) if seconds > 0 => {
            log::info!("Using {key}={seconds}");
            seconds.unsigned_abs()
        }
        Ok(seconds) => {
            log::warn!("{key} must be positive (got {seconds}), using {DEFAULT_INTERVAL_SECONDS}");
            DEFAULT_INTERVAL_SECONDS
        }
        Err(_) => {
            log::warn!("Invalid {key} {value:?}, using {DEFAULT_INTERVAL_SECONDS}");
            DEFAULT_INTERVAL_SECONDS
        }
    }
}

/// Logs warnings for settings that are likely wrong. Never fails.
pub fn validate(config: &IngestConfig) {
    if config.github.token.is_empty() && !config.use_test_data {
        log::warn!("GITHUB_TOKEN not set");
    }

    match config.scope {
        ScopeKind::Enterprise if config.scope_name().is_none() => {
            log::warn!("GITHUB_ENTERPRISE not set but GITHUB_API_SCOPE is 'enterprise'");
        }
        ScopeKind::Organization if config.scope_name().is_none() => {
            log::warn!("GITHUB_ORGANIZATION not set and GITHUB_API_SCOPE is not 'enterprise'");
        }
        _ => {}
    }

    if config.storage.kind == StorageKind::ObjectStore
        && config.storage.object_store.bucket.trim().is_empty()
    {
        log::warn!("OBJECT_STORE_BUCKET not set");
    }
}

/// Builds the scope the pipeline fetches for.
///
/// In fixture mode a missing name falls back to the fixture placeholder
/// for the selected kind.
///
/// # Errors
///
/// Returns [`IngestError::Config`] if the selected scope has no name and
/// fixture mode is off.
pub fn scope(config: &IngestConfig) -> Result<Scope, IngestError> {
    if let Some(name) = config.scope_name() {
        return Ok(Scope::new(config.scope, name));
    }

    if config.use_test_data {
        let placeholder = match config.scope {
            ScopeKind::Organization => FIXTURE_SEATS_ORGANIZATION,
            ScopeKind::Enterprise => FIXTURE_SEATS_ENTERPRISE,
        };
        return Ok(Scope::new(config.scope, placeholder));
    }

    Err(IngestError::Config {
        message: format!("no {} name configured", config.scope),
    })
}
