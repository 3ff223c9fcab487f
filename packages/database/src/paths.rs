//! Default file locations for the embedded store.

use std::path::{Path, PathBuf};

/// Directory under the user's home that holds local data.
pub const DATA_DIR_NAME: &str = ".copilot-metrics";

/// File name of the default embedded database.
pub const DUCKDB_FILE_NAME: &str = "copilot-metrics.duckdb";

/// Returns the local data directory (`~/.copilot-metrics`).
///
/// Falls back to a relative `.copilot-metrics` when no home directory can
/// be determined.
#[must_use]
pub fn data_dir() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from(DATA_DIR_NAME), |home| home.join(DATA_DIR_NAME))
}

/// Returns the default embedded database path.
#[must_use]
pub fn default_duckdb_path() -> PathBuf {
    data_dir().join(DUCKDB_FILE_NAME)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_ends_with_file_name() {
        let path = default_duckdb_path();
        assert!(path.ends_with(Path::new(DATA_DIR_NAME).join(DUCKDB_FILE_NAME)));
    }

    #[test]
    fn ensure_dir_creates_nested_dirs() {
        let dir = std::env::temp_dir().join("copilot_metrics_paths_test");
        let _ = std::fs::remove_dir_all(&dir);

        let nested = dir.join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }
}
