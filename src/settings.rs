//! Runtime loading of settings documents into generated types
//!
//! ```ignore
//! let path = settingsgen::settings::resolve_settings_path("settings.yaml");
//! let settings: RootSchema = settingsgen::settings::load_settings(&path)?;
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{GenError, Result};

/// Environment variable overriding the settings document location
pub const SETTINGS_PATH_ENV: &str = "SETTINGS_PATH";

/// Locate the settings document.
///
/// `SETTINGS_PATH` wins over `default`. When the chosen path does not exist
/// relative to the working directory, the same path under the parent
/// directory is used instead.
pub fn resolve_settings_path(default: impl AsRef<Path>) -> PathBuf {
    let configured = std::env::var_os(SETTINGS_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| default.as_ref().to_path_buf());
    resolve_from(Path::new("."), &configured)
}

fn resolve_from(base: &Path, configured: &Path) -> PathBuf {
    if base.join(configured).exists() {
        return configured.to_path_buf();
    }
    let fallback = Path::new("..").join(configured);
    debug!(
        path = %configured.display(),
        fallback = %fallback.display(),
        "Settings document not found, trying parent directory"
    );
    fallback
}

/// Read the document at `path` into `T`
pub fn load_settings<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => GenError::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => GenError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;

    serde_yaml::from_str(&text).map_err(|e| GenError::from_yaml(path, &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Database {
        host: String,
        port: i64,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct RootSchema {
        mode: String,
        database: Database,
        #[serde(rename = "log-level")]
        log_level: String,
    }

    #[test]
    fn test_load_into_generated_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(
            &path,
            "mode: production\ndatabase:\n  host: db\n  port: 5432\nlog-level: info\n",
        )
        .unwrap();

        let settings: RootSchema = load_settings(&path).unwrap();
        assert_eq!(settings.mode, "production");
        assert_eq!(settings.database.port, 5432);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.yaml");

        let err = load_settings::<RootSchema>(&path).unwrap_err();
        assert!(matches!(err, GenError::InputNotFound { .. }));

        fs::write(&path, "mode: production\n").unwrap();
        let err = load_settings::<RootSchema>(&path).unwrap_err();
        assert!(matches!(err, GenError::Parse { .. }));
    }

    #[test]
    fn test_parent_directory_fallback() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("service");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("settings.yaml"), "mode: a\n").unwrap();

        let resolved = resolve_from(&nested, Path::new("settings.yaml"));
        assert_eq!(resolved, Path::new("..").join("settings.yaml"));
        assert!(nested.join(&resolved).exists());

        fs::write(nested.join("settings.yaml"), "mode: b\n").unwrap();
        assert_eq!(
            resolve_from(&nested, Path::new("settings.yaml")),
            PathBuf::from("settings.yaml")
        );
    }
}
