//! Error types for settings generation

use std::path::PathBuf;

use thiserror::Error;

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, GenError>;

/// Generation errors
///
/// Ambiguous values (nulls, empty collections, mixed lists) are never errors;
/// they degrade to untyped fields during inference.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("Input document not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {}{}: {message}", path.display(), format_location(*line, *column))]
    Parse {
        path: PathBuf,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl GenError {
    /// Build a parse error without location information
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line: None,
            column: None,
            message: message.into(),
        }
    }

    /// Build a parse error from a YAML error, keeping its location
    pub fn from_yaml(path: impl Into<PathBuf>, err: &serde_yaml::Error) -> Self {
        let location = err.location();
        Self::Parse {
            path: path.into(),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
            message: err.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Whether the error is one of the fatal input-side errors
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            GenError::InputNotFound { .. } | GenError::Read { .. } | GenError::Parse { .. }
        )
    }
}

fn format_location(line: Option<usize>, column: Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at line {line}, column {column}"),
        (Some(line), None) => format!(" at line {line}"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_includes_location() {
        let err = GenError::Parse {
            path: PathBuf::from("settings.yaml"),
            line: Some(3),
            column: Some(7),
            message: "did not find expected key".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("settings.yaml"));
        assert!(text.contains("line 3, column 7"));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_write_error_is_not_input_error() {
        let err = GenError::write(
            "out.rs",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_input_error());
        assert!(err.to_string().contains("out.rs"));
    }
}
