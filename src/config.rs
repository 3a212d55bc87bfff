//! Configuration management for settingsgen
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (settingsgen.toml)
//! - Environment variables (SETTINGSGEN__*)
//!
//! ## Example config file (settingsgen.toml):
//! ```toml
//! [generator]
//! input = "config/settings.yaml"
//! output = "src/settings_types.rs"
//! root_name = "RootSchema"
//! manifest = true
//!
//! [naming]
//! acronyms = ["API", "URL"]
//! singularize_list_items = true
//!
//! [render]
//! derives = ["Debug", "Clone", "PartialEq", "Serialize", "Deserialize"]
//!
//! [render.types]
//! integer = "i64"
//! any = "serde_yaml::Value"
//!
//! [logging]
//! mode = "production"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codegen::{NamingConfig, RenderProfile};
use crate::error::Result;
use crate::generator::GeneratorConfig;
use crate::writer;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsgenConfig {
    /// Input/output locations
    #[serde(default)]
    pub generator: GeneratorSection,

    /// Record naming
    #[serde(default)]
    pub naming: NamingConfig,

    /// Rust rendering
    #[serde(default)]
    pub render: RenderProfile,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[generator]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSection {
    /// Settings document to read
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Generated Rust unit
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Name of the top-level record
    #[serde(default = "default_root_name")]
    pub root_name: String,

    /// Write a signature manifest next to the output
    #[serde(default = "default_true")]
    pub manifest: bool,
}

/// `[logging]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub mode: LogMode,
}

/// Logging verbosity profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    #[default]
    Development,
    Production,
}

impl LogMode {
    /// Filter directive used when `RUST_LOG` is unset
    pub fn default_directive(&self) -> &'static str {
        match self {
            LogMode::Development => "debug",
            LogMode::Production => "warn",
        }
    }
}

fn default_input() -> PathBuf {
    PathBuf::from("settings.yaml")
}

fn default_output() -> PathBuf {
    PathBuf::from("src/settings_types.rs")
}

fn default_root_name() -> String {
    "RootSchema".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            root_name: default_root_name(),
            manifest: true,
        }
    }
}

impl SettingsgenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required explicit file when given
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = [
            "settingsgen.toml",
            ".settingsgen.toml",
            "config/settingsgen.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "settingsgen", "settingsgen") {
            let xdg_config = config_dir.config_dir().join("settingsgen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // SETTINGSGEN__GENERATOR__OUTPUT=...
        builder = builder.add_source(
            Environment::with_prefix("SETTINGSGEN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        writer::write_atomic(path, content.as_bytes())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Configuration for one generation run
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            input: self.generator.input.clone(),
            output: self.generator.output.clone(),
            root_name: self.generator.root_name.clone(),
            naming: self.naming.clone(),
            profile: self.render.clone(),
            manifest: self.generator.manifest,
        }
    }
}
