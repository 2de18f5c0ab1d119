//! finch configuration
//!
//! Handles loading of `.finch.toml`. Every setting has a default so an
//! absent file is equivalent to an empty one; CLI flags override
//! whatever the file says.

use crate::error::{ConfigCategory, ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration (`.finch.toml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinchConfig {
    /// Migration settings
    #[serde(default)]
    pub migrate: MigrateConfig,

    /// Output generation settings
    #[serde(default)]
    pub generator: GeneratorSection,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[migrate]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateConfig {
    /// Output directory for generated files
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Preview without writing
    #[serde(default)]
    pub dry_run: bool,

    /// Replace existing BUCK files
    #[serde(default)]
    pub overwrite: bool,

    /// Target platforms
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,

    /// Custom rule template directory
    #[serde(default)]
    pub template_dir: Option<String>,
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_platforms() -> Vec<String> {
    vec!["linux".into(), "macos".into(), "windows".into()]
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            dry_run: false,
            overwrite: false,
            platforms: default_platforms(),
            template_dir: None,
        }
    }
}

/// `[generator]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSection {
    /// C++ standard written into `.buckconfig`
    #[serde(default = "default_cxx_standard")]
    pub cxx_standard: String,

    /// Preprocessor warning flags written into `.buckconfig`
    #[serde(default = "default_warning_flags")]
    pub warning_flags: String,
}

fn default_cxx_standard() -> String {
    "c++20".to_string()
}

fn default_warning_flags() -> String {
    "-Wall -Wextra".to_string()
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            cxx_standard: default_cxx_standard(),
            warning_flags: default_warning_flags(),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl FinchConfig {
    /// Load from a path. A missing file is `Ok(None)`; malformed content
    /// is a configuration error carrying the TOML diagnostic.
    pub fn load_from_path(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(
                ConfigCategory::InvalidFormat,
                format!("cannot read {}: {}", path.display(), e),
            )
        })?;

        let config: FinchConfig = toml::from_str(&content).map_err(|e| {
            ConfigError::new(
                ConfigCategory::ParseError,
                format!("failed to parse {}: {}", path.display(), e),
            )
            .with_help("run 'finch init' to write a fresh configuration")
        })?;

        config.validate()?;
        Ok(Some(config))
    }

    fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::new(
                    ConfigCategory::InvalidValue,
                    format!("unknown log level '{}'", other),
                )
                .for_option("logging.level")
                .with_help("use one of: trace, debug, info, warn, error")
                .into());
            }
        }
        if self.migrate.platforms.is_empty() {
            return Err(ConfigError::new(
                ConfigCategory::InvalidValue,
                "platforms list may not be empty",
            )
            .for_option("migrate.platforms")
            .into());
        }
        Ok(())
    }

    /// Render as TOML, used by `finch init`.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
