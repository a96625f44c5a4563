//! Configuration loading and output folder resolution
//!
//! Bootstrap configuration comes from a single TOML file. Settings sources
//! are resolved in priority order:
//!
//! 1. Command-line arguments
//! 2. Environment variables (`PATHWAYS_CONFIG`, `PATHWAYS_OUTPUT_FOLDER`)
//! 3. TOML configuration file
//! 4. Built-in defaults (OS-dependent folders from `dirs`)
//!
//! A missing TOML file is not an error: the caller gets defaults and a
//! warning. A TOML file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "PATHWAYS_CONFIG";

/// Environment variable naming the output folder
pub const OUTPUT_FOLDER_ENV_VAR: &str = "PATHWAYS_OUTPUT_FOLDER";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Folder receiving the normalized output files (optional)
    #[serde(default)]
    pub output_folder: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Import pipeline settings (optional)
    #[serde(default)]
    pub import: ImportTomlConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[import]` table of the TOML file
///
/// Every field is optional; unset fields fall back to the pipeline's
/// built-in defaults. Command-line arguments override these values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImportTomlConfig {
    /// Source dialect: "legacy-csv", "open-referral" or "xml"
    #[serde(default)]
    pub dialect: Option<String>,

    /// Explicit taxonomy vocabulary, disables vocabulary inference
    #[serde(default)]
    pub vocabulary: Option<String>,

    /// Drop inactive records instead of emitting them with the marker
    #[serde(default)]
    pub skip_inactive: Option<bool>,

    /// Phone number dedup scope: "run" or "location"
    #[serde(default)]
    pub phone_dedup: Option<String>,

    /// Province/state codes that force a record inactive
    #[serde(default)]
    pub excluded_regions: Option<Vec<String>>,

    /// `city,longitude,latitude` table used when a location has no coordinates
    #[serde(default)]
    pub city_coordinates: Option<PathBuf>,

    /// Extra source headers, mapped onto known legacy headers
    #[serde(default)]
    pub header_synonyms: BTreeMap<String, String>,
}

/// Resolve the TOML config file path
///
/// **Priority:** CLI → `PATHWAYS_CONFIG` → `<config_dir>/pathways/import.toml`
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("pathways").join("import.toml"))
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed for {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed for {}: {}", path.display(), e)))
}

/// Load the config file if it exists, otherwise return defaults
///
/// A missing file (or no location at all) yields `TomlConfig::default()`.
/// Nothing is logged here: callers load the config before the subscriber
/// exists and report the outcome once logging is installed.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    match path {
        Some(path) if path.exists() => load_toml_config(path),
        _ => Ok(TomlConfig::default()),
    }
}

/// Write a TOML config file atomically (temp file + rename)
///
/// Creates the parent directory when missing.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    debug!(path = %path.display(), "Config file written");
    Ok(())
}

/// Output folder resolution
///
/// **Priority:** CLI → `PATHWAYS_OUTPUT_FOLDER` → TOML `output_folder` → OS default
#[derive(Debug, Clone, Default)]
pub struct OutputFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl OutputFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_value: Option<PathBuf>) -> Self {
        Self {
            cli_arg,
            toml_value,
        }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(OUTPUT_FOLDER_ENV_VAR) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        default_output_folder()
    }
}

/// Get OS-dependent default output folder
pub fn default_output_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pathways").join("import"))
        .unwrap_or_else(|| PathBuf::from("./pathways_import"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_defaults_to_info() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.file.is_none());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
    }

    #[test]
    fn test_parse_import_table() {
        let config: TomlConfig = toml::from_str(
            r#"
            output_folder = "/srv/pathways"

            [logging]
            level = "debug"

            [import]
            dialect = "xml"
            skip_inactive = true
            excluded_regions = ["YT"]

            [import.header_synonyms]
            AgencyName = "PublicName"
            "#,
        )
        .unwrap();

        assert_eq!(config.output_folder, Some(PathBuf::from("/srv/pathways")));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.import.dialect.as_deref(), Some("xml"));
        assert_eq!(config.import.skip_inactive, Some(true));
        assert_eq!(config.import.excluded_regions, Some(vec!["YT".to_string()]));
        assert_eq!(
            config.import.header_synonyms.get("AgencyName").map(String::as_str),
            Some("PublicName")
        );
    }
}
