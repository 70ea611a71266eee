//! Configuration management for Multi Keyboard
//!
//! Provides persistent configuration loaded from a platform-specific config
//! file.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/multi-keyboard/config.toml` |
//! | macOS | `~/Library/Application Support/multi-keyboard/config.toml` |
//! | Windows | `%APPDATA%\multi-keyboard\config.toml` |
//!
//! ## Example
//!
//! ```no_run
//! use multi_keyboard::Config;
//!
//! // Load existing config or use defaults
//! let mut config = Config::load().unwrap_or_default();
//!
//! // Modify settings
//! config.logging.filter = "debug".to_string();
//!
//! // Save to disk
//! config.save().expect("Failed to save config");
//! ```

use crate::rawinput::DeviceFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory
    #[error("Could not determine config directory")]
    NoConfigDir,
    /// IO error reading or writing config file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Failed to parse config file
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize config
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Returns the path to the config file.
///
/// Creates the config directory if it doesn't exist.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let app_dir = config_dir.join("multi-keyboard");

    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }

    Ok(app_dir.join("config.toml"))
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Device filtering rules
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Session report settings
    #[serde(default)]
    pub report: ReportConfig,
}

/// Device filtering configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Names containing this marker are skipped (case-insensitive); empty
    /// disables the check
    pub virtual_root_marker: String,
    /// Only names starting with one of these are considered
    pub path_prefixes: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let filter = DeviceFilter::default();
        Self {
            virtual_root_marker: filter.virtual_root_marker,
            path_prefixes: filter.path_prefixes,
        }
    }
}

impl RegistryConfig {
    pub fn to_filter(&self) -> DeviceFilter {
        DeviceFilter {
            virtual_root_marker: self.virtual_root_marker.clone(),
            path_prefixes: self.path_prefixes.clone(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter directive, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Session report configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Include devices that never sent a key
    pub include_idle_devices: bool,
    /// Directory for reports written without an explicit path
    pub directory: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_idle_devices: true,
            directory: None,
        }
    }
}

impl ReportConfig {
    /// Where a report named `file_name` goes
    pub fn resolve(&self, file_name: &str) -> PathBuf {
        match &self.directory {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

impl Config {
    /// Load configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_config_path() -> PathBuf {
        env::temp_dir().join(format!("multi-keyboard-test-{}.toml", std::process::id()))
    }

    #[test]
    fn config_default_values() {
        let config = Config::default();
        assert_eq!(config.registry.virtual_root_marker, "ROOT");
        assert_eq!(config.registry.path_prefixes, vec![r"\\?\", r"\??\"]);
        assert_eq!(config.logging.filter, "info");
        assert!(config.report.include_idle_devices);
        assert_eq!(config.report.directory, None);
    }

    #[test]
    fn registry_config_builds_filter() {
        let mut config = RegistryConfig::default();
        assert_eq!(config.to_filter(), DeviceFilter::default());

        config.virtual_root_marker = String::new();
        let filter = config.to_filter();
        assert!(!filter.is_virtual_root(r"\\?\ROOT#RDP_KBD#0000#{g}"));
    }

    #[test]
    fn report_path_resolution() {
        let mut report = ReportConfig::default();
        assert_eq!(report.resolve("a.json"), PathBuf::from("a.json"));

        report.directory = Some(PathBuf::from("reports"));
        assert_eq!(report.resolve("a.json"), Path::new("reports").join("a.json"));
    }

    #[test]
    fn config_save_and_load_roundtrip() {
        let path = temp_config_path();

        let mut config = Config::default();
        config.logging.filter = "multi_keyboard=debug".to_string();
        config.registry.path_prefixes.push(r"\\.\".to_string());

        config.save_to(&path).expect("Failed to save config");
        let loaded = Config::load_from(&path).expect("Failed to load config");

        assert_eq!(loaded, config);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn config_load_missing_file_is_error() {
        let path = PathBuf::from("/nonexistent/path/config.toml");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Io(_))));
    }

    #[test]
    fn config_serializes_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize");

        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("[report]"));
        assert!(toml_str.contains("filter = \"info\""));
    }

    #[test]
    fn config_deserializes_partial_toml() {
        let toml_str = r#"
[logging]
filter = "warn"
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize");

        assert_eq!(config.logging.filter, "warn");
        assert_eq!(config.registry, RegistryConfig::default());
        assert_eq!(config.report, ReportConfig::default());
    }

    #[test]
    fn config_deserializes_registry_section() {
        let toml_str = r#"
[registry]
virtual_root_marker = "VIRTUAL"
path_prefixes = ['\\?\']
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize");
        let filter = config.registry.to_filter();

        assert!(filter.is_virtual_root(r"\\?\virtual#kbd#1#{g}"));
        assert!(filter.has_device_prefix(r"\\?\HID#x#y#{g}"));
        assert!(!filter.has_device_prefix(r"\??\HID#x#y#{g}"));
    }

    #[test]
    fn config_fills_missing_fields_within_a_section() {
        let toml_str = r#"
[registry]
virtual_root_marker = ""

[report]
directory = "reports"
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize");

        assert_eq!(config.registry.virtual_root_marker, "");
        assert_eq!(
            config.registry.path_prefixes,
            RegistryConfig::default().path_prefixes
        );
        assert!(config.report.include_idle_devices);
        assert_eq!(config.report.directory, Some(PathBuf::from("reports")));
        assert!(!config
            .registry
            .to_filter()
            .is_virtual_root(r"\\?\Root#RDP_KBD#0000#{g}"));
    }

    #[test]
    fn empty_sections_use_defaults() {
        let config: Config =
            toml::from_str("[registry]\n[logging]\n[report]\n").expect("Failed to deserialize");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn config_rejects_malformed_toml() {
        let result: Result<Config, _> = toml::from_str("[logging]\nfilter = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::NoConfigDir;
        assert_eq!(err.to_string(), "Could not determine config directory");

        let io_err = ConfigError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(io_err.to_string().contains("IO error"));
    }
}
