//! Configuration module for the unique file collector
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - Windows: %APPDATA%\unique_file_collector\config.toml
//! - Linux: ~/.config/unique_file_collector/config.toml
//! - macOS: ~/Library/Application Support/unique_file_collector/config.toml
//!
//! This is the application configuration. The category mapping is a separate
//! JSON file referenced from `[categories]`, see [`crate::classify::categories`].

use crate::classify::categories::{
    CategoryProvider, FileCategoryProvider, InlineCategoryProvider, DEFAULT_CATEGORY,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application name used for config directory
const APP_NAME: &str = "unique_file_collector";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config file name looked up in the working directory
const LOCAL_CONFIG_FILE_NAME: &str = "collector.toml";

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;
    }

    Ok(config_dir)
}

/// Initialize the configuration file if it doesn't exist.
///
/// Creates the config directory and writes the default config template.
/// Returns the path to the config file.
pub fn init_config() -> Result<PathBuf, ConfigError> {
    let config_dir = ensure_config_dir()?;
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        fs::write(&config_path, Config::generate_default_config())
            .map_err(|e| ConfigError::WriteError(config_path.clone(), e.to_string()))?;
    }

    Ok(config_path)
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Collection behaviour
    pub collector: CollectorConfig,

    /// Category mapping source
    pub categories: CategoriesConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Collection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Name of the hash registry file written in the destination root
    pub registry_file_name: String,

    /// Subfolder used for files collected during an incremental run
    pub incremental_subfolder: String,

    /// Put incremental-run files under `incremental_subfolder`
    pub separate_incremental_runs: bool,

    /// Folder name used in place of an extension when none could be found
    pub no_extension_dir: String,

    /// Category for extensions missing from the category mapping
    pub default_category: String,

    /// Length of the random suffix that de-collides file names
    pub suffix_length: usize,

    /// Hashing workers (0 = automatic: min(32, cores + 4))
    pub max_workers: usize,

    /// Follow symbolic links while walking the source tree
    pub follow_symlinks: bool,
}

/// Where the extension → category mapping comes from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoriesConfig {
    /// Path to the category JSON file (empty = built-in mapping)
    pub file: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log to file
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            registry_file_name: "unique_hashes.txt".to_string(),
            incremental_subfolder: "new_files".to_string(),
            separate_incremental_runs: true,
            no_extension_dir: "no_extension".to_string(),
            default_category: DEFAULT_CATEGORY.to_string(),
            suffix_length: 10,
            max_workers: 0,
            follow_symlinks: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("unique_collector.log"),
        }
    }
}

impl CategoriesConfig {
    /// Build the provider for the configured category source
    pub fn provider(&self) -> Box<dyn CategoryProvider> {
        if self.file.as_os_str().is_empty() {
            Box::new(InlineCategoryProvider::builtin())
        } else {
            Box::new(FileCategoryProvider::new(&self.file))
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./collector.toml (current directory - for project-specific overrides)
    /// 2. Standard config location
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        let local_path = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
        if local_path.exists() {
            return Self::load(&local_path);
        }

        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                return Self::load(&config_path);
            }
        }

        Ok(Self::default())
    }

    /// Get the path where the config file is (or would be) located.
    ///
    /// Returns the local override if present, otherwise the standard location.
    pub fn get_active_config_path() -> PathBuf {
        let local_path = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
        if local_path.exists() {
            return local_path;
        }

        get_config_path().unwrap_or(local_path)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::WriteError(path.as_ref().to_path_buf(), e.to_string()))?;

        Ok(())
    }

    /// Generate a default config file with comments
    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path
    FileNotFound(PathBuf),
    /// Failed to read the configuration file
    ReadError(PathBuf, String),
    /// Failed to parse the configuration file (invalid TOML)
    ParseError(PathBuf, String),
    /// Failed to serialize configuration to TOML
    SerializeError(String),
    /// Failed to write configuration file
    WriteError(PathBuf, String),
    /// Could not determine config directory
    ConfigDirNotFound,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ReadError(path, err) => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ParseError(path, err) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::SerializeError(err) => {
                write!(f, "Failed to serialize configuration: {}", err)
            }
            ConfigError::WriteError(path, err) => {
                write!(
                    f,
                    "Failed to write config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ConfigDirNotFound => {
                write!(f, "Could not determine configuration directory")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collector_config_defaults() {
        let config = CollectorConfig::default();
        assert_eq!(config.registry_file_name, "unique_hashes.txt");
        assert_eq!(config.incremental_subfolder, "new_files");
        assert!(config.separate_incremental_runs);
        assert_eq!(config.no_extension_dir, "no_extension");
        assert_eq!(config.default_category, "other");
        assert_eq!(config.suffix_length, 10);
        assert_eq!(config.max_workers, 0);
        assert!(!config.follow_symlinks);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [collector]
            suffix_length = 6

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.collector.suffix_length, 6);
        assert_eq!(config.collector.incremental_subfolder, "new_files");
        assert_eq!(config.logging.level, "debug");
        assert!(config.categories.file.as_os_str().is_empty());
    }

    #[test]
    fn test_example_config_parses_to_defaults() {
        let config: Config = toml::from_str(&Config::generate_default_config()).unwrap();
        let defaults = CollectorConfig::default();

        assert_eq!(config.collector.registry_file_name, defaults.registry_file_name);
        assert_eq!(config.collector.suffix_length, defaults.suffix_length);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.collector.max_workers = 8;
        config.categories.file = PathBuf::from("/etc/categories.json");
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.collector.max_workers, 8);
        assert_eq!(loaded.categories.file, PathBuf::from("/etc/categories.json"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load(temp_dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[collector\nsuffix_length = ").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::ParseError(_, _))));
    }

    #[test]
    fn test_categories_provider_selection() {
        let builtin = CategoriesConfig::default().provider();
        assert_eq!(builtin.describe(), "built-in categories");

        let file = CategoriesConfig {
            file: PathBuf::from("/tmp/categories.json"),
        }
        .provider();
        assert_eq!(file.describe(), "/tmp/categories.json");
    }
}
