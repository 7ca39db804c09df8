//! Configuration loading.
//!
//! Handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result, TerradriftError};
use std::path::Path;
use tracing::{debug, info};

use super::spec::ReconcilerConfig;

/// Configuration parser for loading reconciler configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ReconcilerConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(TerradriftError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            TerradriftError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<ReconcilerConfig> {
        debug!("Parsing YAML configuration");

        let config: ReconcilerConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            TerradriftError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Successfully parsed configuration for project: {}",
            config.project.name
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Environment variables are checked in the format
    /// `TERRADRIFT_<SECTION>_<KEY>` (e.g. `TERRADRIFT_PROJECT_NAME`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<ReconcilerConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(config: &mut ReconcilerConfig) {
        if let Ok(name) = std::env::var("TERRADRIFT_PROJECT_NAME") {
            debug!("Overriding project.name from environment");
            config.project.name = name;
        }

        if let Ok(env) = std::env::var("TERRADRIFT_PROJECT_ENVIRONMENT") {
            debug!("Overriding project.environment from environment");
            config.project.environment = env;
        }

        if let Ok(raw) = std::env::var("TERRADRIFT_DRIFT_CHECK")
            && let Ok(enabled) = raw.parse::<bool>()
        {
            debug!("Overriding drift_check from environment");
            config.drift_check = enabled;
        }

        if let Ok(raw) = std::env::var("TERRADRIFT_POLL_PERIOD_SECS")
            && let Ok(secs) = raw.parse::<u64>()
        {
            debug!("Overriding poll_period_secs from environment");
            config.poll_period_secs = secs;
        }

        if let Ok(raw) = std::env::var("TERRADRIFT_LOCK_TIMEOUT_SECS")
            && let Ok(secs) = raw.parse::<i64>()
        {
            debug!("Overriding lock.timeout_secs from environment");
            config.lock.timeout_secs = secs;
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                TerradriftError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["terradrift.yaml", "terradrift.yml"];

/// Finds the configuration file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(TerradriftError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r"
project:
  name: test-project
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(config.project.name, "test-project");
        assert_eq!(config.project.environment, "dev");
        assert!(config.drift_check);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r"
project:
  name: payments-infra
  environment: prod

drift_check: false
track_data_resources: false
poll_period_secs: 120

lock:
  timeout_secs: -1
  poll_interval_secs: 2
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(config.project.name, "payments-infra");
        assert_eq!(config.project.environment, "prod");
        assert!(!config.drift_check);
        assert!(!config.track_data_resources);
        assert_eq!(config.poll_period_secs, 120);
        assert_eq!(config.lock.timeout(), None);
    }

    #[test]
    fn test_invalid_yaml_fails() {
        let parser = ConfigParser::new();
        let result = parser.parse_yaml("project: [not: a: mapping", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terradrift.yaml");
        std::fs::write(&path, "project:\n  name: from-disk\n").unwrap();

        let parser = ConfigParser::new();
        let config = parser.load_file(&path).unwrap();
        assert_eq!(config.project.name, "from-disk");
    }

    #[test]
    fn test_missing_file_fails() {
        let parser = ConfigParser::new();
        let result = parser.load_file("/nonexistent/terradrift.yaml");
        assert!(matches!(
            result,
            Err(TerradriftError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_find_config_file_searches_upward() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("terradrift.yaml"), "project:\n  name: x\n").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("terradrift.yaml"));
    }
}
