use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::domain::models::config::Config;
use crate::domain::models::normalize;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Store name cannot be empty")]
    EmptyStoreName,

    #[error("Invalid origin base_url '{0}': {1}")]
    InvalidOrigin(String, String),

    #[error("Invalid manifest entry '{0}': {1}")]
    InvalidManifestEntry(String, String),

    #[error("Duplicate manifest entry '{0}'")]
    DuplicateManifestEntry(String),

    #[error("Invalid max_concurrency: {0}. Must be at least 1")]
    InvalidMaxConcurrency(usize),

    #[error("Invalid timeout_secs: {0}. Must be at least 1")]
    InvalidTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .precache/config.yaml (project config, created by init)
    /// 3. .precache/local.yaml (project local overrides, optional)
    /// 4. Environment variables (PRECACHE_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".precache/config.yaml"))
            .merge(Yaml::file(".precache/local.yaml"))
            .merge(Env::prefixed("PRECACHE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Parsed origin base URL.
    pub fn origin(config: &Config) -> Result<Url, ConfigError> {
        Url::parse(&config.origin.base_url)
            .map_err(|e| ConfigError::InvalidOrigin(config.origin.base_url.clone(), e.to_string()))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.store_name.trim().is_empty() {
            return Err(ConfigError::EmptyStoreName);
        }

        let origin = Self::origin(config)?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidOrigin(
                config.origin.base_url.clone(),
                "scheme must be http or https".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &config.manifest {
            let url = normalize(entry, &origin)
                .map_err(|e| ConfigError::InvalidManifestEntry(entry.clone(), e.reason))?;
            if !seen.insert(url) {
                return Err(ConfigError::DuplicateManifestEntry(entry.clone()));
            }
        }

        if config.initializer.max_concurrency == 0 {
            return Err(ConfigError::InvalidMaxConcurrency(config.initializer.max_concurrency));
        }

        if config.origin.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.origin.timeout_secs));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store_name, "usumm-cache-v1");
        assert_eq!(config.manifest.len(), 4);
        assert_eq!(config.database.path, ".precache/precache.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.initializer.max_concurrency, 4);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
store_name: cache-v2
manifest:
  - /
  - /static/app.js
origin:
  base_url: https://example.com
  timeout_secs: 10
database:
  path: /custom/path.db
  max_connections: 2
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.store_name, "cache-v2");
        assert_eq!(config.manifest, vec!["/", "/static/app.js"]);
        assert_eq!(config.origin.base_url, "https://example.com");
        assert_eq!(config.origin.timeout_secs, 10);
        assert_eq!(config.database.path, "/custom/path.db");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.proxy.port, 8787);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_empty_store_name() {
        let config = Config {
            store_name: "  ".to_string(),
            ..Default::default()
        };

        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::EmptyStoreName)));
    }

    #[test]
    fn test_validate_invalid_origin() {
        let mut config = Config::default();
        config.origin.base_url = "not a url".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidOrigin(..))));

        config.origin.base_url = "ftp://example.com".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidOrigin(..))));
    }

    #[test]
    fn test_validate_invalid_manifest_entry() {
        let mut config = Config::default();
        config.manifest.push("mailto:someone@example.com".to_string());

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidManifestEntry(entry, _) => assert_eq!(entry, "mailto:someone@example.com"),
            other => panic!("Expected InvalidManifestEntry, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_duplicate_manifest_entry() {
        let mut config = Config::default();
        config.manifest.push("http://127.0.0.1:5000/static/style.css".to_string());

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::DuplicateManifestEntry(_))
        ));
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.initializer.max_concurrency = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConcurrency(0))
        ));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.origin.timeout_secs = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidTimeout(0))));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            _ => panic!("Expected InvalidLogLevel error"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogFormat(format) => assert_eq!(format, "xml"),
            _ => panic!("Expected InvalidLogFormat error"),
        }
    }

    #[test]
    fn test_validate_invalid_rotation() {
        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidRotation(_))));
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::EmptyDatabasePath)));
    }

    #[test]
    fn test_validate_zero_max_connections() {
        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConnections(0))
        ));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "store_name: from-file\nproxy:\n  port: 9000").unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.store_name, "from-file");
        assert_eq!(config.proxy.port, 9000);
        assert_eq!(config.proxy.host, "127.0.0.1");
    }

    #[test]
    fn test_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir(".precache")?;
            jail.create_file(".precache/config.yaml", "store_name: from-yaml\nlogging:\n  level: warn")?;
            jail.set_env("PRECACHE_STORE_NAME", "from-env");
            jail.set_env("PRECACHE_PROXY__PORT", "9999");

            let config = ConfigLoader::load().expect("config should load");
            assert_eq!(config.store_name, "from-env");
            assert_eq!(config.proxy.port, 9999);
            assert_eq!(config.logging.level, "warn");
            Ok(())
        });
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(base_file, "store_name: base\nlogging:\n  level: info\n  format: json").unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "store_name: override\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.store_name, "override", "Override should win");
        assert_eq!(config.logging.level, "debug", "Override should win for nested fields");
        assert_eq!(config.logging.format, "json", "Base value should persist when not overridden");
    }
}
