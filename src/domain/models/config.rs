use serde::{Deserialize, Serialize};

/// Main configuration structure for precache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Version-stamped store name; changing it orphans the previous store
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Resources fetched and stored at activation
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Remote origin configuration
    #[serde(default)]
    pub origin: OriginConfig,

    /// Store initializer configuration
    #[serde(default)]
    pub initializer: InitializerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Intercepting proxy configuration
    #[serde(default)]
    pub proxy: ProxyConfig,
}

fn default_store_name() -> String {
    "usumm-cache-v1".to_string()
}

fn default_manifest() -> Vec<String> {
    vec![
        "/".to_string(),
        "/static/style.css".to_string(),
        "/static/feed_card_css.css".to_string(),
        "/download_feed".to_string(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_name: default_store_name(),
            manifest: default_manifest(),
            origin: OriginConfig::default(),
            initializer: InitializerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            proxy: ProxyConfig::default(),
        }
    }
}

/// Remote origin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OriginConfig {
    /// Base URL relative resource identifiers resolve against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent sent with every fetch
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("precache/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Store initializer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InitializerConfig {
    /// Maximum manifest fetches in flight
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

const fn default_max_concurrency() -> usize {
    4
}

impl Default for InitializerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".precache/precache.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// `sqlx` connection URL for the configured path.
    pub fn url(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Intercepting proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProxyConfig {
    /// Host to bind to
    #[serde(default = "default_proxy_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_proxy_port")]
    pub port: u16,
}

fn default_proxy_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_proxy_port() -> u16 {
    8787
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: default_proxy_host(),
            port: default_proxy_port(),
        }
    }
}
