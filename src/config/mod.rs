//! Configuration management for mobility-sync
//!
//! This module handles loading, parsing, and validating application
//! configuration from YAML files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Batch execution configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Vendor integrations
    #[serde(default)]
    pub vendors: VendorsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // First, expand environment variables in the YAML string
        let expanded = expand_env_vars(yaml);
        serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from environment variables with prefix MOBILITY_SYNC_
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(path) = std::env::var("MOBILITY_SYNC_DATABASE_PATH") {
            config.database.path = path;
        }
        if let Ok(max) = std::env::var("MOBILITY_SYNC_MAX_CONCURRENT_RUNS") {
            config.sync.max_concurrent_runs = max
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid max concurrent runs".to_string()))?;
        }
        if let Ok(timeout) = std::env::var("MOBILITY_SYNC_RUN_TIMEOUT_SECS") {
            config.sync.run_timeout_secs = timeout
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid run timeout".to_string()))?;
        }

        Ok(config)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "/data/db/mobility-sync.db".to_string()
}

/// Batch execution configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Maximum number of vendor runs executing concurrently
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,

    /// Watchdog timeout per run, in seconds
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: default_max_concurrent_runs(),
            run_timeout_secs: default_run_timeout(),
        }
    }
}

fn default_max_concurrent_runs() -> usize {
    4
}

fn default_run_timeout() -> u64 {
    300
}

/// Vendor integration configurations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VendorsConfig {
    /// Lime GBFS integration
    pub lime: Option<GbfsVendorConfig>,

    /// Lyft GBFS integration
    pub lyft: Option<GbfsVendorConfig>,

    /// GTS proprietary availability integration
    pub gts: Option<GtsVendorConfig>,
}

/// Configuration of one GBFS vendor integration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GbfsVendorConfig {
    /// Whether this integration is enabled
    #[serde(default = "default_vendor_enabled")]
    pub enabled: bool,

    /// Bearer token, when the vendor requires authentication
    pub auth_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,

    /// Markets served by this vendor; each yields its own sync run
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
}

/// One market/region of a GBFS vendor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketConfig {
    /// GBFS feed root for this market
    pub feed_root: String,

    /// Vendor-service scope for this market; defaults to the vendor key
    pub vendor_slug: Option<String>,
}

/// Configuration of the proprietary GTS integration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GtsVendorConfig {
    /// Whether this integration is enabled
    #[serde(default = "default_vendor_enabled")]
    pub enabled: bool,

    /// API host
    pub api_host: String,

    /// Request timeout in seconds
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,

    /// Community access details; each yields its own sync run
    #[serde(default)]
    pub access: Vec<GtsAccessEntry>,
}

/// One GTS community access detail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GtsAccessEntry {
    /// Scheme key issued by the vendor
    pub scheme_key: String,

    /// Community (market) id
    pub community_id: i64,

    /// Vendor-service scope for this community; defaults to the vendor key
    pub vendor_slug: Option<String>,
}

fn default_vendor_enabled() -> bool {
    true
}

fn default_feed_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Error reading configuration file
    #[error("Failed to read configuration file: {0}")]
    FileRead(String),

    /// Error parsing configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Expand environment variables in a string
///
/// Supports `${VAR_NAME}` syntax
fn expand_env_vars(input: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .expect("Invalid regex pattern for environment variable expansion");

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: Parse complete configuration from YAML
    #[test]
    fn test_parse_complete_yaml_config() {
        let yaml = r#"
database:
  path: "/tmp/test.db"

sync:
  max_concurrent_runs: 8
  run_timeout_secs: 120

vendors:
  lime:
    enabled: true
    auth_token: "token-123"
    timeout_secs: 10
    markets:
      - feed_root: "https://data.lime.example/api/partners/v2/gbfs"
      - feed_root: "https://data.lime.example/api/partners/v2/gbfs_seattle"
        vendor_slug: "lime-seattle"
  lyft:
    enabled: false
    markets:
      - feed_root: "https://gbfs.lyft.example/gbfs/2.3/pdx/en"
  gts:
    enabled: true
    api_host: "https://gtsapi.example.com"
    access:
      - scheme_key: "scheme-1"
        community_id: 2

logging:
  level: "debug"
"#;

        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.database.path, "/tmp/test.db");
        assert_eq!(config.sync.max_concurrent_runs, 8);
        assert_eq!(config.sync.run_timeout_secs, 120);

        let lime = config.vendors.lime.as_ref().unwrap();
        assert!(lime.enabled);
        assert_eq!(lime.auth_token.as_deref(), Some("token-123"));
        assert_eq!(lime.timeout_secs, 10);
        assert_eq!(lime.markets.len(), 2);
        assert_eq!(lime.markets[0].vendor_slug, None);
        assert_eq!(lime.markets[1].vendor_slug.as_deref(), Some("lime-seattle"));

        let lyft = config.vendors.lyft.as_ref().unwrap();
        assert!(!lyft.enabled);

        let gts = config.vendors.gts.as_ref().unwrap();
        assert_eq!(gts.api_host, "https://gtsapi.example.com");
        assert_eq!(gts.access[0].scheme_key, "scheme-1");
        assert_eq!(gts.access[0].community_id, 2);

        assert_eq!(config.logging.level, "debug");
    }

    // Test 2: Default values are applied for missing fields
    #[test]
    fn test_default_values_applied() {
        let yaml = r#"
vendors:
  lime:
    markets:
      - feed_root: "https://data.lime.example/gbfs"
"#;

        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.database.path, "/data/db/mobility-sync.db");
        assert_eq!(config.sync.max_concurrent_runs, 4);
        assert_eq!(config.sync.run_timeout_secs, 300);
        assert_eq!(config.logging.level, "info");

        let lime = config.vendors.lime.as_ref().unwrap();
        assert!(lime.enabled);
        assert_eq!(lime.auth_token, None);
        assert_eq!(lime.timeout_secs, 30);

        assert!(config.vendors.lyft.is_none());
        assert!(config.vendors.gts.is_none());
    }

    // Test 3: Environment variable expansion
    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("TEST_LIME_TOKEN", "env_secret");

        let yaml = r#"
vendors:
  lime:
    auth_token: "${TEST_LIME_TOKEN}"
    markets: []
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(
            config.vendors.lime.unwrap().auth_token.as_deref(),
            Some("env_secret")
        );

        std::env::remove_var("TEST_LIME_TOKEN");
    }

    // Test 4: Unset environment variables are left verbatim
    #[test]
    fn test_unset_env_var_left_verbatim() {
        let yaml = r#"
database:
  path: "${SURELY_NOT_SET_ANYWHERE_42}"
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.database.path, "${SURELY_NOT_SET_ANYWHERE_42}");
    }

    // Test 5: from_env loads config from environment variables
    #[test]
    fn test_from_env() {
        std::env::set_var("MOBILITY_SYNC_DATABASE_PATH", "/env/test.db");
        std::env::set_var("MOBILITY_SYNC_MAX_CONCURRENT_RUNS", "2");
        std::env::set_var("MOBILITY_SYNC_RUN_TIMEOUT_SECS", "60");

        let config = Config::from_env().unwrap();

        assert_eq!(config.database.path, "/env/test.db");
        assert_eq!(config.sync.max_concurrent_runs, 2);
        assert_eq!(config.sync.run_timeout_secs, 60);

        std::env::remove_var("MOBILITY_SYNC_DATABASE_PATH");
        std::env::remove_var("MOBILITY_SYNC_MAX_CONCURRENT_RUNS");
        std::env::remove_var("MOBILITY_SYNC_RUN_TIMEOUT_SECS");
    }

    // Test 6: Parse error for invalid YAML
    #[test]
    fn test_parse_error_invalid_yaml() {
        let yaml = r#"
sync:
  max_concurrent_runs: "not_a_number"
"#;

        let result = Config::from_yaml(yaml);
        match result {
            Err(ConfigError::Parse(msg)) => assert!(msg.contains("Failed to parse YAML")),
            other => panic!("Expected ConfigError::Parse, got {:?}", other),
        }
    }

    // Test 7: Empty YAML results in defaults
    #[test]
    fn test_empty_yaml_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    // Test 8: Config serialization round-trip
    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(config, parsed);
    }
}
