//! Configuration management for smartsafe-gate
//!
//! This module handles loading, parsing, and validating application configuration
//! from YAML files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::auth::{GateConfig, HashAlgorithm, PasswordHasher, DEFAULT_HASH_COST};
use crate::policy::{AccessPolicy, DEFAULT_PUBLIC_PATHS};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication and access-policy configuration
    #[serde(default)]
    pub security: SecurityConfig,

    /// Secure channel detection
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// OpenTelemetry configuration
    #[serde(default)]
    pub otel: OtelConfig,

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

    /// Load configuration from environment variables with prefix SMARTSAFE_
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Server config from env
        if let Ok(host) = std::env::var("SMARTSAFE_SERVER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("SMARTSAFE_SERVER_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid port number".to_string()))?;
        }

        // Security config from env
        if let Ok(paths) = std::env::var("SMARTSAFE_SECURITY_PUBLIC_PATHS") {
            config.security.public_paths = parse_path_list(&paths);
        }
        if let Ok(algorithm) = std::env::var("SMARTSAFE_SECURITY_HASH_ALGORITHM") {
            config.security.hash_algorithm = match algorithm.to_lowercase().as_str() {
                "bcrypt" => HashAlgorithm::Bcrypt,
                "argon2id" => HashAlgorithm::Argon2id,
                other => {
                    return Err(ConfigError::Parse(format!(
                        "Invalid hash algorithm: {}",
                        other
                    )))
                }
            };
        }
        if let Ok(cost) = std::env::var("SMARTSAFE_SECURITY_HASH_COST") {
            config.security.hash_cost = cost
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid hash cost".to_string()))?;
        }
        if let Ok(timeout) = std::env::var("SMARTSAFE_SECURITY_DIRECTORY_TIMEOUT_MS") {
            config.security.directory_timeout_ms = timeout
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid directory timeout".to_string()))?;
        }
        if let Ok(realm) = std::env::var("SMARTSAFE_SECURITY_REALM") {
            config.security.realm = realm;
        }

        // Channel config from env
        if let Ok(header) = std::env::var("SMARTSAFE_CHANNEL_FORWARDED_PROTO_HEADER") {
            config.channel.forwarded_proto_header = header;
        }
        if let Ok(port) = std::env::var("SMARTSAFE_CHANNEL_HTTPS_PORT") {
            config.channel.https_port = Some(
                port.parse()
                    .map_err(|_| ConfigError::Parse("Invalid HTTPS port".to_string()))?,
            );
        }
        if let Ok(assume) = std::env::var("SMARTSAFE_CHANNEL_ASSUME_SECURE") {
            config.channel.assume_secure = parse_bool("SMARTSAFE_CHANNEL_ASSUME_SECURE", &assume)?;
        }

        // Database config from env
        if let Ok(path) = std::env::var("SMARTSAFE_DATABASE_PATH") {
            config.database.path = path;
        }

        // OTEL config from env
        if let Ok(enabled) = std::env::var("SMARTSAFE_OTEL_ENABLED") {
            config.otel.enabled = parse_bool("SMARTSAFE_OTEL_ENABLED", &enabled)?;
        }
        if let Ok(endpoint) = std::env::var("SMARTSAFE_OTEL_ENDPOINT") {
            config.otel.endpoint = Some(endpoint);
        }

        // Logging config from env
        if let Ok(level) = std::env::var("SMARTSAFE_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("SMARTSAFE_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Check the configuration before startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.security.validate()?;

        if self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("database.path".to_string()));
        }
        if self.channel.forwarded_proto_header.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "channel.forwarded_proto_header must not be empty".to_string(),
            ));
        }
        if self.channel.https_port == Some(0) {
            return Err(ConfigError::InvalidValue(
                "channel.https_port must not be 0".to_string(),
            ));
        }
        if self.otel.enabled && self.otel.endpoint.is_none() {
            return Err(ConfigError::MissingRequired("otel.endpoint".to_string()));
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(ConfigError::InvalidValue(format!(
                "logging.format must be json or pretty: {}",
                other
            ))),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Authentication and access-policy configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityConfig {
    /// Paths reachable without authentication (Ant-style patterns)
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,

    /// Algorithm for newly hashed secrets
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,

    /// bcrypt work factor
    #[serde(default = "default_hash_cost")]
    pub hash_cost: u32,

    /// Upper bound on a single directory lookup in milliseconds
    #[serde(default = "default_directory_timeout_ms")]
    pub directory_timeout_ms: u64,

    /// Realm advertised in the Basic challenge
    #[serde(default = "default_realm")]
    pub realm: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            public_paths: default_public_paths(),
            hash_algorithm: HashAlgorithm::default(),
            hash_cost: default_hash_cost(),
            directory_timeout_ms: default_directory_timeout_ms(),
            realm: default_realm(),
        }
    }
}

impl SecurityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for path in &self.public_paths {
            if path.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "security.public_paths must not contain empty entries".to_string(),
                ));
            }
            if !path.trim().starts_with('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "security.public_paths entries must start with '/': {}",
                    path
                )));
            }
        }

        self.hasher()?;

        if self.directory_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "security.directory_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.realm.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "security.realm must not be empty".to_string(),
            ));
        }
        if self.realm.contains('"') {
            return Err(ConfigError::InvalidValue(
                "security.realm must not contain '\"'".to_string(),
            ));
        }

        Ok(())
    }

    /// Hasher for the configured algorithm and cost
    pub fn hasher(&self) -> Result<PasswordHasher, ConfigError> {
        PasswordHasher::new(self.hash_algorithm, self.hash_cost)
            .map_err(|e| ConfigError::InvalidValue(format!("security.hash_cost: {}", e)))
    }

    /// Authentication gate settings
    pub fn gate_config(&self) -> Result<GateConfig, ConfigError> {
        Ok(GateConfig {
            hasher: self.hasher()?,
            directory_timeout: Duration::from_millis(self.directory_timeout_ms),
        })
    }

    /// Access policy built from the public paths
    pub fn access_policy(&self) -> Result<AccessPolicy, ConfigError> {
        AccessPolicy::with_public_paths(self.public_paths.as_slice())
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }
}

fn default_public_paths() -> Vec<String> {
    DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect()
}

fn default_hash_cost() -> u32 {
    DEFAULT_HASH_COST
}

fn default_directory_timeout_ms() -> u64 {
    5000
}

fn default_realm() -> String {
    "smartsafe".to_string()
}

/// Secure channel detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelConfig {
    /// Header set by the TLS-terminating proxy
    #[serde(default = "default_forwarded_proto_header")]
    pub forwarded_proto_header: String,

    /// Port used in redirect targets (omitted when unset)
    #[serde(default)]
    pub https_port: Option<u16>,

    /// Treat every request as arriving over a secure channel
    #[serde(default)]
    pub assume_secure: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            forwarded_proto_header: default_forwarded_proto_header(),
            https_port: None,
            assume_secure: false,
        }
    }
}

fn default_forwarded_proto_header() -> String {
    "x-forwarded-proto".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`
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
    "/data/db/smartsafe.db".to_string()
}

/// OpenTelemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtelConfig {
    /// Whether OpenTelemetry is enabled
    #[serde(default)]
    pub enabled: bool,

    /// OTLP endpoint URL
    pub endpoint: Option<String>,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            service_name: default_service_name(),
        }
    }
}

fn default_service_name() -> String {
    "smartsafe-gate".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (`json` or `pretty`)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
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

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Split a comma-separated path list
///
/// Empty entries are kept so that `validate` rejects them as it does in YAML.
fn parse_path_list(value: &str) -> Vec<String> {
    value.split(',').map(|p| p.trim().to_string()).collect()
}

/// Parse a boolean environment value (`true`/`false`/`1`/`0`)
fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ConfigError::Parse(format!(
            "Invalid boolean for {}: {}",
            name, other
        ))),
    }
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
