//! Configuration management
//!
//! Configuration is loaded from `config.yml` and can be overridden with
//! `UNICMS_*` environment variables. Missing values fall back to defaults,
//! so an absent or empty file yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    /// Settings consumed by the dashboard client
    #[serde(default)]
    pub client: ClientConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the dashboard origin)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Bearer token required on admin routes. Admin routes are open when unset.
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            admin_token: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/unicms.db".to_string()
}

fn default_max_connections() -> u32 {
    20
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Public URL prefix under which uploaded files are served
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            public_prefix: default_public_prefix(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_prefix() -> String {
    "/uploads".to_string()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "image/svg+xml".to_string(),
        "application/pdf".to_string(),
        "video/mp4".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Get file extension for a MIME type
    pub fn get_extension(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            "application/pdf" => "pdf",
            "video/mp4" => "mp4",
            _ => "bin",
        }
    }
}

/// Verification code settings for staged mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Lifetime of an issued code in seconds
    #[serde(default = "default_code_ttl")]
    pub code_ttl_seconds: u64,
    /// Return the code in the API response (demo behaviour)
    #[serde(default = "default_expose_code")]
    pub expose_code: bool,
    /// Wrong codes accepted before the challenge is dropped
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Optional SMTP delivery of codes
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_seconds: default_code_ttl(),
            expose_code: default_expose_code(),
            max_attempts: default_max_attempts(),
            smtp: None,
        }
    }
}

fn default_code_ttl() -> u64 {
    600
}

fn default_expose_code() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

/// SMTP relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address
    pub from: String,
    /// Recipient of verification codes
    pub to: String,
}

fn default_smtp_port() -> u16 {
    587
}

/// Dashboard client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend, also used to build public form links
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Pending-submission count polling interval
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

fn default_api_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - UNICMS_SERVER_HOST, UNICMS_SERVER_PORT, UNICMS_SERVER_CORS_ORIGIN
    /// - UNICMS_SERVER_ADMIN_TOKEN
    /// - UNICMS_DATABASE_URL
    /// - UNICMS_CACHE_TTL_SECONDS
    /// - UNICMS_UPLOAD_PATH
    /// - UNICMS_VERIFICATION_EXPOSE_CODE, UNICMS_VERIFICATION_MAX_ATTEMPTS
    /// - UNICMS_API_URL
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("UNICMS_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("UNICMS_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("UNICMS_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }
        if let Ok(token) = std::env::var("UNICMS_SERVER_ADMIN_TOKEN") {
            self.server.admin_token = if token.is_empty() { None } else { Some(token) };
        }

        if let Ok(url) = std::env::var("UNICMS_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("UNICMS_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        if let Ok(path) = std::env::var("UNICMS_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }

        if let Ok(expose) = std::env::var("UNICMS_VERIFICATION_EXPOSE_CODE") {
            match expose.to_lowercase().as_str() {
                "true" | "1" | "yes" => self.verification.expose_code = true,
                "false" | "0" | "no" => self.verification.expose_code = false,
                _ => {} // Ignore invalid values
            }
        }

        if let Ok(attempts) = std::env::var("UNICMS_VERIFICATION_MAX_ATTEMPTS") {
            if let Ok(attempts) = attempts.parse::<u32>() {
                if attempts > 0 {
                    self.verification.max_attempts = attempts;
                }
            }
        }

        if let Ok(api_url) = std::env::var("UNICMS_API_URL") {
            self.client.api_url = api_url;
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "UNICMS_SERVER_HOST",
    "UNICMS_SERVER_PORT",
    "UNICMS_SERVER_CORS_ORIGIN",
    "UNICMS_SERVER_ADMIN_TOKEN",
    "UNICMS_DATABASE_URL",
    "UNICMS_CACHE_TTL_SECONDS",
    "UNICMS_UPLOAD_PATH",
    "UNICMS_VERIFICATION_EXPOSE_CODE",
    "UNICMS_VERIFICATION_MAX_ATTEMPTS",
    "UNICMS_API_URL",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}
