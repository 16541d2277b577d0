//! Configuration management
//!
//! Configuration is loaded from a `config.yml` file, with environment
//! variables (prefixed `AGORA_`) overriding file values. Every key has a
//! default, so a missing or empty file yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token and session configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Attachment upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Content rules enforced on posts and comments
    #[serde(default)]
    pub moderation: ModerationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
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
    /// SQLite database path or URL (`:memory:` for an in-memory database)
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/agora.db".to_string()
}

/// Token and session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Token (and session) lifetime in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

/// Placeholder secret shipped in the defaults; never use it in production
pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

/// Upper bound for `auth.token_ttl_hours` (ten years)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

fn default_token_ttl_hours() -> i64 {
    24 * 7
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
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
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
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
        "application/pdf".to_string(),
        "text/plain".to_string(),
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
            "application/pdf" => "pdf",
            "text/plain" => "txt",
            _ => "bin",
        }
    }
}

/// Content rules for posts and comments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// How long after creation a comment may still be edited by its author
    #[serde(default = "default_edit_window")]
    pub comment_edit_window_minutes: i64,
    /// Maximum comment length in characters
    #[serde(default = "default_comment_max_length")]
    pub comment_max_length: usize,
    /// Words rejected in posts and comments (case-insensitive substring match)
    #[serde(default = "default_forbidden_words")]
    pub forbidden_words: Vec<String>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            comment_edit_window_minutes: default_edit_window(),
            comment_max_length: default_comment_max_length(),
            forbidden_words: default_forbidden_words(),
        }
    }
}

/// Upper bound for `moderation.comment_edit_window_minutes` (one year)
pub const MAX_EDIT_WINDOW_MINUTES: i64 = 60 * 24 * 365;

fn default_edit_window() -> i64 {
    15
}

fn default_comment_max_length() -> usize {
    2000
}

fn default_forbidden_words() -> Vec<String> {
    vec![
        "spam".to_string(),
        "scam".to_string(),
        "phishing".to_string(),
    ]
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
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
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

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - AGORA_SERVER_HOST
    /// - AGORA_SERVER_PORT
    /// - AGORA_SERVER_CORS_ORIGIN
    /// - AGORA_DATABASE_URL
    /// - AGORA_AUTH_JWT_SECRET
    /// - AGORA_AUTH_TOKEN_TTL_HOURS
    /// - AGORA_UPLOAD_PATH
    /// - AGORA_MODERATION_EDIT_WINDOW_MINUTES
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("AGORA_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("AGORA_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("AGORA_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("AGORA_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(secret) = std::env::var("AGORA_AUTH_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(ttl) = std::env::var("AGORA_AUTH_TOKEN_TTL_HOURS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.auth.token_ttl_hours = ttl;
            }
        }

        if let Ok(path) = std::env::var("AGORA_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }

        if let Ok(window) = std::env::var("AGORA_MODERATION_EDIT_WINDOW_MINUTES") {
            if let Ok(window) = window.parse::<i64>() {
                self.moderation.comment_edit_window_minutes = window;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.auth.token_ttl_hours) {
            return Err(ConfigError::ValidationError(format!(
                "auth.token_ttl_hours must be between 1 and {}",
                MAX_TOKEN_TTL_HOURS
            )));
        }
        if !(0..=MAX_EDIT_WINDOW_MINUTES).contains(&self.moderation.comment_edit_window_minutes) {
            return Err(ConfigError::ValidationError(format!(
                "moderation.comment_edit_window_minutes must be between 0 and {}",
                MAX_EDIT_WINDOW_MINUTES
            )));
        }
        Ok(())
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

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_KEYS: &[&str] = &[
        "AGORA_SERVER_HOST",
        "AGORA_SERVER_PORT",
        "AGORA_SERVER_CORS_ORIGIN",
        "AGORA_DATABASE_URL",
        "AGORA_AUTH_JWT_SECRET",
        "AGORA_AUTH_TOKEN_TTL_HOURS",
        "AGORA_UPLOAD_PATH",
        "AGORA_MODERATION_EDIT_WINDOW_MINUTES",
    ];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        let guard = super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
        guard
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "data/agora.db");
        assert_eq!(config.auth.token_ttl_hours, 168);
        assert_eq!(config.moderation.comment_edit_window_minutes, 15);
        assert_eq!(config.moderation.comment_max_length, 2000);
        assert!(!config.moderation.forbidden_words.is_empty());
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upload.path, PathBuf::from("uploads"));
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "moderation:\n  comment_edit_window_minutes: 5\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.moderation.comment_edit_window_minutes, 5);
        assert_eq!(config.moderation.comment_max_length, 2000);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"
server:
  host: "127.0.0.1"
  port: 9000
database:
  url: "board.db"
auth:
  jwt_secret: "s3cret"
  token_ttl_hours: 12
upload:
  path: "files"
  max_file_size: 1024
  allowed_types: ["image/png"]
moderation:
  comment_edit_window_minutes: 30
  comment_max_length: 500
  forbidden_words: ["foo", "bar"]
"#).unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.url, "board.db");
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.token_ttl_hours, 12);
        assert_eq!(config.upload.path, PathBuf::from("files"));
        assert!(config.upload.is_type_allowed("image/png"));
        assert!(!config.upload.is_type_allowed("image/jpeg"));
        assert_eq!(config.moderation.comment_max_length, 500);
        assert_eq!(config.moderation.forbidden_words, vec!["foo", "bar"]);
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn test_load_rejects_empty_secret() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "auth:\n  jwt_secret: \"\"\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("jwt_secret"));
    }

    #[test]
    fn test_load_rejects_out_of_range_durations() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "auth:\n  token_ttl_hours: 9223372036854775807\n").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("token_ttl_hours"));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "moderation:\n  comment_edit_window_minutes: 9000000000000000\n").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("comment_edit_window_minutes"));
    }

    #[test]
    fn test_env_override_out_of_range_ttl_rejected() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();
        std::env::set_var("AGORA_AUTH_TOKEN_TTL_HOURS", "9000000000000");

        let result = Config::load_with_env(file.path());

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
        assert!(result.is_err());
    }

    #[test]
    fn test_env_override_server_and_auth() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("AGORA_SERVER_HOST", "192.168.1.1");
        std::env::set_var("AGORA_SERVER_PORT", "4000");
        std::env::set_var("AGORA_AUTH_JWT_SECRET", "from-env");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.auth.jwt_secret, "from-env");

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_override_invalid_numbers_ignored() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("AGORA_SERVER_PORT", "not_a_number");
        std::env::set_var("AGORA_MODERATION_EDIT_WINDOW_MINUTES", "soon");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.moderation.comment_edit_window_minutes, 15);

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_upload_extension_mapping() {
        let upload = UploadConfig::default();
        assert_eq!(upload.get_extension("image/png"), "png");
        assert_eq!(upload.get_extension("application/pdf"), "pdf");
        assert_eq!(upload.get_extension("application/x-unknown"), "bin");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn config_roundtrip_through_yaml(
            port in 1u16..=65535,
            window in 0i64..=240,
            max_len in 1usize..=10_000,
        ) {
            let mut config = Config::default();
            config.server.port = port;
            config.moderation.comment_edit_window_minutes = window;
            config.moderation.comment_max_length = max_len;

            let yaml = serde_yaml::to_string(&config).unwrap();
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "{}", yaml).unwrap();

            let loaded = Config::load(file.path()).unwrap();
            prop_assert_eq!(loaded.server.port, port);
            prop_assert_eq!(loaded.moderation.comment_edit_window_minutes, window);
            prop_assert_eq!(loaded.moderation.comment_max_length, max_len);
        }

        #[test]
        fn missing_sections_get_defaults(port in 1u16..=65535) {
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "server:\n  port: {}\n", port).unwrap();

            let loaded = Config::load(file.path()).unwrap();
            prop_assert_eq!(loaded.server.port, port);
            prop_assert_eq!(loaded.moderation.comment_edit_window_minutes, 15);
            prop_assert_eq!(loaded.auth.token_ttl_hours, 168);
        }
    }
}
