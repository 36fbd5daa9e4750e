//! # Server Configuration
//!
//! JSON configuration for `campdir serve`. Every field has a default; the
//! JWT secret must come from the file or from `CAMPDIR_JWT_SECRET`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::JwtConfig;

/// Environment variable overriding `jwt_secret`
pub const JWT_SECRET_ENV: &str = "CAMPDIR_JWT_SECRET";

/// Longest accepted token lifetime (ten years)
pub const MAX_JWT_TTL_MINUTES: i64 = 10 * 365 * 24 * 60;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(String),

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 5000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Secret for signing access tokens
    #[serde(default)]
    pub jwt_secret: String,

    /// Access token lifetime in minutes (default: 30 days)
    #[serde(default = "default_jwt_ttl_minutes")]
    pub jwt_ttl_minutes: i64,

    /// Directory receiving bootcamp photos
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Largest accepted photo in bytes
    #[serde(default = "default_max_file_upload")]
    pub max_file_upload: u64,

    /// Fixture directory imported at boot
    #[serde(default)]
    pub seed_dir: Option<PathBuf>,

    /// Zipcode -> coordinates table for the static geocoder
    #[serde(default)]
    pub geocode_table: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_jwt_ttl_minutes() -> i64 {
    30 * 24 * 60
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./public/uploads")
}

fn default_max_file_upload() -> u64 {
    1_000_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            jwt_secret: String::new(),
            jwt_ttl_minutes: default_jwt_ttl_minutes(),
            upload_dir: default_upload_dir(),
            max_file_upload: default_max_file_upload(),
            seed_dir: None,
            geocode_table: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file, apply the environment and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        let config: AppConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let config = config.with_secret_override(std::env::var(JWT_SECRET_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment, for running without a config file
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::default().with_secret_override(std::env::var(JWT_SECRET_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replace the secret when an override is present and non-empty
    pub fn with_secret_override(mut self, secret: Option<String>) -> Self {
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.jwt_secret = secret;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "jwt_secret must be set in the config file or via {}",
                JWT_SECRET_ENV
            )));
        }

        if self.jwt_ttl_minutes <= 0 || self.jwt_ttl_minutes > MAX_JWT_TTL_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "jwt_ttl_minutes must be between 1 and {}",
                MAX_JWT_TTL_MINUTES
            )));
        }

        if self.max_file_upload == 0 {
            return Err(ConfigError::Invalid("max_file_upload must be > 0".to_string()));
        }

        Ok(())
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.jwt_secret.clone(),
            access_token_ttl: Duration::minutes(self.jwt_ttl_minutes),
            ..Default::default()
        }
    }
}
