//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Token signing configuration.
    pub auth: AuthConfig,
    /// Uploaded image storage.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens.
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_jwt_lifetime_secs")]
    pub jwt_lifetime_secs: u64,
}

/// Local image storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory uploaded files are written to.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// URL prefix uploaded files are served under.
    #[serde(default = "default_upload_base_url")]
    pub base_url: String,
    /// Largest accepted upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            base_url: default_upload_base_url(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    5000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_jwt_lifetime_secs() -> u64 {
    30 * 24 * 60 * 60
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./public/uploads")
}

fn default_upload_base_url() -> String {
    "/uploads".to_string()
}

const fn default_max_upload_bytes() -> usize {
    1024 * 1024
}

/// JWT secret shipped in `config/default.toml`.
pub const PLACEHOLDER_JWT_SECRET: &str = "change-me";

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `SCRIBE_ENV`)
    /// 4. Environment variables with `SCRIBE__` prefix, e.g. `SCRIBE__AUTH__JWT_SECRET`
    pub fn load() -> Result<Self, config::ConfigError> {
        // A missing .env is the normal production case.
        let _ = dotenvy::dotenv();

        let env = std::env::var("SCRIBE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SCRIBE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.check_secrets(&env)?;
        Ok(config)
    }

    /// Refuse the shipped placeholder JWT secret outside development.
    pub fn check_secrets(&self, env: &str) -> Result<(), config::ConfigError> {
        if env != "development" && self.auth.jwt_secret == PLACEHOLDER_JWT_SECRET {
            return Err(config::ConfigError::Message(format!(
                "auth.jwt_secret is still the placeholder; set SCRIBE__AUTH__JWT_SECRET for the {env} environment"
            )));
        }
        Ok(())
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("SCRIBE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
