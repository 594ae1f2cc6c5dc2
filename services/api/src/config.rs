//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// Upper bound for `TOKEN_TTL_HOURS`: one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// SMTP relay settings. Absent when `SMTP_HOST` is not set.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    pub log_level: Level,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub owner_email: String,
    pub mail_from: String,
    pub smtp: Option<SmtpConfig>,
    pub cors_origin: String,
    pub upload_dir: String,
    pub public_files_url: String,
    pub max_upload_bytes: usize,
}

// Keeps the signing secret and SMTP password out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("max_connections", &self.max_connections)
            .field("log_level", &self.log_level)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("owner_email", &self.owner_email)
            .field("mail_from", &self.mail_from)
            .field("smtp_host", &self.smtp.as_ref().map(|s| s.host.as_str()))
            .field("cors_origin", &self.cors_origin)
            .field("upload_dir", &self.upload_dir)
            .field("public_files_url", &self.public_files_url)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required =
            |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        // --- Server and Database Settings ---
        let bind_address = parse(
            "BIND_ADDRESS",
            &lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        )?;
        let database_url = required("DATABASE_URL")?;
        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => parse("DATABASE_MAX_CONNECTIONS", &value)?,
            None => 5,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Auth Settings ---
        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < 16 {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                "must be at least 16 characters".to_string(),
            ));
        }
        let token_ttl_hours: i64 = match lookup("TOKEN_TTL_HOURS") {
            Some(value) => parse("TOKEN_TTL_HOURS", &value)?,
            None => 24,
        };
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&token_ttl_hours) {
            return Err(ConfigError::InvalidValue(
                "TOKEN_TTL_HOURS".to_string(),
                format!("must be between 1 and {MAX_TOKEN_TTL_HOURS}"),
            ));
        }

        // --- Notification Settings ---
        let owner_email = required("OWNER_EMAIL")?;
        let mail_from = lookup("MAIL_FROM").unwrap_or_else(|| owner_email.clone());
        let smtp = match lookup("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: match lookup("SMTP_PORT") {
                    Some(value) => parse("SMTP_PORT", &value)?,
                    None => 587,
                },
                username: lookup("SMTP_USERNAME"),
                password: lookup("SMTP_PASSWORD"),
            }),
            None => None,
        };

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Upload Settings ---
        let upload_dir = lookup("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string());
        let public_files_url = lookup("PUBLIC_FILES_URL")
            .unwrap_or_else(|| format!("http://{bind_address}/files"));
        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(value) => parse("MAX_UPLOAD_BYTES", &value)?,
            None => 20 * 1024 * 1024,
        };

        Ok(Self {
            bind_address,
            database_url,
            max_connections,
            log_level,
            jwt_secret,
            token_ttl_hours,
            owner_email,
            mail_from,
            smtp,
            cors_origin,
            upload_dir,
            public_files_url,
            max_upload_bytes,
        })
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
