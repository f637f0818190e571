//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; an unset database URL selects the in-memory
//! document store and an unset API key disables the writing assistant.
//!
//! - `KATHA_HOST` - Bind address (default: 127.0.0.1)
//! - `KATHA_PORT` - Listen port (default: 3000)
//! - `KATHA_BASE_URL` - Public URL; `https://` turns on secure cookies
//!   (default: `http://localhost:3000`)
//! - `KATHA_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//! - `KATHA_UPLOADS_DIR` - Cover image directory (default: uploads)
//! - `KATHA_ADMIN_EMAILS` - Comma-separated emails that become admins at sign-up
//! - `KATHA_RATE_LIMIT` - Per-IP rate limits on auth and AI routes (default: true)
//! - `KATHA_LOG_JSON` - Emit JSON logs (default: false)
//! - `ANTHROPIC_API_KEY` - Model provider key
//! - `ANTHROPIC_MODEL` - Model id (default: claude-sonnet-4-20250514)
//! - `ANTHROPIC_BASE_URL` - Provider base URL (default: <https://api.anthropic.com>)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE` - Error tracking

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

use katha_vault_core::Email;

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Katha Vault server configuration.
#[derive(Debug, Clone)]
pub struct KathaConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// `PostgreSQL` connection URL; `None` selects the in-memory store
    pub database_url: Option<SecretString>,
    /// Directory that receives uploaded cover images
    pub uploads_dir: PathBuf,
    /// Accounts created with one of these emails get the admin role
    pub admin_emails: Vec<Email>,
    /// Whether auth and AI routes are rate limited per client IP
    pub rate_limit: bool,
    /// Emit JSON-formatted logs
    pub log_json: bool,
    /// Model provider configuration; `None` disables the writing assistant
    pub claude: Option<ClaudeConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry performance sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Anthropic Messages API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ClaudeConfig {
    /// Anthropic API key
    pub api_key: SecretString,
    /// Model ID (e.g., claude-sonnet-4-20250514)
    pub model: String,
    /// Base URL of the Messages API, without the `/v1/messages` path
    pub base_url: String,
}

impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for KathaConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: "http://localhost:3000".to_owned(),
            database_url: None,
            uploads_dir: PathBuf::from("uploads"),
            admin_emails: Vec::new(),
            rate_limit: true,
            log_json: false,
            claude: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }
}

impl KathaConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed or the API key
    /// fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("KATHA_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("KATHA_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("KATHA_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("KATHA_PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("KATHA_BASE_URL", "http://localhost:3000");
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("KATHA_BASE_URL".to_string(), e.to_string()))?;

        let admin_emails = parse_admin_emails(&get_env_or_default("KATHA_ADMIN_EMAILS", ""))?;

        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            base_url,
            database_url: get_database_url("KATHA_DATABASE_URL"),
            uploads_dir: PathBuf::from(get_env_or_default("KATHA_UPLOADS_DIR", "uploads")),
            admin_emails,
            rate_limit: get_bool_env("KATHA_RATE_LIMIT", true)?,
            log_json: get_bool_env("KATHA_LOG_JSON", false)?,
            claude: ClaudeConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must be marked `Secure`.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Whether `email` is on the admin list.
    #[must_use]
    pub fn is_admin_email(&self, email: &Email) -> bool {
        self.admin_emails.contains(email)
    }
}

impl ClaudeConfig {
    /// Load provider configuration.
    ///
    /// Returns `None` if `ANTHROPIC_API_KEY` is not set (assistant disabled).
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(key) = get_optional_env("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty())
        else {
            return Ok(None);
        };
        validate_secret_strength(&key, "ANTHROPIC_API_KEY")?;

        let base_url = get_env_or_default("ANTHROPIC_BASE_URL", DEFAULT_ANTHROPIC_BASE_URL);
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("ANTHROPIC_BASE_URL".to_string(), e.to_string())
        })?;

        Ok(Some(Self {
            api_key: SecretString::from(key),
            model: get_env_or_default("ANTHROPIC_MODEL", DEFAULT_MODEL),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a boolean flag (`1/true/yes/on`, `0/false/no/off`).
fn get_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_optional_env(key) {
        None => Ok(default),
        Some(value) => parse_bool(&value)
            .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), format!("not a boolean: {value}"))),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse the comma-separated admin email list.
fn parse_admin_emails(raw: &str) -> Result<Vec<Email>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Email::parse(s).map_err(|e| {
                ConfigError::InvalidEnvVar("KATHA_ADMIN_EMAILS".to_string(), e.to_string())
            })
        })
        .collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
