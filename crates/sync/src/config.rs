//! Sync configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STONES_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SOAP_USERNAME` - Inventory service user name
//! - `SOAP_PASSWORD` - Inventory service password
//! - `SOAP_API_KEY` - Inventory service API key
//!
//! ## Optional
//! - `SOAP_ENDPOINT` - Inventory service URL (default: the vendor `.asmx` endpoint)
//! - `SOAP_NAMESPACE` - SOAP action namespace (default: `http://tempuri.org/`)
//! - `SOAP_TIMEOUT_SECS` - Request timeout for the stock export (default: 120)
//! - `SYNC_CHUNK_SIZE` - Rows per insert statement (default: 300)
//! - `SYNC_HOST` - Bind address for the trigger server (default: 127.0.0.1)
//! - `SYNC_PORT` - Listen port for the trigger server (default: 3002)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use gemstock_core::STONE_COLUMN_COUNT;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Vendor inventory web service.
pub const DEFAULT_SOAP_ENDPOINT: &str =
    "https://app.barakdiamonds.com/Gemstones/InternetTrade/BarakInventoryWS.asmx";

/// Namespace ASMX services use unless they declare their own.
pub const DEFAULT_SOAP_NAMESPACE: &str = "http://tempuri.org/";

/// Rows per multi-row insert.
pub const DEFAULT_CHUNK_SIZE: usize = 300;

/// Postgres caps a single statement at 65535 bind parameters.
pub const MAX_CHUNK_SIZE: usize = 65_535 / STONE_COLUMN_COUNT;

const DEFAULT_SOAP_TIMEOUT_SECS: u64 = 120;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "enter-",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Sync application configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the trigger server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Inventory SOAP service configuration
    pub soap: SoapConfig,
    /// Rows per insert statement
    pub chunk_size: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Inventory SOAP service configuration.
///
/// Implements `Debug` manually to redact the password and API key.
#[derive(Clone)]
pub struct SoapConfig {
    /// Service endpoint (the `.asmx` URL, without `?wsdl`)
    pub endpoint: Url,
    /// Namespace used for the operation element and `SOAPAction`
    pub namespace: String,
    /// Service user name
    pub username: String,
    /// Service password
    pub password: SecretString,
    /// Service API key
    pub api_key: SecretString,
    /// Request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for SoapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoapConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("namespace", &self.namespace)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = database_url_from_env()?;
        let host = get_env_or_default("SYNC_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SYNC_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SYNC_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SYNC_PORT".to_string(), e.to_string()))?;
        let chunk_size = parse_chunk_size(&get_env_or_default(
            "SYNC_CHUNK_SIZE",
            &DEFAULT_CHUNK_SIZE.to_string(),
        ))?;

        let soap = SoapConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            soap,
            chunk_size,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the trigger server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SoapConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let endpoint = parse_endpoint(&get_env_or_default("SOAP_ENDPOINT", DEFAULT_SOAP_ENDPOINT))?;
        let timeout_secs = get_env_or_default(
            "SOAP_TIMEOUT_SECS",
            &DEFAULT_SOAP_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar("SOAP_TIMEOUT_SECS".to_string(), e.to_string()))?;

        let password = get_required_secret("SOAP_PASSWORD")?;
        let api_key = get_required_secret("SOAP_API_KEY")?;
        warn_if_placeholder(&password, "SOAP_PASSWORD");
        warn_if_placeholder(&api_key, "SOAP_API_KEY");

        Ok(Self {
            endpoint,
            namespace: get_env_or_default("SOAP_NAMESPACE", DEFAULT_SOAP_NAMESPACE),
            username: get_required_env("SOAP_USERNAME")?,
            password,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Load only the stone database URL (`STONES_DATABASE_URL`, then `DATABASE_URL`).
///
/// For commands that talk to the database without the SOAP settings.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("STONES_DATABASE_URL")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse and bound the insert chunk size.
fn parse_chunk_size(raw: &str) -> Result<usize, ConfigError> {
    let size = raw
        .trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::InvalidEnvVar("SYNC_CHUNK_SIZE".to_string(), e.to_string()))?;
    if size == 0 || size > MAX_CHUNK_SIZE {
        return Err(ConfigError::InvalidEnvVar(
            "SYNC_CHUNK_SIZE".to_string(),
            format!("must be between 1 and {MAX_CHUNK_SIZE} (got {size})"),
        ));
    }
    Ok(size)
}

/// Parse the SOAP endpoint, which must be an absolute http(s) URL.
fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("SOAP_ENDPOINT".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "SOAP_ENDPOINT".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Whether a credential looks like an unfilled template value.
fn looks_like_placeholder(secret: &str) -> Option<&'static str> {
    let lower = secret.to_lowercase();
    PLACEHOLDER_PATTERNS
        .iter()
        .find(|pattern| lower.contains(*pattern))
        .copied()
}

/// Vendor-issued credentials can't be rotated by us, so this only warns.
fn warn_if_placeholder(secret: &SecretString, var_name: &str) {
    if let Some(pattern) = looks_like_placeholder(secret.expose_secret()) {
        tracing::warn!("{var_name} appears to be a placeholder (contains '{pattern}')");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn soap_config() -> SoapConfig {
        SoapConfig {
            endpoint: Url::parse(DEFAULT_SOAP_ENDPOINT).unwrap(),
            namespace: DEFAULT_SOAP_NAMESPACE.to_string(),
            username: "gemstones".to_string(),
            password: SecretString::from("super_secret_soap_password"),
            api_key: SecretString::from("super_secret_api_key"),
            timeout: Duration::from_secs(DEFAULT_SOAP_TIMEOUT_SECS),
        }
    }

    #[test]
    fn test_parse_chunk_size_default() {
        assert_eq!(parse_chunk_size("300").unwrap(), 300);
        assert_eq!(parse_chunk_size(" 50 ").unwrap(), 50);
    }

    #[test]
    fn test_parse_chunk_size_rejects_zero() {
        let err = parse_chunk_size("0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_parse_chunk_size_rejects_parameter_overflow() {
        assert_eq!(MAX_CHUNK_SIZE, 1638);
        assert!(parse_chunk_size("1638").is_ok());
        assert!(parse_chunk_size("1639").is_err());
    }

    #[test]
    fn test_parse_chunk_size_rejects_garbage() {
        assert!(parse_chunk_size("three hundred").is_err());
    }

    #[test]
    fn test_parse_endpoint() {
        let url = parse_endpoint(DEFAULT_SOAP_ENDPOINT).unwrap();
        assert_eq!(url.scheme(), "https");
        assert!(parse_endpoint("ftp://example.org/inventory").is_err());
        assert!(parse_endpoint("not a url").is_err());
    }

    #[test]
    fn test_looks_like_placeholder() {
        assert_eq!(looks_like_placeholder("your-password"), Some("your-"));
        assert_eq!(looks_like_placeholder("CHANGEME"), Some("changeme"));
        assert_eq!(looks_like_placeholder("20255588"), None);
    }

    #[test]
    fn test_socket_addr() {
        let config = SyncConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3002,
            soap: soap_config(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3002);
    }

    #[test]
    fn test_soap_config_debug_redacts_secrets() {
        let debug_output = format!("{:?}", soap_config());

        // Public fields should be visible
        assert!(debug_output.contains("BarakInventoryWS.asmx"));
        assert!(debug_output.contains("gemstones"));

        // Secret fields should be redacted
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_soap_password"));
        assert!(!debug_output.contains("super_secret_api_key"));
    }

    #[test]
    fn test_sync_config_debug_redacts_database_url() {
        let config = SyncConfig {
            database_url: SecretString::from("postgres://stones:hunter2@db/stones"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3002,
            soap: soap_config(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
