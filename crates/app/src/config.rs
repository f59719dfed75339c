//! Application configuration loaded from environment variables.
//!
//! Configuration is read once at startup and injected into every component
//! (codec, providers, billing, auth) so each can be built with fake values in
//! tests.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BRICKYARD_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BRICKYARD_BASE_URL` - Public URL of the dashboard (checkout return URLs)
//! - `AUTH_URL` - Managed auth provider base URL
//! - `AUTH_ANON_KEY` - Managed auth provider public API key
//! - `GOOGLE_PLACES_API_KEY` - Places lookup API key
//! - `PROPERTY_API_KEY` - Property-record lookup API key
//! - `STRIPE_SECRET_KEY` - Stripe secret API key
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook signing secret
//!
//! ## Optional
//! - `BRICKYARD_ENCRYPTION_SECRET` - Passphrase for integration secret encryption
//!   (the server refuses to start without it; the CLI only needs it for `secret`)
//! - `BRICKYARD_HOST` - Bind address (default: 127.0.0.1)
//! - `BRICKYARD_PORT` - Listen port (default: 3000)
//! - `PLACES_API_BASE_URL` - default: <https://places.googleapis.com>
//! - `PROPERTY_API_BASE_URL` - default: <https://api.realestateapi.com>
//! - `STRIPE_API_BASE_URL` - default: <https://api.stripe.com>
//! - `BILLING_PRICE_PER_RECORD_CENTS` - default: 10
//! - `BILLING_MINIMUM_CHARGE_CENTS` - default: 4900
//! - `BILLING_CURRENCY` - default: usd
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_TRACES_SAMPLE_RATE` - default: 0.0

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Length of an encryption secret the codec uses as a raw key.
const RAW_KEY_LEN: usize = 32;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
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
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Dashboard API configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the dashboard
    pub base_url: String,
    /// Operator passphrase for the secret codec
    pub encryption_secret: Option<SecretString>,
    /// Managed auth provider configuration
    pub auth: AuthConfig,
    /// Places lookup configuration
    pub places: PlacesConfig,
    /// Property-record lookup configuration
    pub property_records: PropertyRecordsConfig,
    /// Billing provider configuration
    pub billing: BillingConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., production, staging)
    pub sentry_environment: Option<String>,
    /// Fraction of requests traced by Sentry
    pub sentry_traces_sample_rate: f32,
}

/// Managed auth provider configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL (e.g., `https://xyz.supabase.co`)
    pub url: String,
    /// Public API key sent with every auth request
    pub anon_key: SecretString,
}

/// Places lookup configuration.
#[derive(Debug, Clone)]
pub struct PlacesConfig {
    pub base_url: String,
    pub api_key: SecretString,
}

/// Property-record lookup configuration.
#[derive(Debug, Clone)]
pub struct PropertyRecordsConfig {
    pub base_url: String,
    pub api_key: SecretString,
}

/// Stripe billing configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct BillingConfig {
    /// Stripe API base URL
    pub api_base_url: String,
    /// Stripe secret API key
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret
    pub webhook_secret: SecretString,
    /// Price per estimated record, in the currency's minor unit
    pub price_per_record_cents: i64,
    /// Floor applied to every checkout, in the currency's minor unit
    pub minimum_charge_cents: i64,
    /// ISO currency code (lower case)
    pub currency: String,
}

impl std::fmt::Debug for BillingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingConfig")
            .field("api_base_url", &self.api_base_url)
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("price_per_record_cents", &self.price_per_record_cents)
            .field("minimum_charge_cents", &self.minimum_charge_cents)
            .field("currency", &self.currency)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = database_url_from_env()?;
        let host = parse_env("BRICKYARD_HOST", "127.0.0.1")?;
        let port = parse_env("BRICKYARD_PORT", "3000")?;
        let base_url = get_required_env("BRICKYARD_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("BRICKYARD_BASE_URL".to_string(), e.to_string())
        })?;
        let encryption_secret = encryption_secret_from_env()?;

        let auth = AuthConfig {
            url: get_required_env("AUTH_URL")?,
            anon_key: SecretString::from(get_required_env("AUTH_ANON_KEY")?),
        };
        let places = PlacesConfig {
            base_url: get_env_or_default("PLACES_API_BASE_URL", "https://places.googleapis.com"),
            api_key: SecretString::from(get_required_env("GOOGLE_PLACES_API_KEY")?),
        };
        let property_records = PropertyRecordsConfig {
            base_url: get_env_or_default("PROPERTY_API_BASE_URL", "https://api.realestateapi.com"),
            api_key: SecretString::from(get_required_env("PROPERTY_API_KEY")?),
        };
        let billing = BillingConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url: base_url.trim_end_matches('/').to_string(),
            encryption_secret,
            auth,
            places,
            property_records,
            billing,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl BillingConfig {
    /// Load Stripe configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if keys are missing or look like placeholders,
    /// or if the pricing values are not integers.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            api_base_url: get_env_or_default("STRIPE_API_BASE_URL", "https://api.stripe.com"),
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_validated_secret("STRIPE_WEBHOOK_SECRET")?,
            price_per_record_cents: parse_env("BILLING_PRICE_PER_RECORD_CENTS", "10")?,
            minimum_charge_cents: parse_env("BILLING_MINIMUM_CHARGE_CENTS", "4900")?,
            currency: get_env_or_default("BILLING_CURRENCY", "usd").to_lowercase(),
        })
    }
}

/// Load the database URL on its own (used by the CLI).
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();

    // Try primary key first
    if let Ok(value) = std::env::var("BRICKYARD_DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    // Fallback to generic DATABASE_URL (set by Fly.io postgres attach)
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(
        "BRICKYARD_DATABASE_URL".to_string(),
    ))
}

/// Load the codec passphrase, if set.
///
/// Absence is not an error here; [`crate::crypto::SecretCodec::new`] decides.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` if a passphrase is a placeholder or
/// has too little entropy.
pub fn encryption_secret_from_env() -> Result<Option<SecretString>, ConfigError> {
    let _ = dotenvy::dotenv();

    get_optional_env("BRICKYARD_ENCRYPTION_SECRET")
        .map(|value| validate_encryption_secret(value, "BRICKYARD_ENCRYPTION_SECRET"))
        .transpose()
}

/// Strength-check a codec passphrase.
///
/// A value of exactly [`RAW_KEY_LEN`] bytes is used by the codec as the AES
/// key itself. Tokens already stored under such a key must stay decryptable,
/// so it is accepted without the passphrase checks.
fn validate_encryption_secret(
    value: String,
    var_name: &str,
) -> Result<SecretString, ConfigError> {
    if value.len() != RAW_KEY_LEN {
        validate_secret_strength(&value, var_name)?;
    }
    Ok(SecretString::from(value))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
