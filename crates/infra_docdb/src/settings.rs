//! Repository settings
//!
//! This module holds the configuration a repository needs to reach its
//! collection: endpoint, access key, database and collection ids, the
//! optional partition-key path and the request timeout.
//!
//! Settings can be built in code, loaded from `DOCDB_`-prefixed environment
//! variables, or loaded from a settings file with environment overrides.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use docdb_kernel::{StoreError, StoreResult};

/// Timeout used when the configured value is missing or not a number
pub const FALLBACK_TIMEOUT: Duration = Duration::from_millis(3);

/// Environment variable prefix used by [`Settings::from_env`]
pub const ENV_PREFIX: &str = "DOCDB";

/// Configuration for a document repository
///
/// # Example
///
/// ```rust
/// use infra_docdb::Settings;
///
/// let settings = Settings::new("https://localhost:8081/", "a2V5", "shop", "orders")
///     .with_partition_key("/customerId")
///     .with_timeout("1500");
///
/// assert_eq!(settings.partition_key_path(), Some("/customerId"));
/// ```
#[derive(Clone, Deserialize)]
pub struct Settings {
    /// Account endpoint URI (e.g. "https://account.documents.azure.com:443/")
    pub endpoint: String,
    /// Base64-encoded master key
    pub key: String,
    /// Database identifier
    pub database_id: String,
    /// Collection identifier
    #[serde(default)]
    pub collection_id: String,
    /// Partition-key path such as "/category"; empty means unpartitioned
    #[serde(default)]
    pub partition_key: Option<String>,
    /// Request timeout in milliseconds, as text
    #[serde(default)]
    pub timeout: Option<String>,
}

impl Settings {
    /// Creates settings for an unpartitioned collection with no timeout configured
    pub fn new(
        endpoint: impl Into<String>,
        key: impl Into<String>,
        database_id: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: key.into(),
            database_id: database_id.into(),
            collection_id: collection_id.into(),
            partition_key: None,
            timeout: None,
        }
    }

    /// Loads settings from `DOCDB_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` if a required variable is missing
    pub fn from_env() -> StoreResult<Self> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| StoreError::configuration(e.to_string()))
    }

    /// Loads settings from a file (TOML, JSON or YAML by extension), with
    /// `DOCDB_*` environment variables taking precedence
    pub fn from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| StoreError::configuration(e.to_string()))
    }

    /// Overrides the collection for this instance
    pub fn for_collection(mut self, collection_id: impl Into<String>) -> Self {
        self.collection_id = collection_id.into();
        self
    }

    /// Overrides the partition-key path for this instance
    pub fn with_partition_key(mut self, path: impl Into<String>) -> Self {
        self.partition_key = Some(path.into());
        self
    }

    /// Clears the partition-key path
    pub fn without_partition_key(mut self) -> Self {
        self.partition_key = None;
        self
    }

    /// Sets the request timeout, in milliseconds, as text
    pub fn with_timeout(mut self, timeout_ms: impl Into<String>) -> Self {
        self.timeout = Some(timeout_ms.into());
        self
    }

    /// The partition-key path, or `None` when unset or empty
    pub fn partition_key_path(&self) -> Option<&str> {
        self.partition_key
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
    }

    /// The effective request timeout
    ///
    /// An unparsable value does not fail; [`FALLBACK_TIMEOUT`] is used instead.
    pub fn request_timeout(&self) -> Duration {
        match self.timeout.as_deref() {
            Some(raw) => parse_timeout(raw).unwrap_or_else(|| {
                warn!(
                    timeout = raw,
                    fallback_ms = FALLBACK_TIMEOUT.as_millis() as u64,
                    "Unparsable request timeout, using fallback"
                );
                FALLBACK_TIMEOUT
            }),
            None => {
                debug!(
                    fallback_ms = FALLBACK_TIMEOUT.as_millis() as u64,
                    "No request timeout configured, using fallback"
                );
                FALLBACK_TIMEOUT
            }
        }
    }

    /// Checks the invariants required before a repository can be built
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` if the endpoint, key, database id or
    /// collection id is empty
    pub fn validate(&self) -> StoreResult<()> {
        let required = [
            ("endpoint", &self.endpoint),
            ("key", &self.key),
            ("database_id", &self.database_id),
            ("collection_id", &self.collection_id),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(StoreError::configuration(format!("{} must not be empty", name)));
            }
        }

        if let Some(path) = self.partition_key_path() {
            if !path.starts_with('/') {
                return Err(StoreError::configuration(format!(
                    "partition key path '{}' must start with '/'",
                    path
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("endpoint", &self.endpoint)
            .field("key", &"<redacted>")
            .field("database_id", &self.database_id)
            .field("collection_id", &self.collection_id)
            .field("partition_key", &self.partition_key)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Upper bound that keeps the nanosecond conversion inside `u64`
const MAX_TIMEOUT_MS: f64 = 1e12;

/// Parses a millisecond count such as "1500" or "2.5"
fn parse_timeout(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|ms| ms.is_finite() && *ms >= 0.0 && *ms < MAX_TIMEOUT_MS)
        .map(|ms| Duration::from_nanos((ms * 1_000_000.0).round() as u64))
}
