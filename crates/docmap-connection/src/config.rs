//! Store configuration
//!
//! A [`StoreConfig`] names the store (URI), the namespace every operation
//! targets, and the pool and retry policies. It can be built in code, read
//! from TOML, or taken from `DOCMAP_*` environment variables.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use docmap_core::{DocmapError, Namespace, Result};
use serde::{Deserialize, Serialize};

use crate::pool::PoolConfig;
use crate::retry::RetryConfig;

pub const ENV_URI: &str = "DOCMAP_URI";
pub const ENV_DATABASE: &str = "DOCMAP_DATABASE";
pub const ENV_COLLECTION: &str = "DOCMAP_COLLECTION";
pub const ENV_POOL_MAX_SIZE: &str = "DOCMAP_POOL_MAX_SIZE";
pub const ENV_POOL_MIN_SIZE: &str = "DOCMAP_POOL_MIN_SIZE";
pub const ENV_ACQUIRE_TIMEOUT_MS: &str = "DOCMAP_ACQUIRE_TIMEOUT_MS";
pub const ENV_OPERATION_TIMEOUT_MS: &str = "DOCMAP_OPERATION_TIMEOUT_MS";
pub const ENV_WRITE_MODE: &str = "DOCMAP_WRITE_MODE";

const DEFAULT_DATABASE: &str = "docmap";
const DEFAULT_COLLECTION: &str = "documents";
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 30_000;

/// What a write operation does when the store rejects it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Return the failure to the caller
    #[default]
    Strict,
    /// Log the failure and report "nothing written"
    BestEffort,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Strict => write!(f, "strict"),
            WriteMode::BestEffort => write!(f, "best_effort"),
        }
    }
}

impl FromStr for WriteMode {
    type Err = DocmapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(WriteMode::Strict),
            "best_effort" | "besteffort" => Ok(WriteMode::BestEffort),
            other => Err(DocmapError::Configuration(format!(
                "unknown write mode '{}', expected 'strict' or 'best_effort'",
                other
            ))),
        }
    }
}

/// Everything needed to reach one collection of one document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store URI, e.g. `mongodb://localhost:27017`
    uri: Option<String>,
    database: String,
    collection: String,
    pool: PoolConfig,
    retry: RetryConfig,
    /// Upper bound for a single document operation, in milliseconds
    operation_timeout_ms: u64,
    write_mode: WriteMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            pool: PoolConfig::default(),
            retry: RetryConfig::default(),
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            write_mode: WriteMode::default(),
        }
    }
}

impl StoreConfig {
    /// Create a configuration for `uri` with default namespace and policies
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Default::default()
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_operation_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.operation_timeout_ms = timeout_ms;
        self
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// The store URI, if one was configured
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn pool(&self) -> &PoolConfig {
        &self.pool
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// The validated namespace operations run against
    pub fn namespace(&self) -> Result<Namespace> {
        Namespace::new(&self.database, &self.collection)
    }

    /// Check everything that can be checked without talking to the store.
    ///
    /// A missing URI is not reported here; it is rejected when the pool is
    /// initialized.
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        self.namespace()?;
        if self.operation_timeout_ms == 0 {
            return Err(DocmapError::Configuration(
                "operation_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse a TOML document
    ///
    /// ```toml
    /// uri = "mongodb://localhost:27017"
    /// database = "app"
    /// collection = "events"
    /// write_mode = "best_effort"
    ///
    /// [pool]
    /// max_size = 20
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| DocmapError::Configuration(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading store configuration");
        Self::from_toml_str(&text)
    }

    /// Build a configuration from `DOCMAP_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`StoreConfig::from_env`], reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(uri) = lookup(ENV_URI).filter(|v| !v.trim().is_empty()) {
            config.uri = Some(uri);
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            config.database = database;
        }
        if let Some(collection) = lookup(ENV_COLLECTION) {
            config.collection = collection;
        }
        if let Some(max_size) = parse_var::<usize>(&lookup, ENV_POOL_MAX_SIZE)? {
            config.pool.set_max_size(max_size);
        }
        if let Some(min_size) = parse_var::<usize>(&lookup, ENV_POOL_MIN_SIZE)? {
            config.pool.set_min_size(min_size);
        }
        if let Some(timeout_ms) = parse_var::<u64>(&lookup, ENV_ACQUIRE_TIMEOUT_MS)? {
            config.pool = config.pool.with_acquire_timeout_ms(timeout_ms);
        }
        if let Some(timeout_ms) = parse_var::<u64>(&lookup, ENV_OPERATION_TIMEOUT_MS)? {
            config.operation_timeout_ms = timeout_ms;
        }
        if let Some(mode) = lookup(ENV_WRITE_MODE) {
            config.write_mode = mode.parse()?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            DocmapError::Configuration(format!("{} has invalid value '{}': {}", key, raw, e))
        }),
    }
}
