//! Service configuration.
//!
//! Loaded once at startup from an optional `config.*` file with
//! `DOCRELAY__`-prefixed environment overrides (e.g.
//! `DOCRELAY__PROCESSING__WORKER_COUNT=8`).

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// Leading `::` keeps the external crate distinct from this module's path
use ::config::{Config as ConfigBuilder, Environment, File};

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_converter")]
    pub converter: ConverterConfig,

    #[serde(default = "default_processing")]
    pub processing: ProcessingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage locations: database directory, object-store root, key prefixes
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the service database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Root directory of the filesystem object store
    #[serde(default = "default_bucket_root")]
    pub bucket_root: PathBuf,

    /// Key prefix scanned for source documents
    #[serde(default = "default_source_prefix")]
    pub source_prefix: String,

    /// Key prefix converted markdown is published under
    #[serde(default = "default_destination_prefix")]
    pub destination_prefix: String,
}

/// Conversion service endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ConverterConfig {
    #[serde(default = "default_converter_url")]
    pub base_url: String,

    #[serde(default = "default_converter_timeout")]
    pub request_timeout_secs: u64,
}

/// Scheduler and retry policy knobs
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Seconds between automatic source scans
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Concurrency bound for in-flight pipeline runs
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Transient-failure retry budget per processing cycle
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay; doubled per attempt up to the cap
    #[serde(default = "default_retry_base")]
    pub retry_backoff_base_secs: u64,

    #[serde(default = "default_retry_cap")]
    pub retry_backoff_cap_secs: u64,

    /// In-flight documents idle longer than this are treated as interrupted
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,
}

impl AppConfig {
    pub fn load() -> ServiceResult<Self> {
        ConfigBuilder::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("DOCRELAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| ServiceError::Config {
                message: e.to_string(),
            })
    }
}

impl ProcessingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_after_secs as i64)
    }

    /// Exponential backoff for the next retry, capped.
    pub fn retry_backoff(&self, attempts: u32) -> chrono::Duration {
        let exponent = attempts.saturating_sub(1).min(16);
        let secs = self
            .retry_backoff_base_secs
            .saturating_mul(1u64 << exponent)
            .min(self.retry_backoff_cap_secs);
        chrono::Duration::seconds(secs as i64)
    }
}

// ==================== Default Value Functions ====================

pub(crate) fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8070
}

pub(crate) fn default_storage() -> StorageConfig {
    StorageConfig {
        data_dir: default_data_dir(),
        bucket_root: default_bucket_root(),
        source_prefix: default_source_prefix(),
        destination_prefix: default_destination_prefix(),
    }
}

pub(crate) fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

pub(crate) fn default_bucket_root() -> PathBuf {
    PathBuf::from("./data/bucket")
}

pub(crate) fn default_source_prefix() -> String {
    "downloads/".to_string()
}

pub(crate) fn default_destination_prefix() -> String {
    "processed/".to_string()
}

pub(crate) fn default_converter() -> ConverterConfig {
    ConverterConfig {
        base_url: default_converter_url(),
        request_timeout_secs: default_converter_timeout(),
    }
}

pub(crate) fn default_converter_url() -> String {
    "http://localhost:8071/convert".to_string()
}

pub(crate) fn default_converter_timeout() -> u64 {
    120
}

pub(crate) fn default_processing() -> ProcessingConfig {
    ProcessingConfig {
        poll_interval_secs: default_poll_interval(),
        worker_count: default_worker_count(),
        max_attempts: default_max_attempts(),
        retry_backoff_base_secs: default_retry_base(),
        retry_backoff_cap_secs: default_retry_cap(),
        stale_after_secs: default_stale_after(),
    }
}

pub(crate) fn default_poll_interval() -> u64 {
    30
}

pub(crate) fn default_worker_count() -> usize {
    4
}

pub(crate) fn default_max_attempts() -> u32 {
    3
}

pub(crate) fn default_retry_base() -> u64 {
    5
}

pub(crate) fn default_retry_cap() -> u64 {
    300
}

pub(crate) fn default_stale_after() -> u64 {
    600
}
