//! Configuration management for lockdock
//!
//! Settings are read from environment variables with sensible defaults.
//! Command-line flags take precedence over anything set here.
//!
//! # Environment Variables
//!
//! - `LOCKDOCK_SYSREQS_URL`: Base URL of the package manager serving the sysreqs
//!   API - default: "https://packagemanager.posit.co"
//! - `LOCKDOCK_SYSREQS_REPO_ID`: Repository id on that server - default: "1"
//! - `LOCKDOCK_REQUEST_TIMEOUT`: Per-package lookup timeout in seconds - default: "30"
//! - `LOCKDOCK_CONCURRENCY`: Maximum concurrent lookups - default: "8"
//! - `LOCKDOCK_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use lockdock::LockdockConfig;
//!
//! let config = LockdockConfig::default();
//! config.validate().expect("Invalid configuration");
//!
//! let resolver = config.create_resolver().expect("resolver");
//! ```

use crate::sysreqs::client::{DEFAULT_BASE_URL, DEFAULT_REPO_ID};
use crate::sysreqs::{
    PackageManagerResolver, ResolveError, ResolveOptions, DEFAULT_CONCURRENCY,
    DEFAULT_TIMEOUT_SECS,
};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;
const MAX_CONCURRENCY: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Resolver initialization failed: {0}")]
    ResolverInitError(#[from] ResolveError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockdockConfig {
    /// Base URL of the sysreqs service
    pub sysreqs_url: String,

    /// Repository id queried on the sysreqs service
    pub sysreqs_repo_id: String,

    /// Per-lookup timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum number of lookups in flight
    pub concurrency: usize,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for LockdockConfig {
    /// Loads from `LOCKDOCK_*` environment variables, falling back to defaults
    /// for anything unset or unparsable.
    fn default() -> Self {
        let sysreqs_url = env::var("LOCKDOCK_SYSREQS_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let sysreqs_repo_id = env::var("LOCKDOCK_SYSREQS_REPO_ID")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REPO_ID.to_string());

        let request_timeout_secs = env::var("LOCKDOCK_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let concurrency = env::var("LOCKDOCK_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_CONCURRENCY);

        let log_level = env::var("LOCKDOCK_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            sysreqs_url,
            sysreqs_repo_id,
            request_timeout_secs,
            concurrency,
            log_level,
        }
    }
}

impl LockdockConfig {
    /// Checks value ranges, the service URL scheme and the log level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::ValidationFailed(format!(
                "Concurrency must be between 1 and {}, got {}",
                MAX_CONCURRENCY, self.concurrency
            )));
        }

        if !(self.sysreqs_url.starts_with("http://") || self.sysreqs_url.starts_with("https://"))
        {
            return Err(ConfigError::ValidationFailed(format!(
                "Sysreqs URL must start with http:// or https://, got {}",
                self.sysreqs_url
            )));
        }

        if self.sysreqs_repo_id.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Sysreqs repository id cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            concurrency: self.concurrency,
            timeout: self.request_timeout(),
        }
    }

    /// Creates the HTTP resolver for the configured sysreqs service
    pub fn create_resolver(&self) -> Result<Arc<PackageManagerResolver>, ConfigError> {
        let resolver = PackageManagerResolver::with_timeout(
            self.sysreqs_url.clone(),
            self.sysreqs_repo_id.clone(),
            self.request_timeout(),
        )?;
        Ok(Arc::new(resolver))
    }

    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();

        map.insert("sysreqs_url".to_string(), self.sysreqs_url.clone());
        map.insert("sysreqs_repo_id".to_string(), self.sysreqs_repo_id.clone());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert("concurrency".to_string(), self.concurrency.to_string());
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for LockdockConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lockdock Configuration:")?;
        writeln!(f, "  Sysreqs URL: {}", self.sysreqs_url)?;
        writeln!(f, "  Sysreqs Repo ID: {}", self.sysreqs_repo_id)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Concurrency: {}", self.concurrency)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
