//! System requirement resolution
//!
//! Each package in a lockfile may need OS libraries (`libxml2-dev`,
//! `libcurl4-openssl-dev`, ...) before it can be installed. A
//! [`RequirementResolver`] answers that question for one package at a time;
//! [`resolve_all`] fans the lookups out with bounded concurrency and hands the
//! results back in lockfile order.
//!
//! A failed lookup never aborts a run. Failures are carried as
//! [`Resolution`] values so they can be reported, then collapsed to empty
//! requirement sets by [`into_requirement_sets`] before aggregation.

pub mod client;
pub mod mock;

pub use client::PackageManagerResolver;
pub use mock::StaticResolver;

use crate::distro::DistroProfile;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
pub enum ResolveError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Sysreqs service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Sysreqs service error: {0}")]
    Api(String),

    #[error("Invalid sysreqs response: {0}")]
    Decode(String),

    #[error("Resolving {package} timed out after {seconds} seconds")]
    Timeout { package: String, seconds: u64 },
}

/// Looks up the OS install commands needed by a single package
#[async_trait]
pub trait RequirementResolver: Send + Sync {
    async fn resolve(
        &self,
        package: &str,
        profile: &DistroProfile,
    ) -> Result<Vec<String>, ResolveError>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Maximum number of lookups in flight
    pub concurrency: usize,
    /// Per-lookup deadline; exceeding it counts as a failed lookup
    pub timeout: Duration,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Outcome of resolving one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub package: String,
    pub outcome: Result<Vec<String>, ResolveError>,
}

impl Resolution {
    pub fn error(&self) -> Option<&ResolveError> {
        self.outcome.as_ref().err()
    }

    pub fn failure(&self) -> Option<ResolutionFailure> {
        self.error().map(|e| ResolutionFailure {
            package: self.package.clone(),
            reason: e.to_string(),
        })
    }
}

/// A package whose requirements could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionFailure {
    pub package: String,
    pub reason: String,
}

pub fn failures(resolutions: &[Resolution]) -> Vec<ResolutionFailure> {
    resolutions.iter().filter_map(Resolution::failure).collect()
}

/// Resolves every package, returning results in the same order as `packages`.
pub async fn resolve_all(
    resolver: &dyn RequirementResolver,
    packages: &[String],
    profile: &DistroProfile,
    options: &ResolveOptions,
) -> Vec<Resolution> {
    debug!(
        resolver = resolver.name(),
        packages = packages.len(),
        concurrency = options.concurrency,
        "Resolving system requirements"
    );

    stream::iter(packages)
        .map(|package| resolve_one(resolver, package, profile, options.timeout))
        .buffered(options.concurrency.max(1))
        .collect()
        .await
}

async fn resolve_one(
    resolver: &dyn RequirementResolver,
    package: &str,
    profile: &DistroProfile,
    timeout: Duration,
) -> Resolution {
    let outcome = match tokio::time::timeout(timeout, resolver.resolve(package, profile)).await {
        Ok(result) => result,
        Err(_) => Err(ResolveError::Timeout {
            package: package.to_string(),
            seconds: timeout.as_secs(),
        }),
    };

    if let Ok(commands) = &outcome {
        debug!(package, commands = commands.len(), "Resolved system requirements");
    }

    Resolution {
        package: package.to_string(),
        outcome,
    }
}

/// Collapses resolutions into requirement sets, one per package.
///
/// Failed lookups become empty sets; the failure is logged here and nowhere
/// else.
pub fn into_requirement_sets(resolutions: &[Resolution]) -> Vec<Vec<String>> {
    resolutions
        .iter()
        .map(|resolution| match &resolution.outcome {
            Ok(commands) => commands.clone(),
            Err(e) => {
                warn!(
                    package = %resolution.package,
                    error = %e,
                    "Could not resolve system requirements, assuming none"
                );
                Vec::new()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distro::Distro;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_resolve_all_preserves_order() {
        let resolver = StaticResolver::new()
            .with_requirements("xml2", &["apt-get install -y libxml2-dev"])
            .with_requirements("curl", &["apt-get install -y libcurl4-openssl-dev"])
            .with_delay("xml2", Duration::from_millis(50));

        let packages = names(&["xml2", "jsonlite", "curl"]);
        let resolutions = resolve_all(
            &resolver,
            &packages,
            &Distro::Focal.profile(),
            &ResolveOptions {
                concurrency: 3,
                timeout: Duration::from_secs(5),
            },
        )
        .await;

        let order: Vec<_> = resolutions.iter().map(|r| r.package.as_str()).collect();
        assert_eq!(order, vec!["xml2", "jsonlite", "curl"]);
        assert_eq!(
            into_requirement_sets(&resolutions),
            vec![
                names(&["apt-get install -y libxml2-dev"]),
                vec![],
                names(&["apt-get install -y libcurl4-openssl-dev"]),
            ]
        );
        assert_eq!(resolver.calls(), 3);
    }

    #[tokio::test]
    async fn test_failures_collapse_to_empty_sets() {
        let resolver = StaticResolver::new()
            .with_requirements("xml2", &["apt-get install -y libxml2-dev"])
            .with_error("broken", ResolveError::Api("unknown package".to_string()));

        let resolutions = resolve_all(
            &resolver,
            &names(&["broken", "xml2"]),
            &Distro::Bionic.profile(),
            &ResolveOptions::default(),
        )
        .await;

        assert!(resolutions[0].error().is_some());
        assert!(resolutions[1].error().is_none());

        let sets = into_requirement_sets(&resolutions);
        assert!(sets[0].is_empty());
        assert_eq!(sets[1], names(&["apt-get install -y libxml2-dev"]));

        let failed = failures(&resolutions);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].package, "broken");
        assert!(failed[0].reason.contains("unknown package"));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let resolver = StaticResolver::new()
            .with_requirements("slow", &["apt-get install -y libslow-dev"])
            .with_delay("slow", Duration::from_secs(10));

        let resolutions = resolve_all(
            &resolver,
            &names(&["slow"]),
            &Distro::Focal.profile(),
            &ResolveOptions {
                concurrency: 1,
                timeout: Duration::from_millis(20),
            },
        )
        .await;

        assert!(matches!(
            resolutions[0].error(),
            Some(ResolveError::Timeout { package, .. }) if package == "slow"
        ));
        assert!(into_requirement_sets(&resolutions)[0].is_empty());
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_resolves() {
        let resolver = StaticResolver::new().with_requirements("a", &["x"]);
        let resolutions = resolve_all(
            &resolver,
            &names(&["a"]),
            &Distro::Focal.profile(),
            &ResolveOptions {
                concurrency: 0,
                timeout: Duration::from_secs(1),
            },
        )
        .await;
        assert_eq!(resolutions[0].outcome, Ok(names(&["x"])));
    }

    #[tokio::test]
    async fn test_empty_package_list() {
        let resolver = StaticResolver::new();
        let resolutions = resolve_all(
            &resolver,
            &[],
            &Distro::Focal.profile(),
            &ResolveOptions::default(),
        )
        .await;
        assert!(resolutions.is_empty());
        assert_eq!(resolver.calls(), 0);
    }

    #[test]
    fn test_resolve_error_display() {
        let err = ResolveError::Timeout {
            package: "xml2".to_string(),
            seconds: 30,
        };
        assert_eq!(err.to_string(), "Resolving xml2 timed out after 30 seconds");

        let err = ResolveError::Status {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "Sysreqs service returned HTTP 404: not found");
    }
}
