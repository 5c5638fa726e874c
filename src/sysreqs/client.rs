//! HTTP client for the Posit Package Manager sysreqs API
//!
//! The service maps an R package name plus a target distribution to the shell
//! commands that install the package's system dependencies:
//!
//! ```text
//! GET {base}/__api__/repos/{repo}/sysreqs?all=false&pkgname=xml2&distribution=ubuntu&release=20.04
//! ```
//!
//! Successful answers are memoized for the lifetime of the client, so
//! regenerating for the same distro never asks twice.

use super::{RequirementResolver, ResolveError, DEFAULT_TIMEOUT_SECS};
use crate::aggregate::unique_in_order;
use crate::distro::DistroProfile;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_BASE_URL: &str = "https://packagemanager.posit.co";
pub const DEFAULT_REPO_ID: &str = "1";

#[derive(Debug, Default, Deserialize)]
struct SysreqsResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    pre_install: Vec<serde_json::Value>,
    #[serde(default)]
    install_scripts: Vec<serde_json::Value>,
    #[serde(default)]
    requirements: Vec<PackageRequirements>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageRequirements {
    #[serde(default)]
    name: String,
    #[serde(default)]
    requirements: RequirementDetail,
}

#[derive(Debug, Default, Deserialize)]
struct RequirementDetail {
    #[serde(default)]
    packages: Vec<String>,
    #[serde(default)]
    pre_install: Vec<serde_json::Value>,
    #[serde(default)]
    install_scripts: Vec<serde_json::Value>,
}

impl SysreqsResponse {
    /// Pre-install commands first, then install scripts, without repeats.
    fn into_commands(self) -> Result<Vec<String>, ResolveError> {
        if let Some(error) = self.error {
            return Err(ResolveError::Api(error));
        }

        let mut pre_install = command_strings(&self.pre_install);
        let mut install_scripts = command_strings(&self.install_scripts);

        for requirement in &self.requirements {
            trace!(
                dependency = %requirement.name,
                packages = ?requirement.requirements.packages,
                "sysreqs entry"
            );
            pre_install.extend(command_strings(&requirement.requirements.pre_install));
            install_scripts.extend(command_strings(&requirement.requirements.install_scripts));
        }

        Ok(unique_in_order(pre_install.into_iter().chain(install_scripts)))
    }
}

/// Accepts both plain command strings and `{"command": "..."}` objects.
fn command_strings(values: &[serde_json::Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|value| match value {
            serde_json::Value::String(s) => Some(s.as_str()),
            serde_json::Value::Object(obj) => obj.get("command").and_then(|c| c.as_str()),
            _ => None,
        })
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

type CacheKey = (String, &'static str, &'static str);

pub struct PackageManagerResolver {
    base_url: String,
    repo_id: String,
    http_client: Client,
    cache: Mutex<HashMap<CacheKey, Vec<String>>>,
}

impl PackageManagerResolver {
    pub fn new(
        base_url: impl Into<String>,
        repo_id: impl Into<String>,
    ) -> Result<Self, ResolveError> {
        Self::with_timeout(base_url, repo_id, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        repo_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ResolveError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lockdock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResolveError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            repo_id: repo_id.into(),
            http_client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/__api__/repos/{}/sysreqs", self.base_url, self.repo_id)
    }

    fn cached(&self, key: &CacheKey) -> Option<Vec<String>> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    fn remember(&self, key: CacheKey, commands: &[String]) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, commands.to_vec());
        }
    }

    async fn fetch(
        &self,
        package: &str,
        profile: &DistroProfile,
    ) -> Result<Vec<String>, ResolveError> {
        let url = self.endpoint();
        debug!(
            package,
            os = profile.os,
            release = profile.release,
            "Querying {}",
            url
        );

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("all", "false"),
                ("pkgname", package),
                ("distribution", profile.os),
                ("release", profile.release),
            ])
            .send()
            .await
            .map_err(|e| ResolveError::Network {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ResolveError::Network {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            // The service reports unknown packages as an error payload; surface
            // its message when there is one.
            if let Ok(parsed) = serde_json::from_str::<SysreqsResponse>(&body) {
                if let Some(error) = parsed.error {
                    return Err(ResolveError::Api(error));
                }
            }
            return Err(ResolveError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SysreqsResponse =
            serde_json::from_str(&body).map_err(|e| ResolveError::Decode(e.to_string()))?;
        parsed.into_commands()
    }
}

#[async_trait]
impl RequirementResolver for PackageManagerResolver {
    async fn resolve(
        &self,
        package: &str,
        profile: &DistroProfile,
    ) -> Result<Vec<String>, ResolveError> {
        let key = (package.to_string(), profile.os, profile.release);
        if let Some(commands) = self.cached(&key) {
            trace!(package, "sysreqs cache hit");
            return Ok(commands);
        }

        let commands = self.fetch(package, profile).await?;
        self.remember(key, &commands);
        Ok(commands)
    }

    fn name(&self) -> &str {
        "packagemanager"
    }
}
