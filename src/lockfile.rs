//! renv lockfile reader
//!
//! Only the parts needed to build an image are modelled: the R version and the
//! pinned package records. Record fields that are not modelled are kept in
//! `extra` so nothing is silently dropped when a lockfile is re-serialized.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockfileError {
    #[error("Failed to read lockfile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse lockfile: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Lockfile does not declare an R version")]
    MissingRuntimeVersion,
}

/// A package repository declared in the lockfile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "URL")]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeInfo {
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "Repositories", default)]
    pub repositories: Vec<Repository>,
}

/// One pinned package, as recorded in the lockfile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    #[serde(rename = "Package")]
    pub name: String,
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "Source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "Repository", default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(rename = "Hash", default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawLockfile {
    #[serde(rename = "R", default)]
    runtime: RuntimeInfo,
    #[serde(rename = "Packages", default)]
    packages: serde_json::Map<String, serde_json::Value>,
}

/// Parsed lockfile with packages in file order
#[derive(Debug, Clone)]
pub struct Lockfile {
    runtime: RuntimeInfo,
    packages: Vec<PackageRecord>,
}

impl Lockfile {
    pub fn from_path(path: &Path) -> Result<Self, LockfileError> {
        let content = fs::read_to_string(path).map_err(|source| LockfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, LockfileError> {
        content.parse()
    }

    pub fn runtime_version(&self) -> &str {
        self.runtime.version.trim()
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.runtime.repositories
    }

    pub fn packages(&self) -> &[PackageRecord] {
        &self.packages
    }

    pub fn package_names(&self) -> Vec<String> {
        self.packages.iter().map(|p| p.name.clone()).collect()
    }

    pub fn package(&self, name: &str) -> Option<&PackageRecord> {
        self.packages.iter().find(|p| p.name == name)
    }
}

impl FromStr for Lockfile {
    type Err = LockfileError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let raw: RawLockfile = serde_json::from_str(content)?;

        if raw.runtime.version.trim().is_empty() {
            return Err(LockfileError::MissingRuntimeVersion);
        }

        // Keys of the Packages object are authoritative; a record missing its
        // own "Package" field takes the key as its name.
        let packages = raw
            .packages
            .into_iter()
            .map(|(key, mut value)| {
                if let Some(obj) = value.as_object_mut() {
                    obj.entry("Package")
                        .or_insert_with(|| serde_json::Value::String(key.clone()));
                }
                serde_json::from_value::<PackageRecord>(value)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            runtime: raw.runtime,
            packages,
        })
    }
}
