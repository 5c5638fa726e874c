//! lockdock - Dockerfile generation for renv-locked R projects
//!
//! This library turns an `renv.lock` file into a Dockerfile that reproduces the
//! locked environment: an R base image tagged with the locked R version, the
//! operating system libraries the packages need, and an `renv::restore()` of
//! the exact package set.
//!
//! # Core Concepts
//!
//! - **Lockfile**: The renv snapshot, parsed by [`lockfile::Lockfile`]
//! - **Distro**: A supported target distribution with its package manager
//!   command templates
//! - **Requirement resolution**: Per-package lookup of the shell commands that
//!   install system dependencies, behind the [`RequirementResolver`] trait
//! - **Aggregation**: Merging per-package command sets into one compact
//!   install or an expanded list of RUN steps
//!
//! # Example Usage
//!
//! ```ignore
//! use lockdock::{generate, GenerateOptions, Lockfile, LockdockConfig};
//! use std::path::Path;
//!
//! async fn dockerfile_for(path: &Path) -> anyhow::Result<String> {
//!     let lockfile = Lockfile::from_path(path)?;
//!     let config = LockdockConfig::default();
//!     let resolver = config.create_resolver()?;
//!
//!     let options = GenerateOptions::for_distro("focal")?;
//!     let generation = generate(&lockfile, &options, resolver.as_ref()).await?;
//!     Ok(generation.script.render())
//! }
//! ```

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod distro;
pub mod generate;
pub mod lockfile;
pub mod output;
pub mod sysreqs;
pub mod util;

pub use aggregate::{aggregate, AggregationMode, CommandPlan};
pub use config::{ConfigError, LockdockConfig};
pub use distro::{Distro, DistroError, DistroProfile};
pub use generate::{generate, GenerateError, GenerateOptions, Generation};
pub use lockfile::{Lockfile, LockfileError, PackageRecord, Repository};
pub use output::{BuildScript, Instruction};
pub use sysreqs::{
    PackageManagerResolver, RequirementResolver, ResolveError, ResolveOptions, StaticResolver,
};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
