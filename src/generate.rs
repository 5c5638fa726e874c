//! Build script generation from a lockfile
//!
//! The generated script:
//!
//! 1. starts from `{from}:{R version}`
//! 2. installs the OS libraries the locked packages need
//! 3. points R at the configured package repositories
//! 4. installs the locked renv version
//! 5. copies the lockfile in and restores it

use crate::aggregate::{aggregate, AggregationMode, CommandPlan};
use crate::distro::{Distro, DistroError};
use crate::lockfile::{Lockfile, Repository};
use crate::output::dockerfile::BuildScript;
use crate::sysreqs::{
    self, into_requirement_sets, resolve_all, RequirementResolver, ResolutionFailure,
    ResolveOptions,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_IMAGE: &str = "rocker/r-base";
pub const DEFAULT_CRAN_URL: &str = "https://cran.rstudio.com/";
pub const DEFAULT_LOCKFILE_NAME: &str = "renv.lock";
pub const DEFAULT_NCPUS: u32 = 4;

const RPROFILE_PATHS: [&str; 2] = [
    "/usr/local/lib/R/etc/Rprofile.site",
    "/usr/lib/R/etc/Rprofile.site",
];

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Distro(#[from] DistroError),

    #[error("Invalid repository '{0}'. Expected NAME=URL")]
    InvalidRepository(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub distro: Distro,
    /// Base image name; the lockfile's R version becomes its tag
    pub from: String,
    /// Optional build stage name
    pub alias: Option<String>,
    /// Resolve system requirements for the locked packages
    pub sysreqs: bool,
    pub mode: AggregationMode,
    /// OS packages to install in addition to the resolved ones
    pub extra_sysreqs: Vec<String>,
    pub repos: Vec<Repository>,
    /// Overrides the renv version recorded in the lockfile
    pub renv_version: Option<String>,
    pub use_pak: bool,
    /// Lockfile path relative to the build context
    pub lockfile_name: String,
    pub resolve: ResolveOptions,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            distro: Distro::default(),
            from: DEFAULT_BASE_IMAGE.to_string(),
            alias: None,
            sysreqs: true,
            mode: AggregationMode::Compact,
            extra_sysreqs: Vec::new(),
            repos: vec![default_repository()],
            renv_version: None,
            use_pak: false,
            lockfile_name: DEFAULT_LOCKFILE_NAME.to_string(),
            resolve: ResolveOptions::default(),
        }
    }
}

impl GenerateOptions {
    /// Default options for the named distro, rejecting unknown names.
    pub fn for_distro(name: &str) -> Result<Self, GenerateError> {
        Ok(Self {
            distro: name.parse()?,
            ..Default::default()
        })
    }

    pub fn validate(&self) -> Result<(), GenerateError> {
        if self.from.trim().is_empty() {
            return Err(GenerateError::InvalidOptions(
                "Base image cannot be empty".to_string(),
            ));
        }
        if self.lockfile_name.trim().is_empty() {
            return Err(GenerateError::InvalidOptions(
                "Lockfile name cannot be empty".to_string(),
            ));
        }
        if self.repos.is_empty() {
            return Err(GenerateError::InvalidOptions(
                "At least one package repository is required".to_string(),
            ));
        }
        if let Some(repo) = self
            .repos
            .iter()
            .find(|r| r.name.trim().is_empty() || r.url.trim().is_empty())
        {
            return Err(GenerateError::InvalidRepository(format!(
                "{}={}",
                repo.name, repo.url
            )));
        }
        Ok(())
    }
}

pub fn default_repository() -> Repository {
    Repository {
        name: "CRAN".to_string(),
        url: DEFAULT_CRAN_URL.to_string(),
    }
}

/// Parses a `NAME=URL` repository specification.
pub fn parse_repository(spec: &str) -> Result<Repository, GenerateError> {
    match spec.split_once('=') {
        Some((name, url)) if !name.trim().is_empty() && !url.trim().is_empty() => {
            Ok(Repository {
                name: name.trim().to_string(),
                url: url.trim().to_string(),
            })
        }
        _ => Err(GenerateError::InvalidRepository(spec.to_string())),
    }
}

/// Result of a generation run
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub script: BuildScript,
    /// OS command plan, when system requirements were considered at all
    pub plan: Option<CommandPlan>,
    /// Packages whose requirements could not be resolved
    pub failures: Vec<ResolutionFailure>,
}

pub async fn generate(
    lockfile: &Lockfile,
    options: &GenerateOptions,
    resolver: &dyn RequirementResolver,
) -> Result<Generation, GenerateError> {
    options.validate()?;

    let profile = options.distro.profile();
    let image = format!("{}:{}", options.from.trim(), lockfile.runtime_version());
    info!(
        image = %image,
        distro = %options.distro,
        packages = lockfile.packages().len(),
        "Generating build script"
    );

    let mut script = BuildScript::new(image, options.alias.clone());

    let mut failures = Vec::new();
    let sets = if options.sysreqs {
        let resolutions = resolve_all(
            resolver,
            &lockfile.package_names(),
            &profile,
            &options.resolve,
        )
        .await;
        failures = sysreqs::failures(&resolutions);
        into_requirement_sets(&resolutions)
    } else {
        debug!("System requirement resolution disabled");
        Vec::new()
    };

    let plan = if options.sysreqs || !options.extra_sysreqs.is_empty() {
        let plan = aggregate(
            &sets,
            &options.extra_sysreqs,
            &profile.commands,
            options.mode,
        );
        if plan.has_install_step() {
            for step in plan.run_steps() {
                script.run(step);
            }
        } else {
            info!("No system requirements to install");
        }
        Some(plan)
    } else {
        None
    };

    if !failures.is_empty() {
        warn!(
            failed = failures.len(),
            "Some packages had unresolved system requirements"
        );
    }

    script.run(repository_setup(&options.repos, options.use_pak));
    script.run(r_expr(r#"install.packages("remotes")"#));
    if options.use_pak {
        script.run(r_expr(r#"install.packages("pak")"#));
    }
    script.run(renv_install(lockfile, options.renv_version.as_deref()));
    script.copy(options.lockfile_name.trim(), DEFAULT_LOCKFILE_NAME);
    script.run(r_expr("renv::restore()"));

    Ok(Generation {
        script,
        plan,
        failures,
    })
}

fn r_expr(expr: &str) -> String {
    format!("R -e '{}'", expr)
}

/// `c(CRAN = 'https://...', BIOC = 'https://...')`
fn repos_vector(repos: &[Repository]) -> String {
    let entries = repos
        .iter()
        .map(|r| format!("{} = '{}'", r.name, r.url))
        .collect::<Vec<_>>()
        .join(", ");
    format!("c({})", entries)
}

fn repository_setup(repos: &[Repository], use_pak: bool) -> String {
    let options = format!(
        "options(renv.config.pak.enabled = {}, repos = {}, download.file.method = 'libcurl', Ncpus = {})",
        if use_pak { "TRUE" } else { "FALSE" },
        repos_vector(repos),
        DEFAULT_NCPUS
    );
    let tees = RPROFILE_PATHS
        .iter()
        .map(|p| format!("tee {}", p))
        .collect::<Vec<_>>()
        .join(" | ");
    format!("echo \"{}\" | {}", options, tees)
}

fn renv_install(lockfile: &Lockfile, version_override: Option<&str>) -> String {
    let version = version_override
        .map(str::to_string)
        .or_else(|| lockfile.package("renv").map(|p| p.version.clone()))
        .filter(|v| !v.trim().is_empty());

    match version {
        Some(version) => r_expr(&format!(
            r#"remotes::install_version("renv", version = "{}")"#,
            version.trim()
        )),
        None => {
            debug!("Lockfile does not pin renv, installing the latest release");
            r_expr(r#"install.packages("renv")"#)
        }
    }
}
