use crate::distro::Distro;
use crate::lockfile::Repository;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Dockerfile generator for renv-locked R projects
#[derive(Parser, Debug)]
#[command(
    name = "lockdock",
    about = "Generate Dockerfiles that reproduce renv-locked R projects",
    version,
    author,
    long_about = "lockdock reads an renv.lock file and writes a Dockerfile that starts from an \
                  R base image, installs the operating system libraries the locked packages \
                  need, and restores the exact package set with renv."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate a Dockerfile from an renv lockfile",
        long_about = "Reads the lockfile, looks up the system requirements of every locked \
                      package and renders a Dockerfile.\n\n\
                      Examples:\n  \
                      lockdock generate\n  \
                      lockdock generate path/to/renv.lock --distro bionic\n  \
                      lockdock generate --expand --extra-sysreqs git -o Dockerfile\n  \
                      lockdock generate --format json"
    )]
    Generate(GenerateArgs),

    #[command(about = "List supported target distributions")]
    Distros(DistrosArgs),

    #[command(about = "Show effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(
        value_name = "LOCKFILE",
        default_value = "renv.lock",
        help = "Path to the renv lockfile"
    )]
    pub lockfile: PathBuf,

    #[arg(
        short = 'd',
        long,
        value_parser = parse_distro,
        default_value = "focal",
        help = "Target distribution (xenial, bionic, focal, centos7, centos8)"
    )]
    pub distro: Distro,

    #[arg(
        long,
        value_name = "IMAGE",
        default_value = "rocker/r-base",
        help = "Base image; the lockfile's R version is used as its tag"
    )]
    pub from: String,

    #[arg(long = "as", value_name = "NAME", help = "Name the build stage")]
    pub alias: Option<String>,

    #[arg(long, help = "Emit one RUN instruction per system requirement command")]
    pub expand: bool,

    #[arg(long, help = "Skip system requirement lookup")]
    pub no_sysreqs: bool,

    #[arg(
        long,
        value_name = "PACKAGE",
        value_delimiter = ',',
        help = "Additional OS packages to install (comma separated or repeated)"
    )]
    pub extra_sysreqs: Vec<String>,

    #[arg(
        long = "repo",
        value_name = "NAME=URL",
        value_parser = parse_repository,
        help = "R package repository (repeatable, defaults to CRAN)"
    )]
    pub repos: Vec<Repository>,

    #[arg(
        long,
        value_name = "VERSION",
        help = "renv version to install instead of the one in the lockfile"
    )]
    pub renv_version: Option<String>,

    #[arg(long, help = "Install pak and let renv use it for restores")]
    pub use_pak: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "dockerfile",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Per-package lookup timeout in seconds (overrides LOCKDOCK_REQUEST_TIMEOUT)"
    )]
    pub timeout: Option<u64>,

    #[arg(
        long,
        value_name = "N",
        help = "Maximum concurrent lookups (overrides LOCKDOCK_CONCURRENCY)"
    )]
    pub concurrency: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct DistrosArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Dockerfile,
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Dockerfile => super::output::OutputFormat::Dockerfile,
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_distro(s: &str) -> Result<Distro, String> {
    s.parse::<Distro>().map_err(|e| e.to_string())
}

fn parse_repository(s: &str) -> Result<Repository, String> {
    crate::generate::parse_repository(s).map_err(|e| e.to_string())
}
