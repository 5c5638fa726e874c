use lockdock::cli::commands::{CliArgs, Commands, ConfigArgs, DistrosArgs, GenerateArgs};
use lockdock::cli::output::{OutputFormat, OutputFormatter};
use lockdock::generate::{default_repository, generate, GenerateOptions, DEFAULT_LOCKFILE_NAME};
use lockdock::util::{init_logging, LoggingConfig};
use lockdock::{AggregationMode, Distro, LockdockConfig, Lockfile, NAME, VERSION};

use clap::Parser;
use std::fs;
use std::process;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_cli(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Generate(generate_args) => handle_generate(generate_args, args.quiet).await,
        Commands::Distros(distros_args) => handle_distros(distros_args),
        Commands::Config(config_args) => handle_config(config_args),
    };

    process::exit(exit_code);
}

async fn handle_generate(args: &GenerateArgs, quiet: bool) -> i32 {
    info!("Generating Dockerfile from {}", args.lockfile.display());

    let default_config = LockdockConfig::default();
    let config = LockdockConfig {
        request_timeout_secs: args
            .timeout
            .unwrap_or(default_config.request_timeout_secs),
        concurrency: args.concurrency.unwrap_or(default_config.concurrency),
        ..default_config
    };

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your environment variables and command-line arguments.");
        return 1;
    }

    let lockfile = match Lockfile::from_path(&args.lockfile) {
        Ok(lockfile) => lockfile,
        Err(e) => {
            error!("Failed to load lockfile: {}", e);
            return 1;
        }
    };
    debug!(
        r_version = lockfile.runtime_version(),
        packages = lockfile.packages().len(),
        "Lockfile loaded"
    );

    let lockfile_name = args
        .lockfile
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOCKFILE_NAME)
        .to_string();

    let options = GenerateOptions {
        distro: args.distro,
        from: args.from.clone(),
        alias: args.alias.clone(),
        sysreqs: !args.no_sysreqs,
        mode: if args.expand {
            AggregationMode::Expand
        } else {
            AggregationMode::Compact
        },
        extra_sysreqs: args.extra_sysreqs.clone(),
        repos: if args.repos.is_empty() {
            vec![default_repository()]
        } else {
            args.repos.clone()
        },
        renv_version: args.renv_version.clone(),
        use_pak: args.use_pak,
        lockfile_name,
        resolve: config.resolve_options(),
    };

    let resolver = match config.create_resolver() {
        Ok(resolver) => resolver,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };
    if options.sysreqs {
        info!("Resolving system requirements via {}", config.sysreqs_url);
    }

    let generation = match generate(&lockfile, &options, resolver.as_ref()).await {
        Ok(generation) => generation,
        Err(e) => {
            error!("Generation failed: {}", e);
            return 1;
        }
    };

    if !generation.failures.is_empty() && !quiet {
        eprintln!(
            "Warning: system requirements for {} package(s) could not be resolved; \
             the image may fail to build them",
            generation.failures.len()
        );
    }

    let format: OutputFormat = args.format.into();

    if let Some(output_file) = &args.output {
        let written = if format == OutputFormat::Dockerfile {
            generation.script.write_to(output_file)
        } else {
            OutputFormatter::new(format)
                .format_generation(&generation)
                .and_then(|output| {
                    fs::write(output_file, output).map_err(anyhow::Error::from)
                })
        };

        match written {
            Ok(()) => {
                info!("Output written to: {}", output_file.display());
                if !quiet {
                    println!("Output written to: {}", output_file.display());
                }
            }
            Err(e) => {
                error!("Failed to write output to file: {:#}", e);
                return 1;
            }
        }
    } else {
        match OutputFormatter::new(format).format_generation(&generation) {
            Ok(output) => print!("{}", output),
            Err(e) => {
                error!("Failed to format output: {}", e);
                return 1;
            }
        }
    }

    0
}

fn handle_distros(args: &DistrosArgs) -> i32 {
    let profiles: Vec<_> = Distro::ALL.iter().map(|d| d.profile()).collect();

    match OutputFormatter::new(args.format.into()).format_distros(&profiles) {
        Ok(output) => {
            print!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {}", e);
            1
        }
    }
}

fn handle_config(args: &ConfigArgs) -> i32 {
    let config = LockdockConfig::default();

    if let Err(e) = config.validate() {
        warn!("Configuration is invalid: {}", e);
    }

    match OutputFormatter::new(args.format.into()).format_config(&config) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {}", e);
            1
        }
    }
}
