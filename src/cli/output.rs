//! Output formatting for multiple formats
//!
//! Generation results render as plain Dockerfile text, JSON, YAML or a
//! human-readable summary. The distro table and configuration use the same
//! formatter.
//!
//! # Example
//!
//! ```ignore
//! use lockdock::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! let output = formatter.format_generation(&generation)?;
//! println!("{}", output);
//! ```

use anyhow::{Context, Result};
use std::collections::BTreeMap;

use crate::aggregate::AggregationMode;
use crate::config::LockdockConfig;
use crate::distro::DistroProfile;
use crate::generate::Generation;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain Dockerfile text
    Dockerfile,
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable summary
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_generation(&self, generation: &Generation) -> Result<String> {
        match self.format {
            OutputFormat::Dockerfile => Ok(generation.script.render()),
            OutputFormat::Json => serde_json::to_string_pretty(generation)
                .context("Failed to serialize generation to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(generation)
                .context("Failed to serialize generation to YAML"),
            OutputFormat::Human => Ok(self.format_generation_human(generation)),
        }
    }

    /// Formats the supported distro table. Dockerfile format falls back to the
    /// human table since there is no script to show.
    pub fn format_distros(&self, profiles: &[DistroProfile]) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(profiles)
                .context("Failed to serialize distros to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(profiles).context("Failed to serialize distros to YAML")
            }
            OutputFormat::Human | OutputFormat::Dockerfile => {
                Ok(self.format_distros_human(profiles))
            }
        }
    }

    pub fn format_config(&self, config: &LockdockConfig) -> Result<String> {
        let config_map: BTreeMap<String, String> = config.to_display_map();
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&config_map)
                .context("Failed to serialize config to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&config_map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human | OutputFormat::Dockerfile => Ok(config.to_string()),
        }
    }

    fn format_generation_human(&self, generation: &Generation) -> String {
        let mut output = String::new();

        if generation.failures.is_empty() {
            output.push_str("\u{2713} Dockerfile Generated\n");
        } else {
            output.push_str("\u{26A0} Dockerfile Generated (Incomplete System Requirements)\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        let instructions = generation.script.instructions();
        output.push_str(&format!("Instructions:  {}\n", instructions.len()));
        if let Some(alias) = generation.script.alias() {
            output.push_str(&format!("Stage:         {}\n", alias));
        }

        match &generation.plan {
            Some(plan) => {
                let mode = match plan.mode {
                    AggregationMode::Compact => "compact",
                    AggregationMode::Expand => "expand",
                };
                output.push_str(&format!("Sysreqs Mode:  {}\n", mode));

                let installs = plan.install_commands();
                if installs.is_empty() {
                    output.push_str("System Requirements: (none)\n");
                } else {
                    output.push_str("System Requirements:\n");
                    for (i, command) in installs.iter().enumerate() {
                        let connector = if i == installs.len() - 1 {
                            "\u{2514}"
                        } else {
                            "\u{251C}"
                        };
                        output.push_str(&format!("{}\u{2500} {}\n", connector, command));
                    }
                }
            }
            None => output.push_str("System Requirements: (skipped)\n"),
        }

        if !generation.failures.is_empty() {
            output.push_str("\n\u{26A0} Unresolved:\n");
            for failure in &generation.failures {
                output.push_str(&format!("  - {}: {}\n", failure.package, failure.reason));
            }
        }

        output.push('\n');
        output.push_str(&generation.script.render());
        output
    }

    fn format_distros_human(&self, profiles: &[DistroProfile]) -> String {
        let mut output = String::new();

        output.push_str("Supported Distributions\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        for profile in profiles {
            output.push_str(&format!(
                "{:<8} {} {} ({})\n",
                profile.distro.name(),
                profile.os,
                profile.release,
                profile.family
            ));
            output.push_str(&format!("  Update:  {}\n", profile.commands.update));
            output.push_str(&format!("  Install: {}\n", profile.commands.install));
            output.push_str(&format!("  Clean:   {}\n", profile.commands.clean));
        }

        output
    }
}
