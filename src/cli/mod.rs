pub mod commands;
pub mod output;

pub use commands::{CliArgs, Commands, ConfigArgs, DistrosArgs, GenerateArgs};
pub use output::{OutputFormat, OutputFormatter};
