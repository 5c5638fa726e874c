//! Dockerfile build script
//!
//! An append-only list of build instructions that renders to Dockerfile text.
//! The structured form serializes to JSON/YAML for tooling that wants to
//! post-process the steps instead of parsing Dockerfile syntax.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// A single build instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "directive", rename_all = "lowercase")]
pub enum Instruction {
    From {
        image: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
    Run {
        command: String,
    },
    Copy {
        from: String,
        to: String,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::From { image, alias } => match alias {
                Some(alias) => write!(f, "FROM {} AS {}", image, alias),
                None => write!(f, "FROM {}", image),
            },
            Instruction::Run { command } => write!(f, "RUN {}", command),
            Instruction::Copy { from, to } => write!(f, "COPY {} {}", from, to),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildScript {
    instructions: Vec<Instruction>,
}

impl BuildScript {
    /// Starts a script from `image`, optionally naming the stage `alias`.
    pub fn new(image: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            instructions: vec![Instruction::From {
                image: image.into(),
                alias: alias.filter(|a| !a.trim().is_empty()),
            }],
        }
    }

    pub fn run(&mut self, command: impl Into<String>) -> &mut Self {
        self.instructions.push(Instruction::Run {
            command: command.into(),
        });
        self
    }

    pub fn copy(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.instructions.push(Instruction::Copy {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Stage alias given to the base image, if any
    pub fn alias(&self) -> Option<&str> {
        self.instructions.iter().find_map(|i| match i {
            Instruction::From { alias, .. } => alias.as_deref(),
            _ => None,
        })
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())
            .with_context(|| format!("Failed to write Dockerfile to {}", path.display()))
    }
}

impl fmt::Display for BuildScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "{}", instruction)?;
        }
        Ok(())
    }
}
