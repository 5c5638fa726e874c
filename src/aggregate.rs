//! System requirement aggregation
//!
//! Turns the per-package install commands returned by the sysreqs service into
//! a [`CommandPlan`]: the ordered OS commands that go into the build script.
//!
//! Two strategies are available:
//!
//! - **Compact**: every install target is merged into a single install line,
//!   bracketed by the update and clean commands and emitted as one build step.
//!   This keeps the image small and the build script short.
//! - **Expand**: each distinct requirement set keeps its own line and becomes
//!   its own build step, so that adding a package only invalidates one layer.
//!
//! Both strategies are deterministic for a given input order and never emit the
//! same command twice.

use crate::distro::CommandTemplates;
use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hash;

/// Separator used to chain shell commands inside one build step
pub const COMMAND_SEPARATOR: &str = " && ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    #[default]
    Compact,
    Expand,
}

/// Ordered OS commands produced by aggregation
///
/// The first command is always the update command and the last one is always
/// the clean command. Anything in between installs packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandPlan {
    pub mode: AggregationMode,
    pub commands: Vec<String>,
}

impl CommandPlan {
    fn bracket(
        mode: AggregationMode,
        templates: &CommandTemplates,
        installs: Vec<String>,
    ) -> Self {
        let mut commands = Vec::with_capacity(installs.len() + 2);
        commands.push(templates.update.to_string());
        commands.extend(installs);
        commands.push(templates.clean.to_string());
        Self { mode, commands }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands between the update and clean commands
    pub fn install_commands(&self) -> &[String] {
        if self.commands.len() < 2 {
            return &[];
        }
        &self.commands[1..self.commands.len() - 1]
    }

    pub fn has_install_step(&self) -> bool {
        !self.install_commands().is_empty()
    }

    /// Shell commands to issue, one per build step
    ///
    /// A compact plan is a single chained step; an expanded plan issues every
    /// command as its own step.
    pub fn run_steps(&self) -> Vec<String> {
        match self.mode {
            AggregationMode::Compact => vec![self.commands.join(COMMAND_SEPARATOR)],
            AggregationMode::Expand => self.commands.clone(),
        }
    }
}

/// Removes duplicates while keeping the first occurrence of every item.
pub fn unique_in_order<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

pub fn aggregate(
    sets: &[Vec<String>],
    extra_targets: &[String],
    templates: &CommandTemplates,
    mode: AggregationMode,
) -> CommandPlan {
    match mode {
        AggregationMode::Compact => compact(sets, extra_targets, templates),
        AggregationMode::Expand => expand(sets, extra_targets, templates),
    }
}

/// Merges every requirement into a single chained install step.
///
/// Commands of the form `{install} pkg...` contribute their package names to
/// an install segment, and adjacent installs share one segment. A bare word is
/// taken as a package name. Any other command (a repository setup script, an
/// install chained with other shell commands, an install with its own flags)
/// is kept verbatim at its position and closes the current segment, so nothing
/// runs before the packages it was listed after. A package already named in an
/// earlier segment is not installed again.
pub fn compact(
    sets: &[Vec<String>],
    extra_targets: &[String],
    templates: &CommandTemplates,
) -> CommandPlan {
    let mut raw = unique_in_order(non_blank(sets.iter().flatten()));

    if !extra_targets.is_empty() {
        raw.extend(synthesize_installs(extra_targets, templates.install));
        raw = unique_in_order(raw);
    }

    let mut seen = HashSet::new();
    let mut segments: Vec<Segment> = Vec::new();
    for command in raw {
        match install_targets(&command, templates.install) {
            Some(names) => {
                let fresh: Vec<String> = names
                    .into_iter()
                    .filter(|name| seen.insert(name.clone()))
                    .collect();
                if fresh.is_empty() {
                    continue;
                }
                match segments.last_mut() {
                    Some(Segment::Install(targets)) => targets.extend(fresh),
                    _ => segments.push(Segment::Install(fresh)),
                }
            }
            None => segments.push(Segment::Verbatim(command)),
        }
    }

    let installs = if segments.is_empty() {
        Vec::new()
    } else {
        vec![segments
            .iter()
            .map(|segment| segment.render(templates.install))
            .collect::<Vec<_>>()
            .join(COMMAND_SEPARATOR)]
    };

    CommandPlan::bracket(AggregationMode::Compact, templates, installs)
}

/// One piece of a compact install step
enum Segment {
    Install(Vec<String>),
    Verbatim(String),
}

impl Segment {
    fn render(&self, install: &str) -> String {
        match self {
            Segment::Install(targets) => format!("{} {}", install, targets.join(" ")),
            Segment::Verbatim(command) => command.clone(),
        }
    }
}

/// Keeps one install line per distinct requirement set.
///
/// Sets are compared as whole sequences: two packages needing exactly the same
/// commands share a line, partially overlapping sets do not. Extra targets are
/// appended as standalone install lines after the resolved ones.
pub fn expand(
    sets: &[Vec<String>],
    extra_targets: &[String],
    templates: &CommandTemplates,
) -> CommandPlan {
    let distinct_sets = unique_in_order(
        sets.iter()
            .map(|set| non_blank(set.iter()).collect::<Vec<_>>())
            .filter(|set| !set.is_empty()),
    );

    let lines = distinct_sets
        .iter()
        .map(|set| set.join(COMMAND_SEPARATOR))
        .chain(synthesize_installs(extra_targets, templates.install));

    CommandPlan::bracket(AggregationMode::Expand, templates, unique_in_order(lines))
}

fn non_blank<'a, I>(commands: I) -> impl Iterator<Item = String> + 'a
where
    I: Iterator<Item = &'a String> + 'a,
{
    commands
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn synthesize_installs<'a>(
    targets: &'a [String],
    install: &'a str,
) -> impl Iterator<Item = String> + 'a {
    targets
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(move |t| format!("{} {}", install, t))
}

/// Package names installed by `command`, or `None` when it is not a plain install.
///
/// Commands containing shell operators or extra option flags are never plain:
/// their words are not package names.
fn install_targets(command: &str, install: &str) -> Option<Vec<String>> {
    let command = command.trim();
    if has_shell_syntax(command) {
        return None;
    }

    if let Some(rest) = command.strip_prefix(install) {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            let targets: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
            if targets.iter().any(|t| t.starts_with('-')) {
                return None;
            }
            return Some(targets);
        }
    }

    if !command.contains(char::is_whitespace) && !command.starts_with('-') {
        return Some(vec![command.to_string()]);
    }

    None
}

fn has_shell_syntax(command: &str) -> bool {
    command.contains(['&', '|', ';', '>', '<', '`']) || command.contains("$(")
}
