//! Target distributions and their package-manager verbs
//!
//! Every accepted distribution maps to exactly one [`DistroProfile`]. Parsing a
//! distribution name is the only validation point: once a [`Distro`] value
//! exists, its profile lookup cannot fail.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const APT_UPDATE: &str = "apt-get update -y";
const APT_INSTALL: &str = "apt-get install -y";
const APT_CLEAN: &str = "rm -rf /var/lib/apt/lists/*";

const YUM_UPDATE: &str = "yum update -y";
const YUM_INSTALL: &str = "yum install -y";
const YUM_CLEAN: &str = "yum clean all && rm -rf /var/cache/yum";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DistroError {
    #[error("Unsupported distro: {name}. Valid options: {supported}")]
    Unsupported { name: String, supported: String },
}

/// Package manager family of a distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Debian,
    Rpm,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsFamily::Debian => write!(f, "debian"),
            OsFamily::Rpm => write!(f, "rpm"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Distro {
    Xenial,
    Bionic,
    #[default]
    Focal,
    Centos7,
    Centos8,
}

/// Shell command templates for one distribution's package manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandTemplates {
    pub update: &'static str,
    pub install: &'static str,
    pub clean: &'static str,
}

/// Everything the generator needs to know about a distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DistroProfile {
    pub distro: Distro,
    pub family: OsFamily,
    /// Distribution name as understood by the sysreqs service (e.g. "ubuntu")
    pub os: &'static str,
    /// Release label as understood by the sysreqs service (e.g. "20.04")
    pub release: &'static str,
    pub commands: CommandTemplates,
}

const DEBIAN_COMMANDS: CommandTemplates = CommandTemplates {
    update: APT_UPDATE,
    install: APT_INSTALL,
    clean: APT_CLEAN,
};

const RPM_COMMANDS: CommandTemplates = CommandTemplates {
    update: YUM_UPDATE,
    install: YUM_INSTALL,
    clean: YUM_CLEAN,
};

impl Distro {
    pub const ALL: [Distro; 5] = [
        Distro::Xenial,
        Distro::Bionic,
        Distro::Focal,
        Distro::Centos7,
        Distro::Centos8,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Distro::Xenial => "xenial",
            Distro::Bionic => "bionic",
            Distro::Focal => "focal",
            Distro::Centos7 => "centos7",
            Distro::Centos8 => "centos8",
        }
    }

    pub fn profile(&self) -> DistroProfile {
        let (family, os, release) = match self {
            Distro::Xenial => (OsFamily::Debian, "ubuntu", "16.04"),
            Distro::Bionic => (OsFamily::Debian, "ubuntu", "18.04"),
            Distro::Focal => (OsFamily::Debian, "ubuntu", "20.04"),
            Distro::Centos7 => (OsFamily::Rpm, "centos", "7"),
            Distro::Centos8 => (OsFamily::Rpm, "centos", "8"),
        };

        let commands = match family {
            OsFamily::Debian => DEBIAN_COMMANDS,
            OsFamily::Rpm => RPM_COMMANDS,
        };

        DistroProfile {
            distro: *self,
            family,
            os,
            release,
            commands,
        }
    }

    fn supported_list() -> String {
        Distro::ALL
            .iter()
            .map(|d| d.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Distro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Distro {
    type Err = DistroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Distro::ALL
            .iter()
            .copied()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| DistroError::Unsupported {
                name: s.to_string(),
                supported: Distro::supported_list(),
            })
    }
}
