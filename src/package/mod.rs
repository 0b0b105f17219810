//! Package-level types shared by the probe, reconciliation and orchestration layers.

mod version;

pub use version::{LATEST, NpmRange, VersionSpec, parse_version};

use anyhow::{Result, bail};
use std::fmt;
use std::str::FromStr;

/// Where a package is looked up or installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// The project's own dependency tree under the working directory.
    #[default]
    Local,
    /// The machine-wide global install location.
    Global,
}

impl Scope {
    pub fn from_global(global: bool) -> Self {
        if global { Scope::Global } else { Scope::Local }
    }

    pub fn is_global(self) -> bool {
        self == Scope::Global
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Local => f.write_str("local"),
            Scope::Global => f.write_str("global"),
        }
    }
}

/// The install-location flag passed to the package manager's install command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstallFlag {
    Global,
    DevDependence,
    #[default]
    Dependence,
}

impl InstallFlag {
    /// Select the flag from caller intent. `global` wins over `dev`.
    pub fn from_intent(global: bool, dev: bool) -> Self {
        if global {
            InstallFlag::Global
        } else if dev {
            InstallFlag::DevDependence
        } else {
            InstallFlag::Dependence
        }
    }

    pub fn as_arg(self) -> &'static str {
        match self {
            InstallFlag::Global => "--global",
            InstallFlag::DevDependence => "--save-dev",
            InstallFlag::Dependence => "--save",
        }
    }

    /// The scope a package installed with this flag ends up in.
    pub fn scope(self) -> Scope {
        match self {
            InstallFlag::Global => Scope::Global,
            InstallFlag::DevDependence | InstallFlag::Dependence => Scope::Local,
        }
    }
}

impl fmt::Display for InstallFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

impl FromStr for InstallFlag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_start_matches('-') {
            "global" | "g" => Ok(InstallFlag::Global),
            "save-dev" | "dev" | "D" => Ok(InstallFlag::DevDependence),
            "save" | "S" => Ok(InstallFlag::Dependence),
            _ => bail!(
                "Invalid install flag '{}'. Expected one of: save, save-dev, global",
                s
            ),
        }
    }
}

/// What gets handed to the install command: `name` or `name@version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    pub name: String,
    pub version: Option<String>,
}

impl InstallTarget {
    pub fn bare(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: None,
        }
    }

    pub fn pinned(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: Some(version.to_string()),
        }
    }
}

impl fmt::Display for InstallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}
