//! Install/import orchestration.
//!
//! [`Ensurer`] composes the installed-version probe, version reconciliation,
//! the package manager and the importer into the six public operations:
//!
//! - `probe` - installed version of a package in one scope
//! - `reconcile_version` - installed version if it satisfies a specifier
//! - `ensure_installed` / `ensure_version_installed` - install when missing
//! - `ensure_imported` / `ensure_version_imported` - install when missing, then import
//!
//! Probe and reconciliation never fail: every failure collapses to `None`.
//! Install and import failures are returned to the caller unchanged.

mod import;
mod install;
mod probe;
mod reconcile;

use std::path::{Path, PathBuf};

use crate::import::Importer;
use crate::package::{InstallFlag, Scope};
use crate::package_manager::PackageManager;
use crate::registry::Registry;

pub struct Ensurer<P: PackageManager, R: Registry, I: Importer> {
    package_manager: P,
    registry: R,
    importer: I,
}

impl<P: PackageManager, R: Registry, I: Importer> Ensurer<P, R, I> {
    pub fn new(package_manager: P, registry: R, importer: I) -> Self {
        Self {
            package_manager,
            registry,
            importer,
        }
    }
}

/// Options for `ensure_installed` and `ensure_version_installed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Check and install in the global scope.
    pub global: bool,
    /// Save as a dev dependency when installing locally.
    pub dev: bool,
    pub cwd: PathBuf,
}

impl InstallOptions {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            global: false,
            dev: false,
            cwd: cwd.into(),
        }
    }

    pub fn global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    pub fn dev(mut self, dev: bool) -> Self {
        self.dev = dev;
        self
    }

    pub fn scope(&self) -> Scope {
        Scope::from_global(self.global)
    }

    pub fn flag(&self) -> InstallFlag {
        InstallFlag::from_intent(self.global, self.dev)
    }
}

/// Options for `ensure_imported` and `ensure_version_imported`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Flag used if the package has to be installed. Also decides which
    /// scope the freshly installed package is imported from.
    pub install_flag: InstallFlag,
    pub cwd: PathBuf,
}

impl ImportOptions {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            install_flag: InstallFlag::default(),
            cwd: cwd.into(),
        }
    }

    pub fn install_flag(mut self, install_flag: InstallFlag) -> Self {
        self.install_flag = install_flag;
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}
