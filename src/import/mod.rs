//! Module resolution for installed packages.
//!
//! Importing a package means locating its installed directory and manifest
//! in either the local dependency tree or the global install location, and
//! handing back a [`ModuleHandle`] describing where its entry point lives.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::package::Scope;
use crate::package_manager::NpmCli;
use crate::runtime::Runtime;

const NODE_MODULES: &str = "node_modules";
const MANIFEST: &str = "package.json";
const DEFAULT_ENTRY: &str = "index.js";

/// A resolved, importable package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHandle {
    pub name: String,
    /// Version from the package's own manifest.
    pub version: Option<String>,
    pub scope: Scope,
    /// The package directory.
    pub root: PathBuf,
    /// The file the package's `main` field points at.
    pub entry: PathBuf,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Importer: Send + Sync {
    /// Resolve `name` from the given scope. Fails if it cannot be found.
    async fn import(&self, name: &str, scope: Scope, cwd: &Path) -> Result<ModuleHandle>;
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    name: Option<String>,
    version: Option<String>,
    main: Option<String>,
}

/// Resolves packages from `node_modules` directories.
///
/// Local lookups walk from the working directory up through its ancestors.
/// Global lookups ask the package manager for its global root.
pub struct NodeModulesImporter<R: Runtime> {
    npm: NpmCli<R>,
}

impl<R: Runtime> NodeModulesImporter<R> {
    pub fn new(npm: NpmCli<R>) -> Self {
        Self { npm }
    }

    fn runtime(&self) -> &R {
        self.npm.runtime()
    }

    fn find_local(&self, name: &str, cwd: &Path) -> Option<PathBuf> {
        cwd.ancestors()
            .map(|dir| dir.join(NODE_MODULES).join(name))
            .find(|candidate| self.runtime().exists(&candidate.join(MANIFEST)))
    }

    async fn find_global(&self, name: &str, cwd: &Path) -> Result<PathBuf> {
        let root = self
            .npm
            .global_root(cwd)
            .await
            .context("Failed to locate the global package directory")?;
        let candidate = root.join(name);
        if !self.runtime().exists(&candidate.join(MANIFEST)) {
            bail!(
                "Cannot find global module '{}' in {}",
                name,
                root.display()
            );
        }
        Ok(candidate)
    }

    fn load(&self, name: &str, scope: Scope, root: PathBuf) -> Result<ModuleHandle> {
        let manifest_path = root.join(MANIFEST);
        let contents = self.runtime().read_to_string(&manifest_path)?;
        let manifest: PackageManifest = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", manifest_path.display()))?;

        if let Some(declared) = manifest.name.as_deref() {
            if declared != name {
                debug!(
                    "{} declares name '{}', expected '{}'",
                    manifest_path.display(),
                    declared,
                    name
                );
            }
        }

        let entry = manifest
            .main
            .as_deref()
            .map(|main| root.join(main))
            .filter(|entry| self.runtime().exists(entry))
            .unwrap_or_else(|| root.join(DEFAULT_ENTRY));

        Ok(ModuleHandle {
            name: name.to_string(),
            version: manifest.version,
            scope,
            root,
            entry,
        })
    }
}

#[async_trait]
impl<R: Runtime> Importer for NodeModulesImporter<R> {
    #[tracing::instrument(skip(self))]
    async fn import(&self, name: &str, scope: Scope, cwd: &Path) -> Result<ModuleHandle> {
        let root = match scope {
            Scope::Local => self.find_local(name, cwd).with_context(|| {
                format!("Cannot find module '{}' from {}", name, cwd.display())
            })?,
            Scope::Global => self.find_global(name, cwd).await?,
        };
        debug!("Resolved {} ({}) to {}", name, scope, root.display());

        self.load(name, scope, root)
    }
}
