//! The package-manager boundary: listing top-level dependencies and installing.

mod npm;

pub use npm::NpmCli;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::package::{InstallFlag, InstallTarget, Scope};

/// Parsed output of a depth-zero listing.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Listing {
    #[serde(default)]
    pub dependencies: Option<HashMap<String, ListedDependency>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ListedDependency {
    #[serde(default)]
    pub version: Option<String>,
}

impl Listing {
    /// The installed version of exactly `name`, if listed.
    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.dependencies
            .as_ref()?
            .get(name)?
            .version
            .as_deref()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// List depth-zero dependencies matching `name` in the given scope.
    /// Fails if the listing exits non-zero or its output cannot be parsed.
    async fn list_top_level(&self, name: &str, scope: Scope, cwd: &Path) -> Result<Listing>;

    /// Install a package. Fails if the install command exits non-zero.
    async fn install(&self, target: &InstallTarget, flag: InstallFlag, cwd: &Path) -> Result<()>;
}
