//! Version reconciliation: requested specifier against installed version.

use log::{debug, warn};
use std::path::Path;

use super::Ensurer;
use crate::import::Importer;
use crate::package::{InstallTarget, NpmRange, Scope, VersionSpec};
use crate::package_manager::PackageManager;
use crate::registry::Registry;

impl<P: PackageManager, R: Registry, I: Importer> Ensurer<P, R, I> {
    /// Installed version of `name` in `scope` if it satisfies `version`, else `None`.
    ///
    /// `version` is an npm range or `latest`. A malformed specifier, a failed
    /// registry lookup, or a missing package all yield `None`.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile_version(
        &self,
        name: &str,
        version: &str,
        scope: Scope,
        cwd: &Path,
    ) -> Option<String> {
        let target = self.resolve_target(name, version).await?;
        self.installed_intersection(name, &target, scope, cwd).await
    }

    /// Resolve a specifier to the range installed versions are checked against.
    pub(crate) async fn resolve_target(&self, name: &str, version: &str) -> Option<NpmRange> {
        match VersionSpec::parse(version) {
            Some(VersionSpec::Range(range)) => Some(range),
            Some(VersionSpec::Latest) => {
                let latest = match self.registry.latest_version(&name.to_lowercase()).await {
                    Ok(latest) => latest,
                    Err(e) => {
                        warn!("Failed to resolve latest version of {}: {:#}", name, e);
                        return None;
                    }
                };
                debug!("Latest version of {} is {}", name, latest);
                let range = NpmRange::parse(&latest);
                if range.is_none() {
                    warn!(
                        "Registry reported an invalid latest version for {}: {}",
                        name, latest
                    );
                }
                range
            }
            None => {
                debug!("'{}' is not a valid version range for {}", version, name);
                None
            }
        }
    }

    /// Intersect a resolved target with whatever is installed in `scope`.
    pub(crate) async fn installed_intersection(
        &self,
        name: &str,
        target: &NpmRange,
        scope: Scope,
        cwd: &Path,
    ) -> Option<String> {
        let installed = self.probe(name, scope, cwd).await?;
        let intersection = target.intersect(&installed);
        if intersection.is_none() {
            debug!(
                "{} {} ({}) does not satisfy {}",
                name, installed, scope, target
            );
        }
        intersection
    }

    /// `name@<target>` for a resolved target, bare `name` otherwise.
    pub(crate) fn install_target(name: &str, target: Option<&NpmRange>) -> InstallTarget {
        match target {
            Some(range) if !range.as_str().is_empty() => InstallTarget::pinned(name, range.as_str()),
            _ => InstallTarget::bare(name),
        }
    }
}
