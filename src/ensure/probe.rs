//! Installed-version probe.

use log::debug;
use std::path::Path;

use super::Ensurer;
use crate::import::Importer;
use crate::package::Scope;
use crate::package_manager::PackageManager;
use crate::registry::Registry;

impl<P: PackageManager, R: Registry, I: Importer> Ensurer<P, R, I> {
    /// Installed version of exactly `name` in `scope`, or `None`.
    ///
    /// Never fails: a listing that cannot run, exits non-zero, or prints
    /// something unparsable is reported as "not installed".
    #[tracing::instrument(skip(self))]
    pub async fn probe(&self, name: &str, scope: Scope, cwd: &Path) -> Option<String> {
        let listing = match self.package_manager.list_top_level(name, scope, cwd).await {
            Ok(listing) => listing,
            Err(e) => {
                debug!("Listing {} ({}) failed: {:#}", name, scope, e);
                return None;
            }
        };

        match listing.version_of(name) {
            Some(version) => {
                debug!("{} {} is installed ({})", name, version, scope);
                Some(version.to_string())
            }
            None => {
                debug!("{} is not installed ({})", name, scope);
                None
            }
        }
    }
}
