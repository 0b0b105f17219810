//! Install-if-missing operations.

use anyhow::Result;
use log::info;

use super::{Ensurer, InstallOptions};
use crate::import::Importer;
use crate::package::InstallTarget;
use crate::package_manager::PackageManager;
use crate::registry::Registry;

impl<P: PackageManager, R: Registry, I: Importer> Ensurer<P, R, I> {
    /// Install `name` unless some version of it is already present.
    ///
    /// Returns `true` if it was already installed, `false` if it was just installed.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_installed(&self, name: &str, options: &InstallOptions) -> Result<bool> {
        let scope = options.scope();
        if let Some(version) = self.probe(name, scope, &options.cwd).await {
            info!("{} {} is already installed ({})", name, version, scope);
            return Ok(true);
        }

        self.package_manager
            .install(&InstallTarget::bare(name), options.flag(), &options.cwd)
            .await?;
        Ok(false)
    }

    /// Install `name@<version>` unless an installed version already satisfies `version`.
    ///
    /// `latest` is resolved through the registry first, so the install pins
    /// the concrete published version. A malformed specifier installs `name`
    /// without a pin.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_version_installed(
        &self,
        name: &str,
        version: &str,
        options: &InstallOptions,
    ) -> Result<bool> {
        let scope = options.scope();
        let target = self.resolve_target(name, version).await;
        if let Some(target) = &target {
            if let Some(installed) = self
                .installed_intersection(name, target, scope, &options.cwd)
                .await
            {
                info!(
                    "{} {} satisfies {} ({})",
                    name, installed, target, scope
                );
                return Ok(true);
            }
        }

        let install_target = Self::install_target(name, target.as_ref());
        self.package_manager
            .install(&install_target, options.flag(), &options.cwd)
            .await?;
        Ok(false)
    }
}
