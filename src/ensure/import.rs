//! Install-if-missing, then import.

use anyhow::{Context, Result, bail};
use log::{debug, info};

use super::{Ensurer, ImportOptions};
use crate::import::{Importer, ModuleHandle};
use crate::package::{InstallTarget, Scope};
use crate::package_manager::PackageManager;
use crate::registry::Registry;

const LOOKUP_ORDER: [Scope; 2] = [Scope::Local, Scope::Global];

impl<P: PackageManager, R: Registry, I: Importer> Ensurer<P, R, I> {
    /// Import `name` from the first scope that has it, installing it first if neither does.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_imported(&self, name: &str, options: &ImportOptions) -> Result<ModuleHandle> {
        for scope in LOOKUP_ORDER {
            if let Some(version) = self.probe(name, scope, options.cwd()).await {
                debug!("Importing {} {} ({})", name, version, scope);
                return self.import(name, scope, options).await;
            }
        }

        self.install_and_import(name, InstallTarget::bare(name), options)
            .await
    }

    /// Import `name` from the first scope whose installed version satisfies
    /// `version`, installing `name@<version>` first if neither does.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_version_imported(
        &self,
        name: &str,
        version: &str,
        options: &ImportOptions,
    ) -> Result<ModuleHandle> {
        let target = self.resolve_target(name, version).await;
        if let Some(target) = &target {
            for scope in LOOKUP_ORDER {
                if let Some(installed) = self
                    .installed_intersection(name, target, scope, options.cwd())
                    .await
                {
                    debug!("Importing {} {} ({})", name, installed, scope);
                    return self.import(name, scope, options).await;
                }
            }
        }

        let install_target = Self::install_target(name, target.as_ref());
        self.install_and_import(name, install_target, options).await
    }

    async fn install_and_import(
        &self,
        name: &str,
        target: InstallTarget,
        options: &ImportOptions,
    ) -> Result<ModuleHandle> {
        let flag = options.install_flag;
        self.package_manager
            .install(&target, flag, options.cwd())
            .await?;

        // Confirm the install landed where the flag says before importing from there
        let scope = flag.scope();
        match self.probe(name, scope, options.cwd()).await {
            Some(version) => info!("Installed {} {} ({})", name, version, scope),
            None => bail!(
                "Installed {} with {} but it is not listed in the {} scope",
                target,
                flag,
                scope
            ),
        }

        self.import(name, scope, options).await
    }

    async fn import(&self, name: &str, scope: Scope, options: &ImportOptions) -> Result<ModuleHandle> {
        self.importer
            .import(name, scope, options.cwd())
            .await
            .with_context(|| format!("Failed to import {} ({})", name, scope))
    }
}

#[cfg(test)]
mod tests {
    use crate::ensure::{Ensurer, ImportOptions};
    use crate::import::{MockImporter, ModuleHandle};
    use crate::package::{InstallFlag, InstallTarget, Scope};
    use crate::package_manager::{Listing, MockPackageManager};
    use crate::registry::MockRegistry;
    use crate::test_utils::{listing, test_global_root, test_project};
    use mockall::Sequence;
    use mockall::predicate::eq;

    fn handle(name: &str, scope: Scope) -> ModuleHandle {
        let root = match scope {
            Scope::Local => test_project().join("node_modules").join(name),
            Scope::Global => test_global_root().join(name),
        };
        ModuleHandle {
            name: name.to_string(),
            version: Some("1.0.0".to_string()),
            scope,
            entry: root.join("index.js"),
            root,
        }
    }

    fn importer_expecting(name: &'static str, scope: Scope) -> MockImporter {
        let mut importer = MockImporter::new();
        importer
            .expect_import()
            .with(eq(name), eq(scope), eq(test_project()))
            .times(1)
            .returning(|name, scope, _| Ok(handle(name, scope)));
        importer
    }

    #[tokio::test]
    async fn test_ensure_imported_prefers_local() {
        let mut pm = MockPackageManager::new();
        pm.expect_list_top_level()
            .with(eq("chalk"), eq(Scope::Local), eq(test_project()))
            .times(1)
            .returning(|_, _, _| Ok(listing(&[("chalk", "5.3.0")])));
        pm.expect_install().never();

        let ensurer = Ensurer::new(pm, MockRegistry::new(), importer_expecting("chalk", Scope::Local));
        let module = ensurer
            .ensure_imported("chalk", &ImportOptions::new(test_project()))
            .await
            .unwrap();

        assert_eq!(module.scope, Scope::Local);
    }

    #[tokio::test]
    async fn test_ensure_imported_falls_back_to_global() {
        let mut pm = MockPackageManager::new();
        pm.expect_list_top_level()
            .with(eq("typescript"), eq(Scope::Local), eq(test_project()))
            .returning(|_, _, _| Ok(Listing::default()));
        pm.expect_list_top_level()
            .with(eq("typescript"), eq(Scope::Global), eq(test_project()))
            .returning(|_, _, _| Ok(listing(&[("typescript", "5.4.2")])));
        pm.expect_install().never();

        let ensurer = Ensurer::new(
            pm,
            MockRegistry::new(),
            importer_expecting("typescript", Scope::Global),
        );
        let module = ensurer
            .ensure_imported("typescript", &ImportOptions::new(test_project()))
            .await
            .unwrap();

        assert_eq!(module.scope, Scope::Global);
        assert_eq!(module.root, test_global_root().join("typescript"));
    }

    #[tokio::test]
    async fn test_ensure_imported_installs_then_imports_locally() {
        let mut seq = Sequence::new();
        let mut pm = MockPackageManager::new();
        pm.expect_list_top_level()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(Listing::default()));
        pm.expect_install()
            .with(eq(InstallTarget::bare("left-pad")), eq(InstallFlag::Dependence), eq(test_project()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        pm.expect_list_top_level()
            .with(eq("left-pad"), eq(Scope::Local), eq(test_project()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(listing(&[("left-pad", "1.3.0")])));

        let ensurer = Ensurer::new(
            pm,
            MockRegistry::new(),
            importer_expecting("left-pad", Scope::Local),
        );
        let module = ensurer
            .ensure_imported("left-pad", &ImportOptions::new(test_project()))
            .await
            .unwrap();

        assert_eq!(module.scope, Scope::Local);
    }

    #[tokio::test]
    async fn test_ensure_imported_global_flag_imports_globally() {
        let mut seq = Sequence::new();
        let mut pm = MockPackageManager::new();
        pm.expect_list_top_level()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(Listing::default()));
        pm.expect_install()
            .with(eq(InstallTarget::bare("eslint")), eq(InstallFlag::Global), eq(test_project()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        pm.expect_list_top_level()
            .with(eq("eslint"), eq(Scope::Global), eq(test_project()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(listing(&[("eslint", "9.0.0")])));

        let ensurer = Ensurer::new(
            pm,
            MockRegistry::new(),
            importer_expecting("eslint", Scope::Global),
        );
        let opts = ImportOptions::new(test_project()).install_flag(InstallFlag::Global);
        let module = ensurer.ensure_imported("eslint", &opts).await.unwrap();

        assert_eq!(module.scope, Scope::Global);
    }

    #[tokio::test]
    async fn test_ensure_imported_fails_when_install_is_not_listed() {
        let mut pm = MockPackageManager::new();
        pm.expect_list_top_level()
            .returning(|_, _, _| Ok(Listing::default()));
        pm.expect_install().times(1).returning(|_, _, _| Ok(()));
        let mut importer = MockImporter::new();
        importer.expect_import().never();

        let ensurer = Ensurer::new(pm, MockRegistry::new(), importer);
        let err = ensurer
            .ensure_imported("left-pad", &ImportOptions::new(test_project()))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not listed in the local scope"));
    }

    #[tokio::test]
    async fn test_ensure_imported_install_failure_propagates() {
        let mut pm = MockPackageManager::new();
        pm.expect_list_top_level()
            .returning(|_, _, _| Ok(Listing::default()));
        pm.expect_install()
            .returning(|_, _, _| Err(anyhow::anyhow!("Failed to install left-pad")));

        let ensurer = Ensurer::new(pm, MockRegistry::new(), MockImporter::new());
        let err = ensurer
            .ensure_imported("left-pad", &ImportOptions::new(test_project()))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to install left-pad"));
    }

    #[tokio::test]
    async fn test_ensure_imported_import_failure_propagates() {
        let mut pm = MockPackageManager::new();
        pm.expect_list_top_level()
            .returning(|_, _, _| Ok(listing(&[("chalk", "5.3.0")])));
        let mut importer = MockImporter::new();
        importer
            .expect_import()
            .returning(|_, _, _| Err(anyhow::anyhow!("Cannot find module 'chalk'")));

        let ensurer = Ensurer::new(pm, MockRegistry::new(), importer);
        let err = ensurer
            .ensure_imported("chalk", &ImportOptions::new(test_project()))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to import chalk (local)"));
    }

    #[tokio::test]
    async fn test_ensure_version_imported_skips_unsatisfying_local() {
        let mut pm = MockPackageManager::new();
        pm.expect_list_top_level()
            .with(eq("lodash"), eq(Scope::Local), eq(test_project()))
            .returning(|_, _, _| Ok(listing(&[("lodash", "3.10.1")])));
        pm.expect_list_top_level()
            .with(eq("lodash"), eq(Scope::Global), eq(test_project()))
            .returning(|_, _, _| Ok(listing(&[("lodash", "4.2.0")])));
        pm.expect_install().never();

        let ensurer = Ensurer::new(
            pm,
            MockRegistry::new(),
            importer_expecting("lodash", Scope::Global),
        );
        let module = ensurer
            .ensure_version_imported("lodash", "^4.0.0", &ImportOptions::new(test_project()))
            .await
            .unwrap();

        assert_eq!(module.scope, Scope::Global);
    }

    #[tokio::test]
    async fn test_ensure_version_imported_latest_resolves_once_and_installs() {
        let mut registry = MockRegistry::new();
        registry
            .expect_latest_version()
            .times(1)
            .returning(|_| Ok("2.1.0".to_string()));

        let mut seq = Sequence::new();
        let mut pm = MockPackageManager::new();
        pm.expect_list_top_level()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(listing(&[("left-pad", "2.0.0")])));
        pm.expect_install()
            .with(
                eq(InstallTarget::pinned("left-pad", "2.1.0")),
                eq(InstallFlag::DevDependence),
                eq(test_project()),
            )
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        pm.expect_list_top_level()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(listing(&[("left-pad", "2.1.0")])));

        let ensurer = Ensurer::new(pm, registry, importer_expecting("left-pad", Scope::Local));
        let opts = ImportOptions::new(test_project()).install_flag(InstallFlag::DevDependence);
        let module = ensurer
            .ensure_version_imported("left-pad", "latest", &opts)
            .await
            .unwrap();

        assert_eq!(module.scope, Scope::Local);
    }

    #[tokio::test]
    async fn test_ensure_version_imported_malformed_installs_unpinned() {
        let mut seq = Sequence::new();
        let mut pm = MockPackageManager::new();
        pm.expect_install()
            .with(eq(InstallTarget::bare("chalk")), eq(InstallFlag::Dependence), eq(test_project()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        pm.expect_list_top_level()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(listing(&[("chalk", "5.3.0")])));

        let ensurer = Ensurer::new(pm, MockRegistry::new(), importer_expecting("chalk", Scope::Local));
        let module = ensurer
            .ensure_version_imported("chalk", "not-a-valid-range", &ImportOptions::new(test_project()))
            .await
            .unwrap();

        assert_eq!(module.name, "chalk");
    }
}
