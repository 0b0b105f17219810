//! npm-compatible command-line package manager.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};

use super::{Listing, PackageManager};
use crate::package::{InstallFlag, InstallTarget, Scope};
use crate::runtime::{Invocation, Runtime};

/// Drives an npm-compatible CLI (`npm` by default) through a [`Runtime`].
#[derive(Debug, Clone)]
pub struct NpmCli<R: Runtime> {
    runtime: R,
    program: String,
}

impl<R: Runtime> NpmCli<R> {
    pub fn new(runtime: R, program: impl Into<String>) -> Self {
        Self {
            runtime,
            program: program.into(),
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    fn list_invocation(&self, name: &str, scope: Scope, cwd: &Path) -> Invocation {
        Invocation::new(
            &self.program,
            [
                "ls",
                "--json",
                "--parseable",
                "--depth=0",
                "--global",
                if scope.is_global() { "true" } else { "false" },
                name,
            ],
            cwd,
        )
    }

    fn install_invocation(&self, target: &InstallTarget, flag: InstallFlag, cwd: &Path) -> Invocation {
        Invocation::new(
            &self.program,
            ["install".to_string(), flag.as_arg().to_string(), target.to_string()],
            cwd,
        )
    }

    /// The directory globally installed packages live in (`<tool> root --global`).
    #[tracing::instrument(skip(self))]
    pub async fn global_root(&self, cwd: &Path) -> Result<PathBuf> {
        let invocation = Invocation::new(&self.program, ["root", "--global"], cwd);
        let output = self.runtime.run(&invocation).await?;
        if !output.success() {
            bail!(
                "`{}` exited with {:?}: {}",
                invocation,
                output.code,
                output.stderr_lossy().trim()
            );
        }

        let root = output.stdout_lossy().trim().to_string();
        if root.is_empty() {
            bail!("`{}` printed no directory", invocation);
        }
        debug!("Global package root: {}", root);
        Ok(PathBuf::from(root))
    }
}

#[async_trait]
impl<R: Runtime> PackageManager for NpmCli<R> {
    #[tracing::instrument(skip(self))]
    async fn list_top_level(&self, name: &str, scope: Scope, cwd: &Path) -> Result<Listing> {
        let invocation = self.list_invocation(name, scope, cwd);
        let output = self.runtime.run(&invocation).await?;
        if !output.success() {
            bail!(
                "`{}` exited with {:?}: {}",
                invocation,
                output.code,
                output.stderr_lossy().trim()
            );
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("Failed to parse JSON output of `{}`", invocation))
    }

    #[tracing::instrument(skip(self))]
    async fn install(&self, target: &InstallTarget, flag: InstallFlag, cwd: &Path) -> Result<()> {
        let invocation = self.install_invocation(target, flag, cwd);
        info!("Installing {} with `{}`", target, invocation);

        let output = self
            .runtime
            .run(&invocation)
            .await
            .with_context(|| format!("Failed to install {}", target))?;
        if !output.success() {
            bail!(
                "Failed to install {}: `{}` exited with {:?}\n{}",
                target,
                invocation,
                output.code,
                output.stderr_lossy().trim()
            );
        }

        debug!("{}", output.stdout_lossy().trim());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{CommandOutput, MockRuntime};
    use crate::test_utils::test_project;

    fn ok(stdout: &str) -> CommandOutput {
        CommandOutput {
            code: Some(0),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        }
    }

    fn failed(code: i32, stderr: &str) -> CommandOutput {
        CommandOutput {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_list_top_level_invocation_shape() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_run()
            .withf(|inv| {
                inv.program == "npm"
                    && inv.args
                        == [
                            "ls",
                            "--json",
                            "--parseable",
                            "--depth=0",
                            "--global",
                            "false",
                            "lodash",
                        ]
                    && inv.cwd == test_project()
            })
            .times(1)
            .returning(|_| Ok(ok(r#"{"dependencies":{"lodash":{"version":"4.2.0"}}}"#)));

        let npm = NpmCli::new(runtime, "npm");
        let listing = npm
            .list_top_level("lodash", Scope::Local, &test_project())
            .await
            .unwrap();

        assert_eq!(listing.version_of("lodash"), Some("4.2.0"));
    }

    #[tokio::test]
    async fn test_list_top_level_global_flag() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_run()
            .withf(|inv| inv.args[4] == "--global" && inv.args[5] == "true")
            .returning(|_| Ok(ok("{}")));

        let npm = NpmCli::new(runtime, "npm");
        let listing = npm
            .list_top_level("typescript", Scope::Global, &test_project())
            .await
            .unwrap();

        assert_eq!(listing.version_of("typescript"), None);
    }

    #[tokio::test]
    async fn test_list_top_level_non_zero_exit_fails() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_run()
            .returning(|_| Ok(failed(1, "npm ERR! missing: lodash")));

        let npm = NpmCli::new(runtime, "npm");
        let err = npm
            .list_top_level("lodash", Scope::Local, &test_project())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("npm ERR! missing"));
    }

    #[tokio::test]
    async fn test_list_top_level_invalid_json_fails() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_run()
            .returning(|_| Ok(ok("/home/user/project/node_modules/lodash")));

        let npm = NpmCli::new(runtime, "npm");
        let err = npm
            .list_top_level("lodash", Scope::Local, &test_project())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to parse JSON"));
    }

    #[tokio::test]
    async fn test_install_invocation_shape() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_run()
            .withf(|inv| inv.program == "pnpm" && inv.args == ["install", "--save-dev", "lodash@^4.0.0"])
            .times(1)
            .returning(|_| Ok(ok("added 1 package")));

        let npm = NpmCli::new(runtime, "pnpm");
        npm.install(
            &InstallTarget::pinned("lodash", "^4.0.0"),
            InstallFlag::DevDependence,
            &test_project(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_install_non_zero_exit_fails() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_run()
            .returning(|_| Ok(failed(1, "npm ERR! 404 Not Found")));

        let npm = NpmCli::new(runtime, "npm");
        let err = npm
            .install(
                &InstallTarget::bare("no-such-package"),
                InstallFlag::Dependence,
                &test_project(),
            )
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("Failed to install no-such-package"));
        assert!(msg.contains("404"));
    }

    #[tokio::test]
    async fn test_install_spawn_failure_propagates() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_run()
            .returning(|_| Err(anyhow::anyhow!("Failed to spawn `npm`")));

        let npm = NpmCli::new(runtime, "npm");
        let err = npm
            .install(&InstallTarget::bare("left-pad"), InstallFlag::Global, &test_project())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to install left-pad"));
    }

    #[tokio::test]
    async fn test_global_root() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_run()
            .withf(|inv| inv.args == ["root", "--global"])
            .returning(|_| Ok(ok("/usr/local/lib/node_modules\n")));

        let npm = NpmCli::new(runtime, "npm");
        let root = npm.global_root(&test_project()).await.unwrap();

        assert_eq!(root, PathBuf::from("/usr/local/lib/node_modules"));
    }

    #[tokio::test]
    async fn test_global_root_failure() {
        let mut runtime = MockRuntime::new();
        runtime.expect_run().returning(|_| Ok(failed(127, "")));

        let npm = NpmCli::new(runtime, "npm");
        assert!(npm.global_root(&test_project()).await.is_err());

        let mut runtime = MockRuntime::new();
        runtime.expect_run().returning(|_| Ok(ok("  \n")));

        let npm = NpmCli::new(runtime, "npm");
        let err = npm.global_root(&test_project()).await.unwrap_err();
        assert!(err.to_string().contains("printed no directory"));
    }
}
