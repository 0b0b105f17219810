//! External process execution with bounded output capture.

use anyhow::{Context, Result, bail};
use log::debug;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::{CommandOutput, Invocation, RealRuntime};

/// Upper bound on captured bytes per output stream (about 10 MB).
pub const MAX_OUTPUT_BYTES: usize = 1024 * 10000;

impl RealRuntime {
    #[tracing::instrument(skip(self, invocation), fields(command = %invocation))]
    pub(crate) async fn run_impl(&self, invocation: &Invocation) -> Result<CommandOutput> {
        debug!("Running `{}` in {}", invocation, invocation.cwd.display());

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn `{}`", invocation))?;

        let stdout = child
            .stdout
            .take()
            .context("Child stdout was not captured")?;
        let stderr = child
            .stderr
            .take()
            .context("Child stderr was not captured")?;

        // Dropping the child on error kills it
        let (stdout, stderr) =
            tokio::try_join!(read_bounded(stdout, "stdout"), read_bounded(stderr, "stderr"))
                .with_context(|| format!("Failed to capture output of `{}`", invocation))?;

        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for `{}`", invocation))?;

        debug!(
            "`{}` exited with {:?} ({} bytes stdout, {} bytes stderr)",
            invocation,
            status.code(),
            stdout.len(),
            stderr.len()
        );

        Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

async fn read_bounded<R>(reader: R, stream: &'static str) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .take(MAX_OUTPUT_BYTES as u64 + 1)
        .read_to_end(&mut buf)
        .await
        .with_context(|| format!("Failed to read {}", stream))?;

    if buf.len() > MAX_OUTPUT_BYTES {
        bail!("{} exceeded the limit of {} bytes", stream, MAX_OUTPUT_BYTES);
    }
    Ok(buf)
}
