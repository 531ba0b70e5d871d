//! Subprocess build execution.

use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use buildmend_core::{BuildOutcome, BuildRunner, MendError};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::command::BuildCommand;

const SPAWN_RETRY_DELAY_MS: u64 = 250;

/// Runs a [`BuildCommand`] as a child process.
#[derive(Debug, Clone)]
pub struct CommandBuildRunner {
    command: BuildCommand,
}

impl CommandBuildRunner {
    pub fn new(command: BuildCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &BuildCommand {
        &self.command
    }

    /// Execute the build once and capture combined output.
    ///
    /// Spawn failures are retried up to `spawn_attempts` times. A build
    /// that exceeds its timeout is killed together with every process it
    /// started, and reported as a timed-out failure with empty output.
    pub async fn execute(&self) -> anyhow::Result<BuildOutcome> {
        let config = &self.command;
        if config.command.is_empty() {
            anyhow::bail!("Build {} has empty command", config.name);
        }

        let start = Instant::now();
        let child = self.spawn_with_retry().await?;
        let pid = child.id();

        let output = if config.timeout_ms > 0 {
            match tokio::time::timeout(
                Duration::from_millis(config.timeout_ms),
                child.wait_with_output(),
            )
            .await
            {
                Ok(output) => output?,
                Err(_) => {
                    kill_process_group(pid).await;
                    warn!(
                        build = %config.name,
                        timeout_ms = config.timeout_ms,
                        "build timed out; process group killed"
                    );
                    return Ok(BuildOutcome::timed_out(start.elapsed().as_millis() as u64));
                }
            }
        } else {
            child.wait_with_output().await?
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        let mut outcome = if output.status.success() {
            BuildOutcome::passed(combined)
        } else {
            BuildOutcome::failed(combined, output.status.code().unwrap_or(-1))
        };
        outcome.duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            build = %config.name,
            exit_code = outcome.exit_code,
            duration_ms = outcome.duration_ms,
            "build process exited"
        );
        Ok(outcome)
    }

    async fn spawn_with_retry(&self) -> anyhow::Result<tokio::process::Child> {
        let config = &self.command;
        let attempts = config.spawn_attempts.max(1);
        let mut attempt = 1;

        loop {
            let mut command = Command::new(&config.command[0]);
            command
                .args(&config.command[1..])
                .current_dir(&config.work_dir)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            // Own process group, so a timeout can take down grandchildren too.
            #[cfg(unix)]
            command.process_group(0);

            let spawned = command.spawn();

            match spawned {
                Ok(child) => return Ok(child),
                Err(err) if attempt < attempts => {
                    warn!(build = %config.name, attempt, error = %err, "spawn failed; retrying");
                    let delay = SPAWN_RETRY_DELAY_MS * u64::from(attempt);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!(
                            "failed to spawn {} after {attempts} attempt(s)",
                            config.command[0]
                        )
                    })
                }
            }
        }
    }
}

/// SIGKILL the process group led by `pid`.
#[cfg(unix)]
async fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    let status = Command::new("kill")
        .args(["-KILL", "--", &format!("-{pid}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(err) = status {
        debug!(pid, error = %err, "process group kill failed");
    }
}

#[cfg(not(unix))]
async fn kill_process_group(_pid: Option<u32>) {}

#[async_trait]
impl BuildRunner for CommandBuildRunner {
    async fn run_build(&self) -> buildmend_core::Result<BuildOutcome> {
        self.execute()
            .await
            .map_err(|err| MendError::Build(format!("{err:#}")))
    }
}
