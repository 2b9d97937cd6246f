//! Running tool processes.

use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{ToolError, ToolResult};
use crate::host::{ExecOptions, ExecOutput, ProcessExecutor};

use super::LOG_TARGET;

/// Spawns real processes, with `tokio::process` for async runs and
/// `std::process` for blocking ones.
///
/// An empty `ExecOptions::env` inherits the current environment; a
/// non-empty one replaces it.
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        Self
    }
}

fn command_line(program: &Path, args: &[String]) -> String {
    std::iter::once(program.display().to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn into_output(output: std::process::Output) -> ExecOutput {
    ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

#[async_trait]
impl ProcessExecutor for SystemExecutor {
    async fn exec(
        &self,
        program: &Path,
        args: &[String],
        options: ExecOptions,
    ) -> ToolResult<ExecOutput> {
        let command = command_line(program, args);
        log::debug!(target: LOG_TARGET, "exec: {}", command);

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(if options.input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        if !options.env.is_empty() {
            cmd.env_clear().envs(&options.env);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| ToolError::process(&command, e.to_string()))?;

        // stdin is fed while stdout and stderr are drained.
        let writer = match (child.stdin.take(), options.input) {
            (Some(mut stdin), Some(input)) => Some(tokio::spawn(async move {
                stdin.write_all(input.as_bytes()).await?;
                stdin.shutdown().await
            })),
            _ => None,
        };

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ToolError::process(&command, e.to_string()))?;

        if let Some(writer) = writer
            && let Ok(Err(err)) = writer.await
        {
            log::debug!(target: LOG_TARGET, "stdin of {} closed early: {}", command, err);
        }

        Ok(into_output(output))
    }

    fn exec_sync(
        &self,
        program: &Path,
        args: &[String],
        options: ExecOptions,
    ) -> ToolResult<ExecOutput> {
        let command = command_line(program, args);
        log::debug!(target: LOG_TARGET, "exec_sync: {}", command);

        let mut cmd = std::process::Command::new(program);
        cmd.args(args)
            .stdin(if options.input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        if !options.env.is_empty() {
            cmd.env_clear().envs(&options.env);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| ToolError::process(&command, e.to_string()))?;

        let writer = match (child.stdin.take(), options.input) {
            (Some(mut stdin), Some(input)) => Some(std::thread::spawn(move || {
                stdin.write_all(input.as_bytes())
            })),
            _ => None,
        };

        let output = child
            .wait_with_output()
            .map_err(|e| ToolError::process(&command, e.to_string()))?;

        if let Some(writer) = writer
            && let Ok(Err(err)) = writer.join()
        {
            log::debug!(target: LOG_TARGET, "stdin of {} closed early: {}", command, err);
        }

        Ok(into_output(output))
    }
}
