// Child process plumbing shared by all runners: spawn, feed stdin, collect output, enforce limits
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

use crate::error::ExecError;

/// Captured result of a process that exited on its own.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Stderr if the process wrote any, otherwise a description of the exit status.
    pub fn failure_message(&self) -> String {
        if self.stderr.trim().is_empty() {
            describe_exit(&self.status)
        } else {
            self.stderr.clone()
        }
    }
}

#[derive(Debug)]
pub enum ProcessOutcome {
    Completed(ProcessOutput),
    /// The deadline passed and the child was killed.
    TimedOut,
    /// stdout or stderr grew past the output cap and the child was killed.
    OutputLimitExceeded,
}

/// Upper bounds applied to one child process. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLimits {
    pub timeout: Option<Duration>,
    /// Per-stream cap on captured stdout and stderr, in bytes.
    pub max_output_bytes: Option<usize>,
}

enum CaptureError {
    Io(io::Error),
    Overflow,
}

impl From<io::Error> for CaptureError {
    fn from(e: io::Error) -> Self {
        CaptureError::Io(e)
    }
}

/// Read `pipe` to EOF, giving up as soon as more than `limit` bytes arrive.
async fn read_capped<R>(pipe: Option<R>, limit: Option<usize>) -> Result<Vec<u8>, CaptureError>
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return Ok(Vec::new());
    };

    let mut buf = Vec::new();
    match limit {
        Some(limit) => {
            let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
            pipe.take(cap).read_to_end(&mut buf).await?;
            if buf.len() > limit {
                return Err(CaptureError::Overflow);
            }
        }
        None => {
            pipe.read_to_end(&mut buf).await?;
        }
    }
    Ok(buf)
}

/// Run `command` to completion.
///
/// `stdin` is written in a single write and the pipe is closed right after, so
/// the child sees EOF; an empty or absent input closes the pipe immediately.
/// A child still running at the deadline, or writing more than the output cap
/// to either stream, is killed.
/// A spawn failure means the program could not be started at all and is
/// reported as a missing toolchain.
pub async fn run_process(
    mut command: Command,
    stdin: Option<&str>,
    limits: ProcessLimits,
) -> Result<ProcessOutcome, ExecError> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();

    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| {
        ExecError::ToolchainMissing(format!(
            "Failed to start '{}': {}. Make sure it is installed and on PATH.",
            program, e
        ))
    })?;

    let stdin_pipe = child.stdin.take();
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let input = stdin.unwrap_or_default().as_bytes().to_vec();

    let feed = async move {
        if let Some(mut pipe) = stdin_pipe {
            if !input.is_empty() {
                // The child may exit without reading its input; a broken pipe is expected then.
                if let Err(e) = pipe.write_all(&input).await {
                    debug!(error = %e, "Failed to write stdin to child");
                }
            }
            drop(pipe);
        }
        Ok::<(), CaptureError>(())
    };

    let run = async {
        let captured = tokio::try_join!(
            feed,
            read_capped(stdout_pipe, limits.max_output_bytes),
            read_capped(stderr_pipe, limits.max_output_bytes),
        );

        match captured {
            Ok(((), stdout, stderr)) => match child.wait().await {
                Ok(status) => Ok(ProcessOutcome::Completed(ProcessOutput {
                    status,
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                })),
                Err(e) => Err(ExecError::from(e)),
            },
            Err(CaptureError::Overflow) => {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "Failed to kill child after output overflow");
                }
                Ok(ProcessOutcome::OutputLimitExceeded)
            }
            Err(CaptureError::Io(e)) => Err(ExecError::from(e)),
        }
    };

    match limits.timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(outcome) => outcome,
            // The child is dropped on return, and kill_on_drop kills it.
            Err(_) => Ok(ProcessOutcome::TimedOut),
        },
        None => run.await,
    }
}

/// Human-readable description of a non-zero exit.
pub fn describe_exit(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("Process exited with status {}", code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return match signal {
                11 => "Process terminated by signal 11 (segmentation fault)".to_string(),
                9 => "Process terminated by signal 9 (killed, possibly out of memory)".to_string(),
                other => format!("Process terminated by signal {}", other),
            };
        }
    }

    "Process terminated abnormally".to_string()
}
