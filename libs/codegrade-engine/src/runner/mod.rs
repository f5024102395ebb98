/// Language Runners
///
/// A runner owns the compile (if any) and execute steps for one submission
/// inside its workspace. Runners only know HOW to build and run code; they do
/// not validate requests and do not judge output.
///
/// - [`NativeRunner`]: C and C++, compiled to a native binary
/// - [`JavaRunner`]: javac + JVM, with optional snippet repairs
/// - [`InterpretedRunner`]: any interpreter taking a script path (Python)

mod interpreted;
mod java;
mod native;

pub use interpreted::InterpretedRunner;
pub use java::{normalize_java_source, public_class_name, JavaRunner};
pub use native::NativeRunner;

use std::time::Duration;

use codegrade_common::config::{EngineConfig, ToolchainConfig};
use codegrade_common::types::Language;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{format_seconds, ExecError};
use crate::process::{run_process, ProcessLimits, ProcessOutcome};
use crate::sanitize::first_line_preview;
use crate::workspace::Workspace;

/// Time and output budget for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    pub time_limit_ms: u64,
    /// `None` leaves the compile step unbounded.
    pub compile_timeout_ms: Option<u64>,
    /// Cap on captured stdout and on stderr, each, for compile and run.
    pub max_output_bytes: usize,
}

impl RunLimits {
    fn for_run(&self) -> ProcessLimits {
        ProcessLimits {
            timeout: Some(Duration::from_millis(self.time_limit_ms)),
            max_output_bytes: Some(self.max_output_bytes),
        }
    }

    fn for_compile(&self) -> ProcessLimits {
        ProcessLimits {
            timeout: self.compile_timeout_ms.map(Duration::from_millis),
            max_output_bytes: Some(self.max_output_bytes),
        }
    }
}

/// Runner selected for a language.
#[derive(Debug)]
pub enum Runner<'a> {
    Native(NativeRunner<'a>),
    Java(JavaRunner<'a>),
    Interpreted(InterpretedRunner<'a>),
}

impl<'a> Runner<'a> {
    pub fn for_language(
        language: Language,
        toolchain: &'a ToolchainConfig,
        config: &EngineConfig,
    ) -> Result<Self, ExecError> {
        let runner = match language {
            Language::Cpp => Runner::Native(NativeRunner::new(toolchain, "main.cpp")?),
            Language::C => Runner::Native(NativeRunner::new(toolchain, "main.c")?),
            Language::Java => Runner::Java(JavaRunner::new(toolchain, config.java_repairs)?),
            Language::Python => Runner::Interpreted(InterpretedRunner::new(toolchain, "main.py")?),
        };
        Ok(runner)
    }

    /// Build (if needed) and run `source_code`, returning stdout on success.
    pub async fn run(
        &self,
        workspace: &Workspace,
        source_code: &str,
        stdin: &str,
        limits: &RunLimits,
    ) -> Result<String, ExecError> {
        match self {
            Runner::Native(runner) => runner.run(workspace, source_code, stdin, limits).await,
            Runner::Java(runner) => runner.run(workspace, source_code, stdin, limits).await,
            Runner::Interpreted(runner) => runner.run(workspace, source_code, stdin, limits).await,
        }
    }
}

/// Run a compiler command. Any non-zero exit is a compilation error carrying the compiler output.
pub(crate) async fn compile(command: Command, limits: &RunLimits) -> Result<(), ExecError> {
    match run_process(command, None, limits.for_compile()).await? {
        ProcessOutcome::Completed(output) if output.status.success() => {
            debug!("Compilation succeeded");
            Ok(())
        }
        ProcessOutcome::Completed(output) => {
            // Some compilers report diagnostics on stdout.
            let message = if output.stderr.trim().is_empty() && !output.stdout.trim().is_empty() {
                output.stdout.clone()
            } else {
                output.failure_message()
            };
            warn!(error_preview = %first_line_preview(&message), "Compilation failed");
            Err(ExecError::Compilation(message))
        }
        ProcessOutcome::TimedOut => {
            let ms = limits.compile_timeout_ms.unwrap_or_default();
            warn!(compile_timeout_ms = ms, "Compilation timed out");
            Err(ExecError::Compilation(format!(
                "Compilation timeout ({} seconds)",
                format_seconds(&ms)
            )))
        }
        ProcessOutcome::OutputLimitExceeded => {
            warn!(max_output_bytes = limits.max_output_bytes, "Compiler output limit exceeded");
            Err(ExecError::Compilation("Compiler output limit exceeded".to_string()))
        }
    }
}

/// Run the built program under the run time limit and classify the outcome.
pub(crate) async fn execute(
    command: Command,
    stdin: &str,
    limits: &RunLimits,
) -> Result<String, ExecError> {
    match run_process(command, Some(stdin), limits.for_run()).await? {
        ProcessOutcome::Completed(output) if output.status.success() => {
            Ok(output.stdout.trim_end().to_string())
        }
        ProcessOutcome::Completed(output) => {
            let message = output.failure_message();
            debug!(error_preview = %first_line_preview(&message), "Program exited with failure");
            Err(ExecError::Runtime(message))
        }
        ProcessOutcome::TimedOut => Err(ExecError::Timeout(limits.time_limit_ms)),
        ProcessOutcome::OutputLimitExceeded => {
            debug!(max_output_bytes = limits.max_output_bytes, "Program output limit exceeded");
            Err(ExecError::OutputLimitExceeded)
        }
    }
}

fn require<'a>(value: Option<&'a str>, what: &str, toolchain: &ToolchainConfig) -> Result<&'a str, ExecError> {
    value.ok_or_else(|| {
        ExecError::ToolchainMissing(format!("{} ({} is not configured)", toolchain.missing_message, what))
    })
}
