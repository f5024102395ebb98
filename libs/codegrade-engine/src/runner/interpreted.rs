use codegrade_common::config::ToolchainConfig;
use tokio::process::Command;
use tracing::instrument;

use super::{execute, require, RunLimits};
use crate::error::ExecError;
use crate::workspace::Workspace;

/// Runs a script file with an interpreter: `<interpreter> [flags] <script>`.
#[derive(Debug)]
pub struct InterpretedRunner<'a> {
    interpreter: &'a str,
    flags: &'a [String],
    script_name: &'static str,
}

impl<'a> InterpretedRunner<'a> {
    pub fn new(toolchain: &'a ToolchainConfig, script_name: &'static str) -> Result<Self, ExecError> {
        Ok(Self {
            interpreter: require(toolchain.runtime.as_deref(), "interpreter", toolchain)?,
            flags: &toolchain.flags,
            script_name,
        })
    }

    #[instrument(skip_all, fields(run_id = %workspace.id(), interpreter = self.interpreter))]
    pub async fn run(
        &self,
        workspace: &Workspace,
        source_code: &str,
        stdin: &str,
        limits: &RunLimits,
    ) -> Result<String, ExecError> {
        let script = workspace.write_source(self.script_name, source_code).await?;

        let mut cmd = Command::new(self.interpreter);
        cmd.args(self.flags).arg(&script).current_dir(workspace.dir());

        execute(cmd, stdin, limits).await
    }
}
