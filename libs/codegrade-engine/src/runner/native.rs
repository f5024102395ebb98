use codegrade_common::config::ToolchainConfig;
use tokio::process::Command;
use tracing::instrument;

use super::{compile, execute, require, RunLimits};
use crate::error::ExecError;
use crate::workspace::Workspace;

#[cfg(windows)]
const BINARY_NAME: &str = "main.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "main";

/// Compiles C or C++ to a native binary and runs it.
#[derive(Debug)]
pub struct NativeRunner<'a> {
    compiler: &'a str,
    flags: &'a [String],
    source_name: &'static str,
}

impl<'a> NativeRunner<'a> {
    pub fn new(toolchain: &'a ToolchainConfig, source_name: &'static str) -> Result<Self, ExecError> {
        Ok(Self {
            compiler: require(toolchain.compiler.as_deref(), "compiler", toolchain)?,
            flags: &toolchain.flags,
            source_name,
        })
    }

    #[instrument(skip_all, fields(run_id = %workspace.id(), compiler = self.compiler))]
    pub async fn run(
        &self,
        workspace: &Workspace,
        source_code: &str,
        stdin: &str,
        limits: &RunLimits,
    ) -> Result<String, ExecError> {
        let source = workspace.write_source(self.source_name, source_code).await?;
        let binary = workspace.file(BINARY_NAME);

        let mut compile_cmd = Command::new(self.compiler);
        compile_cmd
            .args(self.flags)
            .arg(&source)
            .arg("-o")
            .arg(&binary)
            .current_dir(workspace.dir());
        compile(compile_cmd, limits).await?;

        let mut run_cmd = Command::new(&binary);
        run_cmd.current_dir(workspace.dir());
        let result = execute(run_cmd, stdin, limits).await;

        workspace.remove_artifact(BINARY_NAME).await;
        result
    }
}
