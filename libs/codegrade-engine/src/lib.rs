//! Compile-and-run engine for grading student submissions.
//!
//! [`CodeExecutor`] is the entry point: single runs, custom-input runs, test
//! case evaluation and toolchain probing.

pub mod error;
pub mod evaluator;
pub mod executor;
pub mod policy;
pub mod probe;
pub mod process;
pub mod runner;
pub mod sanitize;
pub mod workspace;


pub use codegrade_common::config::{EngineConfig, ToolchainConfig};
pub use codegrade_common::types::{
    ErrorKind, EvaluationSummary, ExecutionRequest, ExecutionResult, Language, ProbeResult,
    TestCase, TestCaseOutcome,
};
pub use error::ExecError;
pub use executor::{CodeExecutor, EvaluationOptions};
pub use workspace::{Workspace, WorkspaceManager};
