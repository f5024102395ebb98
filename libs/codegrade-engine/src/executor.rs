/// Execution Coordinator - high-level orchestration
///
/// **Responsibility:**
/// Validate a request, pick the runner, run it inside a fresh workspace and
/// normalize whatever happened into one [`ExecutionResult`].
///
/// **Pipeline per run:**
/// 1. Request shape checks, language lookup, size limits, denylist scan
/// 2. Toolchain probe
/// 3. Workspace allocation
/// 4. Runner compile + execute
/// 5. Workspace release (on every exit path, drop guard for panics)
///
/// Nothing here returns an error to the caller: every failure becomes an
/// `ExecutionResult` with an `error_kind`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use codegrade_common::config::EngineConfig;
use codegrade_common::types::{
    EvaluationSummary, ExecutionRequest, ExecutionResult, Language, ProbeResult, TestCase,
    TestCaseOutcome, UnknownLanguage,
};
use tracing::{debug, info, instrument, warn};

use crate::error::ExecError;
use crate::evaluator;
use crate::policy::Policy;
use crate::probe;
use crate::runner::{RunLimits, Runner};
use crate::sanitize::first_line_preview;
use crate::workspace::WorkspaceManager;

/// Options for [`CodeExecutor::evaluate_with_options`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationOptions {
    /// Once a case fails with an error that does not depend on its input
    /// (compilation, policy, missing toolchain), record the remaining cases
    /// with that error instead of running them.
    pub stop_on_submission_error: bool,
}

impl EvaluationOptions {
    /// Settings for a dry run over the sample cases.
    pub fn dry_run() -> Self {
        Self {
            stop_on_submission_error: true,
        }
    }
}

/// Cheap-to-clone handle to the execution engine.
#[derive(Debug, Clone)]
pub struct CodeExecutor {
    config: Arc<EngineConfig>,
    policy: Arc<Policy>,
    workspaces: WorkspaceManager,
}

impl CodeExecutor {
    pub fn new(config: EngineConfig) -> Self {
        let policy = Policy::from_config(&config);
        let workspaces = WorkspaceManager::new(config.work_dir.clone());
        Self {
            config: Arc::new(config),
            policy: Arc::new(policy),
            workspaces,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Single ad-hoc run. `time_limit_ms` falls back to the configured default.
    #[instrument(skip_all, fields(language = %language, time_limit_ms = ?time_limit_ms))]
    pub async fn execute_code(
        &self,
        source_code: &str,
        language: &str,
        stdin: &str,
        time_limit_ms: Option<u64>,
    ) -> ExecutionResult {
        let start = Instant::now();
        let outcome = self
            .run_checked(source_code, language, stdin, time_limit_ms, self.config.default_time_limit_ms)
            .await;
        self.finish(outcome, start)
    }

    /// Run with caller-provided input for interactive testing; no scoring.
    /// Uses the longer custom-input time limit when none is given.
    #[instrument(skip_all, fields(language = %language))]
    pub async fn execute_with_custom_input(
        &self,
        source_code: &str,
        language: &str,
        custom_input: &str,
        time_limit_ms: Option<u64>,
    ) -> ExecutionResult {
        let start = Instant::now();
        let outcome = self
            .run_checked(
                source_code,
                language,
                custom_input,
                time_limit_ms,
                self.config.custom_input_time_limit_ms,
            )
            .await;
        self.finish(outcome, start)
    }

    pub async fn execute_request(&self, request: &ExecutionRequest) -> ExecutionResult {
        self.execute_code(
            &request.source_code,
            &request.language,
            &request.stdin,
            request.time_limit_ms,
        )
        .await
    }

    /// Grade `source_code` against every test case, in order.
    pub async fn evaluate_test_cases(
        &self,
        source_code: &str,
        language: &str,
        test_cases: &[TestCase],
        time_limit_ms: Option<u64>,
    ) -> EvaluationSummary {
        self.evaluate_with_options(
            source_code,
            language,
            test_cases,
            time_limit_ms,
            EvaluationOptions::default(),
        )
        .await
    }

    #[instrument(
        skip_all,
        fields(language = %language, test_count = test_cases.len(), dry_run = options.stop_on_submission_error)
    )]
    pub async fn evaluate_with_options(
        &self,
        source_code: &str,
        language: &str,
        test_cases: &[TestCase],
        time_limit_ms: Option<u64>,
        options: EvaluationOptions,
    ) -> EvaluationSummary {
        let mut outcomes: Vec<TestCaseOutcome> = Vec::with_capacity(test_cases.len());
        let mut stopped_at: Option<usize> = None;

        for (idx, test_case) in test_cases.iter().enumerate() {
            if let Some(first) = stopped_at {
                let skipped = evaluator::skipped_after_submission_error(test_case, &outcomes[first]);
                outcomes.push(skipped);
                continue;
            }

            let result = self
                .execute_code(source_code, language, &test_case.input, time_limit_ms)
                .await;
            let outcome = evaluator::judge_case(test_case, &result);

            debug!(
                test_num = idx + 1,
                passed = outcome.passed,
                error_kind = %outcome.error_kind,
                execution_ms = outcome.execution_time_ms,
                "Test case judged"
            );

            if options.stop_on_submission_error && evaluator::is_submission_error(result.error_kind) {
                warn!(
                    test_num = idx + 1,
                    error_kind = %result.error_kind,
                    "Submission cannot run; remaining cases marked as failed"
                );
                stopped_at = Some(outcomes.len());
            }

            outcomes.push(outcome);
        }

        let summary = evaluator::aggregate(outcomes);
        info!(
            score = summary.total_score,
            total = summary.total_tests,
            percentage = summary.percentage,
            "Evaluation complete"
        );
        summary
    }

    /// Whether the toolchain for `language` is usable on this host.
    pub async fn check_compiler_availability(&self, language: &str) -> ProbeResult {
        probe::probe_language(&self.config, language).await
    }

    /// Availability of every supported language, keyed by canonical name.
    pub async fn check_all_compilers(&self) -> BTreeMap<String, ProbeResult> {
        probe::probe_all(&self.config).await
    }

    fn finish(&self, outcome: Result<String, ExecError>, start: Instant) -> ExecutionResult {
        let execution_time_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                info!(execution_ms = execution_time_ms, "Execution succeeded");
                ExecutionResult::success(output, execution_time_ms)
            }
            Err(e) => {
                let kind = e.kind();
                let message = e.to_string();
                match &e {
                    ExecError::BannedPattern { pattern } => {
                        warn!(error_kind = %kind, pattern = %pattern, "Submission rejected")
                    }
                    ExecError::Internal(io) => {
                        warn!(error_kind = %kind, error = %io, "Internal failure during execution")
                    }
                    _ => info!(
                        error_kind = %kind,
                        execution_ms = execution_time_ms,
                        error_preview = %first_line_preview(&message),
                        "Execution failed"
                    ),
                }
                ExecutionResult::failure(kind, message, execution_time_ms)
            }
        }
    }

    async fn run_checked(
        &self,
        source_code: &str,
        language: &str,
        stdin: &str,
        time_limit_ms: Option<u64>,
        default_time_limit_ms: u64,
    ) -> Result<String, ExecError> {
        self.policy.validate_request(source_code, language, time_limit_ms)?;

        let lang: Language = language
            .parse()
            .map_err(|e: UnknownLanguage| ExecError::UnsupportedLanguage(e.0))?;

        self.policy.check_sizes(source_code, stdin)?;
        self.policy.scan(source_code)?;

        let toolchain = self
            .config
            .toolchain(lang)
            .ok_or_else(|| ExecError::ToolchainMissing(format!("No toolchain configured for {}", lang)))?;

        let probe = probe::probe_toolchain(toolchain).await;
        if !probe.available {
            return Err(ExecError::ToolchainMissing(
                probe.error.unwrap_or_else(|| toolchain.missing_message.clone()),
            ));
        }

        let runner = Runner::for_language(lang, toolchain, &self.config)?;
        let limits = RunLimits {
            time_limit_ms: time_limit_ms.unwrap_or(default_time_limit_ms),
            compile_timeout_ms: self.config.compile_timeout_ms,
            max_output_bytes: self.config.max_output_bytes,
        };

        let workspace = self.workspaces.allocate().await?;
        debug!(run_id = %workspace.id(), language = %lang, time_limit_ms = limits.time_limit_ms, "Dispatching run");

        let result = runner.run(&workspace, source_code, stdin, &limits).await;

        workspace.release().await;
        result
    }
}
