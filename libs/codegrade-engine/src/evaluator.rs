/// Test-Case Evaluator - scoring logic
///
/// **Core Responsibility:**
/// Compare execution results against expected outputs and aggregate a score.
///
/// **Properties:**
/// - Knows nothing about processes, compilers or workspaces
/// - Pure functions: (execution results, test cases) → summary
///
/// **Scoring Rules:**
/// - A case passes iff the run succeeded and trimmed outputs are equal
/// - total_score = number of passed cases
/// - percentage = round(100 * passed / total), 0 when there are no cases
///
/// **Normalization Rules:**
/// - Trim leading and trailing whitespace: YES
/// - Internal whitespace, case: preserved, exact match required
/// - Numeric tolerance: NO

use codegrade_common::types::{
    ErrorKind, EvaluationSummary, ExecutionResult, TestCase, TestCaseOutcome,
};

fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Judge one test case against the run that used its input.
pub fn judge_case(test_case: &TestCase, result: &ExecutionResult) -> TestCaseOutcome {
    let passed = result.success
        && normalize_output(&result.output) == normalize_output(&test_case.expected_output);

    TestCaseOutcome {
        input: test_case.input.clone(),
        expected_output: test_case.expected_output.clone(),
        actual_output: result.output.clone(),
        passed,
        error: result.error.clone(),
        error_kind: result.error_kind,
        execution_time_ms: result.execution_time_ms,
    }
}

/// Failures decided by the submission alone: every other input fails the same way.
pub fn is_submission_error(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Compilation | ErrorKind::Policy | ErrorKind::ToolchainMissing
    )
}

/// Outcome recorded for a case that was not executed because `first` already
/// failed with a submission error.
pub fn skipped_after_submission_error(test_case: &TestCase, first: &TestCaseOutcome) -> TestCaseOutcome {
    TestCaseOutcome {
        input: test_case.input.clone(),
        expected_output: test_case.expected_output.clone(),
        actual_output: String::new(),
        passed: false,
        error: first.error.clone(),
        error_kind: first.error_kind,
        execution_time_ms: 0,
    }
}

/// Rounded pass percentage, half rounding up.
pub fn percentage(passed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let passed = u64::from(passed);
    let total = u64::from(total);
    ((200 * passed + total) / (2 * total)) as u32
}

/// Aggregate ordered per-case outcomes into a summary.
pub fn aggregate(results: Vec<TestCaseOutcome>) -> EvaluationSummary {
    let total_tests = results.len() as u32;
    let total_score = results.iter().filter(|r| r.passed).count() as u32;

    EvaluationSummary {
        percentage: percentage(total_score, total_tests),
        results,
        total_score,
        total_tests,
    }
}
