use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Languages the engine knows how to build and run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "java")]
    Java,
    #[serde(rename = "python3", alias = "python")]
    Python,
    #[serde(rename = "cpp", alias = "c++")]
    Cpp,
    #[serde(rename = "c")]
    C,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::Java, Language::Python, Language::Cpp, Language::C];

    pub fn is_compiled(&self) -> bool {
        !matches!(self, Language::Python)
    }
}

/// A language name the engine has no runner for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported language: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    /// Parse a caller-supplied language name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "python" | "python3" => Ok(Language::Python),
            "cpp" | "c++" => Ok(Language::Cpp),
            "c" => Ok(Language::C),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Java => "java",
            Language::Python => "python3",
            Language::Cpp => "cpp",
            Language::C => "c",
        };
        f.write_str(name)
    }
}

/// Classification of a failed run. Exactly one kind is set per result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    #[default]
    None,
    Compilation,
    Runtime,
    Timeout,
    Policy,
    ToolchainMissing,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::None => "none",
            ErrorKind::Compilation => "compilation",
            ErrorKind::Runtime => "runtime",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Policy => "policy",
            ErrorKind::ToolchainMissing => "toolchain-missing",
        };
        f.write_str(name)
    }
}

/// A single ad-hoc run as submitted by a caller.
///
/// `language` stays a raw string so an unknown value can be reported as a
/// policy failure instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub source_code: String,
    pub language: String,
    #[serde(default)]
    pub stdin: String,
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
}

/// Normalized outcome of one compile-and-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: String,
    pub execution_time_ms: u64,
    pub error_kind: ErrorKind,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: String::new(),
            execution_time_ms,
            error_kind: ErrorKind::None,
        }
    }

    pub fn failure(error_kind: ErrorKind, error: impl Into<String>, execution_time_ms: u64) -> Self {
        debug_assert!(error_kind != ErrorKind::None);
        Self {
            success: false,
            output: String::new(),
            error: error.into(),
            execution_time_ms,
            error_kind,
        }
    }
}

/// Input/expected-output pair supplied by the grading layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    #[serde(alias = "output")]
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// Per-case detail produced by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseOutcome {
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub passed: bool,
    pub error: String,
    pub error_kind: ErrorKind,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub results: Vec<TestCaseOutcome>,
    pub total_score: u32,
    pub total_tests: u32,
    pub percentage: u32,
}

impl EvaluationSummary {
    /// First non-empty case error, in test order.
    pub fn first_error(&self) -> Option<&str> {
        self.results
            .iter()
            .map(|r| r.error.as_str())
            .find(|e| !e.trim().is_empty())
    }

}

/// Toolchain availability as reported by the prober.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn available() -> Self {
        Self {
            available: true,
            error: None,
        }
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            error: Some(error.into()),
        }
    }
}
