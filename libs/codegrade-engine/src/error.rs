use codegrade_common::types::ErrorKind;
use thiserror::Error;

/// Every way a run can fail. Each variant maps onto exactly one [`ErrorKind`].
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Invalid input types: {0}")]
    InvalidInput(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Potentially dangerous code detected")]
    BannedPattern { pattern: String },

    #[error("{what} exceeds maximum size of {limit} bytes")]
    TooLarge { what: &'static str, limit: usize },

    #[error("{0}")]
    ToolchainMissing(String),

    #[error("{0}")]
    Compilation(String),

    #[error("{0}")]
    Runtime(String),

    #[error("Execution timeout ({} seconds)", format_seconds(.0))]
    Timeout(u64),

    #[error("Output limit exceeded")]
    OutputLimitExceeded,

    #[error("Internal execution error: {0}")]
    Internal(#[from] std::io::Error),
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::InvalidInput(_)
            | ExecError::UnsupportedLanguage(_)
            | ExecError::BannedPattern { .. }
            | ExecError::TooLarge { .. } => ErrorKind::Policy,
            ExecError::ToolchainMissing(_) => ErrorKind::ToolchainMissing,
            ExecError::Compilation(_) => ErrorKind::Compilation,
            ExecError::Runtime(_) | ExecError::OutputLimitExceeded | ExecError::Internal(_) => {
                ErrorKind::Runtime
            }
            ExecError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

/// Render a millisecond budget as whole seconds when exact, one decimal otherwise.
pub fn format_seconds(ms: &u64) -> String {
    if ms % 1000 == 0 {
        (ms / 1000).to_string()
    } else {
        format!("{:.1}", *ms as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        assert_eq!(ExecError::Timeout(1000).to_string(), "Execution timeout (1 seconds)");
        assert_eq!(ExecError::Timeout(5000).to_string(), "Execution timeout (5 seconds)");
        assert_eq!(ExecError::Timeout(1500).to_string(), "Execution timeout (1.5 seconds)");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(ExecError::InvalidInput("x".into()).kind(), ErrorKind::Policy);
        assert_eq!(ExecError::UnsupportedLanguage("go".into()).kind(), ErrorKind::Policy);
        assert_eq!(
            ExecError::BannedPattern { pattern: "eval(".into() }.kind(),
            ErrorKind::Policy
        );
        assert_eq!(
            ExecError::TooLarge { what: "Source code", limit: 1 }.kind(),
            ErrorKind::Policy
        );
        assert_eq!(ExecError::ToolchainMissing("x".into()).kind(), ErrorKind::ToolchainMissing);
        assert_eq!(ExecError::Compilation("x".into()).kind(), ErrorKind::Compilation);
        assert_eq!(ExecError::Runtime("x".into()).kind(), ErrorKind::Runtime);
        assert_eq!(ExecError::Timeout(1).kind(), ErrorKind::Timeout);
        assert_eq!(ExecError::OutputLimitExceeded.kind(), ErrorKind::Runtime);
        assert_eq!(ExecError::OutputLimitExceeded.to_string(), "Output limit exceeded");

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ExecError::from(io);
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert!(err.to_string().starts_with("Internal execution error"));
    }

    #[test]
    fn test_unsupported_language_message() {
        assert_eq!(
            ExecError::UnsupportedLanguage("cobol".into()).to_string(),
            "Unsupported language: cobol"
        );
    }
}
