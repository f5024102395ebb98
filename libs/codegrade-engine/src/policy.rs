// Pre-flight request checks. This is a cheap first-line filter, not a sandbox.
use codegrade_common::config::EngineConfig;

use crate::error::ExecError;

/// Substrings rejected in every submission regardless of configuration.
pub const DEFAULT_BANNED_PATTERNS: &[&str] = &["eval(", "exec(", "import os", "import subprocess"];

#[derive(Debug, Clone)]
pub struct Policy {
    banned_patterns: Vec<String>,
    max_source_bytes: usize,
    max_input_bytes: usize,
}

impl Policy {
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut banned_patterns: Vec<String> =
            DEFAULT_BANNED_PATTERNS.iter().map(|p| p.to_string()).collect();
        for extra in &config.banned_patterns {
            if !extra.is_empty() && !banned_patterns.contains(extra) {
                banned_patterns.push(extra.clone());
            }
        }

        Self {
            banned_patterns,
            max_source_bytes: config.max_source_bytes,
            max_input_bytes: config.max_input_bytes,
        }
    }

    /// Shape checks on the raw request: non-empty code and language, positive time limit.
    pub fn validate_request(
        &self,
        source_code: &str,
        language: &str,
        time_limit_ms: Option<u64>,
    ) -> Result<(), ExecError> {
        if source_code.trim().is_empty() {
            return Err(ExecError::InvalidInput("source code must be a non-empty string".into()));
        }
        if language.trim().is_empty() {
            return Err(ExecError::InvalidInput("language must be a non-empty string".into()));
        }
        if time_limit_ms == Some(0) {
            return Err(ExecError::InvalidInput("time limit must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn check_sizes(&self, source_code: &str, stdin: &str) -> Result<(), ExecError> {
        if source_code.len() > self.max_source_bytes {
            return Err(ExecError::TooLarge {
                what: "Source code",
                limit: self.max_source_bytes,
            });
        }
        if stdin.len() > self.max_input_bytes {
            return Err(ExecError::TooLarge {
                what: "Input",
                limit: self.max_input_bytes,
            });
        }
        Ok(())
    }

    /// Reject source containing any banned substring.
    pub fn scan(&self, source_code: &str) -> Result<(), ExecError> {
        match self
            .banned_patterns
            .iter()
            .find(|pattern| source_code.contains(pattern.as_str()))
        {
            Some(pattern) => Err(ExecError::BannedPattern {
                pattern: pattern.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> Policy {
        Policy::from_config(&EngineConfig::default())
    }

    #[test]
    fn test_rejects_empty_fields() {
        let p = policy();
        assert!(matches!(
            p.validate_request("", "python", None),
            Err(ExecError::InvalidInput(_))
        ));
        assert!(matches!(
            p.validate_request("   \n", "python", None),
            Err(ExecError::InvalidInput(_))
        ));
        assert!(matches!(
            p.validate_request("print(1)", "", None),
            Err(ExecError::InvalidInput(_))
        ));
        assert!(p.validate_request("print(1)", "python", None).is_ok());
    }

    #[test]
    fn test_rejects_zero_time_limit() {
        let err = policy().validate_request("print(1)", "python", Some(0)).unwrap_err();
        assert!(err.to_string().contains("time limit"));
        assert!(policy().validate_request("print(1)", "python", Some(1)).is_ok());
    }

    #[test]
    fn test_default_denylist() {
        let p = policy();
        for code in [
            "x = eval(input())",
            "exec('print(1)')",
            "import os\nos.system('ls')",
            "import subprocess",
            "Runtime.getRuntime().exec(\"ls\");",
        ] {
            let err = p.scan(code).unwrap_err();
            assert_eq!(err.to_string(), "Potentially dangerous code detected");
        }
        assert!(p.scan("print(int(input()) + 1)").is_ok());
    }

    #[test]
    fn test_reports_matching_pattern() {
        match policy().scan("import subprocess") {
            Err(ExecError::BannedPattern { pattern }) => assert_eq!(pattern, "import subprocess"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_configured_patterns_extend_defaults() {
        let config = EngineConfig {
            banned_patterns: vec!["system(".to_string(), String::new()],
            ..EngineConfig::default()
        };
        let p = Policy::from_config(&config);

        assert!(p.scan("int main() { system(\"ls\"); }").is_err());
        assert!(p.scan("eval(1)").is_err());
        assert!(p.scan("int main() { return 0; }").is_ok());
    }

    #[test]
    fn test_size_limits() {
        let config = EngineConfig {
            max_source_bytes: 10,
            max_input_bytes: 4,
            ..EngineConfig::default()
        };
        let p = Policy::from_config(&config);

        assert!(p.check_sizes("0123456789", "1234").is_ok());
        let err = p.check_sizes("0123456789A", "").unwrap_err();
        assert_eq!(err.to_string(), "Source code exceeds maximum size of 10 bytes");
        let err = p.check_sizes("x", "12345").unwrap_err();
        assert_eq!(err.to_string(), "Input exceeds maximum size of 4 bytes");
    }
}
