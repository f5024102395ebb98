// Engine configuration: defaults, optional JSON file, environment overrides
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::types::Language;

pub const CONFIG_PATH_ENV: &str = "CODEGRADE_CONFIG";

/// How to build and run one language on this host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Compiler binary; `None` for interpreted languages.
    #[serde(default)]
    pub compiler: Option<String>,
    /// Extra arguments for the compiler, or for the interpreter when there is no compiler.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Interpreter or VM used to run the program; `None` when the artifact is a native binary.
    #[serde(default)]
    pub runtime: Option<String>,
    /// Version query used by the availability probe, e.g. `["--version"]`.
    pub probe_args: Vec<String>,
    /// Remediation text shown when the probe fails.
    pub missing_message: String,
}

impl ToolchainConfig {
    /// Binary whose presence decides availability: the compiler if any, else the runtime.
    pub fn probe_binary(&self) -> Option<&str> {
        self.compiler.as_deref().or(self.runtime.as_deref())
    }

    pub fn default_for(language: Language) -> Self {
        match language {
            Language::Java => Self {
                compiler: Some("javac".to_string()),
                flags: Vec::new(),
                runtime: Some("java".to_string()),
                probe_args: vec!["-version".to_string()],
                missing_message: "Java compiler (javac) not found. Please install Java JDK.".to_string(),
            },
            Language::Python => Self {
                compiler: None,
                flags: Vec::new(),
                runtime: Some("python3".to_string()),
                probe_args: vec!["--version".to_string()],
                missing_message: "Python3 not found. Please install Python 3.".to_string(),
            },
            Language::Cpp => Self {
                compiler: Some("g++".to_string()),
                flags: Vec::new(),
                runtime: None,
                probe_args: vec!["--version".to_string()],
                missing_message: "G++ compiler not found. Please install GCC/G++.".to_string(),
            },
            Language::C => Self {
                compiler: Some("gcc".to_string()),
                flags: Vec::new(),
                runtime: None,
                probe_args: vec!["--version".to_string()],
                missing_message: "GCC compiler not found. Please install GCC.".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root under which per-run workspaces are created.
    pub work_dir: PathBuf,
    pub default_time_limit_ms: u64,
    pub custom_input_time_limit_ms: u64,
    /// Upper bound for the compile step; unbounded when absent.
    pub compile_timeout_ms: Option<u64>,
    pub max_source_bytes: usize,
    pub max_input_bytes: usize,
    /// Cap on captured stdout and on stderr of a single process; past it the process is killed.
    pub max_output_bytes: usize,
    /// Apply the Java snippet repairs (class wrapping, `main` casing, Scanner import).
    pub java_repairs: bool,
    /// Extra denylist substrings on top of the built-in ones.
    pub banned_patterns: Vec<String>,
    pub toolchains: BTreeMap<Language, ToolchainConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("codegrade"),
            default_time_limit_ms: 2000,
            custom_input_time_limit_ms: 5000,
            compile_timeout_ms: None,
            max_source_bytes: 1024 * 1024,
            max_input_bytes: 10 * 1024 * 1024,
            max_output_bytes: 1024 * 1024,
            java_repairs: true,
            banned_patterns: Vec::new(),
            toolchains: Language::ALL
                .iter()
                .map(|lang| (*lang, ToolchainConfig::default_for(*lang)))
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file. Languages missing from the file keep their defaults.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Engine config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let mut config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.fill_missing_toolchains();
        config.validate()?;
        Ok(config)
    }

    /// Defaults (or the file named by `CODEGRADE_CONFIG`) with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `CODEGRADE_*` overrides fetched through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("CODEGRADE_WORK_DIR") {
            self.work_dir = PathBuf::from(dir);
        }
        if let Some(ms) = parse_override(&lookup, "CODEGRADE_TIME_LIMIT_MS")? {
            self.default_time_limit_ms = ms;
        }
        if let Some(ms) = parse_override(&lookup, "CODEGRADE_CUSTOM_TIME_LIMIT_MS")? {
            self.custom_input_time_limit_ms = ms;
        }
        if let Some(ms) = parse_override(&lookup, "CODEGRADE_COMPILE_TIMEOUT_MS")? {
            self.compile_timeout_ms = Some(ms);
        }
        if let Some(bytes) = parse_override(&lookup, "CODEGRADE_MAX_OUTPUT_BYTES")? {
            self.max_output_bytes = bytes;
        }
        if let Some(enabled) = parse_override(&lookup, "CODEGRADE_JAVA_REPAIRS")? {
            self.java_repairs = enabled;
        }
        self.validate()
    }

    pub fn toolchain(&self, language: Language) -> Option<&ToolchainConfig> {
        self.toolchains.get(&language)
    }

    fn fill_missing_toolchains(&mut self) {
        for lang in Language::ALL {
            self.toolchains
                .entry(lang)
                .or_insert_with(|| ToolchainConfig::default_for(lang));
        }
    }

    fn validate(&self) -> Result<()> {
        if self.default_time_limit_ms == 0 || self.custom_input_time_limit_ms == 0 {
            bail!("Time limits must be greater than zero");
        }
        if self.max_output_bytes == 0 {
            bail!("max_output_bytes must be greater than zero");
        }
        if self.compile_timeout_ms == Some(0) {
            bail!("compile_timeout_ms must be greater than zero when set");
        }
        for (lang, toolchain) in &self.toolchains {
            if toolchain.probe_binary().is_none() {
                bail!("Toolchain for {} names neither a compiler nor a runtime", lang);
            }
            if lang.is_compiled() && toolchain.compiler.is_none() {
                bail!("Toolchain for {} must name a compiler", lang);
            }
        }
        Ok(())
    }
}

fn parse_override<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {}: {:?}", key, raw))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_cover_every_language() {
        let config = EngineConfig::default();
        for lang in Language::ALL {
            assert!(config.toolchain(lang).is_some(), "missing toolchain for {}", lang);
        }
        assert_eq!(config.default_time_limit_ms, 2000);
        assert_eq!(config.custom_input_time_limit_ms, 5000);
        assert!(config.compile_timeout_ms.is_none());
        assert_eq!(config.max_output_bytes, 1024 * 1024);
        assert!(config.java_repairs);
    }

    #[test]
    fn test_probe_binary_prefers_compiler() {
        let java = ToolchainConfig::default_for(Language::Java);
        assert_eq!(java.probe_binary(), Some("javac"));

        let python = ToolchainConfig::default_for(Language::Python);
        assert_eq!(python.probe_binary(), Some("python3"));
    }

    #[test]
    fn test_load_partial_file_keeps_default_toolchains() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(
            &path,
            r#"{
                "default_time_limit_ms": 3000,
                "toolchains": {
                    "cpp": {
                        "compiler": "clang++",
                        "flags": ["-O2"],
                        "probe_args": ["--version"],
                        "missing_message": "clang++ missing"
                    }
                }
            }"#,
        )
        .unwrap();

        let config = EngineConfig::load(&path).unwrap();

        assert_eq!(config.default_time_limit_ms, 3000);
        assert_eq!(config.custom_input_time_limit_ms, 5000);
        let cpp = config.toolchain(Language::Cpp).unwrap();
        assert_eq!(cpp.compiler.as_deref(), Some("clang++"));
        assert_eq!(cpp.flags, vec!["-O2".to_string()]);
        assert_eq!(
            config.toolchain(Language::C).unwrap().compiler.as_deref(),
            Some("gcc")
        );
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = EngineConfig::load(Path::new("/nonexistent/codegrade.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_compiled_language_without_compiler_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(
            &path,
            r#"{"toolchains": {"c": {"runtime": "tcc", "probe_args": [], "missing_message": "x"}}}"#,
        )
        .unwrap();

        assert!(EngineConfig::load(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CODEGRADE_WORK_DIR", "/srv/runs"),
            ("CODEGRADE_TIME_LIMIT_MS", "1500"),
            ("CODEGRADE_COMPILE_TIMEOUT_MS", "20000"),
            ("CODEGRADE_JAVA_REPAIRS", "false"),
            ("CODEGRADE_MAX_OUTPUT_BYTES", "65536"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.work_dir, PathBuf::from("/srv/runs"));
        assert_eq!(config.default_time_limit_ms, 1500);
        assert_eq!(config.compile_timeout_ms, Some(20000));
        assert!(!config.java_repairs);
        assert_eq!(config.max_output_bytes, 65536);
    }

    #[test]
    fn test_invalid_override_is_reported() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_overrides(|key| (key == "CODEGRADE_TIME_LIMIT_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("CODEGRADE_TIME_LIMIT_MS"));
    }

    #[test]
    fn test_zero_time_limit_override_is_rejected() {
        let mut config = EngineConfig::default();
        let result =
            config.apply_overrides(|key| (key == "CODEGRADE_TIME_LIMIT_MS").then(|| "0".to_string()));
        assert!(result.is_err());
    }
}
