// CLI command implementations; every command prints its result as JSON on stdout
use anyhow::{bail, Context, Result};
use codegrade_common::config::EngineConfig;
use codegrade_common::types::{Language, TestCase};
use codegrade_engine::{CodeExecutor, EvaluationOptions};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub fn build_executor(config_path: Option<&Path>) -> Result<CodeExecutor> {
    let config = match config_path {
        Some(path) => {
            let mut config = EngineConfig::load(path)?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            config
        }
        None => EngineConfig::from_env()?,
    };

    info!(work_dir = %config.work_dir.display(), "Engine configured");
    Ok(CodeExecutor::new(config))
}

/// Language from the explicit flag, or from the source file extension.
pub fn resolve_language(source: &Path, explicit: Option<&str>) -> Result<String> {
    if let Some(language) = explicit {
        return Ok(language.to_string());
    }

    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let language = match ext.as_str() {
        "java" => Language::Java,
        "py" => Language::Python,
        "cpp" | "cc" | "cxx" => Language::Cpp,
        "c" => Language::C,
        _ => bail!(
            "Cannot infer language from {}; pass --language",
            source.display()
        ),
    };
    Ok(language.to_string())
}

pub fn read_input(inline: Option<String>, file: Option<&Path>) -> Result<String> {
    match (inline, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

fn read_source(source: &Path) -> Result<String> {
    fs::read_to_string(source)
        .with_context(|| format!("Failed to read source file {}", source.display()))
}

pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read test cases {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse test cases {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(
    executor: &CodeExecutor,
    source: &Path,
    language: Option<&str>,
    stdin: &str,
    time_limit: Option<u64>,
    custom_input: bool,
) -> Result<()> {
    let code = read_source(source)?;
    let language = resolve_language(source, language)?;

    let result = if custom_input {
        executor
            .execute_with_custom_input(&code, &language, stdin, time_limit)
            .await
    } else {
        executor.execute_code(&code, &language, stdin, time_limit).await
    };

    print_json(&result)
}

pub async fn evaluate(
    executor: &CodeExecutor,
    source: &Path,
    cases: &Path,
    language: Option<&str>,
    time_limit: Option<u64>,
    dry_run: bool,
) -> Result<()> {
    let code = read_source(source)?;
    let language = resolve_language(source, language)?;
    let test_cases = load_test_cases(cases)?;

    let options = if dry_run {
        EvaluationOptions::dry_run()
    } else {
        EvaluationOptions::default()
    };

    let summary = executor
        .evaluate_with_options(&code, &language, &test_cases, time_limit, options)
        .await;

    print_json(&summary)
}

pub async fn probe(executor: &CodeExecutor, language: Option<&str>) -> Result<()> {
    match language {
        Some(language) => print_json(&executor.check_compiler_availability(language).await),
        None => print_json(&executor.check_all_compilers().await),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanReport<'a> {
    work_dir: &'a Path,
    removed: usize,
}

pub async fn clean(executor: &CodeExecutor, older_than_secs: u64) -> Result<()> {
    let workspaces = executor.workspaces();
    let removed = workspaces
        .purge_stale(Duration::from_secs(older_than_secs))
        .await
        .with_context(|| format!("Failed to clean {}", workspaces.root().display()))?;

    info!(removed, "Stale workspaces removed");
    print_json(&CleanReport {
        work_dir: workspaces.root(),
        removed,
    })
}
