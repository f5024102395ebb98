use std::sync::LazyLock;

use codegrade_common::config::ToolchainConfig;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{compile, execute, require, RunLimits};
use crate::error::ExecError;
use crate::workspace::Workspace;

const DEFAULT_CLASS: &str = "Main";
const SCANNER_IMPORT: &str = "import java.util.Scanner;";

static PUBLIC_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"public\s+class\s+(\w+)").expect("valid regex"));
static MISCASED_MAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"public\s+static\s+void\s+Main\s*\(").expect("valid regex"));

/// Name of the first `public class` declared in `source`.
pub fn public_class_name(source: &str) -> Option<&str> {
    PUBLIC_CLASS
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Repair loosely formed student snippets so they compile as a standalone file.
///
/// - no `public class`: wrap everything in `public class Main { ... }`, keeping
///   leading `import` lines above the wrapper
/// - `public static void Main(` becomes `public static void main(`
/// - `Scanner` used without `import java.util.Scanner` gets the import prepended
pub fn normalize_java_source(source: &str) -> String {
    let mut code = if public_class_name(source).is_some() {
        source.to_string()
    } else {
        wrap_in_default_class(source)
    };

    code = MISCASED_MAIN
        .replace_all(&code, "public static void main(")
        .into_owned();

    if code.contains("Scanner") && !code.contains("import java.util.Scanner") {
        code = format!("{}\n{}", SCANNER_IMPORT, code);
    }

    code
}

fn wrap_in_default_class(source: &str) -> String {
    let mut header = Vec::new();
    let mut lines = source.lines().peekable();

    while let Some(line) = lines.peek() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("import ") {
            header.push(*line);
            lines.next();
        } else {
            break;
        }
    }

    let body: Vec<&str> = lines.collect();
    let mut wrapped = String::new();
    for line in header.iter().filter(|l| !l.trim().is_empty()) {
        wrapped.push_str(line);
        wrapped.push('\n');
    }
    wrapped.push_str(&format!("public class {} {{\n", DEFAULT_CLASS));
    wrapped.push_str(&body.join("\n"));
    wrapped.push_str("\n}\n");
    wrapped
}

/// javac + JVM runner. The source file is named after its public class, which is
/// why Java relies on the per-run directory for isolation.
#[derive(Debug)]
pub struct JavaRunner<'a> {
    compiler: &'a str,
    runtime: &'a str,
    flags: &'a [String],
    repairs: bool,
}

impl<'a> JavaRunner<'a> {
    pub fn new(toolchain: &'a ToolchainConfig, repairs: bool) -> Result<Self, ExecError> {
        Ok(Self {
            compiler: require(toolchain.compiler.as_deref(), "compiler", toolchain)?,
            runtime: require(toolchain.runtime.as_deref(), "runtime", toolchain)?,
            flags: &toolchain.flags,
            repairs,
        })
    }

    #[instrument(skip_all, fields(run_id = %workspace.id()))]
    pub async fn run(
        &self,
        workspace: &Workspace,
        source_code: &str,
        stdin: &str,
        limits: &RunLimits,
    ) -> Result<String, ExecError> {
        let code = if self.repairs {
            normalize_java_source(source_code)
        } else {
            source_code.to_string()
        };
        let class_name = public_class_name(&code).unwrap_or(DEFAULT_CLASS).to_string();
        debug!(class_name = %class_name, repairs = self.repairs, "Prepared Java source");

        let source = workspace
            .write_source(&format!("{}.java", class_name), &code)
            .await?;

        let mut compile_cmd = Command::new(self.compiler);
        compile_cmd
            .args(self.flags)
            .arg("-d")
            .arg(workspace.dir())
            .arg(&source)
            .current_dir(workspace.dir());
        compile(compile_cmd, limits).await?;

        let mut run_cmd = Command::new(self.runtime);
        run_cmd
            .arg("-cp")
            .arg(workspace.dir())
            .arg(&class_name)
            .current_dir(workspace.dir())
            // Keep JVM banner noise out of stderr.
            .env_remove("JAVA_TOOL_OPTIONS");
        let result = execute(run_cmd, stdin, limits).await;

        workspace.remove_artifacts_with_extension("class").await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_class_name() {
        assert_eq!(public_class_name("public class Solution { }"), Some("Solution"));
        assert_eq!(public_class_name("public   class\nMain{"), Some("Main"));
        assert_eq!(public_class_name("class Hidden {}"), None);
    }

    #[test]
    fn test_complete_program_is_untouched() {
        let source = "public class Solution {\n    public static void main(String[] args) {}\n}";
        assert_eq!(normalize_java_source(source), source);
    }

    #[test]
    fn test_bare_snippet_is_wrapped() {
        let source = "public static void main(String[] args) {\n    System.out.println(1);\n}";
        let normalized = normalize_java_source(source);

        assert!(normalized.starts_with("public class Main {\n"));
        assert!(normalized.trim_end().ends_with('}'));
        assert_eq!(public_class_name(&normalized), Some("Main"));
    }

    #[test]
    fn test_imports_are_hoisted_above_wrapper() {
        let source = "import java.util.List;\n\nstatic int x = 1;";
        let normalized = normalize_java_source(source);

        assert!(normalized.starts_with("import java.util.List;\npublic class Main {\n"));
        assert!(normalized.contains("static int x = 1;"));
    }

    #[test]
    fn test_miscased_main_is_fixed() {
        let source = "public class Main { public static void Main (String[] a) {} }";
        let normalized = normalize_java_source(source);

        assert!(normalized.contains("public static void main(String[] a)"));
        assert!(!normalized.contains("void Main"));
    }

    #[test]
    fn test_scanner_import_is_injected_once() {
        let source = "public class Main { Scanner sc = new Scanner(System.in); }";
        let normalized = normalize_java_source(source);
        assert!(normalized.starts_with("import java.util.Scanner;\n"));

        let already = "import java.util.Scanner;\npublic class Main { Scanner sc; }";
        assert_eq!(normalize_java_source(already), already);
    }

    #[test]
    fn test_wrapped_snippet_with_scanner_gets_import_before_class() {
        let source = "public static void main(String[] a) { Scanner s = new Scanner(System.in); }";
        let normalized = normalize_java_source(source);

        let import_at = normalized.find(SCANNER_IMPORT).unwrap();
        let class_at = normalized.find("public class Main").unwrap();
        assert!(import_at < class_at);
    }
}
