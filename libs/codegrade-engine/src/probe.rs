/// Compiler Availability Prober
///
/// Runs a toolchain's version query and reports whether it answered. The
/// result is advisory: a toolchain can vanish between probe and use, so runners
/// still map spawn failures to a missing toolchain on their own.

use std::collections::BTreeMap;
use std::process::Stdio;

use codegrade_common::config::{EngineConfig, ToolchainConfig};
use codegrade_common::types::{Language, ProbeResult};
use futures_util::future::join_all;
use tokio::process::Command;
use tracing::debug;

/// Probe one configured toolchain.
pub async fn probe_toolchain(toolchain: &ToolchainConfig) -> ProbeResult {
    let Some(binary) = toolchain.probe_binary() else {
        return ProbeResult::unavailable(toolchain.missing_message.clone());
    };

    let status = Command::new(binary)
        .args(&toolchain.probe_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await;

    match status {
        Ok(status) if status.success() => ProbeResult::available(),
        Ok(status) => {
            debug!(binary, status = ?status.code(), "Toolchain probe exited with failure");
            ProbeResult::unavailable(toolchain.missing_message.clone())
        }
        Err(e) => {
            debug!(binary, error = %e, "Toolchain probe could not spawn");
            ProbeResult::unavailable(toolchain.missing_message.clone())
        }
    }
}

/// Probe the toolchain for a caller-supplied language name.
pub async fn probe_language(config: &EngineConfig, language: &str) -> ProbeResult {
    let lang: Language = match language.parse() {
        Ok(lang) => lang,
        Err(e) => return ProbeResult::unavailable(e.to_string()),
    };

    match config.toolchain(lang) {
        Some(toolchain) => probe_toolchain(toolchain).await,
        None => ProbeResult::unavailable(format!("No toolchain configured for {}", lang)),
    }
}

/// Probe every supported language concurrently, keyed by canonical name.
pub async fn probe_all(config: &EngineConfig) -> BTreeMap<String, ProbeResult> {
    let probes = Language::ALL.iter().map(|lang| async move {
        let result = match config.toolchain(*lang) {
            Some(toolchain) => probe_toolchain(toolchain).await,
            None => ProbeResult::unavailable(format!("No toolchain configured for {}", lang)),
        };
        (lang.to_string(), result)
    });

    join_all(probes).await.into_iter().collect()
}
