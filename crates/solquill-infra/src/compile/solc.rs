//! `solc` subprocess adapter for the [`Compiler`] port.
//!
//! The source is sent to `solc --standard-json` on stdin and the JSON report
//! is mapped to a [`CompilationResult`]. A missing binary is reported as
//! [`CompileError::Unavailable`]; a contract that does not build is a
//! successful call with `success == false`.

use std::process::Stdio;

use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use solquill_core::compile::Compiler;
use solquill_types::compile::{CompilationResult, CompileDiagnostic};
use solquill_types::error::CompileError;

/// Runs the `solc` binary at `solc_path`.
#[derive(Debug, Clone)]
pub struct SolcCompiler {
    solc_path: String,
}

impl SolcCompiler {
    pub fn new(solc_path: impl Into<String>) -> Self {
        Self {
            solc_path: solc_path.into(),
        }
    }

    /// Ask the binary for its version with `solc --version`.
    pub async fn version(&self) -> Result<String, CompileError> {
        let output = Command::new(&self.solc_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| CompileError::Unavailable(format!("{}: {e}", self.solc_path)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .find_map(|line| line.strip_prefix("Version: "))
            .map(str::to_string)
            .ok_or_else(|| CompileError::Unavailable(format!("{}: unrecognized version output", self.solc_path)))
    }
}

#[derive(Debug, Deserialize)]
struct StandardJsonOutput {
    #[serde(default)]
    errors: Vec<StandardJsonError>,
    #[serde(default)]
    contracts: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StandardJsonError {
    severity: String,
    message: String,
    #[serde(default)]
    formatted_message: Option<String>,
    #[serde(default)]
    source_location: Option<SourceLocation>,
}

#[derive(Debug, Deserialize)]
struct SourceLocation {
    #[serde(default)]
    file: String,
    start: i64,
}

fn standard_json_input(path: &str, source: &str) -> serde_json::Value {
    json!({
        "language": "Solidity",
        "sources": { path: { "content": source } },
        "settings": {
            "outputSelection": { "*": { "*": ["abi"] } }
        }
    })
}

/// 1-based line of a byte offset into `source`. Negative offsets map to 0.
fn line_of(source: &str, offset: i64) -> u32 {
    let Ok(offset) = usize::try_from(offset) else {
        return 0;
    };
    let end = offset.min(source.len());
    let newlines = source.as_bytes()[..end].iter().filter(|b| **b == b'\n').count();
    u32::try_from(newlines + 1).unwrap_or(u32::MAX)
}

/// Map a standard-json report for `source`, compiled as `path`, to a
/// [`CompilationResult`]. Diagnostics located in other sources get line 0.
pub fn parse_diagnostics(report: &str, path: &str, source: &str) -> Result<CompilationResult, CompileError> {
    let output: StandardJsonOutput = serde_json::from_str(report)
        .map_err(|e| CompileError::Failed(format!("unreadable solc output: {e}")))?;

    let mut result = CompilationResult::default();
    for entry in output.errors {
        let text = entry
            .formatted_message
            .unwrap_or_else(|| entry.message.clone());
        if entry.severity == "error" {
            result.errors.push(CompileDiagnostic {
                line: entry
                    .source_location
                    .filter(|loc| loc.file == path)
                    .map(|loc| line_of(source, loc.start))
                    .unwrap_or(0),
                message: entry.message,
            });
        } else {
            result.warnings.push(text.trim_end().to_string());
        }
    }

    result.success = result.errors.is_empty();
    result.output = if result.success {
        let names: Vec<&str> = output
            .contracts
            .values()
            .filter_map(|file| file.as_object())
            .flat_map(|file| file.keys().map(String::as_str))
            .collect();
        if names.is_empty() {
            "Compiled successfully".to_string()
        } else {
            format!("Compiled successfully: {}", names.join(", "))
        }
    } else {
        format!("Compilation failed with {} error(s)", result.errors.len())
    };

    Ok(result)
}

impl Compiler for SolcCompiler {
    async fn compile(&self, path: &str, source: &str) -> Result<CompilationResult, CompileError> {
        let input = standard_json_input(path, source).to_string();

        let mut child = Command::new(&self.solc_path)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CompileError::Unavailable(format!("{}: {e}", self.solc_path)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| CompileError::Failed(format!("writing to solc: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CompileError::Failed(format!("waiting for solc: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CompileError::Failed(stderr.trim().to_string()));
        }

        let result = parse_diagnostics(&stdout, path, source)?;
        tracing::debug!(
            path,
            success = result.success,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "solc finished"
        );
        Ok(result)
    }
}
