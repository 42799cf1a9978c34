//! Compilation diagnostics returned by the compilation collaborator.

use serde::{Deserialize, Serialize};

/// A single compiler error with its source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileDiagnostic {
    pub line: u32,
    pub message: String,
}

/// Outcome of compiling one file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompilationResult {
    pub success: bool,
    pub output: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<CompileDiagnostic>,
}
