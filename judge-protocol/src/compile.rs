// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Diagnostic severity. This workspace uses `SCREAMING_SNAKE_CASE`
/// uniformly across every tagged enum on the wire (`Outcome`, `CheckType`,
/// message `kind`), see DESIGN.md.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single compiler diagnostic, normalized from whatever shape the
/// underlying compiler reporter produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn error(file: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            file: file.into(),
            line: 0,
            column: 0,
            message: message.into(),
        }
    }
}

/// The result of compiling one submission (or one source-code-check batch)
/// in memory.
///
/// The actual compiled blobs never leave the slave process. `artifactNames`
/// carries only the qualified names that produced a loadable artifact, so a
/// master inspecting a `CompilationFailed` message can tell which files (if
/// any) did compile without the slave having to ship opaque wasm bytes it
/// has no use for. See DESIGN.md for this Open Question's resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompilationOutput {
    pub successful: bool,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifact_names: Vec<String>,
}

impl CompilationOutput {
    /// Builds a `CompilationOutput`, computing `successful` as true iff no
    /// diagnostic has severity `Error` and `artifact_names` is non-empty.
    pub fn new(diagnostics: Vec<Diagnostic>, artifact_names: Vec<String>) -> Self {
        let successful =
            !artifact_names.is_empty() && !diagnostics.iter().any(|d| d.severity == Severity::Error);
        CompilationOutput { successful, diagnostics, artifact_names }
    }

    pub fn no_sources() -> Self {
        CompilationOutput::new(vec![Diagnostic::error("<submission>", "no sources")], vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_requires_artifacts_and_no_errors() {
        assert!(!CompilationOutput::new(vec![], vec![]).successful);
        assert!(CompilationOutput::new(vec![], vec!["Main".into()]).successful);
        let with_error = CompilationOutput::new(
            vec![Diagnostic::error("Main", "boom")],
            vec!["Main".into()],
        );
        assert!(!with_error.successful);
    }

    #[test]
    fn severity_is_screaming_snake_on_the_wire() {
        let json = serde_json::to_string(&Severity::Error).unwrap();
        assert_eq!(json, "\"ERROR\"");
    }
}
