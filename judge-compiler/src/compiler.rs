// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Compiles a set of named source files into loadable artifacts. Never
//! touches disk: text goes in, an in-memory `wasmtime::Module` comes
//! out, wrapped with the loader namespace it belongs to.

use std::collections::BTreeMap;

use judge_protocol::compile::{CompilationOutput, Diagnostic};
use judge_sandbox::{CompiledArtifact, LoaderContext, Sandbox};
use tracing::debug;

use crate::compiled_submission::CompiledSubmission;

/// Compiles submissions and check-source batches against a shared
/// [`Sandbox`]'s engine. Stateless beyond that reference: every call to
/// [`Compiler::compile`] gets its own fresh [`LoaderContext`].
pub struct Compiler<'a> {
    sandbox: &'a Sandbox,
    max_source_bytes: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(sandbox: &'a Sandbox, max_source_bytes: usize) -> Self {
        Compiler { sandbox, max_source_bytes }
    }

    /// Compiles `files` into a fresh loader namespace. Duplicate
    /// qualified names cannot occur here: `files` is keyed by qualified
    /// name, so the map itself rules the tie-break out by construction.
    /// Empty input produces the "no sources" compile error; a submission
    /// whose total source size exceeds `max_source_bytes` is rejected
    /// outright before any file is handed to the wasm parser.
    pub fn compile(&self, files: &BTreeMap<String, String>) -> CompiledSubmission {
        let context = self.sandbox.new_loader_context();

        if files.is_empty() {
            return CompiledSubmission::new(context, CompilationOutput::no_sources(), vec![]);
        }

        let total_bytes: usize = files.values().map(|source| source.len()).sum();
        if total_bytes > self.max_source_bytes {
            let diagnostic = Diagnostic::error(
                "<submission>",
                format!(
                    "submission source ({total_bytes} bytes) exceeds the {} byte limit",
                    self.max_source_bytes
                ),
            );
            return CompiledSubmission::new(context, CompilationOutput::new(vec![diagnostic], vec![]), vec![]);
        }

        let mut diagnostics = Vec::new();
        let mut artifact_names = Vec::new();
        let mut artifacts = Vec::new();

        for (qualified_name, source) in files {
            match self.compile_one(qualified_name, source, &context) {
                Ok(artifact) => {
                    artifact_names.push(qualified_name.clone());
                    artifacts.push(artifact);
                }
                Err(diagnostic) => diagnostics.push(diagnostic),
            }
        }

        let output = CompilationOutput::new(diagnostics, artifact_names);
        CompiledSubmission::new(context, output, artifacts)
    }

    fn compile_one(
        &self,
        qualified_name: &str,
        source: &str,
        context: &LoaderContext,
    ) -> Result<CompiledArtifact, Diagnostic> {
        let binary = wat::parse_str(source).map_err(|err| Diagnostic::error(qualified_name, err.to_string()))?;

        let module = wasmtime::Module::new(self.sandbox.engine(), &binary)
            .map_err(|err| Diagnostic::error(qualified_name, err.to_string()))?;

        debug!(qualified_name, "compiled artifact");
        Ok(CompiledArtifact::new(qualified_name, module, context.handle()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> Sandbox {
        Sandbox::new(16 * 1024 * 1024).unwrap()
    }

    const UNBOUNDED: usize = 8 * 1024 * 1024;

    #[test]
    fn compiles_a_well_formed_module() {
        let sandbox = sandbox();
        let compiler = Compiler::new(&sandbox, UNBOUNDED);
        let mut files = BTreeMap::new();
        files.insert("Main".to_string(), r#"(module (func (export "main") (result i32) i32.const 0))"#.to_string());

        let compiled = compiler.compile(&files);
        assert!(compiled.output.successful);
        assert_eq!(compiled.files.len(), 1);
        assert!(compiled.files[0].has_entry_point);
        assert_eq!(compiled.runnable_files().count(), 1);
    }

    #[test]
    fn reports_a_syntax_error_as_a_diagnostic() {
        let sandbox = sandbox();
        let compiler = Compiler::new(&sandbox, UNBOUNDED);
        let mut files = BTreeMap::new();
        files.insert("Main".to_string(), "(module (func".to_string());

        let compiled = compiler.compile(&files);
        assert!(!compiled.output.successful);
        assert!(compiled.files.is_empty());
        assert_eq!(compiled.output.diagnostics.len(), 1);
        assert_eq!(compiled.output.diagnostics[0].severity, judge_protocol::compile::Severity::Error);
    }

    #[test]
    fn empty_input_is_a_no_sources_error() {
        let sandbox = sandbox();
        let compiler = Compiler::new(&sandbox, UNBOUNDED);
        let compiled = compiler.compile(&BTreeMap::new());
        assert!(!compiled.output.successful);
        assert!(compiled.files.is_empty());
        assert_eq!(compiled.output.diagnostics[0].message, "no sources");
    }

    #[test]
    fn a_file_with_no_main_export_still_compiles() {
        let sandbox = sandbox();
        let compiler = Compiler::new(&sandbox, UNBOUNDED);
        let mut files = BTreeMap::new();
        files.insert("Helper".to_string(), "(module)".to_string());

        let compiled = compiler.compile(&files);
        assert!(compiled.output.successful);
        assert!(!compiled.files[0].has_entry_point);
        assert_eq!(compiled.runnable_files().count(), 0);
    }

    #[test]
    fn oversized_submission_is_rejected_before_parsing() {
        let sandbox = sandbox();
        let compiler = Compiler::new(&sandbox, 8);
        let mut files = BTreeMap::new();
        files.insert("Main".to_string(), "(module (func".to_string());

        let compiled = compiler.compile(&files);
        assert!(!compiled.output.successful);
        assert!(compiled.files.is_empty());
        assert!(compiled.output.diagnostics[0].message.contains("exceeds"));
    }
}
