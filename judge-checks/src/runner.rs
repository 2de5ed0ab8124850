// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Builds runnable [`Check`]s from the wire [`CheckSpec`] list (compiling
//! any `SOURCE_CODE` checks along the way) and drives them: for each
//! check, for each compiled file with a main entry point, run it and
//! record one [`CheckResult`].

use std::collections::BTreeMap;
use std::time::Duration;

use judge_compiler::{CompiledSubmission, Compiler};
use judge_protocol::check_result::{CheckResult, Outcome, SubmissionCheckResult};
use judge_protocol::check_spec::CheckSpec;
use judge_sandbox::{CompiledArtifact, LoaderContext, Sandbox};
use tracing::debug;

use crate::compiled_check::CompiledCheck;
use crate::import_check::ImportCheck;
use crate::io_check::IoCheck;
use crate::model::{Check, RequiredType};

const NO_SOURCES: &str = "<submission>";

/// A check whose `SOURCE_CODE` body failed to compile. Keeping this as a
/// `Check` rather than a separate error path means a bad check doesn't
/// disturb the ordering or presence guarantees the rest of the runner
/// provides for every other check.
struct UncompilableCheck {
    name: String,
    reason: String,
}

impl Check for UncompilableCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_type(&self) -> RequiredType {
        RequiredType::UserCodeMain
    }

    fn check(
        &self,
        _sandbox: &Sandbox,
        _context: &LoaderContext,
        file: &CompiledArtifact,
        _budget: Duration,
    ) -> CheckResult {
        CheckResult::errored(self.name(), &file.qualified_name, &self.reason)
    }
}

/// Resolves every [`CheckSpec`] the master sent into a runnable
/// [`Check`], preserving declaration order. `SOURCE_CODE` specs are
/// compiled together as one check-source batch, into a loader context
/// distinct from the submission's own.
pub fn build_checks(specs: &[CheckSpec], compiler: &Compiler<'_>) -> Vec<Box<dyn Check>> {
    let mut sources = BTreeMap::new();
    for spec in specs {
        if let CheckSpec::SourceCode(source_check) = spec {
            sources.insert(source_check.name.clone(), source_check.source.clone());
        }
    }

    let compiled_checks = if sources.is_empty() { None } else { Some(compiler.compile(&sources)) };

    specs
        .iter()
        .map(|spec| -> Box<dyn Check> {
            match spec {
                CheckSpec::Import(import_spec) => Box::new(ImportCheck::new(import_spec.clone())),
                CheckSpec::Io(io_spec) => Box::new(IoCheck::new(io_spec.clone())),
                CheckSpec::SourceCode(source_spec) => {
                    let batch = compiled_checks.as_ref().expect("source check present implies a compiled batch");
                    match batch.files.iter().find(|f| f.qualified_name == source_spec.name) {
                        Some(artifact) => Box::new(CompiledCheck::new(source_spec.name.clone(), artifact.module.clone())),
                        None => {
                            let reason = batch
                                .output
                                .diagnostics
                                .iter()
                                .find(|d| d.file == source_spec.name)
                                .map(|d| d.message.clone())
                                .unwrap_or_else(|| "check source failed to compile".to_string());
                            Box::new(UncompilableCheck { name: source_spec.name.clone(), reason })
                        }
                    }
                }
            }
        })
        .collect()
}

/// Runs every check in `checks` against `submission`: `UserCodeMain`
/// checks run once per runnable file; `StaticTest` checks (import checks)
/// run once against the submission as a whole. A submission with no
/// runnable file still produces one result per `UserCodeMain` check,
/// surfaced against a submission-level key as a non-fatal "no entry
/// point" result rather than silently disappearing.
pub fn run_checks(
    sandbox: &Sandbox,
    submission: &CompiledSubmission,
    checks: &[Box<dyn Check>],
    budget: Duration,
) -> SubmissionCheckResult {
    let mut results: SubmissionCheckResult = BTreeMap::new();
    let runnable: Vec<&CompiledArtifact> = submission.runnable_files().collect();

    for check in checks {
        match check.required_type() {
            RequiredType::StaticTest => {
                if submission.files.is_empty() {
                    let result = CheckResult::skipped(check.name(), NO_SOURCES, "no sources");
                    results.entry(NO_SOURCES.to_string()).or_default().push(result);
                } else {
                    // Runs once against the whole submission, not per file:
                    // every compiled artifact is inspected, and the
                    // per-file outcomes are folded into a single
                    // submission-level CheckResult rather than one per
                    // file.
                    let per_file: Vec<CheckResult> = submission
                        .files
                        .iter()
                        .map(|file| {
                            debug!(check = check.name(), file = %file.qualified_name, "running static check");
                            check.check(sandbox, &submission.context, file, budget)
                        })
                        .collect();
                    let result = merge_static_results(check.name(), per_file);
                    results.entry(NO_SOURCES.to_string()).or_default().push(result);
                }
            }
            RequiredType::UserCodeMain => {
                if runnable.is_empty() {
                    let result = CheckResult::skipped(check.name(), NO_SOURCES, "no entry point");
                    results.entry(NO_SOURCES.to_string()).or_default().push(result);
                } else {
                    for file in &runnable {
                        debug!(check = check.name(), file = %file.qualified_name, "running check");
                        let result = check.check(sandbox, &submission.context, file, budget);
                        results.entry(file.qualified_name.clone()).or_default().push(result);
                    }
                }
            }
        }
    }

    results
}

/// Folds the per-file outcomes of one `StaticTest` check into a single
/// submission-level `CheckResult`: any `ERRORED` file wins outright,
/// otherwise any `FAILED` file's messages are joined, otherwise the check
/// passed for every compiled artifact.
fn merge_static_results(check_name: &str, per_file: Vec<CheckResult>) -> CheckResult {
    if let Some(errored) = per_file.iter().find(|r| r.outcome == Outcome::Errored) {
        return CheckResult::errored(check_name, NO_SOURCES, errored.message.clone());
    }

    let failing: Vec<&CheckResult> = per_file.iter().filter(|r| r.outcome == Outcome::Failed).collect();
    if !failing.is_empty() {
        let message = failing
            .iter()
            .map(|r| format!("{}: {}", r.file_qualified_name, r.message))
            .collect::<Vec<_>>()
            .join("; ");
        return CheckResult::failed(check_name, NO_SOURCES, message, String::new());
    }

    CheckResult::passed(check_name, NO_SOURCES, String::new())
}
