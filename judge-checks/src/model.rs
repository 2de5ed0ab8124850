// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The runtime `Check` capability set: a polymorphic interface over
//! static IO checks, import checks, and dynamically compiled checks.

use std::time::Duration;

use judge_protocol::check_result::CheckResult;
use judge_sandbox::{CompiledArtifact, LoaderContext, Sandbox};

/// Which granularity a check runs at (`Check.requiredType` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredType {
    /// Runs once per compiled file that has a main entry point.
    UserCodeMain,
    /// Runs once against the whole submission, independent of any
    /// single file's entry point; import checks are the only built-in
    /// example.
    StaticTest,
}

/// A check, already resolved from its wire [`judge_protocol::CheckSpec`]
/// into something runnable. `IoCheck`, `ImportCheck`, and
/// `CompiledCheck` (`judge-checks::compiled_check`) all implement this.
pub trait Check: Send + Sync {
    fn name(&self) -> &str;
    fn required_type(&self) -> RequiredType;

    /// Runs this check against `file`, one of the submission's compiled
    /// files with a main entry point (or, for a `StaticTest` check, a
    /// nominal stand-in; the caller decides which file to pass for
    /// submission-wide checks). `sandbox`/`context` let the check invoke
    /// `file`'s entry point; `budget` is the wall-clock ceiling for that
    /// invocation.
    fn check(
        &self,
        sandbox: &Sandbox,
        context: &LoaderContext,
        file: &CompiledArtifact,
        budget: Duration,
    ) -> CheckResult;
}
