// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The result of compiling one submission (or one source-code-check
//! batch): the loader namespace it was compiled into, the normalized
//! `CompilationOutput`, and the artifacts that did compile.

use judge_protocol::compile::CompilationOutput;
use judge_sandbox::{CompiledArtifact, LoaderContext};

/// Bundles the wire `CompiledSubmission` and `CompiledFile` shapes
/// together: `files` already carries each artifact's `loaderHandle` (via
/// [`CompiledArtifact::loader_handle`]), and all of them share `context`.
/// Lives exactly as long as its owner; dropping it drops `context`,
/// releasing the loader namespace with no explicit teardown step.
pub struct CompiledSubmission {
    pub context: LoaderContext,
    pub output: CompilationOutput,
    pub files: Vec<CompiledArtifact>,
}

impl CompiledSubmission {
    pub fn new(context: LoaderContext, output: CompilationOutput, files: Vec<CompiledArtifact>) -> Self {
        CompiledSubmission { context, output, files }
    }

    /// Files with a recognized `main` entry point, in the lexicographic
    /// order the compiler produced them in (sorted by qualified name).
    pub fn runnable_files(&self) -> impl Iterator<Item = &CompiledArtifact> {
        self.files.iter().filter(|f| f.has_entry_point)
    }
}
