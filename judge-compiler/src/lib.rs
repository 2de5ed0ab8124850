// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory compilation of submission and check source files.

pub mod compiled_submission;
pub mod compiler;

pub use compiled_submission::CompiledSubmission;
pub use compiler::Compiler;
