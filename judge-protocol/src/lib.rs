// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire-level domain types shared between the judge master and slave:
//! submissions, checks, results, and the message envelope.
//!
//! This crate is deliberately free of any IO or execution concerns; it
//! only defines data and its `serde` shape. `judge-ipc` frames and
//! transports `Message` values; `judge-compiler`/`judge-sandbox`/
//! `judge-checks` produce and consume the rest.

pub mod check_result;
pub mod check_spec;
pub mod compile;
pub mod error;
pub mod message;
pub mod submission;

pub use check_result::{CheckResult, Outcome, SubmissionCheckResult};
pub use check_spec::{CheckSpec, CheckType, ImportCheckSpec, IoCheckSpec, SourceCodeCheckSpec};
pub use compile::{CompilationOutput, Diagnostic, Severity};
pub use error::MalformedMessage;
pub use message::Message;
pub use submission::Submission;
