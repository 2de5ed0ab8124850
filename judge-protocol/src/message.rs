// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::check_result::SubmissionCheckResult;
use crate::check_spec::CheckSpec;
use crate::compile::CompilationOutput;
use crate::submission::Submission;

/// The single message envelope exchanged over the master<->slave socket.
/// One Rust enum models both directions: a slave process only ever reads
/// `CompileAndCheckSubmission` and only ever writes every other variant,
/// so there is no risk of confusing the two regardless of them sharing a
/// wire type.
///
/// `#[serde(tag = "kind")]` gives the envelope shape `{"kind": "<tag>",
/// ...payload}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum Message {
    /// Slave -> master, sent once the slave has connected and is ready to
    /// accept a submission.
    SlaveStarted { uid: String, pid: u32 },
    /// Slave -> master, sent if the idle timer fires before a submission
    /// arrives.
    SlaveTimedOut { uid: String },
    /// Slave -> master, terminal: compilation of the submission failed.
    CompilationFailed { uid: String, output: CompilationOutput },
    /// Slave -> master, terminal: checks ran to completion.
    SubmissionResult { uid: String, result: SubmissionCheckResult },
    /// Slave -> master, terminal: an error outside any single check
    /// invocation was caught at the top level.
    SlaveDiedWithUnknownError { uid: String, stacktrace: String },
    /// Slave -> master, sent exactly once, always last.
    DyingMessage { uid: String },
    /// Master -> slave: the one submission this slave will ever process.
    CompileAndCheckSubmission { submission: Submission, checks: Vec<CheckSpec> },
}

impl Message {
    /// The slave uid this message carries, where applicable.
    /// `CompileAndCheckSubmission` is excluded: it travels on a connection
    /// already dedicated to exactly one slave, so it carries no uid of its
    /// own.
    pub fn uid(&self) -> Option<&str> {
        match self {
            Message::SlaveStarted { uid, .. }
            | Message::SlaveTimedOut { uid }
            | Message::CompilationFailed { uid, .. }
            | Message::SubmissionResult { uid, .. }
            | Message::SlaveDiedWithUnknownError { uid, .. }
            | Message::DyingMessage { uid } => Some(uid),
            Message::CompileAndCheckSubmission { .. } => None,
        }
    }

    /// True for the four mutually-exclusive terminal messages: exactly one
    /// of these precedes `DyingMessage` for every submission.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Message::SubmissionResult { .. }
                | Message::CompilationFailed { .. }
                | Message::SlaveDiedWithUnknownError { .. }
                | Message::SlaveTimedOut { .. }
        )
    }

    pub fn is_dying(&self) -> bool {
        matches!(self, Message::DyingMessage { .. })
    }
}
