// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The outcome of a single `(check, file)` invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Passed,
    Failed,
    Errored,
    Skipped,
}

/// Result of running one check against one compiled file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub check_name: String,
    pub file_qualified_name: String,
    pub outcome: Outcome,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_output: Option<String>,
}

impl CheckResult {
    pub fn passed(check_name: impl Into<String>, file: impl Into<String>, captured: String) -> Self {
        CheckResult {
            check_name: check_name.into(),
            file_qualified_name: file.into(),
            outcome: Outcome::Passed,
            message: "ok".to_string(),
            captured_output: Some(captured),
            error_output: None,
        }
    }

    pub fn failed(
        check_name: impl Into<String>,
        file: impl Into<String>,
        message: impl Into<String>,
        captured: String,
    ) -> Self {
        CheckResult {
            check_name: check_name.into(),
            file_qualified_name: file.into(),
            outcome: Outcome::Failed,
            message: message.into(),
            captured_output: Some(captured),
            error_output: None,
        }
    }

    pub fn errored(
        check_name: impl Into<String>,
        file: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CheckResult {
            check_name: check_name.into(),
            file_qualified_name: file.into(),
            outcome: Outcome::Errored,
            message: message.into(),
            captured_output: None,
            error_output: None,
        }
    }

    pub fn skipped(check_name: impl Into<String>, file: impl Into<String>, reason: impl Into<String>) -> Self {
        CheckResult {
            check_name: check_name.into(),
            file_qualified_name: file.into(),
            outcome: Outcome::Skipped,
            message: reason.into(),
            captured_output: None,
            error_output: None,
        }
    }

    pub fn with_error_output(mut self, error_output: String) -> Self {
        self.error_output = Some(error_output);
        self
    }
}

/// Mapping from file qualified name to its ordered sequence of check
/// results. A `BTreeMap` preserves file-lexicographic order for free;
/// check declaration order within each `Vec` is preserved by construction
/// in the check runner.
pub type SubmissionCheckResult = BTreeMap<String, Vec<CheckResult>>;
