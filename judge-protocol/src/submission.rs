// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An immutable bundle of student-submitted source files.
///
/// `files` is a `BTreeMap` rather than a `HashMap` so that every consumer
/// that iterates it (the compiler, the check runner) sees qualified names
/// in lexicographic order for free, rather than needing a separate sort
/// step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub files: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_hint: Option<String>,
}

impl Submission {
    pub fn new(files: BTreeMap<String, String>) -> Self {
        Submission { files, entry_hint: None }
    }

    pub fn with_entry_hint(mut self, entry_hint: impl Into<String>) -> Self {
        self.entry_hint = Some(entry_hint.into());
        self
    }
}
