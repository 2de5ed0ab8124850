// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `IMPORT` checks: statically inspect a compiled artifact's declared
//! imports for forbidden entries, without instantiating or running
//! anything. A `StaticTest`: it runs once against the whole submission
//! rather than per runnable file.

use std::time::Duration;

use judge_protocol::check_result::CheckResult;
use judge_protocol::check_spec::ImportCheckSpec;
use judge_sandbox::{CompiledArtifact, LoaderContext, Sandbox};

use crate::model::{Check, RequiredType};

pub struct ImportCheck {
    spec: ImportCheckSpec,
}

impl ImportCheck {
    pub fn new(spec: ImportCheckSpec) -> Self {
        ImportCheck { spec }
    }
}

impl Check for ImportCheck {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn required_type(&self) -> RequiredType {
        RequiredType::StaticTest
    }

    fn check(
        &self,
        _sandbox: &Sandbox,
        _context: &LoaderContext,
        file: &CompiledArtifact,
        _budget: Duration,
    ) -> CheckResult {
        let found: Vec<String> = file
            .module
            .imports()
            .map(|import| format!("{}::{}", import.module(), import.name()))
            .filter(|name| self.spec.forbidden_imports.iter().any(|forbidden| name.contains(forbidden)))
            .collect();

        if found.is_empty() {
            CheckResult::passed(self.name(), &file.qualified_name, String::new())
        } else {
            CheckResult::failed(
                self.name(),
                &file.qualified_name,
                format!("forbidden import(s) present: {}", found.join(", ")),
                String::new(),
            )
        }
    }
}
