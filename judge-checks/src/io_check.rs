// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `IO` checks: run the entry point with scripted input and compare
//! captured output against an expected string, after end-of-line
//! normalization.

use std::time::Duration;

use judge_protocol::check_result::CheckResult;
use judge_protocol::check_spec::IoCheckSpec;
use judge_sandbox::{CompiledArtifact, InvocationOutcome, LoaderContext, Sandbox};

use crate::model::{Check, RequiredType};

pub struct IoCheck {
    spec: IoCheckSpec,
}

impl IoCheck {
    pub fn new(spec: IoCheckSpec) -> Self {
        IoCheck { spec }
    }
}

fn normalize(s: &str) -> String {
    s.replace("\r\n", "\n")
}

impl Check for IoCheck {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn required_type(&self) -> RequiredType {
        RequiredType::UserCodeMain
    }

    fn check(
        &self,
        sandbox: &Sandbox,
        context: &LoaderContext,
        file: &CompiledArtifact,
        budget: Duration,
    ) -> CheckResult {
        let outcome = sandbox.invoke(context, file, self.spec.input.clone(), budget);

        match outcome {
            Ok(InvocationOutcome::Completed { .. }) => {
                let actual = context.interceptor().output();
                let expected = normalize(&self.spec.expected_output);
                if actual == expected {
                    CheckResult::passed(self.name(), &file.qualified_name, actual)
                } else {
                    CheckResult::failed(
                        self.name(),
                        &file.qualified_name,
                        format!("expected {expected:?}, got {actual:?}"),
                        actual,
                    )
                    .with_error_output(context.interceptor().error_output())
                }
            }
            Ok(InvocationOutcome::TimedOut) => {
                CheckResult::errored(self.name(), &file.qualified_name, "timeout")
            }
            Ok(InvocationOutcome::Trapped { message }) => {
                CheckResult::errored(self.name(), &file.qualified_name, message)
            }
            Err(violation) => CheckResult::errored(self.name(), &file.qualified_name, violation.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> Sandbox {
        Sandbox::new(16 * 1024 * 1024).unwrap()
    }

    fn hello_world_module(sandbox: &Sandbox) -> CompiledArtifact {
        let wat = r#"
            (module
              (import "env" "write_stdout" (func $write_stdout (param i32 i32)))
              (memory (export "memory") 1)
              (data (i32.const 0) "Hello, World!\n")
              (func (export "main") (result i32)
                (call $write_stdout (i32.const 0) (i32.const 14))
                (i32.const 0)))
        "#;
        let module = wasmtime::Module::new(sandbox.engine(), wat).unwrap();
        CompiledArtifact::new("Main", module, judge_sandbox::LoaderContext::new().handle())
    }

    #[test]
    fn hello_world_passes() {
        let sandbox = sandbox();
        let context = sandbox.new_loader_context();
        let artifact = hello_world_module(&sandbox);
        let check = IoCheck::new(IoCheckSpec {
            name: "prints-hello".into(),
            input: vec![],
            expected_output: "Hello, World!\n".into(),
        });

        let result = check.check(&sandbox, &context, &artifact, Duration::from_secs(2));
        assert_eq!(result.outcome, judge_protocol::check_result::Outcome::Passed);
    }

    #[test]
    fn output_mismatch_fails_with_both_values_in_the_message() {
        let sandbox = sandbox();
        let context = sandbox.new_loader_context();
        let artifact = hello_world_module(&sandbox);
        let check = IoCheck::new(IoCheckSpec {
            name: "expects-goodbye".into(),
            input: vec![],
            expected_output: "Goodbye!\n".into(),
        });

        let result = check.check(&sandbox, &context, &artifact, Duration::from_secs(2));
        assert_eq!(result.outcome, judge_protocol::check_result::Outcome::Failed);
        assert!(result.message.contains("Goodbye!"));
        assert!(result.message.contains("Hello, World!"));
    }

    #[test]
    fn infinite_loop_times_out() {
        let sandbox = sandbox();
        let context = sandbox.new_loader_context();
        let wat = r#"(module (func (export "main") (result i32) (loop $l (br $l)) (i32.const 0)))"#;
        let module = wasmtime::Module::new(sandbox.engine(), wat).unwrap();
        let artifact = CompiledArtifact::new("Main", module, context.handle());
        let check = IoCheck::new(IoCheckSpec { name: "loops".into(), input: vec![], expected_output: String::new() });

        let result = check.check(&sandbox, &context, &artifact, Duration::from_millis(100));
        assert_eq!(result.outcome, judge_protocol::check_result::Outcome::Errored);
        assert!(result.message.contains("timeout"));
    }
}
