// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `SOURCE_CODE` checks: a check whose body is itself untrusted compiled
//! source. Rather than interleaving the check's and the target's
//! execution in one `Store` (which would let a hostile check reach
//! across namespaces), the check module is linked against its own
//! small, separate host ABI under import module `judge` (disjoint from
//! the `env` ABI a submission imports from, `judge_sandbox::abi`) and
//! drives the target file indirectly through four host calls:
//!
//! - `stage_input_line(ptr, len)`: queue one scripted input line for the
//!   next `run_target` call.
//! - `run_target() -> i32`: invokes the target's entry point with the
//!   staged input under the same sandbox and wall-clock budget the
//!   check itself is running under; returns the captured output's byte
//!   length, or a negative sentinel on timeout/violation.
//! - `read_captured_output(ptr, cap) -> i32`: copies up to `cap` bytes of
//!   the last `run_target` call's captured stdout into the check's own
//!   memory.
//! - `report_result(passed, ptr, len)`: records the check's verdict and
//!   a human-readable message.
//!
//! A check module that never calls `report_result` (a bug in the
//! check's own source, not the target's) still yields a usable
//! `ERRORED` result rather than silently passing.

use std::time::Duration;

use judge_protocol::check_result::CheckResult;
use judge_sandbox::{
    validate_imports_from, CompiledArtifact, InvocationOutcome, LoaderContext, MemoryLimiter, Sandbox,
};
use wasmtime::{Caller, Extern, Linker, Module, Store};

use crate::model::{Check, RequiredType};

const CHECK_MODULE: &str = "judge";
const FN_STAGE_INPUT_LINE: &str = "stage_input_line";
const FN_RUN_TARGET: &str = "run_target";
const FN_READ_CAPTURED_OUTPUT: &str = "read_captured_output";
const FN_REPORT_RESULT: &str = "report_result";
const ALLOWED_CHECK_IMPORTS: &[&str] =
    &[FN_STAGE_INPUT_LINE, FN_RUN_TARGET, FN_READ_CAPTURED_OUTPUT, FN_REPORT_RESULT];
const CHECK_ENTRY: &str = "run_check";

const RUN_TARGET_TIMED_OUT: i32 = -1;
const RUN_TARGET_VIOLATION: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AutoOutcome {
    Timeout,
    Violation,
}

struct CheckHostState {
    sandbox: Sandbox,
    target_context: LoaderContext,
    target_artifact: CompiledArtifact,
    budget: Duration,
    staged_input: Vec<String>,
    last_output: String,
    auto_outcome: Option<AutoOutcome>,
    violation_message: Option<String>,
    result: Option<(bool, String)>,
    limiter: MemoryLimiter,
}

/// A `SOURCE_CODE` check, already compiled to a `Module` by the same
/// [`judge_compiler::Compiler`] that compiles submissions, into its own
/// loader context (a "check-source batch").
pub struct CompiledCheck {
    name: String,
    module: Module,
}

impl CompiledCheck {
    /// `module` must satisfy [`validate_imports_from`] against the
    /// `judge` ABI above and export `run_check() -> i32`; both are
    /// re-checked at invocation time so a malformed check module
    /// produces an `ERRORED` result rather than panicking the slave.
    pub fn new(name: impl Into<String>, module: Module) -> Self {
        CompiledCheck { name: name.into(), module }
    }
}

impl Check for CompiledCheck {
    fn name(&self) -> &str {
        &self.name
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
        if let Err(violation) = validate_imports_from(&self.module, CHECK_MODULE, ALLOWED_CHECK_IMPORTS) {
            return CheckResult::errored(self.name(), &file.qualified_name, violation.to_string());
        }

        let host_state = CheckHostState {
            sandbox: sandbox.clone(),
            target_context: context.clone(),
            target_artifact: file.clone(),
            budget,
            staged_input: Vec::new(),
            last_output: String::new(),
            auto_outcome: None,
            violation_message: None,
            result: None,
            limiter: MemoryLimiter::new(sandbox.max_memory_bytes()),
        };

        let mut store = Store::new(sandbox.engine(), host_state);
        store.limiter(|state| &mut state.limiter);
        store.set_epoch_deadline(sandbox.deadline_ticks(budget));

        let mut linker = Linker::new(sandbox.engine());
        if let Err(err) = link_check_host_functions(&mut linker) {
            return CheckResult::errored(self.name(), &file.qualified_name, err.to_string());
        }

        let instance = match linker.instantiate(&mut store, &self.module) {
            Ok(instance) => instance,
            Err(err) => return CheckResult::errored(self.name(), &file.qualified_name, err.to_string()),
        };

        let entry = match instance.get_typed_func::<(), i32>(&mut store, CHECK_ENTRY) {
            Ok(entry) => entry,
            Err(err) => return CheckResult::errored(self.name(), &file.qualified_name, err.to_string()),
        };

        let call_result = entry.call(&mut store, ());
        let state = store.into_data();

        match call_result {
            Ok(_) => match state.result {
                Some((true, message)) => {
                    let mut result = CheckResult::passed(self.name(), &file.qualified_name, state.last_output);
                    if !message.is_empty() {
                        result.message = message;
                    }
                    result
                }
                Some((false, message)) => {
                    CheckResult::failed(self.name(), &file.qualified_name, message, state.last_output)
                }
                None => match state.auto_outcome {
                    Some(AutoOutcome::Timeout) => CheckResult::errored(self.name(), &file.qualified_name, "timeout"),
                    Some(AutoOutcome::Violation) => CheckResult::errored(
                        self.name(),
                        &file.qualified_name,
                        state.violation_message.unwrap_or_else(|| "sandbox violation".to_string()),
                    ),
                    None => CheckResult::errored(
                        self.name(),
                        &file.qualified_name,
                        "check completed without reporting a result",
                    ),
                },
            },
            Err(err) if judge_sandbox::is_timeout(&err) => {
                CheckResult::errored(self.name(), &file.qualified_name, "timeout")
            }
            Err(err) => CheckResult::errored(self.name(), &file.qualified_name, err.to_string()),
        }
    }
}

fn link_check_host_functions(linker: &mut Linker<CheckHostState>) -> anyhow::Result<()> {
    linker.func_wrap(CHECK_MODULE, FN_STAGE_INPUT_LINE, |mut caller: Caller<'_, CheckHostState>, ptr: i32, len: i32| {
        let line = read_guest_string(&mut caller, ptr, len);
        caller.data_mut().staged_input.push(line);
    })?;

    linker.func_wrap(CHECK_MODULE, FN_RUN_TARGET, |mut caller: Caller<'_, CheckHostState>| -> i32 {
        let input = std::mem::take(&mut caller.data_mut().staged_input);
        let (sandbox, context, artifact, budget) = {
            let state = caller.data();
            (state.sandbox.clone(), state.target_context.clone(), state.target_artifact.clone(), state.budget)
        };

        match sandbox.invoke(&context, &artifact, input, budget) {
            Ok(InvocationOutcome::Completed { .. }) => {
                let output = context.interceptor().output();
                let len = output.len() as i32;
                caller.data_mut().last_output = output;
                len
            }
            Ok(InvocationOutcome::TimedOut) => {
                caller.data_mut().auto_outcome = Some(AutoOutcome::Timeout);
                RUN_TARGET_TIMED_OUT
            }
            Ok(InvocationOutcome::Trapped { message }) => {
                let state = caller.data_mut();
                state.auto_outcome = Some(AutoOutcome::Violation);
                state.violation_message = Some(message);
                RUN_TARGET_VIOLATION
            }
            Err(violation) => {
                let state = caller.data_mut();
                state.auto_outcome = Some(AutoOutcome::Violation);
                state.violation_message = Some(violation.to_string());
                RUN_TARGET_VIOLATION
            }
        }
    })?;

    linker.func_wrap(
        CHECK_MODULE,
        FN_READ_CAPTURED_OUTPUT,
        |mut caller: Caller<'_, CheckHostState>, ptr: i32, cap: i32| -> i32 {
            let Some(Extern::Memory(memory)) = caller.get_export("memory") else { return -1 };
            let bytes = caller.data().last_output.clone().into_bytes();
            let n = bytes.len().min(cap.max(0) as usize);
            if memory.write(&mut caller, ptr as usize, &bytes[..n]).is_err() {
                return -1;
            }
            n as i32
        },
    )?;

    linker.func_wrap(
        CHECK_MODULE,
        FN_REPORT_RESULT,
        |mut caller: Caller<'_, CheckHostState>, passed: i32, ptr: i32, len: i32| {
            let message = read_guest_string(&mut caller, ptr, len);
            caller.data_mut().result = Some((passed != 0, message));
        },
    )?;

    Ok(())
}

fn read_guest_string(caller: &mut Caller<'_, CheckHostState>, ptr: i32, len: i32) -> String {
    let Some(Extern::Memory(memory)) = caller.get_export("memory") else { return String::new() };
    let mut buf = vec![0u8; len.max(0) as usize];
    if memory.read(&mut *caller, ptr as usize, &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}
