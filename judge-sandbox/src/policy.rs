// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Deny-by-default capability broker. The host only ever links the
//! functions named in [`crate::abi::ALLOWED_IMPORTS`]; anything else a
//! compiled artifact imports (a filesystem call, a socket, a foreign
//! module trying to reach another submission's namespace) has no host
//! function to bind to, so it is caught here before instantiation
//! rather than surfacing as an obscure link error deep in wasmtime.

use thiserror::Error;
use wasmtime::Module;

/// An untrusted artifact attempted something the sandbox does not grant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("denied operation: {operation}")]
pub struct SandboxViolation {
    pub operation: String,
}

impl SandboxViolation {
    pub fn new(operation: impl Into<String>) -> Self {
        SandboxViolation { operation: operation.into() }
    }
}

/// Checks every import a compiled module declares against a single named
/// host module and an explicit allow list of function names within it,
/// without instantiating or running anything. `judge-checks` reuses this
/// for the separate, smaller ABI dynamically-compiled checks are linked
/// against (see `judge_checks::compiled_check`), so both the submission
/// sandbox and the check sandbox share one deny-by-default
/// implementation.
pub fn validate_imports_from(
    module: &Module,
    host_module: &str,
    allowed: &[&str],
) -> Result<(), SandboxViolation> {
    for import in module.imports() {
        if import.module() != host_module || !allowed.contains(&import.name()) {
            return Err(SandboxViolation::new(format!("{}::{}", import.module(), import.name())));
        }
    }
    Ok(())
}

/// Enforces a hard ceiling on linear memory growth for one instantiation.
/// Submissions that try to allocate past this are denied rather than
/// allowed to exhaust the slave process's memory.
pub struct MemoryLimiter {
    max_bytes: usize,
}

impl MemoryLimiter {
    pub fn new(max_bytes: usize) -> Self {
        MemoryLimiter { max_bytes }
    }
}

impl wasmtime::ResourceLimiter for MemoryLimiter {
    fn memory_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        Ok(desired <= self.max_bytes)
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        Ok(desired <= 4096)
    }
}
