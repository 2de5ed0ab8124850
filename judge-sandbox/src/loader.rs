// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Disposable loading namespaces. A `LoaderContext` is created once per
//! submission (or once per source-code-check compilation batch) and
//! shared by every `CompiledArtifact` that batch produces; nothing
//! loaded into one context can reach another, since the only state two
//! contexts could share is the process-wide `Engine`, which holds
//! compiled code but no mutable guest state.

use std::sync::atomic::{AtomicU64, Ordering};

use wasmtime::{ExternType, Module, ValType};

use crate::abi;
use crate::interceptor::Interceptor;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Identifies a disposable loading namespace. Two submissions, or a
/// submission and a source-code-check batch compiled alongside it,
/// never share a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderHandle(u64);

impl LoaderHandle {
    pub fn fresh() -> Self {
        LoaderHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

/// One isolated namespace. Owns the interceptor shared by every
/// invocation of every artifact compiled into this context, so a
/// check's reset/setInput calls are visible only within this context,
/// keyed by the loader context and not shared process-wide.
///
/// Released by ordinary `Drop` when the owning `CompiledSubmission` (or
/// check-source batch) is discarded; there is no explicit teardown step.
/// `Clone` is shallow (the interceptor is itself reference-counted) and
/// exists so a dynamically-compiled check can hold the target file's
/// context alongside its own without the check runner having to thread
/// lifetimes through the wasmtime host-state boundary.
#[derive(Clone)]
pub struct LoaderContext {
    handle: LoaderHandle,
    interceptor: Interceptor,
}

impl LoaderContext {
    pub fn new() -> Self {
        LoaderContext { handle: LoaderHandle::fresh(), interceptor: Interceptor::new() }
    }

    pub fn handle(&self) -> LoaderHandle {
        self.handle
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }
}

impl Default for LoaderContext {
    fn default() -> Self {
        LoaderContext::new()
    }
}

/// A compiled artifact bound to the namespace it was loaded into.
/// `Clone` is cheap: `wasmtime::Module` is itself a reference-counted
/// handle onto already-compiled code.
#[derive(Clone)]
pub struct CompiledArtifact {
    pub qualified_name: String,
    pub module: Module,
    pub loader_handle: LoaderHandle,
    pub has_entry_point: bool,
}

impl CompiledArtifact {
    pub fn new(qualified_name: impl Into<String>, module: Module, loader_handle: LoaderHandle) -> Self {
        let has_entry_point = entry_point_signature_matches(&module);
        CompiledArtifact { qualified_name: qualified_name.into(), module, loader_handle, has_entry_point }
    }
}

fn entry_point_signature_matches(module: &Module) -> bool {
    module.exports().any(|export| {
        export.name() == abi::ENTRY_POINT
            && matches!(
                export.ty(),
                ExternType::Func(f)
                    if f.params().len() == 0 && f.results().collect::<Vec<_>>() == [ValType::I32]
            )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmtime::Engine;

    #[test]
    fn two_contexts_never_share_a_handle() {
        let a = LoaderContext::new();
        let b = LoaderContext::new();
        assert_ne!(a.handle(), b.handle());
    }

    #[test]
    fn detects_a_conforming_main_export() {
        let engine = Engine::default();
        let module =
            wasmtime::Module::new(&engine, r#"(module (func (export "main") (result i32) i32.const 0))"#)
                .unwrap();
        let artifact = CompiledArtifact::new("Main", module, LoaderHandle::fresh());
        assert!(artifact.has_entry_point);
    }

    #[test]
    fn a_module_with_no_main_export_has_no_entry_point() {
        let engine = Engine::default();
        let module = wasmtime::Module::new(&engine, r#"(module)"#).unwrap();
        let artifact = CompiledArtifact::new("Helper", module, LoaderHandle::fresh());
        assert!(!artifact.has_entry_point);
    }
}
