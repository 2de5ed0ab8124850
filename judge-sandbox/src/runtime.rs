// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ties the loader, interceptor, policy, and epoch timeout together
//! into a single `invoke` call: the thing the check runner drives once
//! per `(check, file)` pair.

use std::sync::Arc;
use std::time::Duration;

use wasmtime::{Caller, Config, Engine, Extern, Linker, Module, Store};

use crate::abi;
use crate::loader::{CompiledArtifact, LoaderContext};
use crate::policy::{MemoryLimiter, SandboxViolation};
use crate::timeout::{self, EpochTicker};

/// How an entry-point invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Ran to completion and returned an exit code.
    Completed { exit_code: i32 },
    /// Hit the wall-clock budget before returning.
    TimedOut,
    /// Trapped for a reason other than the timeout (division by zero,
    /// unreachable, out-of-bounds memory access, exceeding the memory
    /// limiter, ...).
    Trapped { message: String },
}

/// The process-wide sandbox: one `Engine` (with epoch interruption
/// armed) and its ticker thread, constructed once at slave startup and
/// held for the slave's whole life.
///
/// Cheaply `Clone`: the ticker is reference-counted so the background
/// thread keeps running as long as any clone is alive, and `Engine`
/// itself is already an `Arc` handle. Check execution (`judge-checks`)
/// clones a `Sandbox` into the host state of a check module so that a
/// `SOURCE_CODE` check can invoke the file under test from inside its
/// own `run_target` host call.
#[derive(Clone)]
pub struct Sandbox {
    engine: Engine,
    max_memory_bytes: usize,
    _ticker: Arc<EpochTicker>,
}

impl Sandbox {
    pub fn new(max_memory_bytes: usize) -> anyhow::Result<Self> {
        let mut config = Config::new();
        config.epoch_interruption(true);
        let engine = Engine::new(&config)?;
        let ticker = EpochTicker::start(engine.clone());
        Ok(Sandbox { engine, max_memory_bytes, _ticker: Arc::new(ticker) })
    }

    /// The engine compiled artifacts must be produced against.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn new_loader_context(&self) -> LoaderContext {
        LoaderContext::new()
    }

    /// The memory ceiling applied to every `Store` this sandbox creates,
    /// so callers building their own `Store` (the dynamic check linker in
    /// `judge-checks`) can install an equally strict [`MemoryLimiter`].
    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_bytes
    }

    /// Converts a wall-clock budget into an epoch deadline using this
    /// sandbox's tick rate, for callers (the dynamic check linker) that
    /// build their own `Store` instead of going through [`Sandbox::invoke`].
    pub fn deadline_ticks(&self, budget: Duration) -> u64 {
        EpochTicker::deadline_ticks(budget)
    }

    /// Invokes `artifact`'s entry point once, with `input` installed as
    /// the scripted stdin and `budget` as the wall-clock deadline.
    /// Returns the captured output via `context.interceptor()` after
    /// this call returns, alongside how the call ended.
    pub fn invoke(
        &self,
        context: &LoaderContext,
        artifact: &CompiledArtifact,
        input: Vec<String>,
        budget: Duration,
    ) -> Result<InvocationOutcome, SandboxViolation> {
        context.interceptor().reset();
        context.interceptor().set_input(input);

        let host_state =
            HostState { interceptor: context.interceptor().clone(), limiter: MemoryLimiter::new(self.max_memory_bytes) };
        let mut store = Store::new(&self.engine, host_state);
        store.limiter(|state| &mut state.limiter);
        store.set_epoch_deadline(EpochTicker::deadline_ticks(budget));

        let mut linker = Linker::new(&self.engine);
        link_host_functions(&mut linker).map_err(|e| SandboxViolation::new(e.to_string()))?;

        let instance = linker
            .instantiate(&mut store, &artifact.module)
            .map_err(|e| SandboxViolation::new(e.to_string()))?;

        let entry = instance
            .get_typed_func::<(), i32>(&mut store, abi::ENTRY_POINT)
            .map_err(|e| SandboxViolation::new(e.to_string()))?;

        match entry.call(&mut store, ()) {
            Ok(exit_code) => Ok(InvocationOutcome::Completed { exit_code }),
            Err(err) if timeout::is_timeout(&err) => Ok(InvocationOutcome::TimedOut),
            Err(err) => Ok(InvocationOutcome::Trapped { message: err.to_string() }),
        }
    }
}

struct HostState {
    interceptor: crate::interceptor::Interceptor,
    limiter: MemoryLimiter,
}

fn link_host_functions(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    linker.func_wrap(
        abi::HOST_MODULE,
        abi::READ_LINE,
        |mut caller: Caller<'_, HostState>, buf_ptr: i32, buf_cap: i32| -> i32 {
            let Some(line) = caller.data().interceptor.read_line() else { return -1 };
            let Some(Extern::Memory(memory)) = caller.get_export("memory") else { return -1 };
            let cap = buf_cap.max(0) as usize;
            let bytes = line.as_bytes();
            let n = bytes.len().min(cap);
            if memory.write(&mut caller, buf_ptr as usize, &bytes[..n]).is_err() {
                return -1;
            }
            n as i32
        },
    )?;

    linker.func_wrap(
        abi::HOST_MODULE,
        abi::WRITE_STDOUT,
        |caller: Caller<'_, HostState>, ptr: i32, len: i32| {
            read_guest_bytes(caller, ptr, len, |state, bytes| state.interceptor.append_stdout(bytes));
        },
    )?;

    linker.func_wrap(
        abi::HOST_MODULE,
        abi::WRITE_STDERR,
        |caller: Caller<'_, HostState>, ptr: i32, len: i32| {
            read_guest_bytes(caller, ptr, len, |state, bytes| state.interceptor.append_stderr(bytes));
        },
    )?;

    Ok(())
}

fn read_guest_bytes(
    mut caller: Caller<'_, HostState>,
    ptr: i32,
    len: i32,
    consume: impl FnOnce(&HostState, &[u8]),
) {
    let Some(Extern::Memory(memory)) = caller.get_export("memory") else { return };
    let mut buf = vec![0u8; len.max(0) as usize];
    if memory.read(&mut caller, ptr as usize, &mut buf).is_ok() {
        consume(caller.data(), &buf);
    }
}
