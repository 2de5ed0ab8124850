// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Isolated loader contexts, I/O interception, and capability denial
//! for compiled artifacts that may be hostile. Everything here assumes
//! artifacts are wasmtime modules compiled against the fixed host
//! interface in [`abi`]; nothing outside that interface is reachable
//! from inside a loaded artifact.

pub mod abi;
pub mod interceptor;
pub mod loader;
pub mod policy;
pub mod runtime;
pub mod timeout;

pub use interceptor::Interceptor;
pub use loader::{CompiledArtifact, LoaderContext, LoaderHandle};
pub use policy::{validate_imports_from, MemoryLimiter, SandboxViolation};
pub use runtime::{InvocationOutcome, Sandbox};
pub use timeout::is_timeout;
