// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The fixed host interface untrusted code is compiled against. Rather
//! than wiring the full WASI snapshot (filesystem, sockets, process,
//! environment), the host only ever exposes the three functions below
//! under module `env`. Anything a compiled artifact imports outside
//! this set cannot be satisfied and is rejected before it can run.

/// The only module name untrusted code may import from.
pub const HOST_MODULE: &str = "env";

/// `(buf_ptr: i32, buf_cap: i32) -> i32`. Copies the next scripted input
/// line (without its trailing newline) into guest memory at `buf_ptr`,
/// truncated to `buf_cap` bytes. Returns the number of bytes written, or
/// `-1` once the input is exhausted. Never blocks.
pub const READ_LINE: &str = "read_line";

/// `(ptr: i32, len: i32)`. Appends `len` bytes from guest memory at
/// `ptr` to the invocation's captured stdout buffer.
pub const WRITE_STDOUT: &str = "write_stdout";

/// `(ptr: i32, len: i32)`. Same as `write_stdout`, for stderr.
pub const WRITE_STDERR: &str = "write_stderr";

/// All host functions untrusted code may import.
pub const ALLOWED_IMPORTS: &[&str] = &[READ_LINE, WRITE_STDOUT, WRITE_STDERR];

/// The export a compiled artifact must provide to be runnable:
/// `() -> i32`, returning a process-style exit code.
pub const ENTRY_POINT: &str = "main";
