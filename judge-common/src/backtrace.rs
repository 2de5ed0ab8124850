// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Captures a best-effort stacktrace for `SlaveDiedWithUnknownError`.
//! Unlike a crash handler that recovers from signals delivered to the
//! process (segfaults, aborts), the slave only needs to describe errors
//! and panics caught by its own top-level `catch_unwind` / `Result`
//! plumbing, so a plain `std::backtrace::Backtrace` is sufficient here.

use std::backtrace::Backtrace;
use std::cell::RefCell;

/// Renders a captured backtrace to a string suitable for the
/// `SlaveDiedWithUnknownError.stacktrace` field. Backtrace capture is
/// controlled by `RUST_BACKTRACE`; when disabled this still returns a
/// (short) placeholder rather than an empty string.
pub fn capture() -> String {
    Backtrace::force_capture().to_string()
}

/// Normalizes a `std::panic` payload into a displayable message.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

thread_local! {
    static LAST_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Installs a panic hook that renders the panicking thread's message,
/// location, and backtrace into a thread-local slot. A `catch_unwind`
/// boundary on that same thread can then retrieve more than the bare
/// panic payload via [`take_captured`]. Meant to be called once, near the
/// top of `main`, before any untrusted code runs.
pub fn install_hook() {
    std::panic::set_hook(Box::new(|info| {
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        let location = info.location().map(|l| l.to_string()).unwrap_or_else(|| "unknown location".to_string());
        let rendered = format!("panicked at {location}: {message}\n{}", capture());
        LAST_PANIC.with(|cell| *cell.borrow_mut() = Some(rendered));
    }));
}

/// Takes the most recently captured panic for the calling thread, if any.
/// Leaves the slot empty so a later unrelated panic isn't misattributed.
pub fn take_captured() -> Option<String> {
    LAST_PANIC.with(|cell| cell.borrow_mut().take())
}
