// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Scripted input and captured output for one invocation. Reads are
//! served from a line queue and signal end-of-input deterministically
//! instead of blocking; writes accumulate into a buffer normalized to
//! line-feed terminators.

use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    input: VecDeque<String>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// I/O surface handed to the host functions wired into a `Store`. Cheap
/// to clone: every clone shares the same backing buffers, since the
/// interceptor is keyed by loader context, not by clone identity.
#[derive(Clone, Default)]
pub struct Interceptor {
    state: std::sync::Arc<Mutex<State>>,
}

impl Interceptor {
    pub fn new() -> Self {
        Interceptor::default()
    }

    /// Loads the scripted input lines for the next invocation.
    pub fn set_input(&self, lines: Vec<String>) {
        self.state.lock().unwrap().input = lines.into();
    }

    /// Clears input and captured output, readying the interceptor for a
    /// new invocation in the same loader context.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.input.clear();
        state.stdout.clear();
        state.stderr.clear();
    }

    /// Pops the next scripted input line, or `None` once exhausted.
    pub(crate) fn read_line(&self) -> Option<String> {
        self.state.lock().unwrap().input.pop_front()
    }

    pub(crate) fn append_stdout(&self, bytes: &[u8]) {
        self.state.lock().unwrap().stdout.extend_from_slice(bytes);
    }

    pub(crate) fn append_stderr(&self, bytes: &[u8]) {
        self.state.lock().unwrap().stderr.extend_from_slice(bytes);
    }

    pub fn output(&self) -> String {
        normalize(&self.state.lock().unwrap().stdout)
    }

    pub fn error_output(&self) -> String {
        normalize(&self.state.lock().unwrap().stderr)
    }
}

fn normalize(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace("\r\n", "\n")
}
