// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Deterministic wall-clock budgets for entry-point invocations, built
//! on wasmtime's epoch interruption rather than OS timers or signals:
//! a single background thread increments the shared `Engine`'s epoch
//! counter on a fixed tick, and each invocation sets a deadline some
//! number of ticks in the future before calling into untrusted code.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wasmtime::Engine;

const TICK: Duration = Duration::from_millis(10);

/// Owns the background epoch-incrementing thread for one `Engine`.
/// Stops the thread on drop; intended to live for the whole process.
pub struct EpochTicker {
    stop: Arc<AtomicBool>,
}

impl EpochTicker {
    pub fn start(engine: Engine) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let ticker_stop = stop.clone();
        std::thread::spawn(move || {
            while !ticker_stop.load(Ordering::Relaxed) {
                std::thread::sleep(TICK);
                engine.increment_epoch();
            }
        });
        EpochTicker { stop }
    }

    /// Converts a wall-clock budget into a tick count suitable for
    /// `Store::set_epoch_deadline`. Always at least one tick so a
    /// budget shorter than the tick interval still eventually fires.
    pub fn deadline_ticks(budget: Duration) -> u64 {
        ((budget.as_millis() as u64) / (TICK.as_millis() as u64)).max(1)
    }
}

impl Drop for EpochTicker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// True if `err` (as returned from a failed wasmtime call) was caused
/// by the epoch deadline elapsing rather than some other trap.
pub fn is_timeout(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<wasmtime::Trap>(), Some(wasmtime::Trap::Interrupt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_ticks_rounds_up_to_at_least_one() {
        assert_eq!(EpochTicker::deadline_ticks(Duration::from_millis(1)), 1);
        assert_eq!(EpochTicker::deadline_ticks(Duration::from_millis(25)), 2);
    }

    #[test]
    fn non_trap_error_is_not_a_timeout() {
        let err = anyhow::anyhow!("some other failure");
        assert!(!is_timeout(&err));
    }
}
