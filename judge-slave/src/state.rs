// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The slave's lifecycle states. Nothing in this module enforces the
//! transitions (the control flow in [`crate::slave::run`] does that by
//! construction); this exists purely so transitions show up as
//! structured log fields instead of scattered string literals.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveState {
    Starting,
    Idle,
    Executing,
    Terminating,
    Dead,
}

impl fmt::Display for SlaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlaveState::Starting => "STARTING",
            SlaveState::Idle => "IDLE",
            SlaveState::Executing => "EXECUTING",
            SlaveState::Terminating => "TERMINATING",
            SlaveState::Dead => "DEAD",
        };
        f.write_str(name)
    }
}
