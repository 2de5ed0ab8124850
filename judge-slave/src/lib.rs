// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The one-shot slave process: connects to a master, compiles and checks
//! exactly one submission, and reports the outcome.

pub mod slave;
pub mod state;

pub use slave::run;
pub use state::SlaveState;
