// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The runtime `Check` model and the check runner: resolves wire
//! `CheckSpec`s into runnable checks (compiling any
//! `SOURCE_CODE` check bodies along the way) and drives each one
//! against every compiled file with a main entry point.

pub mod compiled_check;
pub mod import_check;
pub mod io_check;
pub mod model;
pub mod runner;

pub use compiled_check::CompiledCheck;
pub use import_check::ImportCheck;
pub use io_check::IoCheck;
pub use model::{Check, RequiredType};
pub use runner::{build_checks, run_checks};
