// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared config, logging, and error plumbing used by every crate in the
//! judge slave workspace.

pub mod backtrace;
pub mod config;
pub mod logging;

pub use config::Config;
