// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Slave-local structured logging.
//!
//! Standard output/error of the slave process itself must be redirected
//! to a per-slave log file *before any untrusted code loads*. `init`
//! must therefore run as close to the top of `main` as possible.

use std::fs::OpenOptions;
use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber, routing to `log_file` if given
/// or stderr otherwise. Returns an error rather than panicking: a logging
/// setup failure should not itself be fatal to the slave.
pub fn init(log_file: Option<&Path>, level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(move || file.try_clone().expect("log file handle"))
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}")),
    }
}
