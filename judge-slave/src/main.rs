// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Slave binary entry point: `judge-slave <masterPort> <slaveUid>`.
//! Exit code 0 on orderly shutdown (including a shutdown triggered by
//! `SlaveDiedWithUnknownError`); non-zero only for pre-handshake failures
//! (bad arguments or an unreachable master).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Before anything else, including logging setup: a panic anywhere
    // below this line should still be describable to the master instead
    // of just vanishing into stderr.
    judge_common::backtrace::install_hook();

    let (port, uid) = match parse_args(std::env::args().skip(1).collect()) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("judge-slave: {message}");
            return ExitCode::FAILURE;
        }
    };

    let config = judge_common::Config::get();
    let log_file = config.log_file.clone().unwrap_or_else(|| default_log_file(&uid));
    // Standard output/error of the slave process itself must be
    // redirected before any untrusted code loads. Logging setup failure
    // is itself non-fatal: fall back to stderr rather than refuse to
    // judge the submission.
    if let Err(err) = judge_common::logging::init(Some(&log_file), &config.log_level) {
        eprintln!("judge-slave: failed to initialize logging, falling back to stderr: {err}");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("judge-slave: failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let master_addr = SocketAddr::from(([127, 0, 0, 1], port));
    match runtime.block_on(judge_slave::run(uid, master_addr)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "slave exited before completing the handshake with the master");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<(u16, String), String> {
    let [port, uid] = <[String; 2]>::try_from(args)
        .map_err(|_| "usage: judge-slave <masterPort> <slaveUid>".to_string())?;
    let port: u16 = port.parse().map_err(|_| format!("invalid master port: {port:?}"))?;
    if uid.is_empty() {
        return Err("slave uid must not be empty".to_string());
    }
    Ok((port, uid))
}

fn default_log_file(uid: &str) -> PathBuf {
    std::env::temp_dir().join(format!("judge-slave-{uid}.log"))
}
