// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The slave lifecycle state machine: `STARTING -> IDLE -> EXECUTING ->
//! TERMINATING -> DEAD`, driven by exactly one inbound
//! `CompileAndCheckSubmission`, an idle timer, and a top-level panic
//! boundary around submission execution.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use anyhow::Context;
use judge_checks::{build_checks, run_checks};
use judge_common::Config;
use judge_compiler::Compiler;
use judge_protocol::check_result::SubmissionCheckResult;
use judge_protocol::check_spec::CheckSpec;
use judge_protocol::compile::CompilationOutput;
use judge_protocol::message::Message;
use judge_protocol::submission::Submission;
use judge_sandbox::Sandbox;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::SlaveState;

/// Connects to the master at `master_addr`, runs the full lifecycle for
/// one submission, and returns once the socket has been closed.
///
/// An `Err` return means the slave never got far enough to say anything
/// to the master at all (the exit code for that case is reserved for
/// pre-handshake failures). Everything past the initial connect is
/// reported to the master as a message instead of propagated as a Rust
/// error, since a connected slave always owes the master exactly one
/// terminal message plus `DyingMessage`.
pub async fn run(uid: String, master_addr: SocketAddr) -> anyhow::Result<()> {
    let config = Config::get();
    let (client, inbound) = judge_ipc::MessageClient::connect(master_addr)
        .await
        .with_context(|| format!("connecting to master at {master_addr}"))?;
    drive(uid, client, inbound, config).await;
    Ok(())
}

/// Same lifecycle as [`run`], but over an already-established stream and
/// an explicit `Config` rather than the process-wide singleton. Used by
/// integration tests that accept a loopback connection from a mock
/// master instead of dialing one.
pub(crate) async fn run_from_stream(uid: String, stream: TcpStream, config: &Config) {
    let (client, inbound) = judge_ipc::MessageClient::from_stream(stream);
    drive(uid, client, inbound, config).await;
}

async fn drive(
    uid: String,
    client: judge_ipc::MessageClient,
    mut inbound: mpsc::UnboundedReceiver<judge_ipc::InboundResult>,
    config: &Config,
) {
    let pid = std::process::id();
    client.queue_message(Message::SlaveStarted { uid: uid.clone(), pid });
    debug!(uid, state = %SlaveState::Starting, "connected to master");
    info!(uid, state = %SlaveState::Idle, "waiting for a submission");

    let terminal = match wait_for_submission(&uid, &mut inbound, config.idle_timeout).await {
        Incoming::Submission(submission, checks) => {
            info!(uid, state = %SlaveState::Executing, "submission received");
            execute_submission(&uid, submission, checks, config).await
        }
        Incoming::IdleTimeout => {
            info!(uid, "idle timeout elapsed with no submission");
            Message::SlaveTimedOut { uid: uid.clone() }
        }
        Incoming::Disconnected => {
            // The master hard-killed the connection before sending
            // anything. There is nobody left to tell.
            warn!(uid, "master disconnected before sending a submission");
            return;
        }
        Incoming::ProtocolViolation(reason) => {
            warn!(uid, reason, "protocol violation while waiting for a submission");
            Message::SlaveDiedWithUnknownError { uid: uid.clone(), stacktrace: reason }
        }
    };

    info!(uid, state = %SlaveState::Terminating, kind = ?terminal, "submission processing finished");
    client.queue_message(terminal);
    client.queue_message(Message::DyingMessage { uid: uid.clone() });
    client.stop(config.flush_deadline).await;
    info!(uid, state = %SlaveState::Dead, "slave exiting");
}

enum Incoming {
    Submission(Submission, Vec<CheckSpec>),
    IdleTimeout,
    Disconnected,
    ProtocolViolation(String),
}

/// Waits for exactly the one message a slave is ever bound to receive,
/// racing the idle killer (`IDLE -> TERMINATING`). A second
/// `CompileAndCheckSubmission` sent while not `IDLE` is rejected by
/// construction: this function is only ever called once per slave, so
/// anything the master sends afterward simply sits unread in `inbound`.
async fn wait_for_submission(
    uid: &str,
    inbound: &mut mpsc::UnboundedReceiver<judge_ipc::InboundResult>,
    idle_timeout: Duration,
) -> Incoming {
    tokio::select! {
        biased;
        received = inbound.recv() => match received {
            Some(Ok(Message::CompileAndCheckSubmission { submission, checks })) => {
                Incoming::Submission(submission, checks)
            }
            Some(Ok(other)) => {
                Incoming::ProtocolViolation(format!("unexpected message from master while idle: {other:?}"))
            }
            Some(Err(err)) => {
                debug!(uid, %err, "malformed frame from master");
                Incoming::ProtocolViolation(format!("malformed frame from master: {err}"))
            }
            None => Incoming::Disconnected,
        },
        _ = tokio::time::sleep(idle_timeout) => Incoming::IdleTimeout,
    }
}

/// Compiles and checks the submission on a blocking thread (wasm
/// compilation and instance invocation are synchronous CPU work, not
/// async IO) and converts the outcome into the one terminal message the
/// slave owes the master.
async fn execute_submission(uid: &str, submission: Submission, checks: Vec<CheckSpec>, config: &Config) -> Message {
    let uid = uid.to_string();
    let max_source_bytes = config.max_source_bytes;
    let max_memory_bytes = config.max_memory_bytes;
    let budget = config.check_wall_clock_budget;

    let outcome = tokio::task::spawn_blocking(move || {
        run_submission(&submission, &checks, max_source_bytes, max_memory_bytes, budget)
    })
    .await;

    match outcome {
        Ok(Ok(SubmissionOutcome::CompilationFailed(output))) => Message::CompilationFailed { uid, output },
        Ok(Ok(SubmissionOutcome::Checked(result))) => Message::SubmissionResult { uid, result },
        Ok(Err(stacktrace)) => Message::SlaveDiedWithUnknownError { uid, stacktrace },
        Err(join_err) => {
            let stacktrace = if join_err.is_panic() {
                judge_common::backtrace::take_captured().unwrap_or_else(|| "submission executor task panicked".to_string())
            } else {
                "submission executor task was cancelled".to_string()
            };
            Message::SlaveDiedWithUnknownError { uid, stacktrace }
        }
    }
}

enum SubmissionOutcome {
    CompilationFailed(CompilationOutput),
    Checked(SubmissionCheckResult),
}

/// Runs entirely synchronously on a blocking-pool thread. Wrapped in
/// `catch_unwind` so a panic anywhere in compilation or check execution
/// (a wasmtime internal invariant violation, say) still lets the slave
/// report `SlaveDiedWithUnknownError` and shut down in order rather than
/// taking the whole process down with it.
fn run_submission(
    submission: &Submission,
    checks: &[CheckSpec],
    max_source_bytes: usize,
    max_memory_bytes: usize,
    budget: Duration,
) -> Result<SubmissionOutcome, String> {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| -> anyhow::Result<SubmissionOutcome> {
        let sandbox = Sandbox::new(max_memory_bytes).context("failed to initialize sandbox engine")?;
        let compiler = Compiler::new(&sandbox, max_source_bytes);
        let compiled = compiler.compile(&submission.files);

        if !compiled.output.successful {
            return Ok(SubmissionOutcome::CompilationFailed(compiled.output));
        }

        let runtime_checks = build_checks(checks, &compiler);
        let result = run_checks(&sandbox, &compiled, &runtime_checks, budget);
        Ok(SubmissionOutcome::Checked(result))
    }));

    match result {
        Ok(inner) => inner.map_err(|err| err.to_string()),
        Err(panic_payload) => Err(judge_common::backtrace::take_captured()
            .unwrap_or_else(|| judge_common::backtrace::panic_message(&*panic_payload))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judge_ipc::MessageClient;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tokio::net::TcpListener;

    fn test_config(idle_timeout: Duration) -> Config {
        Config {
            idle_timeout,
            check_wall_clock_budget: Duration::from_secs(2),
            flush_deadline: Duration::from_secs(1),
            log_file: None::<PathBuf>,
            log_level: "info".to_string(),
            max_source_bytes: 8 * 1024 * 1024,
            max_memory_bytes: 16 * 1024 * 1024,
        }
    }

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = TcpStream::connect(addr);
        let (accept_result, connect_result) = tokio::join!(listener.accept(), connect);
        (accept_result.unwrap().0, connect_result.unwrap())
    }

    fn hello_world_submission() -> Submission {
        let mut files = BTreeMap::new();
        files.insert(
            "Main".to_string(),
            r#"(module
                 (import "env" "write_stdout" (func $write_stdout (param i32 i32)))
                 (memory (export "memory") 1)
                 (data (i32.const 0) "Hello, World!\n")
                 (func (export "main") (result i32)
                   (call $write_stdout (i32.const 0) (i32.const 14))
                   (i32.const 0)))"#
                .to_string(),
        );
        Submission::new(files)
    }

    #[tokio::test]
    async fn a_passing_submission_yields_a_submission_result_then_dying_message() {
        let (server_stream, client_stream) = loopback_pair().await;
        let (server, mut server_inbound) = MessageClient::from_stream(server_stream);

        let specs = vec![CheckSpec::Io(judge_protocol::check_spec::IoCheckSpec {
            name: "hello".into(),
            input: vec![],
            expected_output: "Hello, World!\n".into(),
        })];
        server.queue_message(Message::CompileAndCheckSubmission { submission: hello_world_submission(), checks: specs });

        let config = test_config(Duration::from_secs(5));
        let slave = tokio::spawn(async move { run_from_stream("test-uid".to_string(), client_stream, &config).await });

        let mut received = Vec::new();
        while let Some(msg) = server_inbound.recv().await {
            received.push(msg.unwrap());
            if received.len() == 3 {
                break;
            }
        }
        slave.await.unwrap();

        assert!(matches!(received[0], Message::SlaveStarted { .. }));
        assert!(matches!(received[1], Message::SubmissionResult { .. }));
        assert!(matches!(received[2], Message::DyingMessage { .. }));
        if let Message::SubmissionResult { result, .. } = &received[1] {
            assert_eq!(result["Main"][0].outcome, judge_protocol::check_result::Outcome::Passed);
        }
    }

    #[tokio::test]
    async fn a_syntactically_invalid_submission_yields_compilation_failed_with_no_submission_result() {
        let (server_stream, client_stream) = loopback_pair().await;
        let (server, mut server_inbound) = MessageClient::from_stream(server_stream);

        let mut files = BTreeMap::new();
        files.insert("Main".to_string(), "(module (func".to_string());
        server.queue_message(Message::CompileAndCheckSubmission { submission: Submission::new(files), checks: vec![] });

        let config = test_config(Duration::from_secs(5));
        let slave = tokio::spawn(async move { run_from_stream("test-uid".to_string(), client_stream, &config).await });

        let mut received = Vec::new();
        while let Some(msg) = server_inbound.recv().await {
            received.push(msg.unwrap());
            if received.len() == 3 {
                break;
            }
        }
        slave.await.unwrap();

        assert!(matches!(received[1], Message::CompilationFailed { .. }));
        if let Message::CompilationFailed { output, .. } = &received[1] {
            assert!(!output.successful);
            assert!(!output.diagnostics.is_empty());
        }
    }

    #[tokio::test]
    async fn idle_timeout_yields_slave_timed_out_then_dying_message() {
        let (server_stream, client_stream) = loopback_pair().await;
        let (_server, mut server_inbound) = MessageClient::from_stream(server_stream);

        let config = test_config(Duration::from_millis(50));
        let slave = tokio::spawn(async move { run_from_stream("test-uid".to_string(), client_stream, &config).await });

        let mut received = Vec::new();
        while let Some(msg) = server_inbound.recv().await {
            received.push(msg.unwrap());
            if received.len() == 3 {
                break;
            }
        }
        slave.await.unwrap();

        assert!(matches!(received[1], Message::SlaveTimedOut { .. }));
        assert!(matches!(received[2], Message::DyingMessage { .. }));
    }

    #[tokio::test]
    async fn an_infinite_loop_submission_still_produces_a_submission_result() {
        let (server_stream, client_stream) = loopback_pair().await;
        let (server, mut server_inbound) = MessageClient::from_stream(server_stream);

        let mut files = BTreeMap::new();
        files.insert(
            "Main".to_string(),
            r#"(module (func (export "main") (result i32) (loop $l (br $l)) (i32.const 0)))"#.to_string(),
        );
        let specs = vec![CheckSpec::Io(judge_protocol::check_spec::IoCheckSpec {
            name: "hangs".into(),
            input: vec![],
            expected_output: "anything".into(),
        })];
        server.queue_message(Message::CompileAndCheckSubmission { submission: Submission::new(files), checks: specs });

        let mut config = test_config(Duration::from_secs(5));
        config.check_wall_clock_budget = Duration::from_millis(200);
        let slave = tokio::spawn(async move { run_from_stream("test-uid".to_string(), client_stream, &config).await });

        let mut received = Vec::new();
        while let Some(msg) = server_inbound.recv().await {
            received.push(msg.unwrap());
            if received.len() == 3 {
                break;
            }
        }
        slave.await.unwrap();

        if let Message::SubmissionResult { result, .. } = &received[1] {
            assert_eq!(result["Main"][0].outcome, judge_protocol::check_result::Outcome::Errored);
            assert!(result["Main"][0].message.contains("timeout"));
        } else {
            panic!("expected a SubmissionResult, got {:?}", received[1]);
        }
    }
}
