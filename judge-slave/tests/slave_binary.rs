// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Drives the real `judge-slave` binary over a loopback TCP socket
//! against a mock master, covering a submission's full round trip: hello
//! world, an output mismatch, an infinite loop hitting its timeout, a
//! sandbox violation, a compilation failure, and the idle timeout before
//! any submission arrives.
//! Uses the environment-variable configuration knobs (`judge_common::config`)
//! to shrink timeouts well below their production defaults so this suite
//! stays fast.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use judge_protocol::check_result::Outcome;
use judge_protocol::check_spec::{CheckSpec, IoCheckSpec};
use judge_protocol::message::Message;
use judge_protocol::submission::Submission;
use tokio::net::TcpListener;
use tokio::process::{Child, Command};

struct SlaveProcess {
    child: Child,
}

impl Drop for SlaveProcess {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

/// Spawns the compiled `judge-slave` binary against `port`/`uid`, with the
/// idle timeout and check budget collapsed to test-sized durations via
/// environment variables rather than the 30s/10s production defaults.
fn spawn_slave(port: u16, uid: &str, idle_timeout_secs: f64, check_timeout_secs: f64) -> SlaveProcess {
    let log_file = std::env::temp_dir().join(format!("judge-slave-test-{uid}.log"));
    let child = Command::new(env!("CARGO_BIN_EXE_judge-slave"))
        .arg(port.to_string())
        .arg(uid)
        .env("JUDGE_SLAVE_IDLE_TIMEOUT_SECS", idle_timeout_secs.to_string())
        .env("JUDGE_SLAVE_CHECK_TIMEOUT_SECS", check_timeout_secs.to_string())
        .env("JUDGE_SLAVE_LOG_FILE", &log_file)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("failed to spawn judge-slave binary");
    SlaveProcess { child }
}

async fn accept_from(listener: &TcpListener) -> (judge_ipc::MessageClient, tokio::sync::mpsc::UnboundedReceiver<judge_ipc::InboundResult>) {
    let (stream, _addr) = listener.accept().await.expect("master accept");
    judge_ipc::MessageClient::from_stream(stream)
}

async fn recv_terminal_and_dying(
    inbound: &mut tokio::sync::mpsc::UnboundedReceiver<judge_ipc::InboundResult>,
) -> (Message, Message, Message) {
    let started = inbound.recv().await.expect("SlaveStarted").expect("well-formed frame");
    let terminal = inbound.recv().await.expect("terminal message").expect("well-formed frame");
    let dying = inbound.recv().await.expect("DyingMessage").expect("well-formed frame");
    (started, terminal, dying)
}

fn hello_world_files() -> BTreeMap<String, String> {
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
    files
}

#[tokio::test]
async fn hello_world_passes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let _slave = spawn_slave(port, "hello-world", 10.0, 5.0);

    let (client, mut inbound) = accept_from(&listener).await;
    let specs = vec![CheckSpec::Io(IoCheckSpec {
        name: "prints-hello".into(),
        input: vec![],
        expected_output: "Hello, World!\n".into(),
    })];
    client.queue_message(Message::CompileAndCheckSubmission {
        submission: Submission::new(hello_world_files()),
        checks: specs,
    });

    let (started, terminal, dying) = recv_terminal_and_dying(&mut inbound).await;
    assert!(matches!(started, Message::SlaveStarted { .. }));
    assert!(matches!(dying, Message::DyingMessage { .. }));
    match terminal {
        Message::SubmissionResult { result, .. } => {
            assert_eq!(result["Main"][0].outcome, Outcome::Passed);
        }
        other => panic!("expected SubmissionResult, got {other:?}"),
    }
}

#[tokio::test]
async fn output_mismatch_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let _slave = spawn_slave(port, "output-mismatch", 10.0, 5.0);

    let (client, mut inbound) = accept_from(&listener).await;
    let specs = vec![CheckSpec::Io(IoCheckSpec {
        name: "expects-goodbye".into(),
        input: vec![],
        expected_output: "Goodbye!\n".into(),
    })];
    client.queue_message(Message::CompileAndCheckSubmission {
        submission: Submission::new(hello_world_files()),
        checks: specs,
    });

    let (_started, terminal, _dying) = recv_terminal_and_dying(&mut inbound).await;
    match terminal {
        Message::SubmissionResult { result, .. } => {
            let check = &result["Main"][0];
            assert_eq!(check.outcome, Outcome::Failed);
            assert!(check.message.contains("Goodbye!"));
            assert!(check.message.contains("Hello, World!"));
        }
        other => panic!("expected SubmissionResult, got {other:?}"),
    }
}

#[tokio::test]
async fn infinite_loop_times_out_but_still_produces_a_result() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let _slave = spawn_slave(port, "infinite-loop", 10.0, 2.0);

    let (client, mut inbound) = accept_from(&listener).await;
    let mut files = BTreeMap::new();
    files.insert(
        "Main".to_string(),
        r#"(module (func (export "main") (result i32) (loop $l (br $l)) (i32.const 0)))"#.to_string(),
    );
    let specs =
        vec![CheckSpec::Io(IoCheckSpec { name: "hangs".into(), input: vec![], expected_output: String::new() })];
    client.queue_message(Message::CompileAndCheckSubmission { submission: Submission::new(files), checks: specs });

    let (_started, terminal, _dying) =
        tokio::time::timeout(Duration::from_secs(10), recv_terminal_and_dying(&mut inbound))
            .await
            .expect("slave to report within the timeout budget");
    match terminal {
        Message::SubmissionResult { result, .. } => {
            let check = &result["Main"][0];
            assert_eq!(check.outcome, Outcome::Errored);
            assert!(check.message.contains("timeout"));
        }
        other => panic!("expected SubmissionResult, got {other:?}"),
    }
}

#[tokio::test]
async fn a_disallowed_import_is_a_sandbox_violation() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let _slave = spawn_slave(port, "sandbox-violation", 10.0, 5.0);

    let (client, mut inbound) = accept_from(&listener).await;
    let mut files = BTreeMap::new();
    files.insert(
        "Main".to_string(),
        r#"(module
             (import "wasi_snapshot_preview1" "path_open" (func (param i32 i32 i32 i32 i32 i64 i64 i32 i32) (result i32)))
             (func (export "main") (result i32) i32.const 0))"#
            .to_string(),
    );
    let specs =
        vec![CheckSpec::Io(IoCheckSpec { name: "tries-to-open-a-file".into(), input: vec![], expected_output: String::new() })];
    client.queue_message(Message::CompileAndCheckSubmission { submission: Submission::new(files), checks: specs });

    let (_started, terminal, _dying) = recv_terminal_and_dying(&mut inbound).await;
    match terminal {
        Message::SubmissionResult { result, .. } => {
            assert_eq!(result["Main"][0].outcome, Outcome::Errored);
        }
        other => panic!("expected SubmissionResult, got {other:?}"),
    }
}

#[tokio::test]
async fn a_syntax_error_produces_compilation_failed_with_no_submission_result() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let _slave = spawn_slave(port, "compile-error", 10.0, 5.0);

    let (client, mut inbound) = accept_from(&listener).await;
    let mut files = BTreeMap::new();
    files.insert("Main".to_string(), "(module (func".to_string());
    client.queue_message(Message::CompileAndCheckSubmission { submission: Submission::new(files), checks: vec![] });

    let (_started, terminal, dying) = recv_terminal_and_dying(&mut inbound).await;
    match terminal {
        Message::CompilationFailed { output, .. } => {
            assert!(!output.successful);
            assert!(!output.diagnostics.is_empty());
        }
        other => panic!("expected CompilationFailed, got {other:?}"),
    }
    assert!(matches!(dying, Message::DyingMessage { .. }));
}

#[tokio::test]
async fn idle_timeout_reports_slave_timed_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let _slave = spawn_slave(port, "idle-timeout", 0.2, 5.0);

    let (_client, mut inbound) = accept_from(&listener).await;
    let (_started, terminal, dying) =
        tokio::time::timeout(Duration::from_secs(5), recv_terminal_and_dying(&mut inbound))
            .await
            .expect("slave to time out within the test's own deadline");
    assert!(matches!(terminal, Message::SlaveTimedOut { .. }));
    assert!(matches!(dying, Message::DyingMessage { .. }));
}
