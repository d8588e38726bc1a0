mod common;
use crate::common::{fast_options, init_tracing, sh, texts, with_timeout};

use std::time::Duration;

use scriptvisor::errors::ScriptvisorError;
use scriptvisor::exec::{CommandDescriptor, Engine, ExecutionEvent, Outcome};

#[tokio::test]
async fn exit_codes_round_trip() {
    init_tracing();
    let engine = Engine::new(fast_options());

    for code in [0, 1, 2, 42, 255] {
        let handle = engine.execute(sh(&format!("exit {code}"))).unwrap();
        let outcome = with_timeout(handle.wait()).await;
        assert_eq!(outcome, Outcome::from_exit_code(code), "exit {code}");
        assert_eq!(outcome.exit_code(), Some(code));
    }
}

#[tokio::test]
async fn zero_exit_is_success_with_lines() {
    init_tracing();
    let engine = Engine::new(fast_options());
    let handle = engine.execute(sh("echo hello; echo world")).unwrap();

    let (lines, outcome) = with_timeout(handle.collect()).await;
    assert_eq!(outcome, Outcome::Succeeded { exit_code: 0 });
    assert!(outcome.is_success());
    assert_eq!(texts(&lines), ["hello", "world"]);
}

#[tokio::test]
async fn signal_death_maps_to_128_plus_signal() {
    init_tracing();
    let engine = Engine::new(fast_options());
    let handle = engine.execute(sh("kill -9 $$")).unwrap();

    let outcome = with_timeout(handle.wait()).await;
    assert_eq!(outcome, Outcome::FailedWithExitCode { exit_code: 137 });
}

#[tokio::test]
async fn missing_binary_is_a_launch_error() {
    init_tracing();
    let engine = Engine::new(fast_options());
    let mut handle = engine
        .execute(CommandDescriptor::builder("/nonexistent/binary").build())
        .unwrap();

    // No process exists, so the engine is free right away.
    assert!(!engine.is_busy());
    assert!(handle.is_finalized());
    assert!(!handle.cancel());

    match with_timeout(handle.next_event()).await {
        Some(ExecutionEvent::Finished(Outcome::LaunchError { reason })) => {
            assert!(reason.contains("/nonexistent/binary"), "reason: {reason}");
        }
        other => panic!("expected a single LaunchError, got {other:?}"),
    }
    assert!(with_timeout(handle.next_event()).await.is_none());
}

#[tokio::test]
async fn missing_working_dir_is_a_launch_error() {
    init_tracing();
    let engine = Engine::new(fast_options());
    let descriptor = CommandDescriptor::shell("echo never")
        .working_dir("/nonexistent/dir/for/scriptvisor")
        .build();

    let (lines, outcome) = with_timeout(engine.execute(descriptor).unwrap().collect()).await;
    assert!(lines.is_empty());
    assert!(matches!(outcome, Outcome::LaunchError { .. }), "{outcome:?}");
    assert_eq!(outcome.process_exit_code(), 127);
}

#[tokio::test]
async fn second_execution_is_refused_while_busy() {
    init_tracing();
    let engine = Engine::new(fast_options());
    let first = engine.execute(sh("sleep 5")).unwrap();
    assert!(engine.is_busy());

    let second = engine.execute(sh("echo nope"));
    assert!(matches!(second, Err(ScriptvisorError::Busy(_))));

    assert!(first.cancel());
    let outcome = with_timeout(first.wait()).await;
    assert_eq!(outcome, Outcome::Cancelled);

    // The slot is released before `Finished` is delivered.
    assert!(!engine.is_busy());
    let third = engine.execute(sh("echo again")).unwrap();
    let (lines, outcome) = with_timeout(third.collect()).await;
    assert!(outcome.is_success());
    assert_eq!(texts(&lines), ["again"]);
}

#[tokio::test]
async fn execution_ids_increase() {
    init_tracing();
    let engine = Engine::new(fast_options());

    let first = engine.execute(sh("true")).unwrap();
    let first_id = first.id();
    with_timeout(first.wait()).await;

    let second = engine.execute(sh("true")).unwrap();
    assert!(second.id() > first_id);
    with_timeout(second.wait()).await;
}

#[tokio::test]
async fn label_travels_with_the_handle() {
    init_tracing();
    let engine = Engine::new(fast_options());
    let descriptor = CommandDescriptor::shell("true")
        .label("Install nginx")
        .timeout(Duration::from_secs(5))
        .build();

    let handle = engine.execute(descriptor).unwrap();
    assert_eq!(handle.label(), "Install nginx");
    assert!(with_timeout(handle.wait()).await.is_success());
}
