mod common;
use crate::common::{fast_options, init_tracing, sequences, sh, texts, texts_from, with_timeout};

use std::time::Duration;

use proptest::prelude::*;
use tempfile::TempDir;

use scriptvisor::exec::{CommandDescriptor, Engine, ExecutionEvent, Outcome, StreamSource};

#[tokio::test]
async fn interleaved_streams_keep_emission_order() {
    init_tracing();
    let engine = Engine::new(fast_options());
    let handle = engine
        .execute(sh("echo A; sleep 0.1; echo B 1>&2; sleep 0.1; echo C"))
        .unwrap();

    let (lines, outcome) = with_timeout(handle.collect()).await;
    assert_eq!(outcome, Outcome::Succeeded { exit_code: 0 });
    assert_eq!(texts(&lines), ["A", "B", "C"]);
    assert_eq!(sequences(&lines), [1, 2, 3]);
    assert_eq!(lines[1].source, StreamSource::Stderr);
    assert_eq!(texts_from(&lines, StreamSource::Stdout), ["A", "C"]);
}

#[tokio::test]
async fn back_to_back_writes_keep_per_stream_order() {
    init_tracing();
    let engine = Engine::new(fast_options());
    let handle = engine.execute(sh("echo A; echo B 1>&2; echo C")).unwrap();

    // Without a pause between writes the two pipes race; only per-stream
    // order and the shared counter are guaranteed.
    let (lines, outcome) = with_timeout(handle.collect()).await;
    assert_eq!(outcome, Outcome::Succeeded { exit_code: 0 });
    assert_eq!(sequences(&lines), [1, 2, 3]);
    assert_eq!(texts_from(&lines, StreamSource::Stdout), ["A", "C"]);
    assert_eq!(texts_from(&lines, StreamSource::Stderr), ["B"]);
}

#[tokio::test]
async fn slow_consumer_receives_every_line_before_finished() {
    init_tracing();
    let engine = Engine::new(
        fast_options()
            .with_event_buffer(4)
            .with_drain_timeout(Duration::from_millis(100)),
    );
    let mut handle = engine
        .execute(sh("i=1; while [ $i -le 200 ]; do echo line$i; i=$((i+1)); done"))
        .unwrap();

    let mut lines = Vec::new();
    let mut outcome = None;
    while let Some(event) = with_timeout(handle.next_event()).await {
        assert!(outcome.is_none(), "event after Finished: {event:?}");
        match event {
            ExecutionEvent::Line(line) => lines.push(line),
            ExecutionEvent::Finished(o) => outcome = Some(o),
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(outcome, Some(Outcome::Succeeded { exit_code: 0 }));
    assert_eq!(sequences(&lines), (1..=200).collect::<Vec<u64>>());
    assert_eq!(lines[0].text, "line1");
    assert_eq!(lines[199].text, "line200");
}

#[tokio::test]
async fn partial_final_line_is_delivered() {
    init_tracing();
    let engine = Engine::new(fast_options());
    let handle = engine.execute(sh("echo first; printf 'no newline'")).unwrap();

    let (lines, outcome) = with_timeout(handle.collect()).await;
    assert!(outcome.is_success());
    assert_eq!(texts(&lines), ["first", "no newline"]);
}

#[tokio::test]
async fn environment_overlay_is_applied() {
    init_tracing();
    let engine = Engine::new(fast_options());
    let descriptor = CommandDescriptor::shell("echo \"$GREETING-$TARGET\"")
        .env("GREETING", "hello")
        .env("TARGET", "world")
        .build();

    let (lines, _) = with_timeout(engine.execute(descriptor).unwrap().collect()).await;
    assert_eq!(texts(&lines), ["hello-world"]);
}

#[tokio::test]
async fn inherited_environment_is_kept() {
    init_tracing();
    let engine = Engine::new(fast_options());
    let (lines, _) = with_timeout(
        engine
            .execute(sh("test -n \"$PATH\" && echo has-path"))
            .unwrap()
            .collect(),
    )
    .await;
    assert_eq!(texts(&lines), ["has-path"]);
}

#[tokio::test]
async fn working_directory_is_applied() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let engine = Engine::new(fast_options());
    let descriptor = CommandDescriptor::shell("pwd -P")
        .working_dir(dir.path())
        .build();

    let (lines, outcome) = with_timeout(engine.execute(descriptor).unwrap().collect()).await;
    assert!(outcome.is_success());
    let expected = dir.path().canonicalize().unwrap();
    let expected = expected.to_string_lossy().into_owned();
    assert_eq!(texts(&lines), [expected.as_str()]);
}

#[tokio::test]
async fn stdin_is_closed() {
    init_tracing();
    let engine = Engine::new(fast_options());
    let (lines, _) = with_timeout(
        engine
            .execute(sh("read line || echo eof"))
            .unwrap()
            .collect(),
    )
    .await;
    assert_eq!(texts(&lines), ["eof"]);
}

#[tokio::test]
async fn large_output_survives_a_small_buffer() {
    init_tracing();
    let engine = Engine::new(fast_options().with_event_buffer(1));
    let handle = engine
        .execute(sh("i=1; while [ $i -le 500 ]; do echo line$i; i=$((i+1)); done"))
        .unwrap();

    let (lines, outcome) = with_timeout(handle.collect()).await;
    assert!(outcome.is_success());
    assert_eq!(lines.len(), 500);
    assert_eq!(lines[499].text, "line500");
    assert_eq!(sequences(&lines), (1..=500).collect::<Vec<u64>>());
}

fn script_for(streams: &[bool]) -> String {
    streams
        .iter()
        .enumerate()
        .map(|(i, to_stderr)| {
            if *to_stderr {
                format!("echo L{i} 1>&2")
            } else {
                format!("echo L{i}")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Sequence numbers are contiguous from 1, every line arrives exactly
    /// once, and each stream keeps its own order.
    #[test]
    fn sequences_are_gapless_and_per_stream_ordered(
        streams in proptest::collection::vec(any::<bool>(), 1..40)
    ) {
        init_tracing();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (lines, outcome) = rt.block_on(async {
            let engine = Engine::new(fast_options());
            with_timeout(engine.execute(sh(&script_for(&streams))).unwrap().collect()).await
        });

        prop_assert!(outcome.is_success());
        prop_assert_eq!(sequences(&lines), (1..=streams.len() as u64).collect::<Vec<_>>());

        for (source, is_stderr) in [(StreamSource::Stdout, false), (StreamSource::Stderr, true)] {
            let expected: Vec<String> = streams
                .iter()
                .enumerate()
                .filter(|(_, s)| **s == is_stderr)
                .map(|(i, _)| format!("L{i}"))
                .collect();
            prop_assert_eq!(texts_from(&lines, source), expected);
        }
    }
}
