#![allow(dead_code)]

use std::time::Duration;

use scriptvisor::exec::{CommandDescriptor, EngineOptions, LineEvent, StreamSource};

pub use scriptvisor_test_utils::{builders, fake_executor, init_tracing, with_timeout};

/// Engine options with short windows so termination tests stay fast.
pub fn fast_options() -> EngineOptions {
    EngineOptions::default()
        .with_grace_period(Duration::from_millis(300))
        .with_drain_timeout(Duration::from_millis(300))
}

/// `/bin/sh -c <script>`.
pub fn sh(script: &str) -> CommandDescriptor {
    CommandDescriptor::shell(script).build()
}

pub fn texts(lines: &[LineEvent]) -> Vec<&str> {
    lines.iter().map(|l| l.text.as_str()).collect()
}

pub fn texts_from(lines: &[LineEvent], source: StreamSource) -> Vec<&str> {
    lines
        .iter()
        .filter(|l| l.source == source)
        .map(|l| l.text.as_str())
        .collect()
}

pub fn sequences(lines: &[LineEvent]) -> Vec<u64> {
    lines.iter().map(|l| l.sequence).collect()
}
