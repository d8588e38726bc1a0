// src/exec/handle.rs

//! The consumer-facing side of one in-flight execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::event::{ExecutionEvent, LineEvent, Outcome};

/// "Already finalized" flag shared by the supervisor and every canceller.
///
/// Only the first `finalize` call wins; this is what guarantees a single
/// outcome when exit, timeout and cancellation fire close together.
///
/// It marks the outcome as chosen, not the process as gone. After a timeout
/// the flag is already set while the child is still inside its grace window.
#[derive(Debug, Clone, Default)]
pub struct Finalizer(Arc<AtomicBool>);

impl Finalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for the caller that actually finalized.
    pub fn finalize(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_finalized(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Cloneable cancellation request for one execution.
#[derive(Debug, Clone)]
pub struct Canceller {
    token: CancellationToken,
    finalizer: Finalizer,
}

impl Canceller {
    pub fn new(token: CancellationToken, finalizer: Finalizer) -> Self {
        Self { token, finalizer }
    }

    /// Request cooperative termination.
    ///
    /// Idempotent: returns `true` only for the call that actually delivered a
    /// request. Cancelling an execution that is already terminal is a no-op.
    pub fn cancel(&self) -> bool {
        if self.finalizer.is_finalized() || self.token.is_cancelled() {
            return false;
        }
        self.token.cancel();
        true
    }
}

/// Live reference to one run, handed out by `Engine::execute`.
///
/// Events arrive in sequence order and [`ExecutionEvent::Finished`] is always
/// the last one.
#[derive(Debug)]
pub struct ExecutionHandle {
    id: u64,
    label: String,
    events: mpsc::Receiver<ExecutionEvent>,
    canceller: Canceller,
    finalizer: Finalizer,
}

impl ExecutionHandle {
    /// Assemble a handle from its parts.
    ///
    /// The engine is the usual caller; alternative executors (fakes in
    /// tests) can use it to hand out scripted event streams.
    pub fn from_parts(
        id: u64,
        label: impl Into<String>,
        events: mpsc::Receiver<ExecutionEvent>,
        token: CancellationToken,
        finalizer: Finalizer,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            events,
            canceller: Canceller::new(token, finalizer.clone()),
            finalizer,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the terminal outcome has been decided. The child may still be
    /// shutting down at that point.
    pub fn is_finalized(&self) -> bool {
        self.finalizer.is_finalized()
    }

    /// See [`Canceller::cancel`].
    pub fn cancel(&self) -> bool {
        let delivered = self.canceller.cancel();
        debug!(exec_id = self.id, delivered, "cancel requested");
        delivered
    }

    /// A detached canceller, e.g. for a Ctrl-C handler.
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Next event, or `None` after `Finished` has been observed.
    pub async fn next_event(&mut self) -> Option<ExecutionEvent> {
        self.events.recv().await
    }

    /// Split into the raw event receiver and a canceller.
    pub fn into_parts(self) -> (mpsc::Receiver<ExecutionEvent>, Canceller) {
        (self.events, self.canceller)
    }

    /// Wait for the outcome, discarding output lines.
    pub async fn wait(self) -> Outcome {
        self.collect().await.1
    }

    /// Wait for the outcome, keeping every output line.
    pub async fn collect(mut self) -> (Vec<LineEvent>, Outcome) {
        let mut lines = Vec::new();
        while let Some(event) = self.events.recv().await {
            match event {
                ExecutionEvent::Line(line) => lines.push(line),
                ExecutionEvent::Finished(outcome) => return (lines, outcome),
            }
        }

        warn!(exec_id = self.id, "event stream closed without an outcome");
        (lines, Outcome::FailedWithExitCode { exit_code: -1 })
    }
}
