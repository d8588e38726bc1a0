use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use scriptvisor::errors::{Result, ScriptvisorError};
use scriptvisor::exec::{
    CommandDescriptor, ExecutionEvent, ExecutionHandle, ExecutorBackend, Finalizer, LineEvent,
    Outcome, StreamSource,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How a fake execution ends.
#[derive(Debug, Clone)]
pub enum FakeEnding {
    /// Report this outcome right after the scripted lines.
    Finish(Outcome),
    /// Keep "running" until cancelled, then report `Cancelled`.
    UntilCancelled,
}

/// A fake executor that:
/// - records every descriptor it was asked to run
/// - replays a fixed list of lines, then ends as configured
/// - optionally refuses with `Busy`, like an engine with a run in flight.
pub struct FakeExecutor {
    executed: Arc<Mutex<Vec<CommandDescriptor>>>,
    lines: Vec<(StreamSource, String)>,
    ending: FakeEnding,
    busy: bool,
    next_id: u64,
}

impl FakeExecutor {
    pub fn new(executed: Arc<Mutex<Vec<CommandDescriptor>>>) -> Self {
        Self {
            executed,
            lines: Vec::new(),
            ending: FakeEnding::Finish(Outcome::Succeeded { exit_code: 0 }),
            busy: false,
            next_id: 0,
        }
    }

    pub fn with_stdout(mut self, text: &str) -> Self {
        self.lines.push((StreamSource::Stdout, text.to_string()));
        self
    }

    pub fn with_stderr(mut self, text: &str) -> Self {
        self.lines.push((StreamSource::Stderr, text.to_string()));
        self
    }

    pub fn ending(mut self, ending: FakeEnding) -> Self {
        self.ending = ending;
        self
    }

    pub fn busy(mut self) -> Self {
        self.busy = true;
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn execute(&mut self, descriptor: CommandDescriptor) -> Result<ExecutionHandle> {
        if self.busy {
            return Err(ScriptvisorError::Busy(descriptor.label().to_string()));
        }

        self.next_id += 1;
        let id = self.next_id;
        let label = descriptor.label().to_string();
        self.executed.lock().unwrap().push(descriptor);

        let (tx, rx) = mpsc::channel(16);
        let token = CancellationToken::new();
        let finalizer = Finalizer::new();
        let handle = ExecutionHandle::from_parts(id, label, rx, token.clone(), finalizer.clone());

        let lines = self.lines.clone();
        let ending = self.ending.clone();
        tokio::spawn(async move {
            for (i, (source, text)) in lines.into_iter().enumerate() {
                let line = LineEvent {
                    sequence: i as u64 + 1,
                    source,
                    text,
                    timestamp: SystemTime::now(),
                };
                if tx.send(ExecutionEvent::Line(line)).await.is_err() {
                    return;
                }
            }

            let outcome = match ending {
                FakeEnding::Finish(outcome) => outcome,
                FakeEnding::UntilCancelled => {
                    token.cancelled().await;
                    Outcome::Cancelled
                }
            };
            finalizer.finalize();
            let _ = tx.send(ExecutionEvent::Finished(outcome)).await;
        });

        Ok(handle)
    }
}
