// src/exec/engine.rs

//! Execution engine: wires launcher, multiplexer and supervisor together and
//! enforces at most one active execution at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{Result, ScriptvisorError};

use super::descriptor::CommandDescriptor;
use super::event::{ExecutionEvent, Outcome};
use super::handle::{ExecutionHandle, Finalizer};
use super::launcher;
use super::multiplexer::{LineSink, spawn_readers};
use super::supervisor::{Supervision, SupervisorOptions, supervise};

/// Engine-wide tuning, usually filled from the catalog's `[engine]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub supervisor: SupervisorOptions,
    /// Pending events buffered before the readers block.
    pub event_buffer: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            supervisor: SupervisorOptions::default(),
            event_buffer: 64,
        }
    }
}

impl EngineOptions {
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.supervisor.grace_period = grace;
        self
    }

    pub fn with_drain_timeout(mut self, drain: Duration) -> Self {
        self.supervisor.drain_timeout = drain;
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }
}

/// Releases the engine's single execution slot when dropped.
struct ActiveSlot(Arc<AtomicBool>);

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Starts executions. Cheap to share by reference; not `Clone` on purpose so
/// one engine owns one slot.
#[derive(Debug, Default)]
pub struct Engine {
    options: EngineOptions,
    active: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            active: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Whether an execution currently occupies the engine.
    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Launch `descriptor` and return its handle without waiting for it.
    ///
    /// Must be called from within a Tokio runtime. Fails only with
    /// [`ScriptvisorError::Busy`]; a launch failure is reported through the
    /// handle as a single `Finished(LaunchError)` event, and in that case no
    /// process exists and the engine is immediately free again.
    pub fn execute(&self, descriptor: CommandDescriptor) -> Result<ExecutionHandle> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ScriptvisorError::Busy(descriptor.label().to_string()));
        }
        let slot = ActiveSlot(Arc::clone(&self.active));

        let exec_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::channel(self.options.event_buffer.max(1));
        let token = CancellationToken::new();
        let finalizer = Finalizer::new();
        let handle = ExecutionHandle::from_parts(
            exec_id,
            descriptor.label(),
            rx,
            token.clone(),
            finalizer.clone(),
        );

        debug!(exec_id, label = %descriptor.label(), command = %descriptor, "starting execution");

        let launched = match launcher::start(&descriptor) {
            Ok(launched) => launched,
            Err(failure) => {
                warn!(exec_id, label = %descriptor.label(), reason = %failure.reason, "launch failed");
                finalizer.finalize();
                // Fresh channel with capacity >= 1: cannot be full.
                let _ = tx.try_send(ExecutionEvent::Finished(Outcome::LaunchError {
                    reason: failure.reason,
                }));
                drop(slot);
                return Ok(handle);
            }
        };

        let sink = LineSink::new(tx.clone());
        let readers = spawn_readers(launched.stdout, launched.stderr, sink);

        let supervision = Supervision {
            exec_id,
            label: descriptor.label().to_string(),
            child: launched.child,
            readers,
            timeout: descriptor.timeout(),
            cancel: token,
            finalizer,
            options: self.options.supervisor,
        };

        tokio::spawn(async move {
            let outcome = supervise(supervision).await;
            // Free the slot first: a consumer reacting to `Finished` may
            // start the next execution right away.
            drop(slot);
            if tx.send(ExecutionEvent::Finished(outcome)).await.is_err() {
                debug!(exec_id, "consumer gone before outcome was delivered");
            }
        });

        Ok(handle)
    }
}
