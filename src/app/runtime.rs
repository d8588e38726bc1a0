// src/app/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::io::Write;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::{Canceller, CommandDescriptor, ExecutionEvent, ExecutorBackend, Outcome};

use super::core::{AppCommand, AppCore};
use super::render::Renderer;
use super::AppEvent;

/// Drives the front-end core in response to `AppEvent`s, delegates command
/// execution to an `ExecutorBackend` and rendering to a `Renderer`.
///
/// Execution events are forwarded from the handle into the same event queue
/// as user input, so the core sees one ordered stream.
pub struct AppRuntime<E: ExecutorBackend, W: Write> {
    core: AppCore,
    event_tx: mpsc::Sender<AppEvent>,
    event_rx: mpsc::Receiver<AppEvent>,
    executor: E,
    renderer: Renderer<W>,
    active: Option<Canceller>,
    /// Follow-up events produced while executing commands; handled before
    /// anything new is read from the channel.
    pending: VecDeque<AppEvent>,
}

impl<E: ExecutorBackend, W: Write> fmt::Debug for AppRuntime<E, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppRuntime")
            .field("core", &self.core)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend, W: Write> AppRuntime<E, W> {
    pub fn new(
        core: AppCore,
        event_tx: mpsc::Sender<AppEvent>,
        event_rx: mpsc::Receiver<AppEvent>,
        executor: E,
        renderer: Renderer<W>,
    ) -> Self {
        Self {
            core,
            event_tx,
            event_rx,
            executor,
            renderer,
            active: None,
            pending: VecDeque::new(),
        }
    }

    /// Main event loop.
    ///
    /// Returns the outcome of the last finished execution, if any, together
    /// with the renderer so callers (tests) can inspect what was written.
    pub async fn run(mut self) -> Result<(Option<Outcome>, Renderer<W>)> {
        info!("front end started");

        let start = self.core.start();
        for command in start.commands {
            self.execute_command(command)?;
        }

        loop {
            let event = match self.pending.pop_front() {
                Some(e) => e,
                None => match self.event_rx.recv().await {
                    Some(e) => e,
                    None => {
                        info!("front-end event channel closed; exiting");
                        break;
                    }
                },
            };

            if let AppEvent::Execution {
                event: ExecutionEvent::Finished(_),
                ..
            } = &event
            {
                self.active = None;
            }

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command)?;
            }

            if !step.keep_running {
                debug!("core requested exit; stopping front end");
                break;
            }
        }

        info!("front end exiting");
        Ok((self.core.last_outcome().cloned(), self.renderer))
    }

    fn execute_command(&mut self, command: AppCommand) -> Result<()> {
        match command {
            AppCommand::Execute(descriptor) => self.execute(descriptor),
            AppCommand::CancelActive => match &self.active {
                Some(canceller) => {
                    canceller.cancel();
                }
                None => debug!("cancel requested with no active execution"),
            },
            AppCommand::Render(op) => self.renderer.render(&op)?,
            AppCommand::Exit => debug!("core issued Exit command"),
        }
        Ok(())
    }

    fn execute(&mut self, descriptor: CommandDescriptor) {
        let handle = match self.executor.execute(descriptor) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "executor rejected descriptor");
                self.pending.push_back(AppEvent::Rejected {
                    reason: e.to_string(),
                });
                return;
            }
        };

        let exec_id = handle.id();
        let (mut events, canceller) = handle.into_parts();
        self.active = Some(canceller);
        self.pending.push_back(AppEvent::Started { exec_id });

        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let finished = matches!(event, ExecutionEvent::Finished(_));
                if tx.send(AppEvent::Execution { exec_id, event }).await.is_err() {
                    debug!(exec_id, "front end gone; dropping execution events");
                    break;
                }
                if finished {
                    break;
                }
            }
        });
    }
}
