// src/app/mod.rs

//! Terminal front end: the consumer of execution events.
//!
//! The pure state machine lives in [`core`] (a tagged [`View`] enum plus a
//! navigation stack); the async/IO shell that reads events, talks to the
//! executor and writes to the terminal is implemented in [`runtime`].
//! Execution output reaches the core only as immutable [`AppEvent`]s on a
//! queue, so the update loop is the single writer of view state.

use crate::catalog::LaunchOverrides;
use crate::exec::{CommandDescriptor, ExecutionEvent};

/// Events flowing into the front end from input, signals and executions.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Launch catalog entry `name`.
    Launch {
        name: String,
        overrides: LaunchOverrides,
    },
    /// Launch an ad-hoc descriptor (the `exec` subcommand).
    LaunchDescriptor(CommandDescriptor),
    /// The executor accepted the last `Execute` command.
    Started { exec_id: u64 },
    /// The executor refused the last `Execute` command (e.g. busy).
    Rejected { reason: String },
    /// An event from a running execution.
    Execution { exec_id: u64, event: ExecutionEvent },
    /// One line typed by the user in interactive mode.
    Input(String),
    /// Ctrl-C.
    Interrupt,
    /// Input closed or shutdown requested; cancels anything running first.
    Shutdown,
}

/// Options shared by the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct AppOptions {
    /// Exit once the first execution finishes (`run` / `exec`).
    pub exit_when_finished: bool,
    /// Lines of output retained by the running view.
    pub history_limit: usize,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            exit_when_finished: false,
            history_limit: 500,
        }
    }
}

pub mod core;
pub mod render;
pub mod runtime;

pub use self::core::{AppCommand, AppCore, AppStep, MenuItem, RenderOp, View};
pub use render::{Renderer, Tone};
pub use runtime::AppRuntime;
