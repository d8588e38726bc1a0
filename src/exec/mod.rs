// src/exec/mod.rs

//! Script execution and process supervision.
//!
//! This module is responsible for actually running commands, using
//! `tokio::process::Command`, and reporting back to the consumer via
//! [`ExecutionEvent`]s.
//!
//! - [`descriptor`] defines the immutable `CommandDescriptor` and its builder.
//! - [`launcher`] resolves and spawns the process.
//! - [`multiplexer`] merges stdout/stderr into sequenced line events.
//! - [`supervisor`] races exit, timeout and cancellation into one `Outcome`.
//! - [`engine`] ties them together and enforces a single active execution.
//! - [`backend`] provides the `ExecutorBackend` trait that the front end uses
//!   in production, and which tests can replace with a fake implementation.

pub mod backend;
pub mod descriptor;
pub mod engine;
pub mod event;
pub mod handle;
pub mod launcher;
pub mod multiplexer;
pub mod supervisor;

pub use backend::ExecutorBackend;
pub use descriptor::{CommandDescriptor, CommandDescriptorBuilder};
pub use engine::{Engine, EngineOptions};
pub use event::{ExecutionEvent, LineEvent, Outcome, StreamSource};
pub use handle::{Canceller, ExecutionHandle, Finalizer};
pub use supervisor::SupervisorOptions;
