// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The front end talks to an `ExecutorBackend` instead of a concrete
//! [`Engine`]. Production code uses the engine; tests can provide their own
//! implementation that hands out scripted handles without spawning anything.

use crate::errors::Result;

use super::descriptor::CommandDescriptor;
use super::engine::Engine;
use super::handle::ExecutionHandle;

/// Trait abstracting how descriptors are executed.
pub trait ExecutorBackend: Send {
    /// Start `descriptor` and return a live handle.
    ///
    /// Implementations must honour the engine contract: exactly one
    /// `Finished` event per handle, after every line event.
    fn execute(&mut self, descriptor: CommandDescriptor) -> Result<ExecutionHandle>;
}

impl ExecutorBackend for Engine {
    fn execute(&mut self, descriptor: CommandDescriptor) -> Result<ExecutionHandle> {
        Engine::execute(self, descriptor)
    }
}
