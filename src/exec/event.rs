// src/exec/event.rs

//! Values emitted by an execution: sequenced output lines and the single
//! terminal [`Outcome`].

use std::fmt;
use std::time::{Duration, SystemTime};

/// Which child stream a line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSource::Stdout => f.write_str("stdout"),
            StreamSource::Stderr => f.write_str("stderr"),
        }
    }
}

/// One line of child output.
///
/// `sequence` is shared across stdout and stderr and starts at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEvent {
    pub sequence: u64,
    pub source: StreamSource,
    pub text: String,
    pub timestamp: SystemTime,
}

/// Terminal result of one execution. Exactly one is produced per handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded { exit_code: i32 },
    FailedWithExitCode { exit_code: i32 },
    TimedOut { elapsed: Duration },
    Cancelled,
    LaunchError { reason: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }

    /// Exit code the process actually reported, if it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Outcome::Succeeded { exit_code } | Outcome::FailedWithExitCode { exit_code } => {
                Some(*exit_code)
            }
            _ => None,
        }
    }

    /// Build a completion outcome from a raw exit code.
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            Outcome::Succeeded { exit_code }
        } else {
            Outcome::FailedWithExitCode { exit_code }
        }
    }

    /// Exit code the CLI uses when mirroring this outcome.
    ///
    /// Follows the usual shell conventions (`timeout(1)` uses 124, a missing
    /// command 127, SIGINT 130).
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Outcome::Succeeded { .. } => 0,
            Outcome::FailedWithExitCode { exit_code } => *exit_code,
            Outcome::TimedOut { .. } => 124,
            Outcome::Cancelled => 130,
            Outcome::LaunchError { .. } => 127,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Succeeded { .. } => f.write_str("succeeded"),
            Outcome::FailedWithExitCode { exit_code } => {
                write!(f, "failed with exit code {exit_code}")
            }
            Outcome::TimedOut { elapsed } => {
                write!(f, "timed out after {:.1}s", elapsed.as_secs_f64())
            }
            Outcome::Cancelled => f.write_str("cancelled"),
            Outcome::LaunchError { reason } => write!(f, "could not start: {reason}"),
        }
    }
}

/// Everything a consumer observes from an execution handle, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEvent {
    Line(LineEvent),
    /// Always the last event for a handle.
    Finished(Outcome),
}
