// src/exec/supervisor.rs

//! Supervisor: races natural exit, timeout and cancellation for one child
//! and reduces the run to exactly one [`Outcome`].
//!
//! Termination (timeout or cancellation) is graceful-then-forceful: SIGTERM
//! to the child's process group, up to `grace_period` to exit, then SIGKILL.
//! Once a terminal state is chosen no further signals are sent.
//!
//! The finalizer records which outcome was chosen, not that the process is
//! dead: on timeout or cancel it is set before SIGTERM goes out, and the
//! child may live on for up to `grace_period` after that.
//!
//! The supervisor returns only after both readers are done, so every
//! captured line is queued before the caller emits `Finished`. The drain
//! window only bounds how long a reader may sit on an empty pipe that a
//! descendant holds open; a reader waiting on a slow consumer is never cut.

use std::process::ExitStatus;
use std::time::{Duration, Instant};

use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event::Outcome;
use super::handle::Finalizer;
use super::multiplexer::StreamReaders;

/// Timing knobs for the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// Window between SIGTERM and SIGKILL.
    pub grace_period: Duration,
    /// How long to wait for the output streams to close after the child is
    /// gone before readers stop at the next empty read. Descendants that
    /// inherited the pipes can keep them open.
    pub drain_timeout: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(3),
            drain_timeout: Duration::from_millis(500),
        }
    }
}

/// Everything the supervisor owns for one execution.
pub struct Supervision {
    pub exec_id: u64,
    pub label: String,
    pub child: Child,
    pub readers: StreamReaders,
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
    pub finalizer: Finalizer,
    pub options: SupervisorOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Termination {
    Timeout,
    Cancel,
}

enum Race {
    Exited(std::io::Result<ExitStatus>),
    Terminate(Termination),
}

/// Run the state machine to completion and return the outcome.
pub async fn supervise(s: Supervision) -> Outcome {
    let Supervision {
        exec_id,
        label,
        mut child,
        mut readers,
        timeout,
        cancel,
        finalizer,
        options,
    } = s;

    let started = Instant::now();
    let pid = child.id();

    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let race = tokio::select! {
        biased;
        status = child.wait() => Race::Exited(status),
        _ = cancel.cancelled() => Race::Terminate(Termination::Cancel),
        _ = &mut deadline => Race::Terminate(Termination::Timeout),
    };

    let outcome = match race {
        Race::Exited(status) => {
            finalizer.finalize();
            outcome_from_wait(exec_id, status)
        }
        Race::Terminate(reason) => {
            let elapsed = started.elapsed();
            // Outcome is settled from here on; later cancels are no-ops even
            // while the child is still inside its grace window.
            finalizer.finalize();

            // Natural exit wins only if its status is already in hand.
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(exec_id, ?reason, "exit status already captured; reporting natural exit");
                    outcome_from_status(status)
                }
                _ => {
                    info!(exec_id, label = %label, ?reason, pid, "terminating process");
                    terminate(exec_id, &mut child, options.grace_period).await;
                    match reason {
                        Termination::Timeout => Outcome::TimedOut { elapsed },
                        Termination::Cancel => Outcome::Cancelled,
                    }
                }
            }
        }
    };

    if tokio::time::timeout(options.drain_timeout, readers.closed())
        .await
        .is_err()
    {
        debug!(exec_id, "output streams still open after drain window; stopping readers");
        readers.stop();
        readers.closed().await;
    }

    info!(
        exec_id,
        label = %label,
        outcome = %outcome,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "execution finished"
    );

    outcome
}

fn outcome_from_wait(exec_id: u64, status: std::io::Result<ExitStatus>) -> Outcome {
    match status {
        Ok(status) => outcome_from_status(status),
        Err(e) => {
            warn!(exec_id, error = %e, "failed to wait for child process");
            Outcome::FailedWithExitCode { exit_code: -1 }
        }
    }
}

/// Map a termination status to an outcome.
///
/// A process killed by a signal has no exit code; it is reported as
/// `128 + signal` like a shell would.
pub fn outcome_from_status(status: ExitStatus) -> Outcome {
    if let Some(code) = status.code() {
        return Outcome::from_exit_code(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Outcome::FailedWithExitCode {
                exit_code: 128 + signal,
            };
        }
    }

    Outcome::FailedWithExitCode { exit_code: -1 }
}

/// SIGTERM the process group, wait up to `grace`, then SIGKILL and reap.
async fn terminate(exec_id: u64, child: &mut Child, grace: Duration) {
    let pid = child.id();

    signal_group(pid, GroupSignal::Terminate);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(_) => {
            debug!(exec_id, "process exited within grace period");
            // Sweep group members that outlived the child and still hold the pipes.
            signal_group(pid, GroupSignal::Kill);
        }
        Err(_) => {
            warn!(
                exec_id,
                grace_ms = grace.as_millis() as u64,
                "process ignored graceful termination; killing"
            );
            signal_group(pid, GroupSignal::Kill);
            let _ = child.start_kill();
            if let Err(e) = child.wait().await {
                warn!(exec_id, error = %e, "failed to reap killed process");
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: Option<u32>, signal: GroupSignal) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    let signal = match signal {
        GroupSignal::Terminate => Signal::SIGTERM,
        GroupSignal::Kill => Signal::SIGKILL,
    };
    if let Err(e) = killpg(Pid::from_raw(pid as i32), signal) {
        debug!(pid, ?signal, error = %e, "killpg failed (group probably gone)");
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: Option<u32>, _signal: GroupSignal) {}
