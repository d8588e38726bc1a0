// src/exec/launcher.rs

//! Process launcher.
//!
//! Resolves the descriptor's program, checks that it can be executed and
//! spawns it with piped stdout/stderr. Nothing is spawned when resolution
//! fails, and launches are never retried.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, info};

use super::descriptor::CommandDescriptor;

/// A freshly spawned child with its output streams detached.
///
/// Ownership of `stdout` / `stderr` passes to the stream multiplexer; the
/// supervisor keeps `child`.
#[derive(Debug)]
pub struct Launched {
    pub child: Child,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
    pub program: PathBuf,
}

/// Why a descriptor could not be started. Becomes `Outcome::LaunchError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchFailure {
    pub reason: String,
}

impl LaunchFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Spawn the process described by `descriptor`.
pub fn start(descriptor: &CommandDescriptor) -> Result<Launched, LaunchFailure> {
    let program = resolve_program(descriptor)?;

    if let Some(dir) = descriptor.working_dir() {
        if !dir.is_dir() {
            return Err(LaunchFailure::new(format!(
                "working directory '{}' does not exist or is not a directory",
                dir.display()
            )));
        }
    }

    let mut cmd = Command::new(&program);
    cmd.args(descriptor.arguments())
        .envs(descriptor.environment())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = descriptor.working_dir() {
        cmd.current_dir(dir);
    }

    // Own process group so termination signals reach the whole script tree.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|e| {
        LaunchFailure::new(format!("failed to spawn '{}': {e}", program.display()))
    })?;

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        // Both were configured as piped above.
        let _ = child.start_kill();
        return Err(LaunchFailure::new("child output pipes were not created"));
    };

    info!(
        label = %descriptor.label(),
        program = %program.display(),
        pid = child.id(),
        "process launched"
    );

    Ok(Launched {
        child,
        stdout,
        stderr,
        program,
    })
}

/// Resolve the descriptor's program to an executable path.
///
/// - Anything containing a `/` is treated as a path (relative paths are made
///   absolute against the current directory) and must be an executable file.
/// - Bare names are looked up on `PATH`; a `PATH` in the descriptor's
///   environment overlay takes precedence over the inherited one.
pub fn resolve_program(descriptor: &CommandDescriptor) -> Result<PathBuf, LaunchFailure> {
    let program = descriptor.program();
    if program.trim().is_empty() {
        return Err(LaunchFailure::new("empty program name"));
    }

    if program.contains('/') {
        let path = absolutize(Path::new(program));
        check_executable(&path)?;
        return Ok(path);
    }

    let search_path: Option<OsString> = descriptor
        .environment()
        .get("PATH")
        .map(OsString::from)
        .or_else(|| std::env::var_os("PATH"));
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));

    let resolved = which::which_in(program, search_path, cwd).map_err(|e| {
        LaunchFailure::new(format!("'{program}' not found on PATH: {e}"))
    })?;

    debug!(program, resolved = %resolved.display(), "resolved program on PATH");
    Ok(resolved)
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

fn check_executable(path: &Path) -> Result<(), LaunchFailure> {
    let meta = std::fs::metadata(path).map_err(|e| {
        LaunchFailure::new(format!("'{}' is not accessible: {e}", path.display()))
    })?;

    if !meta.is_file() {
        return Err(LaunchFailure::new(format!(
            "'{}' is not a regular file",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(LaunchFailure::new(format!(
                "'{}' is not executable (permission denied)",
                path.display()
            )));
        }
    }

    Ok(())
}
