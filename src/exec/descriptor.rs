// src/exec/descriptor.rs

//! Immutable description of a command to run.
//!
//! Callers (the script catalog, the `exec` subcommand, tests) build a
//! [`CommandDescriptor`] once per execution request via
//! [`CommandDescriptor::builder`]. The engine only ever reads it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to run, where, with which environment and how long it may take.
///
/// There is no mutation API: a new execution always gets a new descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    program: String,
    arguments: Vec<String>,
    working_dir: Option<PathBuf>,
    environment: BTreeMap<String, String>,
    timeout: Option<Duration>,
    label: String,
}

impl CommandDescriptor {
    /// Start building a descriptor for `program`.
    ///
    /// The label defaults to the program string.
    pub fn builder(program: impl Into<String>) -> CommandDescriptorBuilder {
        let program = program.into();
        CommandDescriptorBuilder {
            label: program.clone(),
            program,
            arguments: Vec::new(),
            working_dir: None,
            environment: BTreeMap::new(),
            timeout: None,
        }
    }

    /// Convenience: a descriptor running `command` through `/bin/sh -c`.
    pub fn shell(command: impl Into<String>) -> CommandDescriptorBuilder {
        let command = command.into();
        Self::builder("/bin/sh")
            .arg("-c")
            .arg(command.clone())
            .label(command)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Environment overlay, merged on top of the inherited environment.
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// `None` means no enforced timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.arguments {
            if arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Builder for [`CommandDescriptor`].
#[derive(Debug, Clone)]
pub struct CommandDescriptorBuilder {
    program: String,
    arguments: Vec<String>,
    working_dir: Option<PathBuf>,
    environment: BTreeMap<String, String>,
    timeout: Option<Duration>,
    label: String,
}

impl CommandDescriptorBuilder {
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add one overlay variable. Later calls win on key collision.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.environment.insert(k.into(), v.into());
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn maybe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn build(self) -> CommandDescriptor {
        CommandDescriptor {
            program: self.program,
            arguments: self.arguments,
            working_dir: self.working_dir,
            environment: self.environment,
            timeout: self.timeout,
            label: self.label,
        }
    }
}
