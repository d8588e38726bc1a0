// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Catalog file exactly as read from TOML, before validation.
///
/// ```toml
/// [engine]
/// grace_period = "3s"
/// default_timeout = "30m"
///
/// [env]
/// DEBIAN_FRONTEND = "noninteractive"
///
/// [script.nginx]
/// label = "Install nginx"
/// program = "scripts/install_nginx.sh"
/// timeout = "10m"
/// env = { NGINX_VERSION = "1.26" }
///
/// [quick.restart-nginx]
/// command = "systemctl restart nginx"
/// ```
///
/// All sections are optional; validation requires at least one entry.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCatalogFile {
    #[serde(default)]
    pub engine: EngineSection,

    /// Environment overlay applied to every entry.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Install/config scripts from `[script.<name>]`.
    #[serde(default)]
    pub script: BTreeMap<String, ScriptConfig>,

    /// Shell one-liners from `[quick.<name>]`, run through `/bin/sh -c`.
    #[serde(default)]
    pub quick: BTreeMap<String, QuickConfig>,
}

/// `[engine]` section. Durations are strings like `"3s"` or `"250ms"`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_grace_period")]
    pub grace_period: String,

    #[serde(default = "default_drain_timeout")]
    pub drain_timeout: String,

    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Applied to entries that declare no `timeout`. Absent means entries
    /// without a timeout run unbounded.
    #[serde(default)]
    pub default_timeout: Option<String>,
}

fn default_grace_period() -> String {
    "3s".to_string()
}

fn default_drain_timeout() -> String {
    "500ms".to_string()
}

fn default_event_buffer() -> usize {
    64
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            grace_period: default_grace_period(),
            drain_timeout: default_drain_timeout(),
            event_buffer: default_event_buffer(),
            default_timeout: None,
        }
    }
}

/// `[script.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    /// Executable path; relative paths are resolved against the catalog's
    /// directory. Bare names are looked up on `PATH`.
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory, relative to the catalog's directory.
    #[serde(default)]
    pub cwd: Option<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub timeout: Option<String>,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub requires_root: bool,
}

/// `[quick.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct QuickConfig {
    pub command: String,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub timeout: Option<String>,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub requires_root: bool,
}

/// Validated engine settings with parsed durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub grace_period: Duration,
    pub drain_timeout: Duration,
    pub event_buffer: usize,
    pub default_timeout: Option<Duration>,
}

/// What a catalog entry runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Script {
        program: String,
        args: Vec<String>,
        cwd: Option<String>,
    },
    Quick {
        command: String,
    },
}

/// One runnable catalog entry, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: EntryKind,
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
    pub requires_root: bool,
}

/// Validated catalog.
///
/// Only constructed through `TryFrom<RawCatalogFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct CatalogFile {
    pub engine: EngineSettings,
    pub env: BTreeMap<String, String>,
    pub entries: BTreeMap<String, CatalogEntry>,
    /// Directory relative program and cwd paths are resolved against.
    pub base_dir: PathBuf,
}

impl CatalogFile {
    pub(crate) fn new_unchecked(
        engine: EngineSettings,
        env: BTreeMap<String, String>,
        entries: BTreeMap<String, CatalogEntry>,
    ) -> Self {
        Self {
            engine,
            env,
            entries,
            base_dir: PathBuf::from("."),
        }
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }
}
