// src/catalog/detect.rs

//! System detector: ambient facts folded into descriptor environments.

use std::collections::BTreeMap;
use std::fs;

use tracing::debug;

pub const ENV_DISTRO: &str = "SCRIPTVISOR_DISTRO";
pub const ENV_DISTRO_VERSION: &str = "SCRIPTVISOR_DISTRO_VERSION";
pub const ENV_IS_ROOT: &str = "SCRIPTVISOR_IS_ROOT";

const OS_RELEASE_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

/// Facts about the host the scripts will run on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemFacts {
    /// `ID` from os-release, e.g. `ubuntu`, `debian`, `rocky`.
    pub distro_id: Option<String>,
    /// `VERSION_ID` from os-release, e.g. `24.04`.
    pub distro_version: Option<String>,
    pub is_root: bool,
}

impl SystemFacts {
    /// Inspect the running host. Missing os-release is not an error.
    pub fn detect() -> Self {
        let contents = OS_RELEASE_PATHS
            .iter()
            .find_map(|path| fs::read_to_string(path).ok())
            .unwrap_or_default();

        let facts = Self::from_os_release(&contents, effective_root());
        debug!(?facts, "detected system facts");
        facts
    }

    pub fn from_os_release(contents: &str, is_root: bool) -> Self {
        let fields = parse_os_release(contents);
        Self {
            distro_id: fields.get("ID").cloned(),
            distro_version: fields.get("VERSION_ID").cloned(),
            is_root,
        }
    }

    /// Environment overlay exported to every catalog descriptor.
    pub fn env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        if let Some(id) = &self.distro_id {
            env.insert(ENV_DISTRO.to_string(), id.clone());
        }
        if let Some(version) = &self.distro_version {
            env.insert(ENV_DISTRO_VERSION.to_string(), version.clone());
        }
        env.insert(
            ENV_IS_ROOT.to_string(),
            if self.is_root { "1" } else { "0" }.to_string(),
        );
        env
    }
}

#[cfg(unix)]
fn effective_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn effective_root() -> bool {
    false
}

/// Parse `KEY=value` lines, dropping comments and surrounding quotes.
fn parse_os_release(contents: &str) -> BTreeMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}
