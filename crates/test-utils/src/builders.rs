#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use scriptvisor::catalog::{Catalog, SystemFacts};
use scriptvisor::config::{CatalogFile, QuickConfig, RawCatalogFile, ScriptConfig};
use tempfile::TempDir;

/// Builder for `CatalogFile` to simplify test setup.
pub struct CatalogFileBuilder {
    catalog: RawCatalogFile,
}

impl CatalogFileBuilder {
    pub fn new() -> Self {
        Self {
            catalog: RawCatalogFile::default(),
        }
    }

    pub fn with_script(mut self, name: &str, script: ScriptConfig) -> Self {
        self.catalog.script.insert(name.to_string(), script);
        self
    }

    pub fn with_quick(mut self, name: &str, command: &str) -> Self {
        self.catalog.quick.insert(
            name.to_string(),
            QuickConfig {
                command: command.to_string(),
                env: BTreeMap::new(),
                timeout: None,
                label: None,
                requires_root: false,
            },
        );
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.catalog.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_grace_period(mut self, grace: &str) -> Self {
        self.catalog.engine.grace_period = grace.to_string();
        self
    }

    pub fn with_default_timeout(mut self, timeout: &str) -> Self {
        self.catalog.engine.default_timeout = Some(timeout.to_string());
        self
    }

    pub fn build(self) -> CatalogFile {
        CatalogFile::try_from(self.catalog).expect("Failed to build valid catalog from builder")
    }

    /// Wrap the built file into a `Catalog` for a non-root host with no
    /// os-release information.
    pub fn build_catalog(self) -> Catalog {
        Catalog::new(self.build(), SystemFacts::default())
    }
}

impl Default for CatalogFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ScriptConfig`.
pub struct ScriptConfigBuilder {
    script: ScriptConfig,
}

impl ScriptConfigBuilder {
    pub fn new(program: &str) -> Self {
        Self {
            script: ScriptConfig {
                program: program.to_string(),
                args: vec![],
                cwd: None,
                env: BTreeMap::new(),
                timeout: None,
                label: None,
                description: None,
                requires_root: false,
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.script.args.push(arg.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.script.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn cwd(mut self, cwd: &str) -> Self {
        self.script.cwd = Some(cwd.to_string());
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.script.timeout = Some(timeout.to_string());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.script.label = Some(label.to_string());
        self
    }

    pub fn requires_root(mut self) -> Self {
        self.script.requires_root = true;
        self
    }

    pub fn build(self) -> ScriptConfig {
        self.script
    }
}

/// A temporary catalog directory: scripts plus a `Scriptvisor.toml`.
pub struct CatalogDir {
    dir: TempDir,
}

impl CatalogDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp catalog dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write an executable `#!/bin/sh` script at `relative` (parents created).
    pub fn script(&self, relative: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create script dir");
        }
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        make_executable(&path);
        path
    }

    /// Write the catalog TOML and return its path.
    pub fn catalog(&self, toml: &str) -> PathBuf {
        let path = self.dir.path().join("Scriptvisor.toml");
        fs::write(&path, toml).expect("write catalog");
        path
    }
}

impl Default for CatalogDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod script");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
