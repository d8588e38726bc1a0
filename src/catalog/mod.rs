// src/catalog/mod.rs

//! Script catalog: turns validated catalog entries into command descriptors.
//!
//! Environment layering for a descriptor, later layers winning:
//! 1. the catalog's global `[env]`
//! 2. detected [`SystemFacts`]
//! 3. the entry's own `env`
//! 4. per-launch overrides (e.g. `--env` on the CLI)

pub mod detect;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::config::{CatalogEntry, CatalogFile, EngineSettings, EntryKind};
use crate::errors::{Result, ScriptvisorError};
use crate::exec::{CommandDescriptor, EngineOptions, SupervisorOptions};

pub use detect::SystemFacts;

/// Per-launch adjustments supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOverrides {
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

/// A loaded catalog plus the facts of the host it runs on.
#[derive(Debug, Clone)]
pub struct Catalog {
    file: CatalogFile,
    facts: SystemFacts,
}

impl Catalog {
    pub fn new(file: CatalogFile, facts: SystemFacts) -> Self {
        Self { file, facts }
    }

    pub fn facts(&self) -> &SystemFacts {
        &self.facts
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.file.entries.values()
    }

    pub fn get(&self, name: &str) -> Result<&CatalogEntry> {
        self.file
            .entry(name)
            .ok_or_else(|| ScriptvisorError::UnknownEntry(name.to_string()))
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions::from(&self.file.engine)
    }

    /// Build the descriptor for entry `name`.
    ///
    /// Refuses entries marked `requires_root` when not running as root.
    pub fn descriptor_for(
        &self,
        name: &str,
        overrides: &LaunchOverrides,
    ) -> Result<CommandDescriptor> {
        let entry = self.get(name)?;
        if entry.requires_root && !self.facts.is_root {
            return Err(ScriptvisorError::RequiresRoot(entry.label.clone()));
        }

        let builder = match &entry.kind {
            EntryKind::Script { program, args, cwd } => {
                let mut builder = CommandDescriptor::builder(self.resolve_program(program))
                    .args(args.iter().cloned());
                if let Some(cwd) = cwd {
                    builder = builder.working_dir(self.resolve_path(cwd));
                }
                builder
            }
            EntryKind::Quick { command } => CommandDescriptor::shell(command.clone()),
        };

        let timeout = overrides
            .timeout
            .or(entry.timeout)
            .or(self.file.engine.default_timeout);

        let descriptor = builder
            .envs(self.file.env.clone())
            .envs(self.facts.env())
            .envs(entry.env.clone())
            .envs(overrides.env.iter().cloned())
            .maybe_timeout(timeout)
            .label(entry.label.clone())
            .build();

        debug!(entry = name, command = %descriptor, ?timeout, "built descriptor from catalog");
        Ok(descriptor)
    }

    /// Paths with a `/` are relative to the catalog; bare names stay bare so
    /// the launcher looks them up on `PATH`.
    fn resolve_program(&self, program: &str) -> String {
        if program.contains('/') {
            self.resolve_path(program).to_string_lossy().into_owned()
        } else {
            program.to_string()
        }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.file.base_dir.join(path)
        }
    }
}

impl From<&EngineSettings> for EngineOptions {
    fn from(settings: &EngineSettings) -> Self {
        EngineOptions {
            supervisor: SupervisorOptions {
                grace_period: settings.grace_period,
                drain_timeout: settings.drain_timeout,
            },
            event_buffer: settings.event_buffer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawCatalogFile;

    fn catalog(src: &str, is_root: bool) -> Catalog {
        let raw: RawCatalogFile = toml::from_str(src).unwrap();
        let file = CatalogFile::try_from(raw).unwrap().with_base_dir("/opt/kit");
        let facts = SystemFacts {
            distro_id: Some("debian".into()),
            distro_version: Some("12".into()),
            is_root,
        };
        Catalog::new(file, facts)
    }

    const SRC: &str = r#"
        [engine]
        grace_period = "2s"
        default_timeout = "5m"

        [env]
        DEBIAN_FRONTEND = "noninteractive"
        VERSION = "global"

        [script.php]
        label = "Install PHP-FPM"
        program = "scripts/php.sh"
        args = ["--fpm"]
        cwd = "scripts"
        env = { VERSION = "8.3" }
        requires_root = true

        [script.ping]
        program = "uname"
        args = ["-a"]
        timeout = "10s"

        [quick.restart]
        command = "systemctl restart php8.3-fpm"
    "#;

    #[test]
    fn script_paths_resolve_against_catalog_dir() {
        let c = catalog(SRC, true);
        let d = c.descriptor_for("php", &LaunchOverrides::default()).unwrap();
        assert_eq!(d.program(), "/opt/kit/scripts/php.sh");
        assert_eq!(d.arguments(), ["--fpm"]);
        assert_eq!(d.working_dir(), Some(Path::new("/opt/kit/scripts")));
        assert_eq!(d.label(), "Install PHP-FPM");
    }

    #[test]
    fn bare_program_stays_bare() {
        let c = catalog(SRC, false);
        let d = c.descriptor_for("ping", &LaunchOverrides::default()).unwrap();
        assert_eq!(d.program(), "uname");
        assert_eq!(d.timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn env_layers_apply_in_order() {
        let c = catalog(SRC, true);
        let overrides = LaunchOverrides {
            env: vec![("DB_PASSWORD".into(), "s3cret".into())],
            timeout: None,
        };
        let d = c.descriptor_for("php", &overrides).unwrap();
        let env = d.environment();
        assert_eq!(env["DEBIAN_FRONTEND"], "noninteractive");
        assert_eq!(env["VERSION"], "8.3");
        assert_eq!(env["SCRIPTVISOR_DISTRO"], "debian");
        assert_eq!(env["SCRIPTVISOR_IS_ROOT"], "1");
        assert_eq!(env["DB_PASSWORD"], "s3cret");
    }

    #[test]
    fn timeout_precedence_is_override_entry_default() {
        let c = catalog(SRC, false);
        let d = c.descriptor_for("restart", &LaunchOverrides::default()).unwrap();
        assert_eq!(d.timeout(), Some(Duration::from_secs(300)));
        assert_eq!(d.program(), "/bin/sh");

        let overrides = LaunchOverrides {
            env: Vec::new(),
            timeout: Some(Duration::from_secs(1)),
        };
        let d = c.descriptor_for("ping", &overrides).unwrap();
        assert_eq!(d.timeout(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn root_only_entries_are_refused_without_root() {
        let c = catalog(SRC, false);
        let err = c.descriptor_for("php", &LaunchOverrides::default()).unwrap_err();
        assert!(matches!(err, ScriptvisorError::RequiresRoot(_)), "{err}");
    }

    #[test]
    fn unknown_entry_is_reported() {
        let c = catalog(SRC, true);
        let err = c.descriptor_for("nope", &LaunchOverrides::default()).unwrap_err();
        assert!(matches!(err, ScriptvisorError::UnknownEntry(ref n) if n == "nope"));
    }

    #[test]
    fn engine_options_follow_catalog() {
        let c = catalog(SRC, true);
        let opts = c.engine_options();
        assert_eq!(opts.supervisor.grace_period, Duration::from_secs(2));
        assert_eq!(opts.event_buffer, 64);
    }
}
