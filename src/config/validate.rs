// src/config/validate.rs

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::config::duration::parse_duration;
use crate::config::model::{
    CatalogEntry, CatalogFile, EngineSettings, EntryKind, RawCatalogFile,
};
use crate::errors::{Result, ScriptvisorError};

static ENV_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("env key regex is valid"));

impl TryFrom<RawCatalogFile> for CatalogFile {
    type Error = ScriptvisorError;

    fn try_from(raw: RawCatalogFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_entries(&raw)?;
        ensure_unique_names(&raw)?;
        validate_env("[env]", &raw.env)?;

        let engine = validate_engine(&raw)?;
        let mut entries = BTreeMap::new();

        for (name, script) in raw.script {
            let ctx = format!("[script.{name}]");
            if script.program.trim().is_empty() {
                return Err(config_error(format!("{ctx}.program must not be empty")));
            }
            validate_env(&ctx, &script.env)?;
            let timeout = optional_duration(&ctx, "timeout", script.timeout.as_deref())?;

            let entry = CatalogEntry {
                label: script.label.unwrap_or_else(|| name.clone()),
                name: name.clone(),
                description: script.description,
                kind: EntryKind::Script {
                    program: script.program,
                    args: script.args,
                    cwd: script.cwd,
                },
                env: script.env,
                timeout,
                requires_root: script.requires_root,
            };
            entries.insert(name, entry);
        }

        for (name, quick) in raw.quick {
            let ctx = format!("[quick.{name}]");
            if quick.command.trim().is_empty() {
                return Err(config_error(format!("{ctx}.command must not be empty")));
            }
            validate_env(&ctx, &quick.env)?;
            let timeout = optional_duration(&ctx, "timeout", quick.timeout.as_deref())?;

            let entry = CatalogEntry {
                label: quick.label.unwrap_or_else(|| quick.command.clone()),
                name: name.clone(),
                description: None,
                kind: EntryKind::Quick {
                    command: quick.command,
                },
                env: quick.env,
                timeout,
                requires_root: quick.requires_root,
            };
            entries.insert(name, entry);
        }

        Ok(CatalogFile::new_unchecked(engine, raw.env, entries))
    }
}

fn config_error(msg: impl Into<String>) -> ScriptvisorError {
    ScriptvisorError::ConfigError(msg.into())
}

fn ensure_has_entries(cfg: &RawCatalogFile) -> Result<()> {
    if cfg.script.is_empty() && cfg.quick.is_empty() {
        return Err(config_error(
            "catalog must contain at least one [script.<name>] or [quick.<name>] section",
        ));
    }
    Ok(())
}

fn ensure_unique_names(cfg: &RawCatalogFile) -> Result<()> {
    if let Some(name) = cfg.script.keys().find(|name| cfg.quick.contains_key(*name)) {
        return Err(config_error(format!(
            "'{name}' is defined both as [script.{name}] and [quick.{name}]"
        )));
    }
    Ok(())
}

fn validate_engine(cfg: &RawCatalogFile) -> Result<EngineSettings> {
    let engine = &cfg.engine;

    if engine.event_buffer == 0 {
        return Err(config_error("[engine].event_buffer must be >= 1 (got 0)"));
    }

    let grace_period = required_duration("[engine]", "grace_period", &engine.grace_period)?;
    let drain_timeout = required_duration("[engine]", "drain_timeout", &engine.drain_timeout)?;
    let default_timeout =
        optional_duration("[engine]", "default_timeout", engine.default_timeout.as_deref())?;

    Ok(EngineSettings {
        grace_period,
        drain_timeout,
        event_buffer: engine.event_buffer,
        default_timeout,
    })
}

fn validate_env(ctx: &str, env: &BTreeMap<String, String>) -> Result<()> {
    for key in env.keys() {
        if !ENV_KEY.is_match(key) {
            return Err(config_error(format!(
                "{ctx}: invalid environment variable name '{key}'"
            )));
        }
    }
    Ok(())
}

fn required_duration(ctx: &str, field: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| config_error(format!("{ctx}.{field}: {e}")))
}

fn optional_duration(ctx: &str, field: &str, value: Option<&str>) -> Result<Option<Duration>> {
    value.map(|v| required_duration(ctx, field, v)).transpose()
}
