// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{CatalogFile, RawCatalogFile};
use crate::errors::Result;

/// Environment variable that overrides the default catalog location.
pub const CATALOG_ENV_VAR: &str = "SCRIPTVISOR_CATALOG";

/// Load a catalog file from a given path and return the raw `RawCatalogFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawCatalogFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let catalog: RawCatalogFile = toml::from_str(&contents)?;

    Ok(catalog)
}

/// Load a catalog from path and validate it.
///
/// Relative `program` / `cwd` paths in the result resolve against the
/// catalog's own directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<CatalogFile> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    let catalog = CatalogFile::try_from(raw)?.with_base_dir(catalog_root_dir(path));
    debug!(
        path = %path.display(),
        entries = catalog.entries.len(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Like [`load_and_validate`], but a missing file is not an error.
///
/// Used by subcommands (`exec`, `facts`) that work without a catalog.
pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<CatalogFile>> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no catalog file; continuing without one");
        return Ok(None);
    }
    load_and_validate(path).map(Some)
}

/// Resolve the catalog path: explicit CLI value, then `SCRIPTVISOR_CATALOG`,
/// then `Scriptvisor.toml` in the current directory.
pub fn resolve_catalog_path(cli_value: Option<&str>) -> PathBuf {
    cli_value
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CATALOG_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(default_catalog_path)
}

pub fn default_catalog_path() -> PathBuf {
    PathBuf::from("Scriptvisor.toml")
}

/// Directory containing the catalog.
///
/// A bare filename like `Scriptvisor.toml` (parent = "") maps to the current
/// working directory.
fn catalog_root_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
