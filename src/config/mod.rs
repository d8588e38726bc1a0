// src/config/mod.rs

//! Script catalog configuration.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a catalog file from disk (`loader.rs`).
//! - Validate it into a typed `CatalogFile` (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_from_path, load_optional, resolve_catalog_path};
pub use model::{
    CatalogEntry, CatalogFile, EngineSection, EngineSettings, EntryKind, QuickConfig,
    RawCatalogFile, ScriptConfig,
};
