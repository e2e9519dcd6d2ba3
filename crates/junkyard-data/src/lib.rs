//! Content and configuration loading for the junkyard simulation.
//!
//! Reads machine, item and recipe definitions (plus an optional simulation
//! config) from a directory of RON, JSON or TOML files and resolves them
//! into a frozen [`ContentCatalog`](junkyard_core::catalog::ContentCatalog).

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, LoadReport, LoadedContent, load_config, load_content_dir};
