//! Loading pipeline: finds data files, deserializes them, resolves
//! cross-references and builds the content catalog.
//!
//! A content directory holds up to four files, each in RON, JSON or TOML:
//! `machines.*`, `items.*`, `recipes.*` and `config.*`. Every one of them is
//! optional. Authoring slips (missing files, blank ids, repeated ids) are
//! logged and skipped; a recipe that names something that does not exist is
//! an error.

use crate::schema::{ItemData, MachineData, RecipeData, RecipeSlotData};
use junkyard_core::catalog::{
    CatalogError, ContentCatalog, ContentCatalogBuilder, ItemDef, MachineClass, MachineDef,
    RecipeDef, RecipeEntry,
};
use junkyard_core::config::{ConfigError, SimConfig};
use junkyard_core::grid::Footprint;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The content path is not a directory.
    #[error("content directory not found: {dir}")]
    MissingDir { dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// The config file holds values the simulation cannot run with.
    #[error("invalid config in {file}: {source}")]
    InvalidConfig {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// The resolved content was rejected by the catalog builder.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Find `{base_name}.ron`, `.toml` or `.json` in `dir`.
///
/// Returns `Ok(None)` if none exists, and `Err(ConflictingFormats)` if more
/// than one does.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.is_file() {
            continue;
        }
        if let Some(existing) = found.take() {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }

    Ok(found)
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list of entries from a file.
///
/// TOML files must hold the array under `key` (`[[machines]]` tables). JSON
/// files may be a bare array or an object with the array under `key`. RON
/// files are a bare list.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => {
            let mut value: serde_json::Value =
                serde_json::from_str(&content).map_err(|e| parse_error(path, e))?;
            if let Some(table) = value.as_object_mut() {
                value = table
                    .remove(key)
                    .ok_or_else(|| parse_error(path, format!("missing key '{key}'")))?;
            }
            serde_json::from_value(value).map_err(|e| parse_error(path, e))
        }
        Format::Toml => {
            let mut table: toml::Table =
                toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .remove(key)
                .ok_or_else(|| parse_error(path, format!("missing key '{key}'")))?;
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

/// Load `{base_name}.*` as a list, or `None` (with a warning) when the file
/// does not exist.
fn load_list<T: DeserializeOwned>(
    dir: &Path,
    base_name: &'static str,
) -> Result<Option<(PathBuf, Vec<T>)>, DataLoadError> {
    match find_data_file(dir, base_name)? {
        Some(path) => {
            let entries = deserialize_list(&path, base_name)?;
            Ok(Some((path, entries)))
        }
        None => {
            tracing::warn!(dir = %dir.display(), file = base_name, "content file not found");
            Ok(None)
        }
    }
}

// ===========================================================================
// Resolution
// ===========================================================================

fn machine_class(category: &str) -> MachineClass {
    match category.to_ascii_lowercase().as_str() {
        "conveyor" => MachineClass::Conveyor,
        "processor" => MachineClass::Processor,
        "storage" => MachineClass::Storage,
        _ => MachineClass::Other,
    }
}

fn display_name_or(display: String, id: &str) -> String {
    if display.is_empty() {
        id.to_string()
    } else {
        display
    }
}

fn machine_def(data: MachineData) -> MachineDef {
    let display_name = display_name_or(data.display_name, &data.id);
    MachineDef {
        display_name,
        footprint: Footprint::new(data.size.x, data.size.y),
        cost: data.cost,
        ticks_per_move: (data.ticks_per_move > 0).then_some(data.ticks_per_move),
        processing_ticks: data.processing_ticks,
        input_slots: data.input_slots,
        output_slots: data.output_slots,
        storage_capacity: data.storage_capacity,
        placeable: data.placeable,
        ..MachineDef::new(&data.id, machine_class(&data.category))
    }
}

fn item_def(data: ItemData) -> ItemDef {
    let display_name = display_name_or(data.display_name, &data.id);
    ItemDef {
        display_name,
        category: data.category,
        sell_price: data.sell_price,
        color: data.color,
        ..ItemDef::new(&data.id)
    }
}

fn resolve_slots(
    builder: &ContentCatalogBuilder,
    slots: &[RecipeSlotData],
    file: &Path,
) -> Result<Vec<RecipeEntry>, DataLoadError> {
    slots
        .iter()
        .map(|slot| {
            let item = builder
                .item_id(&slot.item_id)
                .ok_or_else(|| DataLoadError::UnresolvedRef {
                    file: file.to_path_buf(),
                    name: slot.item_id.clone(),
                    expected_kind: "item",
                })?;
            Ok(RecipeEntry {
                item,
                count: slot.count,
            })
        })
        .collect()
}

fn recipe_def(
    builder: &ContentCatalogBuilder,
    data: RecipeData,
    file: &Path,
) -> Result<RecipeDef, DataLoadError> {
    let machine_type =
        builder
            .machine_id(&data.machine_type)
            .ok_or_else(|| DataLoadError::UnresolvedRef {
                file: file.to_path_buf(),
                name: data.machine_type.clone(),
                expected_kind: "machine",
            })?;
    Ok(RecipeDef {
        inputs: resolve_slots(builder, &data.inputs, file)?,
        outputs: resolve_slots(builder, &data.outputs, file)?,
        name: data.id,
        machine_type,
        processing_ticks: data.processing_ticks,
    })
}

fn has_id(id: &str, kind: &'static str, file: &Path) -> bool {
    if id.trim().is_empty() {
        tracing::warn!(file = %file.display(), kind, "skipping entry with empty id");
        false
    } else {
        true
    }
}

// ===========================================================================
// Public API
// ===========================================================================

/// What a load produced, and what it had to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Base names that had no file in the directory.
    pub missing_files: Vec<&'static str>,
    pub skipped_empty_ids: usize,
    pub duplicates_dropped: usize,
}

/// The result of [`load_content_dir`].
#[derive(Debug, Clone)]
pub struct LoadedContent {
    pub catalog: ContentCatalog,
    pub config: SimConfig,
    pub report: LoadReport,
}

/// Load `config.*` from `dir`, or the defaults when there is none.
pub fn load_config(dir: &Path) -> Result<SimConfig, DataLoadError> {
    let Some(path) = find_data_file(dir, "config")? else {
        tracing::debug!(dir = %dir.display(), "no config file, using defaults");
        return Ok(SimConfig::default());
    };
    let config: SimConfig = deserialize_file(&path)?;
    config
        .validate()
        .map_err(|source| DataLoadError::InvalidConfig { file: path, source })?;
    Ok(config)
}

/// Load a content directory into a frozen catalog and a validated config.
///
/// Items load before machines, and both before recipes, so recipe
/// references resolve against everything registered.
pub fn load_content_dir(dir: &Path) -> Result<LoadedContent, DataLoadError> {
    if !dir.is_dir() {
        return Err(DataLoadError::MissingDir {
            dir: dir.to_path_buf(),
        });
    }

    let mut builder = ContentCatalogBuilder::new();
    let mut report = LoadReport::default();

    match load_list::<ItemData>(dir, "items")? {
        Some((path, entries)) => {
            for data in entries {
                if has_id(&data.id, "item", &path) {
                    builder.register_item(item_def(data));
                } else {
                    report.skipped_empty_ids += 1;
                }
            }
        }
        None => report.missing_files.push("items"),
    }

    match load_list::<MachineData>(dir, "machines")? {
        Some((path, entries)) => {
            for data in entries {
                if has_id(&data.id, "machine", &path) {
                    builder.register_machine(machine_def(data));
                } else {
                    report.skipped_empty_ids += 1;
                }
            }
        }
        None => report.missing_files.push("machines"),
    }

    let mut recipe_duplicates = 0;
    match load_list::<RecipeData>(dir, "recipes")? {
        Some((path, entries)) => {
            for data in entries {
                if !has_id(&data.id, "recipe", &path) {
                    report.skipped_empty_ids += 1;
                    continue;
                }
                if builder.recipe_id(&data.id).is_some() {
                    tracing::warn!(name = %data.id, "duplicate recipe id, keeping first");
                    recipe_duplicates += 1;
                    continue;
                }
                let def = recipe_def(&builder, data, &path)?;
                builder.register_recipe(def);
            }
        }
        None => report.missing_files.push("recipes"),
    }

    report.duplicates_dropped = builder.duplicates_dropped() + recipe_duplicates;
    let config = load_config(dir)?;
    let catalog = builder
        .build()?
        .with_default_ticks_per_move(config.default_ticks_per_move);

    tracing::info!(
        dir = %dir.display(),
        machines = catalog.machine_count(),
        items = catalog.item_count(),
        recipes = catalog.recipe_count(),
        skipped = report.skipped_empty_ids,
        duplicates = report.duplicates_dropped,
        "content loaded"
    );

    Ok(LoadedContent {
        catalog,
        config,
        report,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "junkyard_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // -----------------------------------------------------------------------
    // detect_format / find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("items.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("items.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("items.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        for name in ["items.yaml", "items"] {
            assert!(matches!(
                detect_format(Path::new(name)),
                Err(DataLoadError::UnsupportedFormat { .. })
            ));
        }
    }

    #[test]
    fn find_data_file_found_and_missing() {
        let dir = make_test_dir("find");
        assert_eq!(find_data_file(&dir, "items").unwrap(), None);

        fs::write(dir.join("items.toml"), "").unwrap();
        assert_eq!(
            find_data_file(&dir, "items").unwrap(),
            Some(dir.join("items.toml"))
        );

        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("items.ron"), "[]").unwrap();
        fs::write(dir.join("items.json"), "[]").unwrap();

        assert!(matches!(
            find_data_file(&dir, "items"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // deserialize_list
    // -----------------------------------------------------------------------

    #[test]
    fn json_list_bare_or_wrapped() {
        let dir = make_test_dir("json_list");
        let bare = dir.join("bare.json");
        let wrapped = dir.join("wrapped.json");
        fs::write(&bare, r#"[{ "id": "a" }]"#).unwrap();
        fs::write(&wrapped, r#"{ "items": [{ "id": "a" }, { "id": "b" }] }"#).unwrap();

        let bare: Vec<ItemData> = deserialize_list(&bare, "items").unwrap();
        let wrapped: Vec<ItemData> = deserialize_list(&wrapped, "items").unwrap();
        assert_eq!(bare.len(), 1);
        assert_eq!(wrapped.len(), 2);

        cleanup(&dir);
    }

    #[test]
    fn toml_list_missing_key_is_parse_error() {
        let dir = make_test_dir("toml_key");
        let path = dir.join("items.toml");
        fs::write(&path, "[[things]]\nid = \"a\"\n").unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_list(&path, "items");
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    #[test]
    fn malformed_ron_is_parse_error() {
        let dir = make_test_dir("bad_ron");
        let path = dir.join("items.ron");
        fs::write(&path, "[(id: ]").unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_list(&path, "items");
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    #[test]
    fn category_maps_to_class() {
        assert_eq!(machine_class("conveyor"), MachineClass::Conveyor);
        assert_eq!(machine_class("Processor"), MachineClass::Processor);
        assert_eq!(machine_class("storage"), MachineClass::Storage);
        assert_eq!(machine_class("decoration"), MachineClass::Other);
        assert_eq!(machine_class(""), MachineClass::Other);
    }

    #[test]
    fn zero_ticks_per_move_means_unset() {
        let data: MachineData =
            serde_json::from_str(r#"{ "id": "belt", "category": "conveyor" }"#).unwrap();
        let def = machine_def(data);
        assert_eq!(def.ticks_per_move, None);
        assert_eq!(def.display_name, "belt");
        assert!(def.is_conveyor());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = std::env::temp_dir().join("junkyard_data_test_does_not_exist");
        assert!(matches!(
            load_content_dir(&dir),
            Err(DataLoadError::MissingDir { .. })
        ));
    }

    #[test]
    fn config_defaults_when_absent() {
        let dir = make_test_dir("config_absent");
        assert_eq!(load_config(&dir).unwrap(), SimConfig::default());
        cleanup(&dir);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = make_test_dir("config_invalid");
        fs::write(dir.join("config.toml"), "ticks_per_second = 0\n").unwrap();
        assert!(matches!(
            load_config(&dir),
            Err(DataLoadError::InvalidConfig {
                source: ConfigError::ZeroTickRate,
                ..
            })
        ));
        cleanup(&dir);
    }

    #[test]
    fn tick_rate_above_nanosecond_resolution_is_rejected() {
        let dir = make_test_dir("config_too_fast");
        fs::write(dir.join("config.json"), r#"{ "ticks_per_second": 2000000000 }"#).unwrap();
        assert!(matches!(
            load_config(&dir),
            Err(DataLoadError::InvalidConfig {
                source: ConfigError::TickRateTooHigh(2_000_000_000),
                ..
            })
        ));
        cleanup(&dir);
    }
}
