//! Serde data file structs for content definitions.
//!
//! These structs define the on-disk format for machines, items and recipes.
//! They are deserialized from RON, JSON, or TOML data files and then
//! resolved into catalog types by the loader. Every field except `id` has a
//! default, so entries only need the values they care about.

use serde::Deserialize;

// ===========================================================================
// Machines
// ===========================================================================

/// Cell extent of a machine, `x` by `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SizeData {
    pub x: u32,
    pub y: u32,
}

impl Default for SizeData {
    fn default() -> Self {
        Self { x: 1, y: 1 }
    }
}

/// A machine definition in a data file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    /// `conveyor`, `processor`, `storage`; anything else is a generic machine.
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub size: SizeData,
    #[serde(default)]
    pub cost: u32,
    /// Zero or absent falls back to the configured default speed.
    #[serde(default)]
    pub ticks_per_move: u32,
    #[serde(default)]
    pub processing_ticks: u32,
    #[serde(default)]
    pub input_slots: u32,
    #[serde(default)]
    pub output_slots: u32,
    #[serde(default)]
    pub storage_capacity: u32,
    #[serde(default = "default_true")]
    pub placeable: bool,
}

fn default_true() -> bool {
    true
}

// ===========================================================================
// Items
// ===========================================================================

/// An item definition in a data file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sell_price: u32,
    /// `#rrggbb` hex string.
    #[serde(default)]
    pub color: Option<String>,
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A recipe input or output slot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSlotData {
    pub item_id: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

/// A recipe definition in a data file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeData {
    #[serde(default)]
    pub id: String,
    pub machine_type: String,
    #[serde(default)]
    pub inputs: Vec<RecipeSlotData>,
    #[serde(default)]
    pub outputs: Vec<RecipeSlotData>,
    #[serde(default)]
    pub processing_ticks: u32,
}
