//! Read-only content definitions: machines, items and recipes.
//!
//! Definitions are registered on a [`ContentCatalogBuilder`] and frozen into a
//! [`ContentCatalog`] once at startup. Lookups by id never fail loudly: the
//! `machine_*` convenience accessors substitute documented defaults for ids
//! the catalog does not know, so the tick loop never has to handle a missing
//! definition.

use crate::grid::Footprint;
use crate::id::{ItemTypeId, MachineTypeId, RecipeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ticks to cross one tile when a conveyor definition does not say.
pub const DEFAULT_TICKS_PER_MOVE: u32 = 4;

/// What a machine does with items. Only conveyors carry items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineClass {
    Conveyor,
    Processor,
    Storage,
    #[default]
    Other,
}

/// A machine type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineDef {
    pub name: String,
    pub display_name: String,
    pub class: MachineClass,
    /// Unrotated size.
    pub footprint: Footprint,
    pub cost: u32,
    /// Ticks to cross one tile. `None` or zero means [`DEFAULT_TICKS_PER_MOVE`].
    pub ticks_per_move: Option<u32>,
    pub processing_ticks: u32,
    pub input_slots: u32,
    pub output_slots: u32,
    pub storage_capacity: u32,
    /// Whether the player may build this machine.
    pub placeable: bool,
}

impl MachineDef {
    /// A definition with every optional field at its default.
    pub fn new(name: &str, class: MachineClass) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            class,
            footprint: Footprint::single(),
            cost: 0,
            ticks_per_move: None,
            processing_ticks: 0,
            input_slots: 0,
            output_slots: 0,
            storage_capacity: 0,
            placeable: true,
        }
    }

    /// A 1x1 conveyor moving one tile every `ticks_per_move` ticks.
    pub fn conveyor(name: &str, ticks_per_move: u32) -> Self {
        Self {
            ticks_per_move: Some(ticks_per_move),
            ..Self::new(name, MachineClass::Conveyor)
        }
    }

    pub fn with_footprint(mut self, footprint: Footprint) -> Self {
        self.footprint = footprint;
        self
    }

    pub fn is_conveyor(&self) -> bool {
        self.class == MachineClass::Conveyor
    }

    /// Configured ticks per move, or `default` when unset or zero.
    pub fn ticks_per_move_or(&self, default: u32) -> u32 {
        match self.ticks_per_move {
            Some(t) if t > 0 => t,
            _ => default,
        }
    }
}

/// An item type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDef {
    pub name: String,
    pub display_name: String,
    pub category: String,
    pub sell_price: u32,
    /// Hex color used by renderers, e.g. `"#8a8a8a"`.
    pub color: Option<String>,
}

impl ItemDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            category: String::new(),
            sell_price: 0,
            color: None,
        }
    }
}

/// A recipe input or output entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeEntry {
    pub item: ItemTypeId,
    pub count: u32,
}

/// A processing recipe. Catalogued so content can be validated; no system
/// in the core executes recipes.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDef {
    pub name: String,
    pub machine_type: MachineTypeId,
    pub inputs: Vec<RecipeEntry>,
    pub outputs: Vec<RecipeEntry>,
    pub processing_ticks: u32,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing an immutable [`ContentCatalog`].
///
/// Names are unique per kind. Registering a name twice keeps the first
/// definition and returns its id; the later one is dropped with a warning.
#[derive(Debug, Default)]
pub struct ContentCatalogBuilder {
    machines: Vec<MachineDef>,
    machine_name_to_id: HashMap<String, MachineTypeId>,
    items: Vec<ItemDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    duplicates_dropped: usize,
}

impl ContentCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a machine type. Returns its id (the existing id for a duplicate name).
    pub fn register_machine(&mut self, mut def: MachineDef) -> MachineTypeId {
        if let Some(&existing) = self.machine_name_to_id.get(&def.name) {
            tracing::warn!(name = %def.name, "duplicate machine id, keeping first");
            self.duplicates_dropped += 1;
            return existing;
        }
        def.footprint.width = def.footprint.width.max(1);
        def.footprint.height = def.footprint.height.max(1);
        let id = MachineTypeId(self.machines.len() as u32);
        self.machine_name_to_id.insert(def.name.clone(), id);
        self.machines.push(def);
        id
    }

    /// Register an item type. Returns its id (the existing id for a duplicate name).
    pub fn register_item(&mut self, def: ItemDef) -> ItemTypeId {
        if let Some(&existing) = self.item_name_to_id.get(&def.name) {
            tracing::warn!(name = %def.name, "duplicate item id, keeping first");
            self.duplicates_dropped += 1;
            return existing;
        }
        let id = ItemTypeId(self.items.len() as u32);
        self.item_name_to_id.insert(def.name.clone(), id);
        self.items.push(def);
        id
    }

    /// Register a recipe. Returns its id (the existing id for a duplicate name).
    pub fn register_recipe(&mut self, def: RecipeDef) -> RecipeId {
        if let Some(&existing) = self.recipe_name_to_id.get(&def.name) {
            tracing::warn!(name = %def.name, "duplicate recipe id, keeping first");
            self.duplicates_dropped += 1;
            return existing;
        }
        let id = RecipeId(self.recipes.len() as u32);
        self.recipe_name_to_id.insert(def.name.clone(), id);
        self.recipes.push(def);
        id
    }

    pub fn machine_id(&self, name: &str) -> Option<MachineTypeId> {
        self.machine_name_to_id.get(name).copied()
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    /// Number of registrations dropped as duplicates so far.
    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    /// Finalize the catalog. Every recipe must reference registered items
    /// and a registered machine type.
    pub fn build(self) -> Result<ContentCatalog, CatalogError> {
        for recipe in &self.recipes {
            if recipe.machine_type.0 as usize >= self.machines.len() {
                return Err(CatalogError::InvalidMachineRef {
                    recipe: recipe.name.clone(),
                    machine: recipe.machine_type,
                });
            }
            for entry in recipe.inputs.iter().chain(recipe.outputs.iter()) {
                if entry.item.0 as usize >= self.items.len() {
                    return Err(CatalogError::InvalidItemRef {
                        recipe: recipe.name.clone(),
                        item: entry.item,
                    });
                }
            }
        }

        let mut recipes_by_machine: HashMap<MachineTypeId, Vec<RecipeId>> = HashMap::new();
        for (index, recipe) in self.recipes.iter().enumerate() {
            recipes_by_machine
                .entry(recipe.machine_type)
                .or_default()
                .push(RecipeId(index as u32));
        }

        Ok(ContentCatalog {
            machines: self.machines,
            machine_name_to_id: self.machine_name_to_id,
            items: self.items,
            item_name_to_id: self.item_name_to_id,
            recipes: self.recipes,
            recipe_name_to_id: self.recipe_name_to_id,
            recipes_by_machine,
            default_ticks_per_move: DEFAULT_TICKS_PER_MOVE,
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable content catalog. Frozen after [`ContentCatalogBuilder::build`].
#[derive(Debug, Clone)]
pub struct ContentCatalog {
    machines: Vec<MachineDef>,
    machine_name_to_id: HashMap<String, MachineTypeId>,
    items: Vec<ItemDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    recipes_by_machine: HashMap<MachineTypeId, Vec<RecipeId>>,
    default_ticks_per_move: u32,
}

impl ContentCatalog {
    /// A catalog with no definitions.
    pub fn empty() -> Self {
        Self {
            machines: Vec::new(),
            machine_name_to_id: HashMap::new(),
            items: Vec::new(),
            item_name_to_id: HashMap::new(),
            recipes: Vec::new(),
            recipe_name_to_id: HashMap::new(),
            recipes_by_machine: HashMap::new(),
            default_ticks_per_move: DEFAULT_TICKS_PER_MOVE,
        }
    }

    /// Override the fallback used for conveyors without a usable `ticks_per_move`.
    /// Zero is ignored.
    pub fn with_default_ticks_per_move(mut self, ticks: u32) -> Self {
        if ticks > 0 {
            self.default_ticks_per_move = ticks;
        }
        self
    }

    pub fn get_machine(&self, id: MachineTypeId) -> Option<&MachineDef> {
        self.machines.get(id.0 as usize)
    }

    pub fn get_item(&self, id: ItemTypeId) -> Option<&ItemDef> {
        self.items.get(id.0 as usize)
    }

    pub fn get_recipe(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    pub fn machine_id(&self, name: &str) -> Option<MachineTypeId> {
        self.machine_name_to_id.get(name).copied()
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn default_ticks_per_move(&self) -> u32 {
        self.default_ticks_per_move
    }

    /// Footprint of a machine type; 1x1 for unknown ids.
    pub fn machine_footprint(&self, id: MachineTypeId) -> Footprint {
        self.get_machine(id)
            .map(|def| def.footprint)
            .unwrap_or_default()
    }

    /// Ticks per move of a machine type; the catalog default for unknown ids
    /// and for definitions without a positive value.
    pub fn machine_ticks_per_move(&self, id: MachineTypeId) -> u32 {
        self.get_machine(id)
            .map(|def| def.ticks_per_move_or(self.default_ticks_per_move))
            .unwrap_or(self.default_ticks_per_move)
    }

    /// Whether a machine type carries items; false for unknown ids.
    pub fn is_conveyor(&self, id: MachineTypeId) -> bool {
        self.get_machine(id).is_some_and(MachineDef::is_conveyor)
    }

    /// Machines the player may build, in registration order.
    pub fn placeable_machines(&self) -> impl Iterator<Item = (MachineTypeId, &MachineDef)> {
        self.machines
            .iter()
            .enumerate()
            .filter(|(_, def)| def.placeable)
            .map(|(i, def)| (MachineTypeId(i as u32), def))
    }

    /// Recipes that run on the given machine type, in registration order.
    pub fn recipes_for_machine(&self, id: MachineTypeId) -> &[RecipeId] {
        self.recipes_by_machine
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for ContentCatalog {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("recipe '{recipe}' references unknown item {item:?}")]
    InvalidItemRef { recipe: String, item: ItemTypeId },
    #[error("recipe '{recipe}' references unknown machine {machine:?}")]
    InvalidMachineRef {
        recipe: String,
        machine: MachineTypeId,
    },
}
