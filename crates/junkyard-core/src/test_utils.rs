//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::catalog::{
    ContentCatalog, ContentCatalogBuilder, ItemDef, MachineClass, MachineDef, RecipeDef,
    RecipeEntry,
};
use crate::config::SimConfig;
use crate::fixed::Fixed64;
use crate::grid::{Direction, Footprint, GridPos};
use crate::id::{ItemTypeId, MachineTypeId};
use crate::sim::Simulation;
use crate::yard::MachineInstance;

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Content
// ===========================================================================

/// Names registered by [`test_catalog`].
pub const CONVEYOR: &str = "conveyor";
pub const FAST_CONVEYOR: &str = "fast_conveyor";
pub const CRUSHER: &str = "crusher";
pub const CRATE: &str = "crate";
pub const SCRAP_FERROUS: &str = "scrap_ferrous";
pub const SCRAP_COPPER: &str = "scrap_copper";
pub const IRON_CHUNK: &str = "iron_chunk";

/// A small catalog: two conveyor speeds, a 2x2 crusher, a storage crate and
/// three items.
pub fn test_catalog() -> ContentCatalog {
    let mut b = ContentCatalogBuilder::new();

    let ferrous = b.register_item(ItemDef {
        category: "scrap".to_string(),
        sell_price: 2,
        color: Some("#8a8a8a".to_string()),
        ..ItemDef::new(SCRAP_FERROUS)
    });
    b.register_item(ItemDef {
        category: "scrap".to_string(),
        sell_price: 3,
        color: Some("#b87333".to_string()),
        ..ItemDef::new(SCRAP_COPPER)
    });
    let chunk = b.register_item(ItemDef {
        category: "material".to_string(),
        sell_price: 5,
        ..ItemDef::new(IRON_CHUNK)
    });

    b.register_machine(MachineDef {
        cost: 1,
        ..MachineDef::conveyor(CONVEYOR, 4)
    });
    b.register_machine(MachineDef {
        cost: 3,
        ..MachineDef::conveyor(FAST_CONVEYOR, 2)
    });
    let crusher = b.register_machine(MachineDef {
        cost: 25,
        processing_ticks: 40,
        input_slots: 1,
        output_slots: 1,
        ..MachineDef::new(CRUSHER, MachineClass::Processor).with_footprint(Footprint::new(2, 2))
    });
    b.register_machine(MachineDef {
        cost: 10,
        storage_capacity: 50,
        ..MachineDef::new(CRATE, MachineClass::Storage)
    });

    b.register_recipe(RecipeDef {
        name: "crush_ferrous".to_string(),
        machine_type: crusher,
        inputs: vec![RecipeEntry {
            item: ferrous,
            count: 2,
        }],
        outputs: vec![RecipeEntry {
            item: chunk,
            count: 1,
        }],
        processing_ticks: 40,
    });

    match b.build() {
        Ok(catalog) => catalog,
        Err(err) => panic!("test catalog is invalid: {err}"),
    }
}

/// A 16x16 simulation at 20 ticks per second over [`test_catalog`].
pub fn test_sim() -> Simulation {
    let config = SimConfig {
        grid_width: 16,
        grid_height: 16,
        ..SimConfig::default()
    };
    match Simulation::new(config, test_catalog()) {
        Ok(sim) => sim,
        Err(err) => panic!("test config is invalid: {err}"),
    }
}

fn machine_type(sim: &Simulation, name: &str) -> MachineTypeId {
    match sim.catalog().machine_id(name) {
        Some(id) => id,
        None => panic!("machine '{name}' not registered"),
    }
}

fn item_type(sim: &Simulation, name: &str) -> ItemTypeId {
    match sim.catalog().item_id(name) {
        Some(id) => id,
        None => panic!("item '{name}' not registered"),
    }
}

pub fn belt_type(sim: &Simulation) -> MachineTypeId {
    machine_type(sim, CONVEYOR)
}

pub fn fast_belt_type(sim: &Simulation) -> MachineTypeId {
    machine_type(sim, FAST_CONVEYOR)
}

pub fn crusher_type(sim: &Simulation) -> MachineTypeId {
    machine_type(sim, CRUSHER)
}

pub fn crate_type(sim: &Simulation) -> MachineTypeId {
    machine_type(sim, CRATE)
}

pub fn scrap_type(sim: &Simulation) -> ItemTypeId {
    item_type(sim, SCRAP_FERROUS)
}

// ===========================================================================
// Layouts
// ===========================================================================

/// Place `len` standard conveyors starting at `start`, each facing `dir`
/// and each one step further along `dir`.
pub fn conveyor_line(
    sim: &mut Simulation,
    start: GridPos,
    len: u32,
    dir: Direction,
) -> Vec<MachineInstance> {
    let belt = belt_type(sim);
    let mut cell = start;
    let mut placed = Vec::with_capacity(len as usize);
    for _ in 0..len {
        match sim.place_machine(belt, cell, dir) {
            Ok(m) => placed.push(m),
            Err(err) => panic!("conveyor at {cell} failed: {err}"),
        }
        cell = cell.step(dir);
    }
    placed
}

/// A closed rectangular loop of conveyors, `side` cells per side, with its
/// lower-left corner at `origin`. Items on it circulate forever.
pub fn conveyor_loop(sim: &mut Simulation, origin: GridPos, side: u32) -> Vec<MachineInstance> {
    assert!(side >= 2, "loop needs at least 2 cells per side");
    let run = side - 1;
    let mut placed = Vec::new();
    let mut cell = origin;
    for dir in [
        Direction::East,
        Direction::North,
        Direction::West,
        Direction::South,
    ] {
        placed.extend(conveyor_line(sim, cell, run, dir));
        for _ in 0..run {
            cell = cell.step(dir);
        }
    }
    placed
}
