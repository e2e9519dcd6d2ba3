//! Read-only snapshots for rendering and UI.
//!
//! All types are owned copies with no references into the yard, so a
//! renderer can hold them across ticks.

use crate::fixed::{fixed64_to_f64, Ticks};
use crate::grid::{Direction, Footprint, GridPos};
use crate::id::{ItemId, ItemTypeId, MachineId, MachineTypeId};
use crate::yard::{ItemInstance, MachineInstance};
use glam::Vec2;

/// An item as a renderer needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub type_id: ItemTypeId,
    pub cell: GridPos,
    /// Progress across the cell as a float, for display only.
    pub progress: f64,
    pub direction: Direction,
    /// World position of the cell center.
    pub world: Vec2,
}

impl ItemSnapshot {
    pub(crate) fn new(item: &ItemInstance, world: Vec2) -> Self {
        Self {
            id: item.id,
            type_id: item.type_id,
            cell: item.cell,
            progress: fixed64_to_f64(item.progress),
            direction: item.direction,
            world,
        }
    }
}

/// A placed machine with its resolved class.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineSnapshot {
    pub id: MachineId,
    pub type_id: MachineTypeId,
    pub origin: GridPos,
    pub rotation: Direction,
    pub footprint: Footprint,
    pub is_conveyor: bool,
}

impl MachineSnapshot {
    pub(crate) fn new(machine: &MachineInstance, is_conveyor: bool) -> Self {
        Self {
            id: machine.id,
            type_id: machine.type_id,
            origin: machine.origin,
            rotation: machine.rotation,
            footprint: machine.footprint,
            is_conveyor,
        }
    }
}

/// Aggregate counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimStats {
    pub tick: Ticks,
    pub paused: bool,
    pub machines: usize,
    pub items: usize,
    pub occupied_cells: usize,
    /// Fraction of the next tick already accumulated.
    pub interpolation: f64,
    pub items_spawned: u64,
    pub items_despawned: u64,
}
