//! Conveyor movement.
//!
//! Every tick, each item in creation order:
//!
//! 1. is despawned if its cell does not hold a conveyor;
//! 2. takes the conveyor's heading;
//! 3. advances by `1 / ticks_per_move`;
//! 4. on reaching the far edge, moves into the next cell if that cell holds a
//!    conveyor that does not face back at it and whose entrance half is free,
//!    otherwise waits at progress 1 (or is despawned when the next cell is
//!    empty ground).
//!
//! Despawns are applied after every item has been evaluated.

use crate::catalog::ContentCatalog;
use crate::event::RemovalReason;
use crate::fixed::{progress_step, Fixed64, HALF};
use crate::grid::{Direction, GridPos};
use crate::id::ItemId;
use crate::system::{TickContext, TickSystem};
use crate::yard::YardState;

/// What happened to items during one conveyor pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConveyorTickStats {
    /// Items still mid-tile after advancing.
    pub advanced: u32,
    pub transferred: u32,
    /// Items waiting at a tile edge.
    pub blocked: u32,
    pub despawned: u32,
}

/// Outcome of trying to leave a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Transfer,
    Wait,
    DeadEnd,
}

/// Moves items along conveyors.
#[derive(Debug, Default)]
pub struct ConveyorSystem {
    last_tick: ConveyorTickStats,
    totals: ConveyorTickStats,
}

impl ConveyorSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts from the most recent tick.
    pub fn last_tick(&self) -> ConveyorTickStats {
        self.last_tick
    }

    /// Counts accumulated since construction.
    pub fn totals(&self) -> ConveyorTickStats {
        self.totals
    }

    /// Run one conveyor pass over the yard.
    pub fn run(&mut self, yard: &mut YardState, catalog: &ContentCatalog) -> ConveyorTickStats {
        let mut stats = ConveyorTickStats::default();
        let order: Vec<ItemId> = yard.item_ids().to_vec();
        let mut removals: Vec<(ItemId, RemovalReason)> = Vec::new();

        for id in order {
            let Some(item) = yard.item(id).copied() else {
                continue;
            };

            let conveyor = yard
                .machine_at(item.cell)
                .filter(|m| catalog.is_conveyor(m.type_id))
                .copied();
            let Some(conveyor) = conveyor else {
                removals.push((id, RemovalReason::OffConveyor));
                stats.despawned += 1;
                continue;
            };

            let heading = conveyor.rotation;
            let step = progress_step(catalog.machine_ticks_per_move(conveyor.type_id));
            let progress = item.progress.saturating_add(step);
            if progress < Fixed64::ONE {
                yard.set_item_motion(id, heading, progress);
                stats.advanced += 1;
                continue;
            }

            let target = item.cell.step(heading);
            match exit(yard, catalog, target, heading) {
                Exit::Transfer => {
                    yard.set_item_motion(id, heading, Fixed64::ZERO);
                    yard.transfer_item(id, target);
                    stats.transferred += 1;
                }
                Exit::Wait => {
                    yard.set_item_motion(id, heading, Fixed64::ONE);
                    stats.blocked += 1;
                }
                Exit::DeadEnd => {
                    yard.set_item_motion(id, heading, Fixed64::ONE);
                    removals.push((id, RemovalReason::DeadEnd));
                    stats.despawned += 1;
                }
            }
        }

        yard.despawn_all(&removals);

        self.last_tick = stats;
        self.totals.advanced += stats.advanced;
        self.totals.transferred += stats.transferred;
        self.totals.blocked += stats.blocked;
        self.totals.despawned += stats.despawned;
        stats
    }
}

/// Decide whether an item heading `heading` may enter `target`.
fn exit(yard: &YardState, catalog: &ContentCatalog, target: GridPos, heading: Direction) -> Exit {
    let Some(machine) = yard.machine_at(target) else {
        return Exit::DeadEnd;
    };
    if !catalog.is_conveyor(machine.type_id) {
        return Exit::Wait;
    }
    if machine.rotation == heading.opposite() {
        return Exit::Wait;
    }
    // Only one item at a time may occupy the entrance half of a cell.
    if yard.items_at(target).any(|other| other.progress < HALF) {
        return Exit::Wait;
    }
    Exit::Transfer
}

impl TickSystem for ConveyorSystem {
    fn name(&self) -> &str {
        "conveyor"
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        let stats = self.run(ctx.yard, ctx.catalog);
        tracing::trace!(
            tick = ctx.tick,
            transferred = stats.transferred,
            blocked = stats.blocked,
            despawned = stats.despawned,
            "conveyor pass"
        );
    }
}
