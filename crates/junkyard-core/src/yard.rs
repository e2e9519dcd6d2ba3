//! The yard: every placed machine, every item in flight, and the occupancy
//! index that ties machines to cells.
//!
//! [`YardState`] is the only place simulation state is mutated. Each
//! mutation records a [`YardEvent`]; the owner drains them with
//! [`YardState::drain_events`] and decides how to publish them.

use crate::event::{RemovalReason, YardEvent};
use crate::fixed::Fixed64;
use crate::grid::{Direction, Footprint, GridPos};
use crate::id::{ItemId, ItemTypeId, MachineId, MachineTypeId};
use crate::occupancy::{OccupancyError, OccupancyIndex};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Instances
// ---------------------------------------------------------------------------

/// A machine placed on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineInstance {
    pub id: MachineId,
    pub type_id: MachineTypeId,
    /// Origin cell of the footprint (lowest x and y).
    pub origin: GridPos,
    pub rotation: Direction,
    /// Cells actually covered, already rotated.
    pub footprint: Footprint,
}

impl MachineInstance {
    pub fn cells(&self) -> impl Iterator<Item = GridPos> + use<> {
        self.footprint.cells(self.origin)
    }
}

/// An item riding the conveyors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInstance {
    pub id: ItemId,
    pub type_id: ItemTypeId,
    pub cell: GridPos,
    /// Fraction of the current cell crossed, in `[0, 1]`. Exactly 1 only
    /// while waiting at the far edge.
    pub progress: Fixed64,
    /// Heading; mirrors the conveyor the item rides.
    pub direction: Direction,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a machine could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlaceError {
    #[error("footprint leaves the grid at {0}")]
    OutOfBounds(GridPos),
    #[error("cell {cell} is occupied by {by:?}")]
    Occupied { cell: GridPos, by: MachineId },
    #[error("footprint {0:?} covers no cells")]
    EmptyFootprint(Footprint),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum YardError {
    #[error("machine {0:?} does not exist")]
    UnknownMachine(MachineId),
}

// ---------------------------------------------------------------------------
// YardState
// ---------------------------------------------------------------------------

/// Aggregate root for machines, items and cell occupancy.
#[derive(Debug, Clone, Default)]
pub struct YardState {
    machines: SlotMap<MachineId, MachineInstance>,
    items: SlotMap<ItemId, ItemInstance>,
    /// Live items in creation order.
    item_order: Vec<ItemId>,
    items_by_cell: BTreeMap<GridPos, Vec<ItemId>>,
    occupancy: OccupancyIndex,
    pending: Vec<YardEvent>,
}

impl YardState {
    /// An empty yard over a `width` x `height` grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            occupancy: OccupancyIndex::new(width, height),
            ..Self::default()
        }
    }

    // -- Machines --

    /// Place a machine covering `footprint` cells from `origin`. Nothing is
    /// mutated on failure, and a footprint with no cells is refused.
    pub fn place_machine(
        &mut self,
        type_id: MachineTypeId,
        origin: GridPos,
        rotation: Direction,
        footprint: Footprint,
    ) -> Result<MachineInstance, PlaceError> {
        let checked = if footprint.width == 0 || footprint.height == 0 {
            Err(PlaceError::EmptyFootprint(footprint))
        } else {
            self.occupancy
                .check(origin, footprint)
                .map_err(|err| self.place_error(err))
        };
        if let Err(err) = checked {
            tracing::warn!(?type_id, %origin, %err, "machine placement rejected");
            return Err(err);
        }

        let id = self.machines.insert_with_key(|id| MachineInstance {
            id,
            type_id,
            origin,
            rotation,
            footprint,
        });
        if let Err(err) = self.occupancy.occupy(origin, footprint, id) {
            self.machines.remove(id);
            return Err(self.place_error(err));
        }

        let machine = self.machines[id];
        tracing::debug!(?id, ?type_id, %origin, ?rotation, "machine placed");
        self.pending.push(YardEvent::MachinePlaced { machine });
        Ok(machine)
    }

    pub(crate) fn place_error(&self, err: OccupancyError) -> PlaceError {
        match err {
            OccupancyError::OutOfBounds(cell) => PlaceError::OutOfBounds(cell),
            OccupancyError::Occupied(cell) => match self.occupancy.machine_at(cell) {
                Some(by) => PlaceError::Occupied { cell, by },
                None => PlaceError::OutOfBounds(cell),
            },
        }
    }

    /// Remove a machine and free its footprint. Items on its cells stay
    /// where they are.
    pub fn remove_machine(&mut self, id: MachineId) -> Result<MachineInstance, YardError> {
        let Some(machine) = self.machines.remove(id) else {
            tracing::warn!(?id, "remove of unknown machine");
            return Err(YardError::UnknownMachine(id));
        };
        self.occupancy.clear(machine.origin, machine.footprint);
        tracing::debug!(?id, origin = %machine.origin, "machine removed");
        self.pending.push(YardEvent::MachineRemoved { machine });
        Ok(machine)
    }

    pub fn machine(&self, id: MachineId) -> Option<&MachineInstance> {
        self.machines.get(id)
    }

    /// The machine covering `cell`, if any.
    pub fn machine_at(&self, cell: GridPos) -> Option<&MachineInstance> {
        self.occupancy
            .machine_at(cell)
            .and_then(|id| self.machines.get(id))
    }

    pub fn machines(&self) -> impl Iterator<Item = &MachineInstance> + '_ {
        self.machines.values()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    pub fn is_occupied(&self, cell: GridPos) -> bool {
        self.occupancy.is_occupied(cell)
    }

    pub fn occupancy(&self) -> &OccupancyIndex {
        &self.occupancy
    }

    // -- Items --

    /// Create an item at `cell` with zero progress. Unconditional: callers
    /// decide whether the cell is a sensible spawn point.
    pub fn add_item(
        &mut self,
        type_id: ItemTypeId,
        cell: GridPos,
        direction: Direction,
    ) -> ItemInstance {
        let id = self.items.insert_with_key(|id| ItemInstance {
            id,
            type_id,
            cell,
            progress: Fixed64::ZERO,
            direction,
        });
        self.item_order.push(id);
        self.items_by_cell.entry(cell).or_default().push(id);

        let item = self.items[id];
        tracing::debug!(?id, ?type_id, %cell, "item added");
        self.pending.push(YardEvent::ItemAdded { item });
        item
    }

    /// Remove an item. `None` if it is already gone.
    pub fn remove_item(&mut self, id: ItemId) -> Option<ItemInstance> {
        self.despawn(id, RemovalReason::Removed)
    }

    pub(crate) fn despawn(&mut self, id: ItemId, reason: RemovalReason) -> Option<ItemInstance> {
        let item = self.items.remove(id)?;
        self.item_order.retain(|&other| other != id);
        self.unindex(id, item.cell);
        tracing::debug!(?id, cell = %item.cell, ?reason, "item removed");
        self.pending.push(YardEvent::ItemRemoved { item, reason });
        Some(item)
    }

    /// Remove a batch of items with one pass over the creation order.
    pub(crate) fn despawn_all(&mut self, removals: &[(ItemId, RemovalReason)]) {
        if removals.is_empty() {
            return;
        }
        for &(id, reason) in removals {
            let Some(item) = self.items.remove(id) else {
                continue;
            };
            self.unindex(id, item.cell);
            tracing::debug!(?id, cell = %item.cell, ?reason, "item removed");
            self.pending.push(YardEvent::ItemRemoved { item, reason });
        }
        let items = &self.items;
        self.item_order.retain(|&id| items.contains_key(id));
    }

    fn unindex(&mut self, id: ItemId, cell: GridPos) {
        if let Some(ids) = self.items_by_cell.get_mut(&cell) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.items_by_cell.remove(&cell);
            }
        }
    }

    /// Set heading and progress without changing cells.
    pub(crate) fn set_item_motion(&mut self, id: ItemId, direction: Direction, progress: Fixed64) {
        if let Some(item) = self.items.get_mut(id) {
            item.direction = direction;
            item.progress = progress;
        }
    }

    /// Move an item into `to` with zero progress.
    pub(crate) fn transfer_item(&mut self, id: ItemId, to: GridPos) {
        let Some(item) = self.items.get_mut(id) else {
            return;
        };
        let from = item.cell;
        item.cell = to;
        item.progress = Fixed64::ZERO;
        self.unindex(id, from);
        self.items_by_cell.entry(to).or_default().push(id);
        tracing::trace!(?id, %from, %to, "item transferred");
    }

    pub fn item(&self, id: ItemId) -> Option<&ItemInstance> {
        self.items.get(id)
    }

    /// Items currently located in `cell`, in arrival order.
    pub fn items_at(&self, cell: GridPos) -> impl Iterator<Item = &ItemInstance> + '_ {
        self.items_by_cell
            .get(&cell)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.items.get(id))
    }

    /// Live items in creation order.
    pub fn items(&self) -> impl Iterator<Item = &ItemInstance> + '_ {
        self.item_order.iter().filter_map(|&id| self.items.get(id))
    }

    /// Live item ids in creation order.
    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_order
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    // -- Events --

    /// Take the events recorded since the last drain, in emission order.
    pub fn drain_events(&mut self) -> Vec<YardEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending_event_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop every machine, item and pending event without recording removals.
    pub fn clear(&mut self) {
        self.machines.clear();
        self.items.clear();
        self.item_order.clear();
        self.items_by_cell.clear();
        self.occupancy.reset();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yard() -> YardState {
        YardState::new(8, 8)
    }

    const BELT: MachineTypeId = MachineTypeId(0);
    const SCRAP: ItemTypeId = ItemTypeId(0);

    #[test]
    fn place_occupies_footprint() {
        let mut yard = yard();
        let m = yard
            .place_machine(BELT, GridPos::new(2, 2), Direction::East, Footprint::new(2, 2))
            .unwrap();
        for cell in m.cells() {
            assert_eq!(yard.machine_at(cell).map(|x| x.id), Some(m.id));
        }
        assert!(yard.machine_at(GridPos::new(4, 2)).is_none());
        assert_eq!(yard.machine_count(), 1);
    }

    #[test]
    fn failed_place_does_not_mutate() {
        let mut yard = yard();
        let first = yard
            .place_machine(BELT, GridPos::new(1, 1), Direction::East, Footprint::single())
            .unwrap();
        yard.drain_events();

        let err = yard
            .place_machine(BELT, GridPos::new(0, 0), Direction::East, Footprint::new(2, 2))
            .unwrap_err();
        assert_eq!(
            err,
            PlaceError::Occupied {
                cell: GridPos::new(1, 1),
                by: first.id
            }
        );
        assert_eq!(yard.machine_count(), 1);
        assert!(!yard.is_occupied(GridPos::new(0, 0)));
        assert_eq!(yard.pending_event_count(), 0);

        assert!(matches!(
            yard.place_machine(BELT, GridPos::new(7, 7), Direction::East, Footprint::new(2, 1)),
            Err(PlaceError::OutOfBounds(_))
        ));
    }

    #[test]
    fn empty_footprint_is_refused() {
        let mut yard = yard();
        for footprint in [Footprint::new(0, 0), Footprint::new(0, 3), Footprint::new(2, 0)] {
            assert_eq!(
                yard.place_machine(BELT, GridPos::new(1, 1), Direction::East, footprint),
                Err(PlaceError::EmptyFootprint(footprint))
            );
        }
        assert_eq!(yard.machine_count(), 0);
        assert_eq!(yard.occupancy().cell_count(), 0);
        assert_eq!(yard.pending_event_count(), 0);
    }

    #[test]
    fn remove_frees_cells_and_stales_handle() {
        let mut yard = yard();
        let m = yard
            .place_machine(BELT, GridPos::new(0, 0), Direction::East, Footprint::new(1, 2))
            .unwrap();
        let removed = yard.remove_machine(m.id).unwrap();
        assert_eq!(removed, m);
        assert!(!yard.is_occupied(GridPos::new(0, 0)));
        assert!(!yard.is_occupied(GridPos::new(0, 1)));
        assert_eq!(
            yard.remove_machine(m.id),
            Err(YardError::UnknownMachine(m.id))
        );
    }

    #[test]
    fn items_indexed_by_cell() {
        let mut yard = yard();
        let a = yard.add_item(SCRAP, GridPos::new(0, 0), Direction::East);
        let b = yard.add_item(SCRAP, GridPos::new(0, 0), Direction::East);
        yard.add_item(SCRAP, GridPos::new(3, 0), Direction::East);

        let here: Vec<_> = yard.items_at(GridPos::new(0, 0)).map(|i| i.id).collect();
        assert_eq!(here, vec![a.id, b.id]);

        yard.transfer_item(a.id, GridPos::new(1, 0));
        let here: Vec<_> = yard.items_at(GridPos::new(0, 0)).map(|i| i.id).collect();
        assert_eq!(here, vec![b.id]);
        assert_eq!(yard.items_at(GridPos::new(1, 0)).count(), 1);
        assert_eq!(yard.item(a.id).unwrap().progress, Fixed64::ZERO);
    }

    #[test]
    fn items_iterate_in_creation_order() {
        let mut yard = yard();
        let ids: Vec<_> = (0..5)
            .map(|x| yard.add_item(SCRAP, GridPos::new(x, 0), Direction::East).id)
            .collect();
        yard.remove_item(ids[1]);
        let live: Vec<_> = yard.items().map(|i| i.id).collect();
        assert_eq!(live, vec![ids[0], ids[2], ids[3], ids[4]]);
        assert_eq!(yard.item_ids(), live.as_slice());
    }

    #[test]
    fn remove_item_twice_is_none() {
        let mut yard = yard();
        let item = yard.add_item(SCRAP, GridPos::new(0, 0), Direction::East);
        assert!(yard.remove_item(item.id).is_some());
        assert!(yard.remove_item(item.id).is_none());
        assert_eq!(yard.item_count(), 0);
        assert_eq!(yard.items_at(GridPos::new(0, 0)).count(), 0);
    }

    #[test]
    fn events_in_emission_order() {
        let mut yard = yard();
        let m = yard
            .place_machine(BELT, GridPos::new(0, 0), Direction::East, Footprint::single())
            .unwrap();
        let item = yard.add_item(SCRAP, GridPos::new(0, 0), Direction::East);
        yard.remove_item(item.id);
        yard.remove_machine(m.id).unwrap();

        let events = yard.drain_events();
        assert_eq!(
            events,
            vec![
                YardEvent::MachinePlaced { machine: m },
                YardEvent::ItemAdded { item },
                YardEvent::ItemRemoved {
                    item,
                    reason: RemovalReason::Removed
                },
                YardEvent::MachineRemoved { machine: m },
            ]
        );
        assert!(yard.drain_events().is_empty());
    }

    #[test]
    fn batch_despawn_keeps_order_of_survivors() {
        let mut yard = yard();
        let ids: Vec<_> = (0..4)
            .map(|x| yard.add_item(SCRAP, GridPos::new(x, 0), Direction::East).id)
            .collect();
        yard.drain_events();
        yard.despawn_all(&[
            (ids[2], RemovalReason::DeadEnd),
            (ids[0], RemovalReason::OffConveyor),
        ]);
        assert_eq!(yard.item_ids(), &[ids[1], ids[3]]);
        assert_eq!(yard.drain_events().len(), 2);
    }

    #[test]
    fn clear_empties_everything() {
        let mut yard = yard();
        yard.place_machine(BELT, GridPos::new(0, 0), Direction::East, Footprint::single())
            .unwrap();
        yard.add_item(SCRAP, GridPos::new(0, 0), Direction::East);
        yard.clear();
        assert_eq!(yard.machine_count(), 0);
        assert_eq!(yard.item_count(), 0);
        assert!(!yard.is_occupied(GridPos::new(0, 0)));
        assert_eq!(yard.pending_event_count(), 0);
    }
}
