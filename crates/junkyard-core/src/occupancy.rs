//! Cell-to-machine occupancy index.
//!
//! Every cell of a placed machine's footprint maps to that machine's id, and
//! a cell maps to at most one id. `occupy` and `clear` touch the whole
//! footprint or nothing, so a partially placed machine is never observable.

use crate::grid::{Footprint, GridPos};
use crate::id::MachineId;
use std::collections::BTreeMap;

/// Why a footprint could not be occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OccupancyError {
    #[error("footprint extends outside the grid at {0}")]
    OutOfBounds(GridPos),
    #[error("cell {0} is already occupied")]
    Occupied(GridPos),
}

/// Maps grid cells to the machine occupying them.
#[derive(Debug, Clone, Default)]
pub struct OccupancyIndex {
    width: u32,
    height: u32,
    cells: BTreeMap<GridPos, MachineId>,
}

impl OccupancyIndex {
    /// An empty index over a `width` x `height` grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: BTreeMap::new(),
        }
    }

    fn in_bounds(&self, cell: GridPos) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    /// First cell that prevents placing `footprint` at `origin`, if any.
    pub fn check(&self, origin: GridPos, footprint: Footprint) -> Result<(), OccupancyError> {
        for cell in footprint.cells(origin) {
            if !self.in_bounds(cell) {
                return Err(OccupancyError::OutOfBounds(cell));
            }
            if self.cells.contains_key(&cell) {
                return Err(OccupancyError::Occupied(cell));
            }
        }
        Ok(())
    }

    /// True iff every cell of the footprint is in bounds and unoccupied.
    pub fn can_place(&self, origin: GridPos, footprint: Footprint) -> bool {
        self.check(origin, footprint).is_ok()
    }

    /// Map every cell of the footprint to `id`. Fails without touching the
    /// index if any cell is out of bounds or taken.
    pub fn occupy(
        &mut self,
        origin: GridPos,
        footprint: Footprint,
        id: MachineId,
    ) -> Result<(), OccupancyError> {
        self.check(origin, footprint)?;
        for cell in footprint.cells(origin) {
            self.cells.insert(cell, id);
        }
        Ok(())
    }

    /// Unmap every cell of the footprint. Returns how many cells were freed.
    pub fn clear(&mut self, origin: GridPos, footprint: Footprint) -> usize {
        footprint
            .cells(origin)
            .filter(|cell| self.cells.remove(cell).is_some())
            .count()
    }

    pub fn machine_at(&self, cell: GridPos) -> Option<MachineId> {
        self.cells.get(&cell).copied()
    }

    pub fn is_occupied(&self, cell: GridPos) -> bool {
        self.cells.contains_key(&cell)
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Occupied cells in row-major order with their machine.
    pub fn iter(&self) -> impl Iterator<Item = (GridPos, MachineId)> + '_ {
        self.cells.iter().map(|(&cell, &id)| (cell, id))
    }

    /// Remove every mapping. Bounds are kept.
    pub fn reset(&mut self) {
        self.cells.clear();
    }
}
