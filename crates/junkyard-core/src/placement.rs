//! Build and demolish rules.
//!
//! [`PlacementValidator`] tracks the player's current tool (nothing, build a
//! machine type, demolish) and the build rotation. Its `can_*` queries are
//! pure and safe to call every frame for previews; only
//! [`PlacementValidator::confirm`] touches the yard.

use crate::catalog::ContentCatalog;
use crate::grid::{Direction, Footprint, GridPos, IsoGrid};
use crate::id::MachineTypeId;
use crate::yard::{MachineInstance, PlaceError, YardState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlacementMode {
    #[default]
    None,
    Build,
    Demolish,
}

/// The action a confirm would perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementAction {
    Build {
        type_id: MachineTypeId,
        rotation: Direction,
    },
    Demolish,
}

/// What a successful confirm did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    Built(MachineInstance),
    Demolished(MachineInstance),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("no build or demolish tool is active")]
    NoActiveMode,
    #[error("machine type {0:?} is not in the catalog")]
    UnknownType(MachineTypeId),
    #[error("machine type {0:?} cannot be built")]
    NotPlaceable(MachineTypeId),
    #[error("cannot build at {cell}: {source}")]
    InvalidFootprint {
        cell: GridPos,
        #[source]
        source: PlaceError,
    },
    #[error("cell {0} is outside the grid")]
    OutOfBounds(GridPos),
    #[error("no machine at {0}")]
    NothingToDemolish(GridPos),
}

/// Build/demolish tool state machine.
#[derive(Debug, Clone, Default)]
pub struct PlacementValidator {
    mode: PlacementMode,
    selected: Option<MachineTypeId>,
    rotation: Direction,
}

impl PlacementValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> PlacementMode {
        self.mode
    }

    pub fn selected_type(&self) -> Option<MachineTypeId> {
        self.selected
    }

    pub fn rotation(&self) -> Direction {
        self.rotation
    }

    /// Select a machine type to build. Rotation resets to 0°.
    pub fn enter_build(&mut self, type_id: MachineTypeId) {
        self.mode = PlacementMode::Build;
        self.selected = Some(type_id);
        self.rotation = Direction::East;
        tracing::debug!(?type_id, "build mode");
    }

    pub fn enter_demolish(&mut self) {
        self.mode = PlacementMode::Demolish;
        self.selected = None;
        tracing::debug!("demolish mode");
    }

    pub fn cancel(&mut self) {
        self.mode = PlacementMode::None;
        self.selected = None;
    }

    /// Turn the build rotation 90°. Ignored outside build mode.
    pub fn rotate(&mut self) {
        if self.mode == PlacementMode::Build {
            self.rotation = self.rotation.rotate_cw();
        }
    }

    /// The action a confirm would attempt right now.
    pub fn action(&self) -> Option<PlacementAction> {
        match self.mode {
            PlacementMode::None => None,
            PlacementMode::Build => self.selected.map(|type_id| PlacementAction::Build {
                type_id,
                rotation: self.rotation,
            }),
            PlacementMode::Demolish => Some(PlacementAction::Demolish),
        }
    }

    /// Footprint of the selected type under the current rotation.
    pub fn build_footprint(&self, catalog: &ContentCatalog) -> Option<Footprint> {
        let def = catalog.get_machine(self.selected?)?;
        Some(def.footprint.rotated(self.rotation))
    }

    fn check_build(
        &self,
        cell: GridPos,
        yard: &YardState,
        catalog: &ContentCatalog,
        grid: &IsoGrid,
    ) -> Result<(MachineTypeId, Footprint), PlacementError> {
        let type_id = match self.action() {
            Some(PlacementAction::Build { type_id, .. }) => type_id,
            _ => return Err(PlacementError::NoActiveMode),
        };
        if !grid.is_valid_position(cell) {
            return Err(PlacementError::OutOfBounds(cell));
        }
        let def = catalog
            .get_machine(type_id)
            .ok_or(PlacementError::UnknownType(type_id))?;
        if !def.placeable {
            return Err(PlacementError::NotPlaceable(type_id));
        }
        let footprint = def.footprint.rotated(self.rotation);
        if let Err(err) = yard.occupancy().check(cell, footprint) {
            let source = yard.place_error(err);
            return Err(PlacementError::InvalidFootprint { cell, source });
        }
        Ok((type_id, footprint))
    }

    /// In build mode with a known, placeable type whose rotated footprint
    /// fits at `cell`.
    pub fn can_build_at(
        &self,
        cell: GridPos,
        yard: &YardState,
        catalog: &ContentCatalog,
        grid: &IsoGrid,
    ) -> bool {
        self.check_build(cell, yard, catalog, grid).is_ok()
    }

    /// In demolish mode with a machine at `cell`.
    pub fn can_demolish_at(&self, cell: GridPos, yard: &YardState) -> bool {
        self.mode == PlacementMode::Demolish && yard.machine_at(cell).is_some()
    }

    /// Perform the current tool's action at `cell`.
    pub fn confirm(
        &self,
        cell: GridPos,
        yard: &mut YardState,
        catalog: &ContentCatalog,
        grid: &IsoGrid,
    ) -> Result<PlacementOutcome, PlacementError> {
        match self.mode {
            PlacementMode::None => Err(PlacementError::NoActiveMode),
            PlacementMode::Build => {
                let (type_id, footprint) = self.check_build(cell, yard, catalog, grid)?;
                yard.place_machine(type_id, cell, self.rotation, footprint)
                    .map(PlacementOutcome::Built)
                    .map_err(|source| PlacementError::InvalidFootprint { cell, source })
            }
            PlacementMode::Demolish => {
                let id = yard
                    .machine_at(cell)
                    .map(|m| m.id)
                    .ok_or(PlacementError::NothingToDemolish(cell))?;
                yard.remove_machine(id)
                    .map(PlacementOutcome::Demolished)
                    .map_err(|_| PlacementError::NothingToDemolish(cell))
            }
        }
    }
}
