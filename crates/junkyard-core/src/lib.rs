//! Junkyard Core -- the deterministic simulation engine for a grid-based
//! conveyor factory sandbox.
//!
//! Players place machines on an isometric grid; items ride conveyor machines
//! from cell to cell, one fixed fraction of a tile per tick.
//!
//! # Tick Pipeline
//!
//! Each tick granted by the [`clock::SimulationClock`] runs:
//!
//! 1. **Conveyor** -- every item, in creation order, advances along its
//!    conveyor and transfers to the next cell when allowed.
//! 2. **Systems** -- any extra [`system::TickSystem`]s, in registration order.
//! 3. **Events** -- yard changes recorded during the tick, then
//!    `TickCompleted`, are published on the [`event::EventBus`].
//!
//! # Key Types
//!
//! - [`sim::Simulation`] -- owns all state; the only object callers hold.
//! - [`yard::YardState`] -- machines, items and the cell occupancy index.
//! - [`conveyor::ConveyorSystem`] -- item movement, directional and
//!   entrance-backpressure rules.
//! - [`placement::PlacementValidator`] -- build/demolish tool state machine.
//! - [`catalog::ContentCatalog`] -- immutable machine, item and recipe
//!   definitions (frozen at startup).
//! - [`grid::IsoGrid`] -- isometric coordinate math.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic progress.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod conveyor;
pub mod event;
pub mod fixed;
pub mod grid;
pub mod id;
pub mod occupancy;
pub mod placement;
pub mod query;
pub mod sim;
pub mod system;
pub mod yard;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
