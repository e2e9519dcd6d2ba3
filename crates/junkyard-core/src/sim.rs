//! The simulation context.
//!
//! [`Simulation`] owns everything: grid geometry, the frozen content catalog,
//! the yard, the clock, the ordered list of tick systems and the event bus.
//! There is no global state; callers hold the `Simulation` and pass it where
//! it is needed.
//!
//! # Tick pipeline
//!
//! For every tick the clock grants:
//!
//! 1. Each registered [`TickSystem`] runs once, in registration order. The
//!    [`ConveyorSystem`] is always first.
//! 2. Yard events recorded during the tick are collected, followed by
//!    [`YardEvent::TickCompleted`].
//! 3. The batch is published on the [`EventBus`] in emission order.
//!
//! Placement and spawn calls made between ticks publish their events before
//! returning.

use crate::catalog::ContentCatalog;
use crate::clock::{ClockError, SimulationClock};
use crate::config::{ConfigError, SimConfig};
use crate::conveyor::ConveyorSystem;
use crate::event::{EventBus, EventKind, YardEvent};
use crate::fixed::{Fixed64, Ticks};
use crate::grid::{Direction, GridPos, IsoGrid};
use crate::id::{ItemId, ItemTypeId, MachineId, MachineTypeId};
use crate::placement::{PlacementError, PlacementOutcome, PlacementValidator};
use crate::query::{ItemSnapshot, MachineSnapshot, SimStats};
use crate::system::{TickContext, TickSystem};
use crate::yard::{ItemInstance, MachineInstance, PlaceError, YardError, YardState};
use slotmap::Key;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Results and errors
// ---------------------------------------------------------------------------

/// Result of an `update` or `step` call.
#[derive(Debug, Default)]
pub struct AdvanceResult {
    /// Number of ticks executed.
    pub ticks_run: u64,
    /// Every event published during the call, in order.
    pub events: Vec<YardEvent>,
}

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Clock(#[from] ClockError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    #[error("cell {0} is outside the grid")]
    OutOfBounds(GridPos),
    #[error("no conveyor at {0}")]
    NotAConveyor(GridPos),
    #[error("item type {0:?} is not in the catalog")]
    UnknownItem(ItemTypeId),
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of yard state for desync detection.
///
/// FNV-1a (64-bit). Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn write_cell(&mut self, cell: GridPos) {
        self.write_i32(cell.x);
        self.write_i32(cell.y);
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

pub struct Simulation {
    config: SimConfig,
    grid: IsoGrid,
    catalog: ContentCatalog,
    yard: YardState,
    clock: SimulationClock,
    conveyor: ConveyorSystem,
    systems: Vec<Box<dyn TickSystem>>,
    bus: EventBus,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("grid", &self.grid)
            .field("tick", &self.clock.current_tick())
            .field("machines", &self.yard.machine_count())
            .field("items", &self.yard.item_count())
            .field("systems", &self.systems)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Build a simulation from a validated config and a frozen catalog.
    pub fn new(config: SimConfig, catalog: ContentCatalog) -> Result<Self, SimError> {
        config.validate()?;
        let mut clock = SimulationClock::new(config.ticks_per_second)?;
        if config.start_paused {
            clock.pause();
        }
        let grid = config.grid();
        tracing::info!(
            width = grid.width,
            height = grid.height,
            tps = config.ticks_per_second,
            machines = catalog.machine_count(),
            items = catalog.item_count(),
            "simulation created"
        );
        Ok(Self {
            grid,
            catalog: catalog.with_default_ticks_per_move(config.default_ticks_per_move),
            yard: YardState::new(grid.width, grid.height),
            clock,
            conveyor: ConveyorSystem::new(),
            systems: Vec::new(),
            bus: EventBus::new(config.event_buffer_capacity),
            config,
        })
    }

    /// Append a system after the conveyor system and any added earlier.
    pub fn add_system(&mut self, system: Box<dyn TickSystem>) {
        tracing::debug!(name = system.name(), "tick system registered");
        self.systems.push(system);
    }

    /// Names of the systems in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        std::iter::once(self.conveyor.name())
            .chain(self.systems.iter().map(|s| s.name()))
            .collect()
    }

    // -- Accessors --

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &IsoGrid {
        &self.grid
    }

    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    pub fn yard(&self) -> &YardState {
        &self.yard
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn conveyor(&self) -> &ConveyorSystem {
        &self.conveyor
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Register listeners or change suppression.
    pub fn event_bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn current_tick(&self) -> Ticks {
        self.clock.current_tick()
    }

    pub fn interpolation(&self) -> f64 {
        self.clock.interpolation()
    }

    // -- Time --

    /// Feed real elapsed time and run every tick that became due.
    pub fn update(&mut self, elapsed: Duration) -> AdvanceResult {
        self.clock.accumulate(elapsed);
        let mut result = AdvanceResult::default();
        while let Some(tick) = self.clock.next_tick() {
            self.run_tick(tick, &mut result);
        }
        result
    }

    /// Run exactly one tick, ignoring the accumulator. Does nothing while paused.
    pub fn step(&mut self) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        if let Some(tick) = self.clock.manual_tick() {
            self.run_tick(tick, &mut result);
        }
        result
    }

    /// Run `n` ticks back to back. Stops early if paused.
    pub fn step_n(&mut self, n: u64) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        for _ in 0..n {
            let Some(tick) = self.clock.manual_tick() else {
                break;
            };
            self.run_tick(tick, &mut result);
        }
        result
    }

    fn run_tick(&mut self, tick: Ticks, result: &mut AdvanceResult) {
        let _span = tracing::debug_span!("tick", tick).entered();

        let mut ctx = TickContext {
            yard: &mut self.yard,
            catalog: &self.catalog,
            grid: &self.grid,
            tick,
        };
        self.conveyor.tick(&mut ctx);
        for system in &mut self.systems {
            system.tick(&mut ctx);
        }

        let mut events = self.yard.drain_events();
        events.push(YardEvent::TickCompleted { tick });
        self.bus.publish_all(&events);
        result.ticks_run += 1;
        result.events.extend(events);
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn resume(&mut self) {
        self.clock.resume();
    }

    /// Returns the new paused state.
    pub fn toggle_pause(&mut self) -> bool {
        self.clock.toggle_pause()
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    // -- Mutation between ticks --

    /// Publish events recorded outside a tick.
    fn flush(&mut self) -> Vec<YardEvent> {
        let events = self.yard.drain_events();
        self.bus.publish_all(&events);
        events
    }

    /// Place a machine with its catalog footprint rotated to `rotation`.
    /// Unknown types get a 1x1 footprint.
    pub fn place_machine(
        &mut self,
        type_id: MachineTypeId,
        origin: GridPos,
        rotation: Direction,
    ) -> Result<MachineInstance, PlaceError> {
        let footprint = self.catalog.machine_footprint(type_id).rotated(rotation);
        let placed = self.yard.place_machine(type_id, origin, rotation, footprint);
        self.flush();
        placed
    }

    pub fn remove_machine(&mut self, id: MachineId) -> Result<MachineInstance, YardError> {
        let removed = self.yard.remove_machine(id);
        self.flush();
        removed
    }

    /// Spawn an item on the conveyor at `cell`. The item takes the conveyor's
    /// heading.
    pub fn spawn_item(
        &mut self,
        type_id: ItemTypeId,
        cell: GridPos,
    ) -> Result<ItemInstance, SpawnError> {
        if !self.grid.is_valid_position(cell) {
            return Err(SpawnError::OutOfBounds(cell));
        }
        if self.catalog.get_item(type_id).is_none() {
            return Err(SpawnError::UnknownItem(type_id));
        }
        let heading = self
            .yard
            .machine_at(cell)
            .filter(|m| self.catalog.is_conveyor(m.type_id))
            .map(|m| m.rotation)
            .ok_or(SpawnError::NotAConveyor(cell))?;
        let item = self.yard.add_item(type_id, cell, heading);
        self.flush();
        Ok(item)
    }

    pub fn remove_item(&mut self, id: ItemId) -> Option<ItemInstance> {
        let removed = self.yard.remove_item(id);
        self.flush();
        removed
    }

    /// Confirm the validator's current action at `cell`.
    pub fn apply(
        &mut self,
        validator: &PlacementValidator,
        cell: GridPos,
    ) -> Result<PlacementOutcome, PlacementError> {
        let outcome = validator.confirm(cell, &mut self.yard, &self.catalog, &self.grid);
        if let Err(err) = &outcome {
            tracing::debug!(%cell, %err, "placement rejected");
        }
        self.flush();
        outcome
    }

    /// Clear the yard, zero the clock, conveyor and event counters. Content,
    /// config, added systems, listeners and the pause flag are kept.
    pub fn reset(&mut self) {
        self.yard.clear();
        self.clock.reset();
        self.conveyor = ConveyorSystem::new();
        self.bus.reset();
        tracing::info!("simulation reset");
    }

    // -- Queries --

    pub fn stats(&self) -> SimStats {
        SimStats {
            tick: self.clock.current_tick(),
            paused: self.clock.is_paused(),
            machines: self.yard.machine_count(),
            items: self.yard.item_count(),
            occupied_cells: self.yard.occupancy().cell_count(),
            interpolation: self.clock.interpolation(),
            items_spawned: self.bus.total_emitted(EventKind::ItemAdded),
            items_despawned: self.bus.total_emitted(EventKind::ItemRemoved),
        }
    }

    /// Items in creation order.
    pub fn item_snapshots(&self) -> Vec<ItemSnapshot> {
        self.yard
            .items()
            .map(|item| ItemSnapshot::new(item, self.grid.grid_to_world(item.cell)))
            .collect()
    }

    /// Machines ordered by origin cell.
    pub fn machine_snapshots(&self) -> Vec<MachineSnapshot> {
        let mut out: Vec<_> = self
            .yard
            .machines()
            .map(|m| MachineSnapshot::new(m, self.catalog.is_conveyor(m.type_id)))
            .collect();
        out.sort_by_key(|m| m.origin);
        out
    }

    /// Hash of tick, machines and items. Two simulations fed the same
    /// inputs produce the same hash.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.clock.current_tick());

        let mut machines: Vec<_> = self.yard.machines().collect();
        machines.sort_by_key(|m| m.origin);
        h.write_u64(machines.len() as u64);
        for m in machines {
            h.write_u32(m.type_id.0);
            h.write_cell(m.origin);
            h.write_u32(u32::from(m.rotation.degrees()));
            h.write_u32(m.footprint.width);
            h.write_u32(m.footprint.height);
        }

        h.write_u64(self.yard.item_count() as u64);
        for item in self.yard.items() {
            h.write_u64(item.id.data().as_ffi());
            h.write_u32(item.type_id.0);
            h.write_cell(item.cell);
            h.write_fixed64(item.progress);
            h.write_u32(u32::from(item.direction.degrees()));
        }
        h.finish()
    }
}
