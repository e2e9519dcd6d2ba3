//! Per-tick systems.
//!
//! A [`TickSystem`] is invoked once per simulation tick with a
//! [`TickContext`]. Systems run in the order they were registered on the
//! [`Simulation`](crate::sim::Simulation); that order is part of the
//! deterministic contract.

use crate::catalog::ContentCatalog;
use crate::fixed::Ticks;
use crate::grid::IsoGrid;
use crate::yard::YardState;

/// A system that hooks into the tick pipeline.
pub trait TickSystem: std::fmt::Debug {
    /// Human-readable name, used for lookup and logging.
    fn name(&self) -> &str;

    /// Called exactly once per tick.
    fn tick(&mut self, ctx: &mut TickContext<'_>);
}

/// Context passed to systems during `tick`.
///
/// The yard is mutable; content and grid geometry are read-only.
pub struct TickContext<'a> {
    pub yard: &'a mut YardState,
    pub catalog: &'a ContentCatalog,
    pub grid: &'a IsoGrid,
    /// The tick being executed, starting at 1.
    pub tick: Ticks,
}
