//! Simulation configuration.

use crate::catalog::DEFAULT_TICKS_PER_MOVE;
use crate::clock::MAX_TICKS_PER_SECOND;
use crate::grid::IsoGrid;
use serde::{Deserialize, Serialize};

/// Startup configuration for a [`Simulation`](crate::sim::Simulation).
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Grid width in cells.
    pub grid_width: u32,
    /// Grid height in cells.
    pub grid_height: u32,
    pub tile_width: f32,
    pub tile_height: f32,
    pub ticks_per_second: u32,
    pub start_paused: bool,
    /// Used for conveyors whose definition has no positive `ticks_per_move`.
    pub default_ticks_per_move: u32,
    /// How many recent events the bus keeps for inspection.
    pub event_buffer_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_width: 32,
            grid_height: 32,
            tile_width: 64.0,
            tile_height: 32.0,
            ticks_per_second: 20,
            start_paused: false,
            default_ticks_per_move: DEFAULT_TICKS_PER_MOVE,
            event_buffer_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: u32, height: u32 },
    #[error("tile size must be positive and finite, got {width}x{height}")]
    InvalidTileSize { width: f32, height: f32 },
    #[error("ticks_per_second must be positive")]
    ZeroTickRate,
    #[error("ticks_per_second must be at most {max}, got {0}", max = MAX_TICKS_PER_SECOND)]
    TickRateTooHigh(u32),
    #[error("default_ticks_per_move must be positive")]
    ZeroTicksPerMove,
}

impl SimConfig {
    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.grid_width,
                height: self.grid_height,
            });
        }
        let tile_ok = |v: f32| v.is_finite() && v > 0.0;
        if !tile_ok(self.tile_width) || !tile_ok(self.tile_height) {
            return Err(ConfigError::InvalidTileSize {
                width: self.tile_width,
                height: self.tile_height,
            });
        }
        if self.ticks_per_second == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if self.ticks_per_second > MAX_TICKS_PER_SECOND {
            return Err(ConfigError::TickRateTooHigh(self.ticks_per_second));
        }
        if self.default_ticks_per_move == 0 {
            return Err(ConfigError::ZeroTicksPerMove);
        }
        Ok(())
    }

    pub fn grid(&self) -> IsoGrid {
        IsoGrid::new(
            self.grid_width,
            self.grid_height,
            self.tile_width,
            self.tile_height,
        )
    }
}
