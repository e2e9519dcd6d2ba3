//! Isometric grid coordinates.
//!
//! Cells are addressed by integer [`GridPos`]. The world plane uses a 2:1
//! diamond projection: moving one cell along +x shifts the tile center by
//! `(tile_width / 2, tile_height / 2)`, moving one cell along +y shifts it by
//! `(-tile_width / 2, tile_height / 2)`. Screen space is world space under a
//! [`Viewport`] (pan offset and zoom) owned by whatever renders the yard.

use glam::Vec2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A cell on the 2D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent cell one step in `dir`.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Manhattan distance to another cell.
    pub fn manhattan_distance(&self, other: &GridPos) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }
}

impl std::fmt::Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the four cardinal headings. Machine rotations and item headings
/// are always one of these; intermediate angles are not representable.
///
/// Degrees follow the yard convention: 0 = East (+x), 90 = North (+y),
/// 180 = West, 270 = South.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    East,
    North,
    West,
    South,
}

impl Direction {
    /// All four directions, in increasing degree order.
    pub fn all() -> [Direction; 4] {
        [
            Direction::East,
            Direction::North,
            Direction::West,
            Direction::South,
        ]
    }

    /// Parse a heading in degrees. Any multiple of 90 is accepted (and
    /// normalized modulo 360); everything else is rejected.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Direction::East),
            90 => Some(Direction::North),
            180 => Some(Direction::West),
            270 => Some(Direction::South),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Direction::East => 0,
            Direction::North => 90,
            Direction::West => 180,
            Direction::South => 270,
        }
    }

    /// Unit cell offset for this heading.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::East => (1, 0),
            Direction::North => (0, 1),
            Direction::West => (-1, 0),
            Direction::South => (0, -1),
        }
    }

    /// `(degrees + 180) mod 360`.
    pub fn opposite(self) -> Self {
        match self {
            Direction::East => Direction::West,
            Direction::North => Direction::South,
            Direction::West => Direction::East,
            Direction::South => Direction::North,
        }
    }

    /// `(degrees + 90) mod 360`.
    pub fn rotate_cw(self) -> Self {
        match self {
            Direction::East => Direction::North,
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
        }
    }

    /// True for North and South, where a footprint's width and height swap.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }
}

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

/// The rectangular size of a machine on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A 1x1 machine.
    pub const fn single() -> Self {
        Self::new(1, 1)
    }

    /// Return the footprint after rotating the machine to `rotation`.
    /// For 90 and 270 degrees, width and height are swapped.
    pub fn rotated(&self, rotation: Direction) -> Self {
        if rotation.is_quarter_turn() {
            Self::new(self.height, self.width)
        } else {
            *self
        }
    }

    /// Number of cells covered.
    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    /// Iterate over all cells covered by this footprint at `origin`.
    pub fn cells(&self, origin: GridPos) -> impl Iterator<Item = GridPos> + use<> {
        let w = self.width as i32;
        let h = self.height as i32;
        let (ox, oy) = (origin.x, origin.y);
        (0..h).flat_map(move |dy| (0..w).map(move |dx| GridPos::new(ox + dx, oy + dy)))
    }
}

impl Default for Footprint {
    fn default() -> Self {
        Self::single()
    }
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// Camera transform between screen pixels and world units.
///
/// `screen = (world - offset) * zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// World point drawn at the screen origin.
    pub offset: Vec2,
    pub zoom: f32,
}

impl Viewport {
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        screen / self.zoom + self.offset
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.offset) * self.zoom
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// IsoGrid
// ---------------------------------------------------------------------------

/// Grid extents and tile metrics. All conversions are pure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsoGrid {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Tile width in world units (twice the height for a 2:1 diamond).
    pub tile_width: f32,
    /// Tile height in world units.
    pub tile_height: f32,
}

impl IsoGrid {
    pub fn new(width: u32, height: u32, tile_width: f32, tile_height: f32) -> Self {
        Self {
            width,
            height,
            tile_width,
            tile_height,
        }
    }

    /// `0 <= x < width` and `0 <= y < height`.
    pub fn is_valid_position(&self, cell: GridPos) -> bool {
        cell.x >= 0
            && cell.y >= 0
            && (cell.x as u32) < self.width
            && (cell.y as u32) < self.height
    }

    /// World position of the center of `cell`.
    pub fn grid_to_world(&self, cell: GridPos) -> Vec2 {
        let half_w = self.tile_width / 2.0;
        let half_h = self.tile_height / 2.0;
        Vec2::new(
            (cell.x - cell.y) as f32 * half_w,
            (cell.x + cell.y) as f32 * half_h,
        )
    }

    /// The cell whose diamond contains `world`, rounding to the nearest cell
    /// center. Exact inverse of [`grid_to_world`](Self::grid_to_world) on cell
    /// centers. The result may be out of bounds.
    pub fn world_to_grid(&self, world: Vec2) -> GridPos {
        let u = world.x / (self.tile_width / 2.0);
        let v = world.y / (self.tile_height / 2.0);
        let x = (u + v) / 2.0;
        let y = (v - u) / 2.0;
        GridPos::new(x.round() as i32, y.round() as i32)
    }

    /// Screen picking: the cell under a screen-space point.
    pub fn screen_to_grid(&self, screen: Vec2, viewport: &Viewport) -> GridPos {
        self.world_to_grid(viewport.screen_to_world(screen))
    }

    /// Diamond corners of `cell` in world space: top, right, bottom, left.
    pub fn tile_corners(&self, cell: GridPos) -> [Vec2; 4] {
        let center = self.grid_to_world(cell);
        let half_w = self.tile_width / 2.0;
        let half_h = self.tile_height / 2.0;
        [
            center + Vec2::new(0.0, -half_h),
            center + Vec2::new(half_w, 0.0),
            center + Vec2::new(0.0, half_h),
            center + Vec2::new(-half_w, 0.0),
        ]
    }

    /// In-bounds 4-neighbours of `cell`.
    pub fn neighbors(&self, cell: GridPos) -> Vec<GridPos> {
        Direction::all()
            .into_iter()
            .map(|dir| cell.step(dir))
            .filter(|n| self.is_valid_position(*n))
            .collect()
    }

    /// Every in-bounds cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = GridPos> + use<> {
        Footprint::new(self.width, self.height).cells(GridPos::new(0, 0))
    }

    /// True if every cell of `footprint` at `origin` is in bounds.
    pub fn contains_footprint(&self, origin: GridPos, footprint: Footprint) -> bool {
        footprint.cells(origin).all(|c| self.is_valid_position(c))
    }
}

impl Default for IsoGrid {
    fn default() -> Self {
        Self::new(32, 32, 64.0, 32.0)
    }
}
