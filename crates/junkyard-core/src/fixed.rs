use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Half a tile. Items below this progress occupy the entrance of their cell.
pub const HALF: Fixed64 = Fixed64::from_bits(1 << 31);

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Per-tick progress increment for an item that crosses one tile in
/// `ticks_per_move` ticks.
///
/// The reciprocal is rounded up to the next representable value, so
/// `ticks_per_move` increments always reach 1 and `ticks_per_move - 1`
/// increments never do (for any `ticks_per_move` below 2^16). Zero is
/// treated as one.
#[inline]
pub fn progress_step(ticks_per_move: u32) -> Fixed64 {
    let n = i64::from(ticks_per_move.max(1));
    let one = Fixed64::ONE.to_bits();
    Fixed64::from_bits((one + n - 1) / n)
}
