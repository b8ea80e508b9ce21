//! Sample-grid and geodesy constants shared by the whole terrain core.
//!
//! # Tile Sample Layout
//!
//! ```text
//!   i (east) →
//!   0     1     2    ...    D
//!   ┌─────┬─────┬─── ─ ─ ───┐   j = 0   (north edge)
//!   │     │     │           │
//!   ├─────┼─────┼─── ─ ─ ───┤   j = 1
//!   │     │     │           │
//!   ┆     ┆     ┆           ┆
//!   └─────┴─────┴─── ─ ─ ───┘   j = D   (south edge)
//!
//!   D = down_size quads per tile edge, (D + 1)² height samples.
//!   index = j * (D + 1) + i
//! ```
//!
//! The sample count is independent of zoom: every tile, coarse or fine,
//! carries the same grid, which is what makes pooled meshes interchangeable.

/// Default number of quads along one tile edge.
pub const DEFAULT_DOWN_SIZE: usize = 32;

/// Offset of the 3-byte elevation encoding, in meters.
pub const ELEVATION_OFFSET: f64 = -10000.0;

/// Meters per unit of the 24-bit elevation encoding.
pub const ELEVATION_STEP: f64 = 0.1;

/// Largest value representable by the 24-bit elevation encoding.
pub const ELEVATION_MAX_CODE: u32 = 0x00FF_FFFF;

/// WGS84 equatorial radius in meters (Web Mercator sphere).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Deepest zoom level a quadkey or tile coordinate may address.
pub const MAX_TILE_ZOOM: u8 = 28;

/// Samples per tile edge for a given quad count.
#[inline(always)]
pub const fn samples_per_edge(down_size: usize) -> usize {
  down_size + 1
}

/// Total samples in a tile grid for a given quad count.
#[inline(always)]
pub const fn sample_count(down_size: usize) -> usize {
  samples_per_edge(down_size) * samples_per_edge(down_size)
}

/// Linear index of grid sample `(i, j)`; `i` runs east, `j` runs south.
#[inline(always)]
pub const fn sample_index(i: usize, j: usize, down_size: usize) -> usize {
  j * samples_per_edge(down_size) + i
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
