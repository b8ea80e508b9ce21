//! Slippy-map tile math: lon/lat ↔ tile coordinates, tile hierarchy and
//! quadkeys.
//!
//! All functions are pure. Tile `x` grows east, tile `y` grows south, and the
//! children of a tile are always listed NW, NE, SE, SW.
//!
//! ```text
//!   zoom z                 zoom z + 1
//!   ┌───────────┐          ┌─────┬─────┐
//!   │           │          │ NW  │ NE  │   (2x, 2y)   (2x+1, 2y)
//!   │  (x, y)   │   ──►    ├─────┼─────┤
//!   │           │          │ SW  │ SE  │   (2x, 2y+1) (2x+1, 2y+1)
//!   └───────────┘          └─────┴─────┘
//! ```

use std::f64::consts::PI;

use crate::constants::MAX_TILE_ZOOM;

/// Integer tile address in a power-of-two slippy-map grid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TileCoord {
  /// Column, growing east.
  pub x: u32,
  /// Row, growing south.
  pub y: u32,
  /// Zoom level.
  pub z: u8,
}

/// Fractional tile position of a geographic point.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TileFraction {
  pub x: f64,
  pub y: f64,
  pub z: u8,
}

/// Geographic bounding box in degrees.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BBox {
  pub west: f64,
  pub south: f64,
  pub east: f64,
  pub north: f64,
}

impl BBox {
  /// Create a bounding box from its four edges.
  pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
    Self {
      west,
      south,
      east,
      north,
    }
  }

  /// Inclusive containment test.
  #[inline]
  pub fn contains(&self, lon: f64, lat: f64) -> bool {
    lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
  }
}

impl TileCoord {
  /// Create a tile coordinate.
  ///
  /// # Panics
  /// Panics if `z` exceeds [`MAX_TILE_ZOOM`] or `x`/`y` fall outside
  /// `0..2^z`. An out-of-range tile is a programming error, never clamped.
  pub fn new(x: u32, y: u32, z: u8) -> Self {
    assert!(z <= MAX_TILE_ZOOM, "tile zoom {} exceeds {}", z, MAX_TILE_ZOOM);
    let n = 1u64 << z;
    assert!(
      (x as u64) < n && (y as u64) < n,
      "tile ({}, {}) out of range at zoom {}",
      x,
      y,
      z
    );
    Self { x, y, z }
  }

  /// Number of tiles along one axis at this tile's zoom.
  #[inline]
  pub fn grid_size(&self) -> u64 {
    1u64 << self.z
  }

  /// The four children, ordered NW, NE, SE, SW.
  pub fn children(&self) -> [TileCoord; 4] {
    let (x, y, z) = (self.x * 2, self.y * 2, self.z + 1);
    [
      TileCoord::new(x, y, z),
      TileCoord::new(x + 1, y, z),
      TileCoord::new(x + 1, y + 1, z),
      TileCoord::new(x, y + 1, z),
    ]
  }

  /// The tile one level coarser that contains this one.
  ///
  /// # Panics
  /// Panics at zoom 0, which has no parent.
  pub fn parent(&self) -> TileCoord {
    assert!(self.z > 0, "zoom 0 tile has no parent");
    TileCoord::new(self.x >> 1, self.y >> 1, self.z - 1)
  }

  /// The ancestor at zoom `z` (or self when `z` equals this tile's zoom).
  pub fn ancestor(&self, z: u8) -> TileCoord {
    assert!(z <= self.z, "ancestor zoom {} deeper than tile zoom {}", z, self.z);
    let shift = self.z - z;
    TileCoord::new(self.x >> shift, self.y >> shift, z)
  }

  /// This tile and its three siblings, ordered NW, NE, SE, SW.
  pub fn siblings(&self) -> [TileCoord; 4] {
    self.parent().children()
  }

  /// Position of this tile among its siblings (0 = NW, 1 = NE, 2 = SE, 3 = SW).
  pub fn quadrant(&self) -> usize {
    match (self.x & 1, self.y & 1) {
      (0, 0) => 0,
      (1, 0) => 1,
      (1, _) => 2,
      _ => 3,
    }
  }

  /// Base-4 path from zoom 1 down to this tile, one digit per level.
  pub fn quadkey(&self) -> String {
    let mut key = String::with_capacity(self.z as usize);
    for z in (1..=self.z).rev() {
      let mask = 1u32 << (z - 1);
      let mut digit = b'0';
      if self.x & mask != 0 {
        digit += 1;
      }
      if self.y & mask != 0 {
        digit += 2;
      }
      key.push(digit as char);
    }
    key
  }

  /// Decode a quadkey. Returns `None` for non-base-4 digits or keys deeper
  /// than [`MAX_TILE_ZOOM`].
  pub fn from_quadkey(quadkey: &str) -> Option<TileCoord> {
    let z = quadkey.len();
    if z > MAX_TILE_ZOOM as usize {
      return None;
    }
    let (mut x, mut y) = (0u32, 0u32);
    for (i, ch) in quadkey.bytes().enumerate() {
      let mask = 1u32 << (z - 1 - i);
      match ch {
        b'0' => {}
        b'1' => x |= mask,
        b'2' => y |= mask,
        b'3' => {
          x |= mask;
          y |= mask;
        }
        _ => return None,
      }
    }
    Some(TileCoord::new(x, y, z as u8))
  }
}

/// Web-Mercator projection of a point to fractional tile coordinates.
///
/// `x` is wrapped into `[0, 2^z)`; `y` is left unclamped.
pub fn point_to_tile_fraction(lon: f64, lat: f64, z: u8) -> TileFraction {
  let sin = lat.to_radians().sin();
  let z2 = (1u64 << z) as f64;
  let mut x = z2 * (lon / 360.0 + 0.5);
  let y = z2 * (0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI);

  x %= z2;
  if x < 0.0 {
    x += z2;
  }
  TileFraction { x, y, z }
}

/// Integer tile containing a point.
///
/// Latitudes beyond the Mercator limit land in the first or last row.
pub fn point_to_tile(lon: f64, lat: f64, z: u8) -> TileCoord {
  let frac = point_to_tile_fraction(lon, lat, z);
  let max = ((1u64 << z) - 1) as f64;
  TileCoord::new(
    frac.x.floor().clamp(0.0, max) as u32,
    frac.y.floor().clamp(0.0, max) as u32,
    z,
  )
}

/// Longitude of the west edge of fractional tile column `x`.
#[inline]
pub fn tile_to_lon(x: f64, z: u8) -> f64 {
  x / (1u64 << z) as f64 * 360.0 - 180.0
}

/// Latitude of the north edge of fractional tile row `y` (inverse Mercator).
#[inline]
pub fn tile_to_lat(y: f64, z: u8) -> f64 {
  let n = PI - 2.0 * PI * y / (1u64 << z) as f64;
  (0.5 * (n.exp() - (-n).exp())).atan().to_degrees()
}

/// Geographic bounds of a tile.
pub fn tile_to_bbox(tile: TileCoord) -> BBox {
  let (x, y) = (tile.x as f64, tile.y as f64);
  BBox {
    west: tile_to_lon(x, tile.z),
    south: tile_to_lat(y + 1.0, tile.z),
    east: tile_to_lon(x + 1.0, tile.z),
    north: tile_to_lat(y, tile.z),
  }
}

/// Closed polygon ring of a tile's bounds in GeoJSON `[lon, lat]` order
/// (NW, SW, SE, NE, NW).
pub fn tile_to_polygon(tile: TileCoord) -> [[f64; 2]; 5] {
  let b = tile_to_bbox(tile);
  [
    [b.west, b.north],
    [b.west, b.south],
    [b.east, b.south],
    [b.east, b.north],
    [b.west, b.north],
  ]
}

/// Whether `tile` occurs in `tiles`.
pub fn has_tile(tiles: &[TileCoord], tile: &TileCoord) -> bool {
  tiles.iter().any(|t| t == tile)
}

/// Whether all four siblings of `tile` occur in `tiles`.
pub fn has_siblings(tile: &TileCoord, tiles: &[TileCoord]) -> bool {
  tile.siblings().iter().all(|s| has_tile(tiles, s))
}

/// Integer tile position at zoom 32, kept as raw `u64` since zoom 32 is
/// outside the addressable tile range.
fn point_to_raw_z32(lon: f64, lat: f64) -> (u64, u64) {
  let frac = point_to_tile_fraction(lon, lat, 32);
  let max = u32::MAX as f64;
  (
    frac.x.floor().clamp(0.0, max) as u64,
    frac.y.floor().clamp(0.0, max) as u64,
  )
}

/// Deepest zoom at which both corners of a zoom-32 box share a tile.
///
/// `bbox` is `[min_x, min_y, max_x, max_y]` in zoom-32 tile units.
pub fn bbox_zoom(bbox: [u64; 4]) -> u8 {
  for z in 0..MAX_TILE_ZOOM {
    let mask = 1u64 << (32 - (z as u32 + 1));
    if (bbox[0] & mask) != (bbox[2] & mask) || (bbox[1] & mask) != (bbox[3] & mask) {
      return z;
    }
  }
  MAX_TILE_ZOOM
}

/// Smallest tile that fully contains a bounding box.
pub fn bbox_to_tile(bbox: BBox) -> TileCoord {
  let min = point_to_raw_z32(bbox.west, bbox.south);
  let max = point_to_raw_z32(bbox.east, bbox.north);
  let z = bbox_zoom([min.0, min.1, max.0, max.1]);
  if z == 0 {
    return TileCoord::new(0, 0, 0);
  }
  let shift = 32 - z as u32;
  TileCoord::new((min.0 >> shift) as u32, (min.1 >> shift) as u32, z)
}

#[cfg(test)]
#[path = "geodesy_test.rs"]
mod geodesy_test;
