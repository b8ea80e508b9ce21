//! TerrainConfig - tunables for refinement, tile layers and world mapping.
//!
//! # World Mapping
//!
//! The world is a tangent plane at the origin (lon/lat). One tile at zoom
//! `z` is `2πR·cos(lat) / 2^z` meters wide; `+x` is east, `+z` is south,
//! `+y` is up.
//!
//! ```text
//! center(x, y, z) = ((x + 0.5 - fx) * w,  (y + 0.5 - fy) * w)
//!
//!   (fx, fy) = fractional tile coordinate of the origin at zoom z
//!   w        = tile width at zoom z
//! ```

use std::f64::consts::PI;

use glam::DVec2;
use thiserror::Error;

use super::budget::RefinementBudget;
use crate::constants::{DEFAULT_DOWN_SIZE, EARTH_RADIUS_M, MAX_TILE_ZOOM};
use crate::fetch::{FetchMode, LayerZooms};
use crate::geodesy::{point_to_tile_fraction, TileCoord};

/// Web Mercator latitude limit.
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Deepest imagery sub-tiling: 4^3 sub-tiles per display tile.
const MAX_IMAGERY_ZOOM_OFFSET: u8 = 3;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
  #[error("invalid zoom range {min}..={max} (deepest zoom is 28)")]
  InvalidZoomRange { min: u8, max: u8 },
  #[error("down_size must be even and at least 2, got {0}")]
  InvalidGridSize(usize),
  #[error("{0} must be positive")]
  NonPositive(&'static str),
  #[error("merge_divisor must be at least 2, got {0}")]
  MergeDivisorTooSmall(f64),
  #[error("origin latitude {0} outside the Web Mercator range")]
  OriginOutOfRange(f64),
  #[error("imagery_zoom_offset must be at most 3, got {0}")]
  ImageryOffsetTooLarge(u8),
  #[error("{layer} zoom {zoom} is past the deepest zoom 28")]
  LayerZoomTooLarge { layer: &'static str, zoom: u8 },
}

#[derive(Clone, Debug)]
pub struct TerrainConfig {
  /// Tangent point longitude, degrees.
  pub origin_lon: f64,
  /// Tangent point latitude, degrees.
  pub origin_lat: f64,

  /// Zoom of the root tile.
  pub min_zoom: u8,
  /// Deepest zoom a node may split to.
  pub max_zoom: u8,

  /// Quads along one tile edge.
  pub down_size: usize,

  /// Split when `width / distance` exceeds this.
  pub split_threshold: f64,
  /// Merge when every child's ratio is below `split_threshold / merge_divisor`.
  pub merge_divisor: f64,

  pub earth_radius: f64,

  /// Elevation comes from a tile this many levels coarser.
  pub elevation_exponent: u8,
  /// Deepest zoom elevation tiles exist at.
  pub max_elevation_zoom: u8,
  /// Imagery comes from `4^offset` sub-tiles.
  pub imagery_zoom_offset: u8,
  pub max_imagery_zoom: u8,

  /// When set, the viewer's height above this altitude is added to the
  /// LOD distance.
  pub altitude_reference: Option<f64>,

  /// Vertical extent assumed for tiles without loaded heights when frustum
  /// culling.
  pub cull_height_range: (f64, f64),

  pub budget: RefinementBudget,
  /// Pipeline stages advanced per frame.
  pub steps_per_frame: usize,
  pub fetch_mode: FetchMode,
}

impl Default for TerrainConfig {
  fn default() -> Self {
    Self {
      origin_lon: -71.30325,
      origin_lat: 44.2705,
      min_zoom: 10,
      max_zoom: 16,
      down_size: DEFAULT_DOWN_SIZE,
      split_threshold: 1.5,
      merge_divisor: 2.0,
      earth_radius: EARTH_RADIUS_M,
      elevation_exponent: 2,
      max_elevation_zoom: 12,
      imagery_zoom_offset: 1,
      max_imagery_zoom: 18,
      altitude_reference: None,
      cull_height_range: (-500.0, 9000.0),
      budget: RefinementBudget::DEFAULT,
      steps_per_frame: 1,
      fetch_mode: FetchMode::Background,
    }
  }
}

impl TerrainConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.min_zoom > self.max_zoom || self.max_zoom > MAX_TILE_ZOOM {
      return Err(ConfigError::InvalidZoomRange {
        min: self.min_zoom,
        max: self.max_zoom,
      });
    }
    if self.down_size < 2 || self.down_size % 2 != 0 {
      return Err(ConfigError::InvalidGridSize(self.down_size));
    }
    if !(self.split_threshold > 0.0) {
      return Err(ConfigError::NonPositive("split_threshold"));
    }
    if !(self.earth_radius > 0.0) {
      return Err(ConfigError::NonPositive("earth_radius"));
    }
    if self.steps_per_frame == 0 {
      return Err(ConfigError::NonPositive("steps_per_frame"));
    }
    if !(self.merge_divisor >= 2.0) {
      return Err(ConfigError::MergeDivisorTooSmall(self.merge_divisor));
    }
    if !(self.origin_lat.abs() < MAX_LATITUDE) {
      return Err(ConfigError::OriginOutOfRange(self.origin_lat));
    }
    if self.imagery_zoom_offset > MAX_IMAGERY_ZOOM_OFFSET {
      return Err(ConfigError::ImageryOffsetTooLarge(self.imagery_zoom_offset));
    }
    for (layer, zoom) in [
      ("max_elevation_zoom", self.max_elevation_zoom),
      ("max_imagery_zoom", self.max_imagery_zoom),
    ] {
      if zoom > MAX_TILE_ZOOM {
        return Err(ConfigError::LayerZoomTooLarge { layer, zoom });
      }
    }
    Ok(())
  }

  /// Angular resolution below which four siblings merge.
  #[inline]
  pub fn merge_threshold(&self) -> f64 {
    self.split_threshold / self.merge_divisor
  }

  pub fn layer_zooms(&self) -> LayerZooms {
    LayerZooms {
      elevation_exponent: self.elevation_exponent,
      max_elevation_zoom: self.max_elevation_zoom,
      imagery_zoom_offset: self.imagery_zoom_offset,
      max_imagery_zoom: self.max_imagery_zoom,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ZoomEntry {
  origin: DVec2,
  width: f64,
}

/// Origin fraction and tile width for every zoom in `min..=max`, computed
/// once at startup.
#[derive(Clone, Debug)]
pub struct ZoomTable {
  min_zoom: u8,
  entries: Vec<ZoomEntry>,
}

impl ZoomTable {
  pub fn new(config: &TerrainConfig) -> Self {
    let circumference = 2.0 * PI * config.earth_radius * config.origin_lat.to_radians().cos();
    let entries = (config.min_zoom..=config.max_zoom)
      .map(|z| {
        let f = point_to_tile_fraction(config.origin_lon, config.origin_lat, z);
        ZoomEntry {
          origin: DVec2::new(f.x, f.y),
          width: circumference / (1u64 << z) as f64,
        }
      })
      .collect();
    Self {
      min_zoom: config.min_zoom,
      entries,
    }
  }

  fn entry(&self, z: u8) -> &ZoomEntry {
    assert!(
      z >= self.min_zoom && ((z - self.min_zoom) as usize) < self.entries.len(),
      "zoom {} outside configured range {}..{}",
      z,
      self.min_zoom,
      self.min_zoom as usize + self.entries.len()
    );
    &self.entries[(z - self.min_zoom) as usize]
  }

  /// Tile width in meters at zoom `z`.
  pub fn width(&self, z: u8) -> f64 {
    self.entry(z).width
  }

  /// Fractional tile coordinate of the origin at zoom `z`.
  pub fn origin(&self, z: u8) -> DVec2 {
    self.entry(z).origin
  }

  /// World ground position of a tile's center.
  pub fn tile_center(&self, tile: TileCoord) -> DVec2 {
    let e = self.entry(tile.z);
    DVec2::new(
      (tile.x as f64 + 0.5 - e.origin.x) * e.width,
      (tile.y as f64 + 0.5 - e.origin.y) * e.width,
    )
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
