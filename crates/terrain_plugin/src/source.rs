//! Raster sources.
//!
//! The streamer never talks to the network itself. Anything that can
//! produce a decoded RGBA raster for a tile implements [`RasterSource`];
//! the fetcher runs it off the main thread and hands the result back.

use std::sync::Arc;

use thiserror::Error;

use crate::elevation::encode_elevation;
use crate::geodesy::{tile_to_lat, tile_to_lon, TileCoord};
use crate::raster::Raster;

/// Which layer a raster belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RasterKind {
  Elevation,
  Imagery,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
  #[error("network error: {0}")]
  Network(String),
  #[error("tile {0:?} not found")]
  NotFound(TileCoord),
  #[error("malformed raster: {0}")]
  Malformed(String),
}

/// Produces rasters for tiles. Called from worker threads.
pub trait RasterSource: Send + Sync + 'static {
  fn fetch_raster(&self, tile: TileCoord, kind: RasterKind) -> Result<Raster, FetchError>;
}

impl<S: RasterSource + ?Sized> RasterSource for Box<S> {
  fn fetch_raster(&self, tile: TileCoord, kind: RasterKind) -> Result<Raster, FetchError> {
    (**self).fetch_raster(tile, kind)
  }
}

impl<S: RasterSource + ?Sized> RasterSource for Arc<S> {
  fn fetch_raster(&self, tile: TileCoord, kind: RasterKind) -> Result<Raster, FetchError> {
    (**self).fetch_raster(tile, kind)
  }
}

/// Synthesizes elevation and imagery rasters from a height function of
/// `(lon, lat)` in degrees.
///
/// Elevation pixels use the 3-byte encoding, imagery is a grayscale ramp
/// of height over `shade_range`.
pub struct ProceduralSource<F> {
  height_fn: F,
  pub tile_size: u32,
  pub shade_range: (f64, f64),
}

impl<F> ProceduralSource<F>
where
  F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
{
  pub fn new(height_fn: F) -> Self {
    Self {
      height_fn,
      tile_size: 64,
      shade_range: (0.0, 4000.0),
    }
  }

  pub fn with_tile_size(mut self, tile_size: u32) -> Self {
    self.tile_size = tile_size.max(1);
    self
  }

  pub fn with_shade_range(mut self, low: f64, high: f64) -> Self {
    self.shade_range = (low, high);
    self
  }

  /// Height at the center of pixel `(px, py)` of `tile`.
  fn height_at_pixel(&self, tile: TileCoord, px: u32, py: u32) -> f64 {
    let size = self.tile_size as f64;
    let lon = tile_to_lon(tile.x as f64 + (px as f64 + 0.5) / size, tile.z);
    let lat = tile_to_lat(tile.y as f64 + (py as f64 + 0.5) / size, tile.z);
    (self.height_fn)(lon, lat)
  }

  fn shade(&self, height: f64) -> u8 {
    let (low, high) = self.shade_range;
    let t = if high > low {
      ((height - low) / (high - low)).clamp(0.0, 1.0)
    } else {
      0.5
    };
    (t * 255.0).round() as u8
  }
}

impl<F> RasterSource for ProceduralSource<F>
where
  F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
{
  fn fetch_raster(&self, tile: TileCoord, kind: RasterKind) -> Result<Raster, FetchError> {
    let size = self.tile_size;
    let mut raster = Raster::filled(size, size, [0, 0, 0, 255]);
    for py in 0..size {
      for px in 0..size {
        let h = self.height_at_pixel(tile, px, py);
        let rgba = match kind {
          RasterKind::Elevation => {
            let [r, g, b] = encode_elevation(h);
            [r, g, b, 255]
          }
          RasterKind::Imagery => {
            let s = self.shade(h);
            [s, s, s, 255]
          }
        };
        raster.set_pixel(px, py, rgba);
      }
    }
    Ok(raster)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::elevation::decode_elevation;

  #[test]
  fn procedural_flat_elevation() {
    let source = ProceduralSource::new(|_, _| 1234.5).with_tile_size(8);
    let raster = source
      .fetch_raster(TileCoord::new(0, 0, 1), RasterKind::Elevation)
      .unwrap();
    assert_eq!((raster.width, raster.height), (8, 8));
    for [r, g, b, _] in &raster.pixels {
      assert!((decode_elevation(*r, *g, *b) - 1234.5).abs() < 0.051);
    }
  }

  #[test]
  fn procedural_imagery_shades_by_height() {
    let source = ProceduralSource::new(|lon, _| if lon < 0.0 { 0.0 } else { 1000.0 })
      .with_tile_size(2)
      .with_shade_range(0.0, 1000.0);
    let raster = source
      .fetch_raster(TileCoord::new(0, 0, 0), RasterKind::Imagery)
      .unwrap();
    assert_eq!(raster.pixel(0, 0), [0, 0, 0, 255]);
    assert_eq!(raster.pixel(1, 0), [255, 255, 255, 255]);
  }

  #[test]
  fn boxed_source_dispatches() {
    let boxed: Box<dyn RasterSource> = Box::new(ProceduralSource::new(|_, _| 0.0).with_tile_size(1));
    let raster = boxed
      .fetch_raster(TileCoord::new(0, 0, 0), RasterKind::Elevation)
      .unwrap();
    assert_eq!(raster.pixels.len(), 1);
  }
}
