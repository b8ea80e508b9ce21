//! Elevation decoding and the earth-curvature correction.
//!
//! Elevation rasters pack a 24-bit value into the three most significant
//! color channels:
//!
//! ```text
//! meters = -10000 + (r * 65536 + g * 256 + b) * 0.1
//! ```
//!
//! A display tile usually reads only a window of a coarser elevation tile.
//! The window is expressed in normalized raster units so that neighboring
//! tiles reading the same raster sample identical world positions.

use crate::constants::{samples_per_edge, ELEVATION_MAX_CODE, ELEVATION_OFFSET, ELEVATION_STEP};
use crate::geodesy::TileCoord;
use crate::raster::{Raster, RasterWindow};

/// Decode one 3-byte elevation sample to meters.
#[inline]
pub fn decode_elevation(r: u8, g: u8, b: u8) -> f64 {
  let code = (r as u32) * 65536 + (g as u32) * 256 + b as u32;
  ELEVATION_OFFSET + code as f64 * ELEVATION_STEP
}

/// Encode meters to the 3-byte format. Values outside the representable
/// range saturate.
pub fn encode_elevation(meters: f64) -> [u8; 3] {
  let code = ((meters - ELEVATION_OFFSET) / ELEVATION_STEP)
    .round()
    .clamp(0.0, ELEVATION_MAX_CODE as f64) as u32;
  [(code >> 16) as u8, (code >> 8) as u8, code as u8]
}

/// Height lost to the earth's curvature at horizontal offset `(x, z)` from
/// the tangent point.
#[inline]
pub fn curvature_drop(x: f64, z: f64, earth_radius: f64) -> f64 {
  (x * x + z * z) / (2.0 * earth_radius)
}

/// Elevation tile that backs a display tile.
///
/// The elevation tile sits `max(exponent, z - max_zoom)` levels above the
/// display tile, so elevation never goes deeper than `max_zoom`.
pub fn elevation_tile_for(tile: TileCoord, exponent: u8, max_zoom: u8) -> TileCoord {
  let exp = exponent.max(tile.z.saturating_sub(max_zoom)).min(tile.z);
  tile.ancestor(tile.z - exp)
}

/// Window of `source`'s raster covered by `tile`.
///
/// # Panics
/// Panics if `source` is not `tile` or one of its ancestors.
pub fn window_in(tile: TileCoord, source: TileCoord) -> RasterWindow {
  assert_eq!(
    tile.ancestor(source.z),
    source,
    "{:?} does not cover {:?}",
    source,
    tile
  );
  let scale = (1u64 << (tile.z - source.z)) as f64;
  RasterWindow {
    u0: (tile.x as f64 - source.x as f64 * scale) / scale,
    v0: (tile.y as f64 - source.y as f64 * scale) / scale,
    span: 1.0 / scale,
  }
}

/// Decode an elevation raster into a `(down_size + 1)²` grid of raw
/// (uncorrected) elevations covering `window`.
///
/// Samples are bilinear between pixel centers, clamped at the raster border.
pub fn decode_grid(raster: &Raster, window: RasterWindow, down_size: usize) -> Vec<f32> {
  let n = samples_per_edge(down_size);
  let mut out = Vec::with_capacity(n * n);
  for j in 0..n {
    let v = window.v0 + window.span * j as f64 / down_size as f64;
    for i in 0..n {
      let u = window.u0 + window.span * i as f64 / down_size as f64;
      out.push(sample_bilinear(raster, u, v) as f32);
    }
  }
  out
}

/// Bilinear elevation at normalized raster position `(u, v)`.
pub fn sample_bilinear(raster: &Raster, u: f64, v: f64) -> f64 {
  let max_x = (raster.width - 1) as f64;
  let max_y = (raster.height - 1) as f64;
  let px = (u * raster.width as f64 - 0.5).clamp(0.0, max_x);
  let py = (v * raster.height as f64 - 0.5).clamp(0.0, max_y);

  let x0 = px.floor() as u32;
  let y0 = py.floor() as u32;
  let x1 = (x0 + 1).min(raster.width - 1);
  let y1 = (y0 + 1).min(raster.height - 1);
  let fx = px - x0 as f64;
  let fy = py - y0 as f64;

  let h = |x: u32, y: u32| {
    let [r, g, b, _] = raster.pixel(x, y);
    decode_elevation(r, g, b)
  };
  let top = h(x0, y0) * (1.0 - fx) + h(x1, y0) * fx;
  let bottom = h(x0, y1) * (1.0 - fx) + h(x1, y1) * fx;
  top * (1.0 - fy) + bottom * fy
}

#[cfg(test)]
#[path = "elevation_test.rs"]
mod elevation_test;
