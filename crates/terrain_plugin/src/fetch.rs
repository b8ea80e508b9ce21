//! Off-thread tile fetching.
//!
//! # Flow
//!
//! ```text
//! Update pass                        rayon worker
//! ┌──────────────────┐
//! │ request(node, …) │──── spawn ───►┌──────────────────────┐
//! └──────────────────┘               │ resolve layer tile   │
//!                                    │ source.fetch_raster  │
//!                                    │ stitch / window      │
//!                                    └──────────┬───────────┘
//! ┌──────────────────┐                          │ send
//! │ poll()           │◄─────────────────────────┘
//! │ → FetchCompletion│
//! └──────────────────┘
//! ```
//!
//! Workers never touch the quadtree. A completion only carries the node id
//! and the node generation it was requested for; the update pass turns it
//! into a pipeline task, which re-validates liveness before writing anything.

use std::sync::Arc;

use crossbeam_channel::{self as channel, Receiver, Sender};
use web_time::Instant;

use crate::elevation::{elevation_tile_for, window_in};
use crate::geodesy::TileCoord;
use crate::quadtree::NodeId;
use crate::raster::{Raster, RasterWindow};
use crate::source::{FetchError, RasterKind, RasterSource};

/// Where fetch work runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchMode {
  /// On rayon's pool; completions arrive on a later poll.
  #[default]
  Background,
  /// Inline in `request`; the completion is ready on the next poll.
  Immediate,
}

/// Zoom rules mapping a display tile to the tiles of each layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerZooms {
  pub elevation_exponent: u8,
  pub max_elevation_zoom: u8,
  pub imagery_zoom_offset: u8,
  pub max_imagery_zoom: u8,
}

impl LayerZooms {
  /// Imagery zoom for a display tile.
  #[inline]
  pub fn imagery_zoom(&self, tile: TileCoord) -> u8 {
    tile.z.saturating_add(self.imagery_zoom_offset).min(self.max_imagery_zoom)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchRequest {
  pub node: NodeId,
  pub generation: u32,
  pub tile: TileCoord,
  pub kind: RasterKind,
}

/// Raster plus the window of it covering the requested display tile.
#[derive(Clone, Debug)]
pub struct FetchedRaster {
  pub raster: Raster,
  pub window: RasterWindow,
}

#[derive(Debug)]
pub struct FetchCompletion {
  pub request: FetchRequest,
  pub result: Result<FetchedRaster, FetchError>,
  pub fetch_us: u64,
}

/// Fetch one raster and make sure it can be sampled.
fn fetch_valid<S: RasterSource + ?Sized>(
  source: &S,
  tile: TileCoord,
  kind: RasterKind,
) -> Result<Raster, FetchError> {
  let raster = source.fetch_raster(tile, kind)?;
  raster.validate()?;
  Ok(raster)
}

/// Resolve, fetch and assemble the raster for one request.
pub fn fetch_for_tile<S: RasterSource + ?Sized>(
  source: &S,
  zooms: LayerZooms,
  tile: TileCoord,
  kind: RasterKind,
) -> Result<FetchedRaster, FetchError> {
  match kind {
    RasterKind::Elevation => {
      let elev = elevation_tile_for(tile, zooms.elevation_exponent, zooms.max_elevation_zoom);
      let raster = fetch_valid(source, elev, RasterKind::Elevation)?;
      Ok(FetchedRaster {
        raster,
        window: window_in(tile, elev),
      })
    }
    RasterKind::Imagery => {
      let iz = zooms.imagery_zoom(tile);
      if iz >= tile.z {
        let raster = compose_imagery(source, tile, iz - tile.z)?;
        Ok(FetchedRaster {
          raster,
          window: RasterWindow::FULL,
        })
      } else {
        let ancestor = tile.ancestor(iz);
        let raster = fetch_valid(source, ancestor, RasterKind::Imagery)?;
        Ok(FetchedRaster {
          raster: raster.crop(window_in(tile, ancestor)),
          window: RasterWindow::FULL,
        })
      }
    }
  }
}

/// Stitch the `2^levels × 2^levels` imagery sub-tiles of `tile` into one
/// raster. All sub-tiles must share a size.
fn compose_imagery<S: RasterSource + ?Sized>(
  source: &S,
  tile: TileCoord,
  levels: u8,
) -> Result<Raster, FetchError> {
  if levels == 0 {
    return fetch_valid(source, tile, RasterKind::Imagery);
  }

  let n = 1u32 << levels;
  let z = tile.z + levels;
  let mut subs = Vec::with_capacity((n * n) as usize);
  for sy in 0..n {
    for sx in 0..n {
      let sub = TileCoord::new(tile.x * n + sx, tile.y * n + sy, z);
      subs.push((sx, sy, sub, fetch_valid(source, sub, RasterKind::Imagery)?));
    }
  }

  let (w, h) = (subs[0].3.width, subs[0].3.height);
  let mut canvas = Raster::filled(w * n, h * n, [0; 4]);
  for (sx, sy, sub, raster) in &subs {
    if (raster.width, raster.height) != (w, h) {
      return Err(FetchError::Malformed(format!(
        "imagery sub-tile {:?} is {}x{}, expected {}x{}",
        sub, raster.width, raster.height, w, h
      )));
    }
    canvas.blit(raster, sx * w, sy * h);
  }
  Ok(canvas)
}

/// Runs fetches and collects their completions.
pub struct TileFetcher<S> {
  source: Arc<S>,
  mode: FetchMode,
  zooms: LayerZooms,
  sender: Sender<FetchCompletion>,
  receiver: Receiver<FetchCompletion>,
  in_flight: usize,
}

impl<S: RasterSource> TileFetcher<S> {
  pub fn new(source: Arc<S>, mode: FetchMode, zooms: LayerZooms) -> Self {
    let (sender, receiver) = channel::unbounded();
    Self {
      source,
      mode,
      zooms,
      sender,
      receiver,
      in_flight: 0,
    }
  }

  pub fn mode(&self) -> FetchMode {
    self.mode
  }

  pub fn source(&self) -> &Arc<S> {
    &self.source
  }

  /// Fetches started but not yet returned by [`poll`](Self::poll).
  pub fn in_flight(&self) -> usize {
    self.in_flight
  }

  /// Start a fetch. Never blocks in `Background` mode.
  pub fn request(&mut self, request: FetchRequest) {
    self.in_flight += 1;
    let source = Arc::clone(&self.source);
    let sender = self.sender.clone();
    let zooms = self.zooms;

    let work = move || {
      let start = Instant::now();
      let result = fetch_for_tile(source.as_ref(), zooms, request.tile, request.kind);
      let completion = FetchCompletion {
        request,
        result,
        fetch_us: start.elapsed().as_micros() as u64,
      };
      // Receiver lives as long as the fetcher; a send error means shutdown.
      let _ = sender.send(completion);
    };

    match self.mode {
      FetchMode::Background => rayon::spawn(work),
      FetchMode::Immediate => work(),
    }
  }

  /// Drain every completion that has arrived (non-blocking).
  pub fn poll(&mut self) -> Vec<FetchCompletion> {
    let done: Vec<FetchCompletion> = self.receiver.try_iter().collect();
    self.in_flight = self.in_flight.saturating_sub(done.len());
    done
  }
}

#[cfg(test)]
#[path = "fetch_test.rs"]
mod fetch_test;
