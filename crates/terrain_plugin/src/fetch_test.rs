use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;
use crate::source::ProceduralSource;

const ZOOMS: LayerZooms = LayerZooms {
  elevation_exponent: 2,
  max_elevation_zoom: 12,
  imagery_zoom_offset: 1,
  max_imagery_zoom: 18,
};

/// Imagery source whose pixels record the sub-tile they came from.
struct TaggedImagery;

impl RasterSource for TaggedImagery {
  fn fetch_raster(&self, tile: TileCoord, kind: RasterKind) -> Result<Raster, FetchError> {
    assert_eq!(kind, RasterKind::Imagery);
    Ok(Raster::filled(2, 2, [tile.x as u8, tile.y as u8, tile.z, 255]))
  }
}

struct Failing(AtomicUsize);

impl RasterSource for Failing {
  fn fetch_raster(&self, tile: TileCoord, _kind: RasterKind) -> Result<Raster, FetchError> {
    self.0.fetch_add(1, Ordering::SeqCst);
    Err(FetchError::NotFound(tile))
  }
}

fn request(tile: TileCoord, kind: RasterKind) -> FetchRequest {
  FetchRequest {
    node: NodeId(0),
    generation: 1,
    tile,
    kind,
  }
}

#[test]
fn test_elevation_fetch_uses_coarser_tile_window() {
  let source = ProceduralSource::new(|_, _| 10.0).with_tile_size(4);
  let tile = TileCoord::new(13, 6, 4);
  let fetched = fetch_for_tile(&source, ZOOMS, tile, RasterKind::Elevation).unwrap();
  // Two levels up: (3, 1, 2); the tile is the (1, 2) cell of a 4x4 split.
  assert_eq!(fetched.window.span, 0.25);
  assert_eq!(fetched.window.u0, 0.25);
  assert_eq!(fetched.window.v0, 0.5);
}

#[test]
fn test_imagery_composed_from_subtiles() {
  let tile = TileCoord::new(1, 2, 3);
  let fetched = fetch_for_tile(&TaggedImagery, ZOOMS, tile, RasterKind::Imagery).unwrap();
  assert_eq!(fetched.window, RasterWindow::FULL);
  assert_eq!((fetched.raster.width, fetched.raster.height), (4, 4));
  // NW quadrant comes from (2, 4, 4), SE from (3, 5, 4).
  assert_eq!(fetched.raster.pixel(0, 0), [2, 4, 4, 255]);
  assert_eq!(fetched.raster.pixel(3, 3), [3, 5, 4, 255]);
  assert_eq!(fetched.raster.pixel(3, 0), [3, 4, 4, 255]);
}

#[test]
fn test_imagery_cropped_from_ancestor_past_max_zoom() {
  let zooms = LayerZooms {
    max_imagery_zoom: 2,
    ..ZOOMS
  };
  let tile = TileCoord::new(5, 1, 3);
  let fetched = fetch_for_tile(&TaggedImagery, zooms, tile, RasterKind::Imagery).unwrap();
  assert_eq!((fetched.raster.width, fetched.raster.height), (1, 1));
  assert_eq!(fetched.raster.pixel(0, 0), [2, 0, 2, 255]);
}

#[test]
fn test_immediate_mode_completes_on_next_poll() {
  let source = Arc::new(ProceduralSource::new(|_, _| 0.0).with_tile_size(2));
  let mut fetcher = TileFetcher::new(source, FetchMode::Immediate, ZOOMS);
  fetcher.request(request(TileCoord::new(0, 0, 2), RasterKind::Elevation));
  assert_eq!(fetcher.in_flight(), 1);

  let done = fetcher.poll();
  assert_eq!(done.len(), 1);
  assert!(done[0].result.is_ok());
  assert_eq!(done[0].request.generation, 1);
  assert_eq!(fetcher.in_flight(), 0);
}

#[test]
fn test_background_mode_eventually_completes() {
  let source = Arc::new(ProceduralSource::new(|_, _| 0.0).with_tile_size(2));
  let mut fetcher = TileFetcher::new(source, FetchMode::Background, ZOOMS);
  for x in 0..4 {
    fetcher.request(request(TileCoord::new(x, 0, 2), RasterKind::Elevation));
  }

  let mut received = 0;
  for _ in 0..1000 {
    received += fetcher.poll().len();
    if received == 4 {
      break;
    }
    std::thread::sleep(Duration::from_millis(1));
  }
  assert_eq!(received, 4);
  assert_eq!(fetcher.in_flight(), 0);
}

#[test]
fn test_failure_is_returned_not_panicked() {
  let source = Arc::new(Failing(AtomicUsize::new(0)));
  let mut fetcher = TileFetcher::new(Arc::clone(&source), FetchMode::Immediate, ZOOMS);
  fetcher.request(request(TileCoord::new(0, 0, 0), RasterKind::Elevation));
  let done = fetcher.poll();
  assert!(matches!(done[0].result, Err(FetchError::NotFound(_))));
  assert_eq!(source.0.load(Ordering::SeqCst), 1);
}

/// Source that answers every request with a raster it cannot sample.
struct EmptyRaster;

impl RasterSource for EmptyRaster {
  fn fetch_raster(&self, _tile: TileCoord, _kind: RasterKind) -> Result<Raster, FetchError> {
    Ok(Raster::filled(0, 0, [0; 4]))
  }
}

#[test]
fn test_empty_raster_is_malformed() {
  let tile = TileCoord::new(5, 7, 5);
  for kind in [RasterKind::Elevation, RasterKind::Imagery] {
    let result = fetch_for_tile(&EmptyRaster, ZOOMS, tile, kind);
    assert!(matches!(result, Err(FetchError::Malformed(_))), "{:?}", kind);
  }
  // Composed imagery checks every sub-tile too.
  let deep = LayerZooms {
    imagery_zoom_offset: 2,
    ..ZOOMS
  };
  let result = fetch_for_tile(&EmptyRaster, deep, tile, RasterKind::Imagery);
  assert!(matches!(result, Err(FetchError::Malformed(_))));
}
