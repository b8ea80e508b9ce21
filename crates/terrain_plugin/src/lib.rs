//! terrain_plugin - Framework/engine independent terrain tile streaming
//!
//! Streams a tiled, Web-Mercator terrain around a moving viewer. Tiles are
//! kept in a quadtree that splits near the camera and merges away from it;
//! each visible tile owns a pooled height mesh filled from an elevation
//! raster and painted with an imagery raster.
//!
//! # Features
//!
//! - **Tile math**: lon/lat ↔ tile conversions, quadkeys, bbox helpers
//! - **Elevation decoding**: RGB-packed rasters to curvature-corrected heights
//! - **Quadtree LOD**: screen-angle split/merge with hysteresis and budgets
//! - **Crack-free borders**: boundary edges shared between neighbors, every
//!   shared sample taken from the coarser (or older) tile
//! - **Frame-spread pipeline**: each tile's work advanced one stage per step
//!
//! # Example
//!
//! ```ignore
//! use terrain_plugin::{ProceduralSource, TerrainConfig, TerrainStreamer, Viewer};
//!
//! let source = ProceduralSource::new(|lon, lat| 500.0 + 10.0 * (lon + lat));
//! let mut streamer = TerrainStreamer::new(TerrainConfig::default(), source)?;
//!
//! let report = streamer.update(&Viewer::at(camera_position));
//! for id in streamer.visible_nodes() {
//!     let mesh = streamer.mesh(id).unwrap();
//!     // upload mesh.positions / mesh.normals / mesh.indices ...
//! }
//! ```

pub mod constants;
pub mod elevation;
pub mod geodesy;
pub mod mesh;
pub mod raster;
pub mod source;

// Re-export commonly used items
pub use constants::{DEFAULT_DOWN_SIZE, EARTH_RADIUS_M, MAX_TILE_ZOOM};
pub use elevation::{curvature_drop, decode_elevation, encode_elevation};
pub use geodesy::TileCoord;
pub use mesh::{ImageryTexture, MeshResource, MinMaxAABB};
pub use raster::{Raster, RasterWindow};
pub use source::{FetchError, ProceduralSource, RasterKind, RasterSource};

// Background raster fetching
pub mod fetch;
pub use fetch::{FetchMode, LayerZooms, TileFetcher};

// Quadtree of tiles and its boundary edges
pub mod quadtree;
pub use quadtree::{
  ConfigError, LoadState, NodeId, NodeState, QuadTree, RefinementBudget, TerrainConfig, Viewer,
};

// Per-tile staged work
pub mod pipeline;

// Per-frame driver
pub mod streamer;
pub use streamer::{FrameReport, TerrainStreamer};
