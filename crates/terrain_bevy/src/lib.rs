//! Bevy presentation layer for terrain_plugin.
//!
//! This crate drives a [`TerrainStreamer`](terrain_plugin::TerrainStreamer)
//! from a viewer entity and mirrors its visible tiles as mesh entities.
//!
//! The streamer itself is inserted by the app, since it owns the raster
//! source:
//!
//! ```ignore
//! app.add_plugins(TerrainBevyPlugin)
//!   .insert_resource(TerrainStreamerResource::new(config, Box::new(source))?);
//! ```

pub mod components;
pub mod resources;
pub mod systems;

use bevy::prelude::*;
pub use components::*;
pub use resources::*;

/// Bevy plugin for streamed terrain tiles.
pub struct TerrainBevyPlugin;

impl Plugin for TerrainBevyPlugin {
  fn build(&self, app: &mut App) {
    app
      .init_resource::<TileEntityMap>()
      .init_resource::<LastFrameReport>()
      .add_systems(
        Update,
        (
          systems::drive::drive_terrain_streamer,
          systems::entities::sync_tile_entities,
        )
          .chain()
          .run_if(resource_exists::<TerrainStreamerResource>),
      );
  }
}
