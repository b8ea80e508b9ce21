//! Bevy resources for terrain streaming.

use std::collections::HashMap;

use bevy::prelude::*;
use terrain_plugin::{ConfigError, FrameReport, NodeId, RasterSource, TerrainConfig, TerrainStreamer};

/// Streamer over a type-erased raster source.
pub type DynStreamer = TerrainStreamer<Box<dyn RasterSource>>;

#[derive(Resource)]
pub struct TerrainStreamerResource {
  pub streamer: DynStreamer,
}

impl TerrainStreamerResource {
  pub fn new(config: TerrainConfig, source: Box<dyn RasterSource>) -> Result<Self, ConfigError> {
    Ok(Self {
      streamer: TerrainStreamer::new(config, source)?,
    })
  }
}

/// Resource mapping quadtree nodes to their tile entities.
#[derive(Resource, Default)]
pub struct TileEntityMap {
  pub map: HashMap<NodeId, (Entity, u32)>,
}

impl TileEntityMap {
  pub fn insert(&mut self, node: NodeId, generation: u32, entity: Entity) {
    self.map.insert(node, (entity, generation));
  }

  pub fn remove(&mut self, node: NodeId) -> Option<Entity> {
    self.map.remove(&node).map(|(entity, _)| entity)
  }

  pub fn get(&self, node: NodeId) -> Option<Entity> {
    self.map.get(&node).map(|&(entity, _)| entity)
  }

  /// Entity for `node`, only if it was spawned for `generation`.
  pub fn get_current(&self, node: NodeId, generation: u32) -> Option<Entity> {
    match self.map.get(&node) {
      Some(&(entity, g)) if g == generation => Some(entity),
      _ => None,
    }
  }

  pub fn len(&self) -> usize {
    self.map.len()
  }

  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }
}

/// Report of the most recent streamer frame, for overlays and logging.
#[derive(Resource, Default)]
pub struct LastFrameReport(pub FrameReport);
