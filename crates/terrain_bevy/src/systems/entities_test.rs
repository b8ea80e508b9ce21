//! Tile sync tests.
//!
//! Runs the entity diff against a real streamer without a Bevy runtime,
//! tracking spawned entities in a plain map to catch orphans and
//! duplicates.

use std::collections::HashMap;

use bevy::math::{DVec2, DVec3};
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use terrain_plugin::fetch::FetchMode;
use terrain_plugin::quadtree::MeshPool;
use terrain_plugin::{
  ImageryTexture, NodeId, ProceduralSource, RefinementBudget, TerrainConfig, TerrainStreamer,
  Viewer,
};

use super::*;

fn state(node: u32, generation: u32, revision: u64) -> TileState {
  TileState {
    node: NodeId(node),
    generation,
    revision,
  }
}

fn entity(n: u64) -> Entity {
  Entity::from_bits(n)
}

#[test]
fn test_new_tiles_spawn() {
  let map = TileEntityMap::default();
  let tiles = [state(1, 1, 3), state(2, 1, 3)];
  let plan = plan_tile_sync(&tiles, &map, |_| None);
  assert_eq!(plan.spawn, tiles.to_vec());
  assert!(plan.refresh.is_empty());
  assert!(plan.despawn.is_empty());
}

#[test]
fn test_in_sync_is_noop() {
  let mut map = TileEntityMap::default();
  map.insert(NodeId(1), 1, entity(10));
  let plan = plan_tile_sync(&[state(1, 1, 3)], &map, |_| Some(3));
  assert_eq!(plan, TileSyncPlan::default());
}

#[test]
fn test_revision_change_refreshes() {
  let mut map = TileEntityMap::default();
  map.insert(NodeId(1), 1, entity(10));
  let plan = plan_tile_sync(&[state(1, 1, 4)], &map, |_| Some(3));
  assert_eq!(plan.refresh, vec![(entity(10), state(1, 1, 4))]);
  assert!(plan.spawn.is_empty());
}

#[test]
fn test_hidden_node_despawns() {
  let mut map = TileEntityMap::default();
  map.insert(NodeId(1), 1, entity(10));
  map.insert(NodeId(2), 1, entity(11));
  let plan = plan_tile_sync(&[state(2, 1, 0)], &map, |_| Some(0));
  assert_eq!(plan.despawn, vec![(NodeId(1), entity(10))]);
}

/// A node hidden and shown again between frames keeps its id but gets a
/// new generation; the old entity must go and a new one come.
#[test]
fn test_reshown_node_respawns() {
  let mut map = TileEntityMap::default();
  map.insert(NodeId(1), 1, entity(10));
  let plan = plan_tile_sync(&[state(1, 2, 0)], &map, |_| Some(0));
  assert_eq!(plan.despawn, vec![(NodeId(1), entity(10))]);
  assert_eq!(plan.spawn, vec![state(1, 2, 0)]);
}

#[test]
fn test_tile_mesh_conversion() {
  let mut pool = MeshPool::new(4);
  let resource = pool.acquire(DVec2::new(100.0, -50.0), 64.0);
  let mesh = tile_mesh_to_bevy(&resource);
  assert_eq!(mesh.count_vertices(), 25);
  assert_eq!(mesh.indices().map(|i| i.len()), Some(4 * 4 * 6));
  assert!(mesh.attribute(Mesh::ATTRIBUTE_UV_0).is_some());
  assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
}

#[test]
fn test_imagery_conversion() {
  let imagery = ImageryTexture {
    width: 2,
    height: 3,
    rgba: vec![128; 2 * 3 * 4],
  };
  let image = imagery_to_image(&imagery);
  assert_eq!(image.width(), 2);
  assert_eq!(image.height(), 3);
  assert_eq!(image.texture_descriptor.format, TextureFormat::Rgba8UnormSrgb);
}

/// Mirror of the spawned entities: node -> (entity, generation, revision).
#[derive(Default)]
struct MockTiles {
  map: TileEntityMap,
  revisions: HashMap<Entity, u64>,
  next: u64,
  spawned: usize,
  despawned: usize,
}

impl MockTiles {
  fn apply(&mut self, plan: TileSyncPlan) {
    for (node, e) in plan.despawn {
      assert_eq!(self.map.remove(node), Some(e));
      assert!(self.revisions.remove(&e).is_some(), "despawned unknown entity");
      self.despawned += 1;
    }
    for (e, s) in plan.refresh {
      assert!(self.revisions.insert(e, s.revision).is_some());
    }
    for s in plan.spawn {
      assert!(self.map.get_current(s.node, s.generation).is_none(), "duplicate spawn");
      self.next += 1;
      let e = entity(self.next);
      self.map.insert(s.node, s.generation, e);
      self.revisions.insert(e, s.revision);
      self.spawned += 1;
    }
  }
}

fn loaded_tiles<S: terrain_plugin::RasterSource>(s: &TerrainStreamer<S>) -> Vec<TileState> {
  s.visible_nodes()
    .into_iter()
    .filter_map(|id| {
      let mesh = s.mesh(id).filter(|m| m.data_ready)?;
      Some(TileState {
        node: id,
        generation: s.tree().node(id).generation,
        revision: mesh.revision,
      })
    })
    .collect()
}

#[test]
fn test_entities_track_streamer() {
  let config = TerrainConfig {
    min_zoom: 5,
    max_zoom: 8,
    down_size: 4,
    budget: RefinementBudget::UNLIMITED,
    fetch_mode: FetchMode::Immediate,
    steps_per_frame: 4,
    ..Default::default()
  };
  let source = ProceduralSource::new(|lon: f64, lat: f64| 800.0 + 5.0 * (lon - lat)).with_tile_size(8);
  let mut streamer = TerrainStreamer::new(config, source).unwrap();
  let root = streamer.root();
  let c = streamer.tree().node(root).center;
  let w = streamer.tree().node(root).width;

  let mut rng = StdRng::seed_from_u64(9);
  let mut mock = MockTiles::default();

  for _ in 0..120 {
    let x = c.x + rng.random_range(-0.5..0.5) * w;
    let z = c.y + rng.random_range(-0.5..0.5) * w;
    streamer.update(&Viewer::at(DVec3::new(x, 200.0, z)));

    let tiles = loaded_tiles(&streamer);
    let plan = plan_tile_sync(&tiles, &mock.map, |e| mock.revisions.get(&e).copied());
    mock.apply(plan);

    // Exactly one entity per loaded visible tile, at its current revision.
    assert_eq!(mock.map.len(), tiles.len());
    for t in &tiles {
      let e = mock.map.get_current(t.node, t.generation).unwrap();
      assert_eq!(mock.revisions[&e], t.revision);
    }
  }

  assert!(mock.spawned > 4);
  assert!(mock.despawned > 0);
}

/// Once the root tile has loaded, the presented tiles cover the whole root
/// footprint on every frame, including the frames where tiles split.
#[test]
fn test_presented_tiles_cover_root_across_splits() {
  let config = TerrainConfig {
    min_zoom: 5,
    max_zoom: 8,
    down_size: 4,
    budget: RefinementBudget::UNLIMITED,
    fetch_mode: FetchMode::Immediate,
    ..Default::default()
  };
  let source = ProceduralSource::new(|lon: f64, lat: f64| 300.0 + 2.0 * (lon + lat)).with_tile_size(8);
  let mut streamer = TerrainStreamer::new(config, source).unwrap();
  let root = streamer.root();
  let c = streamer.tree().node(root).center;
  let w = streamer.tree().node(root).width;

  // Load the root alone, far from the camera path below.
  streamer.start_pending_loads();
  for _ in 0..64 {
    streamer.pump(16);
  }
  assert!(streamer.mesh(root).is_some_and(|m| m.data_ready));

  let mut mock = MockTiles::default();
  let mut rng = StdRng::seed_from_u64(3);
  let root_area = w * w;
  for _ in 0..60 {
    let x = c.x + rng.random_range(-0.5..0.5) * w;
    let z = c.y + rng.random_range(-0.5..0.5) * w;
    streamer.update(&Viewer::at(DVec3::new(x, 150.0, z)));

    let tiles = loaded_tiles(&streamer);
    mock.apply(plan_tile_sync(&tiles, &mock.map, |e| mock.revisions.get(&e).copied()));

    let covered: f64 = tiles
      .iter()
      .map(|t| streamer.tree().node(t.node).width.powi(2))
      .sum();
    assert!(
      (covered - root_area).abs() <= root_area * 1e-9,
      "presented {} of {}",
      covered,
      root_area
    );
  }
  assert!(mock.spawned > 4);
}
