use glam::DVec2;

use super::*;

fn config() -> TerrainConfig {
  TerrainConfig {
    min_zoom: 5,
    max_zoom: 8,
    down_size: 4,
    split_threshold: 1.5,
    merge_divisor: 2.0,
    budget: RefinementBudget::UNLIMITED,
    ..Default::default()
  }
}

fn setup(config: &TerrainConfig) -> (QuadTree, MeshPool) {
  let mut tree = QuadTree::new(config);
  let mut pool = MeshPool::new(config.down_size);
  let root = tree.root();
  tree.show(root, &mut pool);
  (tree, pool)
}

fn root_center(tree: &QuadTree) -> DVec2 {
  tree.node(tree.root()).center
}

#[test]
fn test_lod_distance_zero_over_tile() {
  let config = config();
  let (tree, _) = setup(&config);
  let c = root_center(&tree);
  let node = tree.node(tree.root());
  assert_eq!(lod_distance(node, DVec3::new(c.x, 5000.0, c.y), &config), 0.0);
  assert_eq!(
    angular_resolution(node, DVec3::new(c.x, 0.0, c.y), &config),
    f64::INFINITY
  );
}

#[test]
fn test_lod_distance_is_point_to_rect() {
  let config = config();
  let (tree, _) = setup(&config);
  let node = tree.node(tree.root());
  let c = root_center(&tree);
  let half = node.width * 0.5;
  let d = lod_distance(node, DVec3::new(c.x + half + 30.0, 0.0, c.y - half - 40.0), &config);
  assert!((d - 50.0).abs() < 1e-6);
}

#[test]
fn test_lod_distance_with_altitude() {
  let config = TerrainConfig {
    altitude_reference: Some(100.0),
    ..config()
  };
  let (tree, _) = setup(&config);
  let c = root_center(&tree);
  let node = tree.node(tree.root());
  let d = lod_distance(node, DVec3::new(c.x, 400.0, c.y), &config);
  assert!((d - 300.0).abs() < 1e-9);
}

#[test]
fn test_split_when_close() {
  let config = config();
  let (mut tree, mut pool) = setup(&config);
  let c = root_center(&tree);
  let out = refine(&mut tree, &mut pool, &Viewer::at(DVec3::new(c.x, 0.0, c.y)), &config);
  assert_eq!(out.stats.splits_performed, 1);
  assert_eq!(out.transitions.len(), 1);
  assert!(!tree.is_visible(tree.root()));
  assert_eq!(tree.visible_count(), 4);
}

#[test]
fn test_no_split_when_far() {
  let config = config();
  let (mut tree, mut pool) = setup(&config);
  let c = root_center(&tree);
  let width = tree.node(tree.root()).width;
  let far = DVec3::new(c.x + width * 10.0, 0.0, c.y);
  let out = refine(&mut tree, &mut pool, &Viewer::at(far), &config);
  assert_eq!(out.stats.total_transitions(), 0);
  assert_eq!(out.load_candidates, vec![tree.root()]);
}

#[test]
fn test_depth_capped_at_max_zoom() {
  let config = config();
  let (mut tree, mut pool) = setup(&config);
  let c = root_center(&tree);
  let viewer = Viewer::at(DVec3::new(c.x, 0.0, c.y));
  for _ in 0..10 {
    refine(&mut tree, &mut pool, &viewer, &config);
  }
  let deepest = tree
    .visible_nodes()
    .map(|id| tree.node(id).tile.z)
    .max()
    .unwrap();
  assert_eq!(deepest, config.max_zoom);
  assert_eq!(pool.created(), tree.visible_count() + pool.free_len());
}

#[test]
fn test_merge_when_viewer_leaves() {
  let config = config();
  let (mut tree, mut pool) = setup(&config);
  let c = root_center(&tree);
  let width = tree.node(tree.root()).width;
  refine(&mut tree, &mut pool, &Viewer::at(DVec3::new(c.x, 0.0, c.y)), &config);
  assert!(!tree.is_visible(tree.root()));

  let far = Viewer::at(DVec3::new(c.x + width * 100.0, 0.0, c.y));
  let out = refine(&mut tree, &mut pool, &far, &config);
  assert_eq!(out.stats.merges_performed, 1);
  assert!(tree.is_visible(tree.root()));
  assert_eq!(tree.visible_count(), 1);
}

/// Just past the split threshold: one split, then no oscillation.
#[test]
fn test_hysteresis_no_oscillation() {
  let config = config();
  let (mut tree, mut pool) = setup(&config);
  let root = tree.root();
  let c = root_center(&tree);
  let width = tree.node(root).width;
  let distance = width / (config.split_threshold * 1.0001);
  let viewer = Viewer::at(DVec3::new(c.x + width * 0.5 + distance, 0.0, c.y));

  let mut toggles = 0;
  let mut last = tree.node(root).state;
  for _ in 0..100 {
    refine(&mut tree, &mut pool, &viewer, &config);
    let state = tree.node(root).state;
    if state != last {
      toggles += 1;
      last = state;
    }
  }
  assert_eq!(toggles, 1);
  assert_eq!(last, NodeState::Split);
}

/// Exactly at the threshold the root never splits.
#[test]
fn test_hysteresis_at_threshold() {
  let config = config();
  let (mut tree, mut pool) = setup(&config);
  let root = tree.root();
  let c = root_center(&tree);
  let width = tree.node(root).width;
  let viewer = Viewer::at(DVec3::new(c.x, 0.0, c.y - width * 0.5 - width / config.split_threshold));

  let mut toggles = 0;
  let mut last = tree.node(root).state;
  for _ in 0..100 {
    refine(&mut tree, &mut pool, &viewer, &config);
    if tree.node(root).state != last {
      toggles += 1;
      last = tree.node(root).state;
    }
  }
  assert!(toggles <= 1);
}

#[test]
fn test_budget_limits_splits_per_frame() {
  let config = TerrainConfig {
    budget: RefinementBudget {
      max_splits: 1,
      max_merges: 0,
    },
    ..config()
  };
  let (mut tree, mut pool) = setup(&config);
  let c = root_center(&tree);
  let width = tree.node(tree.root()).width;
  // Over the root's center: all four children want to split next frame.
  let viewer = Viewer::at(DVec3::new(c.x, width * 0.01, c.y));
  refine(&mut tree, &mut pool, &viewer, &config);
  let out = refine(&mut tree, &mut pool, &viewer, &config);
  assert_eq!(out.stats.splits_performed, 1);
}

#[test]
fn test_frustum_blocks_split_behind_camera() {
  let config = config();
  let (mut tree, mut pool) = setup(&config);
  let c = root_center(&tree);
  let width = tree.node(tree.root()).width;
  // Just south of the tile, looking further south.
  let eye = DVec3::new(c.x, 10.0, c.y + width * 0.5 + 1.0);
  let view = DMat4::look_at_rh(eye, eye + DVec3::Z, DVec3::Y);
  let proj = DMat4::perspective_rh(1.0, 1.0, 0.1, 1.0e6);
  let viewer = Viewer {
    position: eye,
    view_projection: Some(proj * view),
  };
  let out = refine(&mut tree, &mut pool, &viewer, &config);
  assert_eq!(out.stats.splits_performed, 0);

  // Turning around allows the split.
  let view = DMat4::look_at_rh(eye, eye - DVec3::Z, DVec3::Y);
  let viewer = Viewer {
    position: eye,
    view_projection: Some(proj * view),
  };
  let out = refine(&mut tree, &mut pool, &viewer, &config);
  assert_eq!(out.stats.splits_performed, 1);
}
