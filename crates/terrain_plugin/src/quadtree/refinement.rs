//! Per-frame refinement: decide which visible nodes split or merge.
//!
//! The tree is walked from the root. Split nodes recurse into their
//! children; a visible node either splits, merges its parent, or asks for
//! its tile data.
//!
//! # Hysteresis
//!
//! A node splits when `width / distance > T` and four siblings merge when
//! each has `width / distance < T / k`. Right after a split the child
//! nearest the viewer sits at half its parent's ratio, so with `k >= 2` a
//! fresh split can never merge back without the viewer moving.

use glam::{DMat4, DVec3};

use super::bounds::{DAabb3, DFrustum};
use super::budget::{RefinementBudget, RefinementStats};
use super::config::TerrainConfig;
use super::node::{LoadState, NodeId, NodeState, QuadNode};
use super::pool::MeshPool;
use super::transition::TransitionGroup;
use super::tree::QuadTree;

/// Camera state read once per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewer {
  pub position: DVec3,
  /// Enables frustum culling of splits when present.
  pub view_projection: Option<DMat4>,
}

impl Viewer {
  pub fn at(position: DVec3) -> Self {
    Self {
      position,
      view_projection: None,
    }
  }
}

#[derive(Debug, Default)]
pub struct RefinementOutput {
  pub transitions: Vec<TransitionGroup>,
  pub stats: RefinementStats,
  /// Visible nodes whose data has not been requested.
  pub load_candidates: Vec<NodeId>,
}

/// Distance used for LOD: ground distance to the footprint, combined with
/// the viewer's height above `altitude_reference` when configured.
pub fn lod_distance(node: &QuadNode, viewer: DVec3, config: &TerrainConfig) -> f64 {
  let (min, max) = node.footprint();
  let ground = DAabb3::from_footprint(min, max, (0.0, 0.0)).distance_xz(viewer);
  match config.altitude_reference {
    Some(reference) => ground.hypot(viewer.y - reference),
    None => ground,
  }
}

/// `width / distance`; infinite when the viewer is over the tile.
#[inline]
pub fn angular_resolution(node: &QuadNode, viewer: DVec3, config: &TerrainConfig) -> f64 {
  let distance = lod_distance(node, viewer, config);
  if distance <= 0.0 {
    f64::INFINITY
  } else {
    node.width / distance
  }
}

fn node_aabb(node: &QuadNode, config: &TerrainConfig) -> DAabb3 {
  let (min, max) = node.footprint();
  let heights = match &node.mesh {
    Some(mesh) if mesh.data_ready && mesh.bounds.is_valid() => {
      (mesh.bounds.min[1] as f64, mesh.bounds.max[1] as f64)
    }
    _ => config.cull_height_range,
  };
  DAabb3::from_footprint(min, max, heights)
}

pub fn should_split(
  tree: &QuadTree,
  id: NodeId,
  viewer: DVec3,
  frustum: Option<&DFrustum>,
  config: &TerrainConfig,
) -> bool {
  let node = tree.node(id);
  if !node.is_visible() || node.tile.z >= config.max_zoom {
    return false;
  }
  if angular_resolution(node, viewer, config) <= config.split_threshold {
    return false;
  }
  frustum.map_or(true, |f| f.intersects_aabb(&node_aabb(node, config)))
}

/// All four children of `parent` are visible and coarse enough to merge.
pub fn should_merge(tree: &QuadTree, parent: NodeId, viewer: DVec3, config: &TerrainConfig) -> bool {
  let Some(children) = tree.node(parent).child_ids() else {
    return false;
  };
  let threshold = config.merge_threshold();
  children.iter().all(|&c| {
    let child = tree.node(c);
    child.is_visible() && angular_resolution(child, viewer, config) < threshold
  })
}

struct Pass<'a> {
  tree: &'a mut QuadTree,
  pool: &'a mut MeshPool,
  config: &'a TerrainConfig,
  budget: RefinementBudget,
  viewer: DVec3,
  frustum: Option<DFrustum>,
  out: RefinementOutput,
}

impl Pass<'_> {
  fn visit(&mut self, id: NodeId) {
    match self.tree.node(id).state {
      NodeState::Hidden => {}
      NodeState::Split => {
        if let Some(children) = self.tree.node(id).child_ids() {
          for child in children {
            self.visit(child);
          }
        }
      }
      NodeState::Visible => self.visit_visible(id),
    }
  }

  fn visit_visible(&mut self, id: NodeId) {
    if self.budget.can_split(self.out.stats.splits_performed)
      && should_split(self.tree, id, self.viewer, self.frustum.as_ref(), self.config)
    {
      if let Some(group) = self.tree.split(id, self.pool) {
        self.out.stats.splits_performed += 1;
        self.out.transitions.push(group);
        return;
      }
    }

    if let Some(parent) = self.tree.node(id).parent {
      if self.budget.can_merge(self.out.stats.merges_performed)
        && should_merge(self.tree, parent, self.viewer, self.config)
      {
        if let Some(group) = self.tree.merge(parent, self.pool) {
          self.out.stats.merges_performed += 1;
          self.out.transitions.push(group);
          return;
        }
      }
    }

    if self.tree.node(id).load == LoadState::Idle {
      self.out.load_candidates.push(id);
    }
  }
}

/// Run one refinement pass over the tree, applying splits and merges.
#[tracing::instrument(skip_all, name = "quadtree::refine")]
pub fn refine(
  tree: &mut QuadTree,
  pool: &mut MeshPool,
  viewer: &Viewer,
  config: &TerrainConfig,
) -> RefinementOutput {
  let root = tree.root();
  let mut pass = Pass {
    tree,
    pool,
    config,
    budget: config.budget,
    viewer: viewer.position,
    frustum: viewer.view_projection.map(DFrustum::from_view_projection),
    out: RefinementOutput::default(),
  };
  pass.visit(root);
  pass.out
}

#[cfg(test)]
#[path = "refinement_test.rs"]
mod refinement_test;
