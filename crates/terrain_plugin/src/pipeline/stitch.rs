//! Boundary reconciliation between neighboring tiles.
//!
//! Every boundary sample a tile shares with another visible, loaded tile
//! (along an edge or only at a corner) takes the value of the tile that
//! outranks it:
//!
//! ```text
//! rank: lower zoom first, then lower node id
//!
//!   ┌─────────┬────┬────┐     A outranks everything it touches, so B, C
//!   │         │ B  │ C  │     and D read A's edge where they meet it.
//!   │    A    ├────┼────┤     B outranks C and D (same zoom, older id),
//!   │         │ D  │ E  │     so the corner they share with E is B's.
//!   └─────────┴────┴────┘
//! ```
//!
//! A coarser tile's boundary is linear between its samples, so a finer tile
//! reading it meets it without a crack. Because values only ever flow from
//! higher to lower rank, the result does not depend on load order: when a
//! tile reloads, every lower-ranked tile it touches re-reads its boundary,
//! highest rank first.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use glam::DVec2;
use smallvec::SmallVec;

use crate::mesh::boundary_ij;
use crate::quadtree::{Axis, NodeId, QuadTree, Side};

/// Fractional sample positions closer than this to a lattice point snap to it.
const LATTICE_EPSILON: f64 = 1e-6;

/// Contact tolerance, relative to tile width.
const CONTACT_EPSILON: f64 = 1e-6;

type Rank = (Reverse<u8>, Reverse<NodeId>);

#[inline]
fn rank(tree: &QuadTree, id: NodeId) -> Rank {
  (Reverse(tree.node(id).tile.z), Reverse(id))
}

#[inline]
fn along(p: DVec2, axis: Axis) -> f64 {
  match axis {
    Axis::X => p.x,
    Axis::Z => p.y,
  }
}

fn is_ready(tree: &QuadTree, id: NodeId) -> bool {
  tree.is_visible(id) && tree.mesh(id).is_some_and(|m| m.data_ready)
}

/// Value of a piecewise-linear boundary `values` spanning `[start, end]`
/// at coordinate `at`. Exact at lattice points.
pub fn interpolate_boundary(values: &[f32], start: f64, end: f64, at: f64) -> f32 {
  let d = (values.len() - 1) as f64;
  let t = ((at - start) / (end - start) * d).clamp(0.0, d);
  let k = t.floor();
  let frac = t - k;
  let k = k as usize;
  if frac < LATTICE_EPSILON || k + 1 >= values.len() {
    return values[k];
  }
  if frac > 1.0 - LATTICE_EPSILON {
    return values[k + 1];
  }
  (values[k] as f64 * (1.0 - frac) + values[k + 1] as f64 * frac) as f32
}

/// Ground position of the `k`-th sample along `side` of a tile.
fn boundary_point(min: DVec2, width: f64, side: Side, k: usize, d: usize) -> DVec2 {
  let (i, j) = boundary_ij(side, k, d);
  let step = width / d as f64;
  DVec2::new(min.x + i as f64 * step, min.y + j as f64 * step)
}

/// Snapshot of one outranking tile's boundary.
struct Source {
  min: DVec2,
  max: DVec2,
  tolerance: f64,
  /// Indexed by `Side`, in `Side::ALL` order.
  sides: [Vec<f32>; 4],
}

impl Source {
  fn new(tree: &QuadTree, id: NodeId) -> Option<Self> {
    let node = tree.node(id);
    let mesh = tree.mesh(id)?;
    let (min, max) = node.footprint();
    Some(Self {
      min,
      max,
      tolerance: node.width * CONTACT_EPSILON,
      sides: Side::ALL.map(|side| mesh.boundary(side)),
    })
  }

  /// Height of this boundary at `p`, if `p` lies on it.
  fn value_at(&self, p: DVec2) -> Option<f32> {
    let tol = self.tolerance;
    let on_x = p.x >= self.min.x - tol && p.x <= self.max.x + tol;
    let on_z = p.y >= self.min.y - tol && p.y <= self.max.y + tol;
    let side = if on_x && (p.y - self.min.y).abs() <= tol {
      Side::North
    } else if on_x && (p.y - self.max.y).abs() <= tol {
      Side::South
    } else if on_z && (p.x - self.max.x).abs() <= tol {
      Side::East
    } else if on_z && (p.x - self.min.x).abs() <= tol {
      Side::West
    } else {
      return None;
    };
    let values = &self.sides[side as usize];
    let axis = side.axis();
    let (start, end) = (along(self.min, axis), along(self.max, axis));
    Some(interpolate_boundary(values, start, end, along(p, axis)))
  }
}

/// Visible tiles other than `id` whose footprint touches `id`'s, along an
/// edge or only at a corner.
pub fn touching_tiles(tree: &QuadTree, id: NodeId) -> SmallVec<[NodeId; 16]> {
  let node = tree.node(id);
  let (min, max) = node.footprint();
  let tol = node.width * CONTACT_EPSILON;
  let touches = |other: NodeId| {
    let (omin, omax) = tree.node(other).footprint();
    omin.x <= max.x + tol && min.x <= omax.x + tol && omin.y <= max.y + tol && min.y <= omax.y + tol
  };

  let mut found: SmallVec<[NodeId; 16]> = SmallVec::new();
  for side in Side::ALL {
    for (neighbor, _) in tree.find_adjacents(id, side) {
      if !found.contains(&neighbor) {
        found.push(neighbor);
      }
      // Corner-only contacts are edge neighbors of an edge neighbor.
      for far_side in Side::ALL {
        for (other, _) in tree.find_adjacents(neighbor, far_side) {
          if other != id && !found.contains(&other) && touches(other) {
            found.push(other);
          }
        }
      }
    }
  }
  found
}

/// Overwrite the boundary samples of `id` that lie on a loaded, higher
/// ranked tile. Returns whether any sample changed.
fn pull_from_outranking(tree: &mut QuadTree, id: NodeId) -> bool {
  let own = rank(tree, id);
  let mut higher: SmallVec<[NodeId; 16]> = touching_tiles(tree, id)
    .into_iter()
    .filter(|&n| is_ready(tree, n) && rank(tree, n) > own)
    .collect();
  if higher.is_empty() {
    return false;
  }
  // Highest rank last, so it wins where sources overlap.
  higher.sort_by_key(|&n| rank(tree, n));
  let sources: Vec<Source> = higher.iter().filter_map(|&n| Source::new(tree, n)).collect();

  let node = tree.node(id);
  let (min, width) = (node.footprint().0, node.width);
  let Some(mesh) = tree.mesh_mut(id) else {
    return false;
  };
  let d = mesh.down_size();
  let mut changed = false;
  for side in Side::ALL {
    let before = mesh.boundary(side);
    let mut values = before.clone();
    for (k, value) in values.iter_mut().enumerate() {
      let p = boundary_point(min, width, side, k, d);
      for source in &sources {
        if let Some(v) = source.value_at(p) {
          *value = v;
        }
      }
    }
    if values != before {
      mesh.set_boundary(side, &values);
      changed = true;
    }
  }
  changed
}

/// Make `id` and every tile it touches agree on all shared boundary
/// samples.
///
/// Returns the other tiles whose heights were changed; the caller rebuilds
/// their geometry.
pub fn reconcile_edges(tree: &mut QuadTree, id: NodeId) -> SmallVec<[NodeId; 8]> {
  let mut touched = SmallVec::new();
  if !is_ready(tree, id) {
    return touched;
  }
  pull_from_outranking(tree, id);

  let mut queue: BinaryHeap<Rank> = BinaryHeap::new();
  let mut done: SmallVec<[NodeId; 16]> = SmallVec::new();
  let own = rank(tree, id);
  for n in touching_tiles(tree, id) {
    if is_ready(tree, n) && rank(tree, n) < own {
      queue.push(rank(tree, n));
    }
  }

  // Highest rank first: by the time a tile re-reads, everything above it
  // that will change this pass already has.
  while let Some((_, Reverse(n))) = queue.pop() {
    if done.contains(&n) {
      continue;
    }
    done.push(n);
    if !pull_from_outranking(tree, n) {
      continue;
    }
    touched.push(n);
    let r = rank(tree, n);
    for m in touching_tiles(tree, n) {
      if is_ready(tree, m) && rank(tree, m) < r && !done.contains(&m) {
        queue.push(rank(tree, m));
      }
    }
  }
  touched
}

/// Reconcile `id` with its neighbors and rebuild the geometry of every
/// tile whose heights may have changed.
pub fn stitch_tile(tree: &mut QuadTree, id: NodeId) {
  if !is_ready(tree, id) {
    return;
  }
  let touched = reconcile_edges(tree, id);
  for n in std::iter::once(id).chain(touched) {
    if let Some(mesh) = tree.mesh_mut(n) {
      mesh.rebuild_geometry();
    }
  }
}

/// Height of `id`'s boundary at ground point `p`, if `p` lies on it.
pub fn boundary_height_at(tree: &QuadTree, id: NodeId, p: DVec2) -> Option<f32> {
  Source::new(tree, id)?.value_at(p)
}

#[cfg(test)]
#[path = "stitch_test.rs"]
mod stitch_test;
