//! QuadTree - arena of nodes and edges rooted at one tile.
//!
//! Nodes and edges live in flat vectors and refer to each other by index.
//! Children are created on a node's first split and kept for its lifetime,
//! so a split after a merge reuses the same child nodes and edges.
//!
//! # Child Wiring
//!
//! ```text
//!        n0          n1
//!   ┌──────────┬──────────┐        parent edges N, S, E, W are halved:
//!   │          │          │          N → n0, n1    S → s0, s1
//! w0│    NW    v0   NE    │e0        W → w0, w1    E → e0, e1
//!   │          │          │
//!   ├─── h0 ───┼─── h1 ───┤        interior edges are created and halved:
//!   │          │          │          V (north → south) → v0, v1
//! w1│    SW    v1   SE    │e1        H (west → east)   → h0, h1
//!   │          │          │
//!   └──────────┴──────────┘
//!        s0          s1
//! ```

use glam::DVec2;
use smallvec::SmallVec;
use tracing::debug;

use super::config::{TerrainConfig, ZoomTable};
use super::edge::{EdgeGraph, EdgeId};
use super::node::{Children, LoadState, NodeEdges, NodeId, NodeState, QuadNode, Side};
use super::pool::MeshPool;
use super::snapshot::{seed_from_parent, snapshot_children};
use super::transition::TransitionGroup;
use crate::geodesy::point_to_tile;
use crate::mesh::MeshResource;

#[derive(Debug)]
pub struct QuadTree {
  nodes: Vec<QuadNode>,
  edges: EdgeGraph,
  zooms: ZoomTable,
  root: NodeId,
  max_zoom: u8,
}

impl QuadTree {
  /// Tree with a single hidden root at the tile containing the origin.
  pub fn new(config: &TerrainConfig) -> Self {
    let zooms = ZoomTable::new(config);
    let tile = point_to_tile(config.origin_lon, config.origin_lat, config.min_zoom);
    let center = zooms.tile_center(tile);
    let width = zooms.width(tile.z);

    let mut edges = EdgeGraph::new();
    let h = width * 0.5;
    let nw = center + DVec2::new(-h, -h);
    let ne = center + DVec2::new(h, -h);
    let sw = center + DVec2::new(-h, h);
    let se = center + DVec2::new(h, h);
    let node_edges = NodeEdges {
      north: edges.add(nw, ne),
      south: edges.add(sw, se),
      east: edges.add(ne, se),
      west: edges.add(nw, sw),
    };

    let root = QuadNode::new(tile, None, center, width, node_edges);
    Self {
      nodes: vec![root],
      edges,
      zooms,
      root: NodeId(0),
      max_zoom: config.max_zoom,
    }
  }

  #[inline]
  pub fn root(&self) -> NodeId {
    self.root
  }

  #[inline]
  pub fn node(&self, id: NodeId) -> &QuadNode {
    &self.nodes[id.index()]
  }

  #[inline]
  pub fn node_mut(&mut self, id: NodeId) -> &mut QuadNode {
    &mut self.nodes[id.index()]
  }

  /// Nodes ever materialized.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn edges(&self) -> &EdgeGraph {
    &self.edges
  }

  pub fn zooms(&self) -> &ZoomTable {
    &self.zooms
  }

  pub fn max_zoom(&self) -> u8 {
    self.max_zoom
  }

  pub fn iter(&self) -> impl Iterator<Item = (NodeId, &QuadNode)> {
    self
      .nodes
      .iter()
      .enumerate()
      .map(|(i, node)| (NodeId(i as u32), node))
  }

  pub fn visible_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
    self.iter().filter(|(_, n)| n.is_visible()).map(|(id, _)| id)
  }

  pub fn visible_count(&self) -> usize {
    self.nodes.iter().filter(|n| n.is_visible()).count()
  }

  #[inline]
  pub fn is_visible(&self, id: NodeId) -> bool {
    self.node(id).is_visible()
  }

  /// Work bound to `(id, generation)` may still write to the node.
  #[inline]
  pub fn is_live(&self, id: NodeId, generation: u32) -> bool {
    let node = self.node(id);
    node.is_visible() && node.generation == generation && node.mesh.is_some()
  }

  pub fn mesh(&self, id: NodeId) -> Option<&MeshResource> {
    self.node(id).mesh.as_ref()
  }

  pub fn mesh_mut(&mut self, id: NodeId) -> Option<&mut MeshResource> {
    self.node_mut(id).mesh.as_mut()
  }

  /// Make `id` visible: take a mesh, start a new generation, register on
  /// its edges. No-op if already visible.
  pub fn show(&mut self, id: NodeId, pool: &mut MeshPool) {
    if self.is_visible(id) {
      return;
    }
    let node = &mut self.nodes[id.index()];
    node.mesh = Some(pool.acquire(node.center, node.width));
    node.state = NodeState::Visible;
    node.generation = node.generation.wrapping_add(1);
    node.load = LoadState::Idle;
    let edges = node.edges.all();
    for edge in edges {
      self.edges.register(edge, id);
    }
  }

  /// Hide `id` and return its mesh to the pool.
  pub fn hide(&mut self, id: NodeId, pool: &mut MeshPool) {
    self.hide_as(id, NodeState::Hidden, pool);
  }

  fn hide_as(&mut self, id: NodeId, state: NodeState, pool: &mut MeshPool) {
    let node = &mut self.nodes[id.index()];
    if let Some(mesh) = node.mesh.take() {
      pool.release(mesh);
    }
    if node.state == NodeState::Visible {
      node.generation = node.generation.wrapping_add(1);
    }
    node.state = state;
  }

  /// Materialize the four children of `id` on first call; later calls
  /// return the same children.
  pub fn ensure_children(&mut self, id: NodeId) -> [NodeId; 4] {
    if let Children::Split(children) = self.node(id).children {
      return children;
    }

    let (tile, center, width, parent_edges) = {
      let node = self.node(id);
      (node.tile, node.center, node.width, node.edges)
    };
    assert!(
      tile.z < self.max_zoom,
      "cannot split {:?} at max zoom {}",
      tile,
      self.max_zoom
    );

    let [n0, n1] = self.edges.split(parent_edges.north);
    let [s0, s1] = self.edges.split(parent_edges.south);
    let [e0, e1] = self.edges.split(parent_edges.east);
    let [w0, w1] = self.edges.split(parent_edges.west);

    let h = width * 0.5;
    let vertical = self
      .edges
      .add(center + DVec2::new(0.0, -h), center + DVec2::new(0.0, h));
    let horizontal = self
      .edges
      .add(center + DVec2::new(-h, 0.0), center + DVec2::new(h, 0.0));
    let [v0, v1] = self.edges.split(vertical);
    let [h0, h1] = self.edges.split(horizontal);

    let wiring = [
      (n0, h0, w0, v0), // NW
      (n1, h1, v0, e0), // NE
      (h1, s1, v1, e1), // SE
      (h0, s0, w1, v1), // SW
    ];
    let q = width * 0.25;
    let offsets = [
      DVec2::new(-q, -q),
      DVec2::new(q, -q),
      DVec2::new(q, q),
      DVec2::new(-q, q),
    ];

    let tiles = tile.children();
    let first = self.nodes.len() as u32;
    let children = [
      NodeId(first),
      NodeId(first + 1),
      NodeId(first + 2),
      NodeId(first + 3),
    ];
    for k in 0..4 {
      let (north, south, west, east) = wiring[k];
      self.nodes.push(QuadNode::new(
        tiles[k],
        Some(id),
        center + offsets[k],
        h,
        NodeEdges {
          north,
          south,
          east,
          west,
        },
      ));
    }

    self.node_mut(id).children = Children::Split(children);
    children
  }

  /// Replace a visible node by its four children, each seeded with its
  /// quadrant of the parent's data when the parent has any.
  ///
  /// Returns `None` if `id` is not visible.
  pub fn split(&mut self, id: NodeId, pool: &mut MeshPool) -> Option<TransitionGroup> {
    if !self.is_visible(id) {
      return None;
    }
    let children = self.ensure_children(id);
    let parent_mesh = self.node_mut(id).mesh.take();
    self.hide_as(id, NodeState::Split, pool);
    for (quadrant, child) in children.into_iter().enumerate() {
      self.show(child, pool);
      if let (Some(parent), Some(mesh)) = (&parent_mesh, self.node_mut(child).mesh.as_mut()) {
        seed_from_parent(mesh, parent, quadrant);
      }
    }
    if let Some(mesh) = parent_mesh {
      pool.release(mesh);
    }
    debug!(tile = ?self.node(id).tile, "split");
    Some(TransitionGroup::split(id, children))
  }

  /// Replace four visible children by their parent, seeding the parent's
  /// mesh with a snapshot of the children's data.
  ///
  /// Returns `None` unless all four children are visible.
  pub fn merge(&mut self, parent: NodeId, pool: &mut MeshPool) -> Option<TransitionGroup> {
    let children = self.node(parent).child_ids()?;
    if !children.iter().all(|&c| self.is_visible(c)) {
      return None;
    }

    self.show(parent, pool);
    if let Some(mut mesh) = self.node_mut(parent).mesh.take() {
      let sources = children.map(|c| self.mesh(c));
      if let [Some(nw), Some(ne), Some(se), Some(sw)] = sources {
        snapshot_children(&mut mesh, [nw, ne, se, sw]);
      }
      self.node_mut(parent).mesh = Some(mesh);
    }

    for child in children {
      self.hide(child, pool);
    }
    debug!(tile = ?self.node(parent).tile, "merge");
    Some(TransitionGroup::merge(parent, children))
  }

  /// Visible neighbors across `side` of `id`, with the edge each holds.
  pub fn find_adjacents(&self, id: NodeId, side: Side) -> SmallVec<[(NodeId, EdgeId); 4]> {
    let edge = self.node(id).edges.get(side);
    self
      .edges
      .find_adjacents(edge, id, side.axis(), |n| self.is_visible(n))
  }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
