//! QuadNode - one cell of the adaptive quadtree, stored in the tree arena.

use glam::DVec2;

use super::edge::{Axis, EdgeId};
use crate::geodesy::TileCoord;
use crate::mesh::MeshResource;

/// Index of a node in the quadtree arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// Display state of a node.
///
/// ```text
///            show()              split()
///   Hidden ─────────► Visible ──────────► Split
///     ▲                  │  ▲               │
///     └──── hide() ──────┘  └─── merge() ───┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NodeState {
  #[default]
  Hidden,
  Visible,
  /// Hidden because its four children are showing instead.
  Split,
}

/// Children slot: all four or none.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Children {
  #[default]
  Leaf,
  /// NW, NE, SE, SW.
  Split([NodeId; 4]),
}

/// Progress of the node's tile data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LoadState {
  /// Nothing requested for the current generation.
  #[default]
  Idle,
  /// Fetch requested or pipeline task running.
  Pending,
  Loaded,
  /// Last fetch failed. Retried when the node is shown again.
  Failed,
}

/// Cardinal side of a square tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
  North,
  South,
  East,
  West,
}

impl Side {
  pub const ALL: [Side; 4] = [Side::North, Side::South, Side::East, Side::West];

  /// Axis the side's edge runs along.
  #[inline]
  pub fn axis(self) -> Axis {
    match self {
      Side::North | Side::South => Axis::X,
      Side::East | Side::West => Axis::Z,
    }
  }

  #[inline]
  pub fn opposite(self) -> Side {
    match self {
      Side::North => Side::South,
      Side::South => Side::North,
      Side::East => Side::West,
      Side::West => Side::East,
    }
  }
}

/// The four boundary edges of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeEdges {
  pub north: EdgeId,
  pub south: EdgeId,
  pub east: EdgeId,
  pub west: EdgeId,
}

impl NodeEdges {
  #[inline]
  pub fn get(&self, side: Side) -> EdgeId {
    match side {
      Side::North => self.north,
      Side::South => self.south,
      Side::East => self.east,
      Side::West => self.west,
    }
  }

  pub fn all(&self) -> [EdgeId; 4] {
    [self.north, self.south, self.east, self.west]
  }
}

/// A node of the quadtree.
///
/// `center` is on the ground plane: `x` east, `y` holds world `z` (south).
#[derive(Debug)]
pub struct QuadNode {
  pub tile: TileCoord,
  pub parent: Option<NodeId>,
  pub children: Children,
  pub center: DVec2,
  pub width: f64,
  pub state: NodeState,
  pub edges: NodeEdges,
  /// Present iff `state == Visible`.
  pub mesh: Option<MeshResource>,
  pub load: LoadState,
  /// Bumped on every show and hide; pipeline work for an older generation
  /// is stale.
  pub generation: u32,
}

impl QuadNode {
  pub fn new(
    tile: TileCoord,
    parent: Option<NodeId>,
    center: DVec2,
    width: f64,
    edges: NodeEdges,
  ) -> Self {
    Self {
      tile,
      parent,
      children: Children::Leaf,
      center,
      width,
      state: NodeState::Hidden,
      edges,
      mesh: None,
      load: LoadState::Idle,
      generation: 0,
    }
  }

  #[inline]
  pub fn is_visible(&self) -> bool {
    self.state == NodeState::Visible
  }

  /// Children have been materialized at least once.
  #[inline]
  pub fn split_already(&self) -> bool {
    matches!(self.children, Children::Split(_))
  }

  #[inline]
  pub fn child_ids(&self) -> Option<[NodeId; 4]> {
    match self.children {
      Children::Split(ids) => Some(ids),
      Children::Leaf => None,
    }
  }

  /// Ground footprint as `(min, max)` corners.
  #[inline]
  pub fn footprint(&self) -> (DVec2, DVec2) {
    let half = DVec2::splat(self.width * 0.5);
    (self.center - half, self.center + half)
  }

  /// Ground span of this node along `axis`.
  #[inline]
  pub fn span(&self, axis: Axis) -> (f64, f64) {
    let half = self.width * 0.5;
    let c = match axis {
      Axis::X => self.center.x,
      Axis::Z => self.center.y,
    };
    (c - half, c + half)
  }
}
