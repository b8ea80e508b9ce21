//! Edge graph - shareable, splittable tile boundary segments.
//!
//! Every side of every node is an [`Edge`]. Two nodes that touch along a
//! full side share one edge; a node next to a finer neighbor holds an edge
//! whose split history contains the neighbor's edges. Walking to the root of
//! an edge's split history and back down finds every node bordering it, at
//! any depth.
//!
//! # Orientation
//!
//! ```text
//!        A ──────────────► B        north/south edges run west → east (+x)
//!
//!        A                          east/west edges run north → south (+z)
//!        │
//!        ▼
//!        B
//! ```
//!
//! `children[0]` is always the half touching `A`.

use glam::DVec2;
use smallvec::SmallVec;

use super::node::NodeId;

/// Tolerance for span overlap, in world units.
const SPAN_EPSILON: f64 = 1e-6;

/// Index of an edge in the graph arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

/// Ground axis an edge runs along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
  /// East-west.
  X,
  /// North-south.
  Z,
}

#[derive(Clone, Debug)]
pub struct Edge {
  pub a: DVec2,
  pub b: DVec2,
  pub parent: Option<EdgeId>,
  pub children: Option<[EdgeId; 2]>,
  /// Nodes that have this exact segment as a side. Hidden nodes stay
  /// registered and are filtered at query time.
  pub owners: SmallVec<[NodeId; 2]>,
}

impl Edge {
  #[inline]
  pub fn length(&self) -> f64 {
    self.a.distance(self.b)
  }

  #[inline]
  pub fn midpoint(&self) -> DVec2 {
    (self.a + self.b) * 0.5
  }

  #[inline]
  pub fn is_split(&self) -> bool {
    self.children.is_some()
  }

  /// Extent along `axis` as `(min, max)`.
  #[inline]
  pub fn span(&self, axis: Axis) -> (f64, f64) {
    let (a, b) = match axis {
      Axis::X => (self.a.x, self.b.x),
      Axis::Z => (self.a.y, self.b.y),
    };
    (a.min(b), a.max(b))
  }
}

/// Strict overlap of two closed intervals; touching end to end does not count.
#[inline]
pub fn spans_overlap(a: (f64, f64), b: (f64, f64)) -> bool {
  a.0.max(b.0) < a.1.min(b.1) - SPAN_EPSILON
}

/// Arena of all edges ever created.
#[derive(Debug, Default)]
pub struct EdgeGraph {
  edges: Vec<Edge>,
}

impl EdgeGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.edges.len()
  }

  pub fn is_empty(&self) -> bool {
    self.edges.is_empty()
  }

  #[inline]
  pub fn get(&self, id: EdgeId) -> &Edge {
    &self.edges[id.0 as usize]
  }

  pub fn add(&mut self, a: DVec2, b: DVec2) -> EdgeId {
    self.push(a, b, None)
  }

  fn push(&mut self, a: DVec2, b: DVec2, parent: Option<EdgeId>) -> EdgeId {
    let id = EdgeId(self.edges.len() as u32);
    self.edges.push(Edge {
      a,
      b,
      parent,
      children: None,
      owners: SmallVec::new(),
    });
    id
  }

  /// Bisect `id` at its midpoint. Idempotent: a split edge returns its
  /// existing halves.
  pub fn split(&mut self, id: EdgeId) -> [EdgeId; 2] {
    if let Some(children) = self.get(id).children {
      return children;
    }
    let (a, b, mid) = {
      let edge = self.get(id);
      (edge.a, edge.b, edge.midpoint())
    };
    let first = self.push(a, mid, Some(id));
    let second = self.push(mid, b, Some(id));
    self.edges[id.0 as usize].children = Some([first, second]);
    [first, second]
  }

  /// Record `node` as an owner of `id`.
  pub fn register(&mut self, id: EdgeId, node: NodeId) {
    let owners = &mut self.edges[id.0 as usize].owners;
    if !owners.contains(&node) {
      owners.push(node);
    }
  }

  /// Oldest ancestor in `id`'s split history.
  pub fn root_of(&self, mut id: EdgeId) -> EdgeId {
    while let Some(parent) = self.get(id).parent {
      id = parent;
    }
    id
  }

  /// Visible nodes bordering `node` across `edge`, with the edge each one
  /// holds.
  ///
  /// Searches the whole split history of `edge`, so coarser and finer
  /// neighbors are found alike. Only owners whose edge overlaps `edge`
  /// along `axis` are kept.
  pub fn find_adjacents(
    &self,
    edge: EdgeId,
    node: NodeId,
    axis: Axis,
    is_visible: impl Fn(NodeId) -> bool,
  ) -> SmallVec<[(NodeId, EdgeId); 4]> {
    let target = self.get(edge).span(axis);
    let mut found = SmallVec::new();
    let mut stack: SmallVec<[EdgeId; 16]> = SmallVec::new();
    stack.push(self.root_of(edge));

    while let Some(id) = stack.pop() {
      let current = self.get(id);
      if !spans_overlap(current.span(axis), target) {
        continue;
      }
      for &owner in &current.owners {
        if owner != node && is_visible(owner) {
          found.push((owner, id));
        }
      }
      if let Some(children) = current.children {
        stack.extend(children);
      }
    }
    found
  }
}

#[cfg(test)]
#[path = "edge_test.rs"]
mod edge_test;
