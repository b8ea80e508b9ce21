//! Quadtree of terrain tiles.
//!
//! The tree keeps explicit nodes: each visible node owns a pooled mesh and
//! is registered on the shared boundary edges its neighbors use for
//! stitching.
//!
//! # Module Structure
//!
//! - [`node`]: `QuadNode` and its state, children and edge slots
//! - [`edge`]: `EdgeGraph` - splittable boundary segments, neighbor search
//! - [`tree`]: `QuadTree` - node/edge arena, split and merge
//! - [`pool`]: `MeshPool` - free list of tile meshes
//! - [`config`]: `TerrainConfig`, `ZoomTable`
//! - [`refinement`]: per-frame split/merge decisions
//! - [`snapshot`]: parent data rebuilt from children on merge

pub mod bounds;
pub mod budget;
pub mod config;
pub mod edge;
pub mod node;
pub mod pool;
pub mod refinement;
pub mod snapshot;
pub mod transition;
pub mod tree;

// Re-exports
pub use bounds::{DAabb3, DFrustum};
pub use budget::{RefinementBudget, RefinementStats};
pub use config::{ConfigError, TerrainConfig, ZoomTable};
pub use edge::{Axis, Edge, EdgeGraph, EdgeId};
pub use node::{Children, LoadState, NodeEdges, NodeId, NodeState, QuadNode, Side};
pub use pool::MeshPool;
pub use refinement::{refine, RefinementOutput, Viewer};
pub use transition::{TransitionGroup, TransitionType};
pub use tree::QuadTree;
