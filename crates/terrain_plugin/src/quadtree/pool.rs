//! Mesh pool - free list of reusable tile meshes.
//!
//! Only the update pass touches the pool, so it needs no locking.
//! Every resource ever created is either held by a visible node or sits in
//! the free list:
//!
//! ```text
//! created() == visible nodes + free_len()
//! ```

use std::sync::Arc;

use glam::DVec2;

use crate::mesh::{grid_indices, MeshResource};

#[derive(Debug)]
pub struct MeshPool {
  free: Vec<MeshResource>,
  down_size: usize,
  indices: Arc<[u32]>,
  created: usize,
}

impl MeshPool {
  pub fn new(down_size: usize) -> Self {
    Self {
      free: Vec::new(),
      down_size,
      indices: grid_indices(down_size).into(),
      created: 0,
    }
  }

  /// Hand out a mesh positioned for a tile, creating one on a pool miss.
  pub fn acquire(&mut self, center: DVec2, width: f64) -> MeshResource {
    let mut mesh = match self.free.pop() {
      Some(mesh) => mesh,
      None => {
        self.created += 1;
        MeshResource::new(self.down_size, Arc::clone(&self.indices))
      }
    };
    mesh.reuse(center, width);
    mesh
  }

  pub fn release(&mut self, mut mesh: MeshResource) {
    mesh.remove();
    self.free.push(mesh);
  }

  pub fn free_len(&self) -> usize {
    self.free.len()
  }

  /// Total resources ever constructed.
  pub fn created(&self) -> usize {
    self.created
  }

  pub fn down_size(&self) -> usize {
    self.down_size
  }
}
