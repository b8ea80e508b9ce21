//! MeshResource - pooled per-tile geometry, height buffer and imagery.
//!
//! Every tile carries the same `(D + 1)²` grid regardless of zoom, so a
//! resource released by one tile can be handed to any other. Heights are
//! stored curvature-corrected; vertex positions are relative to the tile
//! center (`translation`).
//!
//! # Triangulation
//!
//! ```text
//!   v00 ──── v10        v00 = (i, j)      v10 = (i + 1, j)
//!    │ ╲      │         v01 = (i, j + 1)  v11 = (i + 1, j + 1)
//!    │   ╲    │
//!    │     ╲  │         (v00, v01, v10) and (v10, v01, v11), both facing +Y
//!   v01 ──── v11
//! ```

use std::sync::Arc;

use glam::{DVec2, DVec3, Vec3};

use crate::constants::{sample_count, sample_index, samples_per_edge};
use crate::elevation::curvature_drop;
use crate::quadtree::Side;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: [f32; 3],
  pub max: [f32; 3],
}

impl MinMaxAABB {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: [f32::INFINITY; 3],
      max: [f32::NEG_INFINITY; 3],
    }
  }

  #[inline]
  pub fn encapsulate(&mut self, point: [f32; 3]) {
    for i in 0..3 {
      self.min[i] = self.min[i].min(point[i]);
      self.max[i] = self.max[i].max(point[i]);
    }
  }

  pub fn is_valid(&self) -> bool {
    self.min[0] <= self.max[0] && self.min[1] <= self.max[1] && self.min[2] <= self.max[2]
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

/// RGBA8 texture painted over a tile.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageryTexture {
  pub width: u32,
  pub height: u32,
  pub rgba: Vec<u8>,
}

/// Index buffer shared by every mesh with `down_size` quads per edge.
pub fn grid_indices(down_size: usize) -> Vec<u32> {
  let n = samples_per_edge(down_size) as u32;
  let mut indices = Vec::with_capacity(down_size * down_size * 6);
  for j in 0..down_size as u32 {
    for i in 0..down_size as u32 {
      let v00 = j * n + i;
      let v10 = v00 + 1;
      let v01 = v00 + n;
      let v11 = v01 + 1;
      indices.extend_from_slice(&[v00, v01, v10, v10, v01, v11]);
    }
  }
  indices
}

#[derive(Debug)]
pub struct MeshResource {
  down_size: usize,
  /// Curvature-corrected heights, row-major from the north-west corner.
  pub heights: Vec<f32>,
  pub positions: Vec<[f32; 3]>,
  pub normals: Vec<[f32; 3]>,
  pub uvs: Vec<[f32; 2]>,
  pub indices: Arc<[u32]>,
  /// World position of the tile center.
  pub translation: DVec3,
  pub width: f64,
  pub visible: bool,
  /// Heights hold real data (decoded or snapshotted), not the reset value.
  pub data_ready: bool,
  pub imagery: Option<ImageryTexture>,
  pub bounds: MinMaxAABB,
  /// Bumped on every geometry or imagery change.
  pub revision: u64,
}

impl MeshResource {
  pub fn new(down_size: usize, indices: Arc<[u32]>) -> Self {
    let count = sample_count(down_size);
    Self {
      down_size,
      heights: vec![0.0; count],
      positions: vec![[0.0; 3]; count],
      normals: vec![[0.0, 1.0, 0.0]; count],
      uvs: grid_uvs(down_size),
      indices,
      translation: DVec3::ZERO,
      width: 0.0,
      visible: false,
      data_ready: false,
      imagery: None,
      bounds: MinMaxAABB::empty(),
      revision: 0,
    }
  }

  #[inline]
  pub fn down_size(&self) -> usize {
    self.down_size
  }

  /// Prepare for a new tile: reposition, flatten, show.
  pub fn reuse(&mut self, center: DVec2, width: f64) {
    self.translation = DVec3::new(center.x, 0.0, center.y);
    self.width = width;
    self.heights.fill(0.0);
    self.data_ready = false;
    self.imagery = None;
    self.visible = true;
    self.rebuild_geometry();
  }

  /// Detach from its tile before going back to the pool.
  pub fn remove(&mut self) {
    self.visible = false;
    self.data_ready = false;
    self.imagery = None;
    self.translation = DVec3::ZERO;
  }

  #[inline]
  pub fn height(&self, i: usize, j: usize) -> f32 {
    self.heights[sample_index(i, j, self.down_size)]
  }

  #[inline]
  pub fn set_height(&mut self, i: usize, j: usize, h: f32) {
    let idx = sample_index(i, j, self.down_size);
    self.heights[idx] = h;
  }

  /// World ground position of sample `(i, j)`.
  #[inline]
  pub fn sample_position(&self, i: usize, j: usize) -> DVec2 {
    let step = self.width / self.down_size as f64;
    let half = self.width * 0.5;
    DVec2::new(
      self.translation.x - half + i as f64 * step,
      self.translation.z - half + j as f64 * step,
    )
  }

  /// Fill heights from raw elevations, subtracting the curvature drop at
  /// each sample's world position.
  pub fn assign_raw_heights(&mut self, raw: &[f32], earth_radius: f64) {
    debug_assert_eq!(raw.len(), self.heights.len());
    let n = samples_per_edge(self.down_size);
    for j in 0..n {
      for i in 0..n {
        let p = self.sample_position(i, j);
        let drop = curvature_drop(p.x, p.y, earth_radius);
        let idx = sample_index(i, j, self.down_size);
        self.heights[idx] = (raw[idx] as f64 - drop) as f32;
      }
    }
    self.data_ready = true;
  }

  /// Boundary samples of `side`, ordered along the edge direction
  /// (west → east for north/south, north → south for east/west).
  pub fn boundary(&self, side: Side) -> Vec<f32> {
    let d = self.down_size;
    (0..=d)
      .map(|k| {
        let (i, j) = boundary_ij(side, k, d);
        self.height(i, j)
      })
      .collect()
  }

  pub fn set_boundary(&mut self, side: Side, values: &[f32]) {
    let d = self.down_size;
    debug_assert_eq!(values.len(), d + 1);
    for (k, &h) in values.iter().enumerate() {
      let (i, j) = boundary_ij(side, k, d);
      self.set_height(i, j, h);
    }
  }

  /// Rebuild positions, normals and bounds from the height buffer.
  pub fn rebuild_geometry(&mut self) {
    let d = self.down_size;
    let n = samples_per_edge(d);
    let step = (self.width / d as f64) as f32;
    let half = (self.width * 0.5) as f32;
    let mut bounds = MinMaxAABB::empty();

    for j in 0..n {
      for i in 0..n {
        let idx = sample_index(i, j, d);
        let p = [
          -half + i as f32 * step,
          self.heights[idx],
          -half + j as f32 * step,
        ];
        bounds.encapsulate(p);
        self.positions[idx] = p;

        let west = self.height(i.saturating_sub(1), j);
        let east = self.height((i + 1).min(d), j);
        let north = self.height(i, j.saturating_sub(1));
        let south = self.height(i, (j + 1).min(d));
        let dx = (east - west) / (step * ((i + 1).min(d) - i.saturating_sub(1)) as f32);
        let dz = (south - north) / (step * ((j + 1).min(d) - j.saturating_sub(1)) as f32);
        let normal = Vec3::new(-dx, 1.0, -dz).normalize_or(Vec3::Y);
        self.normals[idx] = normal.to_array();
      }
    }

    self.bounds = bounds;
    self.bump_revision();
  }

  pub fn set_imagery(&mut self, imagery: ImageryTexture) {
    self.imagery = Some(imagery);
    self.bump_revision();
  }

  #[inline]
  pub fn bump_revision(&mut self) {
    self.revision = self.revision.wrapping_add(1);
  }

  /// Height range of the current buffer.
  pub fn height_range(&self) -> (f32, f32) {
    self
      .heights
      .iter()
      .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)))
  }
}

/// Grid coordinates of the `k`-th sample along `side`.
#[inline]
pub fn boundary_ij(side: Side, k: usize, down_size: usize) -> (usize, usize) {
  match side {
    Side::North => (k, 0),
    Side::South => (k, down_size),
    Side::West => (0, k),
    Side::East => (down_size, k),
  }
}

fn grid_uvs(down_size: usize) -> Vec<[f32; 2]> {
  let n = samples_per_edge(down_size);
  let d = down_size as f32;
  let mut uvs = Vec::with_capacity(n * n);
  for j in 0..n {
    for i in 0..n {
      uvs.push([i as f32 / d, j as f32 / d]);
    }
  }
  uvs
}

#[cfg(test)]
#[path = "mesh_test.rs"]
mod mesh_test;
