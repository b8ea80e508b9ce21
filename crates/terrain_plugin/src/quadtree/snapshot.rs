//! Best-effort data carried across a transition.
//!
//! On merge the reacquired parent mesh is rebuilt from its four children;
//! on split each child starts from its quadrant of the parent. Either way
//! the surface stays covered while the new tiles' own data is fetched.

use crate::constants::samples_per_edge;
use crate::mesh::{ImageryTexture, MeshResource};

/// Copy every other child sample into `parent` and downsample imagery.
///
/// `children` are NW, NE, SE, SW. Parent heights are marked ready only if
/// all four children had data.
pub fn snapshot_children(parent: &mut MeshResource, children: [&MeshResource; 4]) {
  let d = parent.down_size();
  let half = d / 2;
  for j in 0..samples_per_edge(d) {
    for i in 0..samples_per_edge(d) {
      let (east, ci) = if i <= half { (false, 2 * i) } else { (true, 2 * i - d) };
      let (south, cj) = if j <= half { (false, 2 * j) } else { (true, 2 * j - d) };
      let quadrant = match (east, south) {
        (false, false) => 0,
        (true, false) => 1,
        (true, true) => 2,
        (false, true) => 3,
      };
      parent.set_height(i, j, children[quadrant].height(ci, cj));
    }
  }
  parent.data_ready = children.iter().all(|c| c.data_ready);

  let imagery = children.map(|c| c.imagery.as_ref());
  if let [Some(nw), Some(ne), Some(se), Some(sw)] = imagery {
    parent.imagery = downsample_quad([nw, ne, se, sw]);
  }
  parent.rebuild_geometry();
}

/// Position of each quadrant (NW, NE, SE, SW) in a 2x2 mosaic.
const QUADRANT_CELLS: [(usize, usize); 4] = [(0, 0), (1, 0), (1, 1), (0, 1)];

/// Fill `child` with quadrant `quadrant` (0..4, NW, NE, SE, SW) of
/// `parent`: heights bilinearly upsampled, imagery cropped.
///
/// Does nothing unless the parent has data. Child boundaries are linear
/// between parent samples, so they meet the parent's old neighbors.
pub fn seed_from_parent(child: &mut MeshResource, parent: &MeshResource, quadrant: usize) {
  if !parent.data_ready {
    return;
  }
  let d = child.down_size();
  let (qx, qy) = QUADRANT_CELLS[quadrant];
  // Child sample i sits at half-step qx * d + i of the parent grid.
  let lerp = |half: usize| -> (usize, usize) {
    let at = half / 2;
    (at, if half % 2 == 0 { at } else { at + 1 })
  };
  for j in 0..samples_per_edge(d) {
    let (y0, y1) = lerp(qy * d + j);
    for i in 0..samples_per_edge(d) {
      let (x0, x1) = lerp(qx * d + i);
      let h = (parent.height(x0, y0) + parent.height(x1, y0) + parent.height(x0, y1)
        + parent.height(x1, y1))
        * 0.25;
      child.set_height(i, j, h);
    }
  }
  child.data_ready = true;

  if let Some(imagery) = &parent.imagery {
    child.imagery = crop_quadrant(imagery, quadrant);
  }
  child.rebuild_geometry();
}

/// One quadrant of a texture. `None` if the texture is too small to halve.
fn crop_quadrant(texture: &ImageryTexture, quadrant: usize) -> Option<ImageryTexture> {
  let (w, h) = (texture.width, texture.height);
  if w < 2 || h < 2 {
    return None;
  }
  let (cw, ch) = (w / 2, h / 2);
  let (cx, cy) = QUADRANT_CELLS[quadrant];
  let (ox, oy) = (cx as u32 * cw, cy as u32 * ch);
  let mut rgba = Vec::with_capacity((cw * ch * 4) as usize);
  for y in 0..ch {
    let row = (((oy + y) * w + ox) * 4) as usize;
    rgba.extend_from_slice(&texture.rgba[row..row + (cw * 4) as usize]);
  }
  Some(ImageryTexture {
    width: cw,
    height: ch,
    rgba,
  })
}

/// Stitch four equally sized textures 2×2 and box-filter back to one
/// texture's size. `None` if the sizes differ.
pub fn downsample_quad(quads: [&ImageryTexture; 4]) -> Option<ImageryTexture> {
  let (w, h) = (quads[0].width, quads[0].height);
  if quads.iter().any(|q| q.width != w || q.height != h) {
    return None;
  }

  let mut rgba = vec![0u8; (w * h * 4) as usize];
  for (quad, (cx, cy)) in quads.iter().zip(QUADRANT_CELLS) {
    let (ox, oy) = (cx as u32 * w / 2, cy as u32 * h / 2);
    for y in 0..h / 2 {
      for x in 0..w / 2 {
        let mut sum = [0u32; 4];
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
          let src = (((2 * y + dy) * w + 2 * x + dx) * 4) as usize;
          for c in 0..4 {
            sum[c] += quad.rgba[src + c] as u32;
          }
        }
        let dst = (((oy + y) * w + ox + x) * 4) as usize;
        for c in 0..4 {
          rgba[dst + c] = (sum[c] / 4) as u8;
        }
      }
    }
  }

  Some(ImageryTexture {
    width: w,
    height: h,
    rgba,
  })
}

#[cfg(test)]
mod tests {
  use glam::DVec2;

  use super::*;
  use crate::mesh::grid_indices;

  fn child(value: f32) -> MeshResource {
    let mut mesh = MeshResource::new(4, grid_indices(4).into());
    mesh.reuse(DVec2::ZERO, 1.0);
    mesh.heights.fill(value);
    mesh.data_ready = true;
    mesh.imagery = Some(ImageryTexture {
      width: 2,
      height: 2,
      rgba: vec![value as u8; 16],
    });
    mesh
  }

  #[test]
  fn snapshot_maps_quadrants() {
    let kids = [child(1.0), child(2.0), child(3.0), child(4.0)];
    let mut parent = MeshResource::new(4, grid_indices(4).into());
    parent.reuse(DVec2::ZERO, 2.0);
    snapshot_children(&mut parent, [&kids[0], &kids[1], &kids[2], &kids[3]]);

    assert_eq!(parent.height(0, 0), 1.0);
    assert_eq!(parent.height(4, 0), 2.0);
    assert_eq!(parent.height(4, 4), 3.0);
    assert_eq!(parent.height(0, 4), 4.0);
    // Shared center row and column come from the western / northern child.
    assert_eq!(parent.height(2, 2), 1.0);
    assert!(parent.data_ready);

    let imagery = parent.imagery.as_ref().unwrap();
    assert_eq!(&imagery.rgba[0..4], &[1, 1, 1, 1]);
    assert_eq!(&imagery.rgba[12..16], &[3, 3, 3, 3]);
  }

  #[test]
  fn snapshot_without_child_data_is_not_ready() {
    let mut kids = [child(1.0), child(2.0), child(3.0), child(4.0)];
    kids[2].data_ready = false;
    kids[2].imagery = None;
    let mut parent = MeshResource::new(4, grid_indices(4).into());
    parent.reuse(DVec2::ZERO, 2.0);
    snapshot_children(&mut parent, [&kids[0], &kids[1], &kids[2], &kids[3]]);
    assert!(!parent.data_ready);
    assert!(parent.imagery.is_none());
  }

  #[test]
  fn seed_upsamples_parent_quadrant() {
    let mut parent = MeshResource::new(4, grid_indices(4).into());
    parent.reuse(DVec2::ZERO, 2.0);
    for j in 0..5 {
      for i in 0..5 {
        parent.set_height(i, j, (i * 10 + j) as f32);
      }
    }
    parent.data_ready = true;
    parent.imagery = Some(ImageryTexture {
      width: 2,
      height: 2,
      rgba: (0..16).collect(),
    });

    let mut se = MeshResource::new(4, grid_indices(4).into());
    se.reuse(DVec2::new(0.5, 0.5), 1.0);
    seed_from_parent(&mut se, &parent, 2);

    assert!(se.data_ready);
    // Child corners land on parent lattice points.
    assert_eq!(se.height(0, 0), 22.0);
    assert_eq!(se.height(4, 4), 44.0);
    // Odd samples sit halfway between parent samples.
    assert_eq!(se.height(1, 0), 27.0);
    assert_eq!(se.height(1, 1), 27.5);
    // Bottom-right texel of the parent.
    assert_eq!(se.imagery.as_ref().unwrap().rgba, vec![12, 13, 14, 15]);
  }

  #[test]
  fn seed_from_empty_parent_leaves_child_flat() {
    let mut parent = MeshResource::new(4, grid_indices(4).into());
    parent.reuse(DVec2::ZERO, 2.0);
    parent.heights.fill(9.0);
    let mut child = MeshResource::new(4, grid_indices(4).into());
    child.reuse(DVec2::new(-0.5, -0.5), 1.0);
    seed_from_parent(&mut child, &parent, 0);
    assert!(!child.data_ready);
    assert!(child.heights.iter().all(|h| *h == 0.0));
  }

  #[test]
  fn downsample_rejects_mismatched_sizes() {
    let a = ImageryTexture {
      width: 2,
      height: 2,
      rgba: vec![0; 16],
    };
    let b = ImageryTexture {
      width: 4,
      height: 4,
      rgba: vec![0; 64],
    };
    assert!(downsample_quad([&a, &a, &a, &b]).is_none());
  }
}
