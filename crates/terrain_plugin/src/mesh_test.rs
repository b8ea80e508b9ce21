use super::*;

fn mesh(down_size: usize) -> MeshResource {
  MeshResource::new(down_size, grid_indices(down_size).into())
}

#[test]
fn test_grid_indices_face_up() {
  let d = 2;
  let indices = grid_indices(d);
  assert_eq!(indices.len(), d * d * 6);

  let mut m = mesh(d);
  m.reuse(DVec2::ZERO, 2.0);
  for tri in indices.chunks_exact(3) {
    let p = |k: u32| Vec3::from_array(m.positions[k as usize]);
    let normal = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
    assert!(normal.y > 0.0, "triangle {:?} faces down", tri);
  }
}

#[test]
fn test_reuse_positions_relative_to_center() {
  let mut m = mesh(4);
  m.reuse(DVec2::new(100.0, -50.0), 8.0);
  assert!(m.visible);
  assert!(!m.data_ready);
  assert_eq!(m.translation, DVec3::new(100.0, 0.0, -50.0));
  assert_eq!(m.positions[0], [-4.0, 0.0, -4.0]);
  assert_eq!(m.positions[sample_index(4, 4, 4)], [4.0, 0.0, 4.0]);
  assert_eq!(m.sample_position(4, 0), DVec2::new(104.0, -54.0));
}

#[test]
fn test_reuse_resets_previous_tile() {
  let mut m = mesh(2);
  m.reuse(DVec2::ZERO, 2.0);
  m.assign_raw_heights(&[5.0; 9], f64::INFINITY);
  m.set_imagery(ImageryTexture {
    width: 1,
    height: 1,
    rgba: vec![0; 4],
  });
  m.remove();
  assert!(!m.visible);

  m.reuse(DVec2::ONE, 2.0);
  assert!(m.heights.iter().all(|h| *h == 0.0));
  assert!(m.imagery.is_none());
  assert!(!m.data_ready);
}

#[test]
fn test_assign_raw_heights_applies_curvature() {
  let mut m = mesh(2);
  m.reuse(DVec2::new(1000.0, 0.0), 2000.0);
  m.assign_raw_heights(&[100.0; 9], 1_000_000.0);
  // West edge sits on the tangent point, east edge 2 km away.
  assert!((m.height(0, 1) - 100.0).abs() < 1e-4);
  assert!((m.height(2, 1) - 98.0).abs() < 1e-4);
  assert!(m.data_ready);
}

#[test]
fn test_boundary_orientation() {
  let mut m = mesh(2);
  for j in 0..3 {
    for i in 0..3 {
      m.set_height(i, j, (j * 3 + i) as f32);
    }
  }
  assert_eq!(m.boundary(Side::North), vec![0.0, 1.0, 2.0]);
  assert_eq!(m.boundary(Side::South), vec![6.0, 7.0, 8.0]);
  assert_eq!(m.boundary(Side::West), vec![0.0, 3.0, 6.0]);
  assert_eq!(m.boundary(Side::East), vec![2.0, 5.0, 8.0]);

  m.set_boundary(Side::East, &[-1.0, -2.0, -3.0]);
  assert_eq!(m.height(2, 1), -2.0);
}

#[test]
fn test_rebuild_geometry_tilts_normals_and_bumps_revision() {
  let mut m = mesh(2);
  m.reuse(DVec2::ZERO, 2.0);
  let before = m.revision;
  for j in 0..3 {
    for i in 0..3 {
      // Rises toward the east.
      m.set_height(i, j, i as f32);
    }
  }
  m.rebuild_geometry();
  assert!(m.revision > before);
  let n = m.normals[sample_index(1, 1, 2)];
  assert!(n[0] < 0.0);
  assert!(n[2].abs() < 1e-6);
  assert_eq!(m.bounds.min[1], 0.0);
  assert_eq!(m.bounds.max[1], 2.0);
  assert_eq!(m.height_range(), (0.0, 2.0));
}
