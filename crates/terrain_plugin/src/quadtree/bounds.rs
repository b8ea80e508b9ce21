//! Double-precision bounds and frustum culling for tiles.

use glam::{DMat4, DVec2, DVec3, DVec4};

/// Double-precision axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DAabb3 {
	/// Minimum corner (inclusive).
	pub min: DVec3,
	/// Maximum corner (inclusive).
	pub max: DVec3,
}

impl DAabb3 {
	/// # Panics
	/// Debug-asserts that min <= max on all axes.
	pub fn new(min: DVec3, max: DVec3) -> Self {
		debug_assert!(
			min.x <= max.x && min.y <= max.y && min.z <= max.z,
			"AABB min must be <= max on all axes"
		);
		Self { min, max }
	}

	/// Box over a ground footprint, spanning `heights` vertically.
	pub fn from_footprint(min: DVec2, max: DVec2, heights: (f64, f64)) -> Self {
		Self::new(
			DVec3::new(min.x, heights.0, min.y),
			DVec3::new(max.x, heights.1, max.y),
		)
	}

	/// Ground-plane distance from `point` to the box footprint; zero when
	/// the point is above or below it.
	#[inline]
	pub fn distance_xz(&self, point: DVec3) -> f64 {
		let dx = (self.min.x - point.x).max(point.x - self.max.x).max(0.0);
		let dz = (self.min.z - point.z).max(point.z - self.max.z).max(0.0);
		(dx * dx + dz * dz).sqrt()
	}
}

/// Side and near planes of a view frustum, `xyz` = inward normal,
/// `w` = offset.
///
/// The far plane is ignored so distant tiles beyond a short camera far
/// plane still refine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DFrustum {
	planes: [DVec4; 5],
}

impl DFrustum {
	pub fn from_view_projection(view_projection: DMat4) -> Self {
		let r0 = view_projection.row(0);
		let r1 = view_projection.row(1);
		let r2 = view_projection.row(2);
		let r3 = view_projection.row(3);
		Self {
			planes: [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r3 + r2],
		}
	}

	/// Conservative box test: false only if the box is fully outside one
	/// plane.
	pub fn intersects_aabb(&self, aabb: &DAabb3) -> bool {
		self.planes.iter().all(|plane| {
			let normal = plane.truncate();
			let positive = DVec3::select(normal.cmpge(DVec3::ZERO), aabb.max, aabb.min);
			normal.dot(positive) + plane.w >= 0.0
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn camera_looking_north() -> DFrustum {
		// At the origin, 10 m up, looking toward -z.
		let view = DMat4::look_at_rh(DVec3::new(0.0, 10.0, 0.0), DVec3::new(0.0, 10.0, -1.0), DVec3::Y);
		let proj = DMat4::perspective_rh(std::f64::consts::FRAC_PI_2, 1.0, 0.1, 1000.0);
		DFrustum::from_view_projection(proj * view)
	}

	#[test]
	fn test_distance_xz_inside_is_zero() {
		let aabb = DAabb3::new(DVec3::new(0.0, -5.0, 0.0), DVec3::new(10.0, 5.0, 10.0));
		assert_eq!(aabb.distance_xz(DVec3::new(5.0, 1000.0, 5.0)), 0.0);
	}

	#[test]
	fn test_distance_xz_to_corner() {
		let aabb = DAabb3::new(DVec3::ZERO, DVec3::splat(10.0));
		assert_eq!(aabb.distance_xz(DVec3::new(13.0, 0.0, 14.0)), 5.0);
		assert_eq!(aabb.distance_xz(DVec3::new(-2.0, 0.0, 5.0)), 2.0);
	}

	#[test]
	fn test_frustum_keeps_box_ahead() {
		let frustum = camera_looking_north();
		let ahead = DAabb3::new(DVec3::new(-5.0, 0.0, -60.0), DVec3::new(5.0, 20.0, -50.0));
		assert!(frustum.intersects_aabb(&ahead));
	}

	#[test]
	fn test_frustum_culls_box_behind() {
		let frustum = camera_looking_north();
		let behind = DAabb3::new(DVec3::new(-5.0, 0.0, 50.0), DVec3::new(5.0, 20.0, 60.0));
		assert!(!frustum.intersects_aabb(&behind));
	}

	#[test]
	fn test_frustum_culls_box_far_to_the_side() {
		let frustum = camera_looking_north();
		let side = DAabb3::new(DVec3::new(200.0, 0.0, -60.0), DVec3::new(210.0, 20.0, -50.0));
		assert!(!frustum.intersects_aabb(&side));
	}

	#[test]
	fn test_frustum_culls_wide_box_behind() {
		// Straddles every side plane, only the near plane rejects it.
		let frustum = camera_looking_north();
		let wide = DAabb3::new(DVec3::new(-1.0e5, -500.0, 1.0), DVec3::new(1.0e5, 9000.0, 1.0e5));
		assert!(!frustum.intersects_aabb(&wide));
	}

	#[test]
	fn test_frustum_beyond_far_plane_is_kept() {
		let frustum = camera_looking_north();
		let far = DAabb3::new(DVec3::new(-5.0, 0.0, -5010.0), DVec3::new(5.0, 20.0, -5000.0));
		assert!(frustum.intersects_aabb(&far));
	}
}
