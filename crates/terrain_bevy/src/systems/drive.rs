//! Per-frame streamer update driven by the TerrainViewer.

use bevy::math::{DMat4, DVec3};
use bevy::prelude::*;
use terrain_plugin::Viewer;

use crate::components::TerrainViewer;
use crate::resources::{LastFrameReport, TerrainStreamerResource};

/// World-to-clip matrix of a camera at `transform`.
pub fn view_projection(camera: &Camera, transform: &GlobalTransform) -> DMat4 {
  let view_from_world = Mat4::from(transform.affine().inverse());
  (camera.clip_from_view() * view_from_world).as_dmat4()
}

/// Build the streamer's viewer from a transform and optional camera.
pub fn viewer_from(transform: &GlobalTransform, camera: Option<&Camera>) -> Viewer {
  let position: DVec3 = transform.translation().as_dvec3();
  Viewer {
    position,
    view_projection: camera.map(|c| view_projection(c, transform)),
  }
}

/// System that runs one streamer frame from the first TerrainViewer.
pub fn drive_terrain_streamer(
  viewers: Query<(&GlobalTransform, Option<&Camera>), With<TerrainViewer>>,
  mut terrain: ResMut<TerrainStreamerResource>,
  mut last: ResMut<LastFrameReport>,
) {
  let Some((transform, camera)) = viewers.iter().next() else {
    return;
  };

  let viewer = viewer_from(transform, camera);
  let report = terrain.streamer.update(&viewer);
  if !report.transitions.is_empty() {
    debug!(
      "terrain frame {}: {} splits, {} merges, {} visible",
      report.frame,
      report.stats.splits_performed,
      report.stats.merges_performed,
      terrain.streamer.tree().visible_count()
    );
  }
  last.0 = report;
}
