//! Single steps of a pipeline task.
//!
//! Each call does one stage's worth of work and moves the task to its next
//! stage. Callers have already checked that the task's node is live.

use tracing::debug;

use super::stitch::stitch_tile;
use super::types::{ImageryRequest, PendingTask, TaskPayload, TaskStage};
use crate::elevation::decode_grid;
use crate::mesh::ImageryTexture;
use crate::quadtree::{LoadState, QuadTree, TerrainConfig};

/// What a step may touch.
pub struct StepContext<'a> {
  pub tree: &'a mut QuadTree,
  pub config: &'a TerrainConfig,
  /// Imagery fetches to start once the step pass ends.
  pub imagery_requests: &'a mut Vec<ImageryRequest>,
}

/// Advance `task` by one stage.
pub fn advance(task: &mut PendingTask, ctx: &mut StepContext<'_>) {
  let next = match (task.stage, &mut task.payload) {
    (TaskStage::Decode, TaskPayload::Elevation { raster, window, decoded }) => {
      *decoded = Some(decode_grid(raster, *window, ctx.config.down_size));
      TaskStage::AssignHeights
    }
    (TaskStage::AssignHeights, TaskPayload::Elevation { decoded, .. }) => {
      if let (Some(raw), Some(mesh)) = (decoded.take(), ctx.tree.mesh_mut(task.node)) {
        mesh.assign_raw_heights(&raw, ctx.config.earth_radius);
      }
      TaskStage::RebuildGeometry
    }
    (TaskStage::RebuildGeometry, _) => {
      if let Some(mesh) = ctx.tree.mesh_mut(task.node) {
        mesh.rebuild_geometry();
      }
      TaskStage::ClampEdges
    }
    (TaskStage::ClampEdges, _) => {
      stitch_tile(ctx.tree, task.node);
      TaskStage::RequestImagery
    }
    (TaskStage::RequestImagery, _) => {
      ctx.imagery_requests.push(ImageryRequest {
        node: task.node,
        generation: task.generation,
      });
      let node = ctx.tree.node_mut(task.node);
      node.load = LoadState::Loaded;
      debug!(tile = ?node.tile, "tile elevation ready");
      TaskStage::Done
    }
    (TaskStage::PaintImagery, TaskPayload::Imagery { raster }) => {
      if let Some(mesh) = ctx.tree.mesh_mut(task.node) {
        mesh.set_imagery(ImageryTexture {
          width: raster.width,
          height: raster.height,
          rgba: raster.to_rgba_bytes(),
        });
      }
      TaskStage::Done
    }
    // Finished, or stage and payload disagree.
    _ => TaskStage::Done,
  };
  task.stage = next;
}
