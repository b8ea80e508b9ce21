//! Pipeline task types.

use crate::quadtree::NodeId;
use crate::raster::{Raster, RasterWindow};

/// Where a task resumes on its next step.
///
/// ```text
/// elevation:  Decode → AssignHeights → RebuildGeometry → ClampEdges
///                    → RequestImagery → Done
/// imagery:    PaintImagery → Done
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStage {
  Decode,
  AssignHeights,
  RebuildGeometry,
  ClampEdges,
  RequestImagery,
  PaintImagery,
  Done,
}

#[derive(Debug)]
pub enum TaskPayload {
  Elevation {
    raster: Raster,
    window: RasterWindow,
    /// Raw elevations, filled by the decode step.
    decoded: Option<Vec<f32>>,
  },
  Imagery {
    raster: Raster,
  },
}

/// A resumable unit of work bound to one node generation.
#[derive(Debug)]
pub struct PendingTask {
  pub node: NodeId,
  pub generation: u32,
  pub stage: TaskStage,
  pub payload: TaskPayload,
}

impl PendingTask {
  pub fn elevation(node: NodeId, generation: u32, raster: Raster, window: RasterWindow) -> Self {
    Self {
      node,
      generation,
      stage: TaskStage::Decode,
      payload: TaskPayload::Elevation {
        raster,
        window,
        decoded: None,
      },
    }
  }

  pub fn imagery(node: NodeId, generation: u32, raster: Raster) -> Self {
    Self {
      node,
      generation,
      stage: TaskStage::PaintImagery,
      payload: TaskPayload::Imagery { raster },
    }
  }

  #[inline]
  pub fn is_done(&self) -> bool {
    self.stage == TaskStage::Done
  }
}

/// Imagery fetch asked for by a finished elevation task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageryRequest {
  pub node: NodeId,
  pub generation: u32,
}
