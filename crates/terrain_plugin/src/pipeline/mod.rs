//! Tile data pipeline.
//!
//! A fetched raster becomes a [`PendingTask`] that is advanced one stage
//! per scheduler step, so a tile's decode, rebuild and stitching are spread
//! over several frames instead of stalling one.
//!
//! # Module Structure
//!
//! - [`types`]: `PendingTask`, `TaskStage`, `TaskPayload`
//! - [`steps`]: the work done by each stage
//! - [`stitch`]: neighbor boundary reconciliation
//! - [`scheduler`]: `Scheduler` - FIFO with stale-task discard

pub mod scheduler;
pub mod steps;
pub mod stitch;
pub mod types;

pub use scheduler::{Scheduler, StepOutcome};
pub use steps::StepContext;
pub use stitch::{reconcile_edges, stitch_tile};
pub use types::{ImageryRequest, PendingTask, TaskPayload, TaskStage};
