//! TerrainStreamer - the per-frame driver and owner of all streaming state.
//!
//! # Frame
//!
//! ```text
//! update(viewer)
//!   ├─ refine            split / merge visible nodes, collect load candidates
//!   ├─ start loads       elevation fetch per candidate (off-thread)
//!   └─ pump
//!        ├─ poll fetches → pipeline tasks (stale results dropped)
//!        ├─ scheduler.step × steps_per_frame
//!        └─ imagery fetches asked for by finished tasks
//! ```
//!
//! Tree, pool and scheduler are only touched from `update`, so none of them
//! need locking. Fetch workers only ever see a tile coordinate.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::fetch::{FetchCompletion, FetchRequest, TileFetcher};
use crate::mesh::MeshResource;
use crate::pipeline::{
  stitch_tile, ImageryRequest, PendingTask, Scheduler, StepContext, StepOutcome,
};
use crate::quadtree::{
  refine, ConfigError, LoadState, MeshPool, NodeId, QuadTree, RefinementStats, TerrainConfig,
  TransitionGroup, Viewer,
};
use crate::source::{RasterKind, RasterSource};

/// What happened during one [`TerrainStreamer::update`].
#[derive(Debug, Default)]
pub struct FrameReport {
  pub frame: u64,
  pub transitions: Vec<TransitionGroup>,
  pub stats: RefinementStats,
  /// Pipeline stages advanced.
  pub steps: usize,
  pub pending_tasks: usize,
  pub fetches_in_flight: usize,
}

pub struct TerrainStreamer<S: RasterSource> {
  config: TerrainConfig,
  tree: QuadTree,
  pool: MeshPool,
  scheduler: Scheduler,
  fetcher: TileFetcher<S>,
  imagery_requests: Vec<ImageryRequest>,
  frame: u64,
}

impl<S: RasterSource> TerrainStreamer<S> {
  /// Build the tree and show the root tile.
  pub fn new(config: TerrainConfig, source: S) -> Result<Self, ConfigError> {
    Self::with_shared_source(config, Arc::new(source))
  }

  pub fn with_shared_source(config: TerrainConfig, source: Arc<S>) -> Result<Self, ConfigError> {
    config.validate()?;
    let mut tree = QuadTree::new(&config);
    let mut pool = MeshPool::new(config.down_size);
    let root = tree.root();
    tree.show(root, &mut pool);
    let fetcher = TileFetcher::new(source, config.fetch_mode, config.layer_zooms());

    Ok(Self {
      config,
      tree,
      pool,
      scheduler: Scheduler::new(),
      fetcher,
      imagery_requests: Vec::new(),
      frame: 0,
    })
  }

  pub fn config(&self) -> &TerrainConfig {
    &self.config
  }

  pub fn tree(&self) -> &QuadTree {
    &self.tree
  }

  pub fn pool(&self) -> &MeshPool {
    &self.pool
  }

  pub fn scheduler(&self) -> &Scheduler {
    &self.scheduler
  }

  pub fn root(&self) -> NodeId {
    self.tree.root()
  }

  pub fn frame(&self) -> u64 {
    self.frame
  }

  pub fn visible_nodes(&self) -> Vec<NodeId> {
    self.tree.visible_nodes().collect()
  }

  pub fn mesh(&self, id: NodeId) -> Option<&MeshResource> {
    self.tree.mesh(id)
  }

  /// Nothing queued and nothing being fetched.
  pub fn is_idle(&self) -> bool {
    self.scheduler.is_empty() && self.fetcher.in_flight() == 0 && self.imagery_requests.is_empty()
  }

  /// Run one frame.
  pub fn update(&mut self, viewer: &Viewer) -> FrameReport {
    self.frame += 1;
    let output = refine(&mut self.tree, &mut self.pool, viewer, &self.config);
    for group in &output.transitions {
      self.stitch_shown(group);
    }
    let mut stats = output.stats;
    if stats.total_transitions() > 0 {
      debug!(
        frame = self.frame,
        splits = stats.splits_performed,
        merges = stats.merges_performed,
        "refined"
      );
    }
    stats.loads_started = self.start_loads(&output.load_candidates);
    let steps = self.pump(self.config.steps_per_frame);

    FrameReport {
      frame: self.frame,
      transitions: output.transitions,
      stats,
      steps,
      pending_tasks: self.scheduler.len(),
      fetches_in_flight: self.fetcher.in_flight(),
    }
  }

  /// Split a visible node outside of refinement.
  pub fn split(&mut self, id: NodeId) -> Option<TransitionGroup> {
    let group = self.tree.split(id, &mut self.pool)?;
    self.stitch_shown(&group);
    Some(group)
  }

  /// Merge a node's visible children outside of refinement.
  pub fn merge(&mut self, id: NodeId) -> Option<TransitionGroup> {
    let group = self.tree.merge(id, &mut self.pool)?;
    self.stitch_shown(&group);
    Some(group)
  }

  /// Tiles shown with carried-over data join their neighbors' boundaries
  /// right away instead of after their own load.
  fn stitch_shown(&mut self, group: &TransitionGroup) {
    for &id in &group.nodes_to_show {
      stitch_tile(&mut self.tree, id);
    }
  }

  /// Request data for every visible node that has none. Returns the number
  /// of fetches started.
  pub fn start_pending_loads(&mut self) -> usize {
    let candidates: Vec<NodeId> = self
      .tree
      .visible_nodes()
      .filter(|&id| self.tree.node(id).load == LoadState::Idle)
      .collect();
    self.start_loads(&candidates)
  }

  fn start_loads(&mut self, candidates: &[NodeId]) -> usize {
    let mut started = 0;
    for &id in candidates {
      let node = self.tree.node_mut(id);
      if !node.is_visible() || node.load != LoadState::Idle {
        continue;
      }
      node.load = LoadState::Pending;
      let request = FetchRequest {
        node: id,
        generation: node.generation,
        tile: node.tile,
        kind: RasterKind::Elevation,
      };
      self.fetcher.request(request);
      started += 1;
    }
    started
  }

  /// Collect finished fetches, advance the pipeline up to `max_steps`
  /// stages and start any imagery fetches it asked for. Returns the stages
  /// advanced.
  pub fn pump(&mut self, max_steps: usize) -> usize {
    for completion in self.fetcher.poll() {
      self.accept(completion);
    }

    let mut steps = 0;
    {
      let mut ctx = StepContext {
        tree: &mut self.tree,
        config: &self.config,
        imagery_requests: &mut self.imagery_requests,
      };
      while steps < max_steps && self.scheduler.step(&mut ctx) == StepOutcome::Advanced {
        steps += 1;
      }
    }

    for request in std::mem::take(&mut self.imagery_requests) {
      if self.tree.is_live(request.node, request.generation) {
        let tile = self.tree.node(request.node).tile;
        self.fetcher.request(FetchRequest {
          node: request.node,
          generation: request.generation,
          tile,
          kind: RasterKind::Imagery,
        });
      }
    }
    steps
  }

  /// Turn a fetch completion into a pipeline task, or record its failure.
  fn accept(&mut self, completion: FetchCompletion) {
    let FetchCompletion {
      request,
      result,
      fetch_us,
    } = completion;
    let live = self.tree.is_live(request.node, request.generation);
    trace!(tile = ?request.tile, kind = ?request.kind, fetch_us, live, "fetch completed");

    match result {
      Ok(fetched) if live => {
        let task = match request.kind {
          RasterKind::Elevation => {
            PendingTask::elevation(request.node, request.generation, fetched.raster, fetched.window)
          }
          RasterKind::Imagery => PendingTask::imagery(request.node, request.generation, fetched.raster),
        };
        self.scheduler.push(task);
      }
      Ok(_) => {
        trace!(tile = ?request.tile, kind = ?request.kind, "dropping fetch for stale node");
      }
      Err(error) => {
        warn!(tile = ?request.tile, kind = ?request.kind, %error, "tile fetch failed");
        if live && request.kind == RasterKind::Elevation {
          self.tree.node_mut(request.node).load = LoadState::Failed;
        }
      }
    }
  }
}

#[cfg(test)]
#[path = "streamer_test.rs"]
mod streamer_test;
