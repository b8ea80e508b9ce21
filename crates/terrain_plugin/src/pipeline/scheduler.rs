//! Scheduler - cooperative FIFO of pipeline tasks.
//!
//! Only the task at the head advances, one stage per [`Scheduler::step`].
//! Finished tasks and tasks whose node was hidden or re-shown since they
//! were queued are dropped from the head without costing a step.

use std::collections::VecDeque;

use tracing::trace;

use super::steps::{advance, StepContext};
use super::types::PendingTask;

/// Result of one scheduler step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
  /// A task advanced one stage.
  Advanced,
  /// Queue empty after dropping stale tasks.
  Idle,
}

#[derive(Debug, Default)]
pub struct Scheduler {
  queue: VecDeque<PendingTask>,
  completed: u64,
  discarded: u64,
}

impl Scheduler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, task: PendingTask) {
    self.queue.push_back(task);
  }

  pub fn len(&self) -> usize {
    self.queue.len()
  }

  pub fn is_empty(&self) -> bool {
    self.queue.is_empty()
  }

  /// Tasks that ran to completion.
  pub fn completed(&self) -> u64 {
    self.completed
  }

  /// Tasks dropped because their node went stale.
  pub fn discarded(&self) -> u64 {
    self.discarded
  }

  /// Advance the head task by exactly one stage.
  pub fn step(&mut self, ctx: &mut StepContext<'_>) -> StepOutcome {
    while let Some(task) = self.queue.front_mut() {
      if !ctx.tree.is_live(task.node, task.generation) {
        trace!(node = task.node.0, stage = ?task.stage, "discarding stale task");
        self.queue.pop_front();
        self.discarded += 1;
        continue;
      }

      advance(task, ctx);
      if task.is_done() {
        self.queue.pop_front();
        self.completed += 1;
      }
      return StepOutcome::Advanced;
    }
    StepOutcome::Idle
  }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;
