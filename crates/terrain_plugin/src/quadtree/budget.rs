//! Rate limiting for quadtree refinement.
//!
//! Caps the splits and merges applied in one frame so a large camera jump
//! spreads its work over several frames instead of spiking one.

/// Per-frame transition limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefinementBudget {
	/// Maximum splits per frame (0 = unlimited).
	pub max_splits: usize,
	/// Maximum merges per frame (0 = unlimited).
	pub max_merges: usize,
}

impl RefinementBudget {
	pub const DEFAULT: Self = Self {
		max_splits: 16,
		max_merges: 16,
	};

	pub const UNLIMITED: Self = Self {
		max_splits: 0,
		max_merges: 0,
	};

	#[inline]
	pub fn can_split(&self, performed: usize) -> bool {
		self.max_splits == 0 || performed < self.max_splits
	}

	#[inline]
	pub fn can_merge(&self, performed: usize) -> bool {
		self.max_merges == 0 || performed < self.max_merges
	}
}

impl Default for RefinementBudget {
	fn default() -> Self {
		Self::DEFAULT
	}
}

/// Counters from one refinement pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefinementStats {
	pub splits_performed: usize,
	pub merges_performed: usize,
	/// Tile fetches started for visible nodes.
	pub loads_started: usize,
}

impl RefinementStats {
	#[inline]
	pub fn total_transitions(&self) -> usize {
		self.splits_performed + self.merges_performed
	}
}
