//! TransitionGroup - record of one atomic quadtree change.
//!
//! A split hides one parent and shows its 4 children; a merge does the
//! reverse. Render bridges apply a whole group in one frame so the surface
//! never shows a hole.

use smallvec::SmallVec;

use super::NodeId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TransitionType {
	/// 1 parent → 4 children (finer detail)
	Split,
	/// 4 children → 1 parent (coarser detail)
	Merge,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionGroup {
	pub transition_type: TransitionType,
	/// Always the parent node.
	pub group_key: NodeId,
	/// Split: the 4 children. Merge: the parent.
	pub nodes_to_show: SmallVec<[NodeId; 4]>,
	/// Split: the parent. Merge: the 4 children.
	pub nodes_to_hide: SmallVec<[NodeId; 4]>,
}

impl TransitionGroup {
	pub fn split(parent: NodeId, children: [NodeId; 4]) -> Self {
		Self {
			transition_type: TransitionType::Split,
			group_key: parent,
			nodes_to_show: SmallVec::from_buf(children),
			nodes_to_hide: smallvec::smallvec![parent],
		}
	}

	pub fn merge(parent: NodeId, children: [NodeId; 4]) -> Self {
		Self {
			transition_type: TransitionType::Merge,
			group_key: parent,
			nodes_to_show: smallvec::smallvec![parent],
			nodes_to_hide: SmallVec::from_buf(children),
		}
	}
}
