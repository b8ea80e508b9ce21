//! Bevy components for terrain rendering.

use bevy::prelude::*;
use terrain_plugin::NodeId;

/// Mesh entity mirroring one visible quadtree node.
#[derive(Component, Debug)]
pub struct TerrainTile {
  pub node: NodeId,
  /// Node generation the entity was spawned for; a re-shown node gets a
  /// fresh entity.
  pub generation: u32,
  /// Last mesh revision uploaded.
  pub revision: u64,
}

/// Marker component for the entity that drives terrain refinement.
///
/// Attach to an entity with a `GlobalTransform`. If it also carries a
/// `Camera`, tiles outside its frustum are not refined.
///
/// # Example
/// ```ignore
/// commands.spawn((
///     Camera3d::default(),
///     Transform::from_xyz(0.0, 3000.0, 0.0),
///     TerrainViewer,
/// ));
/// ```
#[derive(Component, Default)]
pub struct TerrainViewer;
