//! Entity management for terrain tiles.
//!
//! Each frame the set of visible, loaded nodes is diffed against
//! [`TileEntityMap`]: new nodes are spawned, nodes whose mesh revision moved
//! are re-uploaded, and entities whose node went away (or was re-shown
//! under a new generation) are despawned.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use terrain_plugin::{ImageryTexture, MeshResource, NodeId};

use crate::components::TerrainTile;
use crate::resources::{TerrainStreamerResource, TileEntityMap};

/// Presentation state of one visible node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileState {
  pub node: NodeId,
  pub generation: u32,
  pub revision: u64,
}

/// What `sync_tile_entities` has to do this frame.
#[derive(Debug, Default, PartialEq)]
pub struct TileSyncPlan {
  pub spawn: Vec<TileState>,
  /// Existing entities whose mesh changed.
  pub refresh: Vec<(Entity, TileState)>,
  pub despawn: Vec<(NodeId, Entity)>,
}

/// Diff the loaded visible tiles against the entity map.
///
/// `uploaded` returns the revision an entity currently shows.
pub fn plan_tile_sync(
  tiles: &[TileState],
  map: &TileEntityMap,
  uploaded: impl Fn(Entity) -> Option<u64>,
) -> TileSyncPlan {
  let mut plan = TileSyncPlan::default();

  for (&node, &(entity, generation)) in &map.map {
    let current = tiles
      .iter()
      .any(|t| t.node == node && t.generation == generation);
    if !current {
      plan.despawn.push((node, entity));
    }
  }

  for tile in tiles {
    match map.get_current(tile.node, tile.generation) {
      Some(entity) => {
        if uploaded(entity) != Some(tile.revision) {
          plan.refresh.push((entity, *tile));
        }
      }
      None => plan.spawn.push(*tile),
    }
  }

  plan.despawn.sort_by_key(|(node, _)| node.0);
  plan
}

/// Convert a tile mesh to a Bevy Mesh in tile-local coordinates.
pub fn tile_mesh_to_bevy(resource: &MeshResource) -> Mesh {
  let mut mesh = Mesh::new(
    PrimitiveTopology::TriangleList,
    RenderAssetUsages::default(),
  );
  mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, resource.positions.clone());
  mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, resource.normals.clone());
  mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, resource.uvs.clone());
  mesh.insert_indices(Indices::U32(resource.indices.to_vec()));
  mesh
}

/// Convert painted imagery to an sRGB texture.
pub fn imagery_to_image(imagery: &ImageryTexture) -> Image {
  Image::new(
    Extent3d {
      width: imagery.width,
      height: imagery.height,
      depth_or_array_layers: 1,
    },
    TextureDimension::D2,
    imagery.rgba.clone(),
    TextureFormat::Rgba8UnormSrgb,
    RenderAssetUsages::default(),
  )
}

fn tile_material(resource: &MeshResource, images: &mut Assets<Image>) -> StandardMaterial {
  match &resource.imagery {
    Some(imagery) => StandardMaterial {
      base_color_texture: Some(images.add(imagery_to_image(imagery))),
      perceptual_roughness: 1.0,
      ..default()
    },
    None => StandardMaterial {
      base_color: Color::srgb(0.55, 0.55, 0.5),
      perceptual_roughness: 1.0,
      ..default()
    },
  }
}

/// System that mirrors loaded visible nodes as mesh entities.
pub fn sync_tile_entities(
  mut commands: Commands,
  terrain: Res<TerrainStreamerResource>,
  mut map: ResMut<TileEntityMap>,
  mut tiles: Query<(&mut TerrainTile, &Mesh3d, &MeshMaterial3d<StandardMaterial>)>,
  mut meshes: ResMut<Assets<Mesh>>,
  mut materials: ResMut<Assets<StandardMaterial>>,
  mut images: ResMut<Assets<Image>>,
) {
  let streamer = &terrain.streamer;
  let visible: Vec<TileState> = streamer
    .visible_nodes()
    .into_iter()
    .filter_map(|id| {
      let mesh = streamer.mesh(id).filter(|m| m.data_ready)?;
      Some(TileState {
        node: id,
        generation: streamer.tree().node(id).generation,
        revision: mesh.revision,
      })
    })
    .collect();

  let plan = plan_tile_sync(&visible, &map, |entity| {
    tiles.get(entity).ok().map(|(tile, _, _)| tile.revision)
  });

  for (node, entity) in plan.despawn {
    map.remove(node);
    commands.entity(entity).despawn();
  }

  for (entity, state) in plan.refresh {
    let (Some(resource), Ok((mut tile, mesh3d, material3d))) =
      (streamer.mesh(state.node), tiles.get_mut(entity))
    else {
      continue;
    };
    if let Some(mesh) = meshes.get_mut(&mesh3d.0) {
      *mesh = tile_mesh_to_bevy(resource);
    }
    if let Some(material) = materials.get_mut(&material3d.0) {
      *material = tile_material(resource, &mut images);
    }
    tile.revision = state.revision;
  }

  for state in plan.spawn {
    let Some(resource) = streamer.mesh(state.node) else {
      continue;
    };
    let entity = commands
      .spawn((
        Mesh3d(meshes.add(tile_mesh_to_bevy(resource))),
        MeshMaterial3d(materials.add(tile_material(resource, &mut images))),
        Transform::from_translation(resource.translation.as_vec3()),
        TerrainTile {
          node: state.node,
          generation: state.generation,
          revision: state.revision,
        },
      ))
      .id();
    map.insert(state.node, state.generation, entity);
  }
}

#[cfg(test)]
#[path = "entities_test.rs"]
mod entities_test;
