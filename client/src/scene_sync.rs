//! Mirrors the destruction world's scene model into Bevy entities.
//!
//! Structural edits come from the scene's change log; transforms and
//! visibility are copied every frame. Each instanced batch becomes a parent
//! entity with one child per instance, since the batch transform is shared.

use std::collections::HashMap;

use bevy::prelude::*;
use destruction::render::{MeshKind, RenderScene, SceneChange, SceneMesh};
use destruction::types::{GeometryId, MaterialId, MeshId};

use crate::convert::{to_glam, to_glam_quat};
use crate::sandbox::{Sandbox, SandboxSet};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<SceneAssets>();
    app.init_resource::<MirroredMeshes>();
    app.add_systems(
        Update,
        (apply_scene_changes, sync_mesh_state)
            .chain()
            .in_set(SandboxSet::Mirror),
    );
}

#[derive(Resource, Default)]
struct SceneAssets {
    meshes: HashMap<GeometryId, Handle<Mesh>>,
    materials: HashMap<MaterialId, Handle<StandardMaterial>>,
}

impl SceneAssets {
    fn mesh(
        &mut self,
        scene: &RenderScene,
        id: GeometryId,
        meshes: &mut Assets<Mesh>,
    ) -> Option<Handle<Mesh>> {
        if let Some(handle) = self.meshes.get(&id) {
            return Some(handle.clone());
        }
        let edge = scene.geometry(id)?.edge;
        let handle = meshes.add(Cuboid::new(edge, edge, edge));
        self.meshes.insert(id, handle.clone());
        Some(handle)
    }

    fn material(
        &mut self,
        scene: &RenderScene,
        id: MaterialId,
        materials: &mut Assets<StandardMaterial>,
    ) -> Option<Handle<StandardMaterial>> {
        if let Some(handle) = self.materials.get(&id) {
            return Some(handle.clone());
        }
        let def = scene.material_def(id)?;
        let [r, g, b] = def.key.color.to_f32();
        let translucent = def.double_sided();
        let handle = materials.add(StandardMaterial {
            base_color: Color::srgba(r, g, b, def.key.alpha()),
            alpha_mode: if translucent {
                AlphaMode::Blend
            } else {
                AlphaMode::Opaque
            },
            double_sided: translucent,
            cull_mode: if translucent {
                None
            } else {
                Some(bevy::render::render_resource::Face::Back)
            },
            perceptual_roughness: 0.8,
            ..default()
        });
        self.materials.insert(id, handle.clone());
        Some(handle)
    }
}

#[derive(Resource, Default)]
struct MirroredMeshes(HashMap<MeshId, Entity>);

#[derive(Component)]
struct MirroredMesh(MeshId);

fn visibility(mesh: &SceneMesh) -> Visibility {
    if mesh.visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

fn apply_scene_changes(
    mut commands: Commands,
    mut sandbox: ResMut<Sandbox>,
    mut assets: ResMut<SceneAssets>,
    mut mirrored: ResMut<MirroredMeshes>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let changes = sandbox.world.scene_mut().drain_changes();
    if changes.is_empty() {
        return;
    }
    let scene = sandbox.world.scene();

    for change in changes {
        match change {
            SceneChange::Added(id) => {
                // added and removed within the same frame
                let Some(mesh) = scene.mesh(id) else {
                    continue;
                };
                let (Some(mesh_handle), Some(material_handle)) = (
                    assets.mesh(scene, mesh.geometry, &mut meshes),
                    assets.material(scene, mesh.material, &mut materials),
                ) else {
                    warn!("scene mesh {id} references unknown assets");
                    continue;
                };
                let transform = Transform::from_translation(to_glam(&mesh.translation))
                    .with_rotation(to_glam_quat(&mesh.rotation));

                let entity = match &mesh.kind {
                    MeshKind::Single => commands
                        .spawn((
                            MirroredMesh(id),
                            Mesh3d(mesh_handle),
                            MeshMaterial3d(material_handle),
                            transform,
                            visibility(mesh),
                        ))
                        .id(),
                    MeshKind::Instanced { instances } => commands
                        .spawn((MirroredMesh(id), transform, visibility(mesh)))
                        .with_children(|parent| {
                            for offset in instances {
                                parent.spawn((
                                    Mesh3d(mesh_handle.clone()),
                                    MeshMaterial3d(material_handle.clone()),
                                    Transform::from_translation(to_glam(offset)),
                                ));
                            }
                        })
                        .id(),
                };
                mirrored.0.insert(id, entity);
            }
            SceneChange::Removed(id) => {
                if let Some(entity) = mirrored.0.remove(&id) {
                    commands.entity(entity).despawn();
                }
            }
        }
    }
}

fn sync_mesh_state(
    sandbox: Res<Sandbox>,
    mut query: Query<(&MirroredMesh, &mut Transform, &mut Visibility)>,
) {
    let scene = sandbox.world.scene();
    for (link, mut transform, mut vis) in &mut query {
        let Some(mesh) = scene.mesh(link.0) else {
            continue;
        };
        vis.set_if_neq(visibility(mesh));
        if matches!(mesh.kind, MeshKind::Single) {
            transform.translation = to_glam(&mesh.translation);
            transform.rotation = to_glam_quat(&mesh.rotation);
        }
    }
}
