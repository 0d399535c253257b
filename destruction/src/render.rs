//! Engine-agnostic scene model.
//!
//! The destruction subsystem never talks to a renderer directly. It edits a
//! [`RenderScene`] (cached geometry and materials, instanced batches, single
//! meshes) and records structural edits as [`SceneChange`]s. A renderer
//! drains the change log once per frame and mirrors it; transforms and
//! visibility are read straight from [`SceneMesh`].
//!
//! Geometry and materials are keyed by content and never freed: every
//! structure with the same cell size shares one cube, and every block with
//! the same color/alpha shares one material.

use std::collections::HashMap;

use crate::types::{GeometryId, IdGen, MaterialId, MaterialKey, MeshId, Quat, Vec3};

/// Axis-aligned cube geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    pub id: GeometryId,
    pub edge: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub id: MaterialId,
    pub key: MaterialKey,
}

impl Material {
    #[inline]
    pub fn double_sided(&self) -> bool {
        self.key.is_translucent()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MeshKind {
    /// One draw of `instances.len()` copies; offsets are relative to the mesh transform.
    Instanced { instances: Vec<Vec3> },
    Single,
}

#[derive(Clone, Debug)]
pub struct SceneMesh {
    pub id: MeshId,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub kind: MeshKind,
    pub translation: Vec3,
    pub rotation: Quat,
    pub visible: bool,
}

impl SceneMesh {
    pub fn instance_count(&self) -> usize {
        match &self.kind {
            MeshKind::Instanced { instances } => instances.len(),
            MeshKind::Single => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneChange {
    Added(MeshId),
    Removed(MeshId),
}

#[derive(Default)]
pub struct RenderScene {
    ids: IdGen,
    geometry_cache: HashMap<u32, GeometryId>,
    geometries: HashMap<GeometryId, Geometry>,
    material_cache: HashMap<MaterialKey, MaterialId>,
    materials: HashMap<MaterialId, Material>,
    meshes: HashMap<MeshId, SceneMesh>,
    changes: Vec<SceneChange>,
}

impl RenderScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached cube of edge `edge`.
    pub fn cube(&mut self, edge: f32) -> GeometryId {
        if let Some(id) = self.geometry_cache.get(&edge.to_bits()) {
            return *id;
        }
        let id = GeometryId(self.ids.next_raw());
        self.geometry_cache.insert(edge.to_bits(), id);
        self.geometries.insert(id, Geometry { id, edge });
        id
    }

    pub fn material(&mut self, key: MaterialKey) -> MaterialId {
        if let Some(id) = self.material_cache.get(&key) {
            return *id;
        }
        let id = MaterialId(self.ids.next_raw());
        self.material_cache.insert(key, id);
        self.materials.insert(id, Material { id, key });
        id
    }

    pub fn add_instanced(
        &mut self,
        geometry: GeometryId,
        material: MaterialId,
        translation: Vec3,
        instances: Vec<Vec3>,
    ) -> MeshId {
        self.insert(SceneMesh {
            id: MeshId(0),
            geometry,
            material,
            kind: MeshKind::Instanced { instances },
            translation,
            rotation: Quat::identity(),
            visible: true,
        })
    }

    pub fn add_single(
        &mut self,
        geometry: GeometryId,
        material: MaterialId,
        translation: Vec3,
        rotation: Quat,
    ) -> MeshId {
        self.insert(SceneMesh {
            id: MeshId(0),
            geometry,
            material,
            kind: MeshKind::Single,
            translation,
            rotation,
            visible: true,
        })
    }

    fn insert(&mut self, mut mesh: SceneMesh) -> MeshId {
        let id = MeshId(self.ids.next_raw());
        mesh.id = id;
        self.meshes.insert(id, mesh);
        self.changes.push(SceneChange::Added(id));
        id
    }

    /// Detach a mesh. Idempotent.
    pub fn remove(&mut self, id: MeshId) -> bool {
        if self.meshes.remove(&id).is_some() {
            self.changes.push(SceneChange::Removed(id));
            true
        } else {
            false
        }
    }

    pub fn set_transform(&mut self, id: MeshId, translation: Vec3, rotation: Quat) {
        if let Some(mesh) = self.meshes.get_mut(&id) {
            mesh.translation = translation;
            mesh.rotation = rotation;
        }
    }

    /// Returns `true` only if the visibility actually changed.
    pub fn set_visible(&mut self, id: MeshId, visible: bool) -> bool {
        match self.meshes.get_mut(&id) {
            Some(mesh) if mesh.visible != visible => {
                mesh.visible = visible;
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn mesh(&self, id: MeshId) -> Option<&SceneMesh> {
        self.meshes.get(&id)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &SceneMesh> {
        self.meshes.values()
    }

    #[inline]
    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(&id)
    }

    #[inline]
    pub fn material_def(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    #[inline]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    #[inline]
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    #[inline]
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Take every structural change since the last call.
    pub fn drain_changes(&mut self) -> Vec<SceneChange> {
        std::mem::take(&mut self.changes)
    }
}
