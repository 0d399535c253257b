//! Structure, chunk and fragment records.
//!
//! A [`Structure`] is in exactly one of two shapes:
//! - unbroken (`Static`): `static_body` and `chunks` are set, `fragments` is empty;
//! - broken (`Breaking`/`Fragments`): no static body, no chunks, and one
//!   [`Fragment`] per materialized block.
//!
//! Fragments only ever leave a structure; nothing merges them back.

use std::time::Duration;

use rapier3d::prelude::RigidBodyHandle;

use crate::grid::{ChunkKey, GridBounds, GridCoord};
use crate::types::{FragmentId, MaterialKey, MeshId, Rgb, StructureId, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructureState {
    Static,
    Breaking,
    Fragments,
    Disposed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DynamicState {
    Active,
    Passive,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockEntry {
    pub coord: GridCoord,
    pub color: Rgb,
    pub alpha: f32,
    /// Offset of the cell center from the structure origin.
    pub local_offset: Vec3,
    pub world_position: Vec3,
    pub chunk: ChunkKey,
}

impl BlockEntry {
    #[inline]
    pub fn material_key(&self) -> MaterialKey {
        MaterialKey::new(self.color, self.alpha)
    }
}

/// One instanced draw within a chunk.
#[derive(Clone, Debug)]
pub struct ChunkBatch {
    pub material: MaterialKey,
    pub mesh: MeshId,
    /// Indices into [`Structure::blocks`].
    pub entries: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct Chunk {
    pub key: ChunkKey,
    pub centroid: Vec3,
    pub radius: f32,
    pub batches: Vec<ChunkBatch>,
    pub visible: bool,
}

#[derive(Clone, Debug)]
pub struct Fragment {
    pub id: FragmentId,
    pub structure: StructureId,
    pub mesh: MeshId,
    pub body: RigidBodyHandle,
    /// Index into the owning structure's blocks.
    pub entry: usize,
    pub spawned_at: Duration,
    pub state: DynamicState,
    pub mass: f32,
}

impl Fragment {
    #[inline]
    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.spawned_at)
    }
}

#[derive(Clone, Debug)]
pub struct Structure {
    pub id: StructureId,
    pub name: Option<String>,
    pub cell_size: f32,
    pub bounds: GridBounds,
    pub origin: Vec3,
    pub blocks: Vec<BlockEntry>,
    pub state: StructureState,
    pub chunks: Vec<Chunk>,
    pub static_body: Option<RigidBodyHandle>,
    pub fragments: Vec<Fragment>,
}

impl Structure {
    #[inline]
    pub fn is_static(&self) -> bool {
        self.state == StructureState::Static
    }

    /// Total number of instances across all chunk batches.
    pub fn batched_block_count(&self) -> usize {
        self.chunks
            .iter()
            .flat_map(|c| c.batches.iter())
            .map(|b| b.entries.len())
            .sum()
    }

    pub fn batch_count(&self) -> usize {
        self.chunks.iter().map(|c| c.batches.len()).sum()
    }

    pub fn fragment(&self, id: FragmentId) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.id == id)
    }
}
