//! Structure spawning: block data → chunked instanced batches + one merged static collider.

use std::collections::BTreeMap;

use crate::bodies::BodyKind;
use crate::constants::{CHUNK_RADIUS_PADDING, SPAWN_BASE_DISTANCE};
use crate::data::{NormalizedStructure, StructureData};
use crate::error::SpawnError;
use crate::grid::ChunkKey;
use crate::merge::merge;
use crate::structure::{BlockEntry, Chunk, ChunkBatch, Structure, StructureState};
use crate::types::{MaterialKey, StructureId, Vec3};
use crate::world::DestructionWorld;

/// Where a new structure goes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnPlacement {
    /// Footprint centered on `x/z`, lowest row resting on `y`.
    At(Vec3),
    /// On the ground in front of a viewer, pushed back by the structure's footprint.
    InFrontOf {
        position: Vec3,
        forward: Vec3,
        ground_y: f32,
    },
}

impl SpawnPlacement {
    fn origin(&self, n: &NormalizedStructure) -> Vec3 {
        match *self {
            SpawnPlacement::At(p) => p,
            SpawnPlacement::InFrontOf {
                position,
                forward,
                ground_y,
            } => {
                let flat = Vec3::new(forward.x, 0.0, forward.z)
                    .try_normalize(1.0e-6)
                    .unwrap_or(-Vec3::z());
                let (width, depth) = n.footprint();
                let spread = width.max(depth);
                let distance = SPAWN_BASE_DISTANCE + (spread - n.cell_size).max(0.0) * 0.5;
                let p = position + flat * distance;
                Vec3::new(p.x, ground_y, p.z)
            }
        }
    }
}

impl DestructionWorld {
    /// Spawn a structure from catalog data.
    ///
    /// Fails without side effects when the data has no blocks or does not
    /// validate.
    pub fn spawn(
        &mut self,
        data: &StructureData,
        placement: SpawnPlacement,
    ) -> Result<StructureId, SpawnError> {
        let normalized = data.normalize()?;
        Ok(self.spawn_normalized(normalized, placement))
    }

    pub fn spawn_normalized(
        &mut self,
        n: NormalizedStructure,
        placement: SpawnPlacement,
    ) -> StructureId {
        let id = StructureId(self.structure_ids.next_raw());
        let cs = n.cell_size;
        let origin = placement.origin(&n);
        let (center_x, center_z) = n.footprint_center();
        let min_y = n.bounds.min.y;

        // grid space (cell centers at (c + 0.5) * cs) → structure local frame
        let shift = Vec3::new(-center_x, -(min_y as f32) * cs, -center_z);
        let chunk_size = self.tunables.chunk_size;

        let blocks: Vec<BlockEntry> = n
            .blocks
            .iter()
            .map(|b| {
                let local_offset = Vec3::new(
                    (b.coord.x as f32 + 0.5) * cs,
                    (b.coord.y as f32 + 0.5) * cs,
                    (b.coord.z as f32 + 0.5) * cs,
                ) + shift;
                BlockEntry {
                    coord: b.coord,
                    color: b.color,
                    alpha: b.alpha,
                    local_offset,
                    world_position: origin + local_offset,
                    chunk: b.coord.chunk(chunk_size),
                }
            })
            .collect();

        let chunks = self.build_chunks(&blocks, origin, cs);

        let coords: Vec<_> = blocks.iter().map(|b| b.coord).collect();
        let boxes = merge(&coords, cs);
        let static_body = self.physics.add_static_boxes(origin, &boxes, shift);
        self.bodies
            .insert(static_body, BodyKind::StructureStatic(id));

        log::info!(
            "spawned {id} ({}) at {:.2?}: {} blocks, {} chunks, {} batches, {} colliders",
            n.name.as_deref().unwrap_or("unnamed"),
            origin.as_slice(),
            blocks.len(),
            chunks.len(),
            chunks.iter().map(|c| c.batches.len()).sum::<usize>(),
            boxes.len(),
        );

        self.structures.push(Structure {
            id,
            name: n.name,
            cell_size: cs,
            bounds: n.bounds,
            origin,
            blocks,
            state: StructureState::Static,
            chunks,
            static_body: Some(static_body),
            fragments: Vec::new(),
        });
        id
    }

    /// Bucket blocks per chunk, then per material, and register one instanced
    /// batch for every bucket.
    fn build_chunks(&mut self, blocks: &[BlockEntry], origin: Vec3, cs: f32) -> Vec<Chunk> {
        let mut buckets: BTreeMap<ChunkKey, BTreeMap<MaterialKey, Vec<usize>>> = BTreeMap::new();
        for (i, b) in blocks.iter().enumerate() {
            buckets
                .entry(b.chunk)
                .or_default()
                .entry(b.material_key())
                .or_default()
                .push(i);
        }

        let geometry = self.scene.cube(cs);
        let mut chunks = Vec::with_capacity(buckets.len());
        for (key, by_material) in buckets {
            let members: Vec<usize> = by_material.values().flatten().copied().collect();
            let centroid = members
                .iter()
                .map(|&i| blocks[i].world_position)
                .sum::<Vec3>()
                / members.len() as f32;
            let radius = members
                .iter()
                .map(|&i| (blocks[i].world_position - centroid).norm())
                .fold(0.0_f32, f32::max)
                + cs * CHUNK_RADIUS_PADDING;

            let batches = by_material
                .into_iter()
                .map(|(material, entries)| {
                    let material_id = self.scene.material(material);
                    let instances = entries.iter().map(|&i| blocks[i].local_offset).collect();
                    let mesh = self
                        .scene
                        .add_instanced(geometry, material_id, origin, instances);
                    ChunkBatch {
                        material,
                        mesh,
                        entries,
                    }
                })
                .collect();

            chunks.push(Chunk {
                key,
                centroid,
                radius,
                batches,
                visible: true,
            });
        }
        chunks
    }
}
