//! The owned context that ties every registry together.
//!
//! `DestructionWorld` holds the live structures, the shared fragmentation
//! queue, the impulse queues, the body side table and both capability
//! providers (physics and scene). Nothing here is global: tests and tools can
//! build as many isolated worlds as they like.
//!
//! Frame order, see [`DestructionWorld::tick`]:
//! 1. delayed impulses that are due
//! 2. batched attraction impulses
//! 3. physics step
//! 4. fragment transforms copied into the scene
//! 5. fragmentation (batch cap + time budget)
//! 6. lifecycle (cull, age, despawn, dispose)

use std::time::Duration;

use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

use crate::bodies::{BodyKind, BodyRegistry, CollidableEntry, EntryFilter};
use crate::config::Tunables;
use crate::fragmentation::{FragmentationEngine, FragmentationProgress, ImpulseSpec};
use crate::frustum::CameraView;
use crate::impulse::{DelayedImpulses, ImpulseBatcher, clamp_magnitude};
use crate::lifecycle::LifecycleReport;
use crate::physics::PhysicsWorld;
use crate::rapier::StaticDef;
use crate::render::RenderScene;
use crate::structure::{Structure, StructureState};
use crate::types::{FragmentId, IdGen, Point3, StructureId, Vec3};

/// What one [`DestructionWorld::tick`] did.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub delayed_impulses: usize,
    pub batched_impulses: usize,
    pub fragmentation: FragmentationProgress,
    pub lifecycle: LifecycleReport,
}

pub struct DestructionWorld {
    pub(crate) tunables: Tunables,
    pub(crate) physics: PhysicsWorld,
    pub(crate) scene: RenderScene,
    pub(crate) bodies: BodyRegistry,
    pub(crate) structures: Vec<Structure>,
    pub(crate) fragmentation: FragmentationEngine,
    pub(crate) impulses: ImpulseBatcher,
    pub(crate) delayed: DelayedImpulses,
    pub(crate) now: Duration,
    pub(crate) structure_ids: IdGen,
    pub(crate) fragment_ids: IdGen,
}

impl Default for DestructionWorld {
    fn default() -> Self {
        Self::new(Tunables::default())
    }
}

impl DestructionWorld {
    pub fn new(tunables: Tunables) -> Self {
        Self {
            physics: PhysicsWorld::new(tunables.gravity, tunables.max_physics_dt),
            impulses: ImpulseBatcher::new(
                tunables.impulse_max_queue,
                tunables.max_impulse_magnitude,
            ),
            tunables,
            scene: RenderScene::new(),
            bodies: BodyRegistry::default(),
            structures: Vec::new(),
            fragmentation: FragmentationEngine::default(),
            delayed: DelayedImpulses::default(),
            now: Duration::ZERO,
            structure_ids: IdGen::default(),
            fragment_ids: IdGen::default(),
        }
    }

    /// Add a ground plane at height `y`.
    pub fn with_ground(mut self, y: f32) -> Self {
        self.add_environment(&StaticDef::ground(y));
        self
    }

    /// Insert an environment static; it is not a target and never resolves.
    pub fn add_environment(&mut self, def: &StaticDef) -> RigidBodyHandle {
        self.physics.add_static(def)
    }

    #[inline]
    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    #[inline]
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// Direct access for gameplay bodies (targets, bust, rafts).
    #[inline]
    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    #[inline]
    pub fn scene(&self) -> &RenderScene {
        &self.scene
    }

    #[inline]
    pub fn scene_mut(&mut self) -> &mut RenderScene {
        &mut self.scene
    }

    #[inline]
    pub fn impulses(&self) -> &ImpulseBatcher {
        &self.impulses
    }

    #[inline]
    pub fn impulses_mut(&mut self) -> &mut ImpulseBatcher {
        &mut self.impulses
    }

    #[inline]
    pub fn fragmentation(&self) -> &FragmentationEngine {
        &self.fragmentation
    }

    /// World clock: sum of all ticked `dt`.
    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Live structures in spawn order.
    #[inline]
    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.iter().find(|s| s.id == id)
    }

    #[inline]
    pub(crate) fn structure_index(&self, id: StructureId) -> Option<usize> {
        self.structures.iter().position(|s| s.id == id)
    }

    /// Run one frame.
    pub fn tick(&mut self, dt: f32, camera: &CameraView) -> TickReport {
        if dt.is_finite() && dt > 0.0 {
            self.now += Duration::from_secs_f32(dt);
        }

        let delayed_impulses = self.delayed.apply_due(&mut self.physics, self.now);
        let batched_impulses = self
            .impulses
            .drain(&mut self.physics, self.tunables.impulse_batch_per_frame);

        self.physics.step(dt);
        self.sync_fragment_transforms();

        let fragmentation = self.process_fragmentation();
        let lifecycle = self.run_lifecycle(camera);

        TickReport {
            delayed_impulses,
            batched_impulses,
            fragmentation,
            lifecycle,
        }
    }

    fn sync_fragment_transforms(&mut self) {
        for structure in &self.structures {
            for fragment in &structure.fragments {
                let Some(rb) = self.physics.bodies.get(fragment.body) else {
                    continue;
                };
                self.scene
                    .set_transform(fragment.mesh, *rb.translation(), *rb.rotation());
            }
        }
    }

    /// Schedule a break impulse, clamped in magnitude and delay.
    pub(crate) fn schedule_impulse(&mut self, body: RigidBodyHandle, spec: ImpulseSpec) {
        let vector = clamp_magnitude(spec.vector, self.tunables.max_impulse_magnitude);
        let delay = spec
            .delay
            .unwrap_or(Duration::ZERO)
            .min(self.tunables.max_impulse_delay);
        self.delayed
            .schedule(body, vector, spec.point, self.now + delay);
    }

    /// Remove one fragment: scene mesh, body, side-table entry, structure slot.
    ///
    /// Does not dispose the structure; the lifecycle pass (or
    /// [`DestructionWorld::remove_entry`]) does that once it is empty.
    pub fn remove_fragment(&mut self, structure: StructureId, fragment: FragmentId) -> bool {
        let Some(idx) = self.structure_index(structure) else {
            return false;
        };
        let fragments = &mut self.structures[idx].fragments;
        let Some(pos) = fragments.iter().position(|f| f.id == fragment) else {
            return false;
        };
        let removed = fragments.remove(pos);
        self.scene.remove(removed.mesh);
        self.bodies.remove(removed.body);
        self.impulses.remove(removed.body);
        self.physics.remove_body(removed.body);
        true
    }

    /// Release everything a structure owns and drop it from the registry.
    ///
    /// Cancels a still-queued fragmentation task. Unknown ids are ignored.
    pub fn dispose_structure(&mut self, id: StructureId) -> bool {
        let Some(idx) = self.structure_index(id) else {
            return false;
        };
        if self.fragmentation.cancel(id) {
            log::debug!("cancelled pending fragmentation of {id}");
        }

        let mut structure = self.structures.remove(idx);
        if let Some(body) = structure.static_body.take() {
            self.bodies.remove(body);
            self.physics.remove_body(body);
        }
        for chunk in structure.chunks.drain(..) {
            for batch in chunk.batches {
                self.scene.remove(batch.mesh);
            }
        }
        for fragment in structure.fragments.drain(..) {
            self.scene.remove(fragment.mesh);
            self.bodies.remove(fragment.body);
            self.impulses.remove(fragment.body);
            self.physics.remove_body(fragment.body);
        }
        structure.state = StructureState::Disposed;

        log::info!(
            "disposed structure {id} ({})",
            structure.name.as_deref().unwrap_or("unnamed")
        );
        true
    }

    /// Dispose every structure and drop all pending impulses.
    pub fn clear_all(&mut self) -> usize {
        let ids: Vec<StructureId> = self.structures.iter().map(|s| s.id).collect();
        let count = ids.len();
        for id in ids {
            self.dispose_structure(id);
        }
        self.fragmentation.clear();
        self.impulses.clear();
        self.delayed.clear();
        log::info!("cleared {count} structures");
        count
    }

    /// Tag a gameplay-owned body so hit-testing can resolve it.
    ///
    /// Structure kinds are managed internally and are rejected here, as are
    /// bodies a structure already owns.
    pub fn register_body(&mut self, body: RigidBodyHandle, kind: BodyKind) -> bool {
        if kind.is_structure() || !self.physics.is_alive(body) {
            return false;
        }
        if self.bodies.get(body).is_some_and(|k| k.is_structure()) {
            return false;
        }
        self.bodies.insert(body, kind);
        true
    }

    pub fn unregister_body(&mut self, body: RigidBodyHandle) -> Option<BodyKind> {
        match self.bodies.get(body) {
            Some(kind) if !kind.is_structure() => {
                self.impulses.remove(body);
                self.bodies.remove(body)
            }
            _ => None,
        }
    }

    /// Everything a weapon can currently hit.
    ///
    /// Order: gameplay bodies (by handle), then per structure either its
    /// static collider or each of its fragments.
    pub fn collidable_entries(&self, filter: EntryFilter) -> Vec<CollidableEntry> {
        let mut entries: Vec<CollidableEntry> = self
            .bodies
            .external()
            .filter(|e| filter.admits(&e.kind) && self.physics.is_alive(e.body))
            .collect();
        entries.sort_by_key(|e| e.body.into_raw_parts());

        for structure in &self.structures {
            if structure.is_static() {
                if let Some(body) = structure.static_body {
                    entries.push(CollidableEntry {
                        kind: BodyKind::StructureStatic(structure.id),
                        body,
                    });
                }
                continue;
            }
            entries.extend(structure.fragments.iter().map(|f| CollidableEntry {
                kind: BodyKind::StructurePart {
                    structure: structure.id,
                    fragment: f.id,
                },
                body: f.body,
            }));
        }
        entries
    }

    /// Map a body from a collision callback or ray hit back to its owner.
    pub fn resolve_body(
        &self,
        body: RigidBodyHandle,
        filter: EntryFilter,
    ) -> Option<CollidableEntry> {
        let kind = self.bodies.get(body)?;
        if !filter.admits(&kind) {
            return None;
        }
        let live = match kind {
            BodyKind::StructureStatic(id) => self
                .structure(id)
                .is_some_and(|s| s.is_static() && s.static_body == Some(body)),
            BodyKind::StructurePart {
                structure,
                fragment,
            } => self
                .structure(structure)
                .and_then(|s| s.fragment(fragment))
                .is_some_and(|f| f.body == body),
            BodyKind::Target(_) | BodyKind::Bust | BodyKind::Raft(_) => {
                self.physics.is_alive(body)
            }
        };
        live.then_some(CollidableEntry { kind, body })
    }

    pub fn resolve_collider(
        &self,
        collider: ColliderHandle,
        filter: EntryFilter,
    ) -> Option<CollidableEntry> {
        let body = self.physics.body_of_collider(collider)?;
        self.resolve_body(body, filter)
    }

    /// Cast a ray and resolve the first body hit.
    pub fn hit_test(
        &self,
        origin: Vec3,
        dir: Vec3,
        max_distance: f32,
        filter: EntryFilter,
    ) -> Option<(CollidableEntry, f32)> {
        let (body, toi) = self
            .physics
            .cast_ray(Point3::from(origin), dir, max_distance)?;
        self.resolve_body(body, filter).map(|e| (e, toi))
    }

    /// Remove whatever `entry` refers to.
    ///
    /// A fragment takes its structure with it when it was the last one; a
    /// static structure is disposed; a gameplay body is removed from physics.
    pub fn remove_entry(&mut self, entry: CollidableEntry) -> bool {
        match entry.kind {
            BodyKind::StructurePart {
                structure,
                fragment,
            } => {
                let removed = self.remove_fragment(structure, fragment);
                let emptied = self.structure(structure).is_some_and(|s| {
                    s.state == StructureState::Fragments && s.fragments.is_empty()
                });
                if emptied {
                    self.dispose_structure(structure);
                }
                removed
            }
            BodyKind::StructureStatic(id) => self.dispose_structure(id),
            BodyKind::Target(_) | BodyKind::Bust | BodyKind::Raft(_) => {
                self.bodies.remove(entry.body);
                self.impulses.remove(entry.body);
                self.physics.remove_body(entry.body)
            }
        }
    }

    /// Pull every loose body toward `player`.
    ///
    /// Drops pending attraction requests, damps each dynamic fragment and
    /// gameplay body (linear velocity x0.2, spin stopped) and queues a fresh
    /// pull of `magnitude`. Static structures and passive debris stay put.
    pub fn attract_debris(&mut self, player: Vec3, magnitude: f32) -> usize {
        self.impulses.clear();
        let targets: Vec<RigidBodyHandle> = self
            .collidable_entries(EntryFilter::all())
            .into_iter()
            .filter(|e| !matches!(e.kind, BodyKind::StructureStatic(_)))
            .map(|e| e.body)
            .filter(|b| self.physics.is_dynamic(*b))
            .collect();
        for body in &targets {
            self.physics.damp_velocity(*body, 0.2);
            self.impulses.queue(*body, magnitude, player);
        }
        targets.len()
    }
}
