//! Rigid-body world wrapper.
//!
//! `PhysicsWorld` owns every Rapier set and pipeline the destruction subsystem
//! needs, and exposes only the handful of operations the rest of the crate
//! performs on bodies: insert static/dynamic boxes, demote, remove, push,
//! query, step.
//!
//! Liveness
//! - Body handles stay valid only while the body is in the set. Every mutating
//!   helper checks first and returns `false`/`None` for a vanished body, so
//!   deferred work can call them without guarding.

use rapier3d::prelude::*;

use crate::merge::MergedBox;
use crate::rapier::{StaticDef, collider_from_def};
use crate::types::{Point3, Quat, Vec3};

/// Collision categories.
pub struct CollisionLayers;

impl CollisionLayers {
    /// Ground plane and other environment statics.
    pub const GROUND: Group = Group::GROUP_1;
    /// Player body.
    pub const PLAYER: Group = Group::GROUP_2;
    /// Melee hit volumes.
    pub const FIST: Group = Group::GROUP_3;
    /// Unbroken structures and gameplay targets.
    pub const TARGET: Group = Group::GROUP_4;
    /// Active structure debris.
    pub const DEBRIS: Group = Group::GROUP_5;

    #[inline]
    pub fn groups(memberships: Group, filter: Group) -> InteractionGroups {
        InteractionGroups {
            memberships,
            filter,
            ..InteractionGroups::all()
        }
    }

    /// Sleeping debris only keeps resting on the ground and blocking the player.
    #[inline]
    pub fn passive_debris() -> InteractionGroups {
        Self::groups(Self::DEBRIS, Self::GROUND | Self::PLAYER)
    }
}

/// Parameters of one debris body.
#[derive(Clone, Copy, Debug)]
pub struct DebrisBody {
    pub position: Vec3,
    pub half_extent: f32,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

pub struct PhysicsWorld {
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub broad_phase: BroadPhaseBvh,
    pub narrow_phase: NarrowPhase,
    islands: IslandManager,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    gravity: Vector<f32>,
    max_dt: f32,
}

impl PhysicsWorld {
    pub fn new(gravity_mps2: f32, max_dt: f32) -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            islands: IslandManager::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            pipeline: PhysicsPipeline::new(),
            params: IntegrationParameters::default(),
            gravity: vector![0.0, -gravity_mps2, 0.0],
            max_dt,
        }
    }

    /// Advance the simulation by `dt` seconds, clamped to `max_dt`.
    ///
    /// Non-positive or non-finite `dt` is ignored.
    pub fn step(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.params.dt = dt.min(self.max_dt);

        // Rapier 0.31: step(gravity, params, islands, broad, narrow, bodies, colliders,
        // impulse_joints, multibody_joints, ccd, hooks, events)
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    /// Insert an environment static (ground plane, wall, ...) in the `GROUND` category.
    pub fn add_static(&mut self, def: &StaticDef) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::fixed().build();
        let handle = self.bodies.insert(rb);
        let mut collider = collider_from_def(def);
        collider.set_collision_groups(CollisionLayers::groups(CollisionLayers::GROUND, Group::ALL));
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// One fixed body at `origin` carrying every merged box as a collider.
    ///
    /// `shift` moves the boxes from grid space into the body's local frame.
    pub fn add_static_boxes(
        &mut self,
        origin: Vec3,
        boxes: &[MergedBox],
        shift: Vec3,
    ) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::fixed().translation(origin).build();
        let handle = self.bodies.insert(rb);
        let groups = CollisionLayers::groups(CollisionLayers::TARGET, Group::ALL);
        for b in boxes {
            let collider =
                ColliderBuilder::cuboid(b.half_extents.x, b.half_extents.y, b.half_extents.z)
                    .translation(b.local_offset + shift)
                    .collision_groups(groups)
                    .build();
            self.colliders
                .insert_with_parent(collider, handle, &mut self.bodies);
        }
        handle
    }

    /// A dynamic cube in the `DEBRIS` category.
    pub fn add_debris(&mut self, body: DebrisBody) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::dynamic()
            .translation(body.position)
            .linear_damping(body.linear_damping)
            .angular_damping(body.angular_damping)
            .build();
        let handle = self.bodies.insert(rb);
        let h = body.half_extent;
        let collider = ColliderBuilder::cuboid(h, h, h)
            .mass(body.mass)
            .collision_groups(CollisionLayers::groups(CollisionLayers::DEBRIS, Group::ALL))
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Freeze a body in place: kinematic, motionless, narrowed filter, asleep.
    ///
    /// Returns `false` if the body no longer exists.
    pub fn make_passive(&mut self, handle: RigidBodyHandle) -> bool {
        let Some(rb) = self.bodies.get_mut(handle) else {
            return false;
        };
        rb.set_body_type(RigidBodyType::KinematicPositionBased, false);
        rb.set_linvel(Vector::zeros(), false);
        rb.set_angvel(Vector::zeros(), false);
        rb.sleep();
        let attached: Vec<ColliderHandle> = rb.colliders().to_vec();
        for ch in attached {
            if let Some(c) = self.colliders.get_mut(ch) {
                c.set_collision_groups(CollisionLayers::passive_debris());
            }
        }
        true
    }

    /// Remove a body and its colliders. Idempotent.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    #[inline]
    pub fn is_alive(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some()
    }

    pub fn translation(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|rb| *rb.translation())
    }

    pub fn rotation(&self, handle: RigidBodyHandle) -> Option<Quat> {
        self.bodies.get(handle).map(|rb| *rb.rotation())
    }

    pub fn body_type(&self, handle: RigidBodyHandle) -> Option<RigidBodyType> {
        self.bodies.get(handle).map(|rb| rb.body_type())
    }

    pub fn is_dynamic(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some_and(|rb| rb.is_dynamic())
    }

    pub fn linvel(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|rb| *rb.linvel())
    }

    /// Collision groups of the first collider attached to `handle`.
    pub fn collision_groups(&self, handle: RigidBodyHandle) -> Option<InteractionGroups> {
        let rb = self.bodies.get(handle)?;
        let ch = rb.colliders().first()?;
        self.colliders.get(*ch).map(|c| c.collision_groups())
    }

    /// Apply an instantaneous impulse and wake the body.
    ///
    /// Without a `point` the impulse goes through the center of mass.
    pub fn apply_impulse(
        &mut self,
        handle: RigidBodyHandle,
        impulse: Vec3,
        point: Option<Point3>,
    ) -> bool {
        let Some(rb) = self.bodies.get_mut(handle) else {
            return false;
        };
        match point {
            Some(p) => rb.apply_impulse_at_point(impulse, p, true),
            None => rb.apply_impulse(impulse, true),
        }
        true
    }

    /// Scale linear velocity by `linear_factor` and stop any spin.
    pub fn damp_velocity(&mut self, handle: RigidBodyHandle, linear_factor: f32) -> bool {
        let Some(rb) = self.bodies.get_mut(handle) else {
            return false;
        };
        let v = *rb.linvel() * linear_factor;
        rb.set_linvel(v, false);
        rb.set_angvel(Vector::zeros(), false);
        true
    }

    #[inline]
    pub fn body_of_collider(&self, handle: ColliderHandle) -> Option<RigidBodyHandle> {
        self.colliders.get(handle)?.parent()
    }

    /// First body hit by a ray, with the time of impact along `dir`.
    ///
    /// Reflects the broad phase as of the last [`PhysicsWorld::step`].
    pub fn cast_ray(
        &self,
        origin: Point3,
        dir: Vec3,
        max_toi: f32,
    ) -> Option<(RigidBodyHandle, f32)> {
        let dir = dir.try_normalize(1.0e-6)?;
        let query_pipeline = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            QueryFilter::default(),
        );
        let ray = Ray::new(origin, dir);
        let (collider, toi) = query_pipeline.cast_ray(&ray, max_toi, true)?;
        let body = self.body_of_collider(collider)?;
        self.is_alive(body).then_some((body, toi))
    }

    #[inline]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
