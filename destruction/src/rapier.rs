use rapier3d::{na::UnitQuaternion, prelude::*};

/// Definition of an immutable environment collider (ground, walls, props).
#[derive(Clone, Debug)]
pub struct StaticDef {
    /// World-space translation.
    pub translation: Vector<f32>,
    /// World-space rotation (unit quaternion).
    pub rotation: UnitQuaternion<f32>,
    pub shape: StaticShape,
}

impl StaticDef {
    /// Horizontal ground plane at height `y`.
    pub fn ground(y: f32) -> Self {
        Self {
            translation: vector![0.0, y, 0.0],
            rotation: UnitQuaternion::identity(),
            shape: StaticShape::Plane {
                offset_along_normal: 0.0,
            },
        }
    }
}

/// Supported environment shapes.
#[derive(Clone, Debug)]
pub enum StaticShape {
    /// Infinite plane (half-space).
    ///
    /// The plane normal is derived from the pose as `rotation * +Y`.
    Plane {
        /// Offset along the plane normal (meters).
        offset_along_normal: f32,
    },

    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vector<f32> },
}

/// Build a world-space Rapier collider for a [`StaticDef`].
///
/// The collider is meant to hang off a fixed body at the identity pose, so the
/// def's pose is baked into the collider itself.
pub fn collider_from_def(def: &StaticDef) -> Collider {
    match &def.shape {
        StaticShape::Plane {
            offset_along_normal,
        } => {
            // n = R * +Y; the plane is n ⋅ x = n ⋅ t + offset.
            let n = def.rotation * Vector::y();
            let dist = n.dot(&def.translation) + *offset_along_normal;
            let unit_n = UnitVector::new_normalize(n);

            ColliderBuilder::new(SharedShape::new(HalfSpace::new(unit_n)))
                .translation(unit_n.into_inner() * dist)
                .build()
        }

        StaticShape::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
                .translation(def.translation)
                .rotation(def.rotation.scaled_axis())
                .build()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_plane_sits_at_height() {
        let c = collider_from_def(&StaticDef::ground(-2.0));
        assert_eq!(c.translation().y, -2.0);
        assert!(c.shape().as_halfspace().is_some());
    }

    #[test]
    fn cuboid_keeps_pose() {
        let def = StaticDef {
            translation: vector![1.0, 2.0, 3.0],
            rotation: UnitQuaternion::identity(),
            shape: StaticShape::Cuboid {
                half_extents: vector![0.5, 0.5, 0.5],
            },
        };
        let c = collider_from_def(&def);
        assert_eq!(*c.translation(), vector![1.0, 2.0, 3.0]);
    }
}
