//! Camera view and frustum tests for chunk culling.
//!
//! Planes are extracted from the view-projection matrix (Gribb/Hartmann):
//! each plane is `row3 ± rowN`, normalized so that `n ⋅ p + d` is a signed
//! distance in meters. Clip space follows the OpenGL convention
//! (`-w <= z <= w`), which is what `nalgebra::Perspective3` produces.

use nalgebra::{Isometry3, Matrix4, Perspective3};

use crate::types::{Point3, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Self {
        let normal = Vec3::new(a, b, c);
        let len = normal.norm();
        if len > 0.0 {
            Self {
                normal: normal / len,
                d: d / len,
            }
        } else {
            Self { normal, d }
        }
    }

    #[inline]
    pub fn signed_distance(&self, p: &Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }
}

/// Left, right, bottom, top, near, far.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    pub fn from_view_projection(m: &Matrix4<f32>) -> Self {
        let row = |r: usize| [m[(r, 0)], m[(r, 1)], m[(r, 2)], m[(r, 3)]];
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let add = |a: [f32; 4], b: [f32; 4]| {
            Plane::from_coefficients(a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3])
        };
        let sub = |a: [f32; 4], b: [f32; 4]| {
            Plane::from_coefficients(a[0] - b[0], a[1] - b[1], a[2] - b[2], a[3] - b[3])
        };
        Self {
            planes: [
                add(r3, r0),
                sub(r3, r0),
                add(r3, r1),
                sub(r3, r1),
                add(r3, r2),
                sub(r3, r2),
            ],
        }
    }

    /// Conservative sphere test: `false` only if the sphere is fully outside a plane.
    pub fn intersects_sphere(&self, center: &Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|p| p.signed_distance(center) >= -radius)
    }
}

/// Where the camera is and what it sees.
#[derive(Clone, Copy, Debug)]
pub struct CameraView {
    pub position: Vec3,
    frustum: Option<Frustum>,
}

impl CameraView {
    /// Right-handed perspective camera looking along `forward`.
    pub fn perspective(
        position: Vec3,
        forward: Vec3,
        up: Vec3,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let eye = Point3::from(position);
        let target = eye + forward;
        let view = Isometry3::look_at_rh(&eye, &target, &up).to_homogeneous();
        let projection = Perspective3::new(aspect, fov_y, near, far).to_homogeneous();
        Self {
            position,
            frustum: Some(Frustum::from_view_projection(&(projection * view))),
        }
    }

    /// A camera with no frustum; only distance rules apply.
    pub fn omnidirectional(position: Vec3) -> Self {
        Self {
            position,
            frustum: None,
        }
    }

    #[inline]
    pub fn frustum(&self) -> Option<&Frustum> {
        self.frustum.as_ref()
    }

    #[inline]
    pub fn sees_sphere(&self, center: &Vec3, radius: f32) -> bool {
        self.frustum
            .as_ref()
            .is_none_or(|f| f.intersects_sphere(center, radius))
    }

    #[inline]
    pub fn distance_to(&self, p: &Vec3) -> f32 {
        (p - self.position).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn looking_down_neg_z() -> CameraView {
        CameraView::perspective(
            Vec3::zeros(),
            -Vec3::z(),
            Vec3::y(),
            FRAC_PI_2,
            1.0,
            0.1,
            100.0,
        )
    }

    #[test]
    fn sphere_in_front_is_visible() {
        let cam = looking_down_neg_z();
        assert!(cam.sees_sphere(&Vec3::new(0.0, 0.0, -10.0), 1.0));
        assert!(cam.sees_sphere(&Vec3::new(9.0, 0.0, -10.0), 1.0));
    }

    #[test]
    fn sphere_behind_or_beside_is_culled() {
        let cam = looking_down_neg_z();
        assert!(!cam.sees_sphere(&Vec3::new(0.0, 0.0, 10.0), 1.0));
        assert!(!cam.sees_sphere(&Vec3::new(30.0, 0.0, -10.0), 1.0));
        assert!(!cam.sees_sphere(&Vec3::new(0.0, 0.0, -150.0), 1.0));
    }

    #[test]
    fn radius_keeps_straddling_spheres() {
        let cam = looking_down_neg_z();
        // Center just behind the near plane, but the sphere pokes through.
        assert!(cam.sees_sphere(&Vec3::new(0.0, 0.0, 0.5), 1.0));
    }

    #[test]
    fn omnidirectional_sees_everything() {
        let cam = CameraView::omnidirectional(Vec3::new(1.0, 2.0, 3.0));
        assert!(cam.sees_sphere(&Vec3::new(0.0, 0.0, 1.0e4), 0.0));
        assert_eq!(cam.distance_to(&Vec3::new(1.0, 2.0, 7.0)), 4.0);
    }
}
