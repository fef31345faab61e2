use bevy::prelude::Resource;
use nalgebra::{UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// A foothold target for a leg chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// World-space foothold position.
    pub position: Vector3<f32>,
    /// Surface normal at the foothold, used for foot alignment.
    pub normal: Vector3<f32>,
    /// `true` iff this target came from a genuine surface hit within
    /// solvable range. Synthesized fallback targets set this to `false`,
    /// signaling the leg should step again as soon as it is allowed to.
    pub comfortable: bool,
}

impl Target {
    /// A comfortable target at the given position and normal.
    #[must_use]
    pub const fn new(position: Vector3<f32>, normal: Vector3<f32>) -> Self {
        Self {
            position,
            normal,
            comfortable: true,
        }
    }

    /// A synthesized fallback target (no real surface backing it).
    #[must_use]
    pub const fn fallback(position: Vector3<f32>, normal: Vector3<f32>) -> Self {
        Self {
            position,
            normal,
            comfortable: false,
        }
    }
}

// ---------------------------------------------------------------------------
// SurfaceHit
// ---------------------------------------------------------------------------

/// Nearest-surface result of a probe cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// World-space contact point.
    pub point: Vector3<f32>,
    /// Surface normal at the contact point.
    pub normal: Vector3<f32>,
}

// ---------------------------------------------------------------------------
// BodyFrame
// ---------------------------------------------------------------------------

/// Read-only view of the locomotion root published by the body controller.
///
/// Constraint offsets and stepping distances scale with `scale`, so the same
/// rig tuning works across differently sized bodies. The per-tick movement
/// delta is `velocity * dt`.
#[derive(Debug, Clone, PartialEq, Resource)]
pub struct BodyFrame {
    /// World-space position of the body root.
    pub position: Vector3<f32>,
    /// World-space orientation of the body root.
    pub rotation: UnitQuaternion<f32>,
    /// Linear velocity in world space, meters per second.
    pub velocity: Vector3<f32>,
    /// Uniform body scale factor.
    pub scale: f32,
}

impl BodyFrame {
    /// Body up vector (local +Y in world space).
    #[must_use]
    pub fn up(&self) -> Vector3<f32> {
        self.rotation * Vector3::y()
    }

    /// Body forward vector (local -Z in world space).
    #[must_use]
    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * -Vector3::z()
    }

    /// Body right vector (local +X in world space).
    #[must_use]
    pub fn right(&self) -> Vector3<f32> {
        self.rotation * Vector3::x()
    }

    /// Transform a body-local point into world space (scale applied).
    #[must_use]
    pub fn transform_point(&self, local: &Vector3<f32>) -> Vector3<f32> {
        self.position + self.rotation * (local * self.scale)
    }

    /// Express a world-space point in body-local coordinates (scale removed).
    #[must_use]
    pub fn inverse_transform_point(&self, world: &Vector3<f32>) -> Vector3<f32> {
        (self.rotation.inverse() * (world - self.position)) / self.scale
    }
}

impl Default for BodyFrame {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            velocity: Vector3::zeros(),
            scale: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn target_constructors_set_comfort() {
        let p = Vector3::new(1.0, 0.0, 2.0);
        let n = Vector3::y();
        assert!(Target::new(p, n).comfortable);
        assert!(!Target::fallback(p, n).comfortable);
    }

    #[test]
    fn body_frame_identity_basis() {
        let body = BodyFrame::default();
        assert_relative_eq!(body.up().y, 1.0);
        assert_relative_eq!(body.forward().z, -1.0);
        assert_relative_eq!(body.right().x, 1.0);
    }

    #[test]
    fn body_frame_point_round_trip() {
        let body = BodyFrame {
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.7),
            velocity: Vector3::zeros(),
            scale: 2.0,
        };
        let local = Vector3::new(0.5, -0.25, 1.0);
        let back = body.inverse_transform_point(&body.transform_point(&local));
        assert_relative_eq!(back.x, local.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, local.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, local.z, epsilon = 1e-5);
    }

    #[test]
    fn body_frame_scale_applies_to_offsets() {
        let body = BodyFrame {
            scale: 3.0,
            ..BodyFrame::default()
        };
        let p = body.transform_point(&Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 3.0);
    }
}
