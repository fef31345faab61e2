//! Single-axis hinge constraint.
//!
//! A [`HingeJoint`] rotates one bone (and its subtree) about a configured
//! axis through a configured pivot, accumulating a signed `current_angle`
//! that is kept inside `[min_angle, max_angle]` when limits are enforced.
//!
//! The rotation axis, its perpendicular, the pivot, and the min/max/mid
//! orientation vectors are *derived* from the live frames on every call:
//! a parent rotation moves the bone, so cached copies would go stale
//! within a tick.

use nalgebra::{UnitQuaternion, UnitVector3, Vector3};

use strider_core::config::{AxisMode, JointConfig};
use strider_core::types::BodyFrame;

use crate::math::{project_onto_plane, signed_angle, wrap_degrees};
use crate::skeleton::{BoneId, Skeleton};

// ---------------------------------------------------------------------------
// AxisSpec
// ---------------------------------------------------------------------------

/// Fully resolved axis selection: mode + flip + fixed local offset.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSpec {
    pub mode: AxisMode,
    pub flip: bool,
    /// Extra fixed rotation applied to the selected frame before taking
    /// the basis vector.
    pub offset: UnitQuaternion<f32>,
}

impl AxisSpec {
    #[must_use]
    pub fn new(mode: AxisMode) -> Self {
        Self {
            mode,
            flip: false,
            offset: UnitQuaternion::identity(),
        }
    }

    #[must_use]
    pub const fn flipped(mut self) -> Self {
        self.flip = true;
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: UnitQuaternion<f32>) -> Self {
        self.offset = offset;
        self
    }

    /// The frame orientation the axis is taken from.
    fn frame(&self, body: &BodyFrame, local: &UnitQuaternion<f32>) -> UnitQuaternion<f32> {
        let base = match self.mode {
            AxisMode::BodyX | AxisMode::BodyY | AxisMode::BodyZ => body.rotation,
            AxisMode::LocalX | AxisMode::LocalY | AxisMode::LocalZ => *local,
        };
        base * self.offset
    }

    /// Resolve the world-space rotation axis from the live frames.
    #[must_use]
    pub fn resolve(&self, body: &BodyFrame, local: &UnitQuaternion<f32>) -> UnitVector3<f32> {
        let basis = match self.mode {
            AxisMode::BodyX | AxisMode::LocalX => Vector3::x(),
            AxisMode::BodyY | AxisMode::LocalY => Vector3::y(),
            AxisMode::BodyZ | AxisMode::LocalZ => Vector3::z(),
        };
        let axis = self.frame(body, local) * basis;
        UnitVector3::new_normalize(if self.flip { -axis } else { axis })
    }

    /// The default "zero angle" direction: the basis vector following the
    /// axis (X -> Y, Y -> Z, Z -> X) in the same resolved frame. Always
    /// perpendicular to [`AxisSpec::resolve`].
    #[must_use]
    pub fn resolve_perpendicular(
        &self,
        body: &BodyFrame,
        local: &UnitQuaternion<f32>,
    ) -> UnitVector3<f32> {
        let basis = match self.mode {
            AxisMode::BodyX | AxisMode::LocalX => Vector3::y(),
            AxisMode::BodyY | AxisMode::LocalY => Vector3::z(),
            AxisMode::BodyZ | AxisMode::LocalZ => Vector3::x(),
        };
        UnitVector3::new_normalize(self.frame(body, local) * basis)
    }
}

// ---------------------------------------------------------------------------
// HingeJoint
// ---------------------------------------------------------------------------

/// Which side of the allowed angular window a vector falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngularScope {
    /// Inside `[min, max]`.
    Within,
    /// Outside, on the min side.
    BeforeMin,
    /// Outside, on the max side.
    PastMax,
}

/// A constrained hinge joint driving one bone.
#[derive(Debug, Clone)]
pub struct HingeJoint {
    bone: BoneId,
    axis: AxisSpec,
    /// Pivot offset from the bone origin, in the bone's local frame.
    pivot_offset: Vector3<f32>,
    /// Limits in degrees, `min <= max` (enforced at construction).
    min_angle: f32,
    max_angle: f32,
    limited: bool,
    /// Solver weight in `[0, 1]`.
    pub weight: f32,
    /// Deactivated joints ignore `apply_rotation` entirely.
    pub active: bool,
    current_angle: f32,
}

impl HingeJoint {
    /// New joint with the given limits (degrees). Inverted limits are
    /// swapped and out-of-range weights clamped by the config sanitizer
    /// upstream; this constructor trusts its inputs but still keeps the
    /// invariant by swapping locally.
    #[must_use]
    pub fn new(bone: BoneId, axis: AxisSpec, min_angle: f32, max_angle: f32) -> Self {
        let (min_angle, max_angle) = if min_angle > max_angle {
            (max_angle, min_angle)
        } else {
            (min_angle, max_angle)
        };
        Self {
            bone,
            axis,
            pivot_offset: Vector3::zeros(),
            min_angle,
            max_angle,
            limited: true,
            weight: 1.0,
            active: true,
            current_angle: 0.0,
        }
    }

    /// Build from a config entry against a resolved bone.
    #[must_use]
    pub fn from_config(config: &JointConfig, bone: BoneId) -> Self {
        let [rx, ry, rz] = config.axis_offset_deg;
        let offset = UnitQuaternion::from_euler_angles(
            rx.to_radians(),
            ry.to_radians(),
            rz.to_radians(),
        );
        let mut axis = AxisSpec::new(config.axis).with_offset(offset);
        if config.flip {
            axis = axis.flipped();
        }
        let mut joint = Self::new(bone, axis, config.min_angle, config.max_angle);
        joint.pivot_offset = Vector3::new(config.pivot[0], config.pivot[1], config.pivot[2]);
        joint.limited = config.limited;
        joint.weight = config.weight.clamp(0.0, 1.0);
        joint
    }

    #[must_use]
    pub const fn with_pivot_offset(mut self, offset: Vector3<f32>) -> Self {
        self.pivot_offset = offset;
        self
    }

    #[must_use]
    pub const fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub const fn unlimited(mut self) -> Self {
        self.limited = false;
        self
    }

    #[must_use]
    pub const fn bone(&self) -> BoneId {
        self.bone
    }

    /// Accumulated signed angle in degrees. Within `[min, max]` whenever
    /// limits are enforced.
    #[must_use]
    pub const fn current_angle(&self) -> f32 {
        self.current_angle
    }

    #[must_use]
    pub const fn limits(&self) -> (f32, f32) {
        (self.min_angle, self.max_angle)
    }

    /// World-space rotation axis, recomputed from the live frames.
    #[must_use]
    pub fn rotation_axis(&self, skeleton: &Skeleton, body: &BodyFrame) -> UnitVector3<f32> {
        self.axis.resolve(body, &skeleton.rotation(self.bone))
    }

    /// World-space zero-angle direction, recomputed from the live frames.
    #[must_use]
    pub fn perpendicular(&self, skeleton: &Skeleton, body: &BodyFrame) -> UnitVector3<f32> {
        self.axis
            .resolve_perpendicular(body, &skeleton.rotation(self.bone))
    }

    /// World-space rotation point, recomputed from the live frame. The
    /// configured offset scales with the body.
    #[must_use]
    pub fn pivot(&self, skeleton: &Skeleton, body: &BodyFrame) -> Vector3<f32> {
        let pose = skeleton.pose(self.bone);
        pose.translation.vector + pose.rotation * (self.pivot_offset * body.scale)
    }

    /// Rotate the bone (and subtree) about the joint axis by `angle_deg`.
    ///
    /// The request is folded into `(-180, 180]`, then clamped so the
    /// running total stays inside the limits; the *actually applied* delta
    /// is what accumulates into `current_angle`. No-op when deactivated.
    pub fn apply_rotation(&mut self, skeleton: &mut Skeleton, body: &BodyFrame, angle_deg: f32) {
        if !self.active {
            return;
        }

        let mut delta = wrap_degrees(angle_deg);
        if self.limited {
            let clamped_total = (self.current_angle + delta).clamp(self.min_angle, self.max_angle);
            delta = clamped_total - self.current_angle;
        }
        if delta == 0.0 {
            return;
        }
        self.current_angle += delta;

        let axis = self.rotation_axis(skeleton, body);
        let pivot = self.pivot(skeleton, body);
        let rotation = UnitQuaternion::from_axis_angle(&axis, delta.to_radians());
        skeleton.rotate_about(self.bone, &rotation, &pivot);
    }

    fn orientation_at(&self, skeleton: &Skeleton, body: &BodyFrame, angle_deg: f32) -> Vector3<f32> {
        let axis = self.rotation_axis(skeleton, body);
        let perp = self.perpendicular(skeleton, body);
        UnitQuaternion::from_axis_angle(&axis, angle_deg.to_radians()) * perp.into_inner()
    }

    /// Direction of the window's lower edge.
    #[must_use]
    pub fn min_orientation(&self, skeleton: &Skeleton, body: &BodyFrame) -> Vector3<f32> {
        self.orientation_at(skeleton, body, self.min_angle)
    }

    /// Direction of the window's upper edge.
    #[must_use]
    pub fn max_orientation(&self, skeleton: &Skeleton, body: &BodyFrame) -> Vector3<f32> {
        self.orientation_at(skeleton, body, self.max_angle)
    }

    /// Bisector of the allowed arc.
    #[must_use]
    pub fn mid_orientation(&self, skeleton: &Skeleton, body: &BodyFrame) -> Vector3<f32> {
        self.orientation_at(skeleton, body, 0.5 * (self.min_angle + self.max_angle))
    }

    /// Classify which side of the `[min, max]` angular window the
    /// projection of `v` falls on.
    ///
    /// Only correct for allowed arcs spanning at most 180 degrees; wider
    /// windows make the wraparound disambiguation ambiguous.
    #[must_use]
    pub fn scope_of(&self, skeleton: &Skeleton, body: &BodyFrame, v: &Vector3<f32>) -> AngularScope {
        let axis = self.rotation_axis(skeleton, body).into_inner();
        let p = project_onto_plane(v, &axis);
        if p.norm_squared() <= f32::EPSILON {
            // Degenerate: v is parallel to the axis, no angular position.
            return AngularScope::Within;
        }

        let to_min = signed_angle(&p, &self.min_orientation(skeleton, body), &axis);
        let to_max = signed_angle(&p, &self.max_orientation(skeleton, body), &axis);

        if to_min <= 0.0 && to_max >= 0.0 {
            AngularScope::Within
        } else if to_min > 0.0 && to_max > 0.0 {
            AngularScope::BeforeMin
        } else {
            // The window wrapped behind the vector; min/max alone cannot
            // tell the sides apart. Use the arc bisector instead.
            let to_mid = signed_angle(&p, &self.mid_orientation(skeleton, body), &axis);
            if to_mid >= 0.0 {
                AngularScope::BeforeMin
            } else {
                AngularScope::PastMax
            }
        }
    }
}
