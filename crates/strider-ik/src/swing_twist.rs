//! Ball-joint limiting via swing/twist decomposition.
//!
//! A [`SwingTwistLimit`] clamps a rotation directly on the quaternion:
//! the rotation is factored into a twist about the joint's local X axis
//! and a swing reorienting that axis, the twist is clamped to a range,
//! and the swing is clamped to an elliptical cone.
//!
//! Convention (fixed deliberately, see the recomposition test): the
//! decomposition satisfies `q = q_twist * q_swing` exactly when no clamp
//! engages.

use bevy::log::warn;
use nalgebra::{Quaternion, UnitQuaternion};

use crate::ellipse::Ellipse;

/// Allowed orientation cone plus twist range for a ball joint.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingTwistLimit {
    /// Twist range in degrees, `min <= max`.
    twist_min: f32,
    twist_max: f32,
    /// Swing ellipse with half-axes `sin(max_swing/2)` per axis.
    ellipse: Ellipse,
}

impl SwingTwistLimit {
    /// Build a limit from twist bounds and maximum swing angles, all in
    /// degrees. Swing angles must be in `(0, 180]`; out-of-range values
    /// are clamped with a warning, and inverted twist bounds are swapped.
    #[must_use]
    pub fn new(
        twist_min: f32,
        twist_max: f32,
        max_swing_horizontal: f32,
        max_swing_vertical: f32,
    ) -> Self {
        let (twist_min, twist_max) = if twist_min > twist_max {
            warn!("SwingTwistLimit: twist bounds inverted ({twist_min} > {twist_max}); swapping");
            (twist_max, twist_min)
        } else {
            (twist_min, twist_max)
        };

        let clamp_swing = |angle: f32, which: &str| -> f32 {
            if (0.1..=180.0).contains(&angle) {
                angle
            } else {
                warn!("SwingTwistLimit: {which} swing {angle} outside (0, 180]; clamping");
                angle.clamp(0.1, 180.0)
            }
        };
        let h = clamp_swing(max_swing_horizontal, "horizontal");
        let v = clamp_swing(max_swing_vertical, "vertical");

        Self {
            twist_min,
            twist_max,
            ellipse: Ellipse::new(
                (h.to_radians() * 0.5).sin(),
                (v.to_radians() * 0.5).sin(),
            ),
        }
    }

    /// The swing ellipse (half-axes are `sin(max_swing/2)`).
    #[must_use]
    pub const fn ellipse(&self) -> &Ellipse {
        &self.ellipse
    }

    /// Clamp a rotation to the allowed cone and twist range.
    ///
    /// Pure and idempotent; the caller applies the result to its frame.
    #[must_use]
    pub fn limit(&self, q: &UnitQuaternion<f32>) -> UnitQuaternion<f32> {
        // Canonicalize the double cover so the decomposition is unique.
        let mut raw = *q.quaternion();
        if raw.w < 0.0 {
            raw = -raw;
        }
        let (x, y, z, w) = (raw.i, raw.j, raw.k, raw.w);

        // Closed-form swing/twist split about local X. s = 0 is the 180
        // degree swing singularity: no twist component survives there.
        let s = x * x + w * w;
        let (rx, ry, rz) = if s <= f32::EPSILON {
            (0.0, y, z)
        } else {
            let r = 1.0 / s.sqrt();
            (x * r, (w * y + x * z) * r, (w * z - x * y) * r)
        };

        let rx = rx.clamp(
            (self.twist_min.to_radians() * 0.5).sin(),
            (self.twist_max.to_radians() * 0.5).sin(),
        );
        let (ry, rz) = self.ellipse.clamp(ry, rz);

        let twist = Quaternion::new((1.0 - rx * rx).max(0.0).sqrt(), rx, 0.0, 0.0);
        let swing = Quaternion::new((1.0 - ry * ry - rz * rz).max(0.0).sqrt(), 0.0, ry, rz);
        UnitQuaternion::new_normalize(twist * swing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn wide_open() -> SwingTwistLimit {
        SwingTwistLimit::new(-180.0, 180.0, 179.0, 179.0)
    }

    fn assert_quat_eq(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, epsilon: f32) {
        // Compare up to double cover.
        let d = a.quaternion().dot(b.quaternion()).abs();
        assert_relative_eq!(d, 1.0, epsilon = epsilon);
    }

    #[test]
    fn identity_passes_through() {
        let limit = SwingTwistLimit::new(-30.0, 30.0, 60.0, 40.0);
        let q = UnitQuaternion::identity();
        assert_quat_eq(&limit.limit(&q), &q, 1e-6);
    }

    #[test]
    fn in_range_rotation_is_unchanged() {
        let limit = wide_open();
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.6)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3);
        assert_quat_eq(&limit.limit(&q), &q, 1e-4);
    }

    #[test]
    fn limit_is_idempotent() {
        let limit = SwingTwistLimit::new(-20.0, 45.0, 50.0, 25.0);
        for q in [
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 2.5),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 2.0),
            UnitQuaternion::from_axis_angle(
                &nalgebra::Unit::new_normalize(Vector3::new(1.0, 1.0, 1.0)),
                1.8,
            ),
            UnitQuaternion::from_euler_angles(1.0, -2.0, 0.5),
        ] {
            let once = limit.limit(&q);
            let twice = limit.limit(&once);
            assert_quat_eq(&once, &twice, 1e-3);
        }
    }

    #[test]
    fn pure_twist_is_clamped_to_twist_range() {
        let limit = SwingTwistLimit::new(-30.0, 30.0, 179.0, 179.0);
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 90f32.to_radians());
        let clamped = limit.limit(&q);
        let (axis, angle) = clamped.axis_angle().unwrap();
        assert_relative_eq!(axis.x.abs(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(angle.to_degrees(), 30.0, epsilon = 0.1);
    }

    #[test]
    fn pure_swing_is_clamped_to_cone() {
        let limit = SwingTwistLimit::new(-180.0, 180.0, 40.0, 40.0);
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 120f32.to_radians());
        let clamped = limit.limit(&q);
        let (_, angle) = clamped.axis_angle().unwrap();
        assert_relative_eq!(angle.to_degrees(), 40.0, epsilon = 0.2);
    }

    #[test]
    fn half_turn_swing_singularity_does_not_panic() {
        let limit = wide_open();
        // 180 degrees about Y: x = w = 0, the s == 0 branch.
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::PI);
        let out = limit.limit(&q);
        let (_, angle) = out.axis_angle().unwrap();
        assert_relative_eq!(angle.to_degrees(), 179.0, epsilon = 1.5);
    }

    #[test]
    fn negative_scalar_cover_is_canonicalized() {
        let limit = wide_open();
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.0);
        let negated = UnitQuaternion::new_unchecked(-q.quaternion());
        assert_quat_eq(&limit.limit(&q), &limit.limit(&negated), 1e-5);
    }

    #[test]
    fn inverted_twist_bounds_are_swapped() {
        let limit = SwingTwistLimit::new(45.0, -45.0, 60.0, 60.0);
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.2);
        // Would be clamped to nothing if the bounds stayed inverted.
        assert_quat_eq(&limit.limit(&q), &q, 1e-4);
    }
}
