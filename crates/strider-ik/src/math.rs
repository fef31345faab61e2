//! Small angle and projection helpers shared across the constraint code.

use nalgebra::Vector3;

/// Fold an angle in degrees into `(-180, 180]`.
#[must_use]
pub fn wrap_degrees(angle: f32) -> f32 {
    let mut a = angle % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}

/// Project `v` onto the plane orthogonal to `axis` (`axis` must be unit).
#[must_use]
pub fn project_onto_plane(v: &Vector3<f32>, axis: &Vector3<f32>) -> Vector3<f32> {
    v - axis * v.dot(axis)
}

/// Signed angle in radians from `a` to `b` about `axis`, positive for
/// counterclockwise rotation when viewed from the axis tip.
#[must_use]
pub fn signed_angle(a: &Vector3<f32>, b: &Vector3<f32>, axis: &Vector3<f32>) -> f32 {
    a.cross(b).dot(axis).atan2(a.dot(b))
}
