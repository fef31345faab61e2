//! Ellipse containment and boundary projection.
//!
//! The swing part of a ball joint is bounded by an ellipse in the swing
//! plane. Points outside get pushed back to the boundary along the ray
//! from the center. There is no closed form for that ray intersection in
//! the normalized coordinates used here, so the projection bisects.

const MAX_STEPS: u32 = 50;
const TOLERANCE: f32 = 1e-4;

/// Axis-aligned ellipse centered at the origin with half-axes `a` (x) and
/// `b` (y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    a: f32,
    b: f32,
}

impl Ellipse {
    /// New ellipse. Half-axes are forced positive; degenerate values are
    /// bumped to a small epsilon so `eval` stays finite.
    #[must_use]
    pub fn new(a: f32, b: f32) -> Self {
        Self {
            a: a.abs().max(1e-6),
            b: b.abs().max(1e-6),
        }
    }

    #[must_use]
    pub const fn half_axes(&self) -> (f32, f32) {
        (self.a, self.b)
    }

    /// Implicit equation: negative inside, zero on the boundary, positive
    /// outside.
    #[must_use]
    pub fn eval(&self, x: f32, y: f32) -> f32 {
        let nx = x / self.a;
        let ny = y / self.b;
        nx * nx + ny * ny - 1.0
    }

    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.eval(x, y) <= 0.0
    }

    /// Clamp a point to the ellipse.
    ///
    /// Points inside or on the boundary are returned unchanged. Points
    /// outside are projected onto the boundary along the ray from the
    /// center through the point, by bisection on the ray parameter until
    /// `eval` lands in `(-TOLERANCE, 0]`. If the step budget runs out
    /// first, the returned point may carry a small residual outside-error.
    #[must_use]
    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        if self.contains(x, y) {
            return (x, y);
        }

        let norm = (x * x + y * y).sqrt();
        let dir = (x / norm, y / norm);

        // max(a, b) along any ray from the center is outside or on the
        // boundary, so it brackets the crossing together with t = 0.
        let mut lo = 0.0_f32;
        let mut hi = self.a.max(self.b);
        let mut t = hi;

        for _ in 0..MAX_STEPS {
            t = 0.5 * (lo + hi);
            let e = self.eval(t * dir.0, t * dir.1);
            if e > 0.0 {
                hi = t;
            } else if e <= -TOLERANCE {
                lo = t;
            } else {
                break;
            }
        }

        (t * dir.0, t * dir.1)
    }
}
