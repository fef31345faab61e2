//! Surface probing seam.
//!
//! The stepper needs exactly one capability from the surrounding scene:
//! "cast a probe, get the nearest walkable surface hit". Physics engines,
//! heightfields, or test fixtures plug in behind [`SurfaceProbe`].

use nalgebra::Vector3;

use crate::types::SurfaceHit;

/// Shape swept along a probe segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeShape {
    /// Infinitely thin ray.
    Ray,
    /// Sphere of the given radius, for tolerant foothold detection on
    /// ledges and grates.
    Sphere { radius: f32 },
}

/// A single probe cast: a segment from `origin` along `dir` (unnormalized;
/// its length is the probe length) swept with `shape`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeQuery {
    pub origin: Vector3<f32>,
    pub dir: Vector3<f32>,
    pub shape: ProbeShape,
}

impl ProbeQuery {
    /// Ray probe over the segment `origin .. origin + dir`.
    #[must_use]
    pub const fn ray(origin: Vector3<f32>, dir: Vector3<f32>) -> Self {
        Self {
            origin,
            dir,
            shape: ProbeShape::Ray,
        }
    }

    /// Sphere probe over the segment `origin .. origin + dir`.
    #[must_use]
    pub const fn sphere(origin: Vector3<f32>, dir: Vector3<f32>, radius: f32) -> Self {
        Self {
            origin,
            dir,
            shape: ProbeShape::Sphere { radius },
        }
    }
}

/// Abstract "cast a probe, get nearest surface hit" capability.
pub trait SurfaceProbe {
    /// Nearest hit along the query segment, if any.
    fn cast(&self, query: &ProbeQuery) -> Option<SurfaceHit>;

    /// All hits along the query segment, nearest first.
    ///
    /// The default forwards to [`SurfaceProbe::cast`]; implementations
    /// backed by a real scene query can override this.
    fn cast_all(&self, query: &ProbeQuery) -> Vec<SurfaceHit> {
        self.cast(query).into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// PlaneProbe
// ---------------------------------------------------------------------------

/// Probe against an infinite horizontal plane at `height` (world Y).
///
/// The reference implementation: enough for flat-ground rigs, demos, and
/// every test in this workspace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneProbe {
    pub height: f32,
}

impl PlaneProbe {
    #[must_use]
    pub const fn new(height: f32) -> Self {
        Self { height }
    }
}

impl SurfaceProbe for PlaneProbe {
    fn cast(&self, query: &ProbeQuery) -> Option<SurfaceHit> {
        let radius = match query.shape {
            ProbeShape::Ray => 0.0,
            ProbeShape::Sphere { radius } => radius,
        };

        // Intersect the segment with the plane y = height (+ radius for a
        // swept sphere touching the plane from above).
        let surface = self.height + radius;
        let dy = query.dir.y;
        if dy.abs() < 1e-9 {
            return None;
        }
        let t = (surface - query.origin.y) / dy;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }
        let contact = query.origin + query.dir * t;
        Some(SurfaceHit {
            // Report the touch point on the plane itself, not the sphere center.
            point: Vector3::new(contact.x, self.height, contact.z),
            normal: Vector3::y(),
        })
    }
}
