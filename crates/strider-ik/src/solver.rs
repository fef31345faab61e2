//! Cyclic Coordinate Descent chain solver.
//!
//! Sweeps the chain's joints, rotating each about its own axis to close
//! the gap between the end effector and the target, honoring every
//! joint's hinge limits through [`HingeJoint::apply_rotation`].
//!
//! The sweep order is `[N-1, 0, 1, .., N-2]`: the last constrained joint
//! moves first, then root to tip. Foot-local corrections first measurably
//! improves gait quality for leg chains; keep this order.

use bevy::log::trace;

use strider_core::config::SolverConfig;
use strider_core::types::{BodyFrame, Target};

use crate::chain::Chain;
use crate::math::{project_onto_plane, signed_angle};
use crate::skeleton::Skeleton;

/// Vectors with less projected length than this are treated as degenerate.
const PROJECTION_EPSILON: f32 = 1e-6;

/// CCD tuning parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CcdConfig {
    /// Maximum sweeps per solve call.
    pub max_iterations: u32,
    /// End-effector distance counting as converged.
    pub tolerance: f32,
    /// Per-sweep improvement below which the solve reports a stall and
    /// exits early. Zero disables stall detection.
    pub min_progress: f32,
    /// Projected target distances below this skip the joint for the sweep.
    pub singularity_radius: f32,
    /// Global damping factor multiplied into every joint's weight.
    pub global_weight: f32,
}

impl Default for CcdConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 0.01,
            min_progress: 0.0,
            singularity_radius: 0.0,
            global_weight: 0.8,
        }
    }
}

impl From<&SolverConfig> for CcdConfig {
    fn from(config: &SolverConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            min_progress: config.min_progress,
            singularity_radius: config.singularity_radius,
            global_weight: config.global_weight,
        }
    }
}

/// Outcome of a solve. Non-convergence is a quality signal, never an
/// error: callers inspect `error` (and typically react by stepping).
#[derive(Debug, Clone, PartialEq)]
pub struct CcdResult {
    /// Sweeps executed.
    pub iterations: u32,
    /// Final end-effector distance to the target.
    pub error: f32,
    /// Whether `error` ended below tolerance.
    pub converged: bool,
    /// Whether the solve exited early for lack of progress.
    pub stalled: bool,
}

/// Cyclic Coordinate Descent solver over constrained hinge chains.
#[derive(Debug, Clone)]
pub struct CcdSolver {
    config: CcdConfig,
}

impl CcdSolver {
    #[must_use]
    pub const fn new(config: CcdConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(CcdConfig::default())
    }

    #[must_use]
    pub const fn config(&self) -> &CcdConfig {
        &self.config
    }

    /// Drive `chain` toward its current target, mutating bone poses in
    /// place. Updates `chain.error` and returns the solve outcome.
    pub fn solve(&self, skeleton: &mut Skeleton, body: &BodyFrame, chain: &mut Chain) -> CcdResult {
        let n = chain.dof();
        let target = chain.target.clone();
        let mut error = chain.measure_error(skeleton);
        let mut iterations = 0;
        let mut stalled = false;

        while iterations < self.config.max_iterations && error > self.config.tolerance {
            for idx in visit_order(n) {
                self.sweep_joint(skeleton, body, chain, idx, &target);
            }

            let new_error = chain.measure_error(skeleton);
            let progress = (error - new_error).abs();
            error = new_error;
            iterations += 1;
            trace!("ccd sweep {iterations}: error {error:.5}");

            if error <= self.config.tolerance {
                break;
            }
            if progress < self.config.min_progress {
                trace!("ccd stalled after {iterations} sweeps (progress {progress:.6})");
                stalled = true;
                break;
            }
        }

        chain.error = error;
        CcdResult {
            iterations,
            error,
            converged: error <= self.config.tolerance,
            stalled,
        }
    }

    fn sweep_joint(
        &self,
        skeleton: &mut Skeleton,
        body: &BodyFrame,
        chain: &mut Chain,
        idx: usize,
        target: &Target,
    ) {
        let n = chain.dof();
        let foot = chain.foot();
        let joint = &chain.joints()[idx];

        let axis = joint.rotation_axis(skeleton, body).into_inner();
        let pivot = joint.pivot(skeleton, body);
        let end = chain.end_position(skeleton);

        let to_end = project_onto_plane(&(end - pivot), &axis);
        let to_target = project_onto_plane(&(target.position - pivot), &axis);

        // Singularity skip: degenerate projections or a target sitting on
        // the rotation axis make the angle meaningless this sweep.
        if to_end.norm() < PROJECTION_EPSILON
            || to_target.norm() < PROJECTION_EPSILON
            || to_target.norm() < self.config.singularity_radius
        {
            trace!("ccd joint {idx}: singular, skipped");
            return;
        }

        let angle_deg = if idx == n - 1 && foot.is_some() {
            // Foot alignment: orient the last segment at a configured
            // offset from the target surface normal instead of chasing
            // position with it.
            let normal = project_onto_plane(&target.normal, &axis);
            if normal.norm() < PROJECTION_EPSILON {
                return;
            }
            let offset = foot.map_or(0.0, |f| f.angle_offset);
            offset + 90.0 - signed_angle(&normal, &to_end, &axis).to_degrees()
        } else {
            let weight = self.config.global_weight * joint.weight;
            weight * signed_angle(&to_end, &to_target, &axis).to_degrees()
        };

        trace!("ccd joint {idx}: rotate {angle_deg:.3} deg");
        chain.joints_mut()[idx].apply_rotation(skeleton, body, angle_deg);
    }
}

/// CCD joint visitation order for an `n`-joint chain:
/// the last constrained joint first, then root to tip.
fn visit_order(n: usize) -> impl Iterator<Item = usize> {
    std::iter::once(n - 1).chain(0..n - 1)
}
