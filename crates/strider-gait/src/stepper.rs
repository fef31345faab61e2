//! Per-leg stepping state machine.
//!
//! A [`Stepper`] watches its chain and decides when the leg must lift and
//! re-plant: the target went uncomfortable, the solve error grew past
//! tolerance, or the foothold drifted in under the leg. A step picks a
//! new foothold by probing the surface around a predicted landing point,
//! then runs a time-boxed transition that publishes interpolated targets
//! into the chain once per tick.
//!
//! Transitions are not cancellable: a step request while one is in
//! flight is ignored, and the transition always completes naturally.

use bevy::log::debug;
use nalgebra::Vector3;

use strider_core::config::StepConfig;
use strider_core::curve::StepCurve;
use strider_core::probe::{ProbeQuery, SurfaceProbe};
use strider_core::types::{BodyFrame, Target};
use strider_ik::{Chain, Skeleton};

use crate::rig::LegId;

// ---------------------------------------------------------------------------
// StepperConfig
// ---------------------------------------------------------------------------

/// Resolved per-leg stepping parameters. Distances are body-local and
/// scale with the body's uniform scale factor.
#[derive(Debug, Clone)]
pub struct StepperConfig {
    /// Step transition duration, seconds.
    pub step_time: f32,
    /// Minimum grounded time between steps, seconds.
    pub cooldown: f32,
    /// Chain error above which the leg wants to re-plant.
    pub error_tolerance: f32,
    /// Foothold distance below this fraction of chain length triggers a step.
    pub min_reach_fraction: f32,
    /// Overshoot past the default stance in the direction of travel.
    pub velocity_prediction: f32,
    /// Probe segment half-length around candidate footholds.
    pub probe_reach: f32,
    /// Sphere radius for probes; zero casts rays.
    pub probe_radius: f32,
    /// Fallback target height above the default stance when all probes miss.
    pub raise_height: f32,
    /// Default stance offset from the rest end-effector position, body-local.
    pub stance_offset: Vector3<f32>,
    /// Foot lift profile over normalized transition time.
    pub curve: StepCurve,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self::from(&StepConfig::default())
    }
}

impl From<&StepConfig> for StepperConfig {
    fn from(config: &StepConfig) -> Self {
        Self {
            step_time: config.step_time,
            cooldown: config.cooldown,
            error_tolerance: config.error_tolerance,
            min_reach_fraction: config.min_reach_fraction,
            velocity_prediction: config.velocity_prediction,
            probe_reach: config.probe_reach,
            probe_radius: config.probe_radius,
            raise_height: config.raise_height,
            stance_offset: Vector3::new(
                config.stance_offset[0],
                config.stance_offset[1],
                config.stance_offset[2],
            ),
            curve: StepCurve::arc(config.step_height, 16),
        }
    }
}

// ---------------------------------------------------------------------------
// Stepper
// ---------------------------------------------------------------------------

/// In-flight step transition.
#[derive(Debug, Clone)]
struct StepTransition {
    from: Target,
    to: Target,
    elapsed: f32,
    duration: f32,
}

/// Per-leg stepping state machine: `Grounded` when `transition` is empty,
/// `Stepping` while one is in flight.
#[derive(Debug, Clone)]
pub struct Stepper {
    config: StepperConfig,
    /// Leg that must not be mid-step for this leg to lift.
    pub partner: Option<LegId>,
    /// Default stance position, body-local; computed once from the rig's
    /// rest geometry and the configured offset.
    default_stance: Vector3<f32>,
    time_since_last_step: f32,
    transition: Option<StepTransition>,
    steps_taken: u32,
}

impl Stepper {
    /// Build a stepper for `chain`, capturing the default stance from the
    /// rest pose of the chain's end effector.
    #[must_use]
    pub fn new(
        config: StepperConfig,
        chain: &Chain,
        skeleton: &Skeleton,
        body: &BodyFrame,
        partner: Option<LegId>,
    ) -> Self {
        let rest_local = body.inverse_transform_point(&chain.end_position(skeleton));
        let default_stance = rest_local + config.stance_offset;
        let cooldown = config.cooldown;
        Self {
            config,
            partner,
            default_stance,
            // Start ready: the first step is not held back by cooldown.
            time_since_last_step: cooldown,
            transition: None,
            steps_taken: 0,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &StepperConfig {
        &self.config
    }

    /// Whether a step transition is currently in flight.
    #[must_use]
    pub const fn is_stepping(&self) -> bool {
        self.transition.is_some()
    }

    /// Grounded seconds since the last completed step.
    #[must_use]
    pub const fn time_since_last_step(&self) -> f32 {
        self.time_since_last_step
    }

    /// Completed steps over the stepper's lifetime.
    #[must_use]
    pub const fn steps_taken(&self) -> u32 {
        self.steps_taken
    }

    /// Default stance position in world space.
    #[must_use]
    pub fn stance_position(&self, body: &BodyFrame) -> Vector3<f32> {
        body.transform_point(&self.default_stance)
    }

    /// Step-check: does this leg want to re-plant?
    ///
    /// True when the target is not comfortable, the chain error exceeds
    /// tolerance, or the foothold drifted closer to the chain root than
    /// the minimum fraction of (scaled) chain length.
    #[must_use]
    pub fn needs_step(&self, chain: &Chain, skeleton: &Skeleton, body: &BodyFrame) -> bool {
        let root = chain.root_position(skeleton, body);
        let foothold_distance = (chain.target.position - root).norm();
        let too_close =
            foothold_distance < self.config.min_reach_fraction * chain.length() * body.scale;
        !chain.target.comfortable || chain.error > self.config.error_tolerance || too_close
    }

    /// Whether this leg is allowed to lift right now.
    ///
    /// The partner gate enforces mutual exclusion between designated leg
    /// pairs so both never lift at once; the caller supplies the
    /// partner's state since steppers only hold handles.
    #[must_use]
    pub fn can_step(&self, partner_stepping: bool) -> bool {
        !self.is_stepping()
            && self.time_since_last_step >= self.config.cooldown
            && !partner_stepping
    }

    /// Start a step toward a freshly predicted foothold. Ignored while a
    /// transition is already in flight.
    pub fn begin_step(
        &mut self,
        chain: &Chain,
        skeleton: &Skeleton,
        body: &BodyFrame,
        probe: &dyn SurfaceProbe,
    ) {
        if self.is_stepping() {
            return;
        }
        let to = self.predict_target(chain, skeleton, body, probe);
        debug!(
            "step begin: to ({:.2}, {:.2}, {:.2}) comfortable={}",
            to.position.x, to.position.y, to.position.z, to.comfortable
        );
        self.transition = Some(StepTransition {
            from: chain.target.clone(),
            to,
            elapsed: 0.0,
            duration: self.config.step_time,
        });
    }

    /// Advance timers and any in-flight transition by `dt`, publishing
    /// the interpolated target into the chain.
    ///
    /// On completion the exact destination target is committed, the
    /// stepper returns to `Grounded`, and the cooldown timer resets.
    pub fn advance(&mut self, dt: f32, chain: &mut Chain, body: &BodyFrame) {
        let Some(tr) = self.transition.as_mut() else {
            self.time_since_last_step += dt;
            return;
        };

        tr.elapsed += dt;
        let t = tr.elapsed / tr.duration;
        if t >= 1.0 {
            chain.target = tr.to.clone();
            self.transition = None;
            self.time_since_last_step = 0.0;
            self.steps_taken += 1;
            debug!("step complete ({} total)", self.steps_taken);
            return;
        }

        let lift = body.up() * (self.config.curve.sample(t) * body.scale);
        let position = tr.from.position.lerp(&tr.to.position, t) + lift;
        let normal = {
            let blended = tr.from.normal.lerp(&tr.to.normal, t);
            if blended.norm_squared() > 1e-9 {
                blended.normalize()
            } else {
                tr.to.normal
            }
        };
        chain.target = Target {
            position,
            normal,
            comfortable: tr.to.comfortable,
        };
    }

    /// Keep a stale foothold visually consistent with body translation:
    /// applied each tick to legs that warrant a step but may not take one.
    pub fn drag_target(&self, dt: f32, chain: &mut Chain, body: &BodyFrame) {
        chain.target.position += body.velocity * dt;
    }

    /// Predict where this leg should plant next and find a real surface
    /// foothold for it.
    ///
    /// The current end effector is projected onto the ground plane through
    /// the default stance, pulled toward the stance with an overshoot of
    /// `velocity_prediction`, then led by the body's movement over one
    /// step duration. Probes run in a fixed priority order against the
    /// prediction, then against the default stance; if everything misses,
    /// a raised fallback target (`comfortable = false`) keeps the leg
    /// hunting for a real foothold.
    #[must_use]
    pub fn predict_target(
        &self,
        chain: &Chain,
        skeleton: &Skeleton,
        body: &BodyFrame,
        probe: &dyn SurfaceProbe,
    ) -> Target {
        let up = body.up();
        let stance = self.stance_position(body);
        let end = chain.end_position(skeleton);

        // Flatten the current foot position onto the stance ground plane.
        let grounded = end - up * (end - stance).dot(&up);
        let predicted = stance + (stance - grounded) * self.config.velocity_prediction
            + body.velocity * self.config.step_time;

        for query in self
            .probes_at(&predicted, body, true)
            .into_iter()
            .chain(self.probes_at(&stance, body, false))
        {
            if let Some(hit) = probe.cast(&query) {
                return Target::new(hit.point, hit.normal);
            }
        }

        debug!("all foothold probes missed; synthesizing raised fallback");
        Target::fallback(
            stance + up * (self.config.raise_height * body.scale),
            up,
        )
    }

    /// Probe cascade around one candidate point: frontal (only for the
    /// predicted point), outward from the top, straight down, inward from
    /// the top.
    fn probes_at(
        &self,
        point: &Vector3<f32>,
        body: &BodyFrame,
        include_frontal: bool,
    ) -> Vec<ProbeQuery> {
        let up = body.up();
        let reach = self.config.probe_reach * body.scale;
        let radius = self.config.probe_radius * body.scale;

        // Horizontal outward direction from the body toward the point.
        let lateral = {
            let flat = point - body.position - up * (point - body.position).dot(&up);
            if flat.norm_squared() > 1e-9 {
                flat.normalize()
            } else {
                body.forward()
            }
        };

        let top = point + up * reach;
        let shape = |origin: Vector3<f32>, dir: Vector3<f32>| {
            if radius > 0.0 {
                ProbeQuery::sphere(origin, dir, radius)
            } else {
                ProbeQuery::ray(origin, dir)
            }
        };

        let mut probes = Vec::with_capacity(4);
        if include_frontal {
            let origin = point + up * reach - lateral * reach;
            probes.push(shape(origin, (point - origin) * 2.0));
        }
        probes.push(shape(top, (point + lateral * (reach * 0.5) - top) * 2.0));
        probes.push(shape(top, up * (-2.0 * reach)));
        probes.push(shape(top, (point - lateral * (reach * 0.5) - top) * 2.0));
        probes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};
    use strider_core::config::AxisMode;
    use strider_core::probe::PlaneProbe;
    use strider_core::types::SurfaceHit;
    use strider_ik::{AxisSpec, HingeJoint};

    /// Probe that never hits anything.
    struct VoidProbe;

    impl SurfaceProbe for VoidProbe {
        fn cast(&self, _query: &ProbeQuery) -> Option<SurfaceHit> {
            None
        }
    }

    fn pose_at(x: f32, y: f32, z: f32) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::new(x, y, z), UnitQuaternion::identity())
    }

    /// Two-joint leg hanging from y=1 with its foot on the ground plane.
    fn leg() -> (Skeleton, Chain) {
        let mut skeleton = Skeleton::new();
        let hip = skeleton.add_root("hip", pose_at(0.0, 1.0, 0.0));
        let knee = skeleton.add_bone("knee", hip, pose_at(0.5, 0.5, 0.0));
        let foot = skeleton.add_bone("foot", knee, pose_at(1.0, 0.0, 0.0));
        let joints = vec![
            HingeJoint::new(hip, AxisSpec::new(AxisMode::BodyZ), -120.0, 120.0),
            HingeJoint::new(knee, AxisSpec::new(AxisMode::BodyZ), -120.0, 120.0),
        ];
        let chain = Chain::new(&skeleton, joints, foot).unwrap();
        (skeleton, chain)
    }

    fn stepper_with(config: StepperConfig, chain: &Chain, skeleton: &Skeleton) -> Stepper {
        Stepper::new(config, chain, skeleton, &BodyFrame::default(), None)
    }

    #[test]
    fn midpoint_of_a_step_blends_positions_and_lifts_by_the_curve() {
        let (skeleton, mut chain) = leg();
        let body = BodyFrame::default();
        let config = StepperConfig {
            step_time: 1.0,
            curve: StepCurve::arc(0.4, 16),
            ..StepperConfig::default()
        };
        let mut stepper = stepper_with(config, &chain, &skeleton);

        let from = Target::new(Vector3::new(1.0, 0.0, 0.0), Vector3::y());
        let to = Target::new(Vector3::new(2.0, 0.0, 0.0), Vector3::y());
        chain.target = from.clone();
        stepper.transition = Some(StepTransition {
            from,
            to,
            elapsed: 0.0,
            duration: 1.0,
        });

        stepper.advance(0.5, &mut chain, &body);
        assert!(stepper.is_stepping());
        assert_relative_eq!(chain.target.position.x, 1.5, epsilon = 1e-5);
        // Curve peak at t = 0.5.
        assert_relative_eq!(chain.target.position.y, 0.4, epsilon = 1e-5);
    }

    #[test]
    fn completed_step_commits_the_exact_target_and_resets_cooldown() {
        let (skeleton, mut chain) = leg();
        let body = BodyFrame::default();
        let mut stepper = stepper_with(
            StepperConfig {
                step_time: 1.0,
                ..StepperConfig::default()
            },
            &chain,
            &skeleton,
        );

        let to = Target::new(Vector3::new(2.0, 0.0, 1.0), Vector3::y());
        stepper.transition = Some(StepTransition {
            from: chain.target.clone(),
            to: to.clone(),
            elapsed: 0.0,
            duration: 1.0,
        });

        stepper.advance(0.6, &mut chain, &body);
        stepper.advance(0.6, &mut chain, &body);

        assert!(!stepper.is_stepping());
        assert_eq!(chain.target, to);
        assert_relative_eq!(stepper.time_since_last_step(), 0.0);
        assert_eq!(stepper.steps_taken(), 1);
    }

    #[test]
    fn step_requests_while_stepping_are_ignored() {
        let (skeleton, mut chain) = leg();
        let body = BodyFrame::default();
        let mut stepper = stepper_with(StepperConfig::default(), &chain, &skeleton);
        let probe = PlaneProbe::new(0.0);

        stepper.begin_step(&chain, &skeleton, &body, &probe);
        assert!(stepper.is_stepping());
        let first = stepper.transition.clone().unwrap().to;

        // Move the foothold wildly; a second request must not retarget.
        chain.target.position = Vector3::new(9.0, 9.0, 9.0);
        stepper.begin_step(&chain, &skeleton, &body, &probe);
        assert_eq!(stepper.transition.unwrap().to, first);
    }

    #[test]
    fn prediction_over_a_plane_lands_comfortably_on_it() {
        let (skeleton, chain) = leg();
        let body = BodyFrame {
            position: Vector3::new(0.0, 1.0, 0.0),
            velocity: Vector3::new(1.0, 0.0, 0.0),
            ..BodyFrame::default()
        };
        // Stance captured against the same body pose used for prediction.
        let stepper = Stepper::new(StepperConfig::default(), &chain, &skeleton, &body, None);
        let probe = PlaneProbe::new(0.0);

        let target = stepper.predict_target(&chain, &skeleton, &body, &probe);
        assert!(target.comfortable);
        assert_relative_eq!(target.position.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(target.normal.y, 1.0, epsilon = 1e-6);
        // Led in the direction of travel.
        assert!(target.position.x > 0.5);
    }

    #[test]
    fn all_probes_missing_synthesizes_a_raised_fallback() {
        let (skeleton, chain) = leg();
        let body = BodyFrame::default();
        let stepper = stepper_with(
            StepperConfig {
                raise_height: 0.5,
                ..StepperConfig::default()
            },
            &chain,
            &skeleton,
        );

        let target = stepper.predict_target(&chain, &skeleton, &body, &VoidProbe);
        assert!(!target.comfortable);
        let stance = stepper.stance_position(&body);
        assert_relative_eq!(target.position.y, stance.y + 0.5, epsilon = 1e-5);
    }

    #[test]
    fn needs_step_on_uncomfortable_error_or_crowded_foothold() {
        let (skeleton, mut chain) = leg();
        let body = BodyFrame::default();
        let stepper = stepper_with(
            StepperConfig {
                error_tolerance: 0.2,
                min_reach_fraction: 0.3,
                ..StepperConfig::default()
            },
            &chain,
            &skeleton,
        );

        // Comfortable, solved, well-placed: no step.
        chain.target = Target::new(Vector3::new(1.0, 0.0, 0.0), Vector3::y());
        chain.error = 0.0;
        assert!(!stepper.needs_step(&chain, &skeleton, &body));

        // Uncomfortable target.
        chain.target.comfortable = false;
        assert!(stepper.needs_step(&chain, &skeleton, &body));
        chain.target.comfortable = true;

        // Error past tolerance.
        chain.error = 0.5;
        assert!(stepper.needs_step(&chain, &skeleton, &body));
        chain.error = 0.0;

        // Foothold crowded in under the root at (0, 1, 0).
        chain.target.position = Vector3::new(0.05, 0.95, 0.0);
        assert!(stepper.needs_step(&chain, &skeleton, &body));
    }

    #[test]
    fn cooldown_and_partner_gate_stepping() {
        let (skeleton, chain) = leg();
        let mut stepper = stepper_with(
            StepperConfig {
                cooldown: 0.5,
                ..StepperConfig::default()
            },
            &chain,
            &skeleton,
        );

        // Fresh steppers are past cooldown, but a stepping partner blocks.
        assert!(stepper.can_step(false));
        assert!(!stepper.can_step(true));

        // Simulate a just-completed step.
        stepper.time_since_last_step = 0.0;
        assert!(!stepper.can_step(false));
        stepper.time_since_last_step = 0.5;
        assert!(stepper.can_step(false));
    }

    #[test]
    fn drag_follows_body_velocity() {
        let (_, mut chain) = leg();
        let body = BodyFrame {
            velocity: Vector3::new(2.0, 0.0, -1.0),
            ..BodyFrame::default()
        };
        let (skeleton2, chain2) = leg();
        let stepper = stepper_with(StepperConfig::default(), &chain2, &skeleton2);

        chain.target.position = Vector3::zeros();
        stepper.drag_target(0.5, &mut chain, &body);
        assert_relative_eq!(chain.target.position.x, 1.0);
        assert_relative_eq!(chain.target.position.z, -0.5);
    }
}
