//! Rig assembly and the per-tick update pipeline.
//!
//! A [`Rig`] owns the skeleton, one solvable chain plus stepper per leg,
//! the shared CCD solver, and the gait scheduler, and runs them in a
//! fixed order every tick: body sync, step transitions, chain solves,
//! then gait evaluation.

use bevy::log::{debug, warn};

use strider_core::config::RigConfig;
use strider_core::error::{ConfigError, StriderError};
use strider_core::probe::SurfaceProbe;
use strider_core::time::SimTime;
use strider_core::types::BodyFrame;
use strider_ik::{BoneId, CcdConfig, CcdSolver, Chain, FootConfig, HingeJoint, Skeleton};

use crate::scheduler::GaitScheduler;
use crate::stepper::{Stepper, StepperConfig};

/// Index of a leg within a [`Rig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LegId(pub usize);

/// One animated leg: its solvable chain and its stepping state machine.
#[derive(Debug, Clone)]
pub struct Leg {
    name: String,
    chain: Chain,
    stepper: Stepper,
}

impl Leg {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn chain(&self) -> &Chain {
        &self.chain
    }

    #[must_use]
    pub const fn stepper(&self) -> &Stepper {
        &self.stepper
    }
}

/// A complete animated rig.
///
/// Bones live in world space inside the owned [`Skeleton`]; the body
/// controller's pose is mirrored onto them at the start of every tick, so
/// the rig never fights the controller for ownership of the transform.
#[derive(Debug, Clone)]
pub struct Rig {
    skeleton: Skeleton,
    legs: Vec<Leg>,
    solver: CcdSolver,
    scheduler: GaitScheduler,
    /// Accumulated simulation time driving the gait phase clock.
    clock: SimTime,
    /// Body pose the skeleton was last synchronized against.
    previous_body: BodyFrame,
}

impl Rig {
    /// Assemble a rig from a sanitized configuration over `skeleton`,
    /// capturing default stances against `body` as the rest pose.
    ///
    /// The configuration is re-sanitized here so hand-built configs get
    /// the same value repairs as file-loaded ones. Unknown partner names
    /// degrade to "no partner" with a warning; unknown bone names are
    /// structural and fail the build.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoLegs`] for a legless config,
    /// [`ConfigError::UnknownBone`] when a joint or end effector names a
    /// bone the skeleton does not have, and [`strider_core::error::ChainError`]
    /// for degenerate chain definitions.
    pub fn from_config(
        config: &RigConfig,
        skeleton: Skeleton,
        body: &BodyFrame,
    ) -> Result<Self, StriderError> {
        let mut config = config.clone();
        config.sanitize();
        config.validate()?;

        let find = |skeleton: &Skeleton, leg: &str, bone: &str| -> Result<BoneId, ConfigError> {
            skeleton.find(bone).ok_or_else(|| ConfigError::UnknownBone {
                leg: leg.to_string(),
                bone: bone.to_string(),
            })
        };

        let mut legs = Vec::with_capacity(config.legs.len());
        let mut assignments = Vec::with_capacity(config.legs.len());
        for leg_config in &config.legs {
            let joints = leg_config
                .joints
                .iter()
                .map(|j| {
                    let bone = find(&skeleton, &leg_config.name, &j.bone)?;
                    Ok(HingeJoint::from_config(j, bone))
                })
                .collect::<Result<Vec<_>, ConfigError>>()?;
            let end = find(&skeleton, &leg_config.name, &leg_config.end_effector)?;

            let mut chain = Chain::new(&skeleton, joints, end)?;
            if let Some(angle_offset) = leg_config.foot_angle_offset {
                chain = chain.with_foot(FootConfig { angle_offset });
            }

            let stepper = Stepper::new(
                StepperConfig::from(&leg_config.step),
                &chain,
                &skeleton,
                body,
                None,
            );
            assignments.push(leg_config.group);
            legs.push(Leg {
                name: leg_config.name.clone(),
                chain,
                stepper,
            });
        }

        // Partner resolution is a second pass so pairs can reference legs
        // declared in either order.
        for (i, leg_config) in config.legs.iter().enumerate() {
            let Some(partner_name) = &leg_config.partner else {
                continue;
            };
            match config.legs.iter().position(|l| &l.name == partner_name) {
                Some(j) if j != i => legs[i].stepper.partner = Some(LegId(j)),
                Some(_) => warn!(
                    "leg '{}' lists itself as its async partner; ignoring",
                    leg_config.name
                ),
                None => warn!(
                    "leg '{}' references unknown partner '{}'; ignoring",
                    leg_config.name, partner_name
                ),
            }
        }

        Ok(Self {
            skeleton,
            legs,
            solver: CcdSolver::new(CcdConfig::from(&config.solver)),
            scheduler: GaitScheduler::new(config.gait.step_time, assignments),
            clock: SimTime::new(),
            previous_body: body.clone(),
        })
    }

    #[must_use]
    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    #[must_use]
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    #[must_use]
    pub fn leg(&self, id: LegId) -> &Leg {
        &self.legs[id.0]
    }

    /// Look up a leg by its configured name.
    #[must_use]
    pub fn find_leg(&self, name: &str) -> Option<LegId> {
        self.legs.iter().position(|l| l.name == name).map(LegId)
    }

    #[must_use]
    pub const fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    #[must_use]
    pub const fn scheduler(&self) -> &GaitScheduler {
        &self.scheduler
    }

    /// Accumulated gait clock.
    #[must_use]
    pub const fn clock(&self) -> SimTime {
        self.clock
    }

    /// Total completed steps across all legs.
    #[must_use]
    pub fn steps_taken(&self) -> u32 {
        self.legs.iter().map(|l| l.stepper.steps_taken()).sum()
    }

    /// Run one fixed tick of the animation pipeline.
    ///
    /// Order matters: the skeleton is synchronized to the body first so
    /// every later stage sees consistent world poses, in-flight step
    /// transitions publish their interpolated targets next so the solver
    /// chases this tick's targets, then every chain is solved, and gait
    /// evaluation runs last so step decisions see post-solve errors.
    pub fn tick(&mut self, dt: f32, body: &BodyFrame, probe: &dyn SurfaceProbe) {
        self.clock.advance_secs(f64::from(dt));
        self.sync_body(body);

        for leg in &mut self.legs {
            leg.stepper.advance(dt, &mut leg.chain, body);
        }

        for leg in &mut self.legs {
            self.solver.solve(&mut self.skeleton, body, &mut leg.chain);
        }

        self.evaluate_gait(dt, body, probe);
    }

    /// Mirror body movement since the previous tick onto the skeleton.
    fn sync_body(&mut self, body: &BodyFrame) {
        let delta_rotation = body.rotation * self.previous_body.rotation.inverse();
        let delta_translation = body.position - self.previous_body.position;
        if delta_rotation.angle() < 1e-7 && delta_translation.norm_squared() < 1e-14 {
            self.previous_body = body.clone();
            return;
        }

        let roots: Vec<BoneId> = self.skeleton.roots().collect();
        for root in roots {
            // Pivot the whole hierarchy about the previous body origin,
            // then carry it along the body's translation.
            self.skeleton
                .rotate_about(root, &delta_rotation, &self.previous_body.position);
            self.skeleton.translate_subtree(root, &delta_translation);
        }
        self.previous_body = body.clone();
    }

    /// Trigger steps on gait activation edges and drag stale footholds.
    fn evaluate_gait(&mut self, dt: f32, body: &BodyFrame, probe: &dyn SurfaceProbe) {
        if let Some(group) = self.scheduler.update(self.clock.secs_f64()) {
            debug!("gait phase: group {group:?} active at t={}", self.clock);
            let activated: Vec<LegId> = self.scheduler.legs_in(group).collect();
            for id in activated {
                // Checked live, not snapshotted, so a partner that just
                // lifted this same edge blocks its pair.
                let partner_stepping = self.legs[id.0]
                    .stepper
                    .partner
                    .is_some_and(|p| self.legs[p.0].stepper.is_stepping());
                let leg = &mut self.legs[id.0];
                if leg.stepper.needs_step(&leg.chain, &self.skeleton, body)
                    && leg.stepper.can_step(partner_stepping)
                {
                    leg.stepper
                        .begin_step(&leg.chain, &self.skeleton, body, probe);
                }
            }
        }

        // Legs that want a step but could not take one keep their stale
        // foothold moving with the body instead of snapping later.
        for leg in &mut self.legs {
            if !leg.stepper.is_stepping()
                && leg.stepper.needs_step(&leg.chain, &self.skeleton, body)
            {
                leg.stepper.drag_target(dt, &mut leg.chain, body);
            }
        }
    }
}
