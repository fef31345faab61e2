use std::path::Path;

use bevy::log::warn;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_max_iterations() -> u32 {
    10
}
const fn default_tolerance() -> f32 {
    0.01
}
const fn default_global_weight() -> f32 {
    0.8
}
const fn default_min_angle() -> f32 {
    -90.0
}
const fn default_max_angle() -> f32 {
    90.0
}
const fn default_weight() -> f32 {
    1.0
}
const fn default_true() -> bool {
    true
}
const fn default_step_time() -> f32 {
    0.3
}
const fn default_cooldown() -> f32 {
    0.2
}
const fn default_error_tolerance() -> f32 {
    0.25
}
const fn default_min_reach_fraction() -> f32 {
    0.3
}
const fn default_velocity_prediction() -> f32 {
    0.5
}
const fn default_probe_reach() -> f32 {
    1.0
}
const fn default_raise_height() -> f32 {
    0.5
}
const fn default_step_height() -> f32 {
    0.3
}
const fn default_vec3() -> [f32; 3] {
    [0.0, 0.0, 0.0]
}

// ---------------------------------------------------------------------------
// Axis modes and gait groups
// ---------------------------------------------------------------------------

/// Which frame and basis vector a hinge rotates about.
///
/// A small closed set of capability-equivalent configurations: the body
/// frame's or the joint's own frame's X/Y/Z axis, optionally flipped and
/// offset (see the joint's axis settings). Resolved into a world-space
/// axis vector from the live frame every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisMode {
    BodyX,
    BodyY,
    BodyZ,
    #[default]
    LocalX,
    LocalY,
    LocalZ,
}

/// Gait group a leg is scheduled in. Groups alternate: A steps while B
/// supports, then the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaitGroup {
    #[default]
    A,
    B,
}

impl GaitGroup {
    /// The other group.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

// ---------------------------------------------------------------------------
// SolverConfig
// ---------------------------------------------------------------------------

/// CCD solver tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
pub struct SolverConfig {
    /// Maximum CCD sweeps per solve call.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// End-effector distance below which the solve counts as converged.
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,

    /// Per-sweep improvement below which the solver reports a stall and
    /// exits early. Zero disables stall detection.
    #[serde(default)]
    pub min_progress: f32,

    /// Projected target distances below this skip the joint for the sweep
    /// (degenerate geometry near the rotation axis).
    #[serde(default)]
    pub singularity_radius: f32,

    /// Global angle damping multiplied into every joint's own weight.
    #[serde(default = "default_global_weight")]
    pub global_weight: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            min_progress: 0.0,
            singularity_radius: 0.0,
            global_weight: default_global_weight(),
        }
    }
}

// ---------------------------------------------------------------------------
// JointConfig
// ---------------------------------------------------------------------------

/// Static per-joint parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    /// Name of the skeleton bone this joint rotates.
    pub bone: String,

    /// Rotation axis selection.
    #[serde(default)]
    pub axis: AxisMode,

    /// Negate the resolved axis.
    #[serde(default)]
    pub flip: bool,

    /// Extra fixed rotation of the axis frame, XYZ Euler degrees.
    #[serde(default = "default_vec3")]
    pub axis_offset_deg: [f32; 3],

    /// Rotation point, as a fixed offset from the bone origin in the
    /// bone's local frame (scales with the body).
    #[serde(default = "default_vec3")]
    pub pivot: [f32; 3],

    /// Lower rotation limit in degrees.
    #[serde(default = "default_min_angle")]
    pub min_angle: f32,

    /// Upper rotation limit in degrees.
    #[serde(default = "default_max_angle")]
    pub max_angle: f32,

    /// Whether the limits are enforced.
    #[serde(default = "default_true")]
    pub limited: bool,

    /// Solver weight in `[0, 1]`.
    #[serde(default = "default_weight")]
    pub weight: f32,
}

// ---------------------------------------------------------------------------
// StepConfig
// ---------------------------------------------------------------------------

/// Per-leg stepping parameters. Distances are body-local and scale with the
/// body's uniform scale factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Duration of one step transition, seconds. Also the length of one
    /// gait phase window.
    #[serde(default = "default_step_time")]
    pub step_time: f32,

    /// Minimum time between the end of one step and the start of the next.
    #[serde(default = "default_cooldown")]
    pub cooldown: f32,

    /// Chain error above which the leg wants to re-plant.
    #[serde(default = "default_error_tolerance")]
    pub error_tolerance: f32,

    /// A foothold closer to the chain root than this fraction of the chain
    /// length triggers a step.
    #[serde(default = "default_min_reach_fraction")]
    pub min_reach_fraction: f32,

    /// Overshoot factor past the default stance in the direction of travel.
    #[serde(default = "default_velocity_prediction")]
    pub velocity_prediction: f32,

    /// Probe segment half-length around candidate footholds.
    #[serde(default = "default_probe_reach")]
    pub probe_reach: f32,

    /// Sphere radius for probe casts. Zero casts rays.
    #[serde(default)]
    pub probe_radius: f32,

    /// Height above the default stance for the synthesized fallback target
    /// when every probe misses.
    #[serde(default = "default_raise_height")]
    pub raise_height: f32,

    /// Default stance position offset from the end effector's rest
    /// position, body-local.
    #[serde(default = "default_vec3")]
    pub stance_offset: [f32; 3],

    /// Peak foot lift height during a step.
    #[serde(default = "default_step_height")]
    pub step_height: f32,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            step_time: default_step_time(),
            cooldown: default_cooldown(),
            error_tolerance: default_error_tolerance(),
            min_reach_fraction: default_min_reach_fraction(),
            velocity_prediction: default_velocity_prediction(),
            probe_reach: default_probe_reach(),
            probe_radius: 0.0,
            raise_height: default_raise_height(),
            stance_offset: default_vec3(),
            step_height: default_step_height(),
        }
    }
}

// ---------------------------------------------------------------------------
// LegConfig
// ---------------------------------------------------------------------------

/// One leg: a joint chain, its end effector, and stepping behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegConfig {
    /// Leg name, used in logs and for partner references.
    pub name: String,

    /// Constrained joints, root first.
    pub joints: Vec<JointConfig>,

    /// Bone whose origin is the chain's end effector.
    pub end_effector: String,

    /// Foot alignment offset in degrees from the surface normal. `None`
    /// disables the foot-alignment pass for this chain.
    #[serde(default)]
    pub foot_angle_offset: Option<f32>,

    /// Gait group this leg steps with.
    #[serde(default)]
    pub group: GaitGroup,

    /// Name of a leg that must not step at the same time as this one.
    #[serde(default)]
    pub partner: Option<String>,

    /// Stepping parameters.
    #[serde(default)]
    pub step: StepConfig,
}

// ---------------------------------------------------------------------------
// GaitConfig
// ---------------------------------------------------------------------------

/// Global gait scheduling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitConfig {
    /// Phase window length, seconds. Group A is active for
    /// `[0, step_time)` of every `2 * step_time` window, group B for the
    /// second half.
    #[serde(default = "default_step_time")]
    pub step_time: f32,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            step_time: default_step_time(),
        }
    }
}

// ---------------------------------------------------------------------------
// RigConfig
// ---------------------------------------------------------------------------

/// Complete rig configuration: solver, gait, and legs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Resource)]
pub struct RigConfig {
    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub gait: GaitConfig,

    #[serde(default)]
    pub legs: Vec<LegConfig>,
}

impl RigConfig {
    /// Parse from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] on parse failure.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Toml`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Repair out-of-range values in place.
    ///
    /// Swapped angle limits, weights outside `[0, 1]`, and non-positive
    /// timings are clamped or defaulted with a warning. Idempotent; never
    /// fails.
    pub fn sanitize(&mut self) {
        if self.solver.max_iterations == 0 {
            warn!("solver.max_iterations of 0 bumped to 1");
            self.solver.max_iterations = 1;
        }
        if self.solver.tolerance <= 0.0 {
            warn!(
                "solver.tolerance {} is not positive; using {}",
                self.solver.tolerance,
                default_tolerance()
            );
            self.solver.tolerance = default_tolerance();
        }
        self.solver.global_weight = self.solver.global_weight.clamp(0.0, 1.0);
        self.solver.min_progress = self.solver.min_progress.max(0.0);
        self.solver.singularity_radius = self.solver.singularity_radius.max(0.0);

        if self.gait.step_time <= 0.0 {
            warn!(
                "gait.step_time {} is not positive; using {}",
                self.gait.step_time,
                default_step_time()
            );
            self.gait.step_time = default_step_time();
        }

        for leg in &mut self.legs {
            for joint in &mut leg.joints {
                if joint.min_angle > joint.max_angle {
                    warn!(
                        "leg '{}' joint '{}': min_angle {} > max_angle {}; swapping",
                        leg.name, joint.bone, joint.min_angle, joint.max_angle
                    );
                    std::mem::swap(&mut joint.min_angle, &mut joint.max_angle);
                }
                if !(0.0..=1.0).contains(&joint.weight) {
                    warn!(
                        "leg '{}' joint '{}': weight {} clamped into [0, 1]",
                        leg.name, joint.bone, joint.weight
                    );
                    joint.weight = joint.weight.clamp(0.0, 1.0);
                }
            }

            let step = &mut leg.step;
            if step.step_time <= 0.0 {
                warn!(
                    "leg '{}': step_time {} is not positive; using {}",
                    leg.name,
                    step.step_time,
                    default_step_time()
                );
                step.step_time = default_step_time();
            }
            step.cooldown = step.cooldown.max(0.0);
            step.error_tolerance = step.error_tolerance.max(0.0);
            step.min_reach_fraction = step.min_reach_fraction.clamp(0.0, 0.99);
            step.velocity_prediction = step.velocity_prediction.max(0.0);
            step.probe_reach = step.probe_reach.max(1e-3);
            step.probe_radius = step.probe_radius.max(0.0);
            step.raise_height = step.raise_height.max(0.0);
        }
    }

    /// Structural validation that cannot be repaired.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoLegs`] if the rig has no legs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.legs.is_empty() {
            return Err(ConfigError::NoLegs);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn one_leg_config() -> RigConfig {
        RigConfig {
            legs: vec![LegConfig {
                name: "front_left".into(),
                joints: vec![JointConfig {
                    bone: "hip_fl".into(),
                    axis: AxisMode::BodyY,
                    flip: false,
                    axis_offset_deg: [0.0, 0.0, 0.0],
                    pivot: [0.0, 0.0, 0.0],
                    min_angle: -45.0,
                    max_angle: 45.0,
                    limited: true,
                    weight: 1.0,
                }],
                end_effector: "foot_fl".into(),
                foot_angle_offset: None,
                group: GaitGroup::A,
                partner: None,
                step: StepConfig::default(),
            }],
            ..RigConfig::default()
        }
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = one_leg_config();
        let text = toml::to_string(&config).unwrap();
        let parsed = RigConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_fills_defaults() {
        let text = r#"
            [[legs]]
            name = "fl"
            end_effector = "foot"

            [[legs.joints]]
            bone = "hip"
        "#;
        let config = RigConfig::from_toml_str(text).unwrap();
        assert_eq!(config.solver.max_iterations, 10);
        assert_relative_eq!(config.legs[0].joints[0].max_angle, 90.0);
        assert_eq!(config.legs[0].joints[0].axis, AxisMode::LocalX);
        assert!(config.legs[0].joints[0].limited);
    }

    #[test]
    fn sanitize_swaps_inverted_limits() {
        let mut config = one_leg_config();
        config.legs[0].joints[0].min_angle = 60.0;
        config.legs[0].joints[0].max_angle = -60.0;
        config.sanitize();
        assert_relative_eq!(config.legs[0].joints[0].min_angle, -60.0);
        assert_relative_eq!(config.legs[0].joints[0].max_angle, 60.0);
    }

    #[test]
    fn sanitize_clamps_weight_and_timings() {
        let mut config = one_leg_config();
        config.legs[0].joints[0].weight = 3.0;
        config.legs[0].step.step_time = -1.0;
        config.solver.max_iterations = 0;
        config.sanitize();
        assert_relative_eq!(config.legs[0].joints[0].weight, 1.0);
        assert!(config.legs[0].step.step_time > 0.0);
        assert_eq!(config.solver.max_iterations, 1);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let mut config = one_leg_config();
        config.legs[0].joints[0].min_angle = 30.0;
        config.legs[0].joints[0].max_angle = -30.0;
        config.sanitize();
        let once = config.clone();
        config.sanitize();
        assert_eq!(config, once);
    }

    #[test]
    fn validate_rejects_empty_rig() {
        let config = RigConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::NoLegs)));
        assert!(one_leg_config().validate().is_ok());
    }

    #[test]
    fn gait_group_other_flips() {
        assert_eq!(GaitGroup::A.other(), GaitGroup::B);
        assert_eq!(GaitGroup::B.other(), GaitGroup::A);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(matches!(
            RigConfig::from_toml_str("legs = 3"),
            Err(ConfigError::Toml(_))
        ));
    }
}
