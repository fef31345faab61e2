// strider-core: Types, errors, clock, and configuration for the strider
// procedural leg animation stack.

pub mod config;
pub mod curve;
pub mod error;
pub mod probe;
pub mod time;
pub mod types;

pub use config::{GaitConfig, JointConfig, LegConfig, RigConfig, SolverConfig};
pub use curve::StepCurve;
pub use error::{ChainError, ConfigError, StriderError};
pub use probe::{PlaneProbe, ProbeQuery, ProbeShape, SurfaceProbe};
pub use time::{Accumulator, SimTime};
pub use types::{BodyFrame, SurfaceHit, Target};

use bevy::prelude::SystemSet;

/// System set ordering for the strider tick.
///
/// External code (the locomotion/body controller) runs in [`StriderSet::Drive`]
/// and writes the body frame; the rig tick runs in [`StriderSet::Animate`].
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StriderSet {
    /// Body controller updates: position, orientation, velocity.
    Drive,
    /// Chain solving and step scheduling.
    Animate,
}
