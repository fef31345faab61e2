//! Bevy ECS integration for the animation stack.
//!
//! Provides [`StriderPlugin`] which runs the rig on a fixed timestep fed
//! from the app's frame clock.
//!
//! # Usage
//!
//! 1. Add [`StriderPlugin`] to your app.
//! 2. Insert a built [`Rig`] via [`StriderRig::insert`].
//! 3. Replace [`SurfaceWorld`] with a probe backed by your scene.
//! 4. Write the body pose into [`BodyDrive`] from a system in
//!    [`StriderSet::Drive`].
//!
//! The rig tick runs in [`StriderSet::Animate`], always after
//! [`StriderSet::Drive`] within the same frame.

use bevy::prelude::*;

use strider_core::probe::{PlaneProbe, SurfaceProbe};
use strider_core::time::Accumulator;
use strider_core::types::BodyFrame;
use strider_core::StriderSet;

use crate::rig::Rig;

/// Default fixed animation timestep, seconds.
pub const DEFAULT_TIMESTEP: f64 = 1.0 / 60.0;

/// Bevy plugin that ticks the rig each frame.
pub struct StriderPlugin;

impl Plugin for StriderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BodyDrive>()
            .init_resource::<SurfaceWorld>()
            .init_resource::<StriderRig>()
            .configure_sets(Update, (StriderSet::Drive, StriderSet::Animate).chain())
            .add_systems(Update, rig_tick_system.in_set(StriderSet::Animate));
    }
}

/// Resource carrying the body controller's output pose.
///
/// Whatever drives the character (player input, physics, a path follower)
/// writes here in [`StriderSet::Drive`]; the rig only reads it.
#[derive(Resource, Debug, Clone, Default)]
pub struct BodyDrive(pub BodyFrame);

/// Resource wrapping the scene's surface probe.
///
/// Defaults to a ground plane at y = 0; apps with real geometry replace it
/// with a probe backed by their scene queries.
#[derive(Resource)]
pub struct SurfaceWorld(pub Box<dyn SurfaceProbe + Send + Sync>);

impl Default for SurfaceWorld {
    fn default() -> Self {
        Self(Box::new(PlaneProbe::new(0.0)))
    }
}

/// Resource owning the rig and its fixed-timestep accumulator.
///
/// Starts empty; systems are inert until a rig is inserted.
#[derive(Resource, Debug)]
pub struct StriderRig {
    rig: Option<Rig>,
    accumulator: Accumulator,
}

impl Default for StriderRig {
    fn default() -> Self {
        Self {
            rig: None,
            accumulator: Accumulator::new(DEFAULT_TIMESTEP),
        }
    }
}

impl StriderRig {
    /// Install a built rig, resetting the tick accumulator.
    pub fn insert(&mut self, rig: Rig) {
        self.rig = Some(rig);
        self.accumulator = Accumulator::new(DEFAULT_TIMESTEP);
    }

    /// Remove and return the current rig.
    pub fn take(&mut self) -> Option<Rig> {
        self.rig.take()
    }

    #[must_use]
    pub fn get(&self) -> Option<&Rig> {
        self.rig.as_ref()
    }

    #[must_use]
    pub fn get_mut(&mut self) -> Option<&mut Rig> {
        self.rig.as_mut()
    }
}

/// System that feeds frame time into the accumulator and runs fixed rig
/// ticks against the current body pose and surface probe.
#[allow(clippy::needless_pass_by_value)]
pub fn rig_tick_system(
    time: Res<Time>,
    body: Res<BodyDrive>,
    surface: Res<SurfaceWorld>,
    mut strider: ResMut<StriderRig>,
) {
    let strider = &mut *strider;
    let Some(rig) = strider.rig.as_mut() else {
        return;
    };

    strider.accumulator.accumulate(time.delta());
    #[allow(clippy::cast_possible_truncation)]
    let dt = strider.accumulator.timestep_secs() as f32;
    while strider.accumulator.should_step() {
        rig.tick(dt, &body.0, surface.0.as_ref());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
    use std::time::Duration;
    use strider_core::config::{AxisMode, JointConfig, LegConfig, RigConfig};
    use strider_ik::Skeleton;

    fn one_leg_rig() -> Rig {
        let mut skeleton = Skeleton::new();
        let hip = skeleton.add_root(
            "hip",
            Isometry3::from_parts(Translation3::new(0.0, 1.0, 0.0), UnitQuaternion::identity()),
        );
        let knee = skeleton.add_bone(
            "knee",
            hip,
            Isometry3::from_parts(Translation3::new(0.0, 0.5, 0.0), UnitQuaternion::identity()),
        );
        skeleton.add_bone(
            "foot",
            knee,
            Isometry3::from_parts(Translation3::new(0.0, 0.0, 0.0), UnitQuaternion::identity()),
        );

        let config = RigConfig {
            legs: vec![LegConfig {
                name: "leg".to_string(),
                joints: vec![
                    JointConfig {
                        bone: "hip".to_string(),
                        axis: AxisMode::BodyZ,
                        flip: false,
                        axis_offset_deg: [0.0; 3],
                        pivot: [0.0; 3],
                        min_angle: -120.0,
                        max_angle: 120.0,
                        limited: true,
                        weight: 1.0,
                    },
                    JointConfig {
                        bone: "knee".to_string(),
                        axis: AxisMode::BodyZ,
                        flip: false,
                        axis_offset_deg: [0.0; 3],
                        pivot: [0.0; 3],
                        min_angle: -120.0,
                        max_angle: 120.0,
                        limited: true,
                        weight: 1.0,
                    },
                ],
                end_effector: "foot".to_string(),
                foot_angle_offset: None,
                group: strider_core::config::GaitGroup::A,
                partner: None,
                step: strider_core::config::StepConfig::default(),
            }],
            ..RigConfig::default()
        };
        let body = BodyFrame {
            position: Vector3::new(0.0, 1.0, 0.0),
            ..BodyFrame::default()
        };
        Rig::from_config(&config, skeleton, &body).unwrap()
    }

    #[test]
    fn plugin_builds_and_registers_resources() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(StriderPlugin);
        app.finish();
        app.cleanup();
        app.update();

        assert!(app.world().get_resource::<BodyDrive>().is_some());
        assert!(app.world().get_resource::<SurfaceWorld>().is_some());
        assert!(app.world().get_resource::<StriderRig>().is_some());
    }

    #[test]
    fn empty_strider_rig_is_inert() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(StriderPlugin);
        app.finish();
        app.cleanup();
        // No rig installed; the system must simply do nothing.
        app.update();
        app.update();
        assert!(app.world().resource::<StriderRig>().get().is_none());
    }

    #[test]
    fn installed_rig_ticks_on_the_fixed_clock() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(StriderPlugin);
        app.finish();
        app.cleanup();

        app.world_mut()
            .resource_mut::<StriderRig>()
            .insert(one_leg_rig());
        app.world_mut().resource_mut::<BodyDrive>().0 = BodyFrame {
            position: Vector3::new(0.0, 1.0, 0.0),
            ..BodyFrame::default()
        };

        // First update initializes the frame clock; real elapsed time
        // between updates feeds the accumulator.
        app.update();
        std::thread::sleep(Duration::from_millis(40));
        app.update();

        let strider = app.world().resource::<StriderRig>();
        let rig = strider.get().unwrap();
        assert!(rig.clock().secs_f64() > 0.0);
    }

    #[test]
    fn take_removes_the_rig() {
        let mut strider = StriderRig::default();
        strider.insert(one_leg_rig());
        assert!(strider.get().is_some());
        assert!(strider.take().is_some());
        assert!(strider.get().is_none());
    }
}
