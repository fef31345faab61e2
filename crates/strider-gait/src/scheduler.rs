//! Gait scheduling: which legs are allowed to step, and when.
//!
//! Legs are partitioned into two fixed groups that alternate on a global
//! phase clock: group A owns `[0, step_time)` of every `2 * step_time`
//! window, group B the second half. Steps are only *triggered* on the
//! activation edge, producing an alternating (tripod-like) gait without
//! any per-leg negotiation beyond the async-partner pairing in the
//! stepper layer.

use strider_core::config::GaitGroup;

use crate::rig::LegId;

/// Two-group alternating gait scheduler.
#[derive(Debug, Clone)]
pub struct GaitScheduler {
    step_time: f32,
    assignments: Vec<GaitGroup>,
    previous_active: GaitGroup,
}

impl GaitScheduler {
    /// New scheduler over per-leg group assignments (indexed by leg).
    ///
    /// The previous active group starts as the group active at t = 0, so
    /// the first activation edge fires when the phase first flips rather
    /// than on the very first tick.
    #[must_use]
    pub fn new(step_time: f32, assignments: Vec<GaitGroup>) -> Self {
        Self {
            step_time: step_time.max(1e-3),
            assignments,
            previous_active: GaitGroup::A,
        }
    }

    /// Phase window length in seconds.
    #[must_use]
    pub const fn step_time(&self) -> f32 {
        self.step_time
    }

    /// Group a leg belongs to.
    #[must_use]
    pub fn group_of(&self, leg: LegId) -> GaitGroup {
        self.assignments[leg.0]
    }

    /// The group active at `time` seconds, deterministically.
    #[must_use]
    pub fn active_group(&self, time: f64) -> GaitGroup {
        let cycle = 2.0 * f64::from(self.step_time);
        if time.rem_euclid(cycle) < f64::from(self.step_time) {
            GaitGroup::A
        } else {
            GaitGroup::B
        }
    }

    /// Advance to `time`; returns the newly activated group when the
    /// active group changed since the previous call.
    pub fn update(&mut self, time: f64) -> Option<GaitGroup> {
        let active = self.active_group(time);
        if active == self.previous_active {
            return None;
        }
        self.previous_active = active;
        Some(active)
    }

    /// Legs in the given group.
    pub fn legs_in(&self, group: GaitGroup) -> impl Iterator<Item = LegId> + '_ {
        self.assignments
            .iter()
            .enumerate()
            .filter(move |(_, g)| **g == group)
            .map(|(i, _)| LegId(i))
    }
}
