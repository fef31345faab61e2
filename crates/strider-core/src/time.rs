use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::time::Duration;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SimTime
// ---------------------------------------------------------------------------

/// Integer-nanosecond simulation clock.
///
/// The gait scheduler derives its phase from this clock, so it must not
/// drift: elapsed time is a monotonically increasing `u64` nanosecond count
/// rather than an accumulated float.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Resource,
)]
pub struct SimTime {
    nanos: u64,
}

impl SimTime {
    /// A clock at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { nanos: 0 }
    }

    /// Clock from a raw nanosecond count.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Clock from seconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_secs(secs: f64) -> Self {
        Self {
            nanos: (secs * 1_000_000_000.0) as u64,
        }
    }

    /// Raw nanosecond count.
    #[must_use]
    pub const fn nanos(&self) -> u64 {
        self.nanos
    }

    /// Elapsed whole milliseconds (truncated).
    #[must_use]
    pub const fn millis(&self) -> u64 {
        self.nanos / 1_000_000
    }

    /// Elapsed seconds as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn secs_f64(&self) -> f64 {
        self.nanos as f64 / 1_000_000_000.0
    }

    /// Elapsed seconds as `f32`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn secs_f32(&self) -> f32 {
        self.nanos as f32 / 1_000_000_000.0
    }

    /// Convert to a standard [`Duration`].
    #[must_use]
    pub const fn to_duration(&self) -> Duration {
        Duration::from_nanos(self.nanos)
    }

    /// Advance the clock by `delta_nanos` nanoseconds.
    pub const fn advance(&mut self, delta_nanos: u64) {
        self.nanos = self.nanos.saturating_add(delta_nanos);
    }

    /// Advance the clock by `delta_secs` seconds.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn advance_secs(&mut self, delta_secs: f64) {
        let delta_nanos = (delta_secs * 1_000_000_000.0) as u64;
        self.advance(delta_nanos);
    }

    /// Reset the clock to zero.
    pub const fn reset(&mut self) {
        self.nanos = 0;
    }

    /// Position of the clock within a repeating window of `period_secs`,
    /// as seconds in `[0, period_secs)`.
    ///
    /// Returns 0 for a non-positive period.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn phase_in(&self, period_secs: f64) -> f64 {
        if period_secs <= 0.0 {
            return 0.0;
        }
        let period_nanos = (period_secs * 1_000_000_000.0) as u64;
        if period_nanos == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            (self.nanos % period_nanos) as f64 / 1_000_000_000.0
        }
    }
}

// -- Operator impls --

impl Add<Duration> for SimTime {
    type Output = Self;

    #[allow(clippy::cast_possible_truncation)]
    fn add(self, rhs: Duration) -> Self {
        Self {
            nanos: self.nanos.saturating_add(rhs.as_nanos() as u64),
        }
    }
}

impl AddAssign<Duration> for SimTime {
    #[allow(clippy::cast_possible_truncation)]
    fn add_assign(&mut self, rhs: Duration) {
        self.nanos = self.nanos.saturating_add(rhs.as_nanos() as u64);
    }
}

impl Sub for SimTime {
    type Output = Duration;

    /// Saturating difference between two clock readings.
    fn sub(self, rhs: Self) -> Duration {
        Duration::from_nanos(self.nanos.saturating_sub(rhs.nanos))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.nanos / 1_000_000_000;
        let millis = (self.nanos % 1_000_000_000) / 1_000_000;
        write!(f, "{total_secs}.{millis:03}s")
    }
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Fixed-timestep accumulator ("fix your timestep").
///
/// Accumulates frame delta time and dispenses fixed-size animation ticks,
/// capped per frame to avoid a death spiral when the app hitches.
#[derive(Debug, Clone)]
pub struct Accumulator {
    accumulated: u64,
    timestep_nanos: u64,
    timestep_secs: f64,
    max_steps: u32,
    steps_this_frame: u32,
}

impl Accumulator {
    /// New accumulator with the given fixed timestep in seconds.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(timestep_secs: f64) -> Self {
        let timestep_nanos = (timestep_secs * 1_000_000_000.0) as u64;
        Self {
            accumulated: 0,
            timestep_nanos,
            timestep_secs,
            max_steps: 8,
            steps_this_frame: 0,
        }
    }

    /// Cap on ticks dispensed per frame.
    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// The fixed timestep in seconds.
    #[must_use]
    pub const fn timestep_secs(&self) -> f64 {
        self.timestep_secs
    }

    /// Feed a frame delta and reset the per-frame step counter.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn accumulate(&mut self, delta: Duration) {
        self.accumulated = self.accumulated.saturating_add(delta.as_nanos() as u64);
        self.steps_this_frame = 0;
    }

    /// Returns `true` if a full timestep is available and the per-frame cap
    /// has not been reached. Each `true` consumes one timestep.
    pub const fn should_step(&mut self) -> bool {
        if self.steps_this_frame >= self.max_steps {
            return false;
        }
        if self.accumulated >= self.timestep_nanos {
            self.accumulated -= self.timestep_nanos;
            self.steps_this_frame += 1;
            return true;
        }
        false
    }
}
