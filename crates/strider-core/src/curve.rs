//! Step-height curve.
//!
//! During a step transition the foot target is lifted by a height sampled
//! from a curve over normalized time. The curve is plain sampled data so a
//! rig can ship authored profiles without pulling in a spline library.

use bevy::log::warn;

/// Sampled `f(t in [0, 1]) -> height` curve with linear interpolation
/// between samples.
#[derive(Debug, Clone, PartialEq)]
pub struct StepCurve {
    samples: Vec<f32>,
}

impl StepCurve {
    /// Build from evenly spaced samples over `[0, 1]`.
    ///
    /// Fewer than two samples cannot describe a curve; such input is
    /// replaced by the default arc with a warning.
    #[must_use]
    pub fn from_samples(samples: Vec<f32>) -> Self {
        if samples.len() < 2 {
            warn!(
                "StepCurve needs at least 2 samples, got {}; using default arc",
                samples.len()
            );
            return Self::default();
        }
        Self { samples }
    }

    /// Sine arc of the given peak height: zero at both ends, `height` at
    /// the midpoint. `resolution` is the number of segments (>= 2; even
    /// values sample the peak exactly).
    #[must_use]
    pub fn arc(height: f32, resolution: usize) -> Self {
        let segments = resolution.max(2);
        let samples = (0..=segments)
            .map(|i| {
                let t = i as f32 / segments as f32;
                (std::f32::consts::PI * t).sin() * height
            })
            .collect();
        Self { samples }
    }

    /// Height at normalized time `t`, clamped into `[0, 1]`.
    #[must_use]
    pub fn sample(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let last = self.samples.len() - 1;
        let x = t * last as f32;
        let i = (x.floor() as usize).min(last - 1);
        let frac = x - i as f32;
        self.samples[i] * (1.0 - frac) + self.samples[i + 1] * frac
    }
}

impl Default for StepCurve {
    /// Sine arc with peak height 0.3.
    fn default() -> Self {
        Self::arc(0.3, 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn arc_is_zero_at_ends_and_peaks_at_half() {
        let curve = StepCurve::arc(0.5, 16);
        assert_relative_eq!(curve.sample(0.0), 0.0, epsilon = 1e-6);
        assert_relative_eq!(curve.sample(1.0), 0.0, epsilon = 1e-6);
        assert_relative_eq!(curve.sample(0.5), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn sample_interpolates_linearly_between_samples() {
        let curve = StepCurve::from_samples(vec![0.0, 1.0]);
        assert_relative_eq!(curve.sample(0.25), 0.25);
        assert_relative_eq!(curve.sample(0.75), 0.75);
    }

    #[test]
    fn sample_clamps_out_of_range_t() {
        let curve = StepCurve::from_samples(vec![1.0, 2.0, 3.0]);
        assert_relative_eq!(curve.sample(-1.0), 1.0);
        assert_relative_eq!(curve.sample(2.0), 3.0);
    }

    #[test]
    fn degenerate_input_falls_back_to_default() {
        let curve = StepCurve::from_samples(vec![5.0]);
        assert_eq!(curve, StepCurve::default());
    }
}
