//! Injected randomness for weight, delay and connection sampling

use crate::error::{BuildError, Result};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Clamp applied to gaussian samples, in standard deviations
pub const GAUSSIAN_CLAMP: f64 = 3.0;

/// Scale between a weight in [-1, 1] and its stored `i8` form
pub const WEIGHT_SCALE: f64 = 127.0;

/// Random source shared by every recipe in one build.
///
/// Wraps a seeded `StdRng` and caches the second value of each Box-Muller
/// pair, so two consecutive gaussian draws cost one pair of uniforms.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: StdRng,
    spare: Option<f64>,
}

impl RandomSource {
    /// Deterministic source for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            spare: None,
        }
    }

    /// Source seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            spare: None,
        }
    }

    /// Uniform value in [0, 1)
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Standard normal sample
    pub fn gaussian(&mut self) -> f64 {
        if let Some(spare) = self.spare.take() {
            return spare;
        }
        // u1 must be non-zero for the logarithm
        let u1 = 1.0 - self.uniform();
        let u2 = self.uniform();
        let mag = (-2.0 * u1.ln()).sqrt();
        self.spare = Some(mag * (2.0 * PI * u2).sin());
        mag * (2.0 * PI * u2).cos()
    }

    /// Standard normal sample clamped to ±3
    pub fn clamped_gaussian(&mut self) -> f64 {
        self.gaussian().clamp(-GAUSSIAN_CLAMP, GAUSSIAN_CLAMP)
    }

    /// True with probability `density`
    pub fn bernoulli(&mut self, density: f64) -> bool {
        self.uniform() < density
    }

    /// Uniform delay in `[min, max]`
    pub fn sample_delay(&mut self, min: u32, max: u32) -> Result<u8> {
        if min > max {
            return Err(BuildError::InvalidDelay { min, max });
        }
        let delay = if min == max {
            min
        } else {
            self.rng.gen_range(min..=max)
        };
        u8::try_from(delay).map_err(|_| BuildError::InvalidDelay { min, max })
    }

    /// Quantized weight around `base`.
    ///
    /// Noise is `clamped_gaussian() * range / 3` when `gaussian` is set and
    /// uniform in `[0, range]` otherwise. The result is clamped to [-1, 1]
    /// before scaling to `i8`.
    pub fn synthesize_weight(&mut self, base: f64, range: f64, gaussian: bool) -> i8 {
        let noise = if gaussian {
            self.clamped_gaussian() * range / GAUSSIAN_CLAMP
        } else {
            self.uniform() * range
        };
        quantize_weight(base + noise)
    }

    /// Distance-weighted acceptance test.
    ///
    /// Draws a threshold `|clamped_gaussian() / 3 * radius| + 1` and accepts
    /// when it reaches `distance / density`. A non-positive density never
    /// accepts.
    pub fn radial_probability(&mut self, radius: f64, distance: f64, density: f64) -> bool {
        if density <= 0.0 {
            return false;
        }
        let threshold = (self.clamped_gaussian() / GAUSSIAN_CLAMP * radius).abs() + 1.0;
        threshold >= distance / density
    }
}

/// Clamp a weight to [-1, 1] and scale it to its stored form
pub fn quantize_weight(weight: f64) -> i8 {
    let scaled = (weight.clamp(-1.0, 1.0) * WEIGHT_SCALE).round();
    // in [-127, 127] after the clamp
    scaled as i8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_sources_agree() {
        let mut a = RandomSource::seeded(7);
        let mut b = RandomSource::seeded(7);
        for _ in 0..10 {
            assert_eq!(a.gaussian(), b.gaussian());
            assert_eq!(a.synthesize_weight(0.2, 0.3, false), b.synthesize_weight(0.2, 0.3, false));
        }
    }

    #[test]
    fn test_clamped_gaussian_bounds() {
        let mut rng = RandomSource::seeded(1);
        for _ in 0..10_000 {
            let g = rng.clamped_gaussian();
            assert!((-3.0..=3.0).contains(&g));
        }
    }

    #[test]
    fn test_gaussian_moments() {
        let mut rng = RandomSource::seeded(42);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| rng.gaussian()).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {}", mean);
        assert!((var - 1.0).abs() < 0.1, "variance {}", var);
    }

    #[test]
    fn test_bernoulli_extremes() {
        let mut rng = RandomSource::seeded(3);
        assert!((0..100).all(|_| rng.bernoulli(1.0)));
        assert!((0..100).all(|_| !rng.bernoulli(0.0)));
    }

    #[test]
    fn test_sample_delay() {
        let mut rng = RandomSource::seeded(5);
        assert_eq!(rng.sample_delay(4, 4).unwrap(), 4);
        assert!(matches!(rng.sample_delay(5, 2), Err(BuildError::InvalidDelay { .. })));
        assert!(rng.sample_delay(256, 256).is_err());
        for _ in 0..1000 {
            let d = rng.sample_delay(1, 10).unwrap();
            assert!((1..=10).contains(&d));
        }
    }

    #[test]
    fn test_zero_range_weight_is_base() {
        let mut rng = RandomSource::seeded(9);
        assert_eq!(rng.synthesize_weight(0.5, 0.0, true), 64);
        assert_eq!(rng.synthesize_weight(0.5, 0.0, false), 64);
        assert_eq!(rng.synthesize_weight(-0.3, 0.0, false), -38);
        assert_eq!(rng.synthesize_weight(2.0, 0.0, false), 127);
        assert_eq!(rng.synthesize_weight(-2.0, 0.0, false), -127);
    }

    #[test]
    fn test_radial_probability() {
        let mut rng = RandomSource::seeded(11);
        assert!(!rng.radial_probability(5.0, 0.0, 0.0));
        assert!(!rng.radial_probability(5.0, 1.0, -1.0));
        // threshold is at least 1
        assert!((0..100).all(|_| rng.radial_probability(5.0, 1.0, 1.0)));
        // threshold never exceeds radius + 1
        assert!((0..100).all(|_| !rng.radial_probability(5.0, 6.5, 1.0)));
    }
}
