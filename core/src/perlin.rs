//! Seeded fractal noise built on the `noise` crate, with sampling that wraps
//! around the world horizontally.

use std::fmt;

use noise::{Billow, Fbm, MultiFractal, NoiseFn, Perlin as GradientSource, RidgedMulti};
use serde::{Deserialize, Serialize};

use crate::math::wrap_to_circle;

const MAX_OCTAVES: u32 = 32;

/// Fractal composition applied on top of the base gradient noise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PerlinKind {
    /// Fractional Brownian motion, octaves summed with falling weight.
    #[default]
    Perlin,
    /// Absolute-valued octaves, producing puffy rounded features.
    Billow,
    /// Musgrave ridged multifractal, producing sharp crests.
    RidgedMulti,
}

/// Tuning parameters of a [`Perlin`] source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerlinConfig {
    /// Fractal composition.
    #[serde(rename = "type")]
    pub kind: PerlinKind,
    /// Number of octaves to sum, at most 32.
    pub octaves: u32,
    /// Input scaling applied before sampling.
    pub frequency: f64,
    /// Output scaling applied after composition.
    pub amplitude: f64,
    /// Constant added to the scaled output.
    pub bias: f64,
    /// Weight divisor between octaves; persistence is `1 / alpha`.
    pub alpha: f64,
    /// Frequency multiplier between octaves.
    pub beta: f64,
    /// Ridged multifractal attenuation.
    pub gain: f64,
}

impl Default for PerlinConfig {
    fn default() -> Self {
        Self {
            kind: PerlinKind::Perlin,
            octaves: 1,
            frequency: 1.0,
            amplitude: 1.0,
            bias: 0.0,
            alpha: 2.0,
            beta: 2.0,
            gain: 2.0,
        }
    }
}

enum Fractal {
    Fbm(Fbm<GradientSource>),
    Billow(Billow<GradientSource>),
    Ridged(RidgedMulti<GradientSource>),
}

impl Fractal {
    fn new(config: &PerlinConfig, seed: u32) -> Self {
        let octaves = config.octaves.clamp(1, MAX_OCTAVES) as usize;
        let persistence = if config.alpha == 0.0 { 1.0 } else { 1.0 / config.alpha };
        match config.kind {
            PerlinKind::Perlin => Self::Fbm(
                Fbm::<GradientSource>::new(seed)
                    .set_octaves(octaves)
                    .set_frequency(config.frequency)
                    .set_lacunarity(config.beta)
                    .set_persistence(persistence),
            ),
            PerlinKind::Billow => Self::Billow(
                Billow::<GradientSource>::new(seed)
                    .set_octaves(octaves)
                    .set_frequency(config.frequency)
                    .set_lacunarity(config.beta)
                    .set_persistence(persistence),
            ),
            PerlinKind::RidgedMulti => Self::Ridged(
                RidgedMulti::<GradientSource>::new(seed)
                    .set_octaves(octaves)
                    .set_frequency(config.frequency)
                    .set_lacunarity(config.beta)
                    .set_persistence(persistence)
                    .set_attenuation(config.gain),
            ),
        }
    }

    fn get<const D: usize>(&self, point: [f64; D]) -> f64
    where
        Fbm<GradientSource>: NoiseFn<f64, D>,
        Billow<GradientSource>: NoiseFn<f64, D>,
        RidgedMulti<GradientSource>: NoiseFn<f64, D>,
    {
        match self {
            Self::Fbm(source) => source.get(point),
            Self::Billow(source) => source.get(point),
            Self::Ridged(source) => source.get(point),
        }
    }
}

/// Seeded fractal noise source.
///
/// Two sources built with equal seeds and configs answer every query
/// identically.
pub struct Perlin {
    config: PerlinConfig,
    seed: u64,
    fractal: Fractal,
}

impl Perlin {
    /// Builds a noise source from a config and seed.
    #[must_use]
    pub fn new(config: PerlinConfig, seed: u64) -> Self {
        let fractal = Fractal::new(&config, fold_seed(seed));
        Self {
            config,
            seed,
            fractal,
        }
    }

    /// Config this source was built from.
    #[must_use]
    pub fn config(&self) -> &PerlinConfig {
        &self.config
    }

    /// Seed this source was built from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Samples one-dimensional noise along the x axis of the plane.
    #[must_use]
    pub fn get1(&self, x: f64) -> f64 {
        self.scaled(|fractal| fractal.get([x, 0.0]))
    }

    /// Samples two-dimensional noise.
    #[must_use]
    pub fn get2(&self, x: f64, y: f64) -> f64 {
        self.scaled(|fractal| fractal.get([x, y]))
    }

    /// Samples three-dimensional noise.
    #[must_use]
    pub fn get3(&self, x: f64, y: f64, z: f64) -> f64 {
        self.scaled(|fractal| fractal.get([x, y, z]))
    }

    /// Samples noise that repeats every `width` units in x.
    ///
    /// The x axis is bent into a circle of circumference `width` (scaled by
    /// `x_influence`) and read from the three-dimensional field. A zero
    /// width samples the plane directly.
    #[must_use]
    pub fn get_wrapped(&self, x: f64, y: f64, width: u32, x_influence: f64) -> f64 {
        if width == 0 {
            return self.get2(x * x_influence, y);
        }
        let (cx, cz) = wrap_to_circle(x, f64::from(width));
        self.get3(cx * x_influence, y, cz * x_influence)
    }

    fn scaled(&self, sample: impl FnOnce(&Fractal) -> f64) -> f64 {
        if self.config.amplitude == 0.0 {
            return self.config.bias;
        }
        sample(&self.fractal) * self.config.amplitude + self.config.bias
    }
}

impl fmt::Debug for Perlin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Perlin")
            .field("config", &self.config)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

fn fold_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: PerlinKind) -> PerlinConfig {
        PerlinConfig {
            kind,
            octaves: 4,
            frequency: 0.05,
            ..PerlinConfig::default()
        }
    }

    #[test]
    fn equal_seeds_give_equal_samples() {
        let first = Perlin::new(config(PerlinKind::Perlin), 7);
        let second = Perlin::new(config(PerlinKind::Perlin), 7);
        for i in 0..200 {
            let x = f64::from(i) * 0.37;
            assert_eq!(first.get2(x, x * 0.5).to_bits(), second.get2(x, x * 0.5).to_bits());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let first = Perlin::new(config(PerlinKind::Perlin), 1);
        let second = Perlin::new(config(PerlinKind::Perlin), 2);
        let differs = (0..50).any(|i| {
            let x = f64::from(i) * 1.3;
            first.get2(x, 3.1) != second.get2(x, 3.1)
        });
        assert!(differs, "distinct seeds should produce distinct fields");
    }

    #[test]
    fn zero_amplitude_yields_bias() {
        let source = Perlin::new(
            PerlinConfig {
                amplitude: 0.0,
                bias: 1.0,
                ..PerlinConfig::default()
            },
            3,
        );
        assert_eq!(source.get3(12.0, -4.0, 9.5), 1.0);
    }

    #[test]
    fn every_kind_stays_bounded() {
        for kind in [PerlinKind::Perlin, PerlinKind::Billow, PerlinKind::RidgedMulti] {
            let source = Perlin::new(config(kind), 11);
            for i in 0..500 {
                let x = f64::from(i) * 0.71;
                let value = source.get3(x, -x, x * 0.25);
                assert!(value.is_finite());
                assert!(value.abs() < 8.0, "{kind:?} produced {value}");
            }
        }
    }

    #[test]
    fn config_parses_camel_case_json() {
        let parsed: PerlinConfig = serde_json::from_str(
            r#"{"type":"ridgedMulti","octaves":3,"frequency":0.2,"amplitude":4.0}"#,
        )
        .expect("config parses");
        assert_eq!(parsed.kind, PerlinKind::RidgedMulti);
        assert_eq!(parsed.octaves, 3);
        assert_eq!(parsed.beta, 2.0);
    }

    #[test]
    fn wrapped_samples_repeat_every_world_width() {
        let source = Perlin::new(config(PerlinKind::Billow), 5);
        for i in 0..40 {
            let x = f64::from(i) * 3.5;
            let here = source.get_wrapped(x, 12.0, 300, 1.0);
            let around = source.get_wrapped(x + 300.0, 12.0, 300, 1.0);
            assert!((here - around).abs() < 1e-6, "{here} vs {around}");
        }
        assert_eq!(
            source.get_wrapped(7.0, 2.0, 0, 1.0).to_bits(),
            source.get2(7.0, 2.0).to_bits()
        );
    }

    #[test]
    fn octave_counts_past_the_limit_are_clamped() {
        let source = Perlin::new(
            PerlinConfig {
                octaves: 500,
                ..config(PerlinKind::RidgedMulti)
            },
            9,
        );
        assert!(source.get2(1.5, -2.5).is_finite());
    }
}
