//! Coherent noise primitives built on FastNoiseLite.
//!
//! The underlying source runs at unit frequency; octave frequencies are
//! applied here so every layer of the height field can share one primitive.

use fastnoise_lite::{FastNoiseLite, NoiseType};
use serde::{Deserialize, Serialize};

/// Octave layout for fractal and ridged sums.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FractalParams {
    pub octaves: u32,
    pub frequency: f64,
    pub persistence: f64,
    pub lacunarity: f64,
}

impl FractalParams {
    pub const fn new(octaves: u32, frequency: f64) -> Self {
        FractalParams {
            octaves,
            frequency,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Seeded 2D noise in `[-1, 1]`.
pub struct NoiseField {
    noise: FastNoiseLite,
    seed: u32,
}

impl NoiseField {
    pub fn new(seed: u32) -> Self {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(1.0));
        NoiseField { noise, seed }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn sample(&self, x: f64, z: f64) -> f64 {
        (self.noise.get_noise_2d(x as f32, z as f32) as f64).clamp(-1.0, 1.0)
    }

    /// Fractal Brownian motion, normalized to `[-1, 1]`.
    pub fn fbm(&self, x: f64, z: f64, params: &FractalParams) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = params.frequency;
        let mut max_value = 0.0;

        for _ in 0..params.octaves {
            total += self.sample(x * frequency, z * frequency) * amplitude;
            max_value += amplitude;
            amplitude *= params.persistence;
            frequency *= params.lacunarity;
        }

        if max_value > 0.0 {
            (total / max_value).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }

    /// Ridged multifractal in `[0, 1]`: `(1 - |n|)²` per octave, each octave
    /// weighted by the previous one so ridgelines stay sharp.
    pub fn ridged(&self, x: f64, z: f64, params: &FractalParams) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = params.frequency;
        let mut max_value = 0.0;
        let mut weight = 1.0;

        for _ in 0..params.octaves {
            let n = self.sample(x * frequency, z * frequency);
            let mut signal = 1.0 - n.abs();
            signal *= signal;
            signal *= weight;
            weight = (signal * 2.0).clamp(0.0, 1.0);

            total += signal * amplitude;
            max_value += amplitude;
            amplitude *= params.persistence;
            frequency *= params.lacunarity;
        }

        if max_value > 0.0 {
            (total / max_value).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
