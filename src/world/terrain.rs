//! Height field: continent mask, coastline shaping, mountains, climate,
//! plateaus and detail composed into a single height per `(x, z)`.
//!
//! Evaluation is split in two pure steps. `sample_layers` evaluates every
//! noise channel at a point, `compose` turns those samples into a height.
//! Both are deterministic for a fixed seed, which is what keeps chunk seams
//! bit-identical: neighbouring chunks call the same function at the same
//! coordinates.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::constants::{FALLBACK_HEIGHT, SLOPE_SAMPLE_OFFSET, WATER_LEVEL};
use crate::error::ConfigError;
use crate::world::noise::{FractalParams, NoiseField};

/// Tunable constants of the height field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    pub water_level: f64,
    pub fallback_height: f64,
    pub slope_sample_offset: f64,

    // Continent mask
    pub continent: FractalParams,
    pub continent_contrast: f64,
    pub continent_bias: f64,
    pub continent_mask_max: f64,

    // Ocean
    pub ocean_threshold: f64,
    pub ocean_base_depth: f64,
    pub ocean_slope_factor: f64,

    // Beach band
    pub beach_threshold: f64,
    pub beach_height: f64,
    pub beach_dune_amplitude: f64,
    pub inland_ramp: f64,

    // Base terrain
    pub base: FractalParams,
    pub base_height: f64,

    // Coastal cliffs
    pub cliff: FractalParams,
    pub cliff_band: f64,
    pub cliff_threshold: f64,
    pub cliff_height: f64,

    // Mountains
    pub mountain: FractalParams,
    pub mountain_threshold: f64,
    pub mountain_height: f64,

    // Climate
    pub temperature: FractalParams,
    pub moisture: FractalParams,
    pub dune: FractalParams,
    pub dune_height: f64,
    pub wetland_depression: f64,

    // Plateaus
    pub plateau: FractalParams,
    pub plateau_threshold: f64,
    pub plateau_step: f64,
    pub plateau_min_height: f64,

    // Fine detail
    pub detail: FractalParams,
    pub detail_amplitude: f64,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            water_level: WATER_LEVEL,
            fallback_height: FALLBACK_HEIGHT,
            slope_sample_offset: SLOPE_SAMPLE_OFFSET,

            continent: FractalParams::new(4, 8.0e-5),
            continent_contrast: 1.6,
            continent_bias: 0.05,
            continent_mask_max: 1.2,

            ocean_threshold: 0.25,
            ocean_base_depth: 6.0,
            ocean_slope_factor: 120.0,

            beach_threshold: 0.32,
            beach_height: 2.5,
            beach_dune_amplitude: 0.6,
            inland_ramp: 0.15,

            base: FractalParams::new(6, 0.004),
            base_height: 40.0,

            cliff: FractalParams::new(2, 0.01),
            cliff_band: 0.12,
            cliff_threshold: 0.35,
            cliff_height: 18.0,

            mountain: FractalParams::new(6, 0.0025),
            mountain_threshold: 0.5,
            mountain_height: 120.0,

            temperature: FractalParams::new(3, 3.0e-4),
            moisture: FractalParams::new(3, 4.0e-4),
            dune: FractalParams::new(2, 0.02),
            dune_height: 4.0,
            wetland_depression: 2.0,

            plateau: FractalParams::new(2, 0.0015),
            plateau_threshold: 0.55,
            plateau_step: 12.0,
            plateau_min_height: 10.0,

            detail: FractalParams::new(4, 0.05),
            detail_amplitude: 1.5,
        }
    }
}

impl TerrainParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("terrain.water_level", self.water_level),
            ("terrain.fallback_height", self.fallback_height),
            ("terrain.base_height", self.base_height),
            ("terrain.mountain_height", self.mountain_height),
            ("terrain.cliff_height", self.cliff_height),
            ("terrain.dune_height", self.dune_height),
            ("terrain.beach_height", self.beach_height),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::invalid(name, format!("{} is not finite", value)));
            }
        }

        if !(self.slope_sample_offset > 0.0 && self.slope_sample_offset.is_finite()) {
            return Err(ConfigError::invalid(
                "terrain.slope_sample_offset",
                "must be a positive distance",
            ));
        }
        if !(0.0 < self.ocean_threshold && self.ocean_threshold < self.beach_threshold) {
            return Err(ConfigError::invalid(
                "terrain.beach_threshold",
                format!(
                    "ocean threshold {} must be positive and below beach threshold {}",
                    self.ocean_threshold, self.beach_threshold
                ),
            ));
        }
        if self.mountain_threshold <= self.beach_threshold || self.mountain_threshold >= 1.0 {
            return Err(ConfigError::invalid(
                "terrain.mountain_threshold",
                "must lie between the beach threshold and 1.0",
            ));
        }
        if self.continent_mask_max <= self.mountain_threshold {
            return Err(ConfigError::invalid(
                "terrain.continent_mask_max",
                "must exceed the mountain threshold",
            ));
        }
        if self.ocean_base_depth <= self.detail_amplitude.abs() {
            return Err(ConfigError::invalid(
                "terrain.ocean_base_depth",
                "must exceed the detail amplitude so the sea floor stays below water",
            ));
        }
        for (name, value) in [
            ("terrain.inland_ramp", self.inland_ramp),
            ("terrain.cliff_band", self.cliff_band),
            ("terrain.plateau_step", self.plateau_step),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::invalid(name, format!("{} must be positive", value)));
            }
        }
        for (name, value) in [
            ("terrain.cliff_threshold", self.cliff_threshold),
            ("terrain.plateau_threshold", self.plateau_threshold),
        ] {
            if !(-1.0..1.0).contains(&value) {
                return Err(ConfigError::invalid(name, "must lie in [-1, 1)"));
            }
        }
        for (name, fractal) in [
            ("terrain.continent", &self.continent),
            ("terrain.base", &self.base),
            ("terrain.cliff", &self.cliff),
            ("terrain.mountain", &self.mountain),
            ("terrain.temperature", &self.temperature),
            ("terrain.moisture", &self.moisture),
            ("terrain.dune", &self.dune),
            ("terrain.plateau", &self.plateau),
            ("terrain.detail", &self.detail),
        ] {
            if !(fractal.frequency > 0.0 && fractal.frequency.is_finite()) {
                return Err(ConfigError::invalid(name, "frequency must be positive"));
            }
            if fractal.octaves > 12 {
                return Err(ConfigError::invalid(name, "more than 12 octaves"));
            }
        }
        Ok(())
    }
}

/// Every noise channel the height field reads at one point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TerrainSamples {
    /// Continent mask in `[0, continent_mask_max]`.
    pub continent: f64,
    /// Base terrain fbm in `[-1, 1]`.
    pub base: f64,
    /// Ridged mountain noise in `[0, 1]`.
    pub ridge: f64,
    pub cliff: f64,
    pub temperature: f64,
    pub moisture: f64,
    pub dune: f64,
    pub plateau: f64,
    pub detail: f64,
}

impl TerrainSamples {
    /// All channels neutral except the continent mask.
    pub fn neutral(continent: f64) -> Self {
        TerrainSamples {
            continent,
            ..Default::default()
        }
    }
}

/// Temperature and moisture at a point, both in `[-1, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Climate {
    pub temperature: f64,
    pub moisture: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SampleFault {
    NonFiniteInput,
    NonFiniteHeight,
}

static FAULT_LOGGED: [AtomicBool; 2] = [AtomicBool::new(false), AtomicBool::new(false)];

impl SampleFault {
    fn log_once(self, x: f64, z: f64) {
        if !FAULT_LOGGED[self as usize].swap(true, Ordering::Relaxed) {
            tracing::warn!(
                fault = ?self,
                x,
                z,
                "height sample fault, substituting fallback height (logged once)"
            );
        }
    }
}

pub(crate) fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Pure, seeded height function.
pub struct HeightField {
    params: TerrainParams,
    seed: u32,
    noise_continent: NoiseField,
    noise_base: NoiseField,
    noise_ridge: NoiseField,
    noise_cliff: NoiseField,
    noise_temperature: NoiseField,
    noise_moisture: NoiseField,
    noise_dune: NoiseField,
    noise_plateau: NoiseField,
    noise_detail: NoiseField,
}

impl HeightField {
    pub fn new(seed: u32, params: TerrainParams) -> Self {
        HeightField {
            params,
            seed,
            noise_continent: NoiseField::new(seed),
            noise_base: NoiseField::new(seed.wrapping_add(1)),
            noise_ridge: NoiseField::new(seed.wrapping_add(2)),
            noise_cliff: NoiseField::new(seed.wrapping_add(3)),
            noise_temperature: NoiseField::new(seed.wrapping_add(4)),
            noise_moisture: NoiseField::new(seed.wrapping_add(5)),
            noise_dune: NoiseField::new(seed.wrapping_add(6)),
            noise_plateau: NoiseField::new(seed.wrapping_add(7)),
            noise_detail: NoiseField::new(seed.wrapping_add(8)),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    pub fn water_level(&self) -> f64 {
        self.params.water_level
    }

    /// Large-scale land/ocean mask in `[0, continent_mask_max]`.
    pub fn continent_mask(&self, x: f64, z: f64) -> f64 {
        let p = &self.params;
        let raw = self.noise_continent.fbm(x, z, &p.continent);
        let unit = raw * p.continent_contrast * 0.5 + 0.5 + p.continent_bias;
        (unit * p.continent_mask_max).clamp(0.0, p.continent_mask_max)
    }

    pub fn climate(&self, x: f64, z: f64) -> Climate {
        Climate {
            temperature: self.noise_temperature.fbm(x, z, &self.params.temperature),
            moisture: self.noise_moisture.fbm(x, z, &self.params.moisture),
        }
    }

    pub fn sample_layers(&self, x: f64, z: f64) -> TerrainSamples {
        let p = &self.params;
        let climate = self.climate(x, z);
        TerrainSamples {
            continent: self.continent_mask(x, z),
            base: self.noise_base.fbm(x, z, &p.base),
            ridge: self.noise_ridge.ridged(x, z, &p.mountain),
            cliff: self.noise_cliff.fbm(x, z, &p.cliff),
            temperature: climate.temperature,
            moisture: climate.moisture,
            dune: self.noise_dune.fbm(x, z, &p.dune),
            plateau: self.noise_plateau.fbm(x, z, &p.plateau),
            detail: self.noise_detail.fbm(x, z, &p.detail),
        }
    }

    /// Height from pre-sampled channels. Continuous in every channel.
    pub fn compose(&self, s: &TerrainSamples) -> f64 {
        let p = &self.params;
        let mask = s.continent;
        let detail = s.detail * p.detail_amplitude;

        // Ocean: deeper the further the mask is from the shore threshold
        if mask < p.ocean_threshold {
            return p.water_level
                - p.ocean_base_depth
                - p.ocean_slope_factor * (p.ocean_threshold - mask)
                + detail;
        }

        // Beach: quadratic rise from the sea floor edge to the shoreline
        if mask < p.beach_threshold {
            let t = (mask - p.ocean_threshold) / (p.beach_threshold - p.ocean_threshold);
            let rise = (p.ocean_base_depth + p.beach_height) * t * t;
            return p.water_level - p.ocean_base_depth
                + rise
                + s.dune * p.beach_dune_amplitude * t
                + detail;
        }

        let land = smoothstep(p.beach_threshold, p.beach_threshold + p.inland_ramp, mask);
        let mut height = p.water_level
            + p.beach_height
            + s.dune * p.beach_dune_amplitude * (1.0 - land);

        // Base terrain fades in over the inland ramp
        height += (s.base * 0.5 + 0.5) * p.base_height * land;

        // Coastal cliffs: only some stretches of the coastal band
        let band = (mask - p.beach_threshold) / p.cliff_band;
        if (0.0..1.0).contains(&band) && s.cliff > p.cliff_threshold {
            let strength = (s.cliff - p.cliff_threshold) / (1.0 - p.cliff_threshold);
            height += p.cliff_height * strength * (PI * band).sin();
        }

        // Mountains, well inland only
        if mask > p.mountain_threshold {
            let inland = (mask - p.mountain_threshold) / (1.0 - p.mountain_threshold);
            height += s.ridge * p.mountain_height * inland;
        }

        // Climate: dunes where hot and dry, shallow depressions where wet
        let heat = smoothstep(0.2, 0.6, s.temperature);
        let dryness = smoothstep(0.1, 0.5, -s.moisture);
        let wetness = smoothstep(0.2, 0.6, s.moisture);
        height += (s.dune * 0.5 + 0.5) * p.dune_height * heat * dryness * land;
        height -= p.wetland_depression * wetness * land;

        // Plateaus: smooth terracing toward multiples of the step size
        if s.plateau > p.plateau_threshold {
            let above = height - p.water_level;
            let strength = ((s.plateau - p.plateau_threshold) / (1.0 - p.plateau_threshold))
                .clamp(0.0, 1.0);
            let fade = smoothstep(p.plateau_min_height, p.plateau_min_height + p.plateau_step, above);
            let blend = strength * fade * land;
            if blend > 0.0 {
                let k = above / p.plateau_step;
                let f = k - k.floor();
                let terraced = (k.floor() + f * f * f * (f * (f * 6.0 - 15.0) + 10.0)) * p.plateau_step;
                height = lerp(height, p.water_level + terraced, blend);
            }
        }

        height + detail
    }

    /// Terrain height at a world position. Never returns a non-finite value.
    pub fn height(&self, x: f64, z: f64) -> f64 {
        if !x.is_finite() || !z.is_finite() {
            SampleFault::NonFiniteInput.log_once(x, z);
            return self.params.fallback_height;
        }

        let height = self.compose(&self.sample_layers(x, z));
        if height.is_finite() {
            height
        } else {
            SampleFault::NonFiniteHeight.log_once(x, z);
            self.params.fallback_height
        }
    }
}
