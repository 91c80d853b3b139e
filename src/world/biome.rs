//! Vertex coloring from height, climate and slope.

use serde::{Deserialize, Serialize};

use crate::world::noise::NoiseField;
use crate::world::terrain::{Climate, smoothstep};

pub type Rgb = [f32; 3];

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Biome {
    DeepWater,
    ShallowWater,
    Beach,
    Desert,
    #[default]
    Grassland,
    Forest,
    Swamp,
    Tundra,
    Mountain,
    Snow,
}

impl Biome {
    pub fn is_water(&self) -> bool {
        matches!(self, Biome::DeepWater | Biome::ShallowWater)
    }

    /// Representative flat color, for overlays and debug maps.
    pub fn overlay_color(&self) -> Rgb {
        match self {
            Biome::DeepWater => [0.06, 0.16, 0.38],
            Biome::ShallowWater => [0.25, 0.46, 0.82],
            Biome::Beach => [0.89, 0.83, 0.61],
            Biome::Desert => [0.86, 0.74, 0.48],
            Biome::Grassland => [0.45, 0.75, 0.30],
            Biome::Forest => [0.25, 0.55, 0.20],
            Biome::Swamp => [0.35, 0.50, 0.25],
            Biome::Tundra => [0.65, 0.75, 0.70],
            Biome::Mountain => [0.50, 0.48, 0.45],
            Biome::Snow => [0.95, 0.96, 0.98],
        }
    }
}

/// Two-stop gradient across one height band.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorRamp {
    pub low: Rgb,
    pub high: Rgb,
}

impl ColorRamp {
    pub const fn new(low: Rgb, high: Rgb) -> Self {
        ColorRamp { low, high }
    }

    pub fn at(&self, t: f64) -> Rgb {
        mix(self.low, self.high, t.clamp(0.0, 1.0) as f32)
    }
}

fn mix(a: Rgb, b: Rgb, t: f32) -> Rgb {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

fn scale(c: Rgb, k: f32) -> Rgb {
    [c[0] * k, c[1] * k, c[2] * k]
}

/// Band bounds (heights above water) and the ramp for each band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomePalette {
    pub deep_water_depth: f64,
    pub beach_top: f64,
    pub lowland_top: f64,
    pub hills_top: f64,
    pub snow_line: f64,
    /// Snow line moves up by this much at temperature 1, down at -1.
    pub snow_line_shift: f64,

    pub deep_water: ColorRamp,
    pub shallow_water: ColorRamp,
    pub beach: ColorRamp,
    pub lowland: ColorRamp,
    pub hills: ColorRamp,
    pub mountain: ColorRamp,
    pub snow: ColorRamp,

    pub rock: Rgb,
    pub dry_tint: Rgb,
    pub lush_tint: Rgb,
    pub climate_tint_strength: f32,

    pub rock_slope_start: f64,
    pub rock_slope_full: f64,
    pub steep_darkening: f32,

    pub texture_frequency: f64,
    pub texture_amplitude: f32,
}

impl Default for BiomePalette {
    fn default() -> Self {
        Self {
            deep_water_depth: 12.0,
            beach_top: 3.5,
            lowland_top: 30.0,
            hills_top: 70.0,
            snow_line: 115.0,
            snow_line_shift: 25.0,

            deep_water: ColorRamp::new([0.10, 0.22, 0.45], [0.04, 0.10, 0.28]),
            shallow_water: ColorRamp::new([0.30, 0.55, 0.70], [0.12, 0.30, 0.55]),
            beach: ColorRamp::new([0.76, 0.70, 0.50], [0.89, 0.83, 0.61]),
            lowland: ColorRamp::new([0.45, 0.75, 0.30], [0.35, 0.62, 0.24]),
            hills: ColorRamp::new([0.25, 0.55, 0.20], [0.30, 0.42, 0.22]),
            mountain: ColorRamp::new([0.45, 0.42, 0.38], [0.58, 0.56, 0.54]),
            snow: ColorRamp::new([0.88, 0.90, 0.93], [0.98, 0.98, 1.00]),

            rock: [0.42, 0.40, 0.38],
            dry_tint: [0.80, 0.72, 0.42],
            lush_tint: [0.20, 0.55, 0.18],
            climate_tint_strength: 0.45,

            rock_slope_start: 0.6,
            rock_slope_full: 1.4,
            steep_darkening: 0.25,

            texture_frequency: 0.15,
            texture_amplitude: 0.04,
        }
    }
}

impl BiomePalette {
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        use crate::error::ConfigError;

        let bands = [
            self.beach_top,
            self.lowland_top,
            self.hills_top,
            self.snow_line,
        ];
        if self.deep_water_depth <= 0.0 || bands[0] <= 0.0 || bands.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::invalid(
                "palette",
                "band bounds must be positive and strictly ascending",
            ));
        }
        // Cold snow must stay above the hills band or classify and shade disagree
        if self.snow_line_shift < 0.0 || self.snow_line - self.snow_line_shift <= self.hills_top {
            return Err(ConfigError::invalid(
                "palette.snow_line_shift",
                "snow_line - snow_line_shift must stay above hills_top",
            ));
        }
        if self.rock_slope_full <= self.rock_slope_start {
            return Err(ConfigError::invalid(
                "palette.rock_slope_full",
                "must exceed rock_slope_start",
            ));
        }
        Ok(())
    }
}

/// Deterministic terrain coloring.
pub struct BiomeShader {
    palette: BiomePalette,
    water_level: f64,
    texture: NoiseField,
}

impl BiomeShader {
    pub fn new(seed: u32, water_level: f64, palette: BiomePalette) -> Self {
        BiomeShader {
            palette,
            water_level,
            texture: NoiseField::new(seed.wrapping_add(101)),
        }
    }

    pub fn palette(&self) -> &BiomePalette {
        &self.palette
    }

    fn snow_line(&self, temperature: f64) -> f64 {
        self.palette.snow_line + temperature.clamp(-1.0, 1.0) * self.palette.snow_line_shift
    }

    pub fn classify(&self, height: f64, climate: Climate) -> Biome {
        let p = &self.palette;
        let rel = height - self.water_level;

        if rel < -p.deep_water_depth {
            return Biome::DeepWater;
        }
        if rel < 0.0 {
            return Biome::ShallowWater;
        }
        if rel < p.beach_top {
            return Biome::Beach;
        }
        if rel >= self.snow_line(climate.temperature) {
            return Biome::Snow;
        }
        if rel >= p.hills_top {
            return Biome::Mountain;
        }

        match (climate.temperature, climate.moisture) {
            (t, m) if t > 0.3 && m < -0.2 => Biome::Desert,
            (t, _) if t < -0.4 => Biome::Tundra,
            (_, m) if m > 0.45 && rel < p.lowland_top => Biome::Swamp,
            (_, m) if m > 0.1 || rel >= p.lowland_top => Biome::Forest,
            _ => Biome::Grassland,
        }
    }

    /// Color for a surface point. Every channel is in `[0, 1]`.
    pub fn shade(&self, height: f64, climate: Climate, slope: f64, x: f64, z: f64) -> Rgb {
        let p = &self.palette;
        let rel = height - self.water_level;
        let snow_line = self.snow_line(climate.temperature);

        let band = |ramp: &ColorRamp, lo: f64, hi: f64| ramp.at((rel - lo) / (hi - lo));

        let mut color = if rel < -p.deep_water_depth {
            p.deep_water.at((-rel - p.deep_water_depth) / p.deep_water_depth)
        } else if rel < 0.0 {
            p.shallow_water.at(-rel / p.deep_water_depth)
        } else if rel < p.beach_top {
            band(&p.beach, 0.0, p.beach_top)
        } else if rel < p.lowland_top {
            band(&p.lowland, p.beach_top, p.lowland_top)
        } else if rel < p.hills_top {
            band(&p.hills, p.lowland_top, p.hills_top)
        } else if rel < snow_line {
            band(&p.mountain, p.hills_top, snow_line.max(p.hills_top + 1.0))
        } else {
            band(&p.snow, snow_line, snow_line + p.snow_line_shift.max(1.0))
        };

        if rel >= 0.0 {
            // Climate tint fades out above the hills
            let vegetated = 1.0 - smoothstep(p.hills_top * 0.8, p.hills_top, rel);
            let dry = smoothstep(0.0, 0.6, climate.temperature) * smoothstep(0.0, 0.6, -climate.moisture);
            let lush = smoothstep(0.0, 0.6, climate.moisture);
            let k = p.climate_tint_strength * vegetated as f32;
            color = mix(color, p.dry_tint, k * dry as f32);
            color = mix(color, p.lush_tint, k * lush as f32 * 0.6);

            let rock = smoothstep(p.rock_slope_start, p.rock_slope_full, slope) as f32;
            color = mix(color, p.rock, rock);
            color = scale(color, 1.0 - p.steep_darkening * rock);
        }

        let grain = self.texture.sample(x * p.texture_frequency, z * p.texture_frequency) as f32
            * p.texture_amplitude;
        color.map(|c| {
            let c = c + grain;
            if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shader() -> BiomeShader {
        BiomeShader::new(2137, 0.0, BiomePalette::default())
    }

    fn temperate() -> Climate {
        Climate::default()
    }

    #[test]
    fn test_channels_clamped() {
        let s = shader();
        for i in 0..400 {
            let height = i as f64 - 150.0;
            for slope in [0.0, 0.5, 3.0, f64::INFINITY] {
                let climate = Climate {
                    temperature: (i as f64 * 0.37).sin(),
                    moisture: (i as f64 * 0.91).cos(),
                };
                let c = s.shade(height, climate, slope, i as f64 * 3.1, -(i as f64));
                assert!(c.iter().all(|v| (0.0..=1.0).contains(v)), "{:?}", c);
            }
        }
    }

    #[test]
    fn test_shading_is_deterministic() {
        let a = shader();
        let b = shader();
        let climate = Climate {
            temperature: 0.4,
            moisture: -0.3,
        };
        assert_eq!(
            a.shade(12.0, climate, 0.3, 55.5, -20.25),
            b.shade(12.0, climate, 0.3, 55.5, -20.25)
        );
    }

    #[test]
    fn test_classify_bands() {
        let s = shader();
        assert_eq!(s.classify(-50.0, temperate()), Biome::DeepWater);
        assert_eq!(s.classify(-2.0, temperate()), Biome::ShallowWater);
        assert_eq!(s.classify(1.0, temperate()), Biome::Beach);
        assert_eq!(s.classify(10.0, temperate()), Biome::Grassland);
        assert_eq!(s.classify(90.0, temperate()), Biome::Mountain);
        assert_eq!(s.classify(200.0, temperate()), Biome::Snow);
        assert!(s.classify(-2.0, temperate()).is_water());
    }

    #[test]
    fn test_snow_line_follows_temperature() {
        let s = shader();
        let warm = Climate {
            temperature: 1.0,
            moisture: 0.0,
        };
        let cold = Climate {
            temperature: -1.0,
            moisture: 0.0,
        };
        assert_eq!(s.classify(120.0, warm), Biome::Mountain);
        assert_eq!(s.classify(120.0, cold), Biome::Snow);
    }

    #[test]
    fn test_hot_dry_is_desert() {
        let s = shader();
        let climate = Climate {
            temperature: 0.8,
            moisture: -0.6,
        };
        assert_eq!(s.classify(15.0, climate), Biome::Desert);
    }

    #[test]
    fn test_steep_faces_go_to_rock() {
        let s = shader();
        let p = s.palette().clone();
        let flat = s.shade(15.0, temperate(), 0.0, 0.0, 0.0);
        let steep = s.shade(15.0, temperate(), 5.0, 0.0, 0.0);
        let distance = |a: Rgb, b: Rgb| (0..3).map(|i| (a[i] - b[i]).abs()).sum::<f32>();
        let rock_dark = scale(p.rock, 1.0 - p.steep_darkening);
        assert!(distance(steep, rock_dark) < distance(flat, rock_dark));
    }

    #[test]
    fn test_default_palette_is_valid() {
        assert!(BiomePalette::default().validate().is_ok());
    }

    #[test]
    fn test_snow_line_shift_below_hills_rejected() {
        let palette = BiomePalette {
            snow_line_shift: 60.0,
            ..BiomePalette::default()
        };
        assert!(palette.validate().is_err());

        let negative = BiomePalette {
            snow_line_shift: -5.0,
            ..BiomePalette::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_cold_snow_sits_above_hills() {
        let s = shader();
        let p = s.palette().clone();
        let frozen = Climate {
            temperature: -1.0,
            moisture: 0.0,
        };
        let lowest_snow = p.snow_line - p.snow_line_shift;
        assert_eq!(s.classify(lowest_snow + 0.5, frozen), Biome::Snow);
        assert_eq!(s.classify(p.hills_top - 0.5, frozen), Biome::Tundra);
        let c = s.shade(lowest_snow + 0.5, frozen, 0.0, 0.0, 0.0);
        assert!(c.iter().all(|v| *v > 0.8));
    }

    #[test]
    fn test_overlay_colors_in_range() {
        for biome in [
            Biome::DeepWater,
            Biome::ShallowWater,
            Biome::Beach,
            Biome::Desert,
            Biome::Grassland,
            Biome::Forest,
            Biome::Swamp,
            Biome::Tundra,
            Biome::Mountain,
            Biome::Snow,
        ] {
            assert!(biome.overlay_color().iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }
}
