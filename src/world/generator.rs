//! Thread-safe chunk synthesis.
//!
//! A `TerrainGenerator` is immutable once built and is shared between the
//! main thread and synthesis workers behind an `Arc`. It owns the height
//! field, the biome shader and the slope estimator for one seed.

use crate::app::interfaces::TerrainHeightSource;
use crate::core::{ChunkCoord, TerrainVertex};
use crate::error::SynthesisError;
use crate::render::pool::GeometryBuffer;
use crate::utils::settings::TerrainSettings;
use crate::world::biome::{Biome, BiomeShader, Rgb};
use crate::world::slope::{SlopeEstimator, gradient_magnitude};
use crate::world::terrain::{Climate, HeightField};

pub struct TerrainGenerator {
    pub seed: u32,
    heights: HeightField,
    shader: BiomeShader,
    slope: SlopeEstimator,
    chunk_size: f64,
    view_distance: u32,
}

impl TerrainGenerator {
    /// Build a generator for `seed`. Settings are expected to be validated.
    pub fn new(seed: u32, settings: &TerrainSettings) -> Self {
        let terrain = settings.terrain.clone();
        let water_level = terrain.water_level;
        let slope = SlopeEstimator::new(terrain.slope_sample_offset);
        TerrainGenerator {
            seed,
            heights: HeightField::new(seed, terrain),
            shader: BiomeShader::new(seed, water_level, settings.palette.clone()),
            slope,
            chunk_size: settings.streaming.chunk_size,
            view_distance: settings.streaming.view_distance,
        }
    }

    pub fn height_field(&self) -> &HeightField {
        &self.heights
    }

    pub fn shader(&self) -> &BiomeShader {
        &self.shader
    }

    pub fn height(&self, x: f64, z: f64) -> f64 {
        self.heights.height(x, z)
    }

    pub fn slope(&self, x: f64, z: f64) -> f64 {
        self.slope.slope(|sx, sz| self.heights.height(sx, sz), x, z)
    }

    pub fn climate(&self, x: f64, z: f64) -> Climate {
        self.heights.climate(x, z)
    }

    /// Surface color at a point; slope is estimated from the height field.
    pub fn color(&self, height: f64, x: f64, z: f64) -> Rgb {
        self.color_with_slope(height, x, z, self.slope(x, z))
    }

    pub fn color_with_slope(&self, height: f64, x: f64, z: f64, slope: f64) -> Rgb {
        self.shader.shade(height, self.climate(x, z), slope, x, z)
    }

    pub fn biome(&self, x: f64, z: f64) -> Biome {
        self.shader.classify(self.height(x, z), self.climate(x, z))
    }

    /// Fill `buffer` with the surface of chunk `coord` at the buffer's resolution.
    ///
    /// Heights are sampled on a grid one cell wider than the chunk on every
    /// side so edge normals and slopes see their neighbours. World sample
    /// positions come from integer lattice indices, so two chunks sharing an
    /// edge at the same resolution produce bit-identical edge heights.
    pub fn generate_chunk(
        &self,
        coord: ChunkCoord,
        buffer: &mut GeometryBuffer,
    ) -> Result<(), SynthesisError> {
        let resolution = buffer.resolution();
        if resolution < 2 {
            return Err(SynthesisError::InvalidResolution { resolution });
        }

        let res = resolution as usize;
        let segments = (resolution - 1) as i64;
        let step = self.chunk_size / segments as f64;
        let lattice_x = coord.cx as i64 * segments;
        let lattice_z = coord.cz as i64 * segments;
        let world = |lattice: i64| lattice as f64 * self.chunk_size / segments as f64;

        // Bordered height grid, (res + 2)^2, index (i + 1, j + 1) for vertex (i, j)
        let stride = res + 2;
        let mut grid = vec![0.0f64; stride * stride];
        for gj in 0..stride {
            let z = world(lattice_z + gj as i64 - 1);
            for gi in 0..stride {
                let x = world(lattice_x + gi as i64 - 1);
                grid[gj * stride + gi] = self.heights.height(x, z);
            }
        }
        let h = |i: usize, j: usize| grid[j * stride + i];

        let vertices = buffer.vertices_mut();
        for j in 0..res {
            let z = world(lattice_z + j as i64);
            for i in 0..res {
                let x = world(lattice_x + i as i64);
                let (gi, gj) = (i + 1, j + 1);
                let height = h(gi, gj);

                let dx = (h(gi + 1, gj) - h(gi - 1, gj)) / (2.0 * step);
                let dz = (h(gi, gj + 1) - h(gi, gj - 1)) / (2.0 * step);
                let slope = gradient_magnitude(dx, dz);
                let normal = glam::DVec3::new(-dx, 1.0, -dz).normalize_or(glam::DVec3::Y);

                let vertex = TerrainVertex {
                    position: [(i as f64 * step) as f32, height as f32, (j as f64 * step) as f32],
                    normal: normal.as_vec3().to_array(),
                    color: self.color_with_slope(height, x, z, slope),
                };
                if !vertex.is_finite() {
                    return Err(SynthesisError::NonFiniteGeometry { coord });
                }
                vertices[j * res + i] = vertex;
            }
        }

        Ok(())
    }
}

impl TerrainHeightSource for TerrainGenerator {
    fn height(&self, x: f64, z: f64) -> f64 {
        TerrainGenerator::height(self, x, z)
    }

    fn slope(&self, x: f64, z: f64) -> f64 {
        TerrainGenerator::slope(self, x, z)
    }

    fn water_level(&self) -> f64 {
        self.heights.water_level()
    }

    fn chunk_size(&self) -> f64 {
        self.chunk_size
    }

    fn view_distance(&self) -> u32 {
        self.view_distance
    }
}
