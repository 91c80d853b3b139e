//! Terrain synthesis and chunk streaming
//! Contains the height field, coloring, chunk synthesis and the chunk store.

pub mod biome;
pub mod generator;
pub mod loader;
pub mod noise;
pub mod slope;
pub mod store;
pub mod terrain;

// Re-export commonly used types
pub use biome::{Biome, BiomePalette, BiomeShader, Rgb};
pub use generator::TerrainGenerator;
pub use loader::{ChunkLoader, InlineSynthesizer, SynthesisBackend, SynthesisJob, SynthesisResult};
pub use noise::{FractalParams, NoiseField};
pub use slope::SlopeEstimator;
pub use store::{ChunkStore, UpdateReport};
pub use terrain::{Climate, HeightField, TerrainParams, TerrainSamples};
