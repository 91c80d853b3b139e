// Core module with coordinates, chunk records and vertex layout
pub mod core;

// Render module with pooling, LOD and culling
pub mod render;

// World module with synthesis and streaming
pub mod world;

// Application layer: engine facade, governor and collaborator traits
pub mod app;

// Settings presets
pub mod utils;

// Other modules
pub mod camera;
pub mod constants;
pub mod error;
pub mod save;

// Re-exports
pub use app::{
    CameraFrustumSource, Diagnostics, RenderableChunk, TerrainEngine, TerrainHeightSource,
    ViewpointProvider,
};
pub use camera::FlyCamera;
pub use constants::*;
pub use crate::core::{ChunkCoord, ChunkRecord, ChunkState, TerrainVertex};
pub use error::{ConfigError, ManifestError, SynthesisError};
pub use render::{BoundingSphere, Frustum, GeometryBuffer, GeometryPool, LodSelector, LodTable, LodTier};
pub use save::{DEFAULT_MANIFEST_FILE, WorldManifest, load_manifest, save_manifest};
pub use utils::{DeviceClass, TerrainSettings};
pub use world::{Biome, HeightField, NoiseField, TerrainGenerator};
