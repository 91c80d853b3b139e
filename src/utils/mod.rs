//! Configuration
pub mod settings;

pub use settings::{CullingSettings, DeviceClass, StreamingSettings, TerrainSettings};
