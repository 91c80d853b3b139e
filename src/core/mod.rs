//! Core data structures for the terrain engine
//! Contains chunk coordinates, chunk records and vertex layout.

pub mod chunk;
pub mod coord;
pub mod vertex;

// Re-export commonly used types
pub use chunk::{ChunkRecord, ChunkState, PendingLod};
pub use coord::ChunkCoord;
pub use vertex::TerrainVertex;
