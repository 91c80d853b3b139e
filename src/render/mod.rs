//! Rendering-side resource management
//! Contains geometry pooling, LOD selection, frustum math and visibility culling.

pub mod culling;
pub mod frustum;
pub mod lod;
pub mod pool;

// Re-export commonly used types
pub use culling::{SphereCache, VisibilityCuller};
pub use frustum::{BoundingSphere, Frustum, extract_frustum_planes};
pub use lod::{LodSelector, LodTable, LodTier};
pub use pool::{GeometryBuffer, GeometryPool, PoolStats};
