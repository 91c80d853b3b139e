use glam::{Mat4, Vec3};

use crate::core::coord::ChunkCoord;
use crate::render::pool::GeometryBuffer;

/// LOD change that has been submitted for synthesis but not yet integrated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingLod {
    pub tier: usize,
    pub ticket: u64,
}

/// Lifecycle state of one coordinate as seen by the chunk store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    Absent,
    Pending { tier: usize },
    Resident { tier: usize },
}

/// A resident chunk. Owns its geometry buffer until evicted.
pub struct ChunkRecord {
    coord: ChunkCoord,
    tier: usize,
    geometry: GeometryBuffer,
    revision: u64,
    pub visible: bool,
    pub pending_lod: Option<PendingLod>,
}

impl ChunkRecord {
    pub fn new(coord: ChunkCoord, tier: usize, geometry: GeometryBuffer) -> Self {
        ChunkRecord {
            coord,
            tier,
            geometry,
            revision: 0,
            visible: true,
            pending_lod: None,
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn tier(&self) -> usize {
        self.tier
    }

    pub fn geometry(&self) -> &GeometryBuffer {
        &self.geometry
    }

    pub fn resolution(&self) -> u32 {
        self.geometry.resolution()
    }

    /// Bumped every time the bound geometry changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Swap in geometry for a new tier, returning the previous buffer.
    pub fn replace_geometry(&mut self, tier: usize, geometry: GeometryBuffer) -> GeometryBuffer {
        self.tier = tier;
        self.revision += 1;
        self.pending_lod = None;
        std::mem::replace(&mut self.geometry, geometry)
    }

    pub fn into_geometry(self) -> GeometryBuffer {
        self.geometry
    }

    pub fn transform(&self, chunk_size: f64) -> Mat4 {
        let origin = self.coord.origin(chunk_size);
        Mat4::from_translation(Vec3::new(origin.x as f32, 0.0, origin.y as f32))
    }
}
