use bytemuck::{Pod, Zeroable};

/// Terrain vertex as uploaded by the renderer. Position is chunk-local.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl TerrainVertex {
    pub fn is_finite(&self) -> bool {
        self.position
            .iter()
            .chain(self.normal.iter())
            .chain(self.color.iter())
            .all(|c| c.is_finite())
    }
}
