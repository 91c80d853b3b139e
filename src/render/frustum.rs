use glam::{Mat4, Vec3, Vec4};

/// Minimal enclosing sphere (AABB-centered) of a chunk's geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        BoundingSphere { center, radius }
    }

    /// Sphere around the AABB center that contains every point.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3> + Clone,
    {
        let mut iter = points.clone().into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        let center = (min + max) * 0.5;
        let radius = points
            .into_iter()
            .map(|p| p.distance_squared(center))
            .fold(0.0f32, f32::max)
            .sqrt();
        Some(BoundingSphere { center, radius })
    }

    pub fn translated(self, offset: Vec3) -> Self {
        BoundingSphere {
            center: self.center + offset,
            radius: self.radius,
        }
    }
}

/// Six normalized clip planes (xyz = inward normal, w = distance).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    pub fn from_view_projection(view_proj: &Mat4) -> Self {
        Frustum {
            planes: extract_frustum_planes(view_proj),
        }
    }

    /// `camera_world` is the camera's world transform; the view matrix is its inverse.
    pub fn from_matrices(projection: Mat4, camera_world: Mat4) -> Self {
        Self::from_view_projection(&(projection * camera_world.inverse()))
    }

    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(sphere.center) + plane.w >= -sphere.radius)
    }
}

pub fn extract_frustum_planes(view_proj: &Mat4) -> [Vec4; 6] {
    let m = view_proj;
    let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
    let mut planes = [
        // Left
        r3 + r0,
        // Right
        r3 - r0,
        // Bottom
        r3 + r1,
        // Top
        r3 - r1,
        // Near (WGPU depth is [0, 1])
        r2,
        // Far
        r3 - r2,
    ];

    // Normalize planes so that distances are in world units
    for plane in &mut planes {
        let length = plane.truncate().length();
        if length > f32::EPSILON {
            *plane /= length;
        }
    }

    planes
}
