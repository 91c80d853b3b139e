//! Collaborator seams between the terrain engine and the host application.

use glam::{Mat4, Vec3};

/// Where the viewer is and which way it is heading. Supplied by the player or camera system.
pub trait ViewpointProvider {
    fn position(&self) -> Vec3;
    fn forward(&self) -> Vec3;
}

/// Camera matrices from the rendering collaborator.
pub trait CameraFrustumSource {
    fn projection(&self) -> Mat4;
    /// World transform of the camera; the view matrix is its inverse.
    fn camera_world(&self) -> Mat4;
}

/// Read-only terrain queries for placement, physics and overlay clients.
pub trait TerrainHeightSource {
    fn height(&self, x: f64, z: f64) -> f64;
    fn slope(&self, x: f64, z: f64) -> f64;
    fn water_level(&self) -> f64;
    fn chunk_size(&self) -> f64;
    fn view_distance(&self) -> u32;
}

impl<T: ViewpointProvider + ?Sized> ViewpointProvider for &T {
    fn position(&self) -> Vec3 {
        (**self).position()
    }

    fn forward(&self) -> Vec3 {
        (**self).forward()
    }
}

impl<T: CameraFrustumSource + ?Sized> CameraFrustumSource for &T {
    fn projection(&self) -> Mat4 {
        (**self).projection()
    }

    fn camera_world(&self) -> Mat4 {
        (**self).camera_world()
    }
}
