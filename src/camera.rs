use glam::{Mat4, Vec3};

use crate::app::interfaces::{CameraFrustumSource, TerrainHeightSource, ViewpointProvider};

/// Free-flying camera used by the headless driver and tests.
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl FlyCamera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        FlyCamera {
            position,
            yaw,
            pitch,
            fov_y: 70f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.5,
            far: 2000.0,
        }
    }

    /// Horizontal heading.
    pub fn heading(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin()).normalize()
    }

    pub fn look_direction(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.look_direction(), Vec3::Y)
    }

    /// Fly along the heading for `dt` seconds.
    pub fn advance(&mut self, dt: f32, speed: f32) {
        self.position += self.heading() * speed * dt;
    }

    pub fn turn(&mut self, yaw_delta: f32) {
        self.yaw = (self.yaw + yaw_delta).rem_euclid(std::f32::consts::TAU);
    }

    /// Keep at least `clearance` above the ground and the water surface.
    pub fn follow_terrain<T: TerrainHeightSource + ?Sized>(&mut self, terrain: &T, clearance: f32) {
        let ground = terrain
            .height(self.position.x as f64, self.position.z as f64)
            .max(terrain.water_level()) as f32;
        let target = ground + clearance;
        // Ease toward the target instead of snapping over ridges
        self.position.y += (target - self.position.y) * 0.2;
        self.position.y = self.position.y.max(ground + 1.0);
    }
}

impl ViewpointProvider for FlyCamera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn forward(&self) -> Vec3 {
        self.look_direction()
    }
}

impl CameraFrustumSource for FlyCamera {
    fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    fn camera_world(&self) -> Mat4 {
        self.view_matrix().inverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::frustum::{BoundingSphere, Frustum};

    #[test]
    fn test_frustum_faces_look_direction() {
        let camera = FlyCamera::new(Vec3::new(0.0, 50.0, 0.0), 0.0, 0.0);
        let frustum = Frustum::from_matrices(camera.projection(), camera.camera_world());
        // Yaw 0 looks down +X
        assert!(frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(100.0, 50.0, 0.0), 1.0)));
        assert!(!frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(-100.0, 50.0, 0.0), 1.0)));
    }

    #[test]
    fn test_advance_moves_along_heading() {
        let mut camera = FlyCamera::new(Vec3::ZERO, std::f32::consts::FRAC_PI_2, -0.5);
        camera.advance(2.0, 10.0);
        assert!(camera.position.x.abs() < 1e-4);
        assert!((camera.position.z - 20.0).abs() < 1e-4);
        assert_eq!(camera.position.y, 0.0);
    }
}
