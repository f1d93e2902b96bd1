//! Fixed celebration camera with a slow victory orbit.
//!
//! The eye sits in front of and slightly above the cake, looking at the
//! origin. Once the candle is out the rig drifts around the scene.

use glam::{Mat4, Vec3};

use crate::params::RenderConfig;

/// Orbit increment per tick while the victory orbit is active
const ORBIT_RATE: f32 = 0.002;

pub struct CameraRig {
    orbit_angle: f32,
}

impl CameraRig {
    pub fn new() -> Self {
        Self { orbit_angle: 0.0 }
    }

    /// Advance one tick; the orbit only turns while `orbiting` is set.
    pub fn advance(&mut self, orbiting: bool) {
        if orbiting {
            self.orbit_angle += ORBIT_RATE;
        }
    }

    /// Current eye position and look-at target.
    pub fn eye_and_target(&self, config: &RenderConfig) -> (Vec3, Vec3) {
        let eye = Mat4::from_rotation_y(self.orbit_angle).transform_point3(config.camera_eye);
        (eye, Vec3::ZERO)
    }

    /// View-projection matrix plus the world-space billboard axes for
    /// camera-facing sprites.
    pub fn view_proj(&self, config: &RenderConfig) -> (Mat4, Vec3, Vec3) {
        let (eye, target) = self.eye_and_target(config);

        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let proj = Mat4::perspective_rh(
            config.fov_degrees.to_radians(),
            config.aspect_ratio(),
            config.near_plane,
            config.far_plane,
        );

        let forward = (target - eye).normalize();
        let right = forward.cross(Vec3::Y).normalize();

        (proj * view, right, right.cross(forward))
    }
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new()
    }
}
