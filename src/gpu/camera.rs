//! Orbit camera for the Z-up scene.

use glam::{Mat4, Vec3};

use crate::projection::DepthMode;

/// Vertical field of view.
pub const FOV_Y: f32 = std::f32::consts::FRAC_PI_4;
pub const NEAR: f32 = 0.05;
pub const FAR: f32 = 200.0;

/// Orbit camera circling `target` around the Z axis.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    /// Rotation about Z in radians.
    pub yaw: f32,
    /// Elevation above the ground plane in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 0.35,
            distance: 6.0,
            target: Vec3::new(0.0, 0.0, 1.5),
        }
    }

    /// World position of the eye.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.cos();
        let y = self.distance * self.pitch.cos() * self.yaw.sin();
        let z = self.distance * self.pitch.sin();
        self.target + Vec3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Z)
    }

    pub fn projection(&self, aspect: f32, mode: DepthMode) -> Mat4 {
        mode.projection(FOV_Y, aspect, NEAR, FAR)
    }

    pub fn view_proj(&self, aspect: f32, mode: DepthMode) -> Mat4 {
        self.projection(aspect, mode) * self.view_matrix()
    }

    /// Drag in pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * 0.005;
        self.pitch = (self.pitch + dy * 0.005).clamp(-1.5, 1.5);
    }

    /// Wheel steps; positive zooms in.
    pub fn zoom(&mut self, scroll: f32) {
        self.distance = (self.distance - scroll * 0.3).clamp(0.5, 150.0);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
