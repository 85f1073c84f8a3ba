// Orbit camera around the assembly
//
// Camera model:
//   - Always looks at a fixed target (the assembly origin)
//   - Yaw/pitch on a sphere of radius `distance` around the target
//   - Left-drag orbits, mouse wheel zooms, optional slow auto-rotation
//   - Pitch is clamped short of the poles so look_at never degenerates

use glam::{Mat4, Vec2, Vec3, Vec4};
use super::input::InputState;

pub struct OrbitCamera {
    pub target: Vec3,

    /// Distance from target. Private: always clamped in update(). Use distance() to read.
    distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    /// Elevation above the XZ plane in radians.
    pitch: f32,
    /// Rotation about +Y in radians; 0 puts the eye on +Z.
    yaw: f32,

    pub fov: f32,
    pub near: f32,
    pub far: f32,

    /// Radians of orbit per pixel of drag
    pub drag_sensitivity: f32,
    /// Distance change per scroll line
    pub zoom_speed: f32,

    pub auto_rotate: bool,
    /// Auto-rotation speed in radians per second
    pub auto_rotate_speed: f32,
}

const PITCH_LIMIT: f32 = 85.0 * std::f32::consts::PI / 180.0;

impl OrbitCamera {
    /// Looking at the origin from (5, 3, 5).
    pub fn new() -> Self {
        let mut camera = Self {
            target: Vec3::ZERO,
            distance: 1.0,
            min_distance: 3.0,
            max_distance: 12.0,
            pitch: 0.0,
            yaw: 0.0,
            fov: 45.0_f32.to_radians(),
            near: 0.1,
            far: 100.0,
            drag_sensitivity: 0.005,
            zoom_speed: 0.5,
            auto_rotate: true,
            auto_rotate_speed: 0.8,
        };
        camera.look_from(Vec3::new(5.0, 3.0, 5.0));
        camera
    }

    /// Place the eye at `eye`, keeping the current target.
    pub fn look_from(&mut self, eye: Vec3) {
        let offset = eye - self.target;
        self.distance = offset.length().clamp(self.min_distance, self.max_distance);
        self.pitch = (offset.y / offset.length().max(f32::EPSILON)).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = offset.x.atan2(offset.z);
    }

    /// Apply drag, zoom and auto-rotation. Call once per frame before rendering.
    pub fn update(&mut self, input: &InputState, dt: f32) {
        if let Some((dx, dy)) = input.drag_delta() {
            self.orbit(-dx * self.drag_sensitivity, dy * self.drag_sensitivity);
        } else if self.auto_rotate && dt.is_finite() && dt > 0.0 {
            self.orbit(self.auto_rotate_speed * dt, 0.0);
        }

        // Scroll up (positive delta) zooms in
        self.zoom(-input.scroll_delta * self.zoom_speed);
    }

    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        self.yaw = (self.yaw + yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch + pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn zoom(&mut self, amount: f32) {
        self.distance = (self.distance + amount).clamp(self.min_distance, self.max_distance);
    }

    /// World-space position of the camera eye.
    pub fn camera_position(&self) -> Vec3 {
        self.target
            + Vec3::new(
                self.yaw.sin() * self.pitch.cos(),
                self.pitch.sin(),
                self.yaw.cos() * self.pitch.cos(),
            ) * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.camera_position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    pub fn distance(&self) -> f32 { self.distance }

    /// World-space ray through a window pixel, as (origin, unit direction).
    pub fn screen_ray(&self, pixel: Vec2, viewport: Vec2) -> (Vec3, Vec3) {
        let ndc = Vec2::new(
            pixel.x / viewport.x * 2.0 - 1.0,
            1.0 - pixel.y / viewport.y * 2.0,
        );
        let inv = self.view_projection(viewport.x / viewport.y).inverse();
        let near = inv * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far = inv * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;
        (near, (far - near).normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn starts_at_the_default_eye() {
        let camera = OrbitCamera::new();
        let eye = camera.camera_position();
        assert_relative_eq!(eye.x, 5.0, epsilon = 1e-4);
        assert_relative_eq!(eye.y, 3.0, epsilon = 1e-4);
        assert_relative_eq!(eye.z, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = OrbitCamera::new();
        camera.zoom(-100.0);
        assert_eq!(camera.distance(), 3.0);
        camera.zoom(100.0);
        assert_eq!(camera.distance(), 12.0);
    }

    #[test]
    fn auto_rotation_turns_the_eye() {
        let mut camera = OrbitCamera::new();
        let before = camera.camera_position();
        camera.update(&InputState::new(), 0.5);
        let after = camera.camera_position();
        assert_relative_eq!(before.y, after.y, epsilon = 1e-5);
        assert_relative_eq!(before.length(), after.length(), epsilon = 1e-4);
        assert!((before - after).length() > 0.1);

        camera.auto_rotate = false;
        let still = camera.camera_position();
        camera.update(&InputState::new(), 0.5);
        assert_eq!(camera.camera_position(), still);
    }

    #[test]
    fn center_ray_hits_the_target() {
        let camera = OrbitCamera::new();
        let viewport = Vec2::new(800.0, 600.0);
        let (origin, dir) = camera.screen_ray(viewport * 0.5, viewport);
        let to_target = (camera.target - origin).normalize();
        assert_relative_eq!(dir.dot(to_target), 1.0, epsilon = 1e-4);
    }
}
