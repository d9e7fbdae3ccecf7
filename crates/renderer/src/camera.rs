//! Free-fly camera driven by held keys, pointer deltas and the scroll wheel.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

/// Pointer-delta divisor at 60° field of view.
const LOOK_DIVISOR: f32 = 500.0;
/// Scroll wheel step, in the same units as `move_speed`.
const SCROLL_STEP: f32 = 100.0;
const MIN_FOV: f32 = 10.0;
const MAX_FOV: f32 = 80.0;
const MIN_MOVE_SPEED: f32 = 100.0;

/// One frame's worth of input, already accumulated by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub ascend: bool,
    pub descend: bool,
    /// Precision modifier: scroll zooms instead of changing speed.
    pub zoom_modifier: bool,
    /// Pointer motion in pixels since the last frame.
    pub look_delta: Vec2,
    /// Scroll wheel notches since the last frame; positive is towards the user (wheel down).
    pub scroll_delta: f32,
}

fn axis(positive: bool, negative: bool) -> f32 {
    positive as i32 as f32 - negative as i32 as f32
}

/// Free-fly camera. Yaw is measured from +X towards +Z; pitch from the horizon.
#[derive(Debug, Clone)]
pub struct FlyCamera {
    pub position: Vec3,
    /// Field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Aspect ratio (width / height).
    pub aspect: f32,
    /// World units per second.
    pub move_speed: f32,
    yaw: f32,
    pitch: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            fov_degrees: 60.0,
            near: 0.1,
            far: 25000.0,
            aspect: 16.0 / 9.0,
            move_speed: MIN_MOVE_SPEED,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

impl FlyCamera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Update aspect ratio (call on window resize).
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    fn max_pitch() -> f32 {
        std::f32::consts::FRAC_PI_2 - 0.01
    }

    /// Set yaw and pitch directly (radians). Pitch is clamped short of straight up/down.
    pub fn set_yaw_pitch(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-Self::max_pitch(), Self::max_pitch());
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Apply one frame of input: look, then scroll, then movement along the new axes.
    pub fn integrate(&mut self, input: &CameraInput, delta_time: f32) {
        let look_scale = self.fov_degrees / 60.0 / LOOK_DIVISOR;
        self.set_yaw_pitch(
            self.yaw + input.look_delta.x * look_scale,
            self.pitch - input.look_delta.y * look_scale,
        );

        if input.scroll_delta != 0.0 {
            let step = SCROLL_STEP * input.scroll_delta;
            if input.zoom_modifier && !input.ascend && !input.descend {
                self.fov_degrees = (self.fov_degrees - step / 50.0).clamp(MIN_FOV, MAX_FOV);
            } else {
                self.move_speed = (self.move_speed - step).max(MIN_MOVE_SPEED);
            }
        }

        let distance = self.move_speed * delta_time;
        self.position += self.direction() * axis(input.forward, input.backward) * distance;
        self.position += self.right() * axis(input.right, input.left) * distance;
        self.position += Vec3::Y * axis(input.ascend, input.descend) * distance;
    }

    /// Unit look direction from the spherical angles.
    pub fn direction(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch)
    }

    /// Horizontal right vector. Never degenerate because pitch stays below ±90°.
    pub fn right(&self) -> Vec3 {
        self.direction().cross(Vec3::Y).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.direction(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Camera uniform data for GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4], // w unused
    pub forward: [f32; 4],  // w unused
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0; 4],
            forward: [0.0, 0.0, -1.0, 0.0],
        }
    }

    pub fn update(&mut self, camera: &FlyCamera) {
        self.view_proj = camera.view_projection_matrix().to_cols_array_2d();
        self.position = camera.position.extend(1.0).to_array();
        self.forward = camera.direction().extend(0.0).to_array();
    }

    /// Look through an arbitrary matrix (the shadow-projection debug view).
    pub fn update_with(&mut self, camera: &FlyCamera, view_proj: Mat4) {
        self.update(camera);
        self.view_proj = view_proj.to_cols_array_2d();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_is_clamped() {
        let mut camera = FlyCamera::default();
        let input = CameraInput {
            look_delta: Vec2::new(0.0, -1.0e6),
            ..Default::default()
        };
        camera.integrate(&input, 0.0);
        assert!((camera.pitch() - (std::f32::consts::FRAC_PI_2 - 0.01)).abs() < 1e-6);
        assert!(camera.right().is_finite());
        assert!((camera.right().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn initial_direction_is_plus_x() {
        let camera = FlyCamera::default();
        assert!((camera.direction() - Vec3::X).length() < 1e-6);
        assert!((camera.right() - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn movement_uses_signed_axes() {
        let mut camera = FlyCamera::default();
        let input = CameraInput {
            forward: true,
            ascend: true,
            descend: true,
            right: true,
            ..Default::default()
        };
        camera.integrate(&input, 0.5);
        // 100 units/s for half a second along +X (forward) and +Z (right); up and down cancel.
        assert!((camera.position - Vec3::new(50.0, 0.0, 50.0)).length() < 1e-3);

        let mut still = FlyCamera::default();
        still.integrate(&CameraInput { forward: true, backward: true, ..Default::default() }, 1.0);
        assert_eq!(still.position, Vec3::ZERO);
    }

    #[test]
    fn scroll_changes_speed_or_zoom() {
        let mut camera = FlyCamera::default();
        camera.integrate(&CameraInput { scroll_delta: -1.0, ..Default::default() }, 0.0);
        assert_eq!(camera.move_speed, 200.0);
        camera.integrate(&CameraInput { scroll_delta: 3.0, ..Default::default() }, 0.0);
        assert_eq!(camera.move_speed, 100.0);

        let zoom = CameraInput {
            scroll_delta: 1.0,
            zoom_modifier: true,
            ..Default::default()
        };
        camera.integrate(&zoom, 0.0);
        assert_eq!(camera.fov_degrees, 58.0);
        for _ in 0..100 {
            camera.integrate(&zoom, 0.0);
        }
        assert_eq!(camera.fov_degrees, MIN_FOV);

        // A held vertical key turns zoom back into a speed change.
        camera.integrate(&CameraInput { ascend: true, ..zoom }, 0.0);
        assert_eq!(camera.fov_degrees, MIN_FOV);
        assert_eq!(camera.move_speed, 100.0);
    }

    #[test]
    fn every_notch_in_a_frame_counts() {
        let mut camera = FlyCamera::default();
        camera.integrate(&CameraInput { scroll_delta: -3.0, ..Default::default() }, 0.0);
        assert_eq!(camera.move_speed, 400.0);
        camera.integrate(&CameraInput { scroll_delta: 2.0, ..Default::default() }, 0.0);
        assert_eq!(camera.move_speed, 200.0);

        let zoom = CameraInput {
            scroll_delta: 2.0,
            zoom_modifier: true,
            ..Default::default()
        };
        camera.integrate(&zoom, 0.0);
        assert_eq!(camera.fov_degrees, 56.0);
    }
}
