//! Per-frame animation hooks for solids.

use crate::transform::SolidTransform;
use glam::Vec3;

/// A behaviour that updates a solid's transform once per frame, before it is drawn.
pub trait Animatable {
    fn before_draw(&mut self, transform: &mut SolidTransform, delta_time: f32);
}

/// Spins a solid while its rotation axis sweeps around the sphere.
#[derive(Debug, Clone, Copy)]
pub struct Tumble {
    /// Degrees per second, applied to the angle and to both axis angles.
    pub rate: f32,
    theta: f32,
    phi: f32,
}

impl Default for Tumble {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Tumble {
    pub fn new(rate: f32) -> Self {
        Self { rate, theta: 0.0, phi: 0.0 }
    }

    /// Current axis from the two spherical angles.
    pub fn axis(&self) -> Vec3 {
        Vec3::new(
            self.theta.cos() * self.phi.cos(),
            self.phi.sin(),
            self.theta.sin() * self.phi.cos(),
        )
    }
}

impl Animatable for Tumble {
    fn before_draw(&mut self, transform: &mut SolidTransform, delta_time: f32) {
        let step = self.rate * delta_time;
        self.theta += step.to_radians();
        self.phi += step.to_radians();
        transform.set_transform(
            transform.location(),
            self.axis(),
            transform.rotation_angle() + step,
            transform.scale(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tumble_advances_angle_by_rate() {
        let mut transform = SolidTransform::default();
        let mut tumble = Tumble::new(100.0);
        tumble.before_draw(&mut transform, 0.5);
        assert!((transform.rotation_angle() - 50.0).abs() < 1e-4);
        tumble.before_draw(&mut transform, 0.5);
        assert!((transform.rotation_angle() - 100.0).abs() < 1e-4);
    }

    #[test]
    fn tumble_axis_stays_unit_and_moves() {
        let mut transform = SolidTransform::from_location(Vec3::new(0.0, 300.0, 0.0));
        let mut tumble = Tumble::default();
        let before = tumble.axis();
        tumble.before_draw(&mut transform, 0.1);
        let after = transform.rotation_axis();
        assert!((after.length() - 1.0).abs() < 1e-5);
        assert_ne!(before, after);
        assert_eq!(transform.location(), Vec3::new(0.0, 300.0, 0.0));
    }

    #[test]
    fn zero_delta_leaves_transform_unchanged() {
        let mut transform = SolidTransform::default();
        let matrix = transform.model_matrix();
        let mut tumble = Tumble::new(100.0);
        tumble.before_draw(&mut transform, 0.0);
        assert_eq!(transform.model_matrix(), matrix);
    }
}
