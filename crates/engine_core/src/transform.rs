//! Placement of a drawable solid in the world.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Location, axis-angle rotation and scale of a solid, with the derived model matrix.
///
/// Fields are private: every setter recomputes the matrix before returning, so
/// [`SolidTransform::model_matrix`] never reads a stale value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidTransform {
    location: Vec3,
    rotation_axis: Vec3,
    /// Degrees.
    rotation_angle: f32,
    scale: Vec3,
    model: Mat4,
}

impl Default for SolidTransform {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::X, 0.0, Vec3::ONE)
    }
}

impl SolidTransform {
    /// Create a transform. `rotation_angle` is in degrees.
    pub fn new(location: Vec3, rotation_axis: Vec3, rotation_angle: f32, scale: Vec3) -> Self {
        let mut transform = Self {
            location,
            rotation_axis,
            rotation_angle,
            scale,
            model: Mat4::IDENTITY,
        };
        transform.recompute();
        transform
    }

    /// Create a transform at the given location with no rotation and unit scale.
    pub fn from_location(location: Vec3) -> Self {
        Self::new(location, Vec3::X, 0.0, Vec3::ONE)
    }

    /// Replace all four inputs at once.
    pub fn set_transform(&mut self, location: Vec3, rotation_axis: Vec3, rotation_angle: f32, scale: Vec3) {
        self.location = location;
        self.rotation_axis = rotation_axis;
        self.rotation_angle = rotation_angle;
        self.scale = scale;
        self.recompute();
    }

    pub fn set_location(&mut self, location: Vec3) {
        self.location = location;
        self.recompute();
    }

    pub fn set_rotation_axis(&mut self, axis: Vec3) {
        self.rotation_axis = axis;
        self.recompute();
    }

    /// Set the rotation angle in degrees.
    pub fn set_rotation_angle(&mut self, degrees: f32) {
        self.rotation_angle = degrees;
        self.recompute();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.recompute();
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    pub fn rotation_axis(&self) -> Vec3 {
        self.rotation_axis
    }

    /// Rotation angle in degrees.
    pub fn rotation_angle(&self) -> f32 {
        self.rotation_angle
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// `translate(location) * rotate(angle, axis) * scale(scale)`.
    pub fn model_matrix(&self) -> Mat4 {
        self.model
    }

    fn recompute(&mut self) {
        // A zero or non-finite axis contributes no rotation.
        let rotation = match self.rotation_axis.try_normalize() {
            Some(axis) => Mat4::from_axis_angle(axis, self.rotation_angle.to_radians()),
            None => Mat4::IDENTITY,
        };
        self.model = Mat4::from_translation(self.location) * rotation * Mat4::from_scale(self.scale);
    }
}

/// Raw model data for GPU upload: the model matrix and its normal matrix.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelRaw {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl ModelRaw {
    pub fn from_matrix(model: Mat4) -> Self {
        // Inverse-transpose keeps normals perpendicular under non-uniform scale.
        let normal = if model.determinant().abs() > f32::EPSILON {
            model.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        Self {
            model: model.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
        }
    }
}

impl From<&SolidTransform> for ModelRaw {
    fn from(transform: &SolidTransform) -> Self {
        Self::from_matrix(transform.model_matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_location_updates_translation_column() {
        let mut t = SolidTransform::default();
        t.set_location(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.model_matrix().w_axis, glam::Vec4::new(1.0, 2.0, 3.0, 1.0));
    }

    #[test]
    fn composition_order_is_translate_rotate_scale() {
        let t = SolidTransform::new(Vec3::new(10.0, 0.0, 0.0), Vec3::Y, 90.0, Vec3::splat(2.0));
        // +X scaled to 2, rotated about Y to -Z, then translated.
        let p = t.model_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(10.0, 0.0, -2.0)).length() < 1e-5, "got {p:?}");
    }

    #[test]
    fn every_setter_recomputes() {
        let mut t = SolidTransform::default();
        t.set_scale(Vec3::splat(3.0));
        assert_eq!(t.model_matrix().transform_point3(Vec3::ONE), Vec3::splat(3.0));
        t.set_rotation_axis(Vec3::Z);
        t.set_rotation_angle(180.0);
        let p = t.model_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(-3.0, 0.0, 0.0)).length() < 1e-5);
        t.set_transform(Vec3::Y, Vec3::X, 0.0, Vec3::ONE);
        assert_eq!(t.model_matrix(), Mat4::from_translation(Vec3::Y));
    }

    #[test]
    fn zero_axis_means_no_rotation() {
        let t = SolidTransform::new(Vec3::ZERO, Vec3::ZERO, 45.0, Vec3::ONE);
        assert_eq!(t.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn singular_model_gets_identity_normal_matrix() {
        let raw = ModelRaw::from(&SolidTransform::new(Vec3::ZERO, Vec3::X, 0.0, Vec3::ZERO));
        assert_eq!(raw.normal, Mat4::IDENTITY.to_cols_array_2d());
    }
}
