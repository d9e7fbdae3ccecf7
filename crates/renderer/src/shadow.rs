//! Cascaded shadow maps for the directional sun.
//!
//! Every cascade is an orthographic frustum centred under the camera (or a locked anchor) and
//! pulled back along the light direction. Cascades grow monotonically so the first one spends
//! its texels near the viewer and the last one covers the whole visible range.

use crate::error::ResourceError;
use crate::texture::Texture;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use thiserror::Error;

/// Upper bound on cascades; the scene shader declares arrays of this length.
pub const MAX_CASCADES: usize = 4;
pub const DEFAULT_SHADOW_RESOLUTION: u32 = 2048;

/// Default sun: low in the sky, shining along +X.
pub fn default_sun_direction() -> Vec3 {
    Vec3::new(1.0, -0.3, 0.0).normalize()
}

/// The single directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunLight {
    /// Direction the light travels (from the sun towards the scene).
    pub direction: Vec3,
    pub color: Vec3,
    pub ambient: f32,
    pub diffuse: f32,
}

impl Default for SunLight {
    fn default() -> Self {
        Self {
            direction: default_sun_direction(),
            color: Vec3::ONE,
            ambient: 0.2,
            diffuse: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShadowConfigError {
    #[error("at least one cascade is required")]
    NoCascades,
    #[error("{0} cascades requested, at most {MAX_CASCADES} are supported")]
    TooManyCascades(usize),
    #[error("cascade {index} half-size {half_size} is not larger than the previous one")]
    NotIncreasing { index: usize, half_size: f32 },
    #[error("shadow depth range {near}..{far} is empty")]
    EmptyDepthRange { near: f32, far: f32 },
    #[error("shadow map resolution must be non-zero")]
    ZeroResolution,
}

/// Tuning table for the cascades. Values are empirical, not derived.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeConfig {
    half_sizes: Vec<f32>,
    near: f32,
    far: f32,
    resolution: u32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            half_sizes: vec![2000.0, 4000.0, 6000.0, 12000.0],
            near: 0.01,
            far: 24000.0,
            resolution: DEFAULT_SHADOW_RESOLUTION,
        }
    }
}

impl CascadeConfig {
    pub fn new(half_sizes: Vec<f32>, near: f32, far: f32, resolution: u32) -> Result<Self, ShadowConfigError> {
        if half_sizes.is_empty() {
            return Err(ShadowConfigError::NoCascades);
        }
        if half_sizes.len() > MAX_CASCADES {
            return Err(ShadowConfigError::TooManyCascades(half_sizes.len()));
        }
        let mut previous = 0.0;
        for (index, &half_size) in half_sizes.iter().enumerate() {
            if !(half_size > previous) || !half_size.is_finite() {
                return Err(ShadowConfigError::NotIncreasing { index, half_size });
            }
            previous = half_size;
        }
        if !(far > near) || near < 0.0 {
            return Err(ShadowConfigError::EmptyDepthRange { near, far });
        }
        if resolution == 0 {
            return Err(ShadowConfigError::ZeroResolution);
        }
        Ok(Self {
            half_sizes,
            near,
            far,
            resolution,
        })
    }

    /// Same table at another texture resolution.
    pub fn with_resolution(&self, resolution: u32) -> Result<Self, ShadowConfigError> {
        Self::new(self.half_sizes.clone(), self.near, self.far, resolution)
    }

    pub fn count(&self) -> usize {
        self.half_sizes.len()
    }

    pub fn half_sizes(&self) -> &[f32] {
        &self.half_sizes
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Frustum of cascade `index` around `anchor`.
    pub fn frustum(&self, index: usize, anchor: Vec3, light_direction: Vec3) -> CascadeFrustum {
        cascade_frustum(anchor, light_direction, self.half_sizes[index], self.near, self.far)
    }
}

/// One cascade's light-space matrices and its world-space box.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeFrustum {
    pub projection: Mat4,
    pub view: Mat4,
    pub half_size: f32,
    /// Near rectangle first, then far, both counter-clockwise in light space.
    pub corners: [Vec3; 8],
}

impl CascadeFrustum {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// The 12 box edges as point pairs.
    pub fn edges(&self) -> [[Vec3; 2]; 12] {
        let c = &self.corners;
        let mut edges = [[Vec3::ZERO; 2]; 12];
        for i in 0..4 {
            let j = (i + 1) % 4;
            edges[i] = [c[i], c[j]];
            edges[4 + i] = [c[4 + i], c[4 + j]];
            edges[8 + i] = [c[i], c[4 + i]];
        }
        edges
    }

    /// Edges flattened into a line list.
    pub fn line_vertices(&self) -> Vec<[f32; 3]> {
        self.edges().iter().flatten().map(|p| p.to_array()).collect()
    }
}

/// Orthographic light frustum of half-size `half_size` centred on `anchor`'s XZ position,
/// with the eye pulled back along the light by half the far distance.
pub fn cascade_frustum(anchor: Vec3, light_direction: Vec3, half_size: f32, near: f32, far: f32) -> CascadeFrustum {
    let direction = light_direction.try_normalize().unwrap_or_else(default_sun_direction);
    let up = if direction.y.abs() > 0.999 { Vec3::Z } else { Vec3::Y };
    let eye = Vec3::new(anchor.x, 0.0, anchor.z) - direction * (far / 2.0);
    let view = Mat4::look_at_rh(eye, eye + direction, up);
    let projection = Mat4::orthographic_rh(-half_size, half_size, -half_size, half_size, near, far);

    let to_world = view.inverse();
    let mut corners = [Vec3::ZERO; 8];
    for (slab, depth) in [near, far].into_iter().enumerate() {
        for (i, (x, y)) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)].into_iter().enumerate() {
            // Light space looks down -Z.
            corners[slab * 4 + i] = to_world.transform_point3(Vec3::new(x * half_size, y * half_size, -depth));
        }
    }

    CascadeFrustum {
        projection,
        view,
        half_size,
        corners,
    }
}

/// Maps clip-space xy in `[-1, 1]` to texture uv in `[0, 1]`. Texture v grows downwards and
/// depth is already `[0, 1]`, so z passes through.
pub fn bias_matrix() -> Mat4 {
    Mat4::from_translation(Vec3::new(0.5, 0.5, 0.0)) * Mat4::from_scale(Vec3::new(0.5, -0.5, 1.0))
}

/// Depth-pass uniform (must match depth.wgsl Light).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl LightUniform {
    pub fn new(frustum: &CascadeFrustum) -> Self {
        Self {
            view_proj: frustum.view_projection().to_cols_array_2d(),
        }
    }
}

/// Depth textures of every cascade: one array texture, one render view per layer and an
/// array view for sampling.
pub struct ShadowCascades {
    texture: wgpu::Texture,
    layer_views: Vec<wgpu::TextureView>,
    array_view: wgpu::TextureView,
}

impl ShadowCascades {
    /// Allocate `config.count()` layers at `config.resolution()`. Runs inside a validation error
    /// scope so an oversized request comes back as an error instead of a device panic.
    pub fn try_new(device: &wgpu::Device, config: &CascadeConfig) -> Result<Self, ResourceError> {
        let label = format!("Shadow Cascades {}x{}", config.resolution(), config.resolution());
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: config.resolution(),
                height: config.resolution(),
                depth_or_array_layers: config.count() as u32,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Texture::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let layer_views = (0..config.count() as u32)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Shadow Cascade Layer"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Shadow Cascade Array"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ResourceError::from_wgpu(&label, error));
        }
        log::debug!("Allocated {label} with {} layers", config.count());
        Ok(Self {
            texture,
            layer_views,
            array_view,
        })
    }

    /// Render target for cascade `index`.
    pub fn layer_view(&self, index: usize) -> &wgpu::TextureView {
        &self.layer_views[index]
    }

    pub fn array_view(&self) -> &wgpu::TextureView {
        &self.array_view
    }

    pub fn count(&self) -> usize {
        self.layer_views.len()
    }

    pub fn resolution(&self) -> u32 {
        self.texture.width()
    }
}

/// Comparison sampler for percentage-closer lookups in the main pass.
pub fn create_shadow_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Shadow Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        compare: Some(wgpu::CompareFunction::LessEqual),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-2
    }

    #[test]
    fn default_cascades_grow() {
        let config = CascadeConfig::default();
        assert_eq!(config.count(), MAX_CASCADES);
        for pair in config.half_sizes().windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn invalid_tables_are_rejected() {
        assert_eq!(CascadeConfig::new(vec![], 0.01, 100.0, 512), Err(ShadowConfigError::NoCascades));
        assert_eq!(
            CascadeConfig::new(vec![1.0, 2.0, 3.0, 4.0, 5.0], 0.01, 100.0, 512),
            Err(ShadowConfigError::TooManyCascades(5))
        );
        assert_eq!(
            CascadeConfig::new(vec![10.0, 10.0], 0.01, 100.0, 512),
            Err(ShadowConfigError::NotIncreasing { index: 1, half_size: 10.0 })
        );
        assert!(matches!(
            CascadeConfig::new(vec![10.0], 5.0, 5.0, 512),
            Err(ShadowConfigError::EmptyDepthRange { .. })
        ));
        assert_eq!(
            CascadeConfig::default().with_resolution(0),
            Err(ShadowConfigError::ZeroResolution)
        );
        assert_eq!(CascadeConfig::default().with_resolution(1024).unwrap().resolution(), 1024);
    }

    #[test]
    fn frustum_is_centred_under_anchor() {
        let config = CascadeConfig::default();
        let anchor = Vec3::new(6000.0, 750.0, 6000.0);
        let frustum = config.frustum(0, anchor, default_sun_direction());

        // A ground point under the anchor lands in the middle of the cascade.
        let clip = frustum.view_projection().project_point3(Vec3::new(anchor.x, 0.0, anchor.z));
        assert!(clip.x.abs() < 1e-3 && clip.y.abs() < 1e-3);
        assert!((0.0..=1.0).contains(&clip.z));

        // Eye sits half the far distance back along the light.
        let eye = frustum.view.inverse().transform_point3(Vec3::ZERO);
        let expected = Vec3::new(anchor.x, 0.0, anchor.z) - default_sun_direction() * 12000.0;
        assert!((eye - expected).length() < 0.5);

        // Near corners project to the NDC corners at depth 0.
        let ndc = frustum.view_projection().project_point3(frustum.corners[0]);
        assert!((ndc.x + 1.0).abs() < 1e-3 && (ndc.y + 1.0).abs() < 1e-3 && ndc.z.abs() < 1e-3);
        let ndc = frustum.view_projection().project_point3(frustum.corners[6]);
        assert!((ndc.x - 1.0).abs() < 1e-3 && (ndc.y - 1.0).abs() < 1e-3 && (ndc.z - 1.0).abs() < 1e-3);
    }

    #[test]
    fn edges_cover_the_box() {
        let frustum = cascade_frustum(Vec3::ZERO, default_sun_direction(), 100.0, 0.01, 1000.0);
        let edges = frustum.edges();
        assert_eq!(frustum.line_vertices().len(), 24);
        // Side edges run along the light direction for the full depth.
        for edge in &edges[8..] {
            let along = edge[1] - edge[0];
            assert!((along.length() - (1000.0 - 0.01)).abs() < 0.1);
            assert!(along.normalize().dot(default_sun_direction()) > 0.999);
        }
        // Rectangle edges are 2 * half_size long.
        for edge in &edges[..8] {
            assert!(((edge[1] - edge[0]).length() - 200.0).abs() < 1e-2);
        }
    }

    #[test]
    fn degenerate_light_directions_stay_finite() {
        for dir in [Vec3::ZERO, Vec3::NEG_Y, Vec3::new(f32::NAN, 0.0, 0.0)] {
            let frustum = cascade_frustum(Vec3::ONE, dir, 50.0, 0.01, 500.0);
            assert!(frustum.view.is_finite(), "{dir:?}");
            assert!(frustum.corners.iter().all(|c| c.is_finite()));
        }
    }

    #[test]
    fn bias_maps_clip_to_texture_space() {
        let bias = bias_matrix();
        assert!(close(bias.transform_point3(Vec3::new(-1.0, -1.0, 0.25)), Vec3::new(0.0, 1.0, 0.25)));
        assert!(close(bias.transform_point3(Vec3::new(1.0, 1.0, 0.75)), Vec3::new(1.0, 0.0, 0.75)));
        assert!(close(bias.transform_point3(Vec3::ZERO), Vec3::new(0.5, 0.5, 0.0)));
    }
}
