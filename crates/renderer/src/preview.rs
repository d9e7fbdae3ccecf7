//! Small on-screen quad showing the depth of one shadow cascade.

use crate::pipeline::PreviewBindings;
use crate::shadow::ShadowCascades;
use crate::vertex::PreviewVertex;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

/// Edge length of the quad in pixels.
pub const PREVIEW_SIZE: f32 = 150.0;
/// Gap between the quad and the bottom-right window corner, in pixels.
pub const PREVIEW_MARGIN: f32 = 20.0;

/// Unit quad centred on the origin, two triangles. Texture v runs top to bottom.
pub fn preview_vertices() -> [PreviewVertex; 6] {
    let corner = |x: f32, y: f32| PreviewVertex::new([x, y, 0.0], [x + 0.5, 0.5 - y]);
    [
        corner(-0.5, -0.5),
        corner(0.5, -0.5),
        corner(0.5, 0.5),
        corner(0.5, 0.5),
        corner(-0.5, 0.5),
        corner(-0.5, -0.5),
    ]
}

/// Pixel-space orthographic projection times the quad's placement in the bottom-right corner.
pub fn preview_transform(width: u32, height: u32) -> Mat4 {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let projection = Mat4::orthographic_rh(-w / 2.0, w / 2.0, -h / 2.0, h / 2.0, 0.01, 10.0);
    let offset = PREVIEW_SIZE / 2.0 + PREVIEW_MARGIN;
    // z = -1 keeps the quad between the near and far planes.
    let placement = Mat4::from_translation(Vec3::new(w / 2.0 - offset, -h / 2.0 + offset, -1.0))
        * Mat4::from_scale(Vec3::new(PREVIEW_SIZE, PREVIEW_SIZE, 1.0));
    projection * placement
}

/// Preview uniform (must match preview.wgsl Preview).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PreviewUniform {
    pub transform: [[f32; 4]; 4],
}

/// GPU side of the preview: quad geometry, transform and one bind group per cascade layer.
pub struct ShadowmapPreviewQuad {
    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_groups: Vec<wgpu::BindGroup>,
}

impl ShadowmapPreviewQuad {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        bindings: &PreviewBindings,
        cascades: &ShadowCascades,
        width: u32,
        height: u32,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Shadow Preview Quad"),
            contents: bytemuck::cast_slice(&preview_vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uniform = PreviewUniform {
            transform: preview_transform(width, height).to_cols_array_2d(),
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Shadow Preview Uniform"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let mut quad = Self {
            vertex_buffer,
            uniform_buffer,
            bind_groups: Vec::new(),
        };
        quad.rebind(device, layout, bindings, cascades);
        quad
    }

    /// Point the bind groups at (re)allocated cascades.
    pub fn rebind(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        bindings: &PreviewBindings,
        cascades: &ShadowCascades,
    ) {
        self.bind_groups = (0..cascades.count())
            .map(|i| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Shadow Preview Bind Group"),
                    layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: bindings.preview.binding,
                            resource: self.uniform_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: bindings.shadow_map.binding,
                            resource: wgpu::BindingResource::TextureView(cascades.layer_view(i)),
                        },
                    ],
                })
            })
            .collect();
    }

    /// Recompute the placement for a new window size.
    pub fn resize(&self, queue: &wgpu::Queue, width: u32, height: u32) {
        let uniform = PreviewUniform {
            transform: preview_transform(width, height).to_cols_array_2d(),
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    /// Draw the quad for `cascade` (clamped to the last one).
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, group: u32, cascade: usize) {
        let Some(bind_group) = self.bind_groups.get(cascade.min(self.bind_groups.len().saturating_sub(1))) else {
            return;
        };
        pass.set_bind_group(group, bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..6, 0..1);
    }
}
