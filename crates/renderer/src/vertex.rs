//! Vertex types and layouts for rendering.
//!
//! Scene meshes keep one buffer per attribute, so the lit pipeline binds three buffers and the
//! depth and line pipelines bind only positions.

use bytemuck::{Pod, Zeroable};

/// Slot order of the per-attribute scene buffers.
pub const POSITION_SLOT: u32 = 0;
pub const NORMAL_SLOT: u32 = 1;
pub const COLOR_SLOT: u32 = 2;

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    offset: 0,
    shader_location: 0,
    format: wgpu::VertexFormat::Float32x3,
}];
const NORMAL_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    offset: 0,
    shader_location: 1,
    format: wgpu::VertexFormat::Float32x3,
}];
const COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    offset: 0,
    shader_location: 2,
    format: wgpu::VertexFormat::Float32x4,
}];

/// Tightly packed `[f32; 3]` positions at location 0.
pub fn position_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &POSITION_ATTRIBUTES,
    }
}

/// Position, normal and colour buffers, in slot order.
pub fn scene_layouts() -> [wgpu::VertexBufferLayout<'static>; 3] {
    [
        position_layout(),
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &NORMAL_ATTRIBUTES,
        },
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &COLOR_ATTRIBUTES,
        },
    ]
}

/// Vertex of the shadow-map preview quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PreviewVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl PreviewVertex {
    pub fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PreviewVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // UV
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_layout_locations_match_slots() {
        let layouts = scene_layouts();
        for (slot, layout) in [POSITION_SLOT, NORMAL_SLOT, COLOR_SLOT].into_iter().zip(&layouts) {
            assert_eq!(layout.attributes[0].shader_location, slot);
        }
        assert_eq!(layouts[2].array_stride, 16);
        assert_eq!(PreviewVertex::layout().array_stride, 20);
    }
}
