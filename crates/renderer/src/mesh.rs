//! GPU-side mesh buffers.

use crate::asset::SubMeshGeometry;
use crate::device::GraphicsDevice;
use engine_core::TriangleMesh;

/// Vertex buffers for one drawable mesh, split per attribute.
///
/// Position, normal and colour feed the scene pipelines; the line buffer holds the
/// normal-visualisation segments. Handles are cheap clones of shared buffers.
#[derive(Debug, Clone)]
pub struct MeshBuffers<B> {
    pub positions: B,
    pub normals: B,
    pub colors: B,
    pub uvs: Option<B>,
    pub lines: Option<B>,
    pub vertex_count: u32,
    pub line_count: u32,
}

impl<B: Clone> MeshBuffers<B> {
    /// Upload a flat triangle list and its normal segments of the given length.
    pub fn upload<D>(device: &D, label: &str, mesh: &TriangleMesh, normal_length: f32) -> Self
    where
        D: GraphicsDevice<Buffer = B>,
    {
        let lines = mesh.normal_lines(normal_length);
        Self {
            positions: device.create_vertex_buffer(&format!("{label} Positions"), bytemuck::cast_slice(&mesh.positions())),
            normals: device.create_vertex_buffer(&format!("{label} Normals"), bytemuck::cast_slice(&mesh.normals())),
            colors: device.create_vertex_buffer(&format!("{label} Colors"), bytemuck::cast_slice(&mesh.colors())),
            uvs: None,
            lines: Some(device.create_vertex_buffer(&format!("{label} Normal Lines"), bytemuck::cast_slice(&lines))),
            vertex_count: mesh.vertex_count() as u32,
            line_count: lines.len() as u32,
        }
    }

    /// Upload triangulated asset geometry. Assets carry no colour, so their normals are
    /// reused as vertex colour.
    pub fn from_geometry<D>(device: &D, label: &str, geometry: &SubMeshGeometry) -> Self
    where
        D: GraphicsDevice<Buffer = B>,
    {
        let colors: Vec<[f32; 4]> = geometry.normals.iter().map(|n| [n[0], n[1], n[2], 1.0]).collect();
        Self {
            positions: device.create_vertex_buffer(&format!("{label} Positions"), bytemuck::cast_slice(&geometry.positions)),
            normals: device.create_vertex_buffer(&format!("{label} Normals"), bytemuck::cast_slice(&geometry.normals)),
            colors: device.create_vertex_buffer(&format!("{label} Colors"), bytemuck::cast_slice(&colors)),
            uvs: Some(device.create_vertex_buffer(&format!("{label} UVs"), bytemuck::cast_slice(&geometry.uvs))),
            lines: Some(device.create_vertex_buffer(&format!("{label} Normal Lines"), bytemuck::cast_slice(&geometry.lines))),
            vertex_count: geometry.positions.len() as u32,
            line_count: geometry.lines.len() as u32,
        }
    }

    pub fn triangle_count(&self) -> u32 {
        self.vertex_count / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::RecordingDevice;
    use engine_core::{TriangleVertex, Vec3};

    #[test]
    fn upload_creates_attribute_and_line_buffers() {
        let device = RecordingDevice::default();
        let mut mesh = TriangleMesh::new();
        let v = |p: Vec3| TriangleVertex::new(p, Vec3::Y, [0.5, 0.5, 0.5, 1.0]);
        mesh.push_triangle([v(Vec3::ZERO), v(Vec3::Z), v(Vec3::X)]);

        let buffers = MeshBuffers::upload(&device, "Terrain", &mesh, 20.0);
        assert_eq!(buffers.vertex_count, 3);
        assert_eq!(buffers.line_count, 6);
        assert_eq!(buffers.triangle_count(), 1);
        assert_eq!(buffers.positions.bytes.len(), 3 * 12);
        assert_eq!(buffers.colors.bytes.len(), 3 * 16);
        assert!(buffers.uvs.is_none());
        assert_eq!(device.upload_count(), 4);
    }

    #[test]
    fn geometry_normals_become_colors() {
        let device = RecordingDevice::default();
        let geometry = SubMeshGeometry {
            positions: vec![[0.0; 3]; 3],
            normals: vec![[0.0, 1.0, 0.0]; 3],
            uvs: vec![[0.0; 2]; 3],
            lines: vec![[0.0; 3]; 6],
        };
        let buffers = MeshBuffers::from_geometry(&device, "tree.obj/Trunk", &geometry);
        let first_color: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
        assert_eq!(&buffers.colors.bytes[..16], bytemuck::bytes_of(&first_color));
        assert_eq!(buffers.line_count, 6);
        assert_eq!(device.upload_count(), 5);
    }
}
