//! CPU-side triangle geometry shared by terrain, revolved solids and loaded assets.
//!
//! Meshes are flat triangle lists: every three consecutive vertices form one triangle and
//! vertices are duplicated across triangles. Smooth normals are computed on an indexed
//! surface first so neighbouring triangles can share their face-normal contributions.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// One vertex of a flat triangle list.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TriangleVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl TriangleVertex {
    pub fn new(position: Vec3, normal: Vec3, color: [f32; 4]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            color,
        }
    }
}

/// A flat triangle list.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub vertices: Vec<TriangleVertex>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
        }
    }

    pub fn push_triangle(&mut self, triangle: [TriangleVertex; 3]) {
        self.vertices.extend_from_slice(&triangle);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn positions(&self) -> Vec<[f32; 3]> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    pub fn normals(&self) -> Vec<[f32; 3]> {
        self.vertices.iter().map(|v| v.normal).collect()
    }

    pub fn colors(&self) -> Vec<[f32; 4]> {
        self.vertices.iter().map(|v| v.color).collect()
    }

    /// Line-list segments from each vertex to `vertex + normal * length`.
    pub fn normal_lines(&self, length: f32) -> Vec<[f32; 3]> {
        normal_lines(
            self.vertices.iter().map(|v| (Vec3::from_array(v.position), Vec3::from_array(v.normal))),
            length,
        )
    }
}

/// Two points per `(position, normal)` pair: the position and the position pushed along the normal.
pub fn normal_lines(pairs: impl IntoIterator<Item = (Vec3, Vec3)>, length: f32) -> Vec<[f32; 3]> {
    let mut lines = Vec::new();
    for (position, normal) in pairs {
        lines.push(position.to_array());
        lines.push((position + normal * length).to_array());
    }
    lines
}

/// Zero every component that is NaN or infinite.
#[inline]
pub fn finite_or_zero(v: Vec3) -> Vec3 {
    Vec3::new(
        if v.x.is_finite() { v.x } else { 0.0 },
        if v.y.is_finite() { v.y } else { 0.0 },
        if v.z.is_finite() { v.z } else { 0.0 },
    )
}

/// Normalize, falling back to zero components for degenerate input.
/// The result is either unit length or exactly zero.
#[inline]
pub fn unit_or_zero(v: Vec3) -> Vec3 {
    finite_or_zero(v.normalize())
}

/// Face normal of a counter-clockwise triangle.
#[inline]
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    unit_or_zero((b - a).cross(c - a))
}

/// Points shared between triangles by index, used to accumulate smooth normals.
#[derive(Debug, Clone, Default)]
pub struct IndexedSurface {
    pub points: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl IndexedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(points: usize, triangles: usize) -> Self {
        Self {
            points: Vec::with_capacity(points),
            triangles: Vec::with_capacity(triangles),
        }
    }

    /// Add a point and return its index.
    pub fn push_point(&mut self, point: Vec3) -> u32 {
        self.points.push(point);
        (self.points.len() - 1) as u32
    }

    pub fn push_triangle(&mut self, triangle: [u32; 3]) {
        self.triangles.push(triangle);
    }

    /// Per-point normals: each triangle's face normal is added to its three corners,
    /// then every sum is renormalized. Isolated or degenerate points get a zero normal.
    pub fn smooth_normals(&self) -> Vec<Vec3> {
        let mut sums = vec![Vec3::ZERO; self.points.len()];
        for &[a, b, c] in &self.triangles {
            let n = face_normal(
                self.points[a as usize],
                self.points[b as usize],
                self.points[c as usize],
            );
            sums[a as usize] += n;
            sums[b as usize] += n;
            sums[c as usize] += n;
        }
        sums.into_iter().map(unit_or_zero).collect()
    }

    /// Expand into a flat triangle list with smooth normals.
    /// `color` receives the point index and its normal.
    pub fn into_mesh(self, color: impl Fn(usize, Vec3) -> [f32; 4]) -> TriangleMesh {
        let normals = self.smooth_normals();
        let mut mesh = TriangleMesh::with_capacity(self.triangles.len() * 3);
        for tri in &self.triangles {
            for &index in tri {
                let i = index as usize;
                mesh.vertices
                    .push(TriangleVertex::new(self.points[i], normals[i], color(i, normals[i])));
            }
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_unit_or_zero(n: [f32; 3]) -> bool {
        let v = Vec3::from_array(n);
        v == Vec3::ZERO || (v.length() - 1.0).abs() < 1e-5
    }

    #[test]
    fn degenerate_face_normal_is_zero() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(face_normal(p, p, p), Vec3::ZERO);
        assert_eq!(face_normal(Vec3::ZERO, Vec3::X, Vec3::X * 2.0), Vec3::ZERO);
    }

    #[test]
    fn finite_or_zero_clears_nan_and_inf() {
        let v = finite_or_zero(Vec3::new(f32::NAN, 2.0, f32::INFINITY));
        assert_eq!(v, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn shared_point_averages_adjacent_faces() {
        // Two triangles folded along the shared edge (0,1).
        let mut s = IndexedSurface::new();
        let a = s.push_point(Vec3::ZERO);
        let b = s.push_point(Vec3::X);
        let c = s.push_point(Vec3::new(0.0, 0.0, -1.0));
        let d = s.push_point(Vec3::new(0.0, 1.0, 1.0));
        s.push_triangle([a, b, c]);
        s.push_triangle([b, a, d]);
        let normals = s.smooth_normals();
        for n in &normals {
            assert!(is_unit_or_zero(n.to_array()));
        }
        // Point c only sees the first (flat, +Y) face.
        assert!((normals[c as usize] - Vec3::Y).length() < 1e-6);
        // Shared points lean between both faces.
        assert!(normals[a as usize].y > 0.0 && normals[a as usize].z < 0.0);
    }

    #[test]
    fn into_mesh_duplicates_vertices_per_triangle() {
        let mut s = IndexedSurface::new();
        for p in [Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::new(1.0, 0.0, 1.0)] {
            s.push_point(p);
        }
        s.push_triangle([0, 2, 1]);
        s.push_triangle([1, 2, 3]);
        let mesh = s.into_mesh(|_, _| [1.0; 4]);
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.normal_lines(2.0).len(), 12);
        assert!(mesh.normals().into_iter().all(is_unit_or_zero));
    }

    #[test]
    fn normal_lines_end_along_normal() {
        let lines = normal_lines([(Vec3::ONE, Vec3::Y)], 20.0);
        assert_eq!(lines, vec![[1.0, 1.0, 1.0], [1.0, 21.0, 1.0]]);
    }
}
