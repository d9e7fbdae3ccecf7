//! Terrain mesh built from a heightfield: a lit surface plus a skirt that closes the edges.

use engine_core::{IndexedSurface, TriangleMesh};
use glam::Vec3;

use crate::heightfield::Heightfield;

/// World-space Y of the skirt bottom and floor.
pub const SKIRT_BOTTOM: f32 = -500.0;
/// Flat, low-saturation skirt colour.
pub const SKIRT_COLOR: [f32; 4] = [0.2, 0.2, 0.2, 1.0];
/// Length of the normal-visualisation segments.
pub const TERRAIN_NORMAL_LENGTH: f32 = 20.0;

const LIGHT_GREEN: [f32; 4] = [169.0 / 255.0, 224.0 / 255.0, 92.0 / 255.0, 1.0];
const DARK_GREEN: [f32; 4] = [71.0 / 255.0, 135.0 / 255.0, 51.0 / 255.0, 1.0];

fn lerp_color(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        (1.0 - t) * a[0] + b[0] * t,
        (1.0 - t) * a[1] + b[1] * t,
        (1.0 - t) * a[2] + b[2] * t,
        1.0,
    ]
}

/// Surface and skirt meshes ready for upload. They are drawn as separate calls.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    pub surface: TriangleMesh,
    pub skirt: TriangleMesh,
    /// World extent along X (`width * scale_x`).
    pub size_x: f32,
    /// World extent along Z (`height * scale_y`).
    pub size_y: f32,
    scale: Vec3,
    elevations: Vec<f32>,
    width: usize,
    height: usize,
}

impl TerrainMesh {
    /// Triangulate the heightfield. Grid cell `(x, y)` maps to
    /// `(x * scale_x, elevation * scale_height, y * scale_y)`.
    pub fn build(field: &Heightfield, scale_x: f32, scale_y: f32, scale_height: f32) -> Self {
        let (width, height) = (field.width(), field.height());
        let point = |x: usize, y: usize| {
            Vec3::new(x as f32 * scale_x, field.elevation(x, y) * scale_height, y as f32 * scale_y)
        };

        // Surface: one shared point per cell so neighbouring triangles blend their normals.
        let mut surface = IndexedSurface::with_capacity(width * height, 2 * (width - 1) * (height - 1));
        let mut blends = Vec::with_capacity(width * height);
        for x in 0..width {
            for y in 0..height {
                surface.push_point(point(x, y));
                blends.push(field.color_blend(x, y));
            }
        }
        let index = |x: usize, y: usize| (x * height + y) as u32;
        for x in 1..width {
            for y in 1..height {
                let a1 = index(x - 1, y - 1);
                let b1 = index(x - 1, y);
                let a2 = index(x, y - 1);
                let b2 = index(x, y);
                surface.push_triangle([a1, b1, a2]);
                surface.push_triangle([a2, b1, b2]);
            }
        }
        let surface = surface.into_mesh(|i, _| lerp_color(LIGHT_GREEN, DARK_GREEN, blends[i]));

        let skirt = build_skirt(width, height, scale_x, scale_y, point);

        log::info!(
            "Terrain mesh: {} surface triangles, {} skirt triangles",
            surface.triangle_count(),
            skirt.triangle_count()
        );

        let mut elevations = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                elevations.push(field.elevation(x, y));
            }
        }

        Self {
            surface,
            skirt,
            size_x: width as f32 * scale_x,
            size_y: height as f32 * scale_y,
            scale: Vec3::new(scale_x, scale_height, scale_y),
            elevations,
            width,
            height,
        }
    }

    /// World position of grid cell `(x, y)` on the surface.
    pub fn world_point(&self, x: usize, y: usize) -> Vec3 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        Vec3::new(
            x as f32 * self.scale.x,
            self.elevations[y * self.width + x] * self.scale.y,
            y as f32 * self.scale.z,
        )
    }

    /// Grid dimensions `(width, height)`.
    pub fn grid_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/// Vertical walls down to [`SKIRT_BOTTOM`] along all four edges plus a two-triangle floor.
/// Points are shared only within one wall quad.
fn build_skirt(
    width: usize,
    height: usize,
    scale_x: f32,
    scale_y: f32,
    point: impl Fn(usize, usize) -> Vec3,
) -> TriangleMesh {
    let mut skirt = IndexedSurface::with_capacity(4 * 2 * (width + height) + 6, 4 * (width + height));

    let mut quad = |a1: Vec3, b1: Vec3, a2: Vec3, b2: Vec3, outward_flip: bool| {
        let a1 = skirt.push_point(a1);
        let b1 = skirt.push_point(b1);
        let a2 = skirt.push_point(a2);
        let b2 = skirt.push_point(b2);
        if outward_flip {
            skirt.push_triangle([b2, b1, a2]);
            skirt.push_triangle([a2, b1, a1]);
        } else {
            skirt.push_triangle([a1, b1, a2]);
            skirt.push_triangle([a2, b1, b2]);
        }
    };

    // Walls along X at the near (y = 0) and far (y = height - 1) edges.
    for (y, flip) in [(0, false), (height - 1, true)] {
        for x in 1..width {
            let z = y as f32 * scale_y;
            quad(
                Vec3::new((x - 1) as f32 * scale_x, SKIRT_BOTTOM, z),
                point(x - 1, y),
                Vec3::new(x as f32 * scale_x, SKIRT_BOTTOM, z),
                point(x, y),
                flip,
            );
        }
    }

    // Walls along Z at the near (x = 0) and far (x = width - 1) edges. Winding is mirrored
    // relative to the X walls because the quad corners run along the other axis.
    for (x, flip) in [(0, true), (width - 1, false)] {
        for y in 1..height {
            let wx = x as f32 * scale_x;
            quad(
                Vec3::new(wx, SKIRT_BOTTOM, (y - 1) as f32 * scale_y),
                point(x, y - 1),
                Vec3::new(wx, SKIRT_BOTTOM, y as f32 * scale_y),
                point(x, y),
                flip,
            );
        }
    }

    let far_x = (width - 1) as f32 * scale_x;
    let far_z = (height - 1) as f32 * scale_y;
    let corner = |x: f32, z: f32| Vec3::new(x, SKIRT_BOTTOM, z);
    let c00 = skirt.push_point(corner(0.0, 0.0));
    let c10 = skirt.push_point(corner(far_x, 0.0));
    let c01 = skirt.push_point(corner(0.0, far_z));
    let c11 = skirt.push_point(corner(far_x, far_z));
    skirt.push_triangle([c10, c01, c00]);
    skirt.push_triangle([c10, c11, c01]);

    skirt.into_mesh(|_, _| SKIRT_COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(width: usize, height: usize) -> Heightfield {
        Heightfield::generate(width, height, 3.0, 424242).unwrap()
    }

    fn is_unit_or_zero(n: [f32; 3]) -> bool {
        let v = Vec3::from_array(n);
        !v.is_nan() && (v == Vec3::ZERO || (v.length() - 1.0).abs() < 1e-5)
    }

    #[test]
    fn surface_vertex_count() {
        for (w, h) in [(2, 2), (4, 4), (7, 3), (10, 25)] {
            let mesh = TerrainMesh::build(&field(w, h), 40.0, 40.0, 200.0);
            assert_eq!(mesh.surface.vertex_count(), 6 * (w - 1) * (h - 1), "{w}x{h}");
            assert_eq!(mesh.skirt.vertex_count(), 12 * (w - 1) + 12 * (h - 1) + 6, "{w}x{h}");
        }
    }

    #[test]
    fn normals_are_unit_or_zero() {
        let mesh = TerrainMesh::build(&field(12, 9), 40.0, 40.0, 200.0);
        assert!(mesh.surface.normals().into_iter().all(is_unit_or_zero));
        assert!(mesh.skirt.normals().into_iter().all(is_unit_or_zero));
    }

    #[test]
    fn flat_surface_faces_up() {
        let mesh = TerrainMesh::build(&field(5, 5), 1.0, 1.0, 0.0);
        for n in mesh.surface.normals() {
            assert!((Vec3::from_array(n) - Vec3::Y).length() < 1e-5);
        }
    }

    #[test]
    fn skirt_walls_face_outward() {
        let mesh = TerrainMesh::build(&field(4, 4), 10.0, 10.0, 0.0);
        let faces: Vec<Vec3> = mesh
            .skirt
            .vertices
            .chunks(3)
            .map(|t| {
                engine_core::face_normal(
                    Vec3::from_array(t[0].position),
                    Vec3::from_array(t[1].position),
                    Vec3::from_array(t[2].position),
                )
            })
            .collect();
        // 3 quads per wall, two triangles each: near X wall, far X wall, near Z wall, far Z wall.
        let expected = [-Vec3::Z, Vec3::Z, -Vec3::X, Vec3::X];
        for (wall, dir) in expected.iter().enumerate() {
            for face in &faces[wall * 6..wall * 6 + 6] {
                assert!((*face - *dir).length() < 1e-5, "wall {wall}: {face:?}");
            }
        }
        // Floor points down.
        for face in &faces[24..] {
            assert!((*face + Vec3::Y).length() < 1e-5);
        }
    }

    #[test]
    fn skirt_uses_flat_color_and_surface_stays_green() {
        let mesh = TerrainMesh::build(&field(6, 6), 40.0, 40.0, 200.0);
        assert!(mesh.skirt.colors().iter().all(|c| *c == SKIRT_COLOR));
        for c in mesh.surface.colors() {
            assert!(c[1] >= DARK_GREEN[1] - 1e-5 && c[1] <= LIGHT_GREEN[1] + 1e-5);
            assert_eq!(c[3], 1.0);
        }
    }

    #[test]
    fn world_point_and_extent() {
        let f = field(5, 4);
        let mesh = TerrainMesh::build(&f, 40.0, 20.0, 200.0);
        assert_eq!(mesh.size_x, 200.0);
        assert_eq!(mesh.size_y, 80.0);
        assert_eq!(mesh.world_point(2, 3), Vec3::new(80.0, f.elevation(2, 3) * 200.0, 60.0));
        let lines = mesh.skirt.normal_lines(TERRAIN_NORMAL_LENGTH);
        assert_eq!(lines.len(), 2 * mesh.skirt.vertex_count());
    }
}
