//! Surfaces of revolution around the Y axis.

use engine_core::{IndexedSurface, TriangleMesh};
use glam::{DVec3, Vec3};

/// Length of the normal-visualisation segments for revolved solids.
pub const REVOLVED_NORMAL_LENGTH: f32 = 0.2;

/// Coordinates closer than this on every axis count as the same point.
const COINCIDENT_EPSILON: f64 = f64::EPSILON * 10.0;
/// Upper bound on profile samples per ring.
pub const MAX_PROFILE_SAMPLES: usize = 1 << 20;

/// A revolved surface and the length of its parameter range.
#[derive(Debug, Clone)]
pub struct RevolvedMesh {
    pub mesh: TriangleMesh,
    /// `|param_max - param_min|`, used to centre the solid vertically when drawn.
    pub height: f32,
}

fn coincident(a: DVec3, b: DVec3) -> bool {
    (a - b).abs().max_element() <= COINCIDENT_EPSILON
}

fn zero_nan(v: DVec3) -> DVec3 {
    DVec3::new(
        if v.x.is_nan() { 0.0 } else { v.x },
        if v.y.is_nan() { 0.0 } else { v.y },
        if v.z.is_nan() { 0.0 } else { v.z },
    )
}

/// Sweep `profile` around the Y axis.
///
/// The profile is sampled at `t = param_min, param_min + step, ...` while `t < param_max`,
/// giving ring points `(cos(theta) * r, t, sin(theta) * r)` for `angular_steps` equally spaced
/// angles. Adjacent rings (the last wrapping to the first) are joined with two triangles per
/// quad; any triangle with two coincident corners is dropped. Triangle colours follow the
/// smooth normals.
pub fn revolve(
    profile: impl Fn(f64) -> f64,
    angular_steps: usize,
    param_min: f64,
    param_max: f64,
    param_step: f64,
) -> RevolvedMesh {
    let height = (param_max - param_min).abs() as f32;
    if angular_steps == 0 || !(param_step.is_finite() && param_step > 0.0) {
        log::warn!("revolve: nothing to sweep (steps {angular_steps}, step {param_step})");
        return RevolvedMesh { mesh: TriangleMesh::new(), height };
    }

    let samples = ((param_max - param_min) / param_step).ceil();
    if !samples.is_finite() || samples > MAX_PROFILE_SAMPLES as f64 {
        log::warn!("revolve: [{param_min}, {param_max}) at step {param_step} needs too many samples");
        return RevolvedMesh { mesh: TriangleMesh::new(), height };
    }
    let params: Vec<f64> = (0..samples.max(0.0) as usize)
        .map(|i| param_min + i as f64 * param_step)
        .take_while(|&t| t < param_max)
        .collect();
    let ring_len = params.len();

    let mut rings = Vec::with_capacity(angular_steps * ring_len);
    for i in 0..angular_steps {
        let theta = i as f64 / angular_steps as f64 * std::f64::consts::TAU;
        for &t in &params {
            let r = profile(t);
            rings.push(zero_nan(DVec3::new(theta.cos() * r, t, theta.sin() * r)));
        }
    }

    let mut surface = IndexedSurface::with_capacity(rings.len(), 2 * angular_steps * ring_len);
    for p in &rings {
        surface.push_point(p.as_vec3());
    }

    let mut dropped = 0usize;
    let mut emit = |surface: &mut IndexedSurface, tri: [usize; 3]| {
        let [a, b, c] = tri.map(|i| rings[i]);
        if coincident(a, b) || coincident(a, c) || coincident(b, c) {
            dropped += 1;
        } else {
            surface.push_triangle(tri.map(|i| i as u32));
        }
    };
    for i in 1..=angular_steps {
        let first = (i - 1) * ring_len;
        let second = (i % angular_steps) * ring_len;
        for j in 1..ring_len {
            let a1 = first + j - 1;
            let b1 = first + j;
            let a2 = second + j - 1;
            let b2 = second + j;
            emit(&mut surface, [a1, b1, a2]);
            emit(&mut surface, [a2, b1, b2]);
        }
    }

    if dropped > 0 {
        log::debug!("revolve: dropped {dropped} degenerate triangles");
    }

    let mesh = surface.into_mesh(|_, n: Vec3| [n.x, n.y, n.z, 1.0]);
    RevolvedMesh { mesh, height }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn constant_profile_is_a_cylinder() {
        let revolved = revolve(|_| 5.0, 16, 0.0, 2.0 * PI, 0.5);
        assert!(!revolved.mesh.is_empty());
        for p in revolved.mesh.positions() {
            let r = (p[0] * p[0] + p[2] * p[2]).sqrt();
            assert!((r - 5.0).abs() < 1e-4, "radius {r}");
        }
        assert!((revolved.height - 2.0 * PI as f32).abs() < 1e-6);
    }

    #[test]
    fn rings_wrap_around() {
        // 13 samples in [0, 2pi) at step 0.5, so 12 quads per seam and 8 seams.
        let revolved = revolve(|_| 5.0, 8, 0.0, 2.0 * PI, 0.5);
        assert_eq!(revolved.mesh.triangle_count(), 2 * 8 * 12);
    }

    #[test]
    fn poles_emit_no_degenerate_triangles() {
        let closed = revolve(|t| t.sin() * 3.0, 12, 0.0, PI + 0.01, PI / 8.0);
        let open = revolve(|_| 3.0, 12, 0.0, PI + 0.01, PI / 8.0);
        assert!(closed.mesh.triangle_count() < open.mesh.triangle_count());
        for tri in closed.mesh.vertices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vec3::from_array(tri[i].position));
            assert!(a != b && a != c && b != c, "coincident corners {a:?} {b:?} {c:?}");
            assert!((b - a).cross(c - a).length() > 0.0);
        }
    }

    #[test]
    fn normals_unit_or_zero_and_nan_profile_zeroed() {
        let revolved = revolve(|t| if t < 1.0 { f64::NAN } else { 2.0 }, 6, 0.0, 3.0, 0.5);
        for n in revolved.mesh.normals() {
            let v = Vec3::from_array(n);
            assert!(!v.is_nan());
            assert!(v == Vec3::ZERO || (v.length() - 1.0).abs() < 1e-5);
        }
        for p in revolved.mesh.positions() {
            assert!(p.iter().all(|c| c.is_finite()));
        }
    }

    #[test]
    fn normal_lines_use_short_segments() {
        let revolved = revolve(|_| 1.0, 4, 0.0, 1.0, 0.5);
        let lines = revolved.mesh.normal_lines(REVOLVED_NORMAL_LENGTH);
        let start = Vec3::from_array(lines[0]);
        let end = Vec3::from_array(lines[1]);
        assert!(((end - start).length() - REVOLVED_NORMAL_LENGTH).abs() < 1e-5);
    }

    #[test]
    fn step_below_precision_still_terminates() {
        // Near 1e17 one ulp is 16, so accumulating the step would never advance.
        let revolved = revolve(|_| 1.0, 4, 1.0e17, 1.0e17 + 64.0, 1.0);
        assert_eq!(revolved.height, 64.0);
        assert!(revolved.mesh.positions().iter().all(|p| p.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn unbounded_range_yields_empty_mesh() {
        assert!(revolve(|_| 1.0, 4, 0.0, f64::INFINITY, 1.0).mesh.is_empty());
        assert!(revolve(|_| 1.0, 4, 0.0, 1.0e12, 1.0e-3).mesh.is_empty());
        assert!(revolve(|_| 1.0, 4, 2.0, 1.0, 0.5).mesh.is_empty());
    }

    #[test]
    fn invalid_step_yields_empty_mesh() {
        assert!(revolve(|_| 1.0, 8, 0.0, 1.0, 0.0).mesh.is_empty());
        assert!(revolve(|_| 1.0, 0, 0.0, 1.0, 0.1).mesh.is_empty());
    }
}
