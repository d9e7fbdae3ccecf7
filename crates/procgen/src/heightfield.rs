//! Noise heightfield generation.
//!
//! **Seed-based determinism:** every noise layer is derived from the caller's seed, so the same
//! `(width, height, scale, seed)` always produces a bit-identical grid. The colour layer uses an
//! independently derived seed so its pattern is decorrelated from the elevation pattern.

use image::{GrayImage, Luma};
use noise::{NoiseFn, Perlin, Simplex};
use thiserror::Error;

/// Derive a deterministic u32 noise seed from a world seed and an offset.
/// Same (seed, offset) always gives the same result so terrain is reproducible.
#[inline]
fn deterministic_noise_seed(seed: u64, offset: u64) -> u32 {
    ((seed.wrapping_add(offset))
        .wrapping_mul(0x9e3779b97f4a7c15_u64)
        .wrapping_add(offset.wrapping_mul(0x6c078965_u64))
        >> 32) as u32
}

#[derive(Debug, Error, PartialEq)]
pub enum HeightfieldError {
    #[error("noise scale must be a positive finite number, got {0}")]
    InvalidScale(f64),
    #[error("heightfield must be at least 2x2 to triangulate, got {width}x{height}")]
    TooSmall { width: usize, height: usize },
}

/// One grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightSample {
    /// Combined noise value, not yet scaled into world units.
    pub elevation: f32,
    /// Colour interpolation factor in `[0, 1]`.
    pub color_blend: f32,
}

/// A `width x height` grid of elevation and colour-blend values. Read-only once generated.
#[derive(Debug, Clone)]
pub struct Heightfield {
    width: usize,
    height: usize,
    seed: u64,
    /// Row-major: index = y * width + x.
    samples: Vec<HeightSample>,
}

impl Heightfield {
    /// Sample two noise layers at `(x / scale, y / scale)` for every cell.
    ///
    /// Elevation is a smooth simplex base remapped to `[0, 1]` plus a perlin detail layer
    /// amplified by 2. The colour blend is a separately seeded perlin sample remapped to `[0, 1]`.
    pub fn generate(width: usize, height: usize, scale: f64, seed: u64) -> Result<Self, HeightfieldError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(HeightfieldError::InvalidScale(scale));
        }
        if width < 2 || height < 2 {
            return Err(HeightfieldError::TooSmall { width, height });
        }

        let base = Simplex::new(deterministic_noise_seed(seed, 0));
        let detail = Perlin::new(deterministic_noise_seed(seed, 1));
        let color = Perlin::new(deterministic_noise_seed(seed, 2));

        let mut samples = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let point = [x as f64 / scale, y as f64 / scale];
                let elevation = (base.get(point) + 1.0) / 2.0 + detail.get(point) * 2.0;
                let color_blend = ((color.get(point) + 1.0) / 2.0).clamp(0.0, 1.0);
                samples.push(HeightSample {
                    elevation: elevation as f32,
                    color_blend: color_blend as f32,
                });
            }
        }

        log::debug!("Generated {}x{} heightfield (scale {}, seed {})", width, height, scale, seed);
        Ok(Self { width, height, seed, samples })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Sample at grid cell `(x, y)`. Panics if out of range.
    pub fn sample(&self, x: usize, y: usize) -> HeightSample {
        assert!(x < self.width && y < self.height, "cell ({x}, {y}) outside {}x{}", self.width, self.height);
        self.samples[y * self.width + x]
    }

    pub fn elevation(&self, x: usize, y: usize) -> f32 {
        self.sample(x, y).elevation
    }

    pub fn color_blend(&self, x: usize, y: usize) -> f32 {
        self.sample(x, y).color_blend
    }

    /// Elevations as a grayscale preview image, one pixel per cell.
    pub fn elevation_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let value = self.elevation(x as usize, y as usize);
            Luma([(value * 255.0).floor().clamp(0.0, 255.0) as u8])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_is_bit_identical() {
        let a = Heightfield::generate(4, 4, 1.0, 1234).unwrap();
        let b = Heightfield::generate(4, 4, 1.0, 1234).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(a.elevation(x, y).to_bits(), b.elevation(x, y).to_bits());
                assert_eq!(a.color_blend(x, y).to_bits(), b.color_blend(x, y).to_bits());
            }
        }
    }

    #[test]
    fn different_seed_changes_grid() {
        let a = Heightfield::generate(16, 16, 5.0, 11111).unwrap();
        let b = Heightfield::generate(16, 16, 5.0, 22222).unwrap();
        let differs = (0..16).any(|y| (0..16).any(|x| a.elevation(x, y) != b.elevation(x, y)));
        assert!(differs, "different seeds should produce different elevations");
    }

    #[test]
    fn small_grid_reseeded_differs() {
        let a = Heightfield::generate(4, 4, 1.0, 1).unwrap();
        let b = Heightfield::generate(4, 4, 1.0, 2).unwrap();
        let cells = || (0..4).flat_map(|y| (0..4).map(move |x| (x, y)));
        assert!(cells().any(|(x, y)| a.elevation(x, y) != b.elevation(x, y)));
        for (x, y) in cells() {
            for field in [&a, &b] {
                assert!((0.0..=1.0).contains(&field.color_blend(x, y)));
            }
        }
    }

    #[test]
    fn color_blend_varies_between_lattice_points() {
        // Perlin is zero on integer lattice points, so a unit scale would give a flat 0.5.
        let field = Heightfield::generate(12, 12, 3.7, 5).unwrap();
        let first = field.color_blend(0, 0);
        assert!((0..12).any(|y| (0..12).any(|x| field.color_blend(x, y) != first)));
    }

    #[test]
    fn color_blend_in_unit_range() {
        let field = Heightfield::generate(20, 12, 3.0, 7).unwrap();
        for y in 0..12 {
            for x in 0..20 {
                let c = field.color_blend(x, y);
                assert!((0.0..=1.0).contains(&c), "blend {c} out of range");
            }
        }
    }

    #[test]
    fn rejects_bad_scale_and_size() {
        assert_eq!(Heightfield::generate(4, 4, 0.0, 1).unwrap_err(), HeightfieldError::InvalidScale(0.0));
        assert!(matches!(Heightfield::generate(4, 4, f64::NAN, 1), Err(HeightfieldError::InvalidScale(_))));
        assert_eq!(
            Heightfield::generate(1, 8, 1.0, 1).unwrap_err(),
            HeightfieldError::TooSmall { width: 1, height: 8 }
        );
    }

    #[test]
    fn elevation_image_matches_grid() {
        let field = Heightfield::generate(6, 3, 2.0, 99).unwrap();
        let image = field.elevation_image();
        assert_eq!(image.dimensions(), (6, 3));
        let expected = (field.elevation(5, 2) * 255.0).floor().clamp(0.0, 255.0) as u8;
        assert_eq!(image.get_pixel(5, 2).0[0], expected);
    }
}
