//! Scene construction: terrain, planted trees, the revolved solid and the tumbling showcase.

use crate::config::{TreeConfig, ViewerConfig};
use anyhow::Result;
use engine_core::{SolidTransform, Tumble};
use glam::Vec3;
use procgen::{revolve, Heightfield, TerrainMesh, REVOLVED_NORMAL_LENGTH, TERRAIN_NORMAL_LENGTH};
use rand::prelude::*;
use renderer::{AssetLoader, DirectoryAssets, GraphicsDevice, MeshBuffers, Scene, Solid, TerrainDrawable};

/// Built scene plus where the camera should start.
pub struct World<B> {
    pub scene: Scene<B>,
    pub camera_start: Vec3,
}

/// Random tree transforms standing on grid points of the terrain.
pub fn plant_trees<R: Rng>(terrain: &TerrainMesh, rng: &mut R, config: &TreeConfig) -> Vec<SolidTransform> {
    let (width, height) = terrain.grid_size();
    let (min, max) = if config.min_scale < config.max_scale {
        (config.min_scale, config.max_scale)
    } else {
        (config.min_scale, config.min_scale + f32::EPSILON)
    };
    (0..config.count)
        .map(|_| {
            let point = terrain.world_point(rng.gen_range(0..width), rng.gen_range(0..height));
            let mut transform = SolidTransform::from_location(point);
            transform.set_scale(Vec3::splat(rng.gen_range(min..max)));
            transform
        })
        .collect()
}

/// Generate the terrain and populate the scene.
pub fn build_world<D: GraphicsDevice>(device: &D, config: &ViewerConfig) -> Result<World<D::Buffer>> {
    let seed = config.terrain.seed.unwrap_or_else(rand::random);
    let field = Heightfield::generate(
        config.terrain.grid_width,
        config.terrain.grid_height,
        config.terrain.noise_scale,
        seed,
    )?;
    log::info!(
        "Generated {}x{} heightfield (seed {})",
        field.width(),
        field.height(),
        field.seed()
    );
    if let Some(path) = &config.heightmap_png {
        match field.elevation_image().save(path) {
            Ok(()) => log::info!("Saved heightmap preview to {}", path),
            Err(e) => log::warn!("Could not save heightmap to {}: {}", path, e),
        }
    }

    let terrain = TerrainMesh::build(
        &field,
        config.terrain.scale_x,
        config.terrain.scale_z,
        config.terrain.scale_height,
    );
    let mut scene = Scene::new();
    scene.terrain = Some(TerrainDrawable::upload(
        device,
        &terrain.surface,
        &terrain.skirt,
        TERRAIN_NORMAL_LENGTH,
    ));

    let (width, height) = terrain.grid_size();
    let centre = terrain.world_point(width / 2, height / 2);

    let mut loader = AssetLoader::new(DirectoryAssets::new(&config.asset_dir));
    let mut rng = match config.terrain.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    for transform in plant_trees(&terrain, &mut rng, &config.trees) {
        match loader.load(device, &mut scene.meshes, &config.trees.asset) {
            Ok(meshes) => {
                scene.add_solid(Solid::from_asset(transform, meshes));
            }
            Err(e) => {
                log::warn!("{}; skipping trees", e);
                break;
            }
        }
    }

    let revolved_config = &config.revolved;
    if revolved_config.enabled {
        let (amplitude, period) = (revolved_config.amplitude, revolved_config.period);
        let revolved = revolve(
            |t| (t / period).sin() * amplitude,
            revolved_config.angular_steps,
            0.0,
            revolved_config.param_max,
            revolved_config.param_step,
        );
        let buffers = MeshBuffers::upload(device, "Revolved Solid", &revolved.mesh, REVOLVED_NORMAL_LENGTH);
        let location = centre + Vec3::Y * (revolved.height / 2.0);
        scene.add_solid(Solid::revolved(
            SolidTransform::from_location(location),
            buffers,
            revolved.height,
        ));
    }

    if let Some(asset) = &config.showcase.asset {
        match loader.load(device, &mut scene.meshes, asset) {
            Ok(meshes) => {
                let mut transform = SolidTransform::from_location(centre + Vec3::Y * config.showcase.height_above);
                transform.set_scale(Vec3::splat(config.showcase.scale));
                let solid = Solid::from_asset(transform, meshes)
                    .with_animation(Box::new(Tumble::new(config.showcase.tumble_rate)));
                scene.add_solid(solid);
            }
            Err(e) => log::warn!("{}; skipping showcase", e),
        }
    }

    log::info!(
        "Scene ready: {} solids, {} cached sub-meshes, {} triangles",
        scene.solids.len(),
        scene.meshes.len(),
        scene.triangle_count()
    );

    Ok(World {
        scene,
        camera_start: centre + Vec3::Y * config.showcase.camera_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trees_stand_on_the_terrain() {
        let field = Heightfield::generate(8, 6, 4.0, 3).unwrap();
        let terrain = TerrainMesh::build(&field, 10.0, 10.0, 50.0);
        let mut rng = StdRng::seed_from_u64(11);
        let config = TreeConfig {
            count: 40,
            ..Default::default()
        };
        let trees = plant_trees(&terrain, &mut rng, &config);
        assert_eq!(trees.len(), 40);
        for tree in &trees {
            let location = tree.location();
            let (x, z) = ((location.x / 10.0) as usize, (location.z / 10.0) as usize);
            assert!(x < 8 && z < 6);
            assert_eq!(location, terrain.world_point(x, z));
            let scale = tree.scale().x;
            assert!((3.0..6.0).contains(&scale));
            assert_eq!(tree.scale(), Vec3::splat(scale));
        }
    }

    #[test]
    fn seeded_planting_repeats() {
        let field = Heightfield::generate(5, 5, 2.0, 9).unwrap();
        let terrain = TerrainMesh::build(&field, 1.0, 1.0, 1.0);
        let config = TreeConfig::default();
        let a = plant_trees(&terrain, &mut StdRng::seed_from_u64(1), &config);
        let b = plant_trees(&terrain, &mut StdRng::seed_from_u64(1), &config);
        let locations = |t: &[SolidTransform]| t.iter().map(SolidTransform::location).collect::<Vec<_>>();
        assert_eq!(locations(&a), locations(&b));
    }
}
