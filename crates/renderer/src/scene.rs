//! What gets drawn: the terrain, the solids placed on it and the mesh cache they share.

use crate::device::GraphicsDevice;
use crate::mesh::MeshBuffers;
use crate::mesh_cache::{MeshBufferCache, MeshHandle};
use engine_core::{Animatable, SolidTransform, TriangleMesh};
use glam::{Mat4, Vec3};

/// Terrain surface and skirt, drawn as two calls.
#[derive(Debug)]
pub struct TerrainDrawable<B> {
    pub surface: MeshBuffers<B>,
    pub skirt: MeshBuffers<B>,
}

impl<B: Clone> TerrainDrawable<B> {
    pub fn upload<D>(device: &D, surface: &TriangleMesh, skirt: &TriangleMesh, normal_length: f32) -> Self
    where
        D: GraphicsDevice<Buffer = B>,
    {
        Self {
            surface: MeshBuffers::upload(device, "Terrain Surface", surface, normal_length),
            skirt: MeshBuffers::upload(device, "Terrain Skirt", skirt, normal_length),
        }
    }

    pub fn meshes(&self) -> [&MeshBuffers<B>; 2] {
        [&self.surface, &self.skirt]
    }
}

/// Geometry a solid draws with.
#[derive(Debug)]
pub enum SolidGeometry<B> {
    /// Cached sub-meshes of a loaded asset, shared with every other instance of it.
    Asset(Vec<MeshHandle<B>>),
    /// A surface of revolution owned by this solid. Drawn shifted down by half its height so
    /// the location marks its vertical centre.
    Revolved { buffers: MeshBuffers<B>, height: f32 },
}

/// A positioned drawable with an optional per-frame animation.
pub struct Solid<B> {
    pub transform: SolidTransform,
    pub geometry: SolidGeometry<B>,
    animation: Option<Box<dyn Animatable>>,
}

impl<B> std::fmt::Debug for Solid<B>
where
    B: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solid")
            .field("transform", &self.transform)
            .field("geometry", &self.geometry)
            .field("animated", &self.animation.is_some())
            .finish()
    }
}

impl<B> Solid<B> {
    pub fn from_asset(transform: SolidTransform, meshes: Vec<MeshHandle<B>>) -> Self {
        Self {
            transform,
            geometry: SolidGeometry::Asset(meshes),
            animation: None,
        }
    }

    pub fn revolved(transform: SolidTransform, buffers: MeshBuffers<B>, height: f32) -> Self {
        Self {
            transform,
            geometry: SolidGeometry::Revolved { buffers, height },
            animation: None,
        }
    }

    pub fn with_animation(mut self, animation: Box<dyn Animatable>) -> Self {
        self.animation = Some(animation);
        self
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }

    /// Run the animation hook, if any.
    pub fn before_draw(&mut self, delta_time: f32) {
        if let Some(animation) = self.animation.as_mut() {
            animation.before_draw(&mut self.transform, delta_time);
        }
    }

    /// Matrix used for drawing; differs from the model matrix only for revolved solids.
    pub fn draw_matrix(&self) -> Mat4 {
        match &self.geometry {
            SolidGeometry::Revolved { height, .. } => {
                Mat4::from_translation(Vec3::new(0.0, -height / 2.0, 0.0)) * self.transform.model_matrix()
            }
            SolidGeometry::Asset(_) => self.transform.model_matrix(),
        }
    }

    /// Populated buffers to draw. Asset slots still waiting for population are skipped.
    pub fn meshes(&self) -> Vec<&MeshBuffers<B>> {
        match &self.geometry {
            SolidGeometry::Asset(handles) => handles.iter().filter_map(|h| h.buffers()).collect(),
            SolidGeometry::Revolved { buffers, .. } => vec![buffers],
        }
    }
}

/// One model-matrix slot and the buffers drawn with it.
#[derive(Debug)]
pub struct DrawItem<'a, B> {
    pub slot: u32,
    pub meshes: Vec<&'a MeshBuffers<B>>,
}

/// Everything the renderer draws in one frame, plus the cache that solids share.
#[derive(Debug)]
pub struct Scene<B> {
    pub terrain: Option<TerrainDrawable<B>>,
    pub solids: Vec<Solid<B>>,
    pub meshes: MeshBufferCache<B>,
}

impl<B> Default for Scene<B> {
    fn default() -> Self {
        Self {
            terrain: None,
            solids: Vec::new(),
            meshes: MeshBufferCache::new(),
        }
    }
}

impl<B: Clone> Scene<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a solid; returns its index in draw order.
    pub fn add_solid(&mut self, solid: Solid<B>) -> usize {
        self.solids.push(solid);
        self.solids.len() - 1
    }

    /// Advance every animated solid by `delta_time` seconds.
    pub fn animate(&mut self, delta_time: f32) {
        for solid in &mut self.solids {
            solid.before_draw(delta_time);
        }
    }

    /// Number of draw calls that carry a model matrix: terrain plus one per solid.
    pub fn model_slots(&self) -> usize {
        1 + self.solids.len()
    }

    /// Slot-ordered draw matrices: identity for the terrain, then each solid in scene order.
    pub fn model_matrices(&self) -> Vec<Mat4> {
        std::iter::once(Mat4::IDENTITY)
            .chain(self.solids.iter().map(Solid::draw_matrix))
            .collect()
    }

    /// Terrain first, then every solid in scene order. Slots index [`Scene::model_matrices`].
    pub fn draw_list(&self) -> Vec<DrawItem<'_, B>> {
        let mut items = Vec::with_capacity(self.model_slots());
        if let Some(terrain) = &self.terrain {
            items.push(DrawItem {
                slot: 0,
                meshes: terrain.meshes().to_vec(),
            });
        }
        for (i, solid) in self.solids.iter().enumerate() {
            items.push(DrawItem {
                slot: i as u32 + 1,
                meshes: solid.meshes(),
            });
        }
        items
    }

    /// Triangles submitted by one colour pass.
    pub fn triangle_count(&self) -> u64 {
        let terrain: u64 = self
            .terrain
            .as_ref()
            .map_or(0, |t| t.meshes().iter().map(|m| m.triangle_count() as u64).sum());
        let solids: u64 = self
            .solids
            .iter()
            .flat_map(|s| s.meshes())
            .map(|m| m.triangle_count() as u64)
            .sum();
        terrain + solids
    }
}
