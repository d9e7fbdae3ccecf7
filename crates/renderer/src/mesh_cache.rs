//! Shared GPU geometry for solids that reference the same asset.

use crate::mesh::MeshBuffers;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Identity of one cached mesh: the asset it came from and the sub-mesh name within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeshKey {
    pub asset: String,
    pub sub_mesh: String,
}

impl MeshKey {
    pub fn new(asset: &str, sub_mesh: &str) -> Self {
        Self {
            asset: asset.to_string(),
            sub_mesh: sub_mesh.to_string(),
        }
    }
}

/// A cache entry. Its buffers are written at most once, by whichever caller populates first.
#[derive(Debug)]
pub struct MeshSlot<B> {
    key: MeshKey,
    buffers: OnceLock<MeshBuffers<B>>,
}

/// Shared reference to a cache entry. Two handles are the same entry iff `Arc::ptr_eq`.
pub type MeshHandle<B> = Arc<MeshSlot<B>>;

impl<B> MeshSlot<B> {
    pub fn key(&self) -> &MeshKey {
        &self.key
    }

    /// Fill the slot. `build` only runs if the slot is still empty; returns whether it ran.
    pub fn populate(&self, build: impl FnOnce() -> MeshBuffers<B>) -> bool {
        let mut built = false;
        self.buffers.get_or_init(|| {
            built = true;
            build()
        });
        built
    }

    /// The uploaded buffers, or `None` until the slot is populated.
    pub fn buffers(&self) -> Option<&MeshBuffers<B>> {
        self.buffers.get()
    }

    pub fn is_populated(&self) -> bool {
        self.buffers.get().is_some()
    }

    pub fn vertex_count(&self) -> u32 {
        self.buffers().map_or(0, |b| b.vertex_count)
    }
}

/// Registry of `(asset, sub-mesh)` to GPU buffers. Entries live as long as the cache.
#[derive(Debug)]
pub struct MeshBufferCache<B> {
    entries: HashMap<MeshKey, MeshHandle<B>>,
}

impl<B> Default for MeshBufferCache<B> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<B> MeshBufferCache<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry for the key, creating an empty one if needed.
    ///
    /// `is_new == true` tells the caller it owns population of the returned slot; every
    /// later call for the same key gets the same handle with `is_new == false` and must
    /// not upload geometry again.
    pub fn get_or_create(&mut self, asset: &str, sub_mesh: &str) -> (MeshHandle<B>, bool) {
        let key = MeshKey::new(asset, sub_mesh);
        if let Some(handle) = self.entries.get(&key) {
            return (Arc::clone(handle), false);
        }
        log::debug!("Mesh cache: new entry {}/{}", asset, sub_mesh);
        let handle = Arc::new(MeshSlot {
            key: key.clone(),
            buffers: OnceLock::new(),
        });
        self.entries.insert(key, Arc::clone(&handle));
        (handle, true)
    }

    pub fn get(&self, asset: &str, sub_mesh: &str) -> Option<MeshHandle<B>> {
        self.entries.get(&MeshKey::new(asset, sub_mesh)).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::RecordingDevice;
    use engine_core::{TriangleMesh, TriangleVertex, Vec3};

    fn triangle() -> TriangleMesh {
        let mut mesh = TriangleMesh::new();
        let v = |p| TriangleVertex::new(p, Vec3::Y, [1.0; 4]);
        mesh.push_triangle([v(Vec3::ZERO), v(Vec3::Z), v(Vec3::X)]);
        mesh
    }

    #[test]
    fn second_lookup_returns_same_handle() {
        let mut cache = MeshBufferCache::<u32>::new();
        let (first, first_new) = cache.get_or_create("monkey.obj", "Suzanne");
        let (second, second_new) = cache.get_or_create("monkey.obj", "Suzanne");
        assert!(first_new);
        assert!(!second_new);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_differ_by_asset_and_sub_mesh() {
        let mut cache = MeshBufferCache::<u32>::new();
        let (a, _) = cache.get_or_create("tree.obj", "Trunk");
        let (b, b_new) = cache.get_or_create("tree.obj", "Leaves");
        let (c, c_new) = cache.get_or_create("bush.obj", "Trunk");
        assert!(b_new && c_new);
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 3);
        assert_eq!(b.key(), &MeshKey::new("tree.obj", "Leaves"));
    }

    #[test]
    fn population_happens_once() {
        let device = RecordingDevice::default();
        let mut cache = MeshBufferCache::new();
        let mesh = triangle();

        let (first, _) = cache.get_or_create("tree.obj", "Trunk");
        assert!(!first.is_populated());
        assert!(first.populate(|| MeshBuffers::upload(&device, "Trunk", &mesh, 1.0)));
        let uploads = device.upload_count();

        let (second, is_new) = cache.get_or_create("tree.obj", "Trunk");
        assert!(!is_new);
        assert!(!second.populate(|| MeshBuffers::upload(&device, "Trunk", &mesh, 1.0)));
        assert_eq!(device.upload_count(), uploads);

        let a = first.buffers().unwrap();
        let b = second.buffers().unwrap();
        assert_eq!(a.positions, b.positions);
        assert_eq!(second.vertex_count(), 3);
    }
}
