//! Polygon mesh assets (Wavefront OBJ subset) and their ingestion into the mesh cache.
//!
//! Supported records: `o name`, `v x y z`, `vn x y z`, `vt u v` and `f a/b/c ...` with 3 or 4
//! corners. Anything else is skipped. Position, normal and uv lists are shared by every
//! sub-mesh in the file, as in OBJ.

use crate::device::GraphicsDevice;
use crate::error::AssetError;
use crate::mesh::MeshBuffers;
use crate::mesh_cache::{MeshBufferCache, MeshHandle};
use engine_core::{finite_or_zero, normal_lines};
use glam::{Vec2, Vec3};
use std::collections::HashMap;
use std::path::PathBuf;

/// Sub-mesh name for faces that appear before any `o` record.
pub const DEFAULT_SUB_MESH: &str = "default";
/// Length of the normal-visualisation segments for assets.
pub const ASSET_NORMAL_LENGTH: f32 = 1.0;

/// Indices of one face corner, already converted to 0-based. `None` = absent or unparsable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaceCorner {
    pub position: Option<usize>,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjSubMesh {
    pub name: String,
    pub faces: Vec<Vec<FaceCorner>>,
}

/// Parsed asset text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjDocument {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub sub_meshes: Vec<ObjSubMesh>,
}

/// Flat per-vertex attribute lists for one sub-mesh, ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubMeshGeometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub lines: Vec<[f32; 3]>,
}

fn parse_float(token: Option<&str>) -> f32 {
    token.and_then(|t| t.parse().ok()).unwrap_or(f32::NAN)
}

fn parse_index(part: Option<&str>) -> Option<usize> {
    let one_based: usize = part?.parse().ok()?;
    one_based.checked_sub(1)
}

fn parse_corner(token: &str) -> FaceCorner {
    let mut parts = token.split('/');
    FaceCorner {
        position: parse_index(parts.next()),
        uv: parse_index(parts.next()),
        normal: parse_index(parts.next()),
    }
}

impl ObjDocument {
    /// Parse asset text. Unparsable numbers become NaN and are zeroed on triangulation.
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::default();
        let mut current: Option<usize> = None;

        for line in text.lines() {
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("o") => {
                    let name = tokens.next().unwrap_or(DEFAULT_SUB_MESH);
                    // A repeated name continues the existing sub-mesh.
                    current = Some(match doc.sub_meshes.iter().position(|s| s.name == name) {
                        Some(index) => index,
                        None => {
                            doc.sub_meshes.push(ObjSubMesh {
                                name: name.to_string(),
                                faces: Vec::new(),
                            });
                            doc.sub_meshes.len() - 1
                        }
                    });
                }
                Some("v") => doc.positions.push(Vec3::new(
                    parse_float(tokens.next()),
                    parse_float(tokens.next()),
                    parse_float(tokens.next()),
                )),
                Some("vn") => doc.normals.push(Vec3::new(
                    parse_float(tokens.next()),
                    parse_float(tokens.next()),
                    parse_float(tokens.next()),
                )),
                Some("vt") => doc.uvs.push(Vec2::new(parse_float(tokens.next()), parse_float(tokens.next()))),
                Some("f") => {
                    let face: Vec<FaceCorner> = tokens.map(parse_corner).collect();
                    let index = match current {
                        Some(index) => index,
                        None => {
                            doc.sub_meshes.push(ObjSubMesh {
                                name: DEFAULT_SUB_MESH.to_string(),
                                faces: Vec::new(),
                            });
                            let index = doc.sub_meshes.len() - 1;
                            current = Some(index);
                            index
                        }
                    };
                    doc.sub_meshes[index].faces.push(face);
                }
                _ => {}
            }
        }
        doc
    }

    /// Expand a sub-mesh into flat triangle attributes. Triangles pass through, quads
    /// `(a, b, c, d)` become `(a, b, c)` and `(c, d, a)`, other polygons are skipped.
    /// Missing or out-of-range indices contribute zero vectors.
    pub fn triangulate(&self, sub_mesh: &ObjSubMesh) -> SubMeshGeometry {
        let mut geometry = SubMeshGeometry::default();
        let mut bad_indices = 0usize;
        let mut skipped_faces = 0usize;

        let mut lookup3 = |list: &[Vec3], index: Option<usize>| match index.and_then(|i| list.get(i)) {
            Some(v) => finite_or_zero(*v),
            None => {
                bad_indices += 1;
                Vec3::ZERO
            }
        };
        let lookup_uv = |index: Option<usize>| {
            index
                .and_then(|i| self.uvs.get(i))
                .map(|uv| [if uv.x.is_finite() { uv.x } else { 0.0 }, if uv.y.is_finite() { uv.y } else { 0.0 }])
                .unwrap_or([0.0, 0.0])
        };

        let mut corners: Vec<(Vec3, Vec3)> = Vec::new();
        for face in &sub_mesh.faces {
            let order: &[usize] = match face.len() {
                3 => &[0, 1, 2],
                4 => &[0, 1, 2, 2, 3, 0],
                _ => {
                    skipped_faces += 1;
                    continue;
                }
            };
            for &i in order {
                let corner = face[i];
                let position = lookup3(&self.positions, corner.position);
                let normal = lookup3(&self.normals, corner.normal);
                geometry.positions.push(position.to_array());
                geometry.normals.push(normal.to_array());
                geometry.uvs.push(lookup_uv(corner.uv));
                corners.push((position, normal));
            }
        }
        geometry.lines = normal_lines(corners, ASSET_NORMAL_LENGTH);

        if bad_indices > 0 {
            log::warn!("Sub-mesh {:?}: {} missing or out-of-range indices zeroed", sub_mesh.name, bad_indices);
        }
        if skipped_faces > 0 {
            log::warn!("Sub-mesh {:?}: skipped {} faces that are not triangles or quads", sub_mesh.name, skipped_faces);
        }
        geometry
    }
}

/// Supplies raw asset text by identity.
pub trait AssetSource {
    fn read_text(&self, identity: &str) -> std::io::Result<String>;
}

/// Reads assets from files below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirectoryAssets {
    fn read_text(&self, identity: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.root.join(identity))
    }
}

/// Loads assets into a [`MeshBufferCache`], parsing each asset only while it still has
/// unpopulated sub-meshes.
pub struct AssetLoader<S> {
    source: S,
    /// Sub-mesh names per asset, in file order.
    sub_meshes: HashMap<String, Vec<String>>,
}

impl<S: AssetSource> AssetLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            sub_meshes: HashMap::new(),
        }
    }

    /// Handles for every sub-mesh of the asset, in file order.
    ///
    /// The first load of an asset reads and parses it and uploads each sub-mesh whose cache
    /// entry is new. Later loads return the cached handles without touching the source.
    pub fn load<D: GraphicsDevice>(
        &mut self,
        device: &D,
        cache: &mut MeshBufferCache<D::Buffer>,
        identity: &str,
    ) -> Result<Vec<MeshHandle<D::Buffer>>, AssetError> {
        if let Some(names) = self.sub_meshes.get(identity) {
            let handles: Vec<_> = names.iter().map(|name| cache.get_or_create(identity, name).0).collect();
            if handles.iter().all(|h| h.is_populated()) {
                return Ok(handles);
            }
        }

        let text = self.source.read_text(identity).map_err(|source| AssetError::Unreachable {
            identity: identity.to_string(),
            source,
        })?;
        let doc = ObjDocument::parse(&text);

        let mut handles = Vec::with_capacity(doc.sub_meshes.len());
        for sub_mesh in &doc.sub_meshes {
            let (handle, is_new) = cache.get_or_create(identity, &sub_mesh.name);
            if is_new || !handle.is_populated() {
                let key = handle.key();
                let label = format!("{}/{}", key.asset, key.sub_mesh);
                handle.populate(|| MeshBuffers::from_geometry(device, &label, &doc.triangulate(sub_mesh)));
            }
            handles.push(handle);
        }

        log::info!(
            "Loaded asset {:?}: {} sub-meshes, {} triangles",
            identity,
            handles.len(),
            handles.iter().map(|h| h.vertex_count() / 3).sum::<u32>()
        );
        self.sub_meshes.insert(
            identity.to_string(),
            doc.sub_meshes.iter().map(|s| s.name.clone()).collect(),
        );
        Ok(handles)
    }
}
