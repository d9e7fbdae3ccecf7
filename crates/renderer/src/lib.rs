//! Rendering system using wgpu: terrain, solids and cascaded shadow maps.

pub mod asset;
pub mod camera;
pub mod device;
pub mod error;
pub mod frame;
pub mod mesh;
pub mod mesh_cache;
pub mod pipeline;
pub mod preview;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod shadow;
pub mod texture;
pub mod uniform_cache;
pub mod vertex;

pub use asset::{AssetLoader, AssetSource, DirectoryAssets};
pub use camera::*;
pub use device::{GpuBuffer, GraphicsDevice};
pub use error::*;
pub use frame::*;
pub use mesh::*;
pub use mesh_cache::*;
pub use renderer::*;
pub use scene::*;
pub use settings::*;
pub use shadow::*;
pub use texture::*;
