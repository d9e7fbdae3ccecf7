//! Viewer configuration (window, terrain, scene placement, render toggles). Loaded from config.ron at startup.

use renderer::RenderSettings;
use serde::{Deserialize, Serialize};

/// Persistent viewer settings. Loaded from `config.ron` in the current directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Window width in logical pixels.
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Window height in logical pixels.
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Directory that mesh assets are read from.
    #[serde(default = "default_asset_dir")]
    pub asset_dir: String,
    #[serde(default)]
    pub terrain: TerrainConfig,
    #[serde(default)]
    pub trees: TreeConfig,
    #[serde(default)]
    pub revolved: RevolvedConfig,
    #[serde(default)]
    pub showcase: ShowcaseConfig,
    #[serde(default)]
    pub shadows: ShadowConfig,
    /// Initial state of the runtime toggles.
    #[serde(default)]
    pub render: RenderToggles,
    /// Write the generated heightfield to this PNG at startup.
    #[serde(default)]
    pub heightmap_png: Option<String>,
}

fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_asset_dir() -> String {
    "crates/viewer/assets".to_string()
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            asset_dir: default_asset_dir(),
            terrain: TerrainConfig::default(),
            trees: TreeConfig::default(),
            revolved: RevolvedConfig::default(),
            showcase: ShowcaseConfig::default(),
            shadows: ShadowConfig::default(),
            render: RenderToggles::default(),
            heightmap_png: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub grid_width: usize,
    pub grid_height: usize,
    /// Noise coordinates are grid coordinates divided by this.
    pub noise_scale: f64,
    pub scale_x: f32,
    pub scale_z: f32,
    pub scale_height: f32,
    /// Fixed seed; a random one is drawn when absent.
    pub seed: Option<u64>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            grid_width: 300,
            grid_height: 300,
            noise_scale: 20.0,
            scale_x: 40.0,
            scale_z: 40.0,
            scale_height: 200.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub asset: String,
    pub count: usize,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            asset: "tree.obj".to_string(),
            count: 150,
            min_scale: 3.0,
            max_scale: 6.0,
        }
    }
}

/// Surface of revolution `r(t) = amplitude * sin(t / period)` placed at the terrain centre.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevolvedConfig {
    pub enabled: bool,
    pub amplitude: f64,
    pub period: f64,
    pub angular_steps: usize,
    pub param_max: f64,
    pub param_step: f64,
}

impl Default for RevolvedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            amplitude: 20.0,
            period: 35.0,
            angular_steps: 32,
            param_max: std::f64::consts::PI * 35.0 + 0.01,
            param_step: std::f64::consts::PI / 5.0,
        }
    }
}

/// Tumbling asset hovering above the terrain centre.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowcaseConfig {
    /// Asset identity; `None` leaves the showcase out.
    pub asset: Option<String>,
    pub scale: f32,
    pub height_above: f32,
    /// Degrees per second.
    pub tumble_rate: f32,
    /// Initial camera height above the terrain centre.
    pub camera_height: f32,
}

impl Default for ShowcaseConfig {
    fn default() -> Self {
        Self {
            asset: Some("showcase.obj".to_string()),
            scale: 5.0,
            height_above: 300.0,
            tumble_rate: 100.0,
            camera_height: 600.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Texel edge length of every cascade.
    pub resolution: u32,
    /// Orthographic half-extent per cascade, strictly increasing.
    pub half_sizes: Vec<f32>,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        let cascades = renderer::CascadeConfig::default();
        Self {
            resolution: cascades.resolution(),
            half_sizes: cascades.half_sizes().to_vec(),
            near: cascades.near(),
            far: cascades.far(),
        }
    }
}

impl ShadowConfig {
    /// Validated cascade table; falls back to the built-in one if this one is rejected.
    pub fn cascades(&self) -> renderer::CascadeConfig {
        renderer::CascadeConfig::new(self.half_sizes.clone(), self.near, self.far, self.resolution).unwrap_or_else(|e| {
            log::warn!("Invalid shadow config: {}, using defaults", e);
            renderer::CascadeConfig::default()
        })
    }
}

/// Serializable mirror of [`RenderSettings`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderToggles {
    pub wireframe: bool,
    pub show_normals: bool,
    pub flat_shading: bool,
    pub shadows_enabled: bool,
    pub flashlight: bool,
    pub show_shadow_frustums: bool,
    pub lock_shadows: bool,
    pub show_cascades: bool,
    pub view_shadow_projection: bool,
    pub show_preview: bool,
    pub preview_cascade: usize,
}

impl Default for RenderToggles {
    fn default() -> Self {
        RenderSettings::default().into()
    }
}

impl From<RenderSettings> for RenderToggles {
    fn from(s: RenderSettings) -> Self {
        Self {
            wireframe: s.wireframe,
            show_normals: s.show_normals,
            flat_shading: s.flat_shading,
            shadows_enabled: s.shadows_enabled,
            flashlight: s.flashlight,
            show_shadow_frustums: s.show_shadow_frustums,
            lock_shadows: s.lock_shadows,
            show_cascades: s.show_cascades,
            view_shadow_projection: s.view_shadow_projection,
            show_preview: s.show_preview,
            preview_cascade: s.preview_cascade,
        }
    }
}

impl From<&RenderToggles> for RenderSettings {
    fn from(t: &RenderToggles) -> Self {
        Self {
            wireframe: t.wireframe,
            show_normals: t.show_normals,
            flat_shading: t.flat_shading,
            shadows_enabled: t.shadows_enabled,
            flashlight: t.flashlight,
            show_shadow_frustums: t.show_shadow_frustums,
            lock_shadows: t.lock_shadows,
            show_cascades: t.show_cascades,
            view_shadow_projection: t.view_shadow_projection,
            show_preview: t.show_preview,
            preview_cascade: t.preview_cascade,
        }
    }
}

impl ViewerConfig {
    /// Load config from `config.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        let path = config_path();
        if let Ok(data) = std::fs::read_to_string(&path) {
            match Self::parse(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    pub fn parse(data: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(data)
    }
}

fn config_path() -> std::path::PathBuf {
    std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from(".")).join("config.ron")
}
