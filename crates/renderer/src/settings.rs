//! Runtime render toggles.

/// Feature switches the renderer honours every frame. The host flips these from its own UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    /// Draw triangle buffers as lines.
    pub wireframe: bool,
    /// Overlay per-vertex normal segments.
    pub show_normals: bool,
    /// Shade with face normals instead of interpolated vertex normals.
    pub flat_shading: bool,
    pub shadows_enabled: bool,
    /// Spotlight attached to the camera.
    pub flashlight: bool,
    /// Overlay the cascade frustum boxes.
    pub show_shadow_frustums: bool,
    /// Freeze the cascade anchor at the camera position where the lock was engaged.
    pub lock_shadows: bool,
    /// Tint fragments by the cascade that shadowed them.
    pub show_cascades: bool,
    /// Look through the preview cascade's light projection instead of the camera.
    pub view_shadow_projection: bool,
    pub show_preview: bool,
    /// Cascade shown by the preview quad and the shadow-projection view.
    pub preview_cascade: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            wireframe: false,
            show_normals: false,
            flat_shading: false,
            shadows_enabled: true,
            flashlight: false,
            show_shadow_frustums: false,
            lock_shadows: false,
            show_cascades: false,
            view_shadow_projection: false,
            show_preview: true,
            preview_cascade: 0,
        }
    }
}
