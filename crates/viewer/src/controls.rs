//! Runtime toggle keys.

use input::KeyCode;
use renderer::RenderSettings;

/// Smallest and largest shadow-map edge reachable with `=` and `-`.
pub const MIN_SHADOW_RESOLUTION: u32 = 256;
pub const MAX_SHADOW_RESOLUTION: u32 = 8192;

/// What a key press asks the viewer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// A render setting changed in place.
    Toggled(&'static str, bool),
    PreviewCascade(usize),
    /// Reallocate the cascades at this resolution.
    ShadowResolution(u32),
}

/// Apply `key` to `settings`. Returns `None` for keys with no binding.
pub fn apply_key(key: KeyCode, settings: &mut RenderSettings, shadow_resolution: u32) -> Option<Control> {
    let toggle = |name: &'static str, value: &mut bool| {
        *value = !*value;
        Some(Control::Toggled(name, *value))
    };
    match key {
        KeyCode::F1 => toggle("wireframe", &mut settings.wireframe),
        KeyCode::F2 => toggle("normals", &mut settings.show_normals),
        KeyCode::F3 => toggle("flat shading", &mut settings.flat_shading),
        KeyCode::F4 => toggle("shadows", &mut settings.shadows_enabled),
        KeyCode::F5 => toggle("flashlight", &mut settings.flashlight),
        KeyCode::F6 => toggle("shadow frustums", &mut settings.show_shadow_frustums),
        KeyCode::F7 => toggle("shadow lock", &mut settings.lock_shadows),
        KeyCode::F8 => toggle("cascade tint", &mut settings.show_cascades),
        KeyCode::F9 => toggle("shadow projection view", &mut settings.view_shadow_projection),
        KeyCode::F10 => toggle("shadow preview", &mut settings.show_preview),
        KeyCode::Digit1 | KeyCode::Digit2 | KeyCode::Digit3 | KeyCode::Digit4 => {
            settings.preview_cascade = match key {
                KeyCode::Digit1 => 0,
                KeyCode::Digit2 => 1,
                KeyCode::Digit3 => 2,
                _ => 3,
            };
            Some(Control::PreviewCascade(settings.preview_cascade))
        }
        KeyCode::Equal | KeyCode::NumpadAdd => Some(Control::ShadowResolution(
            shadow_resolution.saturating_mul(2).min(MAX_SHADOW_RESOLUTION),
        )),
        KeyCode::Minus | KeyCode::NumpadSubtract => {
            Some(Control::ShadowResolution((shadow_resolution / 2).max(MIN_SHADOW_RESOLUTION)))
        }
        _ => None,
    }
}

/// Approximate GPU memory for every cascade at `resolution`, in megabytes.
pub fn shadow_megabytes(resolution: u32, cascades: usize) -> f64 {
    resolution as f64 * resolution as f64 * 4.0 * cascades as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_keys_flip_settings() {
        let mut settings = RenderSettings::default();
        assert_eq!(apply_key(KeyCode::F4, &mut settings, 2048), Some(Control::Toggled("shadows", false)));
        assert!(!settings.shadows_enabled);
        apply_key(KeyCode::F4, &mut settings, 2048);
        assert!(settings.shadows_enabled);
        apply_key(KeyCode::F1, &mut settings, 2048);
        assert!(settings.wireframe);
        assert_eq!(apply_key(KeyCode::KeyQ, &mut settings, 2048), None);
    }

    #[test]
    fn digits_pick_preview_cascade() {
        let mut settings = RenderSettings::default();
        assert_eq!(apply_key(KeyCode::Digit3, &mut settings, 2048), Some(Control::PreviewCascade(2)));
        assert_eq!(settings.preview_cascade, 2);
    }

    #[test]
    fn resolution_steps_are_clamped() {
        let mut settings = RenderSettings::default();
        assert_eq!(apply_key(KeyCode::Equal, &mut settings, 2048), Some(Control::ShadowResolution(4096)));
        assert_eq!(apply_key(KeyCode::Equal, &mut settings, 8192), Some(Control::ShadowResolution(8192)));
        assert_eq!(apply_key(KeyCode::Minus, &mut settings, 256), Some(Control::ShadowResolution(256)));
        assert!((shadow_megabytes(2048, 1) - 16.777216).abs() < 1e-9);
    }
}
