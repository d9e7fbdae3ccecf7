//! Per-frame pass order and statistics.

use crate::settings::RenderSettings;
use glam::Vec3;
use std::time::Duration;

/// One GPU pass of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePass {
    /// Depth-only render into cascade `i`.
    Shadow(usize),
    /// Lit colour pass sampling every cascade.
    Main,
    /// Shadow-map preview quad over the finished frame.
    Preview,
}

/// Passes for one frame, in submission order. Every shadow pass precedes the main pass that
/// samples it, in increasing cascade order.
pub fn plan_frame(settings: &RenderSettings, cascade_count: usize) -> Vec<FramePass> {
    let mut passes = Vec::with_capacity(cascade_count + 2);
    if settings.shadows_enabled {
        passes.extend((0..cascade_count).map(FramePass::Shadow));
    }
    passes.push(FramePass::Main);
    if settings.show_preview && cascade_count > 0 {
        passes.push(FramePass::Preview);
    }
    passes
}

/// Where the cascades are centred: the camera, or the position where the lock was engaged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShadowAnchor {
    locked_at: Option<Vec3>,
}

impl ShadowAnchor {
    pub fn update(&mut self, lock: bool, camera_position: Vec3) -> Vec3 {
        if !lock {
            self.locked_at = None;
            return camera_position;
        }
        *self.locked_at.get_or_insert(camera_position)
    }
}

/// Timing and size of a rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub delta_seconds: f32,
    pub fps: f32,
    /// CPU time spent recording and submitting the previous frame.
    pub frame_cost: Duration,
    pub triangles: u64,
}
