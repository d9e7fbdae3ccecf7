//! Keyboard, pointer and scroll state accumulated from window events between frames.

use glam::Vec2;
use std::collections::HashSet;

/// Movement keys for the fly camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementKeys {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub ascend: bool,
    pub descend: bool,
    /// Scroll changes the field of view instead of the movement speed.
    pub zoom_modifier: bool,
}

/// Manages input state for the current frame.
#[derive(Debug, Default)]
pub struct InputState {
    /// Keys currently held down.
    keys_held: HashSet<KeyCode>,
    /// Keys pressed since the last frame.
    keys_pressed: HashSet<KeyCode>,

    /// Pointer motion accumulated since the last frame (only while captured).
    pointer_delta: Vec2,
    /// Wheel notches accumulated since the last frame, positive towards the user.
    scroll_delta: f32,

    /// Whether the pointer is captured by the window.
    cursor_locked: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state. Call once the frame has consumed it.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.pointer_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }

    /// Process a keyboard event.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.keys_held.contains(&key) {
                    self.keys_pressed.insert(key);
                }
                self.keys_held.insert(key);
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
            }
        }
    }

    /// Process raw pointer motion. Ignored unless the pointer is captured.
    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        if !self.cursor_locked {
            return;
        }
        self.pointer_delta.x += delta.0 as f32;
        self.pointer_delta.y += delta.1 as f32;
    }

    /// Process a wheel event. Ignored unless the pointer is captured.
    pub fn process_scroll(&mut self, delta: MouseScrollDelta) {
        if !self.cursor_locked {
            return;
        }
        // winit reports wheel-up as positive y.
        let notches = match delta {
            MouseScrollDelta::LineDelta(_, y) => -y,
            MouseScrollDelta::PixelDelta(position) if position.y != 0.0 => -(position.y as f32).signum(),
            MouseScrollDelta::PixelDelta(_) => 0.0,
        };
        self.scroll_delta += notches;
    }

    /// Check if a key is currently held.
    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Check if a key was pressed since the last frame.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Keys pressed since the last frame, in no particular order.
    pub fn pressed_keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.keys_pressed.iter().copied()
    }

    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer_delta
    }

    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Check if the cursor is locked.
    pub fn is_cursor_locked(&self) -> bool {
        self.cursor_locked
    }

    /// Set cursor lock state. Releasing the lock drops any held keys and pending deltas.
    pub fn set_cursor_locked(&mut self, locked: bool) {
        if locked != self.cursor_locked {
            log::debug!("Pointer {}", if locked { "captured" } else { "released" });
        }
        self.cursor_locked = locked;
        if !locked {
            self.keys_held.clear();
            self.pointer_delta = Vec2::ZERO;
            self.scroll_delta = 0.0;
        }
    }

    /// WASD to move, Space to rise, Shift to sink, Control to zoom. All off while uncaptured.
    pub fn movement(&self) -> MovementKeys {
        let held = |keys: &[KeyCode]| self.cursor_locked && keys.iter().any(|k| self.is_key_held(*k));
        MovementKeys {
            forward: held(&[KeyCode::KeyW]),
            backward: held(&[KeyCode::KeyS]),
            left: held(&[KeyCode::KeyA]),
            right: held(&[KeyCode::KeyD]),
            ascend: held(&[KeyCode::Space]),
            descend: held(&[KeyCode::ShiftLeft, KeyCode::ShiftRight]),
            zoom_modifier: held(&[KeyCode::ControlLeft, KeyCode::ControlRight]),
        }
    }
}

// Re-export for convenience
pub use winit::event::{ElementState, MouseScrollDelta};
pub use winit::keyboard::KeyCode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_is_ignored_until_captured() {
        let mut input = InputState::new();
        input.process_mouse_motion((5.0, 3.0));
        input.process_scroll(MouseScrollDelta::LineDelta(0.0, 1.0));
        assert_eq!(input.pointer_delta(), Vec2::ZERO);
        assert_eq!(input.scroll_delta(), 0.0);

        input.set_cursor_locked(true);
        input.process_mouse_motion((5.0, 3.0));
        input.process_mouse_motion((1.0, -1.0));
        input.process_scroll(MouseScrollDelta::LineDelta(0.0, 1.0));
        assert_eq!(input.pointer_delta(), Vec2::new(6.0, 2.0));
        assert_eq!(input.scroll_delta(), -1.0);

        input.end_frame();
        assert_eq!(input.pointer_delta(), Vec2::ZERO);
        assert_eq!(input.scroll_delta(), 0.0);
    }

    #[test]
    fn pressed_fires_once_per_hold() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::F1, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::F1));
        input.end_frame();
        // Key repeat while held.
        input.process_keyboard(KeyCode::F1, ElementState::Pressed);
        assert!(!input.is_key_pressed(KeyCode::F1));
        assert!(input.is_key_held(KeyCode::F1));
        input.process_keyboard(KeyCode::F1, ElementState::Released);
        assert!(!input.is_key_held(KeyCode::F1));
    }

    #[test]
    fn movement_needs_capture() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        input.process_keyboard(KeyCode::ShiftRight, ElementState::Pressed);
        assert!(!input.movement().forward);

        input.set_cursor_locked(true);
        let movement = input.movement();
        assert!(movement.forward && movement.descend);
        assert!(!movement.backward && !movement.zoom_modifier);

        input.set_cursor_locked(false);
        input.set_cursor_locked(true);
        assert!(!input.movement().forward);
    }
}
