use std::collections::HashSet;

use super::types::{InputEvent, Key, MouseButton, MouseWheelDelta};

/// Logical pixels a touchpad has to scroll to count as one wheel line.
pub const PIXELS_PER_LINE: f32 = 40.0;

/// Per-frame input deltas.
///
/// `InputState` provides the current state (held keys/buttons, pointer position).
/// `InputFrame` provides events and transition sets for the current frame.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Raw events in arrival order.
    pub events: Vec<InputEvent>,

    /// Keys pressed this frame.
    pub keys_pressed: HashSet<Key>,

    /// Keys released this frame.
    pub keys_released: HashSet<Key>,

    /// Mouse buttons pressed this frame.
    pub buttons_pressed: HashSet<MouseButton>,

    /// Mouse buttons released this frame.
    pub buttons_released: HashSet<MouseButton>,

    /// Summed raw pointer motion.
    pub pointer_delta: (f32, f32),

    /// Summed wheel motion, in lines.
    pub scroll_delta: (f32, f32),
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.pointer_delta = (0.0, 0.0);
        self.scroll_delta = (0.0, 0.0);
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }

    pub(crate) fn add_pointer_delta(&mut self, dx: f32, dy: f32) {
        self.pointer_delta.0 += dx;
        self.pointer_delta.1 += dy;
    }

    pub(crate) fn add_scroll(&mut self, delta: MouseWheelDelta) {
        let (x, y) = match delta {
            MouseWheelDelta::Line { x, y } => (x, y),
            MouseWheelDelta::Pixel { x, y } => (x / PIXELS_PER_LINE, y / PIXELS_PER_LINE),
        };
        self.scroll_delta.0 += x;
        self.scroll_delta.1 += y;
    }

    /// True when this frame saw a press of `key`.
    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }
}
