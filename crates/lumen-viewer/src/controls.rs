//! Mouse and keyboard mapping onto the camera and scene settings.

use lumen_engine::input::{InputEvent, InputFrame, Key, KeyState, MouseButton, MouseButtonState, PointerButtonEvent};
use lumen_engine::settings::{SceneSettings, ViewSettings};

/// What a drag currently rotates.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum InputMode {
    #[default]
    None,
    RotatingView,
    RotatingScene,
}

/// Result of applying one frame of input.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ControlOutcome {
    /// `Some(captured)` when the cursor should be grabbed or released.
    pub capture: Option<bool>,
    pub exit: bool,
}

#[derive(Debug, Clone)]
pub struct Controls {
    mode: InputMode,
    orbit_speed: f32,
    zoom_speed: f32,
}

impl Controls {
    pub fn new(orbit_speed: f32, zoom_speed: f32) -> Self {
        Self {
            mode: InputMode::None,
            orbit_speed,
            zoom_speed,
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Applies the frame's events in arrival order, then its accumulated
    /// scroll. Pointer motion is applied per event, under the mode that was
    /// active when it arrived.
    pub fn apply(
        &mut self,
        frame: &InputFrame,
        view: &mut ViewSettings,
        scene: &mut SceneSettings,
    ) -> ControlOutcome {
        let before = self.mode;
        let mut outcome = ControlOutcome::default();

        for event in &frame.events {
            match event {
                InputEvent::PointerButton(PointerButtonEvent { button, state, .. }) => {
                    self.on_button(*button, *state);
                }
                InputEvent::Key { key, state: KeyState::Pressed, repeat: false, .. } => match key {
                    Key::F1 => scene.toggle_light(0),
                    Key::F2 => scene.toggle_light(1),
                    Key::F3 => scene.toggle_light(2),
                    Key::Escape => outcome.exit = true,
                    _ => {}
                },
                InputEvent::PointerDelta { dx, dy } => self.rotate(*dx, *dy, view, scene),
                InputEvent::Focused(false) => self.mode = InputMode::None,
                _ => {}
            }
        }

        view.distance -= self.zoom_speed * frame.scroll_delta.1;

        if self.mode != before {
            outcome.capture = Some(self.mode != InputMode::None);
        }
        outcome
    }

    fn rotate(&self, dx: f32, dy: f32, view: &mut ViewSettings, scene: &mut SceneSettings) {
        let (yaw, pitch) = match self.mode {
            InputMode::RotatingView => (&mut view.yaw, &mut view.pitch),
            InputMode::RotatingScene => (&mut scene.yaw, &mut scene.pitch),
            InputMode::None => return,
        };
        *yaw += self.orbit_speed * dx;
        *pitch += self.orbit_speed * dy;
    }

    fn on_button(&mut self, button: MouseButton, state: MouseButtonState) {
        match (state, button) {
            (MouseButtonState::Pressed, MouseButton::Left) if self.mode == InputMode::None => {
                self.mode = InputMode::RotatingView;
            }
            (MouseButtonState::Pressed, MouseButton::Right) if self.mode == InputMode::None => {
                self.mode = InputMode::RotatingScene;
            }
            (MouseButtonState::Released, MouseButton::Left | MouseButton::Right) => {
                self.mode = InputMode::None;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_engine::input::{InputState, Modifiers, MouseWheelDelta};

    struct Rig {
        state: InputState,
        frame: InputFrame,
        controls: Controls,
        view: ViewSettings,
        scene: SceneSettings,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                state: InputState::default(),
                frame: InputFrame::default(),
                controls: Controls::new(1.0, 32.0),
                view: ViewSettings::default(),
                scene: SceneSettings::default(),
            }
        }

        fn push(&mut self, ev: InputEvent) {
            self.state.apply_event(&mut self.frame, ev);
        }

        fn button(&mut self, button: MouseButton, state: MouseButtonState) {
            self.push(InputEvent::PointerButton(PointerButtonEvent {
                button,
                state,
                x: 0.0,
                y: 0.0,
                modifiers: Modifiers::default(),
            }));
        }

        fn key(&mut self, key: Key, repeat: bool) {
            self.push(InputEvent::Key {
                key,
                state: KeyState::Pressed,
                modifiers: Modifiers::default(),
                code: 0,
                repeat,
            });
        }

        fn step(&mut self) -> ControlOutcome {
            let outcome = self.controls.apply(&self.frame, &mut self.view, &mut self.scene);
            self.frame.clear();
            outcome
        }
    }

    // ── modes ──

    #[test]
    fn left_drag_rotates_the_view() {
        let mut rig = Rig::new();
        rig.button(MouseButton::Left, MouseButtonState::Pressed);
        let outcome = rig.step();
        assert_eq!(rig.controls.mode(), InputMode::RotatingView);
        assert_eq!(outcome.capture, Some(true));

        rig.push(InputEvent::PointerDelta { dx: 10.0, dy: -4.0 });
        rig.step();
        assert_eq!(rig.view.yaw, 10.0);
        assert_eq!(rig.view.pitch, -4.0);
        assert_eq!(rig.scene.yaw, 0.0);
    }

    #[test]
    fn right_drag_rotates_the_scene() {
        let mut rig = Rig::new();
        rig.button(MouseButton::Right, MouseButtonState::Pressed);
        rig.push(InputEvent::PointerDelta { dx: 3.0, dy: 2.0 });
        rig.step();
        assert_eq!(rig.controls.mode(), InputMode::RotatingScene);
        assert_eq!((rig.scene.yaw, rig.scene.pitch), (3.0, 2.0));
        assert_eq!(rig.view.yaw, 0.0);
    }

    #[test]
    fn second_button_does_not_switch_modes() {
        let mut rig = Rig::new();
        rig.button(MouseButton::Left, MouseButtonState::Pressed);
        rig.button(MouseButton::Right, MouseButtonState::Pressed);
        rig.step();
        assert_eq!(rig.controls.mode(), InputMode::RotatingView);
    }

    #[test]
    fn release_returns_to_none_and_frees_the_cursor() {
        let mut rig = Rig::new();
        rig.button(MouseButton::Right, MouseButtonState::Pressed);
        rig.step();
        rig.button(MouseButton::Right, MouseButtonState::Released);
        let outcome = rig.step();
        assert_eq!(rig.controls.mode(), InputMode::None);
        assert_eq!(outcome.capture, Some(false));

        rig.push(InputEvent::PointerDelta { dx: 5.0, dy: 5.0 });
        let outcome = rig.step();
        assert_eq!(rig.scene.yaw, 0.0, "motion without a drag changes nothing");
        assert_eq!(outcome.capture, None);
    }

    #[test]
    fn motion_before_a_press_is_not_a_drag() {
        let mut rig = Rig::new();
        rig.push(InputEvent::PointerDelta { dx: 7.0, dy: 7.0 });
        rig.button(MouseButton::Left, MouseButtonState::Pressed);
        rig.push(InputEvent::PointerDelta { dx: 2.0, dy: 1.0 });
        rig.step();
        assert_eq!((rig.view.yaw, rig.view.pitch), (2.0, 1.0));
    }

    #[test]
    fn motion_before_a_release_still_counts() {
        let mut rig = Rig::new();
        rig.button(MouseButton::Right, MouseButtonState::Pressed);
        rig.step();
        rig.push(InputEvent::PointerDelta { dx: 4.0, dy: -2.0 });
        rig.button(MouseButton::Right, MouseButtonState::Released);
        rig.push(InputEvent::PointerDelta { dx: 9.0, dy: 9.0 });
        rig.step();
        assert_eq!((rig.scene.yaw, rig.scene.pitch), (4.0, -2.0));
        assert_eq!(rig.controls.mode(), InputMode::None);
    }

    // ── zoom and keys ──

    #[test]
    fn scrolling_up_moves_the_camera_closer() {
        let mut rig = Rig::new();
        rig.push(InputEvent::MouseWheel {
            delta: MouseWheelDelta::Line { x: 0.0, y: 1.0 },
            modifiers: Modifiers::default(),
        });
        rig.step();
        assert_eq!(rig.view.distance, 400.0 - 32.0);
    }

    #[test]
    fn function_keys_toggle_lights() {
        let mut rig = Rig::new();
        rig.key(Key::F2, false);
        rig.step();
        assert!(!rig.scene.lights[0].enabled);
        assert!(rig.scene.lights[1].enabled);

        rig.key(Key::F2, true);
        rig.step();
        assert!(rig.scene.lights[1].enabled, "key repeat is not a toggle");

        rig.push(InputEvent::Key {
            key: Key::F2,
            state: KeyState::Released,
            modifiers: Modifiers::default(),
            code: 0,
            repeat: false,
        });
        rig.key(Key::F2, false);
        rig.key(Key::F3, false);
        rig.step();
        assert!(!rig.scene.lights[1].enabled);
        assert!(rig.scene.lights[2].enabled);
    }

    #[test]
    fn escape_requests_exit() {
        let mut rig = Rig::new();
        rig.key(Key::Escape, false);
        assert!(rig.step().exit);
    }
}
