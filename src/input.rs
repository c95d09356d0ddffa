use std::collections::HashSet;

use nalgebra::Vector2;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    #[default]
    Normal,
    /// Hidden and held in place while the camera is being steered.
    Locked,
}

/// What the camera needs to know about the user's mouse and keyboard each frame.
pub trait InputState {
    fn mouse_position(&self) -> Vector2<f32>;
    fn is_mouse_button_down(&self, button: MouseButton) -> bool;
    fn is_key_down(&self, key: VirtualKeyCode) -> bool;
    fn set_cursor_mode(&mut self, mode: CursorMode);
}

/// Input state folded from winit window events.
///
/// The cursor mode is only recorded here; the window owner applies it.
#[derive(Debug, Default)]
pub struct WinitInput {
    mouse_position: PhysicalPosition<f64>,
    buttons: HashSet<MouseButton>,
    keys: HashSet<VirtualKeyCode>,
    cursor_mode: CursorMode,
}

impl WinitInput {
    pub fn new() -> Self {
        Self::default()
    }

    // true: the event was consumed as camera input
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.set_mouse_position(*position);
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.set_button(*button, matches!(state, ElementState::Pressed));
                true
            }
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(key),
                        ..
                    },
                ..
            } => {
                self.set_key(*key, matches!(state, ElementState::Pressed));
                true
            }
            // Keys held while the window loses focus never see their release.
            WindowEvent::Focused(false) => {
                self.keys.clear();
                self.buttons.clear();
                false
            }
            _ => false,
        }
    }

    pub fn set_mouse_position(&mut self, position: PhysicalPosition<f64>) {
        self.mouse_position = position;
    }

    pub fn set_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.buttons.insert(button);
        } else {
            self.buttons.remove(&button);
        }
    }

    pub fn set_key(&mut self, key: VirtualKeyCode, pressed: bool) {
        if pressed {
            self.keys.insert(key);
        } else {
            self.keys.remove(&key);
        }
    }

    pub fn cursor_mode(&self) -> CursorMode {
        self.cursor_mode
    }
}

impl InputState for WinitInput {
    fn mouse_position(&self) -> Vector2<f32> {
        Vector2::new(self.mouse_position.x as f32, self.mouse_position.y as f32)
    }

    fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    fn is_key_down(&self, key: VirtualKeyCode) -> bool {
        self.keys.contains(&key)
    }

    fn set_cursor_mode(&mut self, mode: CursorMode) {
        self.cursor_mode = mode;
    }
}
