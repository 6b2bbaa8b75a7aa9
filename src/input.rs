//! Polled keyboard and mouse state handed to the render loop each frame.

use bitflags::bitflags;
use glam::Vec2;
use smallvec::SmallVec;
use winit::{
    event::{ElementState, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MouseButtons: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const MIDDLE = 1 << 2;
    }
}

impl MouseButtons {
    fn from_winit(button: MouseButton) -> Option<Self> {
        match button {
            MouseButton::Left => Some(Self::LEFT),
            MouseButton::Right => Some(Self::RIGHT),
            MouseButton::Middle => Some(Self::MIDDLE),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    pub mouse_position: Vec2,
    pub buttons: MouseButtons,
    pub keys: SmallVec<[KeyCode; 8]>,
}

impl InputSnapshot {
    pub fn is_pressed(&self, button: MouseButtons) -> bool {
        self.buttons.contains(button)
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }
}

pub trait InputProvider {
    fn snapshot(&mut self) -> InputSnapshot;
}

impl<F> InputProvider for F
where
    F: FnMut() -> InputSnapshot,
{
    fn snapshot(&mut self) -> InputSnapshot {
        self()
    }
}

/// Accumulates window events into the current input state.
#[derive(Clone, Debug, Default)]
pub struct InputState {
    current: InputSnapshot,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the event changed the input state.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.on_cursor_moved(Vec2::new(position.x as f32, position.y as f32));
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.on_mouse_button(*button, *state == ElementState::Pressed)
            }
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => {
                    self.on_key(code, event.state == ElementState::Pressed);
                    true
                }
                PhysicalKey::Unidentified(_) => false,
            },
            WindowEvent::Focused(false) => {
                self.current.buttons = MouseButtons::empty();
                self.current.keys.clear();
                true
            }
            _ => false,
        }
    }

    pub fn on_cursor_moved(&mut self, position: Vec2) {
        self.current.mouse_position = position;
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, pressed: bool) -> bool {
        let Some(flag) = MouseButtons::from_winit(button) else {
            return false;
        };

        self.current.buttons.set(flag, pressed);
        true
    }

    pub fn on_key(&mut self, key: KeyCode, pressed: bool) {
        let held = self.current.keys.iter().position(|k| *k == key);

        match (pressed, held) {
            (true, None) => self.current.keys.push(key),
            (false, Some(index)) => {
                self.current.keys.swap_remove(index);
            }
            _ => {}
        }
    }

    pub fn current(&self) -> &InputSnapshot {
        &self.current
    }
}

impl InputProvider for InputState {
    fn snapshot(&mut self) -> InputSnapshot {
        self.current.clone()
    }
}
