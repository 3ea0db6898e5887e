//! Input module for framehost-core.
//!
//! Responsibilities:
//! - Hold the virtual gamepad the host input layer writes into.
//! - Answer the guest's `gamepad_pressed` queries.
//!
//! The gamepad is shared by `Arc` between the host (writer) and the store state
//! (reader), so no global lookup is involved.

use std::sync::atomic::{AtomicBool, Ordering};

/// Logical buttons, in ABI order.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Button {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    A = 4,
    B = 5,
    X = 6,
    Y = 7,
}

impl Button {
    pub const COUNT: usize = 8;

    pub const ALL: [Button; Button::COUNT] = [
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
    ];

    /// Convert an ABI button id into a button.
    pub fn from_index(index: i32) -> Option<Button> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Button::ALL.get(i).copied())
    }
}

/// Fixed set of button flags, one per [`Button`].
#[derive(Debug, Default)]
pub struct VirtualGamepad {
    buttons: [AtomicBool; Button::COUNT],
}

impl VirtualGamepad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, button: Button, pressed: bool) {
        self.buttons[button as usize].store(pressed, Ordering::Relaxed);
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons[button as usize].load(Ordering::Relaxed)
    }

    pub fn release_all(&self) {
        for flag in &self.buttons {
            flag.store(false, Ordering::Relaxed);
        }
    }

    /// Snapshot in [`Button::ALL`] order.
    pub fn snapshot(&self) -> [bool; Button::COUNT] {
        Button::ALL.map(|b| self.is_pressed(b))
    }
}

/// Query whether a given button is pressed.
///
/// Returns 1 if pressed, else 0. Unknown ids read as released.
pub fn gamepad_pressed(gamepad: &VirtualGamepad, button: i32) -> i32 {
    match Button::from_index(button) {
        Some(b) if gamepad.is_pressed(b) => 1,
        _ => 0,
    }
}
