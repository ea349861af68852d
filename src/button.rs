//! Push-buttons A and B.
//!
//! A button is a pure state holder. Viewers inject edges through the sync
//! hub, application code reads them back. Nothing here is broadcast.

use crate::error::ProtocolError;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

/// Which of the two device buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonId {
    A,
    B,
}

impl FromStr for ButtonId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(ProtocolError::UnknownButton(other.to_string())),
        }
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// Edge-triggered button state.
///
/// `was_pressed` and `presses` are read-and-clear: a query consumes them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    is_pressed: bool,
    was_pressed: bool,
    presses: u64,
}

impl ButtonState {
    /// Down-edge: now pressed, flag set, one more press counted.
    pub fn register_down(&mut self) {
        self.is_pressed = true;
        self.was_pressed = true;
        self.presses = self.presses.saturating_add(1);
    }

    /// Up-edge. Leaves the press flag and counter alone.
    pub fn register_up(&mut self) {
        self.is_pressed = false;
    }

    pub fn is_pressed(&self) -> bool {
        self.is_pressed
    }

    /// # Rust concept: `mem::take`
    /// Returns the current value and leaves `Default::default()` behind,
    /// which is exactly read-and-clear.
    pub fn take_was_pressed(&mut self) -> bool {
        std::mem::take(&mut self.was_pressed)
    }

    pub fn take_presses(&mut self) -> u64 {
        std::mem::take(&mut self.presses)
    }
}

/// A device button, safe to share between the application thread and the
/// network tasks feeding it input.
#[derive(Debug, Default)]
pub struct Button {
    state: Mutex<ButtonState>,
}

impl Button {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self) -> bool {
        self.state.lock().unwrap().is_pressed()
    }

    /// Whether the button went down since the last call. Clears the flag.
    pub fn was_pressed(&self) -> bool {
        self.state.lock().unwrap().take_was_pressed()
    }

    /// Down-edges since the last call. Resets the count to zero.
    pub fn get_presses(&self) -> u64 {
        self.state.lock().unwrap().take_presses()
    }

    pub fn register_down(&self) {
        self.state.lock().unwrap().register_down();
    }

    pub fn register_up(&self) {
        self.state.lock().unwrap().register_up();
    }

    /// Apply a pressed/released change as reported by a viewer.
    pub fn set_pressed(&self, is_pressed: bool) {
        if is_pressed {
            self.register_down();
        } else {
            self.register_up();
        }
    }

    /// Back to released with no pending presses.
    pub fn reset(&self) {
        *self.state.lock().unwrap() = ButtonState::default();
    }
}
