//! A single LED of the matrix.

use crate::error::{Error, Result};

/// Brightest value a pixel can hold.
pub const MAX_BRIGHTNESS: u8 = 9;

/// One LED's brightness, always within `0..=MAX_BRIGHTNESS`.
///
/// Pixels are only reachable through their owning
/// [`Display`](crate::display::Display), which is responsible for
/// publishing changes to viewers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pixel {
    brightness: u8,
}

impl Pixel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Store a new brightness. Out-of-range values are rejected and the
    /// previous value is kept.
    pub fn set_brightness(&mut self, value: u8) -> Result<()> {
        if value > MAX_BRIGHTNESS {
            return Err(Error::InvalidBrightness(value));
        }
        self.brightness = value;
        Ok(())
    }

    /// Glyph rendering: fully on or off.
    pub(crate) fn set_lit(&mut self, lit: bool) {
        self.brightness = if lit { MAX_BRIGHTNESS } else { 0 };
    }
}
