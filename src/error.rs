//! Error types for the simulated device and its viewer protocol.
//!
//! There are two families:
//! - [`Error`]: local validation failures returned to application code
//!   (bad brightness, coordinates off the grid). Never clamped.
//! - [`ProtocolError`]: reasons an inbound viewer message was rejected.
//!   These never reach application code; the device logs and drops them.

use thiserror::Error;

/// Result type alias using our device [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Validation errors raised by the pixel and display operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Brightness outside `0..=9`.
    #[error("Brightness out of bounds (must be 0-9): {0}")]
    InvalidBrightness(u8),

    /// Coordinate outside the 5x5 grid.
    #[error("Pixel ({x}, {y}) is outside the 5x5 display")]
    OutOfBounds { x: usize, y: usize },
}

/// Why an inbound viewer message was discarded.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Payload was not valid JSON.
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload parsed, but the top level was not an object.
    #[error("Expected a JSON object, but got: {0}")]
    NotAnObject(&'static str),

    /// No string `message_name` field.
    #[error("Missing message_name")]
    MissingMessageName,

    /// `message_name` is not one we handle.
    #[error("Unrecognized message_name: {0}")]
    UnknownMessage(String),

    /// Known message kind, but the fields had the wrong shape.
    #[error("Invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        source: serde_json::Error,
    },

    /// `BUTTON_CHANGE` named a button that does not exist.
    #[error("Invalid BUTTON_CHANGE id: {0}")]
    UnknownButton(String),
}
