//! Viewer sync messages.
//!
//! Every outbound envelope is a flat JSON object: `message_name` plus the
//! payload's own fields. Pixels travel as `[[x, y], brightness]`.
//!
//! | Direction | `message_name`   | Fields                                   |
//! |-----------|------------------|------------------------------------------|
//! | out       | `INITIAL_DATA`   | `button_a`, `button_b`, `display`        |
//! | out       | `DISPLAY_PIXELS` | `pixels` (changed cells only)            |
//! | out       | `DISPLAY_ON_OFF` | `is_on`                                  |
//! | in        | `BUTTON_CHANGE`  | `id` (`"A"`/`"B"`), `is_pressed`         |
//!
//! Inbound `BUTTON_CHANGE` fields may sit at the top level or inside a
//! `data` object; both shapes are in use by viewers.

use crate::button::ButtonId;
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const BUTTON_CHANGE: &str = "BUTTON_CHANGE";

/// One cell: `((x, y), brightness)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelUpdate(pub (usize, usize), pub u8);

impl PixelUpdate {
    pub fn new(x: usize, y: usize, brightness: u8) -> Self {
        Self((x, y), brightness)
    }
}

/// Full display state as sent in `INITIAL_DATA`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplaySnapshot {
    /// All 25 cells, column by column.
    pub pixels: Vec<PixelUpdate>,
    pub is_on: bool,
}

/// Device-to-viewer messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "message_name", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    /// Sent once per viewer, before any deltas.
    InitialData {
        button_a: bool,
        button_b: bool,
        display: DisplaySnapshot,
    },
    /// One logical redraw, to be applied atomically.
    DisplayPixels { pixels: Vec<PixelUpdate> },
    DisplayOnOff { is_on: bool },
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitialData { .. } => "INITIAL_DATA",
            Self::DisplayPixels { .. } => "DISPLAY_PIXELS",
            Self::DisplayOnOff { .. } => "DISPLAY_ON_OFF",
        }
    }

    /// Encode as the JSON text frame sent to viewers.
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Viewer-to-device messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboundMessage {
    ButtonChange { id: ButtonId, is_pressed: bool },
}

#[derive(Deserialize)]
struct ButtonChangeFields {
    id: String,
    /// Missing or `null` counts as released.
    is_pressed: Option<bool>,
}

/// Parse a text frame from a viewer.
pub fn decode_inbound(text: &str) -> Result<InboundMessage, ProtocolError> {
    let mut fields = match serde_json::from_str::<Value>(text)? {
        Value::Object(fields) => fields,
        other => return Err(ProtocolError::NotAnObject(json_type_name(&other))),
    };

    let name = fields
        .get("message_name")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(ProtocolError::MissingMessageName)?;

    match name.as_str() {
        BUTTON_CHANGE => {
            let body = payload_fields(&mut fields);
            let change: ButtonChangeFields =
                serde_json::from_value(Value::Object(body)).map_err(|source| {
                    ProtocolError::InvalidPayload {
                        kind: BUTTON_CHANGE,
                        source,
                    }
                })?;

            Ok(InboundMessage::ButtonChange {
                id: change.id.parse()?,
                is_pressed: change.is_pressed.unwrap_or(false),
            })
        }
        _ => Err(ProtocolError::UnknownMessage(name)),
    }
}

/// Nested `data` object if present, otherwise the envelope itself.
fn payload_fields(fields: &mut Map<String, Value>) -> Map<String, Value> {
    match fields.remove("data") {
        Some(Value::Object(data)) => data,
        _ => std::mem::take(fields),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
