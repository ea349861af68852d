//! The simulated device: two buttons, the display, and the hub that keeps
//! viewers in sync with them.
//!
//! Application code holds an `Arc<Device>` on its own thread and uses it
//! the way it would use the real board's API. The sync endpoint holds the
//! same `Arc` and feeds viewer input in through [`Device::handle_inbound`].

use crate::button::{Button, ButtonId};
use crate::display::{Display, HEIGHT, WIDTH};
use crate::protocol::{self, InboundMessage, OutboundMessage};
use crate::sync::{Session, SessionId, SyncHub};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Point-in-time view of the device for the status endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct DeviceStatus {
    /// Whether button A is held down
    pub button_a: bool,
    /// Whether button B is held down
    pub button_b: bool,
    /// Display power flag
    pub display_on: bool,
    /// Brightness (0-9) per cell, one row per `y`, left to right
    pub pixels: Vec<Vec<u8>>,
    /// Milliseconds since start or last reset
    pub running_time_ms: u64,
    /// Connected viewers
    pub viewers: usize,
}

#[derive(Debug)]
pub struct Device {
    button_a: Button,
    button_b: Button,
    display: Display,
    hub: Arc<SyncHub>,
    started: Mutex<Instant>,
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}

impl Device {
    pub fn new() -> Self {
        let hub = Arc::new(SyncHub::new());
        Self {
            button_a: Button::new(),
            button_b: Button::new(),
            display: Display::new(hub.clone()),
            hub,
            started: Mutex::new(Instant::now()),
        }
    }

    pub fn button_a(&self) -> &Button {
        &self.button_a
    }

    pub fn button_b(&self) -> &Button {
        &self.button_b
    }

    pub fn button(&self, id: ButtonId) -> &Button {
        match id {
            ButtonId::A => &self.button_a,
            ButtonId::B => &self.button_b,
        }
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    /// Block the calling thread. Not for use on the async runtime.
    pub fn sleep(&self, milliseconds: u64) {
        thread::sleep(Duration::from_millis(milliseconds));
    }

    /// Milliseconds since the device was created or last reset.
    pub fn running_time(&self) -> u64 {
        let elapsed = self.started.lock().unwrap().elapsed();
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Both buttons and the display back to defaults, clock restarted.
    pub fn reset(&self) {
        self.button_a.reset();
        self.button_b.reset();
        self.display.reset();
        *self.started.lock().unwrap() = Instant::now();
        tracing::info!("Device reset");
    }

    /// Register a viewer. Its queue starts with `INITIAL_DATA`, taken under
    /// the display lock so no change can slip between the snapshot and the
    /// registration.
    pub fn connect_viewer(&self) -> Session {
        self.display.with_snapshot(|display| {
            let initial = OutboundMessage::InitialData {
                button_a: self.button_a.is_pressed(),
                button_b: self.button_b.is_pressed(),
                display,
            };
            self.hub.register(&initial)
        })
    }

    pub fn disconnect_viewer(&self, id: SessionId) {
        self.hub.unregister(id);
    }

    pub fn viewer_count(&self) -> usize {
        self.hub.session_count()
    }

    /// Decode and apply a text frame from a viewer. Anything malformed is
    /// logged and dropped.
    pub fn handle_inbound(&self, text: &str) {
        tracing::debug!("Text message received: {}", text);

        match protocol::decode_inbound(text) {
            Ok(message) => self.apply(message),
            Err(e) => tracing::warn!("Dropping viewer message: {}", e),
        }
    }

    pub fn apply(&self, message: InboundMessage) {
        match message {
            InboundMessage::ButtonChange { id, is_pressed } => {
                tracing::debug!("Button {} pressed={}", id, is_pressed);
                self.button(id).set_pressed(is_pressed);
            }
        }
    }

    pub fn status(&self) -> DeviceStatus {
        let snapshot = self.display.snapshot();
        let mut pixels = vec![vec![0; WIDTH]; HEIGHT];
        for protocol::PixelUpdate((x, y), brightness) in snapshot.pixels {
            pixels[y][x] = brightness;
        }

        DeviceStatus {
            button_a: self.button_a.is_pressed(),
            button_b: self.button_b.is_pressed(),
            display_on: snapshot.is_on,
            pixels,
            running_time_ms: self.running_time(),
            viewers: self.viewer_count(),
        }
    }
}
