//! Desktop stand-in for a micro:bit's buttons and 5x5 LED matrix.
//!
//! Code written against the board's API runs on a regular machine while
//! every display change is mirrored live to connected viewers over a
//! WebSocket, and viewers can press the buttons back.
//!
//! - [`device`]: the facade application code talks to
//! - [`button`], [`display`], [`pixel`], [`glyphs`]: the peripherals
//! - [`sync`], [`protocol`]: viewer registry and message format
//! - [`server`]: the axum endpoint viewers connect to
//!
//! It also holds the small bits of plumbing the binary needs: listen
//! address configuration and Ctrl+C handling.

pub mod button;
pub mod device;
pub mod display;
pub mod error;
pub mod glyphs;
pub mod pixel;
pub mod protocol;
pub mod server;
pub mod sync;

pub use button::{Button, ButtonId};
pub use device::{Device, DeviceStatus};
pub use display::{Display, ScrollOptions, ShowOptions};
pub use error::{Error, ProtocolError, Result};

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ── Server configuration ───────────────────────────────────────────

/// Where the sync endpoint listens.
///
/// # Rust concept: derive macros
/// `Clone, Copy` are free here (an address and a port). Passing this by
/// value keeps configuration explicit instead of reading globals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self { host, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    /// All interfaces, port 8000.
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
        }
    }
}

// ── Shutdown ───────────────────────────────────────────────────────

/// Set up a Ctrl+C handler that sets the returned flag to false.
///
/// The flag is shared by the application thread and the sync endpoint so
/// both wind down together.
pub fn setup_signal_handler() -> std::result::Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

/// Check if the main loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────
