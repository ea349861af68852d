//! micro:bit simulator
//!
//! Runs the simulated device with a WebSocket sync endpoint that viewers
//! connect to, plus a small demo program driving the display.
//!
//! ## Architecture
//! - **Application thread** (std::thread): runs device code, which blocks
//!   freely in `sleep`, `show` and `scroll`
//! - **Sync endpoint** (tokio/axum): one task per viewer, fans out display
//!   changes and feeds button input back into the device
//!
//! ## Usage
//! ```sh
//! microbit-sim --port 8000
//! RUST_LOG=microbit_sim=debug microbit-sim --no-demo
//! ```

use clap::Parser;
use microbit_sim::server;
use microbit_sim::{Device, ScrollOptions, ServerConfig, ShowOptions, is_running, setup_signal_handler};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing_subscriber::EnvFilter;

/// micro:bit simulator with live viewer sync
#[derive(Parser)]
#[command(name = "microbit-sim")]
#[command(about = "Simulated micro:bit buttons and LED matrix, mirrored to WebSocket viewers")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Don't run the bundled demo program
    #[arg(long)]
    no_demo: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    let args = Args::parse();
    let config = ServerConfig::new(args.host, args.port);

    tracing::info!("micro:bit simulator v{}", env!("CARGO_PKG_VERSION"));

    let running = setup_signal_handler()?;
    let device = Arc::new(Device::new());

    let app_handle = if args.no_demo {
        None
    } else {
        let app_device = device.clone();
        let app_running = running.clone();
        Some(std::thread::spawn(move || run_demo(&app_device, &app_running)))
    };

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Viewers connect to ws://{}/", addr);
    tracing::info!("API Documentation: http://localhost:{}/docs", config.port);

    server::serve(listener, device.clone(), running).await?;

    // Unblock the demo if it is mid-animation.
    device.display().stop_animation();
    if let Some(handle) = app_handle {
        if handle.join().is_err() {
            tracing::error!("Demo thread panicked");
        }
    }

    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Button A shows how many times it was pressed, button B scrolls the
/// seconds since start.
fn run_demo(device: &Device, running: &AtomicBool) {
    device
        .display()
        .scroll("0123456789", ScrollOptions::default().with_delay(80));

    while is_running(running) {
        if device.button_a().was_pressed() {
            let presses = device.button_a().get_presses();
            device.display().show(
                &presses.to_string(),
                ShowOptions::default().with_clear_after(true),
            );
        }

        if device.button_b().was_pressed() {
            let seconds = device.running_time() / 1000;
            device
                .display()
                .scroll(&seconds.to_string(), ScrollOptions::default());
        }

        device.sleep(20);
    }
}
