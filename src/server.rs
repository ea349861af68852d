//! Sync endpoint: WebSocket viewers plus a small HTTP API.
//!
//! Each viewer connection runs as its own tokio task that owns one hub
//! [`Session`](crate::sync::Session). The task forwards queued state
//! changes to the socket and hands inbound text frames to the device, so
//! viewers are serviced independently of each other and of the
//! application thread, even while it is blocked in an animation.
//!
//! ## Endpoints
//! - `GET /` or `GET /ws` — WebSocket upgrade for a viewer
//! - `GET /api/v1/status` — current device state
//! - `POST /api/v1/reset` — reset buttons, display and clock
//! - `POST /api/v1/buttons/{id}` — press or release a button
//! - `/docs` — Swagger UI

use crate::button::ButtonId;
use crate::device::{Device, DeviceStatus};
use crate::error::ProtocolError;
use crate::is_running;
use crate::protocol::InboundMessage;
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// How often the run flag is checked for shutdown.
const STOP_POLL: Duration = Duration::from_millis(100);

// ── App State ────────────────────────────────────────────────────────

/// Shared state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// The simulated device, shared with the application thread
    pub device: Arc<Device>,
    /// Flips to `true` when the endpoint is shutting down
    pub stop: watch::Receiver<bool>,
}

// ── OpenAPI Documentation ────────────────────────────────────────────

#[derive(OpenApi)]
#[openapi(
    paths(get_status, post_reset, post_button),
    components(schemas(DeviceStatus, ButtonRequest)),
    tags(
        (name = "device", description = "Simulated device control"),
        (name = "system", description = "System status endpoints"),
    ),
    info(
        title = "micro:bit Simulator API",
        version = env!("CARGO_PKG_VERSION"),
        description = "HTTP API for the simulated buttons and LED matrix. Viewers sync over the WebSocket at /."
    )
)]
pub struct ApiDoc;

// ── Request types ────────────────────────────────────────────────────

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ButtonRequest {
    /// true to press, false to release
    #[schema(example = true)]
    is_pressed: bool,
}

// ── Router ───────────────────────────────────────────────────────────

/// Build the axum router with the viewer socket and API endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", ApiDoc::openapi())
                .config(utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"]).validator_url("none")),
        )
        .route("/", get(ws_viewer))
        .route("/ws", get(ws_viewer))
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/reset", post(post_reset))
        .route("/api/v1/buttons/{id}", post(post_button))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on `listener` until `running` goes false, then shut down
/// gracefully, closing every viewer socket.
pub async fn serve(
    listener: TcpListener,
    device: Arc<Device>,
    running: Arc<AtomicBool>,
) -> std::io::Result<()> {
    let (stop_tx, stop_rx) = watch::channel(false);

    tokio::spawn(async move {
        while is_running(&running) {
            tokio::time::sleep(STOP_POLL).await;
        }
        let _ = stop_tx.send(true);
    });

    let app = create_router(AppState {
        device,
        stop: stop_rx.clone(),
    });

    let mut stop = stop_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = stop.changed().await;
            tracing::info!("Sync endpoint shutting down");
        })
        .await
}

// ── Handlers ─────────────────────────────────────────────────────────

/// GET /api/v1/status — current device state
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "system",
    responses(
        (status = 200, description = "Current device state", body = DeviceStatus)
    )
)]
async fn get_status(State(state): State<AppState>) -> Json<DeviceStatus> {
    Json(state.device.status())
}

/// POST /api/v1/reset — reset buttons, display and running time
#[utoipa::path(
    post,
    path = "/api/v1/reset",
    tag = "device",
    responses(
        (status = 200, description = "Device reset"),
    )
)]
async fn post_reset(State(state): State<AppState>) -> StatusCode {
    state.device.reset();
    StatusCode::OK
}

/// POST /api/v1/buttons/{id} — press or release button A or B
#[utoipa::path(
    post,
    path = "/api/v1/buttons/{id}",
    tag = "device",
    params(("id" = String, Path, description = "Button id: A or B")),
    request_body = ButtonRequest,
    responses(
        (status = 200, description = "Button state applied"),
        (status = 404, description = "No such button")
    )
)]
async fn post_button(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ButtonRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id: ButtonId = id
        .parse()
        .map_err(|e: ProtocolError| (StatusCode::NOT_FOUND, e.to_string()))?;

    state.device.apply(InboundMessage::ButtonChange {
        id,
        is_pressed: req.is_pressed,
    });

    Ok(StatusCode::OK)
}

// ── WebSocket viewers ───────────────────────────────────────────────

/// GET / — WebSocket endpoint for viewers.
///
/// The first message is `INITIAL_DATA`; after that the viewer receives
/// every display change as it happens and may send `BUTTON_CHANGE`
/// messages. Binary frames are ignored.
async fn ws_viewer(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_viewer_socket(socket, state))
}

async fn handle_viewer_socket(mut socket: WebSocket, state: AppState) {
    let mut stop = state.stop.clone();
    let stopping = *stop.borrow_and_update();
    if stopping {
        return;
    }

    let mut session = state.device.connect_viewer();
    let id = session.id();
    tracing::info!("WebSocket viewer {} connected", id);

    let mut sent: u64 = 0;
    let mut received: u64 = 0;

    loop {
        tokio::select! {
            outbound = session.next_message() => {
                let Some(text) = outbound else { break };
                if let Err(e) = socket.send(Message::Text(text.into())).await {
                    tracing::warn!("WebSocket send error for viewer {}: {}", id, e);
                    break;
                }
                sent += 1;
            }
            inbound = socket.recv() => {
                let msg = match inbound {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket receive error for viewer {}: {}", id, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        received += 1;
                        state.device.handle_inbound(text.as_str());
                    }
                    Message::Binary(data) => {
                        tracing::warn!("Ignoring binary message from viewer {} ({} bytes)", id, data.len());
                    }
                    Message::Close(_) => break,
                    _ => {} // ping/pong handled by axum
                }
            }
            _ = stop.changed() => break,
        }
    }

    state.device.disconnect_viewer(id);
    tracing::info!(
        "WebSocket viewer {} disconnected ({} sent, {} received)",
        id,
        sent,
        received
    );
}
