//! Viewer session registry and fan-out.
//!
//! The hub holds one outbound queue per connected viewer. Broadcasting
//! encodes a message once and pushes the text onto every queue; the
//! per-viewer WebSocket task drains its own queue, so a slow viewer never
//! holds up the others or the code that triggered the change.
//!
//! Sends are fire-and-forget. A queue whose viewer has gone away is
//! dropped from the registry on the next broadcast, without retries.
//!
//! Queues are unbounded. Publishing never blocks or fails for a live
//! viewer, so the display thread is never held up by the network. The
//! cost is memory: a viewer whose connection stalls without closing keeps
//! accumulating messages until its socket errors out or it disconnects.

use crate::protocol::OutboundMessage;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Identifies one registered viewer.
pub type SessionId = u64;

/// Where the display publishes its change events.
///
/// # Rust concept: trait objects
/// The display holds an `Arc<dyn EventSink>`, so it neither knows nor
/// cares whether it feeds the hub or a test recorder. `Send + Sync` lets
/// that `Arc` cross threads.
pub trait EventSink: Send + Sync {
    fn publish(&self, message: &OutboundMessage);
}

/// The receiving half of a viewer's queue, handed to whoever owns the
/// transport for that viewer.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    outbound: UnboundedReceiver<String>,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Wait for the next encoded message. `None` once unregistered.
    pub async fn next_message(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    /// Take a queued message without waiting.
    pub fn try_next_message(&mut self) -> Option<String> {
        self.outbound.try_recv().ok()
    }
}

#[derive(Debug, Default)]
pub struct SyncHub {
    sessions: Mutex<HashMap<SessionId, UnboundedSender<String>>>,
    next_id: AtomicU64,
}

impl SyncHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a viewer. `initial` is queued ahead of any broadcast that
    /// happens after this call returns.
    pub fn register(&self, initial: &OutboundMessage) -> Session {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, outbound) = mpsc::unbounded_channel();

        match initial.to_text() {
            Ok(text) => {
                // The receiver is still in hand, so this cannot fail.
                let _ = tx.send(text);
            }
            Err(e) => tracing::error!("Failed to encode {}: {}", initial.kind(), e),
        }

        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(id, tx);
        tracing::info!("Viewer {} registered ({} connected)", id, sessions.len());

        Session { id, outbound }
    }

    /// Remove a viewer. Returns false if it was already gone.
    pub fn unregister(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        let removed = sessions.remove(&id).is_some();
        if removed {
            tracing::info!("Viewer {} unregistered ({} connected)", id, sessions.len());
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Queue `message` for every registered viewer.
    pub fn broadcast(&self, message: &OutboundMessage) {
        let text = match message.to_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to encode {}: {}", message.kind(), e);
                return;
            }
        };

        let mut sessions = self.sessions.lock().unwrap();
        sessions.retain(|id, tx| {
            let delivered = tx.send(text.clone()).is_ok();
            if !delivered {
                tracing::debug!("Viewer {} went away, dropping it", id);
            }
            delivered
        });
    }
}

impl EventSink for SyncHub {
    fn publish(&self, message: &OutboundMessage) {
        self.broadcast(message);
    }
}
