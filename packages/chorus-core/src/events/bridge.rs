//! Bridge that fans session events out over a broadcast channel.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::emitter::EventEmitter;
use super::SessionEvent;

/// Forwards [`SessionEvent`]s to a `tokio::sync::broadcast` channel.
///
/// Hosts subscribe to observe sessions (logging, dashboards, tests). An
/// optional external emitter can be attached after construction and receives
/// every event before the broadcast send.
#[derive(Clone)]
pub struct BroadcastEventBridge {
    tx: broadcast::Sender<SessionEvent>,
    external_emitter: Arc<RwLock<Option<Arc<dyn EventEmitter>>>>,
}

impl BroadcastEventBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            external_emitter: Arc::new(RwLock::new(None)),
        }
    }

    pub fn set_external_emitter(&self, emitter: Arc<dyn EventEmitter>) {
        *self.external_emitter.write() = Some(emitter);
    }

    /// Returns a new receiver for the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl EventEmitter for BroadcastEventBridge {
    fn emit_session(&self, event: SessionEvent) {
        if let Some(ref emitter) = *self.external_emitter.read() {
            emitter.emit_session(event.clone());
        }
        if let Err(e) = self.tx.send(event) {
            log::trace!("[EventBridge] No broadcast receivers: {}", e);
        }
    }
}
