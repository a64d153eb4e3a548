//! Transport event processing service.
//!
//! Responsibilities:
//! - Draining the transport's event channel
//! - Routing each event to the owning conversation's session
//! - Keeping per-conversation order while conversations run independently

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::session_registry::SessionRegistry;
use crate::types::ConversationId;
use crate::voice::TransportEvent;

/// Forwards transport events to session controllers.
///
/// Each conversation gets its own worker task, fed in arrival order, so a
/// slow transport call in one conversation never delays another and two
/// notifications for the same conversation are never handled out of order.
pub struct TransportEventProcessor {
    registry: Arc<SessionRegistry>,
    event_rx: Arc<Mutex<Option<mpsc::Receiver<TransportEvent>>>>,
    spawner: TokioSpawner,
    cancel_token: CancellationToken,
}

impl TransportEventProcessor {
    pub fn new(
        registry: Arc<SessionRegistry>,
        event_rx: mpsc::Receiver<TransportEvent>,
        spawner: TokioSpawner,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            registry,
            event_rx: Arc::new(Mutex::new(Some(event_rx))),
            spawner,
            cancel_token,
        }
    }

    /// Spawns the forwarding loop. Only the first call has any effect.
    pub fn start(&self) {
        let Some(mut rx) = self.event_rx.lock().take() else {
            log::warn!("[TransportEventProcessor] Already started");
            return;
        };
        let registry = Arc::clone(&self.registry);
        let spawner = self.spawner.clone();
        let cancel = self.cancel_token.clone();

        self.spawner.spawn(async move {
            let mut workers: HashMap<ConversationId, mpsc::UnboundedSender<TransportEvent>> =
                HashMap::new();

            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = rx.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };

                let conversation_id = event.conversation_id();
                let Some(session) = registry.get(conversation_id) else {
                    log::debug!(
                        "[TransportEventProcessor] No session for conversation {}, dropping event",
                        conversation_id
                    );
                    continue;
                };

                let worker = workers.entry(conversation_id).or_insert_with(|| {
                    let (tx, mut worker_rx) = mpsc::unbounded_channel::<TransportEvent>();
                    spawner.spawn(async move {
                        while let Some(event) = worker_rx.recv().await {
                            match event {
                                TransportEvent::TrackFinished(finished) => {
                                    session.on_playback_finished(finished).await;
                                }
                                TransportEvent::ConnectionClosed { handle, reason } => {
                                    session.on_connection_closed(&handle, &reason).await;
                                }
                            }
                        }
                    });
                    tx
                });

                if worker.send(event).is_err() {
                    log::error!(
                        "[TransportEventProcessor] Worker for conversation {} is gone",
                        conversation_id
                    );
                    workers.remove(&conversation_id);
                }
            }

            log::info!("[TransportEventProcessor] Event loop stopped");
        });
    }
}
