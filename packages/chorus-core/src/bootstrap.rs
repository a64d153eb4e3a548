//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root: the single place where the
//! collaborators supplied by a host are wired into the session services.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ChorusResult;
use crate::events::{BroadcastEventBridge, EventEmitter};
use crate::runtime::TokioSpawner;
use crate::services::{MusicService, SessionDeps, SessionRegistry, TransportEventProcessor};
use crate::state::Config;
use crate::voice::{NotificationSink, TrackResolver, TransportEvent, VoiceTransport};

/// Host-provided implementations of the collaborator traits.
pub struct Collaborators {
    pub transport: Arc<dyn VoiceTransport>,
    pub resolver: Arc<dyn TrackResolver>,
    pub sink: Arc<dyn NotificationSink>,
    /// Receiving end of the channel the transport reports events on.
    pub transport_events: mpsc::Receiver<TransportEvent>,
}

/// Creates the channel a transport reports finished-notifications on.
pub fn transport_event_channel(
    config: &Config,
) -> (mpsc::Sender<TransportEvent>, mpsc::Receiver<TransportEvent>) {
    mpsc::channel(config.transport_event_capacity.max(1))
}

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Command entry point.
    pub music: Arc<MusicService>,
    /// Per-conversation sessions.
    pub registry: Arc<SessionRegistry>,
    /// Session lifecycle events for observers.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Routes transport events to sessions.
    pub event_processor: Arc<TransportEventProcessor>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Starts the transport event loop.
    pub fn start_background_tasks(&self) {
        self.event_processor.start();
    }

    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Sessions first: teardown may still produce transport events.
        let closed = self.registry.close_all().await;
        log::info!("[Bootstrap] Closed {} session(s)", closed);

        self.cancel_token.cancel();

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps the session services on top of the host's collaborators.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`ChorusError::Configuration`](crate::error::ChorusError::Configuration)
/// if `config` is invalid.
pub fn bootstrap_services(
    config: &Config,
    collaborators: Collaborators,
) -> ChorusResult<BootstrappedServices> {
    config.validate()?;

    let Collaborators {
        transport,
        resolver,
        sink,
        transport_events,
    } = collaborators;

    let spawner = TokioSpawner::current();
    let cancel_token = CancellationToken::new();

    let event_bridge = Arc::new(BroadcastEventBridge::new(config.event_channel_capacity));
    let emitter: Arc<dyn EventEmitter> = event_bridge.clone();

    let registry = Arc::new(SessionRegistry::new(SessionDeps {
        transport,
        resolver,
        sink: Arc::clone(&sink),
        emitter,
    }));

    let music = Arc::new(MusicService::new(Arc::clone(&registry), sink));

    let event_processor = Arc::new(TransportEventProcessor::new(
        Arc::clone(&registry),
        transport_events,
        spawner.clone(),
        cancel_token.clone(),
    ));

    log::info!("[Bootstrap] Session services ready");

    Ok(BootstrappedServices {
        music,
        registry,
        event_bridge,
        event_processor,
        spawner,
        cancel_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::ChorusError;
    use crate::events::SessionEvent;
    use crate::services::SessionStatus;
    use crate::test_fixtures::{caller, finished, track, Harness};
    use crate::types::ConversationId;
    use crate::voice::FinishReason;

    fn collaborators(h: &Harness, rx: mpsc::Receiver<TransportEvent>) -> Collaborators {
        Collaborators {
            transport: h.transport.clone(),
            resolver: h.resolver.clone(),
            sink: h.sink.clone(),
            transport_events: rx,
        }
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let h = Harness::new();
        let config = Config {
            event_channel_capacity: 0,
            ..Default::default()
        };
        let (_tx, rx) = transport_event_channel(&config);

        let result = bootstrap_services(&config, collaborators(&h, rx));

        assert!(matches!(result, Err(ChorusError::Configuration(_))));
    }

    #[tokio::test]
    async fn wired_services_play_advance_and_shut_down() {
        let h = Harness::new();
        h.resolver.add(track("a"));
        h.resolver.add(track("b"));
        let config = Config::default();
        let (tx, rx) = transport_event_channel(&config);
        let services = bootstrap_services(&config, collaborators(&h, rx)).unwrap();
        let mut events = services.event_bridge.subscribe();
        services.start_background_tasks();

        services.music.play(&caller(1), "a").await;
        services.music.play(&caller(1), "b").await;
        let session = services.registry.get(ConversationId(1)).unwrap();
        let handle = session.snapshot().connection.unwrap();

        tx.send(TransportEvent::TrackFinished(finished(
            &handle,
            "a",
            FinishReason::Finished,
        )))
        .await
        .unwrap();
        for _ in 0..200 {
            if session.snapshot().current_track == Some(track("b")) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(session.snapshot().current_track, Some(track("b")));

        services.shutdown().await;
        assert_eq!(session.status(), SessionStatus::Disconnected);
        assert!(services.cancel_token.is_cancelled());

        // Lifecycle events reach bridge subscribers.
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Connected { .. }
        ));
    }
}
