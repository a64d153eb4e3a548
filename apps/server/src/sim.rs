//! In-process collaborators for the console host.
//!
//! - [`SimulatedTransport`]: plays tracks on timers and reports their end
//! - [`CatalogueResolver`]: searches the configured catalogue
//! - [`ConsoleSink`]: prints notices to stdout

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chorus_core::{
    ConnectionHandle, ConversationId, FinishReason, Notice, NotificationSink, NotifyError,
    NotifyResult, PlaybackFinished, ResolverResult, SearchOutcome, TextChannelId, Track,
    TrackResolver, TransportError, TransportEvent, TransportResult, VoiceChannelId,
    VoiceTransport,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::CatalogueEntry;

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

struct Player {
    handle: ConnectionHandle,
    track: Option<Track>,
    /// Bumped on every play/stop/pause/resume; a timer only fires for the
    /// generation it was armed with.
    generation: u64,
    remaining: Duration,
    /// `None` while paused.
    resumed_at: Option<Instant>,
}

type Players = Arc<Mutex<HashMap<String, Player>>>;

/// Voice transport that "plays" a track by sleeping for its (scaled) length.
pub struct SimulatedTransport {
    events: mpsc::Sender<TransportEvent>,
    speedup: f64,
    players: Players,
    available: AtomicBool,
}

impl SimulatedTransport {
    /// `speedup` must be finite and positive.
    pub fn new(events: mpsc::Sender<TransportEvent>, speedup: f64) -> Self {
        Self {
            events,
            speedup,
            players: Arc::new(Mutex::new(HashMap::new())),
            available: AtomicBool::new(true),
        }
    }

    #[cfg(test)]
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Track length divided by the speed-up, saturating for tiny speed-ups.
    fn scaled(&self, length: Duration) -> Duration {
        Duration::try_from_secs_f64(length.as_secs_f64() / self.speedup).unwrap_or(Duration::MAX)
    }

    fn gone(handle: &ConnectionHandle) -> TransportError {
        TransportError::ConnectionGone(handle.to_string())
    }

    /// Spawns the end-of-track timer for `generation`.
    fn arm(&self, session_id: String, generation: u64, delay: Duration) {
        let players = Arc::clone(&self.players);
        let events = self.events.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let finished = {
                let mut players = players.lock();
                match players.get_mut(&session_id) {
                    Some(player)
                        if player.generation == generation && player.resumed_at.is_some() =>
                    {
                        player.track.take().map(|track| PlaybackFinished {
                            handle: player.handle.clone(),
                            track,
                            reason: FinishReason::Finished,
                        })
                    }
                    _ => None,
                }
            };

            if let Some(finished) = finished {
                log::debug!("[SimTransport] '{}' reached its end", finished.track.title);
                if events.send(TransportEvent::TrackFinished(finished)).await.is_err() {
                    log::debug!("[SimTransport] Event channel closed");
                }
            }
        });
    }
}

#[async_trait]
impl VoiceTransport for SimulatedTransport {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn connect(
        &self,
        conversation_id: ConversationId,
        channel: VoiceChannelId,
    ) -> TransportResult<ConnectionHandle> {
        if !self.is_available() {
            return Err(TransportError::NoNodeAvailable);
        }
        let handle = ConnectionHandle {
            conversation_id,
            voice_channel: channel,
            session_id: Uuid::new_v4().to_string(),
        };
        self.players.lock().insert(
            handle.session_id.clone(),
            Player {
                handle: handle.clone(),
                track: None,
                generation: 0,
                remaining: Duration::ZERO,
                resumed_at: None,
            },
        );
        log::info!("[SimTransport] Joined voice channel {} as {}", channel, handle);
        Ok(handle)
    }

    async fn disconnect(&self, handle: &ConnectionHandle) -> TransportResult<()> {
        self.players
            .lock()
            .remove(&handle.session_id)
            .map(|_| log::info!("[SimTransport] Left {}", handle))
            .ok_or_else(|| Self::gone(handle))
    }

    async fn play(&self, handle: &ConnectionHandle, track: &Track) -> TransportResult<()> {
        let (generation, delay) = {
            let mut players = self.players.lock();
            let player = players
                .get_mut(&handle.session_id)
                .ok_or_else(|| Self::gone(handle))?;
            player.generation += 1;
            player.track = Some(track.clone());
            player.remaining = self.scaled(track.duration());
            player.resumed_at = Some(Instant::now());
            (player.generation, player.remaining)
        };
        self.arm(handle.session_id.clone(), generation, delay);
        Ok(())
    }

    async fn stop(&self, handle: &ConnectionHandle) -> TransportResult<()> {
        let stopped = {
            let mut players = self.players.lock();
            let player = players
                .get_mut(&handle.session_id)
                .ok_or_else(|| Self::gone(handle))?;
            player.generation += 1;
            player.resumed_at = None;
            player.track.take()
        };

        if let Some(track) = stopped {
            let event = TransportEvent::TrackFinished(PlaybackFinished {
                handle: handle.clone(),
                track,
                reason: FinishReason::Stopped,
            });
            self.events
                .send(event)
                .await
                .map_err(|e| TransportError::command("stop", e.to_string()))?;
        }
        Ok(())
    }

    async fn pause(&self, handle: &ConnectionHandle) -> TransportResult<()> {
        let mut players = self.players.lock();
        let player = players
            .get_mut(&handle.session_id)
            .ok_or_else(|| Self::gone(handle))?;
        if player.track.is_some() {
            if let Some(resumed_at) = player.resumed_at.take() {
                player.remaining = player.remaining.saturating_sub(resumed_at.elapsed());
                player.generation += 1;
            }
        }
        Ok(())
    }

    async fn resume(&self, handle: &ConnectionHandle) -> TransportResult<()> {
        let armed = {
            let mut players = self.players.lock();
            let player = players
                .get_mut(&handle.session_id)
                .ok_or_else(|| Self::gone(handle))?;
            if player.track.is_some() && player.resumed_at.is_none() {
                player.generation += 1;
                player.resumed_at = Some(Instant::now());
                Some((player.generation, player.remaining))
            } else {
                None
            }
        };
        if let Some((generation, delay)) = armed {
            self.arm(handle.session_id.clone(), generation, delay);
        }
        Ok(())
    }

    fn current_track(&self, handle: &ConnectionHandle) -> Option<Track> {
        self.players
            .lock()
            .get(&handle.session_id)
            .and_then(|player| player.track.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// Case-insensitive search over the configured catalogue.
///
/// URL queries must match an entry's URI exactly; anything else is a load
/// failure, the way a real node reports an unsupported source.
pub struct CatalogueResolver {
    entries: Vec<CatalogueEntry>,
    next_id: AtomicU64,
}

impl CatalogueResolver {
    pub fn new(entries: Vec<CatalogueEntry>) -> Self {
        Self {
            entries,
            next_id: AtomicU64::new(1),
        }
    }

    fn find(&self, query: &str) -> Option<&CatalogueEntry> {
        let needle = query.to_lowercase();
        self.entries.iter().find(|entry| {
            entry.title.to_lowercase().contains(&needle)
                || entry.author.to_lowercase().contains(&needle)
                || entry
                    .keywords
                    .iter()
                    .any(|k| k.to_lowercase().contains(&needle))
        })
    }

    /// Every resolution gets a fresh id, so repeats of one entry stay distinct.
    fn to_track(&self, entry: &CatalogueEntry) -> Track {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Track::new(
            format!("sim-{id}"),
            entry.title.clone(),
            entry.author.clone(),
            entry.uri.clone(),
            Duration::from_secs(entry.duration_secs),
        )
    }
}

#[async_trait]
impl TrackResolver for CatalogueResolver {
    async fn search(&self, query: &str) -> ResolverResult<SearchOutcome> {
        if query.starts_with("http://") || query.starts_with("https://") {
            return Ok(match self.entries.iter().find(|e| e.uri == query) {
                Some(entry) => SearchOutcome::Found(self.to_track(entry)),
                None => SearchOutcome::LoadFailed(format!("unsupported source: {query}")),
            });
        }

        Ok(match self.find(query) {
            Some(entry) => SearchOutcome::Found(self.to_track(entry)),
            None => SearchOutcome::NoMatches,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sink
// ─────────────────────────────────────────────────────────────────────────────

/// Prints every notice to stdout, tagged with its text channel.
pub struct ConsoleSink;

#[async_trait]
impl NotificationSink for ConsoleSink {
    async fn send(&self, channel: TextChannelId, notice: Notice) -> NotifyResult<()> {
        let mut out = std::io::stdout().lock();
        let written = match &notice {
            Notice::Error { code, message } => writeln!(out, "[#{channel}] error ({code}): {message}"),
            Notice::NowPlaying { track } => writeln!(
                out,
                "[#{channel}] {notice} \nLength: {}",
                track.length_display()
            ),
            _ => writeln!(out, "[#{channel}] {notice}"),
        };
        written
            .and_then(|()| out.flush())
            .map_err(|e| NotifyError::Delivery {
                channel: channel.0,
                reason: e.to_string(),
            })
    }
}
