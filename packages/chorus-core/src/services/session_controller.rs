//! Per-conversation playback state machine.
//!
//! Responsibilities:
//! - Validate callers (voice membership, channel kind, transport availability)
//! - Connect lazily on the first `play`/`join`, tear down on `leave`
//! - Resolve queries and feed the track queue
//! - Start playback when idle, auto-advance on finished-notifications
//!
//! # Locking
//!
//! The session triple lives behind one `parking_lot::Mutex`. Every decision
//! that depends on it (idle → playing, dequeue, teardown, stale-event checks)
//! is taken inside that lock, and the lock is never held across an `.await`:
//! transport and resolver calls always happen after the guard is dropped.
//! Connection setup is additionally serialized by an async gate so concurrent
//! `play`s during `Connecting` wait for the outcome.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ChorusError, ChorusResult, StateError, ValidationError};
use crate::events::{EventEmitter, SessionEvent};
use crate::notice::Notice;
use crate::queue::TrackQueue;
use crate::services::session::{PlaybackTicket, Session, SessionSnapshot, SessionStatus};
use crate::types::{CallerContext, ConversationId, TextChannelId, Track, VoiceChannelKind, VoiceMembership};
use crate::utils::now_millis;
use crate::voice::{
    ConnectionHandle, NotificationSink, PlaybackFinished, SearchOutcome, TrackResolver,
    VoiceTransport,
};

/// Collaborators every session controller needs.
#[derive(Clone)]
pub struct SessionDeps {
    pub transport: Arc<dyn VoiceTransport>,
    pub resolver: Arc<dyn TrackResolver>,
    pub sink: Arc<dyn NotificationSink>,
    pub emitter: Arc<dyn EventEmitter>,
}

/// Checks that the caller may use the voice commands at all.
///
/// Order matters for the reply: missing voice membership is reported before
/// transport availability, which is reported before the channel kind.
pub(crate) fn validate_caller<'a>(
    caller: &'a CallerContext,
    transport: &dyn VoiceTransport,
) -> ChorusResult<&'a VoiceMembership> {
    let voice = caller
        .voice
        .as_ref()
        .ok_or(ValidationError::NotInVoiceChannel)?;
    if !transport.is_available() {
        return Err(ValidationError::NoTransportNode.into());
    }
    if voice.kind != VoiceChannelKind::Voice {
        return Err(ValidationError::NotAVoiceChannel.into());
    }
    Ok(voice)
}

/// What a finished-notification leads to.
enum Advance {
    /// Stale or duplicate notification; nothing changed.
    Ignored(&'static str),
    /// Queue was empty; the session went idle.
    Drained,
    /// Next track claimed; play it.
    Next(PlaybackTicket),
}

/// State machine for one conversation's playback session.
pub struct SessionController {
    conversation_id: ConversationId,
    state: Mutex<Session>,
    queue: TrackQueue,
    /// Serializes connect and teardown.
    connect_gate: tokio::sync::Mutex<()>,
    deps: SessionDeps,
}

impl SessionController {
    pub fn new(conversation_id: ConversationId, deps: SessionDeps) -> Self {
        Self {
            conversation_id,
            state: Mutex::new(Session::default()),
            queue: TrackQueue::new(),
            connect_gate: tokio::sync::Mutex::new(()),
            deps,
        }
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            conversation_id: self.conversation_id,
            status: state.status,
            connection: state.connection.clone(),
            reply_channel: state.reply_channel,
            voice_channel_name: state.voice_channel_name.clone(),
            current_track: state.current_track.clone(),
            queue: self.queue.snapshot(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolves `query` and plays it, or queues it behind the current track.
    ///
    /// Returns the reply for the requester. `None` means the now-playing
    /// announcement (sent to the session's reply channel) already covers it.
    pub async fn play(&self, caller: &CallerContext, query: &str) -> ChorusResult<Option<Notice>> {
        let voice = validate_caller(caller, self.deps.transport.as_ref())?;
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }

        self.ensure_connected(caller, voice).await?;
        let track = self.resolve(query).await?;

        let (ticket, claimed_own) = self.enqueue_and_claim(track.clone())?;
        if let Some(ticket) = ticket {
            let started = self.play_claimed(ticket).await;
            if claimed_own {
                // Tracks queued behind ours have been tried already.
                return started.map(|()| None);
            }
            if let Err(e) = started {
                log::warn!(
                    "[Session] {} queue head failed ahead of '{}': {}",
                    self.conversation_id,
                    track.title,
                    e
                );
            }
        }

        Ok(Some(Notice::AddedToQueue { track }))
    }

    /// Connects to the caller's voice channel without playing anything.
    pub async fn join(&self, caller: &CallerContext) -> ChorusResult<Option<Notice>> {
        let voice = validate_caller(caller, self.deps.transport.as_ref())?;
        let connected_now = self.ensure_connected(caller, voice).await?;

        let channel_name = self
            .state
            .lock()
            .voice_channel_name
            .clone()
            .unwrap_or_else(|| voice.name.clone());

        Ok(Some(if connected_now {
            Notice::Connected { channel_name }
        } else {
            Notice::AlreadyConnected { channel_name }
        }))
    }

    /// Stops the current track. Advancing is left to the finished-notification
    /// the transport sends in response, so `status` may briefly still read
    /// `Playing` with the old track.
    pub async fn skip(&self, caller: &CallerContext) -> ChorusResult<Option<Notice>> {
        validate_caller(caller, self.deps.transport.as_ref())?;
        let handle = self.playing_handle()?;

        self.deps.transport.stop(&handle).await?;
        log::info!("[Session] {} skip requested by {}", self.conversation_id, caller.user_id);

        Ok(Some(Notice::Skipped))
    }

    pub async fn pause(&self, caller: &CallerContext) -> ChorusResult<Option<Notice>> {
        validate_caller(caller, self.deps.transport.as_ref())?;
        let (handle, seq) = self.loaded_playback()?;

        self.deps.transport.pause(&handle).await?;
        self.set_status_if_current(seq, SessionStatus::Paused);

        Ok(Some(Notice::Paused))
    }

    pub async fn resume(&self, caller: &CallerContext) -> ChorusResult<Option<Notice>> {
        validate_caller(caller, self.deps.transport.as_ref())?;
        let (handle, seq) = self.loaded_playback()?;

        self.deps.transport.resume(&handle).await?;
        self.set_status_if_current(seq, SessionStatus::Playing);

        Ok(Some(Notice::Resumed))
    }

    /// Leaves the voice channel. Idempotent: a disconnected session replies
    /// with an informational notice instead of an error.
    pub async fn leave(&self, caller: &CallerContext) -> ChorusResult<Option<Notice>> {
        validate_caller(caller, self.deps.transport.as_ref())?;

        if self.close().await? {
            Ok(Some(Notice::Disconnected))
        } else {
            Ok(Some(Notice::NotConnected))
        }
    }

    /// Tears the session down: clears the queue, resets to `Disconnected`,
    /// then stops and disconnects the transport.
    ///
    /// State is reset before any transport I/O so a finished-notification
    /// racing the teardown finds the session already disconnected. Returns
    /// `false` if there was nothing to close.
    pub async fn close(&self) -> ChorusResult<bool> {
        let _gate = self.connect_gate.lock().await;

        let Some((handle, dropped_tracks)) = self.teardown() else {
            return Ok(false);
        };
        log::info!(
            "[Session] {} leaving {} ({} queued track(s) dropped)",
            self.conversation_id,
            handle,
            dropped_tracks
        );

        if let Err(e) = self.deps.transport.stop(&handle).await {
            log::warn!("[Session] {} stop during leave failed: {}", self.conversation_id, e);
        }
        let disconnected = self.deps.transport.disconnect(&handle).await;

        self.emit(SessionEvent::Closed {
            conversation_id: self.conversation_id,
            dropped_tracks,
            timestamp: now_millis(),
        });

        disconnected?;
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transport Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Handles the transport's finished-notification.
    ///
    /// Safe to call at any time and any number of times: notifications for a
    /// released connection, for a track that is no longer current, or for a
    /// disconnected session are ignored. Failures are logged only; there is
    /// no requester to notify.
    pub async fn on_playback_finished(&self, finished: PlaybackFinished) {
        let next = match self.advance_after(&finished) {
            Advance::Ignored(why) => {
                log::debug!(
                    "[Session] {} ignoring finished '{}' ({:?}): {}",
                    self.conversation_id,
                    finished.track.title,
                    finished.reason,
                    why
                );
                return;
            }
            Advance::Drained => {
                self.emit_finished(&finished);
                self.emit(SessionEvent::QueueDrained {
                    conversation_id: self.conversation_id,
                    timestamp: now_millis(),
                });
                log::info!("[Session] {} queue drained, session idle", self.conversation_id);
                return;
            }
            Advance::Next(ticket) => {
                self.emit_finished(&finished);
                ticket
            }
        };

        let title = next.track.title.clone();
        if let Err(e) = self.play_claimed(next).await {
            log::error!(
                "[Session] {} auto-advance to '{}' failed: {}",
                self.conversation_id,
                title,
                e
            );
        }
    }

    /// Handles the transport closing the connection on its own.
    pub async fn on_connection_closed(&self, handle: &ConnectionHandle, reason: &str) {
        let closed = {
            let mut state = self.state.lock();
            if state.connection.as_ref() != Some(handle) {
                None
            } else {
                let reply_channel = state.reply_channel;
                let dropped = self.queue.clear();
                state.reset();
                Some((reply_channel, dropped))
            }
        };

        let Some((reply_channel, dropped_tracks)) = closed else {
            log::debug!(
                "[Session] {} ignoring close of released connection {}",
                self.conversation_id,
                handle
            );
            return;
        };

        log::warn!(
            "[Session] {} connection {} closed by transport: {}",
            self.conversation_id,
            handle,
            reason
        );
        self.emit(SessionEvent::Closed {
            conversation_id: self.conversation_id,
            dropped_tracks,
            timestamp: now_millis(),
        });
        if let Some(channel) = reply_channel {
            self.send_notice(channel, Notice::Disconnected).await;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bookkeeping (synchronous, under the state lock)
    // ─────────────────────────────────────────────────────────────────────────

    /// Marks the session `Connecting` unless it is already connected.
    fn begin_connecting(&self) -> bool {
        let mut state = self.state.lock();
        if state.status.is_connected() {
            return false;
        }
        state.status = SessionStatus::Connecting;
        true
    }

    fn finish_connecting(
        &self,
        handle: ConnectionHandle,
        reply_channel: TextChannelId,
        voice: &VoiceMembership,
    ) {
        let mut state = self.state.lock();
        state.connection = Some(handle);
        state.reply_channel = Some(reply_channel);
        state.voice_channel_name = Some(voice.name.clone());
        state.status = SessionStatus::Idle;
        state.current_track = None;
    }

    fn abort_connecting(&self) {
        let mut state = self.state.lock();
        if state.status == SessionStatus::Connecting {
            state.status = SessionStatus::Disconnected;
        }
    }

    /// Enqueues `track` and, if the session is idle, claims the queue head.
    ///
    /// The flag is `true` when the claimed head is the entry just enqueued,
    /// decided by position rather than by comparing tracks.
    fn enqueue_and_claim(&self, track: Track) -> ChorusResult<(Option<PlaybackTicket>, bool)> {
        let (queue_length, ticket) = {
            let mut state = self.state.lock();
            // A leave can land between connect and enqueue.
            if !state.status.is_connected() {
                return Err(StateError::NotConnected.into());
            }
            let queue_length = self.queue.enqueue(track.clone());
            let ticket = if state.status == SessionStatus::Idle {
                self.claim_next(&mut state)
            } else {
                None
            };
            (queue_length, ticket)
        };

        if ticket.is_none() {
            self.emit(SessionEvent::TrackQueued {
                conversation_id: self.conversation_id,
                track,
                queue_length,
                timestamp: now_millis(),
            });
        }
        let claimed_own = ticket.is_some() && queue_length == 1;
        Ok((ticket, claimed_own))
    }

    /// Dequeues the next track and moves to `Playing`. Caller holds the lock.
    fn claim_next(&self, state: &mut Session) -> Option<PlaybackTicket> {
        if state.connection.is_none() {
            return None;
        }
        let track = self.queue.dequeue_next()?;
        state.begin_playback(track)
    }

    fn advance_after(&self, finished: &PlaybackFinished) -> Advance {
        let mut state = self.state.lock();
        if state.status == SessionStatus::Disconnected {
            return Advance::Ignored("session is disconnected");
        }
        if state.connection.as_ref() != Some(&finished.handle) {
            return Advance::Ignored("notification from a released connection");
        }
        let is_current = state
            .current_track
            .as_ref()
            .is_some_and(|t| t.id == finished.track.id);
        if !is_current {
            return Advance::Ignored("not the current track");
        }

        match self.claim_next(&mut state) {
            Some(ticket) => Advance::Next(ticket),
            None => {
                state.go_idle();
                Advance::Drained
            }
        }
    }

    /// Drops a claimed playback the transport rejected and claims the next
    /// queued track, unless the session already moved on.
    fn abandon_playback(&self, seq: u64) -> Option<PlaybackTicket> {
        let mut state = self.state.lock();
        if state.playback_seq != seq || !state.status.is_connected() {
            return None;
        }
        state.go_idle();
        self.claim_next(&mut state)
    }

    fn playing_handle(&self) -> ChorusResult<ConnectionHandle> {
        let state = self.state.lock();
        match (state.status, &state.connection) {
            (SessionStatus::Playing, Some(handle)) => Ok(handle.clone()),
            _ => Err(StateError::NothingPlaying.into()),
        }
    }

    fn loaded_playback(&self) -> ChorusResult<(ConnectionHandle, u64)> {
        let state = self.state.lock();
        match (&state.current_track, &state.connection) {
            (Some(_), Some(handle)) => Ok((handle.clone(), state.playback_seq)),
            _ => Err(StateError::NoCurrentTrack.into()),
        }
    }

    fn set_status_if_current(&self, seq: u64, status: SessionStatus) {
        let mut state = self.state.lock();
        if state.playback_seq == seq && state.current_track.is_some() {
            state.status = status;
        }
    }

    fn teardown(&self) -> Option<(ConnectionHandle, usize)> {
        let mut state = self.state.lock();
        if state.status == SessionStatus::Disconnected {
            return None;
        }
        let dropped = self.queue.clear();
        state.reset().map(|handle| (handle, dropped))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collaborator calls (never under the state lock)
    // ─────────────────────────────────────────────────────────────────────────

    /// Connects if needed. Returns `true` if this call made the connection.
    async fn ensure_connected(
        &self,
        caller: &CallerContext,
        voice: &VoiceMembership,
    ) -> ChorusResult<bool> {
        if self.status().is_connected() {
            return Ok(false);
        }

        let _gate = self.connect_gate.lock().await;
        if !self.begin_connecting() {
            return Ok(false);
        }

        log::info!(
            "[Session] {} connecting to voice channel '{}' ({})",
            self.conversation_id,
            voice.name,
            voice.channel_id
        );
        match self
            .deps
            .transport
            .connect(self.conversation_id, voice.channel_id)
            .await
        {
            Ok(handle) => {
                log::info!("[Session] {} connected: {}", self.conversation_id, handle);
                self.finish_connecting(handle, caller.text_channel, voice);
                self.emit(SessionEvent::Connected {
                    conversation_id: self.conversation_id,
                    voice_channel: voice.channel_id,
                    timestamp: now_millis(),
                });
                Ok(true)
            }
            Err(e) => {
                log::warn!("[Session] {} connect failed: {}", self.conversation_id, e);
                self.abort_connecting();
                Err(e.into())
            }
        }
    }

    async fn resolve(&self, query: &str) -> ChorusResult<Track> {
        match self.deps.resolver.search(query).await {
            Ok(SearchOutcome::Found(track)) => Ok(track),
            Ok(SearchOutcome::NoMatches) => Err(ChorusError::no_matches(query)),
            Ok(SearchOutcome::LoadFailed(reason)) => {
                log::warn!("[Session] Load failed for '{}': {}", query, reason);
                Err(ChorusError::load_failed(query, reason))
            }
            Err(e) => {
                log::warn!("[Session] Search for '{}' could not run: {}", query, e);
                Err(ChorusError::load_failed(query, e.to_string()))
            }
        }
    }

    /// Plays a claimed ticket. A track the transport refuses is dropped and
    /// the next queued one tried, until one starts or the queue runs dry.
    /// Returns the first refusal.
    async fn play_claimed(&self, ticket: PlaybackTicket) -> ChorusResult<()> {
        let mut first_error = None;
        let mut next = Some(ticket);
        while let Some(ticket) = next.take() {
            let seq = ticket.seq;
            if let Err(e) = self.start_playback(ticket).await {
                next = self.abandon_playback(seq);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Issues transport `play` for a claimed ticket and announces it.
    async fn start_playback(&self, ticket: PlaybackTicket) -> ChorusResult<()> {
        let PlaybackTicket { handle, track, .. } = ticket;

        if let Err(e) = self.deps.transport.play(&handle, &track).await {
            log::warn!(
                "[Session] {} transport refused '{}': {}",
                self.conversation_id,
                track.title,
                e
            );
            return Err(e.into());
        }

        log::info!(
            "[Session] {} now playing '{}' by {}",
            self.conversation_id,
            track.title,
            track.author
        );
        self.emit(SessionEvent::PlaybackStarted {
            conversation_id: self.conversation_id,
            track: track.clone(),
            timestamp: now_millis(),
        });

        let reply_channel = self.state.lock().reply_channel;
        if let Some(channel) = reply_channel {
            self.send_notice(channel, Notice::NowPlaying { track }).await;
        }
        Ok(())
    }

    async fn send_notice(&self, channel: TextChannelId, notice: Notice) {
        if let Err(e) = self.deps.sink.send(channel, notice).await {
            log::warn!("[Session] {} notice not delivered: {}", self.conversation_id, e);
        }
    }

    fn emit(&self, event: SessionEvent) {
        self.deps.emitter.emit_session(event);
    }

    fn emit_finished(&self, finished: &PlaybackFinished) {
        self.emit(SessionEvent::PlaybackFinished {
            conversation_id: self.conversation_id,
            track: finished.track.clone(),
            reason: finished.reason,
            timestamp: now_millis(),
        });
    }
}
