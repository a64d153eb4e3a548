//! Test doubles for the collaborator traits.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{
    NotifyError, NotifyResult, ResolverError, ResolverResult, TransportError, TransportResult,
};
use crate::events::{EventEmitter, SessionEvent};
use crate::notice::Notice;
use crate::services::{SessionController, SessionDeps};
use crate::types::{
    CallerContext, ConversationId, TextChannelId, Track, UserId, VoiceChannelId,
    VoiceChannelKind, VoiceMembership,
};
use crate::voice::{
    ConnectionHandle, FinishReason, NotificationSink, PlaybackFinished, SearchOutcome,
    TrackResolver, VoiceTransport,
};

pub(crate) fn track(id: &str) -> Track {
    Track::new(
        id,
        id,
        format!("{id}-author"),
        format!("https://tracks.test/{id}"),
        Duration::from_secs(120),
    )
}

/// Caller in conversation `conversation`, sitting in voice channel
/// `100 + conversation` and typing in text channel `200 + conversation`.
pub(crate) fn caller(conversation: u64) -> CallerContext {
    CallerContext {
        user_id: UserId(1000 + conversation),
        conversation_id: ConversationId(conversation),
        text_channel: TextChannelId(200 + conversation),
        voice: Some(VoiceMembership {
            channel_id: VoiceChannelId(100 + conversation),
            name: format!("voice-{conversation}"),
            kind: VoiceChannelKind::Voice,
        }),
    }
}

pub(crate) fn finished(handle: &ConnectionHandle, track_id: &str, reason: FinishReason) -> PlaybackFinished {
    PlaybackFinished {
        handle: handle.clone(),
        track: track(track_id),
        reason,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransportCall {
    Connect(VoiceChannelId),
    Disconnect(String),
    /// Track id.
    Play(String),
    Stop,
    Pause,
    Resume,
}

/// A `play` call parked until the test releases it.
struct PlayHold {
    release: Arc<tokio::sync::Notify>,
    fail: bool,
}

pub(crate) struct MockTransport {
    available: AtomicBool,
    fail_connect: AtomicBool,
    fail_play: AtomicBool,
    fail_commands: AtomicBool,
    refused: Mutex<HashSet<String>>,
    connect_delay: Mutex<Option<Duration>>,
    play_hold: Mutex<Option<PlayHold>>,
    next_session: AtomicU64,
    calls: Mutex<Vec<TransportCall>>,
    loaded: Mutex<HashMap<String, Track>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            fail_connect: AtomicBool::new(false),
            fail_play: AtomicBool::new(false),
            fail_commands: AtomicBool::new(false),
            refused: Mutex::new(HashSet::new()),
            connect_delay: Mutex::new(None),
            play_hold: Mutex::new(None),
            next_session: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&TransportCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// Track ids passed to successful `play` calls, in order.
    pub fn plays(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                TransportCall::Play(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    /// Makes stop/pause/resume fail.
    pub fn set_fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::SeqCst);
    }

    pub fn refuse_track(&self, id: &str) {
        self.refused.lock().insert(id.to_string());
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock() = Some(delay);
    }

    /// Parks the next `play` until the returned handle is notified, then
    /// fails it if `fail` is set.
    pub fn hold_next_play(&self, fail: bool) -> Arc<tokio::sync::Notify> {
        let release = Arc::new(tokio::sync::Notify::new());
        *self.play_hold.lock() = Some(PlayHold {
            release: Arc::clone(&release),
            fail,
        });
        release
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().push(call);
    }

    fn command(&self, action: &'static str, call: TransportCall) -> TransportResult<()> {
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(TransportError::command(action, "mock failure"));
        }
        self.record(call);
        Ok(())
    }
}

#[async_trait]
impl VoiceTransport for MockTransport {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn connect(
        &self,
        conversation_id: ConversationId,
        channel: VoiceChannelId,
    ) -> TransportResult<ConnectionHandle> {
        let delay = *self.connect_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed("mock refused".into()));
        }
        self.record(TransportCall::Connect(channel));
        let session = self.next_session.fetch_add(1, Ordering::SeqCst);
        Ok(ConnectionHandle {
            conversation_id,
            voice_channel: channel,
            session_id: format!("mock-{session}"),
        })
    }

    async fn disconnect(&self, handle: &ConnectionHandle) -> TransportResult<()> {
        self.loaded.lock().remove(&handle.session_id);
        self.record(TransportCall::Disconnect(handle.session_id.clone()));
        Ok(())
    }

    async fn play(&self, handle: &ConnectionHandle, track: &Track) -> TransportResult<()> {
        let hold = self.play_hold.lock().take();
        if let Some(hold) = hold {
            hold.release.notified().await;
            if hold.fail {
                return Err(TransportError::command("play", "node hiccup"));
            }
        }
        if self.fail_play.load(Ordering::SeqCst) || self.refused.lock().contains(&track.id) {
            return Err(TransportError::command("play", "mock refused track"));
        }
        self.loaded
            .lock()
            .insert(handle.session_id.clone(), track.clone());
        self.record(TransportCall::Play(track.id.clone()));
        Ok(())
    }

    async fn stop(&self, _handle: &ConnectionHandle) -> TransportResult<()> {
        self.command("stop", TransportCall::Stop)
    }

    async fn pause(&self, _handle: &ConnectionHandle) -> TransportResult<()> {
        self.command("pause", TransportCall::Pause)
    }

    async fn resume(&self, _handle: &ConnectionHandle) -> TransportResult<()> {
        self.command("resume", TransportCall::Resume)
    }

    fn current_track(&self, handle: &ConnectionHandle) -> Option<Track> {
        self.loaded.lock().get(&handle.session_id).cloned()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver / Sink / Emitter
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct MockResolver {
    outcomes: Mutex<HashMap<String, SearchOutcome>>,
    unavailable: AtomicBool,
}

impl MockResolver {
    /// Registers `track` under its id as the query.
    pub fn add(&self, track: Track) {
        self.outcomes
            .lock()
            .insert(track.id.clone(), SearchOutcome::Found(track));
    }

    pub fn fail_query(&self, query: &str, reason: &str) {
        self.outcomes
            .lock()
            .insert(query.to_string(), SearchOutcome::LoadFailed(reason.to_string()));
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl TrackResolver for MockResolver {
    async fn search(&self, query: &str) -> ResolverResult<SearchOutcome> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ResolverError::Unavailable("mock offline".into()));
        }
        Ok(self
            .outcomes
            .lock()
            .get(query)
            .cloned()
            .unwrap_or(SearchOutcome::NoMatches))
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    sent: Mutex<Vec<(TextChannelId, Notice)>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn notices(&self) -> Vec<(TextChannelId, Notice)> {
        self.sent.lock().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, channel: TextChannelId, notice: Notice) -> NotifyResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery {
                channel: channel.0,
                reason: "mock sink down".into(),
            });
        }
        self.sent.lock().push((channel, notice));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingEmitter {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingEmitter {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit_session(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

/// All mocks wired into one [`SessionDeps`].
pub(crate) struct Harness {
    pub transport: Arc<MockTransport>,
    pub resolver: Arc<MockResolver>,
    pub sink: Arc<RecordingSink>,
    pub emitter: Arc<RecordingEmitter>,
    pub deps: SessionDeps,
}

impl Harness {
    pub fn new() -> Self {
        let transport = Arc::new(MockTransport::new());
        let resolver = Arc::new(MockResolver::default());
        let sink = Arc::new(RecordingSink::default());
        let emitter = Arc::new(RecordingEmitter::default());
        let deps = SessionDeps {
            transport: transport.clone(),
            resolver: resolver.clone(),
            sink: sink.clone(),
            emitter: emitter.clone(),
        };
        Self {
            transport,
            resolver,
            sink,
            emitter,
            deps,
        }
    }

    pub fn controller(&self, conversation: u64) -> SessionController {
        SessionController::new(ConversationId(conversation), self.deps.clone())
    }
}
