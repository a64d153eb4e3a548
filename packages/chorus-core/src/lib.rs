//! Chorus Core - per-conversation voice playback sessions.
//!
//! This crate holds the platform-independent part of a chat music bot: a
//! FIFO track queue and a session state machine per conversation, driven by
//! user commands (`play`, `skip`, `pause`, `resume`, `leave`, `join`) and by
//! the voice transport's finished-notifications.
//!
//! # Architecture
//!
//! - [`voice`]: Collaborator traits (transport, resolver, notification sink)
//! - [`queue`]: Thread-safe FIFO track queue
//! - [`services`]: Session controller, registry, command and event routing
//! - [`events`]: Session lifecycle events for observers
//! - [`bootstrap`]: Composition root wiring a host's collaborators
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`VoiceTransport`](voice::VoiceTransport): Voice connections and playback
//! - [`TrackResolver`](voice::TrackResolver): Query to track lookup
//! - [`NotificationSink`](voice::NotificationSink): Replies to text channels
//! - [`EventEmitter`](events::EventEmitter): Emitting session events
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod constants;
pub mod error;
pub mod events;
pub mod notice;
pub mod queue;
pub mod runtime;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;
pub mod voice;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export commonly used types at the crate root
pub use bootstrap::{bootstrap_services, transport_event_channel, BootstrappedServices, Collaborators};
pub use error::{
    ChorusError, ChorusResult, ErrorCode, NotifyError, NotifyResult, ResolutionFailure,
    ResolverError, ResolverResult, StateError, TransportError, TransportResult, ValidationError,
};
pub use events::{BroadcastEventBridge, EventEmitter, LoggingEventEmitter, NoopEventEmitter, SessionEvent};
pub use notice::Notice;
pub use queue::TrackQueue;
pub use runtime::{TaskSpawner, TokioSpawner};
pub use services::{
    MusicCommand, MusicService, SessionController, SessionDeps, SessionRegistry, SessionSnapshot,
    SessionStatus, TransportEventProcessor,
};
pub use state::Config;
pub use types::{
    CallerContext, ConversationId, TextChannelId, Track, UserId, VoiceChannelId, VoiceChannelKind,
    VoiceMembership,
};
pub use utils::now_millis;
pub use voice::{
    ConnectionHandle, FinishReason, NotificationSink, PlaybackFinished, SearchOutcome,
    TrackResolver, TransportEvent, VoiceTransport,
};
